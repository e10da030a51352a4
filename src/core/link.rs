//! Two-level share link protocol.
//!
//! A share link nests two encodings:
//!
//! ```text
//! <share_base>#fauxPost?vkey=<outer>
//!     outer = escape(base64(inner_url))
//!     inner_url = <content_base><identifier>#fauxPostDecodedData?vkey=<inner>
//!         inner = escape(base64(text))
//! ```
//!
//! The outer hop is itself a valid link that redirects the viewer to the
//! content page, and the inner URL carries the rewritten text as its own
//! parameter.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::codec::{self, DecodeError};
use crate::domain::{IncomingLink, ParsedLink, ShareLink};

/// Name of the query parameter carrying a payload at either level
pub const VKEY: &str = "vkey";

/// Fragment that marks an outer share link
pub const REDIRECT_FRAGMENT: &str = "#fauxPost?";

/// Fragment that marks an inner URL carrying decoded data
pub const DECODED_FRAGMENT: &str = "#fauxPostDecodedData?";

/// Shape of a content identifier inside an inner URL.
///
/// If the platform changes its URL layout, this is the only thing to touch.
pub const IDENTIFIER_PATTERN: &str = r"urn:li:activity:\d+";

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(IDENTIFIER_PATTERN).expect("identifier pattern is valid"))
}

/// Errors that abort parsing a share link
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("Failed to decode share link: {0}")]
    Decode(#[from] DecodeError),

    #[error("Inner link carries no vkey payload: {inner_url}")]
    MissingPayload { inner_url: String },
}

/// URL bases used when building and rendering links
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSettings {
    /// Page the outer share link points at
    #[serde(default = "default_share_base")]
    pub share_base: String,

    /// Prefix joined with an identifier to address the original content
    #[serde(default = "default_content_base")]
    pub content_base: String,

    /// Search page hashtags link to
    #[serde(default = "default_hashtag_search")]
    pub hashtag_search: String,
}

fn default_share_base() -> String {
    "https://www.linkedin.com/feed/_".to_string()
}

fn default_content_base() -> String {
    "https://www.linkedin.com/feed/update/".to_string()
}

fn default_hashtag_search() -> String {
    "https://www.linkedin.com/search/results/all/".to_string()
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            share_base: default_share_base(),
            content_base: default_content_base(),
            hashtag_search: default_hashtag_search(),
        }
    }
}

/// Builds and parses share links
#[derive(Debug, Clone, Default)]
pub struct LinkProtocol {
    settings: LinkSettings,
}

impl LinkProtocol {
    /// Create a protocol with custom URL bases
    pub fn new(settings: LinkSettings) -> Self {
        Self { settings }
    }

    /// URL of the original content for an identifier
    pub fn content_url(&self, identifier: &str) -> String {
        format!("{}{}", self.settings.content_base, identifier)
    }

    /// Inner URL carrying `text` for `identifier`
    pub fn inner_url(&self, identifier: &str, text: &str) -> String {
        let inner_key = url_escape(&codec::encode(text));
        format!(
            "{}{}{}={}",
            self.content_url(identifier),
            DECODED_FRAGMENT,
            VKEY,
            inner_key
        )
    }

    /// Build the share link for a rewritten text
    pub fn build(&self, identifier: &str, text: &str) -> ShareLink {
        let inner_url = self.inner_url(identifier, text);
        let outer_key = url_escape(&codec::encode(&inner_url));

        debug!(
            identifier,
            text_len = text.len(),
            key_len = outer_key.len(),
            "Built share link"
        );

        ShareLink {
            target_url: self.share_url(&outer_key),
            outer_key,
        }
    }

    /// Rebuild the share URL from a stored outer key
    pub fn share_url(&self, outer_key: &str) -> String {
        format!(
            "{}{}{}={}",
            self.settings.share_base, REDIRECT_FRAGMENT, VKEY, outer_key
        )
    }

    /// Decode an outer key into the inner URL, identifier, and text
    pub fn parse(&self, outer_key: &str) -> Result<ParsedLink, LinkError> {
        let inner_url = decode_payload(outer_key)?;
        let identifier = find_identifier(&inner_url);

        let inner_key = match query_param(&inner_url, VKEY) {
            Some(key) => key,
            None => return Err(LinkError::MissingPayload { inner_url }),
        };
        let text = decode_payload(&inner_key)?;

        debug!(
            identifier = identifier.as_deref().unwrap_or("<none>"),
            text_len = text.len(),
            "Parsed share link"
        );

        Ok(ParsedLink {
            inner_url,
            identifier,
            text,
        })
    }
}

/// Recognize an opened URL as a share link or an inner data URL.
///
/// Returns `None` when the URL carries nothing to consume, including when
/// the marker is present but the `vkey` parameter is missing or empty.
pub fn classify(url: &str) -> Option<IncomingLink> {
    if url.contains(REDIRECT_FRAGMENT) {
        return query_param(url, VKEY)
            .filter(|key| !key.is_empty())
            .map(|outer_key| IncomingLink::Redirect { outer_key });
    }

    if url.contains(DECODED_FRAGMENT.trim_start_matches('#')) {
        return query_param(url, VKEY)
            .filter(|payload| !payload.is_empty())
            .map(|payload| IncomingLink::Decoded { payload });
    }

    None
}

/// First content identifier found in `text`
pub fn find_identifier(text: &str) -> Option<String> {
    identifier_regex()
        .find(text)
        .map(|m| m.as_str().to_string())
}

/// Look up a parameter in the URL's query string, then in the query
/// segment that follows `?` inside its fragment.
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;

    let mut value = parsed
        .query()
        .and_then(|query| lookup(query.as_bytes(), name));
    if value.is_none() {
        value = parsed
            .fragment()
            .and_then(|fragment| fragment.split_once('?'))
            .and_then(|(_, query)| lookup(query.as_bytes(), name));
    }
    value
}

fn lookup(query: &[u8], name: &str) -> Option<String> {
    url::form_urlencoded::parse(query)
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Percent-encode everything outside the unreserved set
pub fn url_escape(text: &str) -> String {
    urlencoding::encode(text).into_owned()
}

/// Reverse [`url_escape`]
pub fn url_unescape(text: &str) -> Result<String, DecodeError> {
    urlencoding::decode(text)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| DecodeError::InvalidUtf8(e.utf8_error().to_string()))
}

/// Unescape and Base64-decode one level of payload
pub fn decode_payload(payload: &str) -> Result<String, DecodeError> {
    codec::decode(&url_unescape(payload)?)
}

/// Normalize an outer key to its percent-encoded form
pub fn canonical_key(outer_key: &str) -> Result<String, DecodeError> {
    Ok(url_escape(&url_unescape(outer_key)?))
}
