//! Share link types.

use serde::Serialize;

/// A shareable link built for one identifier.
///
/// Derived from the rewritten text, never stored directly; only
/// `outer_key` is persisted on the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareLink {
    /// Full URL to hand out
    pub target_url: String,

    /// Percent-encoded outer key carried by `target_url`
    pub outer_key: String,
}

/// Result of decoding an outer key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLink {
    /// Inner URL the share link redirects to
    pub inner_url: String,

    /// Content identifier found in the inner URL, if any
    pub identifier: Option<String>,

    /// Recovered rewritten text
    pub text: String,
}

/// What an opened URL asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingLink {
    /// A `#fauxPost?vkey=` share link carrying an outer key
    Redirect { outer_key: String },

    /// A `#fauxPostDecodedData?vkey=` inner URL carrying the text payload
    Decoded { payload: String },
}
