//! Text to safe markup.
//!
//! Rendering is a fixed pipeline of pure stages:
//!
//! 1. [`escape_html`]: entity-escape `& < > " '`
//! 2. [`autolink`]: wrap domain-looking tokens that pass [`vet_link`]
//! 3. [`Renderer::link_hashtags`]: turn `#tag` into search links
//! 4. [`break_lines`]: newlines become inline breaks
//!
//! Escaping runs exactly once, first. Later stages only ever see escaped
//! text, so their patterns are written against the escaped form and none of
//! them copies raw user characters into the markup.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::trace;
use url::Url;

/// Attributes shared by every generated anchor
const ANCHOR_ATTRS: &str = r#"target="_self" tabindex="0""#;

/// Data attribute the host page uses to recognize generated links
const APP_AWARE_ATTR: &str = r#"data-test-app-aware-link="""#;

const REL_ATTR: &str = r#"rel="noopener noreferrer""#;

/// Marker emitted for each newline
pub const LINE_BREAK: &str = "<span><br></span>";

/// One character of a link candidate in escaped text.
///
/// `&` only enters a token as a whole `&amp;`, so a token never ends inside
/// an entity and never swallows an escaped `<`, `>`, or quote. `;` is left
/// out so a token cannot start on the tail of an entity either.
const TOKEN_CHAR: &str = r"(?:[^\s<>&;]|&amp;)";

fn loose_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(
            r"\b{c}*[a-zA-Z0-9]\.{c}*[a-zA-Z0-9]{c}*\b",
            c = TOKEN_CHAR
        );
        Regex::new(&pattern).expect("url pattern is valid")
    })
}

fn hostname_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:[a-z0-9_](?:[a-z0-9_-]*[a-z0-9_])?\.)+[a-z]{2,}$")
            .expect("hostname pattern is valid")
    })
}

fn hashtag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(^|\s)#([0-9A-Za-z_]+)").expect("hashtag pattern is valid"))
}

/// Why a URL-looking token was left as plain text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsafeLinkSkipped {
    /// Not a URL once a scheme is added
    Unparseable,

    /// Host is not `label(.label)*.tld`
    BadHost,

    /// Resolves to something other than https
    InsecureScheme,
}

/// Renders text with a configurable hashtag search target
#[derive(Debug, Clone)]
pub struct Renderer {
    hashtag_search: String,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new("https://www.linkedin.com/search/results/all/")
    }
}

impl Renderer {
    /// Create a renderer whose hashtags link to `hashtag_search`
    pub fn new(hashtag_search: impl Into<String>) -> Self {
        Self {
            hashtag_search: hashtag_search.into(),
        }
    }

    /// Run the full pipeline over untrusted text
    pub fn render(&self, text: &str) -> String {
        let escaped = escape_html(text);
        let linked = autolink(&escaped);
        let tagged = self.link_hashtags(&linked);
        break_lines(&tagged)
    }

    /// Turn `#tag` at a word start into a search link.
    ///
    /// The boundary character before `#` is kept as is and the tag keeps its
    /// casing; only the search keyword is lower-cased.
    pub fn link_hashtags(&self, markup: &str) -> String {
        hashtag_regex()
            .replace_all(markup, |caps: &Captures| {
                let prefix = &caps[1];
                let tag = &caps[2];
                let keywords = urlencoding::encode(&tag.to_lowercase()).into_owned();

                format!(
                    "{prefix}<a {ANCHOR_ATTRS} href=\"{search}?keywords={keywords}&amp;origin=HASH_TAG_FROM_FEED\" {REL_ATTR} {APP_AWARE_ATTR}>\
                     <span class=\"visually-hidden\">hashtag</span>\
                     <span><span aria-hidden=\"true\">#</span>{tag}</span></a>",
                    search = self.hashtag_search,
                )
            })
            .into_owned()
    }
}

/// Escape the five HTML metacharacters
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Link domain-looking tokens in already-escaped text.
///
/// The anchor text is the matched token, not the normalized URL, so the
/// viewer never sees a scheme they did not type.
pub fn autolink(escaped: &str) -> String {
    loose_url_regex()
        .replace_all(escaped, |caps: &Captures| {
            let token = &caps[0];
            match vet_link(token) {
                Ok(href) => format!(
                    "<a {ANCHOR_ATTRS} href=\"{href}\" {REL_ATTR} {APP_AWARE_ATTR}>{token}</a>"
                ),
                Err(reason) => {
                    trace!(?reason, token_len = token.len(), "Left token unlinked");
                    token.to_string()
                }
            }
        })
        .into_owned()
}

/// Normalize a candidate to an https URL and check that it is safe to link.
///
/// Bare domains get `https://`; `http://` is upgraded. Returns the href to
/// emit, which is the normalized candidate text.
pub fn vet_link(candidate: &str) -> Result<String, UnsafeLinkSkipped> {
    let normalized = normalize_scheme(candidate);
    let parsed = Url::parse(&normalized).map_err(|_| UnsafeLinkSkipped::Unparseable)?;

    if !parsed.host_str().is_some_and(is_plausible_host) {
        return Err(UnsafeLinkSkipped::BadHost);
    }
    if parsed.scheme() != "https" {
        return Err(UnsafeLinkSkipped::InsecureScheme);
    }

    Ok(normalized)
}

fn normalize_scheme(candidate: &str) -> String {
    const HTTPS: &str = "https://";
    const HTTP: &str = "http://";

    let has_prefix = |prefix: &str| {
        candidate
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    };

    if has_prefix(HTTPS) {
        candidate.to_string()
    } else if has_prefix(HTTP) {
        format!("{}{}", HTTPS, &candidate[HTTP.len()..])
    } else {
        format!("{}{}", HTTPS, candidate)
    }
}

/// Accept only `label(.label)*.tld` hosts with an alphabetic TLD
pub fn is_plausible_host(host: &str) -> bool {
    hostname_regex().is_match(host)
}

/// Replace each newline with an inline break
pub fn break_lines(markup: &str) -> String {
    markup.replace('\n', LINE_BREAK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#039;Jerry&#039;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_autolink_bare_domain() {
        let out = autolink("visit example.com today");
        assert_eq!(
            out,
            "visit <a target=\"_self\" tabindex=\"0\" href=\"https://example.com\" \
             rel=\"noopener noreferrer\" data-test-app-aware-link=\"\">example.com</a> today"
        );
    }

    #[test]
    fn test_autolink_keeps_https_and_path() {
        let out = autolink("https://www.rust-lang.org/learn");
        assert!(out.contains("href=\"https://www.rust-lang.org/learn\""));
        assert!(out.contains(">https://www.rust-lang.org/learn</a>"));
    }

    #[test]
    fn test_autolink_upgrades_http() {
        let out = autolink("http://example.org");
        assert!(out.contains("href=\"https://example.org\""));
        assert!(out.contains(">http://example.org</a>"));
        assert!(!out.contains("href=\"http://"));
    }

    #[test]
    fn test_autolink_trailing_punctuation() {
        let out = autolink("see example.com.");
        assert!(out.contains(">example.com</a>."));
    }

    #[test]
    fn test_autolink_stops_before_escaped_brackets() {
        let out = autolink(&escape_html("https://example.com/<x>"));
        assert_eq!(
            out,
            "<a target=\"_self\" tabindex=\"0\" href=\"https://example.com\" \
             rel=\"noopener noreferrer\" data-test-app-aware-link=\"\">https://example.com</a>\
             /&lt;x&gt;"
        );
    }

    #[test]
    fn test_autolink_never_splits_entities() {
        let out = autolink(&escape_html("example.com/a& b"));
        assert!(out.contains("href=\"https://example.com/a\""));
        assert!(out.ends_with(">example.com/a</a>&amp; b"));

        let out = autolink(&escape_html("example.com\"x\""));
        assert!(out.contains("href=\"https://example.com\""));
        assert!(out.ends_with(">example.com</a>&quot;x&quot;"));

        let out = autolink(&escape_html("&example.com"));
        assert!(out.starts_with("&amp;<a "));
        assert!(out.ends_with(">example.com</a>"));
    }

    #[test]
    fn test_autolink_keeps_escaped_query_ampersand() {
        let out = autolink(&escape_html("example.com/?a=1&b=2"));
        assert!(out.contains("href=\"https://example.com/?a=1&amp;b=2\""));
        assert!(out.contains(">example.com/?a=1&amp;b=2</a>"));
    }

    #[test]
    fn test_autolink_leaves_non_domains() {
        assert_eq!(autolink("not a domain token"), "not a domain token");
        assert_eq!(autolink("version 1.2"), "version 1.2");
        assert_eq!(autolink("javascript:alert(1)"), "javascript:alert(1)");
    }

    #[test]
    fn test_vet_link() {
        assert_eq!(vet_link("example.com").unwrap(), "https://example.com");
        assert_eq!(vet_link("HTTP://example.com").unwrap(), "https://example.com");
        assert_eq!(vet_link("1.2"), Err(UnsafeLinkSkipped::BadHost));
        assert_eq!(vet_link("192.168.0.1"), Err(UnsafeLinkSkipped::BadHost));
        assert!(vet_link("javascript:alert(document.cookie").is_err());
        assert!(vet_link("javascript://example.com/x").is_err());
    }

    #[test]
    fn test_is_plausible_host() {
        assert!(is_plausible_host("example.com"));
        assert!(is_plausible_host("a.b-c.example.co"));
        assert!(!is_plausible_host("localhost"));
        assert!(!is_plausible_host("example.c"));
        assert!(!is_plausible_host("example.123"));
        assert!(!is_plausible_host(".example.com"));
    }

    #[test]
    fn test_hashtags() {
        let renderer = Renderer::default();
        let out = renderer.link_hashtags("#Rust and #WebDev");

        assert!(out.starts_with("<a target=\"_self\""));
        assert!(out.contains("keywords=rust&amp;origin=HASH_TAG_FROM_FEED"));
        assert!(out.contains("keywords=webdev&amp;origin"));
        assert!(out.contains("<span aria-hidden=\"true\">#</span>Rust</span>"));
        assert!(out.contains(" and <a "));
    }

    #[test]
    fn test_hashtags_need_boundary() {
        let renderer = Renderer::default();
        assert_eq!(renderer.link_hashtags("issue#12"), "issue#12");
        // Escaped apostrophes carry a '#' that must not become a tag
        assert_eq!(renderer.link_hashtags("it&#039;s"), "it&#039;s");
    }

    #[test]
    fn test_hashtags_keep_newline_boundary() {
        let renderer = Renderer::default();
        let out = renderer.link_hashtags("line\n#tag");
        assert!(out.starts_with("line\n<a "));
    }

    #[test]
    fn test_custom_hashtag_search() {
        let renderer = Renderer::new("https://search.test/q");
        let out = renderer.link_hashtags("#X");
        assert!(out.contains("href=\"https://search.test/q?keywords=x&amp;"));
    }

    #[test]
    fn test_break_lines() {
        assert_eq!(break_lines("a\nb\n"), "a<span><br></span>b<span><br></span>");
    }

    #[test]
    fn test_render_pipeline() {
        let renderer = Renderer::default();
        let out = renderer.render("<b>Hi</b>\nread example.com #News");

        assert!(out.starts_with("&lt;b&gt;Hi&lt;/b&gt;<span><br></span>read "));
        assert!(out.contains(">example.com</a>"));
        assert!(out.contains("keywords=news"));
        assert!(!out.contains("<b>"));
    }
}
