//! Link Protocol Integration Tests
//!
//! Tests for building, classifying, and parsing two-level share links.

use fauxpost::core::codec;
use fauxpost::core::link::{canonical_key, classify, query_param, url_escape};
use fauxpost::core::{LinkError, LinkProtocol, LinkSettings};
use fauxpost::domain::IncomingLink;

#[test]
fn test_round_trip_scenario() {
    let protocol = LinkProtocol::default();
    let link = protocol.build("urn:li:activity:123", "Hello, World! #Test");

    let parsed = protocol.parse(&link.outer_key).unwrap();
    assert_eq!(parsed.identifier.as_deref(), Some("urn:li:activity:123"));
    assert_eq!(parsed.text, "Hello, World! #Test");
}

#[test]
fn test_round_trip_unicode_and_markup() {
    let protocol = LinkProtocol::default();
    let texts = [
        "",
        "line one\nline two\n\n",
        "emoji 🎉🚀 and CJK 漢字",
        "<script>alert('x')</script> & \"quotes\"",
        "a+b=c / d?e#f%20",
    ];

    for text in texts {
        let link = protocol.build("urn:li:activity:42", text);
        let parsed = protocol.parse(&link.outer_key).unwrap();
        assert_eq!(parsed.text, text, "Round trip failed for {:?}", text);
        assert_eq!(parsed.identifier.as_deref(), Some("urn:li:activity:42"));
    }
}

#[test]
fn test_opened_share_link_parses_to_same_text() {
    // The browser hands back the full URL; the key comes out unescaped
    let protocol = LinkProtocol::default();
    let link = protocol.build("urn:li:activity:77", "Rewritten: 100% better?");

    let outer_key = match classify(&link.target_url) {
        Some(IncomingLink::Redirect { outer_key }) => outer_key,
        other => panic!("Expected redirect, got {:?}", other),
    };

    assert_eq!(canonical_key(&outer_key).unwrap(), link.outer_key);
    let parsed = protocol.parse(&outer_key).unwrap();
    assert_eq!(parsed.text, "Rewritten: 100% better?");
}

#[test]
fn test_inner_url_is_decodable_on_its_own() {
    let protocol = LinkProtocol::default();
    let inner = protocol.inner_url("urn:li:activity:5", "payload text");

    let payload = match classify(&inner) {
        Some(IncomingLink::Decoded { payload }) => payload,
        other => panic!("Expected decoded data, got {:?}", other),
    };
    assert_eq!(codec::decode(&payload).unwrap(), "payload text");
}

#[test]
fn test_parse_errors() {
    let protocol = LinkProtocol::default();

    assert!(matches!(
        protocol.parse("!!!!"),
        Err(LinkError::Decode(_))
    ));

    // Outer decodes but is not UTF-8
    let not_utf8 = url_escape("//4=");
    assert!(matches!(
        protocol.parse(&not_utf8),
        Err(LinkError::Decode(_))
    ));

    // Inner URL with an undecodable payload
    let bad_inner = "https://www.linkedin.com/feed/update/urn:li:activity:1#fauxPostDecodedData?vkey=%%%";
    let outer = url_escape(&codec::encode(bad_inner));
    assert!(protocol.parse(&outer).is_err());
}

#[test]
fn test_missing_inner_payload() {
    let protocol = LinkProtocol::default();
    let outer = url_escape(&codec::encode(
        "https://www.linkedin.com/feed/update/urn:li:activity:1#fauxPostDecodedData?other=1",
    ));

    match protocol.parse(&outer) {
        Err(LinkError::MissingPayload { inner_url }) => {
            assert!(inner_url.contains("urn:li:activity:1"));
        }
        other => panic!("Expected MissingPayload, got {:?}", other),
    }
}

#[test]
fn test_query_param_precedence() {
    assert_eq!(
        query_param("https://h.test/p?vkey=q#frag?vkey=h", "vkey").as_deref(),
        Some("q")
    );
    assert_eq!(
        query_param("https://h.test/p#frag?vkey=h", "vkey").as_deref(),
        Some("h")
    );
    assert_eq!(query_param("https://h.test/p#frag", "vkey"), None);
    assert_eq!(query_param("not a url", "vkey"), None);
}

#[test]
fn test_share_url_from_stored_key() {
    let protocol = LinkProtocol::new(LinkSettings {
        share_base: "https://share.test/feed".to_string(),
        ..Default::default()
    });
    let link = protocol.build("urn:li:activity:8", "x");

    assert_eq!(protocol.share_url(&link.outer_key), link.target_url);
    assert!(link
        .target_url
        .starts_with("https://share.test/feed#fauxPost?vkey="));
}
