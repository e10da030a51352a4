//! Byte-exact text <-> Base64 codec.
//!
//! Text is converted to UTF-8 bytes and then to the standard Base64
//! alphabet. Decoding is as lenient as a browser's `atob`: `=` padding is
//! optional, ASCII whitespace anywhere in the payload is ignored, and
//! non-zero trailing bits in the last symbol are accepted.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use thiserror::Error;

/// Standard alphabet, padded on encode, lenient on decode
const ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Failure to turn a payload back into text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Invalid Base64 payload: {0}")]
    InvalidBase64(String),

    #[error("Payload is not valid UTF-8: {0}")]
    InvalidUtf8(String),
}

/// Encode text as a Base64 token
pub fn encode(text: &str) -> String {
    ENGINE.encode(text.as_bytes())
}

/// Decode a Base64 token back into text
pub fn decode(payload: &str) -> Result<String, DecodeError> {
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = ENGINE
        .decode(compact)
        .map_err(|e| DecodeError::InvalidBase64(e.to_string()))?;

    String::from_utf8(bytes).map_err(|e| DecodeError::InvalidUtf8(e.utf8_error().to_string()))
}
