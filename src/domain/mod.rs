//! Domain types for fauxpost.
//!
//! This module contains the core data structures:
//! - Record: the persisted `{original, decoded, key}` triple
//! - Link: share links and what an opened URL carries

pub mod link;
pub mod record;

// Re-export commonly used types
pub use link::{IncomingLink, ParsedLink, ShareLink};
pub use record::{fingerprint, FauxPostRecord, RecordUpdate};
