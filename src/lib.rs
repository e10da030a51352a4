//! fauxpost - Rewrite short posts and share them through self-contained links
//!
//! A rewritten ("Faux") version of a post travels inside its own URL: no
//! server stores it. Opening the link recovers the text and ties it back to
//! the identifier of the original content.
//!
//! # Architecture
//!
//! - The text is Base64-encoded into an inner URL pointing at the original
//!   content, and that URL is encoded again into the outer share link
//! - Recovered text is rendered to markup by escaping first, then adding
//!   safe links and hashtag links
//! - Records `{original, decoded, key}` are kept per identifier with a
//!   write-once original
//!
//! # Modules
//!
//! - `adapters`: Persistence backends (memory, JSON file)
//! - `core`: Codec, link protocol, renderer, record store, session
//! - `domain`: Data structures (FauxPostRecord, ShareLink)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Author a share link for a post
//! echo "My take" | fauxpost author urn:li:activity:123
//!
//! # Consume a share link
//! fauxpost open 'https://www.linkedin.com/feed/_#fauxPost?vkey=...'
//!
//! # List saved posts
//! fauxpost list
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};
pub use core::{LinkProtocol, Opened, RecordStore, Renderer, Session, SessionSettings};
pub use domain::{FauxPostRecord, RecordUpdate, ShareLink};
