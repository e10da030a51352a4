//! Core FauxPost logic.
//!
//! This module contains:
//! - Codec: byte-exact text <-> Base64
//! - Link: the two-level share link protocol
//! - Transform: text to safe markup
//! - RecordStore: merged per-identifier persistence
//! - Session: the context object running the flows

pub mod codec;
pub mod link;
pub mod record_store;
pub mod session;
pub mod transform;

// Re-export commonly used types
pub use codec::DecodeError;
pub use link::{classify, LinkError, LinkProtocol, LinkSettings};
pub use record_store::{RecordStore, RECORD_PREFIX};
pub use session::{Opened, Session, SessionError, SessionSettings, ENABLED_KEY};
pub use transform::{Renderer, UnsafeLinkSkipped};
