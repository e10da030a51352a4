//! Session: the context object that runs the authoring and consumption
//! flows.
//!
//! A session owns the persistence handle, the enable toggle, and the link
//! and render settings. Nothing here is global; callers start a session,
//! pass it to whatever needs it, and stop it when done.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::link::{
    canonical_key, classify, decode_payload, find_identifier, LinkError, LinkProtocol,
    LinkSettings,
};
use super::record_store::RecordStore;
use super::transform::Renderer;
use crate::adapters::{KeyValueStore, StoreError};
use crate::domain::{fingerprint, FauxPostRecord, IncomingLink, RecordUpdate, ShareLink};

/// Backend key of the global enable toggle
pub const ENABLED_KEY: &str = "fauxPostEnabled";

/// Errors surfaced by session flows
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("FauxPost is disabled")]
    Disabled,
}

/// Settings a session starts with
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub links: LinkSettings,

    /// Toggle value used when none has been persisted yet
    pub enabled_by_default: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            links: LinkSettings::default(),
            enabled_by_default: true,
        }
    }
}

/// Outcome of opening a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opened {
    /// Nothing to consume, or the session is disabled
    Ignored,

    /// An outer share link was decoded; the viewer should go to `inner_url`
    Redirected {
        identifier: Option<String>,
        inner_url: String,
        text: String,
        markup: String,
        saved: bool,
    },

    /// An inner data URL was decoded and is ready to display
    Decoded {
        identifier: Option<String>,
        text: String,
        markup: String,
        saved: bool,
    },
}

/// Running FauxPost context
pub struct Session {
    backend: Arc<dyn KeyValueStore>,
    records: RecordStore,
    links: LinkProtocol,
    renderer: Renderer,
    enabled: bool,
}

impl Session {
    /// Start a session, reading (and on first use, persisting) the toggle
    pub async fn start(
        backend: Arc<dyn KeyValueStore>,
        settings: SessionSettings,
    ) -> Result<Self, SessionError> {
        let key = ENABLED_KEY.to_string();
        let stored = backend.get(Some(std::slice::from_ref(&key))).await?;

        let enabled = match stored.get(ENABLED_KEY) {
            Some(value) => value.as_bool().unwrap_or(false),
            None => {
                backend
                    .set([(key, Value::Bool(settings.enabled_by_default))].into())
                    .await?;
                info!(
                    enabled = settings.enabled_by_default,
                    "Initialized FauxPost toggle"
                );
                settings.enabled_by_default
            }
        };

        debug!(backend = backend.name(), enabled, "Session started");

        Ok(Self {
            records: RecordStore::new(Arc::clone(&backend)),
            renderer: Renderer::new(settings.links.hashtag_search.clone()),
            links: LinkProtocol::new(settings.links),
            backend,
            enabled,
        })
    }

    /// End the session
    pub fn stop(self) {
        debug!(backend = self.backend.name(), "Session stopped");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Persist a new toggle value
    pub async fn set_enabled(&mut self, enabled: bool) -> Result<(), SessionError> {
        self.backend
            .set([(ENABLED_KEY.to_string(), Value::Bool(enabled))].into())
            .await?;
        self.enabled = enabled;
        info!(enabled, "FauxPost toggled");
        Ok(())
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn links(&self) -> &LinkProtocol {
        &self.links
    }

    /// Render rewritten text the way a viewer would see it
    pub fn preview(&self, text: &str) -> String {
        self.renderer.render(text)
    }

    /// Share URL for a stored record, if it has a key
    pub fn share_url(&self, record: &FauxPostRecord) -> Option<String> {
        record.key.as_deref().map(|key| self.links.share_url(key))
    }

    /// Build a share link for rewritten text and record it.
    ///
    /// The rewritten text is trimmed before encoding; `original` is kept only
    /// if the record has none yet.
    pub async fn author(
        &self,
        identifier: &str,
        original: Option<&str>,
        rewritten: &str,
    ) -> Result<ShareLink, SessionError> {
        if !self.enabled {
            return Err(SessionError::Disabled);
        }

        let text = rewritten.trim();
        let link = self.links.build(identifier, text);

        let mut update = RecordUpdate::decoded(text).with_key(link.outer_key.clone());
        if let Some(original) = original {
            update = update.with_original(original);
        }
        self.records.save(identifier, update).await?;

        info!(identifier, text_len = text.len(), "Authored share link");
        Ok(link)
    }

    /// Consume an opened URL.
    ///
    /// Share links are decoded and saved with their key; inner data URLs are
    /// decoded and saved with the host's `original` text when given. Decode
    /// failures abort before anything is written.
    pub async fn open(&self, url: &str, original: Option<&str>) -> Result<Opened, SessionError> {
        if !self.enabled {
            warn!("FauxPost is disabled, ignoring URL");
            return Ok(Opened::Ignored);
        }

        match classify(url) {
            None => {
                debug!("URL carries nothing to consume");
                Ok(Opened::Ignored)
            }
            Some(IncomingLink::Redirect { outer_key }) => self.consume_redirect(&outer_key).await,
            Some(IncomingLink::Decoded { payload }) => {
                self.consume_decoded(url, &payload, original).await
            }
        }
    }

    async fn consume_redirect(&self, outer_key: &str) -> Result<Opened, SessionError> {
        let parsed = self.links.parse(outer_key)?;
        let key = canonical_key(outer_key).map_err(LinkError::from)?;

        let saved = match parsed.identifier.as_deref() {
            Some(identifier) => {
                self.records
                    .save(identifier, RecordUpdate::decoded(parsed.text.clone()).with_key(key))
                    .await?;
                true
            }
            None => {
                warn!("Share link has no content identifier, not saving");
                false
            }
        };

        info!(
            identifier = parsed.identifier.as_deref().unwrap_or("<none>"),
            saved, "Consumed share link"
        );

        Ok(Opened::Redirected {
            markup: self.renderer.render(&parsed.text),
            identifier: parsed.identifier,
            inner_url: parsed.inner_url,
            text: parsed.text,
            saved,
        })
    }

    async fn consume_decoded(
        &self,
        url: &str,
        payload: &str,
        original: Option<&str>,
    ) -> Result<Opened, SessionError> {
        let text = decode_payload(payload).map_err(|e| {
            warn!(error = %e, "Could not decode vkey");
            LinkError::from(e)
        })?;
        let identifier = find_identifier(url);

        let saved = match identifier.as_deref() {
            Some(id) => {
                let mut update = RecordUpdate::decoded(text.clone());
                if let Some(original) = original {
                    update = update.with_original(original);
                }
                self.records.save(id, update).await?;
                true
            }
            None => false,
        };

        info!(
            identifier = identifier.as_deref().unwrap_or("<none>"),
            saved, "Consumed decoded data"
        );

        Ok(Opened::Decoded {
            markup: self.renderer.render(&text),
            identifier,
            text,
            saved,
        })
    }

    /// Whether the source text behind `identifier` differs from the
    /// original recorded for it. Unknown originals never count as changed.
    pub async fn original_changed(
        &self,
        identifier: &str,
        current_text: &str,
    ) -> Result<bool, SessionError> {
        let record = self.records.get_one(identifier).await?;
        Ok(record
            .original_fingerprint()
            .is_some_and(|stored| stored != fingerprint(current_text)))
    }
}
