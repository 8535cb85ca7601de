//! Discourse topic sync.
//!
//! Applies the comment count carried by a verified Discourse post webhook
//! to every local record linked to the post's topic.
//!
//! ## Processing Flow
//!
//! ```text
//! WebhookRequest → verify_signature() → RemotePayload → RecordStore updates → SyncResponse
//! ```

pub mod store;
pub mod types;

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::web::signature::verify_signature;

pub use store::{LocalRecord, MemoryRecordStore, RecordId, RecordStore, StoreError};
pub use types::{RemotePayload, RemotePost, SyncResponse, WebhookRequest};

/// Webhook settings, read once per request.
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    /// Shared secret configured on both sides of the webhook.
    pub webhook_secret: Option<String>,
    /// Master switch; when off every delivery is rejected.
    pub webhook_enabled: bool,
    /// Fall back to permalink matching for records that predate topic id tracking.
    pub match_old_topics: bool,
}

/// Source of the current webhook settings.
pub trait SettingsStore: Send + Sync {
    fn sync_config(&self) -> SyncConfig;
}

/// Settings fixed at start-up.
#[derive(Debug, Clone)]
pub struct StaticSettings(pub SyncConfig);

impl SettingsStore for StaticSettings {
    fn sync_config(&self) -> SyncConfig {
        self.0.clone()
    }
}

/// Syncs Discourse topic state into local records.
#[derive(Clone)]
pub struct WebhookTopicSync {
    settings: Arc<dyn SettingsStore>,
    store: Arc<dyn RecordStore>,
}

impl WebhookTopicSync {
    pub fn new(settings: Arc<dyn SettingsStore>, store: Arc<dyn RecordStore>) -> Self {
        Self { settings, store }
    }

    /// Verify a webhook delivery and apply its topic state.
    ///
    /// Nothing is written unless the signature checks out. A body that is not
    /// valid JSON, or lacks a topic id or comment count, is acknowledged
    /// without touching any record so the sender does not keep redelivering it.
    pub fn update_topic_content(&self, request: &WebhookRequest) -> SyncResponse {
        let config = self.settings.sync_config();

        info!(
            event_type = request.event_type.as_deref().unwrap_or(""),
            event_name = request.event_name.as_deref().unwrap_or(""),
            content_type = request.content_type.as_deref().unwrap_or(""),
            body_length = request.body.len(),
            has_signature = request.signature.is_some(),
            "topic_sync_webhook_received"
        );

        if !verify_signature(&request.body, request.signature.as_deref(), &config) {
            warn!("topic_sync_webhook_not_verified");
            return SyncResponse::not_verified();
        }

        let post = match parse_post(&request.body) {
            Some(post) => post,
            None => return SyncResponse::updated(),
        };

        match self.apply(&post, &config) {
            Ok(updated) => {
                info!(
                    topic_id = ?post.topic_id,
                    records_updated = updated,
                    "topic_sync_complete"
                );
                SyncResponse::updated()
            }
            Err(e) => {
                error!(error = %e, topic_id = ?post.topic_id, "topic_sync_store_failed");
                SyncResponse::store_failed()
            }
        }
    }

    /// Write the sync fields on every record linked to the post's topic.
    ///
    /// Returns the number of records updated.
    fn apply(&self, post: &RemotePost, config: &SyncConfig) -> Result<usize, StoreError> {
        let (topic_id, comments_count) = match (post.topic_id, post.derived_comments_count()) {
            (Some(topic_id), Some(count)) => (topic_id, count),
            (topic_id, count) => {
                warn!(
                    has_topic_id = topic_id.is_some(),
                    has_comments_count = count.is_some(),
                    "topic_sync_payload_incomplete"
                );
                return Ok(0);
            }
        };

        let ids = self.store.find_by_topic_id(topic_id)?;
        let updated = if !ids.is_empty() {
            self.sync_records(&ids, comments_count)?
        } else if config.match_old_topics {
            self.sync_old_topic(post, topic_id, comments_count)?
        } else {
            0
        };

        if updated == 0 {
            info!(topic_id = topic_id, "topic_sync_no_matching_records");
            return Ok(0);
        }

        info!(
            topic_id = topic_id,
            comments_count = comments_count,
            records_updated = updated,
            "topic_sync_records_updated"
        );

        Ok(updated)
    }

    fn sync_records(&self, ids: &[RecordId], comments_count: u64) -> Result<usize, StoreError> {
        let mut updated = 0;
        for &id in ids {
            if self.write_sync_fields(id, comments_count)? {
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Sync records found by permalink, then store the topic id on them.
    ///
    /// The link is written last so a failed sync leaves the record unlinked
    /// and the next delivery matches it by permalink again.
    fn sync_old_topic(
        &self,
        post: &RemotePost,
        topic_id: u64,
        comments_count: u64,
    ) -> Result<usize, StoreError> {
        let suffix = match post.permalink_suffix() {
            Some(s) => s,
            None => return Ok(0),
        };

        let mut updated = 0;
        for id in self.store.find_by_permalink_suffix(&suffix)? {
            if !self.write_sync_fields(id, comments_count)? {
                continue;
            }

            match self.store.set_topic_id(id, topic_id) {
                Ok(()) => {
                    info!(record_id = id, topic_id = topic_id, "topic_sync_old_topic_linked");
                    updated += 1;
                }
                Err(StoreError::NotFound(_)) => {
                    warn!(record_id = id, "topic_sync_record_vanished");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(updated)
    }

    /// Returns `false` when the record was removed between lookup and write.
    fn write_sync_fields(&self, id: RecordId, comments_count: u64) -> Result<bool, StoreError> {
        match self.store.set_sync_fields(id, true, comments_count) {
            Ok(()) => Ok(true),
            Err(StoreError::NotFound(_)) => {
                warn!(record_id = id, "topic_sync_record_vanished");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

fn parse_post(body: &[u8]) -> Option<RemotePost> {
    match serde_json::from_slice::<RemotePayload>(body) {
        Ok(payload) => {
            if payload.post.is_none() {
                warn!("topic_sync_payload_missing_post");
            }
            payload.post
        }
        Err(e) => {
            warn!(
                error = %e,
                body_preview = %String::from_utf8_lossy(&body[..body.len().min(200)]),
                "topic_sync_payload_parse_failed"
            );
            None
        }
    }
}
