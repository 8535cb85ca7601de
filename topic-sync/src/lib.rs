//! Topic Sync - Discourse topic state synchronization.
//!
//! Receives signed Discourse post webhooks and copies the topic's comment
//! count onto every local record linked to that topic.
//!
//! ## Architecture
//!
//! ```text
//! Discourse → Web Server → WebhookTopicSync → RecordStore
//! ```

pub mod config;
pub mod sync;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use sync::{
    LocalRecord, MemoryRecordStore, RecordStore, SettingsStore, StaticSettings, StoreError,
    SyncConfig, SyncResponse, WebhookRequest, WebhookTopicSync,
};
pub use web::AppState;
