//! Record store abstraction and the in-memory implementation.
//!
//! The sync component only ever reads records and updates their metadata;
//! it never creates or deletes them.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub type RecordId = u64;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(RecordId),

    #[error("Record store lock poisoned")]
    Poisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A local content record linked to a remote topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalRecord {
    pub id: RecordId,
    /// Remote topic id; the lookup key for incoming webhooks.
    #[serde(default)]
    pub topic_id: Option<u64>,
    /// Remote topic URL recorded when the record was published.
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub sync_post_comments: bool,
    #[serde(default)]
    pub comments_count: u64,
}

impl LocalRecord {
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn with_topic_id(mut self, topic_id: u64) -> Self {
        self.topic_id = Some(topic_id);
        self
    }

    pub fn with_permalink(mut self, permalink: impl Into<String>) -> Self {
        self.permalink = Some(permalink.into());
        self
    }
}

/// Storage for local records, injected into the sync component.
pub trait RecordStore: Send + Sync {
    /// Ids of all records whose topic id equals `topic_id`.
    fn find_by_topic_id(&self, topic_id: u64) -> Result<Vec<RecordId>>;

    /// Ids of records whose permalink path ends with `suffix`.
    fn find_by_permalink_suffix(&self, suffix: &str) -> Result<Vec<RecordId>>;

    fn get(&self, id: RecordId) -> Result<Option<LocalRecord>>;

    fn set_topic_id(&self, id: RecordId, topic_id: u64) -> Result<()>;

    fn set_sync_fields(
        &self,
        id: RecordId,
        sync_post_comments: bool,
        comments_count: u64,
    ) -> Result<()>;
}

/// Lock-guarded map of records, shared across request handlers.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<BTreeMap<RecordId, LocalRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = LocalRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().map(|r| (r.id, r)).collect()),
        }
    }

    /// Seed a store from a JSON array of records.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let records: Vec<LocalRecord> = serde_json::from_str(&raw)?;

        info!(
            path = %path.as_ref().display(),
            record_count = records.len(),
            "record_store_seeded"
        );

        Ok(Self::with_records(records))
    }

    pub fn insert(&self, record: LocalRecord) -> Result<()> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        records.insert(record.id, record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update<F>(&self, id: RecordId, apply: F) -> Result<()>
    where
        F: FnOnce(&mut LocalRecord),
    {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        let record = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        apply(record);
        Ok(())
    }
}

impl RecordStore for MemoryRecordStore {
    fn find_by_topic_id(&self, topic_id: u64) -> Result<Vec<RecordId>> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records
            .values()
            .filter(|r| r.topic_id == Some(topic_id))
            .map(|r| r.id)
            .collect())
    }

    fn find_by_permalink_suffix(&self, suffix: &str) -> Result<Vec<RecordId>> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records
            .values()
            .filter(|r| {
                r.permalink
                    .as_deref()
                    .map(|p| p.trim_end_matches('/').ends_with(suffix))
                    .unwrap_or(false)
            })
            .map(|r| r.id)
            .collect())
    }

    fn get(&self, id: RecordId) -> Result<Option<LocalRecord>> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.get(&id).cloned())
    }

    fn set_topic_id(&self, id: RecordId, topic_id: u64) -> Result<()> {
        self.update(id, |r| r.topic_id = Some(topic_id))
    }

    fn set_sync_fields(
        &self,
        id: RecordId,
        sync_post_comments: bool,
        comments_count: u64,
    ) -> Result<()> {
        self.update(id, |r| {
            r.sync_post_comments = sync_post_comments;
            r.comments_count = comments_count;
        })
    }
}
