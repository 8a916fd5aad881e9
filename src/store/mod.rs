pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::UserRecord;

/// Errors raised by user-record persistence.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Trait for persisting user records keyed by user id.
///
/// Handlers hold this as `Arc<dyn UserStore>` so tests and embedders can
/// substitute an in-memory or transactional implementation.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Load the full user map. Missing or unreadable backing data yields an
    /// empty map rather than an error.
    async fn load(&self) -> Result<HashMap<String, UserRecord>, StoreError>;

    /// Fetch a single record. Returns `None` for unknown users.
    async fn get(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Save a record, replacing any existing record for this user in full.
    /// Callers merge fields themselves before saving.
    async fn save(&self, user_id: &str, record: UserRecord) -> Result<(), StoreError>;
}
