//! JSON-file-backed user record store.
//!
//! The whole user map lives in one JSON object keyed by user id and is
//! rewritten in full on every save. The write is not atomic and there is no
//! locking: concurrent writers can lose updates, and a crash mid-write can
//! corrupt the file for every user. A corrupt or missing file reads as empty.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use super::{StoreError, UserStore};
use crate::models::UserRecord;

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_map(&self) -> Result<HashMap<String, UserRecord>, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };

        match serde_json::from_str(&raw) {
            Ok(users) => Ok(users),
            Err(e) => {
                tracing::warn!(
                    "User store at {:?} is corrupt, treating as empty: {}",
                    self.path,
                    e
                );
                Ok(HashMap::new())
            }
        }
    }
}

#[async_trait]
impl UserStore for JsonFileStore {
    async fn load(&self) -> Result<HashMap<String, UserRecord>, StoreError> {
        self.read_map().await
    }

    async fn get(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.read_map().await?.remove(user_id))
    }

    async fn save(&self, user_id: &str, record: UserRecord) -> Result<(), StoreError> {
        let mut users = self.read_map().await?;
        users.insert(user_id.to_string(), record);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string(&users)?;
        tokio::fs::write(&self.path, content).await?;

        Ok(())
    }
}
