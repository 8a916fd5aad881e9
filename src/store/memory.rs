//! In-memory user record store for tests and embedders that bring their own
//! persistence.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{StoreError, UserStore};
use crate::models::UserRecord;

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<String, UserRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, UserRecord>> {
        self.users.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn load(&self) -> Result<HashMap<String, UserRecord>, StoreError> {
        Ok(self.lock().clone())
    }

    async fn get(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.lock().get(user_id).cloned())
    }

    async fn save(&self, user_id: &str, record: UserRecord) -> Result<(), StoreError> {
        self.lock().insert(user_id.to_string(), record);
        Ok(())
    }
}
