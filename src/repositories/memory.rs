use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::session::{SessionPatch, SessionRecord, SessionStatus};
use crate::repositories::session::SessionStore;

/// In-memory session store.
///
/// Each operation takes the lock once, so a single record's
/// read-modify-write is atomic - the same guarantee the SQL store gets from
/// `UPDATE ... RETURNING`.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Uuid, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites a record wholesale, bypassing the patch mechanism.
    /// Lets tests plant records with arbitrary timestamps or corrupt
    /// envelopes.
    pub async fn replace(&self, record: SessionRecord) {
        self.sessions.write().await.insert(record.id, record);
    }

    /// The number of stored records.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, record: &SessionRecord) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&record.id) {
            return Err(AppError::Internal(format!(
                "Duplicate session id: {}",
                record.id
            )));
        }
        sessions.insert(record.id, record.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<SessionRecord>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn list(&self, status: Option<SessionStatus>) -> Result<Vec<SessionRecord>> {
        let sessions = self.sessions.read().await;
        let mut records: Vec<SessionRecord> = sessions
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn update(&self, id: &Uuid, patch: SessionPatch) -> Result<Option<SessionRecord>> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(record) => {
                if let Some(status) = patch.status {
                    record.status = status;
                }
                if let Some(last_accessed) = patch.last_accessed {
                    record.last_accessed = last_accessed;
                }
                Ok(Some(record.clone()))
            }
            None => Ok(None),
        }
    }

    async fn purge(&self) -> Result<u64> {
        let mut sessions = self.sessions.write().await;
        let count = sessions.len() as u64;
        sessions.clear();
        Ok(count)
    }
}
