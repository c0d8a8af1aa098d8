use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::session::{SessionPatch, SessionRecord, SessionStatus};

/// The durable session collection, keyed by session id.
///
/// `update` is the single atomic point-write the concurrency model relies
/// on: it applies a patch to one record keyed by id in a single step, so no
/// locking is needed above this layer. Ordering between a reaper pass and a
/// concurrent caller-initiated update on the same id is last-write-wins.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists a new session record.
    async fn insert(&self, record: &SessionRecord) -> Result<()>;

    /// Finds a session by its id.
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<SessionRecord>>;

    /// Lists sessions, optionally filtered by status.
    async fn list(&self, status: Option<SessionStatus>) -> Result<Vec<SessionRecord>>;

    /// Applies a patch to one record, returning the updated record, or
    /// `None` when no session matches the id.
    async fn update(&self, id: &Uuid, patch: SessionPatch) -> Result<Option<SessionRecord>>;

    /// Deletes every session, returning how many were removed.
    async fn purge(&self) -> Result<u64>;
}
