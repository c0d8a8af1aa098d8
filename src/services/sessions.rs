use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::crypto::envelope::EnvelopeCipher;
use crate::error::{AppError, Result};
use crate::models::session::{
    NewSession, SecureFields, SessionPatch, SessionRecord, SessionStatus, SessionView,
};
use crate::repositories::session::SessionStore;

/// The session state machine.
///
/// One instance is constructed at startup and shared; it owns no mutable
/// state of its own - the store is the only shared mutable resource, and
/// every write below is a single-record atomic patch.
pub struct SessionLifecycle {
    store: Arc<dyn SessionStore>,
    cipher: EnvelopeCipher,
}

impl SessionLifecycle {
    /// Creates a new `SessionLifecycle` over a store and cipher.
    pub fn new(store: Arc<dyn SessionStore>, cipher: EnvelopeCipher) -> Self {
        Self { store, cipher }
    }

    /// Creates a session: fresh id, both timestamps stamped to now,
    /// sensitive fields sealed, status `Active`.
    ///
    /// The returned view carries the plaintext id - it is the caller's
    /// handle for every later operation.
    pub async fn create(&self, new: NewSession) -> Result<SessionView> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let record = SessionRecord {
            id,
            nickname: new.nickname.clone(),
            email: self.cipher.seal_str(&new.email)?,
            mac_address: self.cipher.seal_str(&new.mac_address)?,
            client_ip: self.cipher.seal_str(&new.client_ip)?,
            server_ip: self.cipher.seal_str(&new.server_ip)?,
            status: SessionStatus::Active,
            created_at: now,
            last_accessed: now,
        };

        self.store.insert(&record).await?;
        tracing::info!("✅ Session created: {}", id);

        let secure = SecureFields {
            email: new.email,
            mac_address: new.mac_address,
            client_ip: new.client_ip,
            server_ip: new.server_ip,
        };
        Ok(Self::view(&record, Some(secure)))
    }

    /// Refreshes a session on access: last-access stamped to now, status
    /// back to `Active`.
    ///
    /// Terminal sessions are returned unchanged - an access refresh never
    /// resurrects a terminated session.
    pub async fn touch(&self, id: &Uuid) -> Result<SessionView> {
        let record = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound)?;

        if record.status.is_terminal() {
            tracing::debug!("Touch on terminal session {} ignored", id);
            let secure = self.open_fields(&record)?;
            return Ok(Self::view(&record, Some(secure)));
        }

        let updated = self
            .store
            .update(id, SessionPatch::status_touched(SessionStatus::Active))
            .await?
            .ok_or(AppError::NotFound)?;

        let secure = self.open_fields(&updated)?;
        Ok(Self::view(&updated, Some(secure)))
    }

    /// Terminates a session at the holder's request.
    ///
    /// Valid from `Active` and `Idle`; on an already-terminal session it is
    /// an idempotent administrative override.
    pub async fn terminate(&self, id: &Uuid) -> Result<SessionView> {
        let updated = self
            .store
            .update(id, SessionPatch::status_touched(SessionStatus::UserTerminated))
            .await?
            .ok_or(AppError::NotFound)?;

        tracing::info!("✅ Session terminated by user: {}", id);
        Ok(Self::view(&updated, None))
    }

    /// Administrative status override, outside normal lifecycle logic.
    pub async fn set_status(&self, id: &Uuid, status: SessionStatus) -> Result<SessionView> {
        let updated = self
            .store
            .update(id, SessionPatch::status_touched(status))
            .await?
            .ok_or(AppError::NotFound)?;

        tracing::info!("Session {} status set to {}", id, status);
        Ok(Self::view(&updated, None))
    }

    /// Reads one session, decrypting its sensitive fields and computing
    /// idle/duration metrics.
    ///
    /// A decrypt failure here is surfaced as an error - unlike the bulk
    /// listings, a single-record lookup has nothing to fall back on.
    pub async fn get(&self, id: &Uuid) -> Result<SessionView> {
        let record = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound)?;

        let secure = self.open_fields(&record)?;
        Ok(Self::view(&record, Some(secure)))
    }

    /// Lists all `Active` sessions, fields decrypted best-effort.
    pub async fn list_active(&self) -> Result<Vec<SessionView>> {
        let records = self.store.list(Some(SessionStatus::Active)).await?;
        Ok(self.views_best_effort(records))
    }

    /// Lists every session regardless of status, fields decrypted
    /// best-effort.
    pub async fn list_all(&self) -> Result<Vec<SessionView>> {
        let records = self.store.list(None).await?;
        Ok(self.views_best_effort(records))
    }

    /// Administrative bulk delete. Irreversible.
    pub async fn purge_all(&self) -> Result<u64> {
        let count = self.store.purge().await?;
        tracing::warn!("⚠️  Purged {} sessions", count);
        Ok(count)
    }

    /// Decrypts a record's sealed fields.
    fn open_fields(&self, record: &SessionRecord) -> Result<SecureFields> {
        Ok(SecureFields {
            email: self.cipher.open_str(&record.email)?,
            mac_address: self.cipher.open_str(&record.mac_address)?,
            client_ip: self.cipher.open_str(&record.client_ip)?,
            server_ip: self.cipher.open_str(&record.server_ip)?,
        })
    }

    /// Builds views for a batch of records. A record whose envelopes fail
    /// to open is surfaced with `secure: None` instead of aborting the
    /// listing; siblings are unaffected.
    fn views_best_effort(&self, records: Vec<SessionRecord>) -> Vec<SessionView> {
        records
            .into_iter()
            .map(|record| {
                let secure = match self.open_fields(&record) {
                    Ok(secure) => Some(secure),
                    Err(e) => {
                        tracing::warn!("⚠️  Could not decrypt session {}: {}", record.id, e);
                        None
                    }
                };
                Self::view(&record, secure)
            })
            .collect()
    }

    fn view(record: &SessionRecord, secure: Option<SecureFields>) -> SessionView {
        let now = Utc::now();
        SessionView {
            id: record.id,
            nickname: record.nickname.clone(),
            status: record.status,
            created_at: record.created_at,
            last_accessed: record.last_accessed,
            idle_seconds: (now - record.last_accessed).num_seconds(),
            duration_seconds: (now - record.created_at).num_seconds(),
            secure,
        }
    }
}
