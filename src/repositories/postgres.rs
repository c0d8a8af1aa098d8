use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::session::{SessionPatch, SessionRecord, SessionStatus};
use crate::repositories::session::SessionStore;

/// PostgreSQL-backed session store.
pub struct PgSessionStore {
    pool: Pool,
}

/// A helper function to map a `tokio_postgres::Row` to a `SessionRecord`.
fn row_to_record(row: &Row) -> Result<SessionRecord> {
    let status: String = row.try_get("status")?;
    Ok(SessionRecord {
        id: row.try_get("id")?,
        nickname: row.try_get("nickname")?,
        email: row.try_get("email")?,
        mac_address: row.try_get("mac_address")?,
        client_ip: row.try_get("client_ip")?,
        server_ip: row.try_get("server_ip")?,
        status: status
            .parse()
            .map_err(|_| AppError::Internal(format!("Invalid status in store: {}", status)))?,
        created_at: row.try_get("created_at")?,
        last_accessed: row.try_get("last_accessed")?,
    })
}

impl PgSessionStore {
    /// Creates a new `PgSessionStore` over the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Creates the sessions table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .batch_execute(
                r#"
                CREATE TABLE IF NOT EXISTS sessions (
                    id UUID PRIMARY KEY,
                    nickname TEXT NOT NULL,
                    email TEXT NOT NULL,
                    mac_address TEXT NOT NULL,
                    client_ip TEXT NOT NULL,
                    server_ip TEXT NOT NULL,
                    status TEXT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL,
                    last_accessed TIMESTAMPTZ NOT NULL
                );
                CREATE INDEX IF NOT EXISTS sessions_status_idx ON sessions (status);
                "#,
            )
            .await?;
        tracing::info!("✅ Sessions schema ensured");
        Ok(())
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, record: &SessionRecord) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                r#"
                INSERT INTO sessions
                    (id, nickname, email, mac_address, client_ip, server_ip,
                     status, created_at, last_accessed)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
                &[
                    &record.id,
                    &record.nickname,
                    &record.email,
                    &record.mac_address,
                    &record.client_ip,
                    &record.server_ip,
                    &record.status.as_str(),
                    &record.created_at,
                    &record.last_accessed,
                ],
            )
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<SessionRecord>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT * FROM sessions WHERE id = $1", &[id])
            .await?;
        row.map(|r| row_to_record(&r)).transpose()
    }

    async fn list(&self, status: Option<SessionStatus>) -> Result<Vec<SessionRecord>> {
        let client = self.pool.get().await?;
        let rows = match status {
            Some(status) => {
                client
                    .query(
                        "SELECT * FROM sessions WHERE status = $1 ORDER BY created_at",
                        &[&status.as_str()],
                    )
                    .await?
            }
            None => {
                client
                    .query("SELECT * FROM sessions ORDER BY created_at", &[])
                    .await?
            }
        };
        rows.iter().map(row_to_record).collect()
    }

    async fn update(&self, id: &Uuid, patch: SessionPatch) -> Result<Option<SessionRecord>> {
        let client = self.pool.get().await?;
        let row = match (patch.status, patch.last_accessed) {
            (Some(status), Some(last_accessed)) => {
                client
                    .query_opt(
                        r#"
                        UPDATE sessions
                        SET status = $2, last_accessed = $3
                        WHERE id = $1
                        RETURNING *
                        "#,
                        &[id, &status.as_str(), &last_accessed],
                    )
                    .await?
            }
            (Some(status), None) => {
                client
                    .query_opt(
                        "UPDATE sessions SET status = $2 WHERE id = $1 RETURNING *",
                        &[id, &status.as_str()],
                    )
                    .await?
            }
            (None, Some(last_accessed)) => {
                client
                    .query_opt(
                        "UPDATE sessions SET last_accessed = $2 WHERE id = $1 RETURNING *",
                        &[id, &last_accessed],
                    )
                    .await?
            }
            // Empty patch: read back the current record.
            (None, None) => {
                client
                    .query_opt("SELECT * FROM sessions WHERE id = $1", &[id])
                    .await?
            }
        };
        row.map(|r| row_to_record(&r)).transpose()
    }

    async fn purge(&self) -> Result<u64> {
        let client = self.pool.get().await?;
        let count = client.execute("DELETE FROM sessions", &[]).await?;
        Ok(count)
    }
}
