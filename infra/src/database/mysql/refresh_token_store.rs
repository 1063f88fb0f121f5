//! MySQL implementation of the RefreshTokenStore trait.
//!
//! Records live in the `refresh_tokens` table keyed by token id. Rotation runs
//! in one transaction that locks the predecessor row with `SELECT ... FOR UPDATE`,
//! so a concurrent rotation of the same record waits and then sees it revoked.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

use conn_core::domain::entities::token::RefreshTokenRecord;
use conn_core::errors::TokenError;
use conn_core::repositories::RefreshTokenStore;

const TABLE: &str = "refresh_tokens";

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS refresh_tokens (
        id CHAR(36) NOT NULL PRIMARY KEY,
        client_id CHAR(36) NOT NULL,
        created_at DATETIME(6) NOT NULL,
        expires_at DATETIME(6) NOT NULL,
        revoked BOOLEAN NOT NULL DEFAULT FALSE,
        INDEX idx_refresh_tokens_client (client_id, revoked),
        INDEX idx_refresh_tokens_expires (expires_at)
    )
"#;

/// MySQL implementation of RefreshTokenStore
pub struct MySqlRefreshTokenStore {
    /// Database connection pool
    pool: MySqlPool,
}

impl MySqlRefreshTokenStore {
    /// Create a new MySQL refresh token store
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Create the `refresh_tokens` table if it does not exist
    pub async fn ensure_schema(&self) -> Result<(), TokenError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| storage("create table", e))?;

        tracing::info!(table = TABLE, "Refresh token schema ready");
        Ok(())
    }

    /// Convert database row to RefreshTokenRecord
    fn row_to_record(row: &sqlx::mysql::MySqlRow) -> Result<RefreshTokenRecord, TokenError> {
        let id: String = row.try_get("id").map_err(|e| storage("read id", e))?;
        let client_id: String = row
            .try_get("client_id")
            .map_err(|e| storage("read client_id", e))?;

        Ok(RefreshTokenRecord {
            id: Uuid::parse_str(&id)
                .map_err(|e| TokenError::storage(&id, format!("invalid token UUID: {}", e)))?,
            client_id: Uuid::parse_str(&client_id)
                .map_err(|e| TokenError::storage(&id, format!("invalid client UUID: {}", e)))?,
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .map_err(|e| storage("read created_at", e))?,
            expires_at: row
                .try_get::<DateTime<Utc>, _>("expires_at")
                .map_err(|e| storage("read expires_at", e))?,
            revoked: row.try_get("revoked").map_err(|e| storage("read revoked", e))?,
        })
    }
}

fn storage(action: &str, error: sqlx::Error) -> TokenError {
    tracing::error!(table = TABLE, action, error = %error, "Refresh token store failure");
    TokenError::storage(TABLE, format!("{}: {}", action, error))
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

const INSERT: &str = r#"
    INSERT INTO refresh_tokens (id, client_id, created_at, expires_at, revoked)
    VALUES (?, ?, ?, ?, ?)
"#;

const SELECT_COLUMNS: &str = "SELECT id, client_id, created_at, expires_at, revoked FROM refresh_tokens";

#[async_trait]
impl RefreshTokenStore for MySqlRefreshTokenStore {
    async fn add(&self, record: RefreshTokenRecord) -> Result<(), TokenError> {
        sqlx::query(INSERT)
            .bind(record.id.to_string())
            .bind(record.client_id.to_string())
            .bind(record.created_at)
            .bind(record.expires_at)
            .bind(record.revoked)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    TokenError::duplicate(record.id)
                } else {
                    storage("insert", e)
                }
            })?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>, TokenError> {
        let query = format!("{} WHERE id = ? LIMIT 1", SELECT_COLUMNS);

        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage("find by id", e))?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn find_active_by_client(
        &self,
        client_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<RefreshTokenRecord>, TokenError> {
        let query = format!(
            "{} WHERE client_id = ? AND revoked = FALSE AND expires_at > ? ORDER BY created_at DESC",
            SELECT_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(client_id.to_string())
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage("find active by client", e))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn swap(
        &self,
        old_id: Uuid,
        successor: RefreshTokenRecord,
        now: DateTime<Utc>,
    ) -> Result<(), TokenError> {
        let mut tx = self.pool.begin().await.map_err(|e| storage("begin", e))?;

        // Dropping `tx` on any early return rolls the transaction back
        let query = format!("{} WHERE id = ? FOR UPDATE", SELECT_COLUMNS);
        let row = sqlx::query(&query)
            .bind(old_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| storage("lock predecessor", e))?;

        let old = match row {
            Some(row) => Self::row_to_record(&row)?,
            None => return Err(TokenError::not_found(old_id)),
        };
        if old.revoked {
            return Err(TokenError::invalid(old_id, "already rotated or revoked"));
        }
        if old.is_expired_at(now) {
            return Err(TokenError::invalid(old_id, "expired"));
        }

        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
            .bind(old_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| storage("revoke predecessor", e))?;

        sqlx::query(INSERT)
            .bind(successor.id.to_string())
            .bind(successor.client_id.to_string())
            .bind(successor.created_at)
            .bind(successor.expires_at)
            .bind(successor.revoked)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    TokenError::duplicate(successor.id)
                } else {
                    storage("insert successor", e)
                }
            })?;

        tx.commit().await.map_err(|e| storage("commit", e))?;
        Ok(())
    }

    async fn mark_revoked(&self, id: Uuid) -> Result<(), TokenError> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| storage("revoke", e))?;

        // MySQL reports changed rows, so an already revoked record also yields 0
        if result.rows_affected() == 0 && self.find_by_id(id).await?.is_none() {
            return Err(TokenError::not_found(id));
        }

        Ok(())
    }

    async fn revoke_all_for_client(&self, client_id: Uuid) -> Result<usize, TokenError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE client_id = ? AND revoked = FALSE",
        )
        .bind(client_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| storage("revoke all for client", e))?;

        Ok(result.rows_affected() as usize)
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<usize, TokenError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| storage("delete expired", e))?;

        Ok(result.rows_affected() as usize)
    }

    async fn count_active(&self, client_id: Uuid, now: DateTime<Utc>) -> Result<usize, TokenError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS active FROM refresh_tokens WHERE client_id = ? AND revoked = FALSE AND expires_at > ?",
        )
        .bind(client_id.to_string())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage("count active", e))?;

        let count: i64 = row.try_get("active").map_err(|e| storage("read count", e))?;
        Ok(count as usize)
    }
}
