use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{RepoError, SessionsRepo},
    domain::entities::SessionRecord,
};

use super::{SqliteRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    user_id: i64,
    secret_hash: Vec<u8>,
    created_at: i64,
    expires_at: i64,
}

impl TryFrom<SessionRow> for SessionRecord {
    type Error = RepoError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let timestamp = |value: i64| {
            OffsetDateTime::from_unix_timestamp(value).map_err(|err| RepoError::Integrity {
                message: format!("session `{}` has invalid timestamp: {err}", row.id),
            })
        };
        Ok(Self {
            created_at: timestamp(row.created_at)?,
            expires_at: timestamp(row.expires_at)?,
            id: row.id,
            user_id: row.user_id,
            secret_hash: row.secret_hash,
        })
    }
}

#[async_trait]
impl SessionsRepo for SqliteRepositories {
    async fn create_session(&self, session: &SessionRecord) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, secret_hash, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(&session.secret_hash)
        .bind(session.created_at.unix_timestamp())
        .bind(session.expires_at.unix_timestamp())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_session(&self, id: &str) -> Result<Option<SessionRecord>, RepoError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, user_id, secret_hash, created_at, expires_at FROM sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(SessionRecord::try_from).transpose()
    }

    async fn delete_session(&self, id: &str) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete_expired_sessions(&self, now: OffsetDateTime) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now.unix_timestamp())
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}
