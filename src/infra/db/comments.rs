use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{CommentsRepo, CreateCommentParams, RepoError},
    domain::entities::{AuthorSummary, CommentRecord, full_name_or_username},
};

use super::{SqliteRepositories, map_sqlx_error};

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.text, c.created, \
     u.id AS author_id, u.username AS author_username, \
     u.first_name AS author_first_name, u.last_name AS author_last_name \
     FROM comments c \
     INNER JOIN users u ON u.id = c.author_id ";

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    text: String,
    created: OffsetDateTime,
    author_id: i64,
    author_username: String,
    author_first_name: String,
    author_last_name: String,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            author: AuthorSummary {
                id: row.author_id,
                display_name: full_name_or_username(
                    &row.author_first_name,
                    &row.author_last_name,
                    &row.author_username,
                ),
                username: row.author_username,
            },
            text: row.text,
            created: row.created,
        }
    }
}

#[async_trait]
impl CommentsRepo for SqliteRepositories {
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "{COMMENT_SELECT} WHERE c.post_id = ? ORDER BY c.created, c.id"
        ))
        .bind(post_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO comments (post_id, author_id, text)
            VALUES (?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(params.post_id)
        .bind(params.author_id)
        .bind(&params.text)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, CommentRow>(&format!("{COMMENT_SELECT} WHERE c.id = ?"))
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }
}
