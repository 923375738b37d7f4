use async_trait::async_trait;

use crate::application::repos::{
    CreatePostParams, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::PostRecord;
use crate::infra::db::map_sqlx_error;

use super::SqliteRepositories;

impl SqliteRepositories {
    async fn reload_post(&self, id: i64) -> Result<PostRecord, RepoError> {
        self.find_post(id).await?.ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl PostsWriteRepo for SqliteRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO posts (text, author_id, group_id, image)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&params.text)
        .bind(params.author_id)
        .bind(params.group_id)
        .bind(params.image.as_deref())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        self.reload_post(id).await
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET text = ?, group_id = ?, image = ?
            WHERE id = ?
            "#,
        )
        .bind(&params.text)
        .bind(params.group_id)
        .bind(params.image.as_deref())
        .bind(params.id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        self.reload_post(params.id).await
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
