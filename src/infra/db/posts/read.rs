use async_trait::async_trait;
use sqlx::QueryBuilder;

use crate::application::repos::{PostScope, PostsRepo, RepoError};
use crate::domain::entities::PostRecord;
use crate::infra::db::map_sqlx_error;

use super::{POST_SELECT, PostRow, SqliteRepositories};

#[async_trait]
impl PostsRepo for SqliteRepositories {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p ");
        Self::push_scope(&mut qb, scope);

        let count: i64 = qb
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(count.max(0) as u64)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::new(POST_SELECT);
        Self::push_scope(&mut qb, scope);
        qb.push(" ORDER BY p.pub_date DESC, p.id DESC LIMIT ");
        qb.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        qb.push(" OFFSET ");
        qb.push_bind(i64::try_from(offset).unwrap_or(i64::MAX));

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!("{POST_SELECT} WHERE p.id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }
}
