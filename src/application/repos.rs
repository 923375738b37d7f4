//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, SessionRecord, UserRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which posts a listing covers. Every scope is ordered newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    All,
    Group(i64),
    Author(i64),
    /// Posts by every author the given user follows.
    FollowedBy(i64),
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct CreateGroupParams {
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub author_id: i64,
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: i64,
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError>;

    async fn find_user_by_username(&self, username: &str)
    -> Result<Option<UserRecord>, RepoError>;

    async fn list_users_by_email(&self, email: &str) -> Result<Vec<UserRecord>, RepoError>;
}

#[async_trait]
pub trait UsersWriteRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), RepoError>;

    /// Removes the user together with their posts, comments, follows and
    /// sessions. Returns `false` when no such user exists.
    async fn delete_user(&self, id: i64) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError>;

    async fn find_group_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError>;

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;
}

#[async_trait]
pub trait GroupsWriteRepo: Send + Sync {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError>;

    /// Posts of the deleted group keep existing without a group.
    async fn delete_group(&self, slug: &str) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError>;

    async fn list_posts(
        &self,
        scope: PostScope,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostRecord>, RepoError>;

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    /// Rewrites text, group and image. The publish timestamp is left alone.
    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    async fn delete_post(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments of a post, oldest first.
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError>;

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError>;

    /// Returns `true` when a new edge was stored.
    async fn create_follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError>;

    /// Returns `true` when an existing edge was removed.
    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError>;

    async fn count_followers(&self, author_id: i64) -> Result<u64, RepoError>;

    async fn count_following(&self, user_id: i64) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait SessionsRepo: Send + Sync {
    async fn create_session(&self, session: &SessionRecord) -> Result<(), RepoError>;

    async fn find_session(&self, id: &str) -> Result<Option<SessionRecord>, RepoError>;

    async fn delete_session(&self, id: &str) -> Result<(), RepoError>;

    async fn delete_expired_sessions(&self, now: OffsetDateTime) -> Result<u64, RepoError>;
}
