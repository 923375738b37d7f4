//! Read-side listings: home page, groups, profiles, following feed, post detail.

use std::sync::Arc;

use thiserror::Error;

use crate::application::pagination::{PAGE_SIZE, Page, Paginator};
use crate::application::repos::{
    CommentsRepo, FollowsRepo, GroupsRepo, PostScope, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group")]
    UnknownGroup,
    #[error("unknown user")]
    UnknownUser,
    #[error("unknown post")]
    UnknownPost,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct GroupFeed {
    pub group: GroupRecord,
    pub page: Page<PostRecord>,
}

#[derive(Debug, Clone)]
pub struct ProfileFeed {
    pub author: UserRecord,
    pub post_count: u64,
    pub followers: u64,
    pub following_count: u64,
    /// Whether the viewer follows this author.
    pub following: bool,
    /// Whether the viewer may follow this author at all.
    pub can_follow: bool,
    pub page: Page<PostRecord>,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostRecord,
    pub author_post_count: u64,
    pub comments: Vec<CommentRecord>,
    pub can_edit: bool,
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    comments: Arc<dyn CommentsRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        comments: Arc<dyn CommentsRepo>,
        follows: Arc<dyn FollowsRepo>,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            comments,
            follows,
        }
    }

    pub async fn index(&self, page: Option<&str>) -> Result<Page<PostRecord>, FeedError> {
        self.paginate(PostScope::All, page).await
    }

    pub async fn group(&self, slug: &str, page: Option<&str>) -> Result<GroupFeed, FeedError> {
        let group = self
            .groups
            .find_group_by_slug(slug)
            .await?
            .ok_or(FeedError::UnknownGroup)?;
        let page = self.paginate(PostScope::Group(group.id), page).await?;
        Ok(GroupFeed { group, page })
    }

    pub async fn profile(
        &self,
        username: &str,
        viewer: Option<&UserRecord>,
        page: Option<&str>,
    ) -> Result<ProfileFeed, FeedError> {
        let author = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or(FeedError::UnknownUser)?;

        let page = self.paginate(PostScope::Author(author.id), page).await?;
        let followers = self.follows.count_followers(author.id).await?;
        let following_count = self.follows.count_following(author.id).await?;
        let (following, can_follow) = match viewer {
            Some(viewer) if viewer.id != author.id => (
                self.follows.is_following(viewer.id, author.id).await?,
                true,
            ),
            _ => (false, false),
        };

        Ok(ProfileFeed {
            post_count: page.total,
            author,
            followers,
            following_count,
            following,
            can_follow,
            page,
        })
    }

    /// Posts by the authors `viewer` follows.
    pub async fn following(
        &self,
        viewer: &UserRecord,
        page: Option<&str>,
    ) -> Result<Page<PostRecord>, FeedError> {
        self.paginate(PostScope::FollowedBy(viewer.id), page).await
    }

    pub async fn post_detail(
        &self,
        id: i64,
        viewer: Option<&UserRecord>,
    ) -> Result<PostDetail, FeedError> {
        let post = self
            .posts
            .find_post(id)
            .await?
            .ok_or(FeedError::UnknownPost)?;

        let author_post_count = match post.author.as_ref() {
            Some(author) => self.posts.count_posts(PostScope::Author(author.id)).await?,
            None => 0,
        };
        let comments = self.comments.list_comments(post.id).await?;
        let can_edit = viewer.is_some_and(|viewer| post.is_authored_by(viewer.id));

        Ok(PostDetail {
            post,
            author_post_count,
            comments,
            can_edit,
        })
    }

    async fn paginate(
        &self,
        scope: PostScope,
        requested: Option<&str>,
    ) -> Result<Page<PostRecord>, FeedError> {
        let total = self.posts.count_posts(scope).await?;
        let window = Paginator::new(total, PAGE_SIZE).window(requested);
        let items = self
            .posts
            .list_posts(scope, window.offset, window.limit)
            .await?;
        Ok(window.into_page(items))
    }
}
