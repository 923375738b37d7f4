//! Post authoring: create, edit and comment.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostsRepo, PostsWriteRepo,
    RepoError, UpdatePostParams,
};
use crate::application::validation::FieldErrors;
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};
use crate::domain::posts::{CommentText, PostText};
use crate::infra::uploads::{UploadStorage, UploadStorageError, inspect_image};

const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

#[derive(Debug, Error)]
pub enum PostError {
    #[error("invalid post: {0}")]
    Invalid(FieldErrors),
    #[error("unknown post")]
    UnknownPost,
    #[error("post belongs to another author")]
    Forbidden,
    #[error(transparent)]
    Storage(#[from] UploadStorageError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// An uploaded image file as received from the form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub data: Bytes,
}

/// Raw values of the post form.
#[derive(Debug, Clone, Default)]
pub struct PostSubmission {
    pub text: String,
    /// Selected group id; empty means no group.
    pub group: Option<String>,
    pub image: Option<ImageUpload>,
    /// Drop the current image when editing.
    pub clear_image: bool,
}

struct ValidPost {
    text: PostText,
    group_id: Option<i64>,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
    media: Arc<UploadStorage>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
        media: Arc<UploadStorage>,
    ) -> Self {
        Self {
            posts,
            writer,
            groups,
            comments,
            media,
        }
    }

    /// Groups offered by the post form.
    pub async fn group_choices(&self) -> Result<Vec<GroupRecord>, PostError> {
        Ok(self.groups.list_groups().await?)
    }

    pub async fn create(
        &self,
        author: &UserRecord,
        submission: PostSubmission,
    ) -> Result<PostRecord, PostError> {
        let valid = self.validate(&submission).await?;
        let image = match submission.image {
            Some(upload) => Some(self.store_image(upload).await?),
            None => None,
        };

        let created = self
            .writer
            .create_post(CreatePostParams {
                author_id: author.id,
                text: valid.text.into_inner(),
                group_id: valid.group_id,
                image: image.clone(),
            })
            .await;
        let post = match created {
            Ok(post) => post,
            Err(err) => {
                if let Some(path) = image.as_deref() {
                    self.discard_image(path, "failed to remove image of unsaved post")
                        .await;
                }
                return Err(err.into());
            }
        };

        info!(
            target: "yatube::posts",
            post_id = post.id,
            author = %author.username,
            "post created"
        );
        Ok(post)
    }

    /// Loads a post for editing by `viewer`.
    pub async fn editable(&self, id: i64, viewer: &UserRecord) -> Result<PostRecord, PostError> {
        let post = self
            .posts
            .find_post(id)
            .await?
            .ok_or(PostError::UnknownPost)?;
        if !post.is_authored_by(viewer.id) {
            return Err(PostError::Forbidden);
        }
        Ok(post)
    }

    pub async fn update(
        &self,
        id: i64,
        viewer: &UserRecord,
        submission: PostSubmission,
    ) -> Result<PostRecord, PostError> {
        let current = self.editable(id, viewer).await?;
        let valid = self.validate(&submission).await?;

        let uploaded = match submission.image {
            Some(upload) => Some(self.store_image(upload).await?),
            None => None,
        };
        let image = match (&uploaded, submission.clear_image) {
            (Some(path), _) => Some(path.clone()),
            (None, true) => None,
            (None, false) => current.image.clone(),
        };

        let updated = self
            .writer
            .update_post(UpdatePostParams {
                id: current.id,
                text: valid.text.into_inner(),
                group_id: valid.group_id,
                image: image.clone(),
            })
            .await;
        let post = match updated {
            Ok(post) => post,
            Err(err) => {
                if let Some(path) = uploaded.as_deref() {
                    self.discard_image(path, "failed to remove image of unsaved edit")
                        .await;
                }
                return Err(err.into());
            }
        };

        if let Some(previous) = current.image.as_deref()
            && image.as_deref() != Some(previous)
        {
            self.discard_image(previous, "failed to remove replaced image")
                .await;
        }

        info!(target: "yatube::posts", post_id = post.id, "post updated");
        Ok(post)
    }

    /// Attaches a comment by `author`. Blank text is ignored and yields `None`.
    pub async fn comment(
        &self,
        post_id: i64,
        author: &UserRecord,
        text: &str,
    ) -> Result<Option<CommentRecord>, PostError> {
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(PostError::UnknownPost)?;

        let Ok(text) = CommentText::parse(text) else {
            return Ok(None);
        };

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id: author.id,
                text: text.into_inner(),
            })
            .await?;
        Ok(Some(comment))
    }

    async fn validate(&self, submission: &PostSubmission) -> Result<ValidPost, PostError> {
        let mut errors = FieldErrors::new();
        let text = errors.check(PostText::parse(&submission.text));

        let group_id = match submission
            .group
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
        {
            None => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) if self.groups.find_group_by_id(id).await?.is_some() => Some(id),
                _ => {
                    errors.add("group", INVALID_CHOICE);
                    None
                }
            },
        };

        if let Some(upload) = submission.image.as_ref()
            && inspect_image(&upload.data).is_err()
        {
            errors.add("image", INVALID_IMAGE);
        }

        match (text, errors.into_result()) {
            (Some(text), Ok(())) => Ok(ValidPost { text, group_id }),
            (_, Err(errors)) => Err(PostError::Invalid(errors)),
            (None, Ok(())) => Err(PostError::Invalid(FieldErrors::new())),
        }
    }

    /// Deletes a stored image; a failure is only logged.
    async fn discard_image(&self, path: &str, message: &'static str) {
        if let Err(err) = self.media.delete(path).await {
            warn!(target: "yatube::posts", path, error = %err, "{message}");
        }
    }

    async fn store_image(&self, upload: ImageUpload) -> Result<String, PostError> {
        let stored = self.media.store_image(&upload.filename, upload.data).await?;
        info!(
            target: "yatube::posts",
            path = %stored.stored_path,
            size_bytes = stored.size_bytes,
            checksum = %stored.checksum,
            "image stored"
        );
        Ok(stored.stored_path)
    }
}
