//! Subscriptions between users.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("unknown user")]
    UnknownUser,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Changed,
    Unchanged,
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    /// Subscribes `viewer` to `username`. Following yourself or an author you
    /// already follow changes nothing.
    pub async fn follow(
        &self,
        viewer: &UserRecord,
        username: &str,
    ) -> Result<FollowOutcome, FollowError> {
        let author = self.author(username).await?;
        if author.id == viewer.id {
            return Ok(FollowOutcome::Unchanged);
        }

        let created = self.follows.create_follow(viewer.id, author.id).await?;
        if created {
            info!(
                target: "yatube::follows",
                user = %viewer.username,
                author = %author.username,
                "follow created"
            );
        }
        Ok(outcome(created))
    }

    pub async fn unfollow(
        &self,
        viewer: &UserRecord,
        username: &str,
    ) -> Result<FollowOutcome, FollowError> {
        let author = self.author(username).await?;
        let removed = self.follows.delete_follow(viewer.id, author.id).await?;
        if removed {
            info!(
                target: "yatube::follows",
                user = %viewer.username,
                author = %author.username,
                "follow removed"
            );
        }
        Ok(outcome(removed))
    }

    async fn author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_user_by_username(username)
            .await?
            .ok_or(FollowError::UnknownUser)
    }
}

fn outcome(changed: bool) -> FollowOutcome {
    if changed {
        FollowOutcome::Changed
    } else {
        FollowOutcome::Unchanged
    }
}
