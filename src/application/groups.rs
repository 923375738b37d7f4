//! Group management used by the operator CLI.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{CreateGroupParams, GroupsRepo, GroupsWriteRepo, RepoError};
use crate::domain::entities::GroupRecord;
use crate::domain::error::DomainError;
use crate::domain::slug::{derive_slug, validate_group_title, validate_slug};

#[derive(Debug, Error)]
pub enum GroupError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("group with slug `{0}` already exists")]
    DuplicateSlug(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateGroupCommand {
    pub title: String,
    pub slug: Option<String>,
    pub description: String,
}

#[derive(Clone)]
pub struct GroupService {
    reader: Arc<dyn GroupsRepo>,
    writer: Arc<dyn GroupsWriteRepo>,
}

impl GroupService {
    pub fn new(reader: Arc<dyn GroupsRepo>, writer: Arc<dyn GroupsWriteRepo>) -> Self {
        Self { reader, writer }
    }

    pub async fn list(&self) -> Result<Vec<GroupRecord>, GroupError> {
        Ok(self.reader.list_groups().await?)
    }

    /// Creates a group; without an explicit slug one is derived from the title.
    pub async fn create(&self, command: CreateGroupCommand) -> Result<GroupRecord, GroupError> {
        let title = validate_group_title(&command.title)?;
        let slug = match command.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => {
                validate_slug(slug)?;
                slug.to_string()
            }
            _ => derive_slug(&title)?,
        };

        if self.reader.find_group_by_slug(&slug).await?.is_some() {
            return Err(GroupError::DuplicateSlug(slug));
        }

        let group = self
            .writer
            .create_group(CreateGroupParams {
                title,
                slug: slug.clone(),
                description: command.description.trim().to_string(),
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => GroupError::DuplicateSlug(slug),
                other => GroupError::Repo(other),
            })?;

        info!(target: "yatube::groups", slug = %group.slug, "group created");
        Ok(group)
    }

    pub async fn delete(&self, slug: &str) -> Result<bool, GroupError> {
        let removed = self.writer.delete_group(slug).await?;
        if removed {
            info!(target: "yatube::groups", slug, "group deleted");
        }
        Ok(removed)
    }
}
