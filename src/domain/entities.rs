//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;

use super::posts::{HUMAN_DATE_FORMAT, truncate_chars};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip)]
    pub password_hash: String,
    pub date_joined: OffsetDateTime,
}

impl UserRecord {
    /// Full name when one is set, otherwise the username.
    pub fn display_name(&self) -> String {
        full_name_or_username(&self.first_name, &self.last_name, &self.username)
    }

    pub fn summary(&self) -> AuthorSummary {
        AuthorSummary {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name(),
        }
    }
}

pub(crate) fn full_name_or_username(first: &str, last: &str, username: &str) -> String {
    let full = format!("{} {}", first.trim(), last.trim());
    let full = full.trim();
    if full.is_empty() {
        username.to_string()
    } else {
        full.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRecord {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// Author columns joined onto a post or comment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorSummary {
    pub id: i64,
    pub username: String,
    pub display_name: String,
}

/// Group columns joined onto a post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub id: i64,
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: i64,
    pub text: String,
    pub pub_date: OffsetDateTime,
    pub author: Option<AuthorSummary>,
    pub group: Option<GroupSummary>,
    pub image: Option<String>,
}

impl PostRecord {
    /// Short label used wherever a post is listed by name.
    pub fn label(&self) -> String {
        truncate_chars(&self.text, 15)
    }

    /// Title of the post detail page.
    pub fn title(&self) -> String {
        truncate_chars(&self.text, 30)
    }

    pub fn published(&self) -> String {
        self.pub_date
            .format(HUMAN_DATE_FORMAT)
            .unwrap_or_else(|_| self.pub_date.date().to_string())
    }

    pub fn is_authored_by(&self, user_id: i64) -> bool {
        self.author.as_ref().is_some_and(|author| author.id == user_id)
    }

    pub fn image_url(&self) -> Option<String> {
        self.image.as_ref().map(|path| format!("/media/{path}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: i64,
    pub post_id: i64,
    pub author: AuthorSummary,
    pub text: String,
    pub created: OffsetDateTime,
}

impl CommentRecord {
    pub fn created_label(&self) -> String {
        self.created
            .format(HUMAN_DATE_FORMAT)
            .unwrap_or_else(|_| self.created.date().to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: i64,
    pub secret_hash: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}
