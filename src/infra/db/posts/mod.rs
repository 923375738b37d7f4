mod read;
mod write;

use sqlx::{QueryBuilder, Sqlite};
use time::OffsetDateTime;

use crate::application::repos::PostScope;
use crate::domain::entities::{AuthorSummary, GroupSummary, PostRecord, full_name_or_username};

use super::SqliteRepositories;

const POST_SELECT: &str = "SELECT p.id, p.text, p.pub_date, p.image, \
     u.id AS author_id, u.username AS author_username, \
     u.first_name AS author_first_name, u.last_name AS author_last_name, \
     g.id AS group_id, g.slug AS group_slug, g.title AS group_title \
     FROM posts p \
     LEFT JOIN users u ON u.id = p.author_id \
     LEFT JOIN groups g ON g.id = p.group_id ";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    text: String,
    pub_date: OffsetDateTime,
    image: Option<String>,
    author_id: Option<i64>,
    author_username: Option<String>,
    author_first_name: Option<String>,
    author_last_name: Option<String>,
    group_id: Option<i64>,
    group_slug: Option<String>,
    group_title: Option<String>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        let author = match (row.author_id, row.author_username) {
            (Some(id), Some(username)) => Some(AuthorSummary {
                id,
                display_name: full_name_or_username(
                    row.author_first_name.as_deref().unwrap_or_default(),
                    row.author_last_name.as_deref().unwrap_or_default(),
                    &username,
                ),
                username,
            }),
            _ => None,
        };
        let group = match (row.group_id, row.group_slug, row.group_title) {
            (Some(id), Some(slug), Some(title)) => Some(GroupSummary { id, slug, title }),
            _ => None,
        };

        Self {
            id: row.id,
            text: row.text,
            pub_date: row.pub_date,
            author,
            group,
            image: row.image.filter(|path| !path.is_empty()),
        }
    }
}

impl SqliteRepositories {
    /// Joins and filters that restrict `posts p` to `scope`.
    fn push_scope(qb: &mut QueryBuilder<'_, Sqlite>, scope: PostScope) {
        match scope {
            PostScope::All => {
                qb.push(" WHERE 1=1 ");
            }
            PostScope::Group(group_id) => {
                qb.push(" WHERE p.group_id = ");
                qb.push_bind(group_id);
            }
            PostScope::Author(author_id) => {
                qb.push(" WHERE p.author_id = ");
                qb.push_bind(author_id);
            }
            PostScope::FollowedBy(user_id) => {
                qb.push(" INNER JOIN follows f ON f.author_id = p.author_id WHERE f.user_id = ");
                qb.push_bind(user_id);
            }
        }
    }
}
