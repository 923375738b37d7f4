//! Post and comment text rules.

use time::{format_description::FormatItem, macros::format_description};

use super::error::DomainError;

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[day padding:none] [month repr:long] [year]");

/// Normalised post body. Surrounding whitespace is dropped and the result
/// must not be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostText(String);

impl PostText {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        required_text("text", raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Normalised comment body, same rules as [`PostText`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentText(String);

impl CommentText {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        required_text("text", raw).map(Self)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

fn required_text(field: &'static str, raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, "This field is required."));
    }
    Ok(trimmed.to_string())
}

/// First `max` characters of `text`, counted in chars rather than bytes.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_text_is_trimmed() {
        let text = PostText::parse("  hello world \n").expect("valid text");
        assert_eq!(text.as_str(), "hello world");
    }

    #[test]
    fn blank_post_text_is_rejected() {
        let err = PostText::parse(" \t\n").expect_err("blank text");
        assert_eq!(err.field(), Some("text"));
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate_chars("Тестовый текст поста", 8), "Тестовый");
        assert_eq!(truncate_chars("short", 15), "short");
    }
}
