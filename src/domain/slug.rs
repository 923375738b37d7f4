//! Group slug derivation and validation.

use slug::slugify;

use super::error::DomainError;

pub const MAX_SLUG_LEN: usize = 100;
pub const MAX_GROUP_TITLE_LEN: usize = 200;

/// Derive a slug from a human-readable title.
pub fn derive_slug(input: &str) -> Result<String, DomainError> {
    if input.trim().is_empty() {
        return Err(DomainError::validation("slug", "slug source text is empty"));
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(DomainError::validation(
            "slug",
            format!("failed to derive slug from `{input}`"),
        ));
    }

    let truncated: String = candidate.chars().take(MAX_SLUG_LEN).collect();
    Ok(truncated.trim_end_matches('-').to_string())
}

/// Accept letters, digits, hyphens and underscores only.
pub fn validate_slug(slug: &str) -> Result<(), DomainError> {
    if slug.is_empty() {
        return Err(DomainError::validation("slug", "slug must not be empty"));
    }
    if slug.chars().count() > MAX_SLUG_LEN {
        return Err(DomainError::validation(
            "slug",
            format!("slug must be at most {MAX_SLUG_LEN} characters"),
        ));
    }
    if !slug
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(DomainError::validation(
            "slug",
            "slug may contain only letters, numbers, underscores or hyphens",
        ));
    }
    Ok(())
}

pub fn validate_group_title(title: &str) -> Result<String, DomainError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("title", "title must not be empty"));
    }
    if trimmed.chars().count() > MAX_GROUP_TITLE_LEN {
        return Err(DomainError::validation(
            "title",
            format!("title must be at most {MAX_GROUP_TITLE_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_slug_lowercases_and_hyphenates() {
        assert_eq!(derive_slug("Cats & Dogs").unwrap(), "cats-dogs");
    }

    #[test]
    fn derive_slug_rejects_blank_input() {
        assert!(derive_slug("   ").is_err());
    }

    #[test]
    fn validate_slug_accepts_underscores() {
        assert!(validate_slug("test_group").is_ok());
        assert!(validate_slug("test-group2").is_ok());
    }

    #[test]
    fn validate_slug_rejects_spaces_and_punctuation() {
        assert!(validate_slug("test group").is_err());
        assert!(validate_slug("test/group").is_err());
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn validate_slug_enforces_length() {
        let long = "a".repeat(MAX_SLUG_LEN + 1);
        assert!(validate_slug(&long).is_err());
    }
}
