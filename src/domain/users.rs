//! Account field rules.

use super::error::DomainError;

pub const MAX_USERNAME_LEN: usize = 150;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Usernames are 1–150 characters of letters, digits and `@ . + - _`.
pub fn validate_username(raw: &str) -> Result<String, DomainError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(DomainError::validation(
            "username",
            "This field is required.",
        ));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(DomainError::validation(
            "username",
            format!("Ensure this value has at most {MAX_USERNAME_LEN} characters."),
        ));
    }
    if !username
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(DomainError::validation(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    Ok(username.to_string())
}

/// Optional email; when present it needs a local part and a dotted domain.
pub fn validate_email(raw: &str) -> Result<String, DomainError> {
    let email = raw.trim();
    if email.is_empty() {
        return Ok(String::new());
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !domain.contains('@')
        }
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(DomainError::validation(
            "email",
            "Enter a valid email address.",
        ));
    }
    Ok(email.to_string())
}

/// Check a new password pair. Both entries must match, be long enough and not
/// consist of digits only.
pub fn validate_new_password(password1: &str, password2: &str) -> Result<(), DomainError> {
    if password1.is_empty() {
        return Err(DomainError::validation(
            "password1",
            "This field is required.",
        ));
    }
    if password1 != password2 {
        return Err(DomainError::validation(
            "password2",
            "The two password fields didn't match.",
        ));
    }
    if password1.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(
            "password2",
            format!(
                "This password is too short. It must contain at least {MIN_PASSWORD_LEN} characters."
            ),
        ));
    }
    if password1.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(DomainError::validation(
            "password2",
            "This password is entirely numeric.",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_allows_letters_digits_and_symbols() {
        assert_eq!(validate_username(" auth2 ").unwrap(), "auth2");
        assert!(validate_username("has.no+name@x_y-z").is_ok());
    }

    #[test]
    fn username_rejects_spaces_and_slashes() {
        assert!(validate_username("has no name").is_err());
        assert!(validate_username("a/b").is_err());
        assert!(validate_username("").is_err());
    }

    #[test]
    fn email_is_optional_but_checked() {
        assert_eq!(validate_email("").unwrap(), "");
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("user@example").is_err());
        assert!(validate_email("userexample.com").is_err());
    }

    #[test]
    fn password_pair_rules() {
        assert!(validate_new_password("correct-horse", "correct-horse").is_ok());
        assert_eq!(
            validate_new_password("correct-horse", "correct-horsf")
                .unwrap_err()
                .field(),
            Some("password2")
        );
        assert!(validate_new_password("short", "short").is_err());
        assert!(validate_new_password("1234567890", "1234567890").is_err());
    }
}
