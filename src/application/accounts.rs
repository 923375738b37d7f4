//! Registration, sessions and password management.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::repos::{
    CreateUserParams, RepoError, SessionsRepo, UsersRepo, UsersWriteRepo,
};
use crate::application::validation::{FieldErrors, NON_FIELD};
use crate::domain::entities::{SessionRecord, UserRecord};
use crate::domain::users::{validate_email, validate_new_password, validate_username};

/// Reset links stop working after three days.
pub const RESET_TOKEN_TTL: Duration = Duration::days(3);

const DUPLICATE_USERNAME: &str = "A user with that username already exists.";
const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";
const WRONG_OLD_PASSWORD: &str =
    "Your old password was entered incorrectly. Please enter it again.";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("invalid form: {0}")]
    Invalid(FieldErrors),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid or expired reset link")]
    InvalidResetLink,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default)]
pub struct SignupSubmission {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

/// A freshly created login session. `token` goes into the cookie.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub user: UserRecord,
    pub expires_at: OffsetDateTime,
}

/// A reset link that was generated for a matching account.
#[derive(Debug, Clone)]
pub struct ResetLink {
    pub username: String,
    pub path: String,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    writer: Arc<dyn UsersWriteRepo>,
    sessions: Arc<dyn SessionsRepo>,
    session_ttl: Duration,
    secret_key: Arc<str>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        writer: Arc<dyn UsersWriteRepo>,
        sessions: Arc<dyn SessionsRepo>,
        session_ttl: Duration,
        secret_key: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            users,
            writer,
            sessions,
            session_ttl,
            secret_key: secret_key.into(),
        }
    }

    pub async fn signup(&self, submission: SignupSubmission) -> Result<UserRecord, AccountError> {
        let mut errors = FieldErrors::new();
        let username = errors.check(validate_username(&submission.username));
        let email = errors.check(validate_email(&submission.email));
        errors.check(validate_new_password(
            &submission.password1,
            &submission.password2,
        ));

        if let Some(username) = username.as_deref()
            && self.users.find_user_by_username(username).await?.is_some()
        {
            errors.add("username", DUPLICATE_USERNAME);
        }
        errors.into_result().map_err(AccountError::Invalid)?;

        let (Some(username), Some(email)) = (username, email) else {
            return Err(AccountError::Invalid(FieldErrors::new()));
        };
        let password_hash = hash_password(&submission.password1)?;

        let user = self
            .writer
            .create_user(CreateUserParams {
                username,
                email,
                first_name: submission.first_name.trim().to_string(),
                last_name: submission.last_name.trim().to_string(),
                password_hash,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => {
                    let mut errors = FieldErrors::new();
                    errors.add("username", DUPLICATE_USERNAME);
                    AccountError::Invalid(errors)
                }
                other => AccountError::Repo(other),
            })?;

        info!(target: "yatube::auth", user = %user.username, "account created");
        Ok(user)
    }

    /// Checks credentials and opens a session.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<IssuedSession, AccountError> {
        let user = self
            .users
            .find_user_by_username(username.trim())
            .await?
            .ok_or(AccountError::InvalidCredentials)?;
        if !verify_password(password, &user.password_hash)? {
            return Err(AccountError::InvalidCredentials);
        }
        self.open_session(user).await
    }

    pub async fn open_session(&self, user: UserRecord) -> Result<IssuedSession, AccountError> {
        let now = OffsetDateTime::now_utc();
        let id = Uuid::new_v4().simple().to_string();
        let secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let record = SessionRecord {
            id: id.clone(),
            user_id: user.id,
            secret_hash: hash_secret(&secret),
            created_at: now,
            expires_at: now + self.session_ttl,
        };
        self.sessions.create_session(&record).await?;

        info!(target: "yatube::auth", user = %user.username, "session opened");
        Ok(IssuedSession {
            token: format!("{id}.{secret}"),
            user,
            expires_at: record.expires_at,
        })
    }

    /// Resolves a session token to its user. Unknown, expired or tampered
    /// tokens yield `None`.
    pub async fn authenticate(&self, token: &str) -> Result<Option<UserRecord>, AccountError> {
        let Some((id, secret)) = parse_session_token(token) else {
            return Ok(None);
        };
        let Some(session) = self.sessions.find_session(id).await? else {
            return Ok(None);
        };

        if session.expires_at <= OffsetDateTime::now_utc() {
            self.sessions.delete_session(&session.id).await?;
            return Ok(None);
        }
        if session.secret_hash.ct_eq(&hash_secret(secret)).unwrap_u8() == 0 {
            return Ok(None);
        }

        Ok(self.users.find_user_by_id(session.user_id).await?)
    }

    pub async fn logout(&self, token: &str) -> Result<(), AccountError> {
        if let Some((id, _)) = parse_session_token(token) {
            self.sessions.delete_session(id).await?;
        }
        Ok(())
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64, AccountError> {
        Ok(self
            .sessions
            .delete_expired_sessions(OffsetDateTime::now_utc())
            .await?)
    }

    pub async fn change_password(
        &self,
        user: &UserRecord,
        old_password: &str,
        password1: &str,
        password2: &str,
    ) -> Result<(), AccountError> {
        let mut errors = FieldErrors::new();
        if !verify_password(old_password, &user.password_hash)? {
            errors.add("old_password", WRONG_OLD_PASSWORD);
        }
        errors.check(validate_new_password(password1, password2));
        errors.into_result().map_err(AccountError::Invalid)?;

        self.set_password(user, password1).await
    }

    /// Logs a reset link for every account registered with `email` and
    /// returns the links.
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<Vec<ResetLink>, AccountError> {
        let email = email.trim();
        if email.is_empty() {
            let mut errors = FieldErrors::new();
            errors.add("email", "This field is required.");
            return Err(AccountError::Invalid(errors));
        }

        let now = OffsetDateTime::now_utc().unix_timestamp();
        let mut links = Vec::new();
        for user in self.users.list_users_by_email(email).await? {
            let token = make_reset_token(&self.secret_key, &user, now);
            let path = format!("/auth/reset/{}/{token}/", encode_uid(user.id));
            info!(
                target: "yatube::auth::mail",
                to = %user.email,
                user = %user.username,
                link = %path,
                "password reset requested"
            );
            links.push(ResetLink {
                username: user.username,
                path,
            });
        }
        Ok(links)
    }

    /// The account a reset link belongs to, if the link is still valid.
    pub async fn reset_link_user(
        &self,
        uidb64: &str,
        token: &str,
    ) -> Result<Option<UserRecord>, AccountError> {
        let Some(id) = decode_uid(uidb64) else {
            return Ok(None);
        };
        let Some(user) = self.users.find_user_by_id(id).await? else {
            return Ok(None);
        };
        let now = OffsetDateTime::now_utc().unix_timestamp();
        Ok(verify_reset_token(&self.secret_key, &user, token, now).then_some(user))
    }

    pub async fn reset_password(
        &self,
        uidb64: &str,
        token: &str,
        password1: &str,
        password2: &str,
    ) -> Result<(), AccountError> {
        let user = self
            .reset_link_user(uidb64, token)
            .await?
            .ok_or(AccountError::InvalidResetLink)?;

        let mut errors = FieldErrors::new();
        errors.check(validate_new_password(password1, password2));
        errors.into_result().map_err(AccountError::Invalid)?;

        self.set_password(&user, password1).await
    }

    /// Deletes an account and everything it owns. Returns `false` when the
    /// username is unknown.
    pub async fn delete_user(&self, username: &str) -> Result<bool, AccountError> {
        let Some(user) = self.users.find_user_by_username(username).await? else {
            return Ok(false);
        };
        let removed = self.writer.delete_user(user.id).await?;
        if removed {
            info!(target: "yatube::auth", user = %user.username, "account deleted");
        }
        Ok(removed)
    }

    async fn set_password(&self, user: &UserRecord, password: &str) -> Result<(), AccountError> {
        let hash = hash_password(password)?;
        self.writer.update_password(user.id, &hash).await?;
        info!(target: "yatube::auth", user = %user.username, "password changed");
        Ok(())
    }
}

impl AccountError {
    /// Form errors to show for this failure, if it is a user-facing one.
    pub fn form_errors(&self) -> Option<FieldErrors> {
        match self {
            Self::Invalid(errors) => Some(errors.clone()),
            Self::InvalidCredentials => {
                let mut errors = FieldErrors::new();
                errors.add(NON_FIELD, INVALID_LOGIN);
                Some(errors)
            }
            _ => None,
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AccountError::Hashing(err.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AccountError> {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(target: "yatube::auth", error = %err, "stored password hash is unreadable");
            return Ok(false);
        }
    };
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn hash_secret(secret: &str) -> Vec<u8> {
    Sha256::digest(secret.as_bytes()).to_vec()
}

fn parse_session_token(token: &str) -> Option<(&str, &str)> {
    let (id, secret) = token.split_once('.')?;
    if id.is_empty() || secret.is_empty() {
        return None;
    }
    Some((id, secret))
}

pub fn encode_uid(id: i64) -> String {
    URL_SAFE_NO_PAD.encode(id.to_string())
}

pub fn decode_uid(raw: &str) -> Option<i64> {
    let bytes = URL_SAFE_NO_PAD.decode(raw).ok()?;
    std::str::from_utf8(&bytes).ok()?.parse().ok()
}

/// Stateless reset token: issue time plus a digest binding the token to the
/// secret key and the current password hash.
pub fn make_reset_token(secret_key: &str, user: &UserRecord, issued_at: i64) -> String {
    format!(
        "{issued_at:x}-{}",
        hex::encode(reset_digest(secret_key, user, issued_at))
    )
}

pub fn verify_reset_token(secret_key: &str, user: &UserRecord, token: &str, now: i64) -> bool {
    let Some((issued, digest)) = token.split_once('-') else {
        return false;
    };
    let Ok(issued_at) = i64::from_str_radix(issued, 16) else {
        return false;
    };
    if issued_at > now || now - issued_at > RESET_TOKEN_TTL.whole_seconds() {
        return false;
    }
    let Ok(digest) = hex::decode(digest) else {
        return false;
    };
    let expected = reset_digest(secret_key, user, issued_at);
    expected.as_slice().ct_eq(digest.as_slice()).unwrap_u8() == 1
}

fn reset_digest(secret_key: &str, user: &UserRecord, issued_at: i64) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret_key.as_bytes());
    hasher.update([0]);
    hasher.update(user.id.to_be_bytes());
    hasher.update(user.password_hash.as_bytes());
    hasher.update(issued_at.to_be_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(password_hash: &str) -> UserRecord {
        UserRecord {
            id: 7,
            username: "leo".into(),
            email: "leo@example.com".into(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: password_hash.into(),
            date_joined: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct-horse").expect("hash");
        assert!(verify_password("correct-horse", &hash).expect("verify"));
        assert!(!verify_password("wrong-horse", &hash).expect("verify"));
        assert!(!verify_password("anything", "not-a-hash").expect("verify"));
    }

    #[test]
    fn reset_token_is_valid_within_three_days() {
        let user = user("hash-a");
        let issued = 1_700_000_000;
        let token = make_reset_token("secret", &user, issued);

        assert!(verify_reset_token("secret", &user, &token, issued));
        assert!(verify_reset_token(
            "secret",
            &user,
            &token,
            issued + RESET_TOKEN_TTL.whole_seconds()
        ));
        assert!(!verify_reset_token(
            "secret",
            &user,
            &token,
            issued + RESET_TOKEN_TTL.whole_seconds() + 1
        ));
    }

    #[test]
    fn reset_token_dies_with_password_change() {
        let issued = 1_700_000_000;
        let token = make_reset_token("secret", &user("hash-a"), issued);
        assert!(!verify_reset_token("secret", &user("hash-b"), &token, issued));
        assert!(!verify_reset_token("other", &user("hash-a"), &token, issued));
        assert!(!verify_reset_token("secret", &user("hash-a"), "garbage", issued));
    }

    #[test]
    fn uid_round_trips() {
        assert_eq!(decode_uid(&encode_uid(42)), Some(42));
        assert_eq!(decode_uid("!!"), None);
    }

    #[test]
    fn session_tokens_need_both_halves() {
        assert_eq!(parse_session_token("abc.def"), Some(("abc", "def")));
        assert_eq!(parse_session_token("abc."), None);
        assert_eq!(parse_session_token("abcdef"), None);
    }
}
