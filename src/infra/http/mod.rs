mod auth;
mod forms;
mod middleware;
mod posts;
mod public;
pub mod session;

pub use middleware::RequestContext;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use sqlx::Error as SqlxError;
use tracing::warn;
use uuid::Uuid;

use crate::{
    application::{
        accounts::{AccountError, AccountService},
        error::{ErrorReport, HttpError},
        feed::{FeedError, FeedService},
        follows::{FollowError, FollowService},
        posts::{PostError, PostService},
        repos::RepoError,
    },
    config::Settings,
    domain::entities::UserRecord,
    infra::{cache::PageCache, db::SqliteRepositories, uploads::UploadStorage},
    presentation::views::render_not_found_response,
};

use middleware::{load_viewer, log_responses, set_request_context};

/// Runtime knobs for the HTTP surface, usually taken from [`Settings`].
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub index_cache_ttl: Duration,
    pub session_ttl: Duration,
    pub secret_key: String,
    pub cookie_secure: bool,
    pub max_upload_bytes: usize,
}

impl HttpOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        let secret_key = match settings.auth.secret_key.clone() {
            Some(key) => key,
            None => {
                warn!(
                    target: "yatube::http",
                    "auth.secret_key is not set; reset links will not survive a restart"
                );
                random_secret()
            }
        };
        Self {
            index_cache_ttl: settings.cache.index_ttl,
            session_ttl: settings.auth.session_ttl,
            secret_key,
            cookie_secure: settings.auth.cookie_secure,
            max_upload_bytes: usize::try_from(settings.media.max_request_bytes.get())
                .unwrap_or(usize::MAX),
        }
    }
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            index_cache_ttl: Duration::from_secs(20),
            session_ttl: Duration::from_secs(14 * 24 * 60 * 60),
            secret_key: random_secret(),
            cookie_secure: false,
            max_upload_bytes: 5 * 1024 * 1024,
        }
    }
}

fn random_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub accounts: Arc<AccountService>,
    pub db: Arc<SqliteRepositories>,
    pub media: Arc<UploadStorage>,
    pub page_cache: PageCache,
    pub cookie_secure: bool,
    pub max_upload_bytes: usize,
}

impl HttpState {
    /// Wires every service onto one set of repositories.
    pub fn build(
        repositories: Arc<SqliteRepositories>,
        media: Arc<UploadStorage>,
        options: &HttpOptions,
    ) -> Self {
        let feed = FeedService::new(
            repositories.clone(),
            repositories.clone(),
            repositories.clone(),
            repositories.clone(),
            repositories.clone(),
        );
        let posts = PostService::new(
            repositories.clone(),
            repositories.clone(),
            repositories.clone(),
            repositories.clone(),
            media.clone(),
        );
        let follows = FollowService::new(repositories.clone(), repositories.clone());
        let session_ttl = time::Duration::try_from(options.session_ttl)
            .unwrap_or(time::Duration::days(14));
        let accounts = AccountService::new(
            repositories.clone(),
            repositories.clone(),
            repositories.clone(),
            session_ttl,
            options.secret_key.as_str(),
        );

        Self {
            feed: Arc::new(feed),
            posts: Arc::new(posts),
            follows: Arc::new(follows),
            accounts: Arc::new(accounts),
            db: repositories,
            media,
            page_cache: PageCache::new(options.index_cache_ttl),
            cookie_secure: options.cookie_secure,
            max_upload_bytes: options.max_upload_bytes,
        }
    }
}

pub fn build_router(state: HttpState) -> Router {
    let index = Router::new().route(
        "/",
        get(public::index).route_layer(axum_middleware::from_fn_with_state(
            state.page_cache.clone(),
            crate::infra::cache::cache_index_page,
        )),
    );

    let authoring = Router::new()
        .route(
            "/create/",
            get(posts::create_form).post(posts::create_submit),
        )
        .route(
            "/posts/{post_id}/edit/",
            get(posts::edit_form).post(posts::edit_submit),
        )
        .layer(DefaultBodyLimit::max(state.max_upload_bytes));

    let pages = Router::new()
        .route("/group/{slug}/", get(public::group_posts))
        .route("/profile/{username}/", get(public::profile))
        .route("/profile/{username}/follow/", get(posts::profile_follow))
        .route("/profile/{username}/unfollow/", get(posts::profile_unfollow))
        .route("/posts/{post_id}/", get(public::post_detail))
        .route("/posts/{post_id}/comment/", axum::routing::post(posts::add_comment))
        .route("/follow/", get(public::follow_index))
        .route("/about/author/", get(public::about_author))
        .route("/about/tech/", get(public::about_tech))
        .route("/media/{*path}", get(public::serve_media))
        .route("/_health/db", get(public::health));

    Router::new()
        .merge(index)
        .merge(authoring)
        .merge(pages)
        .nest("/auth", auth::router())
        .fallback(public::fallback)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            load_viewer,
        ))
        .layer(axum_middleware::from_fn(set_request_context))
        .with_state(state)
}

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Map a repository error to a consistent HTTP error response.
pub fn repo_error_to_http(source: &'static str, err: RepoError) -> HttpError {
    match err {
        RepoError::Duplicate { constraint } => {
            HttpError::new(source, StatusCode::CONFLICT, "Duplicate record", constraint)
        }
        RepoError::NotFound => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Resource not found",
            "resource not found",
        ),
        RepoError::InvalidInput { message } => {
            HttpError::new(source, StatusCode::BAD_REQUEST, "Invalid input", message)
        }
        RepoError::Integrity { message } => HttpError::new(
            source,
            StatusCode::CONFLICT,
            "Integrity constraint violated",
            message,
        ),
        RepoError::Timeout => HttpError::new(
            source,
            StatusCode::SERVICE_UNAVAILABLE,
            "Database timeout",
            "Database timeout",
        ),
        RepoError::Persistence(message) => HttpError::new(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Persistence error",
            message,
        ),
    }
}

/// Lookups that miss render the 404 page; everything else is a server error.
fn feed_error_response(source: &'static str, err: FeedError, viewer: Option<&UserRecord>) -> Response {
    match err {
        FeedError::UnknownGroup | FeedError::UnknownUser | FeedError::UnknownPost => {
            not_found_response(source, &err.to_string(), viewer)
        }
        FeedError::Repo(err) => repo_error_to_http(source, err).into_response(),
    }
}

fn post_error_response(source: &'static str, err: PostError, viewer: Option<&UserRecord>) -> Response {
    match err {
        PostError::UnknownPost => not_found_response(source, "unknown post", viewer),
        PostError::Repo(err) => repo_error_to_http(source, err).into_response(),
        PostError::Storage(err) => HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to store upload",
            &err,
        )
        .into_response(),
        other => HttpError::new(
            source,
            StatusCode::BAD_REQUEST,
            "Invalid request",
            other.to_string(),
        )
        .into_response(),
    }
}

fn follow_error_response(
    source: &'static str,
    err: FollowError,
    viewer: Option<&UserRecord>,
) -> Response {
    match err {
        FollowError::UnknownUser => not_found_response(source, "unknown user", viewer),
        FollowError::Repo(err) => repo_error_to_http(source, err).into_response(),
    }
}

fn account_error_response(source: &'static str, err: AccountError) -> Response {
    match err {
        AccountError::Repo(err) => repo_error_to_http(source, err).into_response(),
        other => HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Account operation failed",
            &other,
        )
        .into_response(),
    }
}

fn not_found_response(source: &'static str, detail: &str, viewer: Option<&UserRecord>) -> Response {
    let mut response = render_not_found_response(viewer);
    ErrorReport::from_message(source, StatusCode::NOT_FOUND, detail).attach(&mut response);
    response
}
