//! Read-only pages: listings, post detail, media and health.

use std::io::ErrorKind;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::error;

use crate::{
    application::error::HttpError,
    infra::uploads::UploadStorageError,
    presentation::views::{
        AboutAuthorTemplate, AboutTechTemplate, FollowTemplate, GroupTemplate, IndexTemplate,
        LayoutContext, ListingView, PostDetailTemplate, PostDetailView, ProfileTemplate,
        render_not_found_response, render_template_response,
    },
};

use super::{
    HttpState, db_health_response, feed_error_response, not_found_response,
    session::{RequireUser, Viewer},
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PageQuery {
    page: Option<String>,
}

pub(super) async fn index(
    State(state): State<HttpState>,
    viewer: Viewer,
    Query(query): Query<PageQuery>,
) -> Response {
    const SOURCE: &str = "infra::http::public::index";

    match state.feed.index(query.page.as_deref()).await {
        Ok(page) => {
            let view = LayoutContext::new(viewer.user(), "Latest updates", ListingView { page });
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_response(SOURCE, err, viewer.user()),
    }
}

pub(super) async fn group_posts(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    const SOURCE: &str = "infra::http::public::group_posts";

    match state.feed.group(&slug, query.page.as_deref()).await {
        Ok(feed) => {
            let title = format!("Posts of group {}", feed.group.title);
            let view = LayoutContext::new(viewer.user(), title, feed);
            render_template_response(GroupTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_response(SOURCE, err, viewer.user()),
    }
}

pub(super) async fn profile(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    const SOURCE: &str = "infra::http::public::profile";

    match state
        .feed
        .profile(&username, viewer.user(), query.page.as_deref())
        .await
    {
        Ok(feed) => {
            let title = format!("Profile of {}", feed.author.display_name());
            let view = LayoutContext::new(viewer.user(), title, feed);
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_response(SOURCE, err, viewer.user()),
    }
}

pub(super) async fn post_detail(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(raw_id): Path<String>,
) -> Response {
    const SOURCE: &str = "infra::http::public::post_detail";

    let Some(post_id) = parse_post_id(&raw_id) else {
        return not_found_response(SOURCE, "malformed post id", viewer.user());
    };

    match state.feed.post_detail(post_id, viewer.user()).await {
        Ok(detail) => {
            let title = format!("Post {}", detail.post.label());
            let view = LayoutContext::new(viewer.user(), title, PostDetailView { detail });
            render_template_response(PostDetailTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_response(SOURCE, err, viewer.user()),
    }
}

pub(super) async fn follow_index(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Query(query): Query<PageQuery>,
) -> Response {
    const SOURCE: &str = "infra::http::public::follow_index";

    match state.feed.following(&user, query.page.as_deref()).await {
        Ok(page) => {
            let view = LayoutContext::new(Some(&user), "Following", ListingView { page });
            render_template_response(FollowTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_response(SOURCE, err, Some(&user)),
    }
}

pub(super) async fn about_author(viewer: Viewer) -> Response {
    let view = LayoutContext::new(viewer.user(), "About the author", ());
    render_template_response(AboutAuthorTemplate { view }, StatusCode::OK)
}

pub(super) async fn about_tech(viewer: Viewer) -> Response {
    let view = LayoutContext::new(viewer.user(), "Technologies", ());
    render_template_response(AboutTechTemplate { view }, StatusCode::OK)
}

pub(super) async fn serve_media(
    State(state): State<HttpState>,
    Path(path): Path<String>,
) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.media.read(&path).await {
        Ok(bytes) => build_media_response(&path, bytes),
        Err(UploadStorageError::InvalidPath) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "File not found",
            "The requested file is not available",
        )
        .into_response(),
        Err(UploadStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "File not found",
            "The requested file is not available",
        )
        .into_response(),
        Err(err) => {
            error!(
                target: SOURCE,
                path = %path,
                error = %err,
                "failed to read stored media"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read media file",
                err.to_string(),
            )
            .into_response()
        }
    }
}

pub(super) async fn health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

pub(super) async fn fallback(viewer: Viewer) -> Response {
    render_not_found_response(viewer.user())
}

/// Post ids are positive integers; anything else is simply not found.
pub(super) fn parse_post_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

fn build_media_response(path: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_ids_must_be_positive_integers() {
        assert_eq!(parse_post_id("42"), Some(42));
        assert_eq!(parse_post_id("0"), None);
        assert_eq!(parse_post_id("-3"), None);
        assert_eq!(parse_post_id("abc"), None);
    }

    #[test]
    fn media_response_guesses_content_type() {
        let response = build_media_response("posts/a.gif", Bytes::from_static(b"GIF89a"));
        assert_eq!(response.headers()[CONTENT_TYPE], "image/gif");
        assert_eq!(response.headers()[CONTENT_LENGTH], "6");
        assert_eq!(response.headers()[X_CONTENT_TYPE_OPTIONS], "nosniff");
    }
}
