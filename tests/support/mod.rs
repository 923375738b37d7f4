#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, Bytes},
    http::{
        Request, Response, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
    },
};
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;
use url::form_urlencoded;
use yatube::{
    application::repos::{
        CreateGroupParams, CreatePostParams, CreateUserParams, GroupsWriteRepo, PostsWriteRepo,
        UsersWriteRepo,
    },
    domain::entities::{GroupRecord, PostRecord, UserRecord},
    infra::{
        db::SqliteRepositories,
        http::{HttpOptions, HttpState, build_router, session::SESSION_COOKIE},
        uploads::UploadStorage,
    },
};

/// 2x1 transparent GIF.
pub const TINY_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0c, 0x0a, 0x00, 0x3b,
];

pub const BOUNDARY: &str = "yatube-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub state: HttpState,
    pub repos: Arc<SqliteRepositories>,
    pub media: TempDir,
}

impl TestApp {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_options(pool, HttpOptions::default())
    }

    pub fn with_cache_ttl(pool: SqlitePool, ttl: Duration) -> Self {
        Self::with_options(
            pool,
            HttpOptions {
                index_cache_ttl: ttl,
                ..HttpOptions::default()
            },
        )
    }

    pub fn with_options(pool: SqlitePool, options: HttpOptions) -> Self {
        let media = tempfile::tempdir().expect("media dir");
        let storage =
            Arc::new(UploadStorage::new(media.path().to_path_buf()).expect("upload storage"));
        let repos = Arc::new(SqliteRepositories::new(pool));
        let state = HttpState::build(repos.clone(), storage, &options);
        let router = build_router(state.clone());
        Self {
            router,
            state,
            repos,
            media,
        }
    }

    pub async fn user(&self, username: &str) -> UserRecord {
        self.repos
            .create_user(CreateUserParams {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                first_name: String::new(),
                last_name: String::new(),
                password_hash: "!".to_string(),
            })
            .await
            .expect("create user")
    }

    pub async fn group(&self, title: &str, slug: &str) -> GroupRecord {
        self.repos
            .create_group(CreateGroupParams {
                title: title.to_string(),
                slug: slug.to_string(),
                description: "Test description".to_string(),
            })
            .await
            .expect("create group")
    }

    pub async fn post(&self, author: &UserRecord, text: &str, group: Option<&GroupRecord>) -> PostRecord {
        self.repos
            .create_post(CreatePostParams {
                author_id: author.id,
                text: text.to_string(),
                group_id: group.map(|group| group.id),
                image: None,
            })
            .await
            .expect("create post")
    }

    /// A `Cookie` header value carrying a fresh session for `user`.
    pub async fn login(&self, user: &UserRecord) -> String {
        let session = self
            .state
            .accounts
            .open_session(user.clone())
            .await
            .expect("open session");
        format!("{SESSION_COOKIE}={}", session.token)
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).expect("request")).await
    }

    pub async fn post_form(
        &self,
        uri: &str,
        cookie: Option<&str>,
        fields: &[(&str, &str)],
    ) -> Response<Body> {
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields.iter().copied())
            .finish();
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).expect("request")).await
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        cookie: Option<&str>,
        fields: &[(&str, &str)],
        image: Option<(&str, &[u8])>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let body = multipart_body(fields, image);
        self.send(builder.body(Body::from(body)).expect("request")).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }
}

pub fn multipart_body(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, data)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: image/gif\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).expect("utf-8 body")
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header")
}

pub fn assert_redirect(response: &Response<Body>, target: &str) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(response), target);
}

/// The `name=value` part of the session cookie set by a response.
pub fn session_cookie_pair(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{SESSION_COOKIE}=")))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}
