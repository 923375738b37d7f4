//! Time-bounded cache of rendered pages.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::Response,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use metrics::counter;
use thiserror::Error;
use tokio::{sync::RwLock, time::Instant};
use tracing::{debug, warn};

use crate::application::pagination::clamp_page_number;
use crate::infra::http::session::Viewer;

/// Prefix of every home-page cache key.
pub const INDEX_PAGE_KEY: &str = "index_page";

pub const PAGE_CACHE_HIT: &str = "yatube_page_cache_hit_total";
pub const PAGE_CACHE_MISS: &str = "yatube_page_cache_miss_total";

/// Shared store of rendered responses that expire `ttl` after being stored.
///
/// Entries are never invalidated by writes; readers see the stored bytes
/// until they expire or [`PageCache::clear`] is called.
#[derive(Clone)]
pub struct PageCache {
    entries: Arc<RwLock<HashMap<String, CachedPage>>>,
    ttl: Duration,
}

struct CachedPage {
    response: CachedResponse,
    expires_at: Instant,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn get(&self, key: &str) -> Option<Response<Body>> {
        let guard = self.entries.read().await;
        guard
            .get(key)
            .filter(|page| page.expires_at > Instant::now())
            .map(|page| page.response.clone().into_response())
    }

    pub async fn put(&self, key: String, response: CachedResponse) {
        let now = Instant::now();
        let mut guard = self.entries.write().await;
        guard.retain(|_, page| page.expires_at > now);
        guard.insert(
            key,
            CachedPage {
                response,
                expires_at: now + self.ttl,
            },
        );
    }

    pub async fn store_response(
        &self,
        key: &str,
        response: Response,
    ) -> Result<Response, (Response, CacheStoreError)> {
        match buffer_response(response).await {
            Ok((rebuilt, cached)) => {
                self.put(key.to_string(), cached).await;
                Ok(rebuilt)
            }
            Err((rebuilt, error)) => Err((rebuilt, error)),
        }
    }

    /// Drops every entry.
    pub async fn clear(&self) {
        let mut guard = self.entries.write().await;
        guard.clear();
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let guard = self.entries.read().await;
        guard.values().filter(|page| page.expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[derive(Clone)]
pub struct CachedResponse {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Bytes,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: &HeaderMap, body: Bytes) -> Self {
        let stored_headers = headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Self {
            status,
            headers: stored_headers,
            body,
        }
    }

    fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        headers.clear();
        for (name, value) in self.headers {
            headers.append(name, value);
        }

        response
    }
}

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("failed to buffer response body: {0}")]
    Buffer(String),
}

/// Only plain `200 OK` pages that do not touch cookies are cached.
pub fn should_store_response(response: &Response) -> bool {
    response.status() == StatusCode::OK && !response.headers().contains_key(header::SET_COOKIE)
}

pub async fn buffer_response(
    response: Response,
) -> Result<(Response, CachedResponse), (Response, CacheStoreError)> {
    let (parts, body) = response.into_parts();
    match BodyExt::collect(body).await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            let cached = CachedResponse::new(parts.status, &parts.headers, bytes.clone());
            let rebuilt = Response::from_parts(parts, Body::from(bytes));
            Ok((rebuilt, cached))
        }
        Err(error) => {
            let rebuilt = Response::from_parts(parts, Body::empty());
            Err((rebuilt, CacheStoreError::Buffer(error.to_string())))
        }
    }
}

/// Cache key of the home page: the page number after normalisation and the
/// viewer. Every other query parameter is ignored.
pub fn index_page_key(query: Option<&str>, viewer_id: Option<i64>) -> String {
    let requested = query.and_then(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(name, _)| name == "page")
            .map(|(_, value)| value.into_owned())
    });
    let page = clamp_page_number(requested.as_deref(), u64::MAX);
    match viewer_id {
        Some(id) => format!("{INDEX_PAGE_KEY}:{page}:user-{id}"),
        None => format!("{INDEX_PAGE_KEY}:{page}:anon"),
    }
}

/// Serves `GET` requests from the page cache, storing fresh pages on a miss.
pub async fn cache_index_page(
    State(cache): State<PageCache>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let viewer_id = request
        .extensions()
        .get::<Viewer>()
        .and_then(|viewer| viewer.user().map(|user| user.id));
    let key = index_page_key(request.uri().query(), viewer_id);

    if let Some(cached) = cache.get(&key).await {
        counter!(PAGE_CACHE_HIT).increment(1);
        debug!(cache = "page", outcome = "hit", key = %key, "serving cached page");
        return cached;
    }

    counter!(PAGE_CACHE_MISS).increment(1);
    debug!(cache = "page", outcome = "miss", key = %key, "rendering page");

    let response = next.run(request).await;
    if !should_store_response(&response) {
        return response;
    }

    match cache.store_response(&key, response).await {
        Ok(response) => response,
        Err((response, error)) => {
            warn!(cache = "page", key = %key, error = %error, "failed to cache page");
            response
        }
    }
}
