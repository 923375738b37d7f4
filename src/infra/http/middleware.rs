use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

use super::{
    HttpState,
    session::{Viewer, session_token},
};

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

/// Resolves the session cookie into a [`Viewer`] extension. Unknown or
/// expired sessions leave the request anonymous.
pub async fn load_viewer(
    State(state): State<HttpState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(request.headers());
    let user = match session_token(&jar) {
        Some(token) => match state.accounts.authenticate(&token).await {
            Ok(user) => user,
            Err(err) => {
                warn!(
                    target: "yatube::http::session",
                    error = %err,
                    "failed to resolve session; continuing anonymously"
                );
                None
            }
        },
        None => None,
    };

    request.extensions_mut().insert(Viewer::new(user));
    next.run(request).await
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();
    let viewer = request
        .extensions()
        .get::<Viewer>()
        .and_then(|viewer| viewer.user().map(|user| user.username.clone()))
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target: "yatube::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                viewer = viewer,
                "request failed",
            );
        } else {
            warn!(
                target: "yatube::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                viewer = viewer,
                "client request error",
            );
        }
    }

    response
}
