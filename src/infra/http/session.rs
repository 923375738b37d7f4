//! Session cookie handling and the viewer extractors.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::request::Parts,
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::OffsetDateTime;
use url::{Url, form_urlencoded};

use crate::domain::entities::UserRecord;

pub const SESSION_COOKIE: &str = "sessionid";
pub const LOGIN_PATH: &str = "/auth/login/";

/// The user bound to the request's session, if any. Inserted by the
/// `load_viewer` middleware.
#[derive(Debug, Clone, Default)]
pub struct Viewer(Option<UserRecord>);

impl Viewer {
    pub fn new(user: Option<UserRecord>) -> Self {
        Self(user)
    }

    pub fn user(&self) -> Option<&UserRecord> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Viewer>().cloned().unwrap_or_default())
    }
}

/// A logged-in user. Anonymous requests are redirected to the login page
/// with the original path in `next`.
#[derive(Debug, Clone)]
pub struct RequireUser(pub UserRecord);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts
            .extensions
            .get::<Viewer>()
            .and_then(|viewer| viewer.user().cloned())
        {
            return Ok(Self(user));
        }

        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| original.0.clone())
            .unwrap_or_else(|| parts.uri.clone());
        let next = uri
            .path_and_query()
            .map(|value| value.as_str())
            .unwrap_or("/");
        Err(login_redirect(next))
    }
}

pub fn login_redirect(next: &str) -> Redirect {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    Redirect::to(&format!("{LOGIN_PATH}?{query}"))
}

/// Accepts `next` only when it points back into this site.
pub fn safe_next(next: Option<&str>) -> Option<String> {
    let next = next.map(str::trim).filter(|value| !value.is_empty())?;
    if !next.starts_with('/') || next.starts_with("//") || next.contains('\\') {
        return None;
    }
    let base = Url::parse("http://yatube.invalid/").ok()?;
    let resolved = base.join(next).ok()?;
    if resolved.host_str() != base.host_str() {
        return None;
    }
    let mut local = resolved.path().to_string();
    if let Some(query) = resolved.query() {
        local.push('?');
        local.push_str(query);
    }
    Some(local)
}

pub fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(token: String, expires_at: OffsetDateTime, secure: bool) -> Cookie<'static> {
    let max_age = (expires_at - OffsetDateTime::now_utc()).max(time::Duration::ZERO);
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build()
}

pub fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

#[cfg(test)]
mod tests {
    use axum::{http::header::LOCATION, response::IntoResponse};

    use super::*;

    #[test]
    fn login_redirect_encodes_next_as_a_query_pair() {
        let response = login_redirect("/follow/?page=2").into_response();
        let location = response.headers()[LOCATION].to_str().expect("location");
        assert_eq!(location, "/auth/login/?next=%2Ffollow%2F%3Fpage%3D2");

        let query = location.split_once('?').map(|(_, query)| query).unwrap_or("");
        let next: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        assert_eq!(next, vec![("next".to_string(), "/follow/?page=2".to_string())]);
        assert_eq!(
            safe_next(Some(&next[0].1)),
            Some("/follow/?page=2".to_string())
        );
    }

    #[test]
    fn only_local_next_targets_are_followed() {
        assert_eq!(safe_next(Some("/create/")), Some("/create/".to_string()));
        assert_eq!(
            safe_next(Some("/follow/?page=2")),
            Some("/follow/?page=2".to_string())
        );
        assert_eq!(safe_next(Some("https://evil.example/")), None);
        assert_eq!(safe_next(Some("//evil.example/")), None);
        assert_eq!(safe_next(Some("")), None);
        assert_eq!(safe_next(None), None);
    }

    #[test]
    fn session_cookie_is_http_only() {
        let expires = OffsetDateTime::now_utc() + time::Duration::hours(1);
        let cookie = session_cookie("abc.def".into(), expires, false);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }
}
