//! Account pages mounted under `/auth`.

use axum::{
    Router,
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::warn;

use crate::{
    application::accounts::{AccountError, SignupSubmission},
    presentation::views::{
        LayoutContext, LoggedOutTemplate, LoginTemplate, LoginView, PasswordChangeDoneTemplate,
        PasswordChangeTemplate, PasswordFormView, PasswordResetCompleteTemplate,
        PasswordResetConfirmTemplate, PasswordResetDoneTemplate, PasswordResetTemplate,
        PasswordResetView, ResetConfirmView, SignupTemplate, SignupView, render_template_response,
    },
};

use super::{
    HttpState, account_error_response,
    session::{
        RequireUser, Viewer, clear_session_cookie, safe_next, session_cookie, session_token,
    },
};

pub(super) fn router() -> Router<HttpState> {
    Router::new()
        .route("/signup/", get(signup_form).post(signup_submit))
        .route("/login/", get(login_form).post(login_submit))
        .route("/logout/", get(logout).post(logout))
        .route(
            "/password_change/",
            get(password_change_form).post(password_change_submit),
        )
        .route("/password_change/done/", get(password_change_done))
        .route(
            "/password_reset/",
            get(password_reset_form).post(password_reset_submit),
        )
        .route("/password_reset/done/", get(password_reset_done))
        .route(
            "/reset/{uidb64}/{token}/",
            get(reset_confirm_form).post(reset_confirm_submit),
        )
        .route("/reset/done/", get(reset_complete))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SignupForm {
    first_name: String,
    last_name: String,
    username: String,
    email: String,
    password1: String,
    password2: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NextQuery {
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginForm {
    username: String,
    password: String,
    next: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PasswordChangeForm {
    old_password: String,
    new_password1: String,
    new_password2: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PasswordResetForm {
    email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SetPasswordForm {
    new_password1: String,
    new_password2: String,
}

async fn signup_form(viewer: Viewer) -> Response {
    let view = LayoutContext::new(viewer.user(), "Sign up", SignupView::default());
    render_template_response(SignupTemplate { view }, StatusCode::OK)
}

async fn signup_submit(
    State(state): State<HttpState>,
    viewer: Viewer,
    Form(form): Form<SignupForm>,
) -> Response {
    const SOURCE: &str = "infra::http::auth::signup_submit";

    let submission = SignupSubmission {
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        username: form.username.clone(),
        email: form.email.clone(),
        password1: form.password1,
        password2: form.password2,
    };

    match state.accounts.signup(submission).await {
        Ok(_) => Redirect::to("/").into_response(),
        Err(AccountError::Invalid(errors)) => {
            let content = SignupView {
                first_name: form.first_name,
                last_name: form.last_name,
                username: form.username,
                email: form.email,
                errors,
            };
            let view = LayoutContext::new(viewer.user(), "Sign up", content);
            render_template_response(SignupTemplate { view }, StatusCode::OK)
        }
        Err(err) => account_error_response(SOURCE, err),
    }
}

async fn login_form(viewer: Viewer, Query(query): Query<NextQuery>) -> Response {
    let content = LoginView {
        next: query.next.unwrap_or_default(),
        ..LoginView::default()
    };
    let view = LayoutContext::new(viewer.user(), "Log in", content);
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

async fn login_submit(
    State(state): State<HttpState>,
    viewer: Viewer,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    const SOURCE: &str = "infra::http::auth::login_submit";

    match state.accounts.login(&form.username, &form.password).await {
        Ok(session) => {
            let target = safe_next(Some(&form.next)).unwrap_or_else(|| "/".to_string());
            let cookie = session_cookie(session.token, session.expires_at, state.cookie_secure);
            (jar.add(cookie), Redirect::to(&target)).into_response()
        }
        Err(err) => match err.form_errors() {
            Some(errors) => {
                let content = LoginView {
                    username: form.username,
                    next: form.next,
                    errors,
                };
                let view = LayoutContext::new(viewer.user(), "Log in", content);
                render_template_response(LoginTemplate { view }, StatusCode::OK)
            }
            None => account_error_response(SOURCE, err),
        },
    }
}

async fn logout(State(state): State<HttpState>, jar: CookieJar) -> Response {
    if let Some(token) = session_token(&jar)
        && let Err(err) = state.accounts.logout(&token).await
    {
        warn!(
            target: "yatube::auth",
            error = %err,
            "failed to delete session on logout"
        );
    }

    let view = LayoutContext::new(None, "Logged out", ());
    (
        clear_session_cookie(jar),
        render_template_response(LoggedOutTemplate { view }, StatusCode::OK),
    )
        .into_response()
}

async fn password_change_form(RequireUser(user): RequireUser) -> Response {
    let view = LayoutContext::new(Some(&user), "Change password", PasswordFormView::default());
    render_template_response(PasswordChangeTemplate { view }, StatusCode::OK)
}

async fn password_change_submit(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Form(form): Form<PasswordChangeForm>,
) -> Response {
    const SOURCE: &str = "infra::http::auth::password_change_submit";

    match state
        .accounts
        .change_password(
            &user,
            &form.old_password,
            &form.new_password1,
            &form.new_password2,
        )
        .await
    {
        Ok(()) => Redirect::to("/auth/password_change/done/").into_response(),
        Err(AccountError::Invalid(errors)) => {
            let view = LayoutContext::new(
                Some(&user),
                "Change password",
                PasswordFormView { errors },
            );
            render_template_response(PasswordChangeTemplate { view }, StatusCode::OK)
        }
        Err(err) => account_error_response(SOURCE, err),
    }
}

async fn password_change_done(RequireUser(user): RequireUser) -> Response {
    let view = LayoutContext::new(Some(&user), "Password changed", ());
    render_template_response(PasswordChangeDoneTemplate { view }, StatusCode::OK)
}

async fn password_reset_form(viewer: Viewer) -> Response {
    let view = LayoutContext::new(viewer.user(), "Reset password", PasswordResetView::default());
    render_template_response(PasswordResetTemplate { view }, StatusCode::OK)
}

async fn password_reset_submit(
    State(state): State<HttpState>,
    viewer: Viewer,
    Form(form): Form<PasswordResetForm>,
) -> Response {
    const SOURCE: &str = "infra::http::auth::password_reset_submit";

    match state.accounts.request_password_reset(&form.email).await {
        Ok(_) => Redirect::to("/auth/password_reset/done/").into_response(),
        Err(AccountError::Invalid(errors)) => {
            let content = PasswordResetView {
                email: form.email,
                errors,
            };
            let view = LayoutContext::new(viewer.user(), "Reset password", content);
            render_template_response(PasswordResetTemplate { view }, StatusCode::OK)
        }
        Err(err) => account_error_response(SOURCE, err),
    }
}

async fn password_reset_done(viewer: Viewer) -> Response {
    let view = LayoutContext::new(viewer.user(), "Reset link sent", ());
    render_template_response(PasswordResetDoneTemplate { view }, StatusCode::OK)
}

async fn reset_confirm_form(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path((uidb64, token)): Path<(String, String)>,
) -> Response {
    const SOURCE: &str = "infra::http::auth::reset_confirm_form";

    match state.accounts.reset_link_user(&uidb64, &token).await {
        Ok(user) => render_reset_confirm(
            &viewer,
            ResetConfirmView {
                valid_link: user.is_some(),
                action: reset_action(&uidb64, &token),
                errors: Default::default(),
            },
        ),
        Err(err) => account_error_response(SOURCE, err),
    }
}

async fn reset_confirm_submit(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path((uidb64, token)): Path<(String, String)>,
    Form(form): Form<SetPasswordForm>,
) -> Response {
    const SOURCE: &str = "infra::http::auth::reset_confirm_submit";

    let action = reset_action(&uidb64, &token);
    match state
        .accounts
        .reset_password(&uidb64, &token, &form.new_password1, &form.new_password2)
        .await
    {
        Ok(()) => Redirect::to("/auth/reset/done/").into_response(),
        Err(AccountError::InvalidResetLink) => render_reset_confirm(
            &viewer,
            ResetConfirmView {
                valid_link: false,
                action,
                errors: Default::default(),
            },
        ),
        Err(AccountError::Invalid(errors)) => render_reset_confirm(
            &viewer,
            ResetConfirmView {
                valid_link: true,
                action,
                errors,
            },
        ),
        Err(err) => account_error_response(SOURCE, err),
    }
}

async fn reset_complete(viewer: Viewer) -> Response {
    let view = LayoutContext::new(viewer.user(), "Password reset complete", ());
    render_template_response(PasswordResetCompleteTemplate { view }, StatusCode::OK)
}

fn reset_action(uidb64: &str, token: &str) -> String {
    format!("/auth/reset/{uidb64}/{token}/")
}

fn render_reset_confirm(viewer: &Viewer, content: ResetConfirmView) -> Response {
    let view = LayoutContext::new(viewer.user(), "Enter new password", content);
    render_template_response(PasswordResetConfirmTemplate { view }, StatusCode::OK)
}
