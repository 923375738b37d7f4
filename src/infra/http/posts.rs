//! Login-gated mutations: authoring posts, commenting and following.

use axum::{
    extract::{Form, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::Multipart;
use serde::Deserialize;
use url::form_urlencoded;

use crate::{
    application::{
        posts::{PostError, PostSubmission},
        validation::FieldErrors,
    },
    domain::entities::{PostRecord, UserRecord},
    presentation::views::{LayoutContext, PostFormTemplate, PostFormView, render_template_response},
};

use super::{
    HttpState, follow_error_response, forms::read_post_form, not_found_response,
    post_error_response, public::parse_post_id,
    session::RequireUser,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CommentForm {
    text: String,
}

pub(super) async fn create_form(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
) -> Response {
    const SOURCE: &str = "infra::http::posts::create_form";

    match state.posts.group_choices().await {
        Ok(groups) => render_post_form(&user, PostFormView::blank(groups)),
        Err(err) => post_error_response(SOURCE, err, Some(&user)),
    }
}

pub(super) async fn create_submit(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    mut multipart: Multipart,
) -> Response {
    const SOURCE: &str = "infra::http::posts::create_submit";

    let submission = match read_post_form(&mut multipart).await {
        Ok(submission) => submission,
        Err(err) => return err.into_response(),
    };
    let echo = FormEcho::from(&submission);

    match state.posts.create(&user, submission).await {
        Ok(_) => redirect_to_profile(&user.username),
        Err(PostError::Invalid(errors)) => match state.posts.group_choices().await {
            Ok(groups) => {
                let form = echo.apply(PostFormView::blank(groups), errors);
                render_post_form(&user, form)
            }
            Err(err) => post_error_response(SOURCE, err, Some(&user)),
        },
        Err(err) => post_error_response(SOURCE, err, Some(&user)),
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(raw_id): Path<String>,
) -> Response {
    const SOURCE: &str = "infra::http::posts::edit_form";

    let Some(post_id) = parse_post_id(&raw_id) else {
        return not_found_response(SOURCE, "malformed post id", Some(&user));
    };

    let post = match state.posts.editable(post_id, &user).await {
        Ok(post) => post,
        Err(PostError::Forbidden) => return redirect_to_post(post_id),
        Err(err) => return post_error_response(SOURCE, err, Some(&user)),
    };

    match state.posts.group_choices().await {
        Ok(groups) => render_post_form(&user, PostFormView::for_post(&post, groups)),
        Err(err) => post_error_response(SOURCE, err, Some(&user)),
    }
}

pub(super) async fn edit_submit(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(raw_id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    const SOURCE: &str = "infra::http::posts::edit_submit";

    let Some(post_id) = parse_post_id(&raw_id) else {
        return not_found_response(SOURCE, "malformed post id", Some(&user));
    };
    let submission = match read_post_form(&mut multipart).await {
        Ok(submission) => submission,
        Err(err) => return err.into_response(),
    };
    let echo = FormEcho::from(&submission);

    match state.posts.update(post_id, &user, submission).await {
        Ok(post) => redirect_to_post(post.id),
        Err(PostError::Forbidden) => redirect_to_post(post_id),
        Err(PostError::Invalid(errors)) => {
            match rerender_edit(&state, &user, post_id, echo, errors).await {
                Ok(response) => response,
                Err(err) => post_error_response(SOURCE, err, Some(&user)),
            }
        }
        Err(err) => post_error_response(SOURCE, err, Some(&user)),
    }
}

/// Adds a comment and returns to the post. Blank comments are dropped quietly.
pub(super) async fn add_comment(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(raw_id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    const SOURCE: &str = "infra::http::posts::add_comment";

    let Some(post_id) = parse_post_id(&raw_id) else {
        return not_found_response(SOURCE, "malformed post id", Some(&user));
    };

    match state.posts.comment(post_id, &user, &form.text).await {
        Ok(_) => redirect_to_post(post_id),
        Err(err) => post_error_response(SOURCE, err, Some(&user)),
    }
}

pub(super) async fn profile_follow(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(username): Path<String>,
) -> Response {
    const SOURCE: &str = "infra::http::posts::profile_follow";

    match state.follows.follow(&user, &username).await {
        Ok(_) => redirect_to_profile(&username),
        Err(err) => follow_error_response(SOURCE, err, Some(&user)),
    }
}

pub(super) async fn profile_unfollow(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(username): Path<String>,
) -> Response {
    const SOURCE: &str = "infra::http::posts::profile_unfollow";

    match state.follows.unfollow(&user, &username).await {
        Ok(_) => redirect_to_profile(&username),
        Err(err) => follow_error_response(SOURCE, err, Some(&user)),
    }
}

/// Submitted values shown again when the form is rejected.
struct FormEcho {
    text: String,
    group: Option<String>,
}

impl From<&PostSubmission> for FormEcho {
    fn from(submission: &PostSubmission) -> Self {
        Self {
            text: submission.text.clone(),
            group: submission.group.clone(),
        }
    }
}

impl FormEcho {
    fn apply(self, mut form: PostFormView, errors: FieldErrors) -> PostFormView {
        form.text = self.text;
        form.group = self.group;
        form.errors = errors;
        form
    }
}

async fn rerender_edit(
    state: &HttpState,
    user: &UserRecord,
    post_id: i64,
    echo: FormEcho,
    errors: FieldErrors,
) -> Result<Response, PostError> {
    let post: PostRecord = state.posts.editable(post_id, user).await?;
    let groups = state.posts.group_choices().await?;
    let form = echo.apply(PostFormView::for_post(&post, groups), errors);
    Ok(render_post_form(user, form))
}

fn render_post_form(user: &UserRecord, form: PostFormView) -> Response {
    let title = if form.is_edit { "Edit post" } else { "New post" };
    let view = LayoutContext::new(Some(user), title, form);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

fn redirect_to_post(post_id: i64) -> Response {
    Redirect::to(&format!("/posts/{post_id}/")).into_response()
}

fn redirect_to_profile(username: &str) -> Response {
    Redirect::to(&profile_path(username)).into_response()
}

fn profile_path(username: &str) -> String {
    let segment: String = form_urlencoded::byte_serialize(username.as_bytes()).collect();
    format!("/profile/{segment}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_paths_escape_the_username() {
        assert_eq!(profile_path("auth"), "/profile/auth/");
        assert_eq!(profile_path("a.b+c@d"), "/profile/a.b%2Bc%40d/");
        assert_eq!(profile_path("лев"), "/profile/%D0%BB%D0%B5%D0%B2/");
    }
}
