use crate::application::error::{ErrorReport, HttpError};
use crate::application::feed::{GroupFeed, PostDetail, ProfileFeed};
use crate::application::pagination::Page;
use crate::application::validation::FieldErrors;
use crate::domain::entities::{AuthorSummary, GroupRecord, PostRecord, UserRecord};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

pub const SITE_NAME: &str = "Yatube";

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(viewer: Option<&UserRecord>) -> Response {
    let view = LayoutContext::new(viewer, "Page not found", ErrorPageView::not_found());
    let mut response = render_template_response(NotFoundTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Page chrome shared by every template: the logged-in user and the title.
pub struct LayoutContext<T> {
    pub site_name: &'static str,
    pub title: String,
    pub viewer: Option<AuthorSummary>,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(viewer: Option<&UserRecord>, title: impl Into<String>, content: T) -> Self {
        Self {
            site_name: SITE_NAME,
            title: title.into(),
            viewer: viewer.map(UserRecord::summary),
            content,
        }
    }

    pub fn is_viewer(&self, username: &str) -> bool {
        self.viewer
            .as_ref()
            .is_some_and(|viewer| viewer.username == username)
    }
}

pub struct ErrorPageView {
    pub status: u16,
    pub heading: &'static str,
    pub message: &'static str,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            status: 404,
            heading: "Page not found",
            message: "The page you requested does not exist.",
        }
    }
}

/// A paginated run of post cards.
pub struct ListingView {
    pub page: Page<PostRecord>,
}

pub struct PostDetailView {
    pub detail: PostDetail,
}

impl PostDetailView {
    pub fn post(&self) -> &PostRecord {
        &self.detail.post
    }
}

pub struct PostFormView {
    pub is_edit: bool,
    pub post_id: Option<i64>,
    pub text: String,
    pub group: Option<String>,
    pub groups: Vec<GroupRecord>,
    pub current_image: Option<String>,
    pub errors: FieldErrors,
}

impl PostFormView {
    pub fn blank(groups: Vec<GroupRecord>) -> Self {
        Self {
            is_edit: false,
            post_id: None,
            text: String::new(),
            group: None,
            groups,
            current_image: None,
            errors: FieldErrors::new(),
        }
    }

    pub fn for_post(post: &PostRecord, groups: Vec<GroupRecord>) -> Self {
        Self {
            is_edit: true,
            post_id: Some(post.id),
            text: post.text.clone(),
            group: post.group.as_ref().map(|group| group.id.to_string()),
            groups,
            current_image: post.image_url(),
            errors: FieldErrors::new(),
        }
    }

    pub fn is_selected(&self, group: &GroupRecord) -> bool {
        self.group.as_deref() == Some(group.id.to_string().as_str())
    }

    pub fn action(&self) -> String {
        match self.post_id {
            Some(id) => format!("/posts/{id}/edit/"),
            None => "/create/".to_string(),
        }
    }
}

#[derive(Default)]
pub struct LoginView {
    pub username: String,
    pub next: String,
    pub errors: FieldErrors,
}

#[derive(Default)]
pub struct SignupView {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub errors: FieldErrors,
}

#[derive(Default)]
pub struct PasswordFormView {
    pub errors: FieldErrors,
}

#[derive(Default)]
pub struct PasswordResetView {
    pub email: String,
    pub errors: FieldErrors,
}

pub struct ResetConfirmView {
    pub valid_link: bool,
    pub action: String,
    pub errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<ListingView>,
}

#[derive(Template)]
#[template(path = "posts/group_list.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupFeed>,
}

#[derive(Template)]
#[template(path = "posts/profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileFeed>,
}

#[derive(Template)]
#[template(path = "posts/follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<ListingView>,
}

#[derive(Template)]
#[template(path = "posts/post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailView>,
}

#[derive(Template)]
#[template(path = "posts/create_post.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

#[derive(Template)]
#[template(path = "users/login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginView>,
}

#[derive(Template)]
#[template(path = "users/signup.html")]
pub struct SignupTemplate {
    pub view: LayoutContext<SignupView>,
}

#[derive(Template)]
#[template(path = "users/logged_out.html")]
pub struct LoggedOutTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "users/password_change_form.html")]
pub struct PasswordChangeTemplate {
    pub view: LayoutContext<PasswordFormView>,
}

#[derive(Template)]
#[template(path = "users/password_change_done.html")]
pub struct PasswordChangeDoneTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "users/password_reset_form.html")]
pub struct PasswordResetTemplate {
    pub view: LayoutContext<PasswordResetView>,
}

#[derive(Template)]
#[template(path = "users/password_reset_done.html")]
pub struct PasswordResetDoneTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "users/password_reset_confirm.html")]
pub struct PasswordResetConfirmTemplate {
    pub view: LayoutContext<ResetConfirmView>,
}

#[derive(Template)]
#[template(path = "users/password_reset_complete.html")]
pub struct PasswordResetCompleteTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "about/author.html")]
pub struct AboutAuthorTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "about/tech.html")]
pub struct AboutTechTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "core/404.html")]
pub struct NotFoundTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
