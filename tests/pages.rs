mod support;

use axum::http::StatusCode;
use sqlx::SqlitePool;
use support::{TestApp, assert_redirect, body_text};

#[sqlx::test(migrations = "./migrations")]
async fn public_pages_are_reachable_by_anyone(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("auth").await;
    let group = app.group("Test group", "test-slug").await;
    let post = app.post(&author, "Test post text", Some(&group)).await;

    for uri in [
        "/".to_string(),
        format!("/group/{}/", group.slug),
        format!("/profile/{}/", author.username),
        format!("/posts/{}/", post.id),
        "/about/author/".to_string(),
        "/about/tech/".to_string(),
        "/auth/login/".to_string(),
        "/auth/signup/".to_string(),
        "/auth/password_reset/".to_string(),
    ] {
        let response = app.get(&uri, None).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn unknown_pages_render_not_found(pool: SqlitePool) {
    let app = TestApp::new(pool);
    app.user("auth").await;

    for uri in [
        "/unexisting_page/",
        "/group/missing/",
        "/profile/nobody/",
        "/posts/999/",
        "/posts/abc/",
    ] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        let body = body_text(response).await;
        assert!(body.contains("Page not found"), "{uri}");
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn login_required_pages_redirect_anonymous_users(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("auth").await;
    let post = app.post(&author, "Test post text", None).await;

    let cases = [
        ("/create/".to_string(), "/auth/login/?next=%2Fcreate%2F".to_string()),
        (
            format!("/posts/{}/edit/", post.id),
            format!("/auth/login/?next=%2Fposts%2F{}%2Fedit%2F", post.id),
        ),
        ("/follow/".to_string(), "/auth/login/?next=%2Ffollow%2F".to_string()),
        (
            "/profile/auth/follow/".to_string(),
            "/auth/login/?next=%2Fprofile%2Fauth%2Ffollow%2F".to_string(),
        ),
        (
            "/auth/password_change/".to_string(),
            "/auth/login/?next=%2Fauth%2Fpassword_change%2F".to_string(),
        ),
    ];

    for (uri, target) in cases {
        let response = app.get(&uri, None).await;
        assert_redirect(&response, &target);
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn index_paginates_ten_posts_per_page(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("auth").await;
    let group = app.group("Test group", "test-slug").await;
    for index in 0..13 {
        app.post(&author, &format!("Paged post {index}"), Some(&group)).await;
    }

    for base in ["/", "/group/test-slug/", "/profile/auth/"] {
        let first = body_text(app.get(base, None).await).await;
        assert_eq!(first.matches("class=\"post\"").count(), 10, "{base}");

        let second = body_text(app.get(&format!("{base}?page=2"), None).await).await;
        assert_eq!(second.matches("class=\"post\"").count(), 3, "{base}");
    }

    // Out of range and malformed page numbers fall back to a valid page.
    let last = body_text(app.get("/?page=99", None).await).await;
    assert_eq!(last.matches("class=\"post\"").count(), 3);
    let first = body_text(app.get("/?page=abc", None).await).await;
    assert_eq!(first.matches("class=\"post\"").count(), 10);
}

#[sqlx::test(migrations = "./migrations")]
async fn listings_show_newest_posts_first(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("auth").await;
    let older = app.post(&author, "Older post", None).await;
    let newer = app.post(&author, "Newer post", None).await;

    let body = body_text(app.get("/", None).await).await;
    let newer_at = body.find(&format!("id=\"post-{}\"", newer.id)).expect("newer post");
    let older_at = body.find(&format!("id=\"post-{}\"", older.id)).expect("older post");
    assert!(newer_at < older_at);
}

#[sqlx::test(migrations = "./migrations")]
async fn group_page_lists_only_its_posts(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("auth").await;
    let group = app.group("Test group", "test-slug").await;
    let other = app.group("Other group", "other-slug").await;
    app.post(&author, "In the first group", Some(&group)).await;
    app.post(&author, "In the other group", Some(&other)).await;

    let body = body_text(app.get("/group/test-slug/", None).await).await;
    assert!(body.contains("Test group"));
    assert!(body.contains("Test description"));
    assert!(body.contains("In the first group"));
    assert!(!body.contains("In the other group"));

    let body = body_text(app.get("/group/other-slug/", None).await).await;
    assert!(!body.contains("In the first group"));
}

#[sqlx::test(migrations = "./migrations")]
async fn profile_shows_author_posts_and_count(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("auth").await;
    let stranger = app.user("stranger").await;
    app.post(&author, "First by author", None).await;
    app.post(&author, "Second by author", None).await;
    app.post(&stranger, "Written by stranger", None).await;

    let body = body_text(app.get("/profile/auth/", None).await).await;
    assert!(body.contains("<span class=\"post-count\">2</span>"));
    assert!(body.contains("First by author"));
    assert!(!body.contains("Written by stranger"));
}

#[sqlx::test(migrations = "./migrations")]
async fn post_detail_shows_post_and_comment_form_for_users(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("auth").await;
    let reader = app.user("reader").await;
    let group = app.group("Test group", "test-slug").await;
    let post = app.post(&author, "Detailed post text", Some(&group)).await;
    let uri = format!("/posts/{}/", post.id);

    let anonymous = body_text(app.get(&uri, None).await).await;
    assert!(anonymous.contains("Detailed post text"));
    assert!(anonymous.contains("<span class=\"author-post-count\">1</span>"));
    assert!(anonymous.contains("/group/test-slug/"));
    assert!(!anonymous.contains("name=\"text\""));
    assert!(!anonymous.contains("Edit post"));

    let cookie = app.login(&reader).await;
    let as_reader = body_text(app.get(&uri, Some(&cookie)).await).await;
    assert!(as_reader.contains("name=\"text\""));
    assert!(!as_reader.contains("Edit post"));

    let cookie = app.login(&author).await;
    let as_author = body_text(app.get(&uri, Some(&cookie)).await).await;
    assert!(as_author.contains("Edit post"));
}

#[sqlx::test(migrations = "./migrations")]
async fn health_endpoint_reports_database(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let response = app.get("/_health/db", None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
