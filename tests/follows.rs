mod support;

use axum::http::StatusCode;
use sqlx::SqlitePool;
use support::{TestApp, assert_redirect, body_text};
use yatube::application::repos::FollowsRepo;

#[sqlx::test(migrations = "./migrations")]
async fn user_can_follow_and_unfollow(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("auth").await;
    let reader = app.user("reader").await;
    let cookie = app.login(&reader).await;

    let response = app.get("/profile/auth/follow/", Some(&cookie)).await;
    assert_redirect(&response, "/profile/auth/");
    assert!(app.repos.is_following(reader.id, author.id).await.unwrap());

    // Following twice keeps a single edge.
    app.get("/profile/auth/follow/", Some(&cookie)).await;
    assert_eq!(app.repos.count_followers(author.id).await.unwrap(), 1);

    let profile = body_text(app.get("/profile/auth/", Some(&cookie)).await).await;
    assert!(profile.contains("/profile/auth/unfollow/"));

    let response = app.get("/profile/auth/unfollow/", Some(&cookie)).await;
    assert_redirect(&response, "/profile/auth/");
    assert!(!app.repos.is_following(reader.id, author.id).await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
async fn following_yourself_is_ignored(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("auth").await;
    let cookie = app.login(&author).await;

    let response = app.get("/profile/auth/follow/", Some(&cookie)).await;
    assert_redirect(&response, "/profile/auth/");
    assert!(!app.repos.is_following(author.id, author.id).await.unwrap());

    let profile = body_text(app.get("/profile/auth/", Some(&cookie)).await).await;
    assert!(!profile.contains("/profile/auth/follow/"));
}

#[sqlx::test(migrations = "./migrations")]
async fn following_an_unknown_user_is_not_found(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let reader = app.user("reader").await;
    let cookie = app.login(&reader).await;

    let response = app.get("/profile/nobody/follow/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn follow_feed_shows_only_followed_authors(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("auth").await;
    let follower = app.user("follower").await;
    let outsider = app.user("outsider").await;
    app.post(&author, "Post for followers", None).await;

    let follower_cookie = app.login(&follower).await;
    let outsider_cookie = app.login(&outsider).await;
    app.get("/profile/auth/follow/", Some(&follower_cookie)).await;

    let feed = body_text(app.get("/follow/", Some(&follower_cookie)).await).await;
    assert!(feed.contains("Post for followers"));

    let feed = body_text(app.get("/follow/", Some(&outsider_cookie)).await).await;
    assert!(!feed.contains("Post for followers"));
    assert!(feed.contains("No posts yet."));

    app.get("/profile/auth/unfollow/", Some(&follower_cookie)).await;
    let feed = body_text(app.get("/follow/", Some(&follower_cookie)).await).await;
    assert!(!feed.contains("Post for followers"));
}
