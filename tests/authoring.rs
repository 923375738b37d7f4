mod support;

use axum::http::{
    StatusCode,
    header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS},
};
use bytes::Bytes;
use sqlx::SqlitePool;
use support::{TINY_GIF, TestApp, assert_redirect, body_bytes, body_text};
use yatube::{
    application::{
        posts::{ImageUpload, PostError, PostSubmission},
        repos::{CommentsRepo, PostScope, PostsRepo},
    },
    domain::entities::UserRecord,
};

#[sqlx::test(migrations = "./migrations")]
async fn create_form_lists_groups(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("auth").await;
    app.group("Test group", "test-slug").await;
    let cookie = app.login(&author).await;

    let response = app.get("/create/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("name=\"text\""));
    assert!(body.contains("name=\"group\""));
    assert!(body.contains("name=\"image\""));
    assert!(body.contains("Test group"));
}

#[sqlx::test(migrations = "./migrations")]
async fn creating_a_post_redirects_to_profile(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("auth").await;
    let group = app.group("Test group", "test-slug").await;
    let cookie = app.login(&author).await;
    let group_id = group.id.to_string();

    let response = app
        .post_multipart(
            "/create/",
            Some(&cookie),
            &[("text", "Brand new post"), ("group", &group_id)],
            Some(("small.gif", TINY_GIF)),
        )
        .await;
    assert_redirect(&response, "/profile/auth/");

    assert_eq!(app.repos.count_posts(PostScope::All).await.unwrap(), 1);
    let posts = app.repos.list_posts(PostScope::All, 0, 10).await.unwrap();
    let post = &posts[0];
    assert_eq!(post.text, "Brand new post");
    assert_eq!(post.group.as_ref().map(|group| group.id), Some(group.id));
    let image = post.image.clone().expect("stored image");
    assert!(image.starts_with("posts/"));

    let detail = body_text(app.get(&format!("/posts/{}/", post.id), None).await).await;
    assert!(detail.contains(&format!("/media/{image}")));

    let media = app.get(&format!("/media/{image}"), None).await;
    assert_eq!(media.status(), StatusCode::OK);
    assert_eq!(body_bytes(media).await.as_ref(), TINY_GIF);
}

#[sqlx::test(migrations = "./migrations")]
async fn invalid_post_form_is_shown_again(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("auth").await;
    let cookie = app.login(&author).await;

    let response = app
        .post_multipart("/create/", Some(&cookie), &[("text", "   ")], None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("This field is required."));

    let response = app
        .post_multipart(
            "/create/",
            Some(&cookie),
            &[("text", "With a bad image")],
            Some(("fake.gif", b"not an image at all")),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Upload a valid image."));
    assert!(body.contains("With a bad image"));

    let response = app
        .post_multipart(
            "/create/",
            Some(&cookie),
            &[("text", "Unknown group"), ("group", "9999")],
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Select a valid choice."));

    assert_eq!(app.repos.count_posts(PostScope::All).await.unwrap(), 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn author_can_edit_own_post(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("auth").await;
    let group = app.group("Test group", "test-slug").await;
    let post = app.post(&author, "Original text", Some(&group)).await;
    let cookie = app.login(&author).await;
    let uri = format!("/posts/{}/edit/", post.id);

    let form = body_text(app.get(&uri, Some(&cookie)).await).await;
    assert!(form.contains("Original text"));
    assert!(form.contains(" selected"));

    let response = app
        .post_multipart(&uri, Some(&cookie), &[("text", "Edited text")], None)
        .await;
    assert_redirect(&response, &format!("/posts/{}/", post.id));

    let edited = app.repos.find_post(post.id).await.unwrap().expect("post");
    assert_eq!(edited.text, "Edited text");
    assert_eq!(edited.group, None);
    assert_eq!(edited.pub_date, post.pub_date);
    assert_eq!(app.repos.count_posts(PostScope::All).await.unwrap(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn non_author_is_sent_back_to_the_post(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("auth").await;
    let stranger = app.user("stranger").await;
    let post = app.post(&author, "Not yours", None).await;
    let cookie = app.login(&stranger).await;
    let uri = format!("/posts/{}/edit/", post.id);

    let response = app.get(&uri, Some(&cookie)).await;
    assert_redirect(&response, &format!("/posts/{}/", post.id));

    let response = app
        .post_multipart(&uri, Some(&cookie), &[("text", "Hijacked")], None)
        .await;
    assert_redirect(&response, &format!("/posts/{}/", post.id));

    let unchanged = app.repos.find_post(post.id).await.unwrap().expect("post");
    assert_eq!(unchanged.text, "Not yours");
}

#[sqlx::test(migrations = "./migrations")]
async fn editing_a_missing_post_is_not_found(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("auth").await;
    let cookie = app.login(&author).await;

    let response = app.get("/posts/4242/edit/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn comments_need_a_login(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("auth").await;
    let post = app.post(&author, "Commented post", None).await;
    let uri = format!("/posts/{}/comment/", post.id);

    let response = app.post_form(&uri, None, &[("text", "Anonymous words")]).await;
    assert_redirect(
        &response,
        &format!("/auth/login/?next=%2Fposts%2F{}%2Fcomment%2F", post.id),
    );
    assert!(app.repos.list_comments(post.id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn comment_appears_on_the_post(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("auth").await;
    let reader = app.user("reader").await;
    let post = app.post(&author, "Commented post", None).await;
    let cookie = app.login(&reader).await;
    let uri = format!("/posts/{}/comment/", post.id);

    let response = app
        .post_form(&uri, Some(&cookie), &[("text", "Nice post")])
        .await;
    assert_redirect(&response, &format!("/posts/{}/", post.id));

    let response = app.post_form(&uri, Some(&cookie), &[("text", "   ")]).await;
    assert_redirect(&response, &format!("/posts/{}/", post.id));

    let comments = app.repos.list_comments(post.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].author.username, "reader");

    let detail = body_text(app.get(&format!("/posts/{}/", post.id), None).await).await;
    assert!(detail.contains("Nice post"));
}

#[sqlx::test(migrations = "./migrations")]
async fn commenting_on_a_missing_post_is_not_found(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let reader = app.user("reader").await;
    let cookie = app.login(&reader).await;

    let response = app
        .post_form("/posts/777/comment/", Some(&cookie), &[("text", "Hello")])
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn uploaded_images_are_served_as_images(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("auth").await;
    let cookie = app.login(&author).await;

    let mut payload = TINY_GIF.to_vec();
    payload.extend_from_slice(b"<script>alert(document.cookie)</script>");
    let response = app
        .post_multipart(
            "/create/",
            Some(&cookie),
            &[("text", "Sneaky upload")],
            Some(("evil.html", &payload)),
        )
        .await;
    assert_redirect(&response, "/profile/auth/");

    let posts = app.repos.list_posts(PostScope::All, 0, 10).await.unwrap();
    let image = posts[0].image.clone().expect("stored image");
    assert!(image.ends_with("-evil.gif"), "{image}");

    let media = app.get(&format!("/media/{image}"), None).await;
    assert_eq!(media.status(), StatusCode::OK);
    assert_eq!(media.headers()[CONTENT_TYPE], "image/gif");
    assert_eq!(media.headers()[X_CONTENT_TYPE_OPTIONS], "nosniff");
}

#[sqlx::test(migrations = "./migrations")]
async fn editing_replaces_and_clears_the_image(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("auth").await;
    let cookie = app.login(&author).await;

    let response = app
        .post_multipart(
            "/create/",
            Some(&cookie),
            &[("text", "Post with a picture")],
            Some(("first.gif", TINY_GIF)),
        )
        .await;
    assert_redirect(&response, "/profile/auth/");
    let posts = app.repos.list_posts(PostScope::All, 0, 10).await.unwrap();
    let post = posts[0].clone();
    let first = post.image.clone().expect("first image");
    let uri = format!("/posts/{}/edit/", post.id);

    let response = app
        .post_multipart(
            &uri,
            Some(&cookie),
            &[("text", "Post with a new picture")],
            Some(("second.gif", TINY_GIF)),
        )
        .await;
    assert_redirect(&response, &format!("/posts/{}/", post.id));

    let edited = app.repos.find_post(post.id).await.unwrap().expect("post");
    let second = edited.image.clone().expect("second image");
    assert_ne!(second, first);
    assert_eq!(
        app.get(&format!("/media/{first}"), None).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.get(&format!("/media/{second}"), None).await.status(),
        StatusCode::OK
    );

    let response = app
        .post_multipart(
            &uri,
            Some(&cookie),
            &[("text", "Post without a picture"), ("image-clear", "on")],
            None,
        )
        .await;
    assert_redirect(&response, &format!("/posts/{}/", post.id));

    let cleared = app.repos.find_post(post.id).await.unwrap().expect("post");
    assert_eq!(cleared.image, None);
    assert_eq!(cleared.text, "Post without a picture");
    assert_eq!(
        app.get(&format!("/media/{second}"), None).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn failed_save_does_not_leave_the_image_behind(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let author = app.user("auth").await;
    let ghost = UserRecord {
        id: author.id + 1000,
        ..author.clone()
    };

    let result = app
        .state
        .posts
        .create(
            &ghost,
            PostSubmission {
                text: "Nobody wrote this".to_string(),
                image: Some(ImageUpload {
                    filename: "orphan.gif".to_string(),
                    data: Bytes::from_static(TINY_GIF),
                }),
                ..PostSubmission::default()
            },
        )
        .await;
    assert!(matches!(result, Err(PostError::Repo(_))));

    let stored = std::fs::read_dir(app.media.path().join("posts"))
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(stored, 0);
}
