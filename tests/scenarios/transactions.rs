use std::sync::Arc;
use std::time::Duration;

use crate::common::{caller, comment_text, post_request, StubFileStorage, TestApp};
use crud_core::application::dto::CreateCommentRequest;
use crud_core::domain::{Image, Post};
use crud_core::infrastructure::repositories::EntityRepository;
use crud_core::shared::error::AppError;

async fn stored_rows(app: &TestApp) -> (u64, u64) {
    let posts = EntityRepository::<Post, _>::new(Arc::clone(&app.backend));
    let images = EntityRepository::<Image, _>::new(Arc::clone(&app.backend));
    (
        posts.count(None, &[]).await.unwrap(),
        images.count(None, &[]).await.unwrap(),
    )
}

#[tokio::test]
async fn test_failed_third_image_leaves_nothing_behind() {
    let app = TestApp::with_files(StubFileStorage::with_uploads(&["one.png", "two.png"]));

    let err = app
        .state
        .posts
        .create_post(caller(1), post_request(&["one.png", "two.png", "three.png"]))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::TransactionFailed(_)));
    assert!(matches!(err.root_cause(), AppError::BadRequest(_)));
    assert_eq!(stored_rows(&app).await, (0, 0));
    assert_eq!(app.backend.open_connections(), 0);
    assert_eq!(app.backend.stats().rolled_back, 1);
    assert_eq!(app.backend.stats().committed, 0);
}

#[tokio::test]
async fn test_successful_post_promotes_every_image() {
    let app = TestApp::with_files(StubFileStorage::with_uploads(&["one.png", "two.png"]));

    let detail = app
        .state
        .posts
        .create_post(caller(1), post_request(&["one.png", "two.png"]))
        .await
        .unwrap();

    assert_eq!(detail.images.len(), 2);
    assert_eq!(app.files.promoted(), vec!["one.png", "two.png"]);
    assert_eq!(stored_rows(&app).await, (1, 2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_comments_keep_counter_exact() {
    const WRITERS: usize = 16;
    let app = TestApp::new();
    let post_id = app.seed_posts(1).await[0];

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let comments = app.state.comments.clone();
            tokio::spawn(async move {
                comments
                    .create_comment(
                        caller(i as i64 + 10),
                        post_id,
                        CreateCommentRequest {
                            comment: comment_text(),
                        },
                    )
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let post = app.state.posts.get_post(post_id).await.unwrap().post;
    assert_eq!(post.comment_count, WRITERS as i64);
    assert_eq!(app.backend.stats().committed as usize, WRITERS + 1);
}

#[tokio::test]
async fn test_cancelled_write_releases_connection() {
    let app = TestApp::with_files(
        StubFileStorage::with_uploads(&["slow.png"]).slow(Duration::from_millis(500)),
    );

    let result = tokio::time::timeout(
        Duration::from_millis(20),
        app.state
            .posts
            .create_post(caller(1), post_request(&["slow.png"])),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(app.backend.open_connections(), 0);
    assert_eq!(stored_rows(&app).await, (0, 0));
    assert!(app.files.promoted().is_empty());
}

#[tokio::test]
async fn test_storage_outage_is_reported_as_transaction_failure() {
    let app = TestApp::new();
    let post_id = app.seed_posts(1).await[0];
    app.backend.set_available(false);

    let err = app
        .state
        .comments
        .create_comment(
            caller(2),
            post_id,
            CreateCommentRequest {
                comment: comment_text(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::TransactionFailed(_)));
    assert!(!err.root_cause().is_client_error());
    assert_eq!(app.backend.open_connections(), 0);
}
