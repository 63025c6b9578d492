use pretty_assertions::assert_eq;
use url::Url;

use std::sync::Arc;

use crate::common::{caller, comment_text, post_request, StubFileStorage, TestApp};
use crud_core::application::dto::CreateCommentRequest;
use crud_core::domain::query::FilterError;
use crud_core::domain::Post;
use crud_core::infrastructure::repositories::EntityRepository;
use crud_core::shared::error::AppError;

/// Follow `next` links from the first page until the listing ends.
async fn walk_posts(app: &TestApp, first: Vec<(String, String)>) -> Vec<Vec<i64>> {
    let mut pages = Vec::new();
    let mut params = first;
    loop {
        let page = app.state.posts.paginate_posts(params).await.unwrap();
        let page = page.as_cursor().unwrap().clone();
        pages.push(page.data.iter().map(|d| d.post.id).collect());

        let Some(next) = page.next else { break };
        let url = Url::parse(&next).unwrap();
        assert_eq!(url.path(), "/posts");
        params = url.query_pairs().into_owned().collect();
    }
    pages
}

#[tokio::test]
async fn test_cursor_walk_visits_every_row_once() {
    let app = TestApp::new();
    let ids = app.seed_posts(7).await;

    let pages = walk_posts(&app, vec![("take".into(), "2".into())]).await;

    assert_eq!(pages.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 2, 2, 1]);
    assert_eq!(pages.concat(), ids);
}

#[tokio::test]
async fn test_cursor_walk_ends_on_empty_page_when_rows_divide_evenly() {
    let app = TestApp::new();
    let ids = app.seed_posts(4).await;

    let pages = walk_posts(&app, vec![("take".into(), "2".into())]).await;

    assert_eq!(pages.len(), 3);
    assert!(pages[2].is_empty());
    assert_eq!(pages.concat(), ids);
}

#[tokio::test]
async fn test_cursor_walk_keeps_other_filters() {
    let app = TestApp::new();
    app.seed_posts(9).await;

    let pages = walk_posts(
        &app,
        vec![
            ("where__id__less_than_or_equal".into(), "6".into()),
            ("take".into(), "4".into()),
        ],
    )
    .await;

    assert_eq!(pages.concat(), vec![1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn test_descending_walk() {
    let app = TestApp::new();
    app.seed_posts(5).await;

    let pages = walk_posts(
        &app,
        vec![
            ("order__createdAt".into(), "DESC".into()),
            ("take".into(), "2".into()),
        ],
    )
    .await;

    assert_eq!(pages.concat(), vec![5, 4, 3, 2, 1]);
}

#[tokio::test]
async fn test_cursor_listing_rejects_non_identity_order() {
    let app = TestApp::new();
    let ids = app.seed_posts(4).await;
    let posts = EntityRepository::<Post, _>::new(Arc::clone(&app.backend));
    for (id, likes) in ids.iter().zip([5, 1, 9, 3]) {
        posts.increment(None, *id, Post::LIKE_COUNT, likes).await.unwrap();
    }

    let err = app
        .state
        .posts
        .paginate_posts([("order__likeCount", "DESC"), ("take", "2")])
        .await
        .unwrap_err();
    match err {
        AppError::Filter(FilterError::CursorOrdering { key }) => assert_eq!(key, "order__likeCount"),
        other => panic!("unexpected error: {:?}", other),
    }

    let page = app
        .state
        .posts
        .paginate_posts([("order__likeCount", "DESC"), ("take", "4"), ("page", "1")])
        .await
        .unwrap();
    let ordered: Vec<i64> = page.data().iter().map(|d| d.post.id).collect();
    assert_eq!(ordered, vec![ids[2], ids[0], ids[3], ids[1]]);
}

#[tokio::test]
async fn test_listing_carries_author_and_ordered_images() {
    let app = TestApp::with_files(StubFileStorage::with_uploads(&["b.png", "a.png", "c.png"]));
    let ada = app.create_user("ada").await;
    let bob = app.create_user("bob").await;
    let first = app
        .state
        .posts
        .create_post(caller(ada.id), post_request(&["b.png", "a.png"]))
        .await
        .unwrap();
    let second = app
        .state
        .posts
        .create_post(caller(bob.id), post_request(&["c.png"]))
        .await
        .unwrap();
    let bare = app
        .state
        .posts
        .create_post(caller(ada.id), post_request(&[]))
        .await
        .unwrap();

    let page = app.state.posts.paginate_posts([("take", "10")]).await.unwrap();
    let listed: Vec<(i64, Option<&str>, Vec<&str>)> = page
        .data()
        .iter()
        .map(|d| {
            (
                d.post.id,
                d.author.as_ref().map(|a| a.nickname.as_str()),
                d.images.iter().map(|i| i.path.as_str()).collect(),
            )
        })
        .collect();
    assert_eq!(
        listed,
        vec![
            (first.post.id, Some("ada"), vec!["b.png", "a.png"]),
            (second.post.id, Some("bob"), vec!["c.png"]),
            (bare.post.id, Some("ada"), vec![]),
        ]
    );
    assert_eq!(page.data()[0], first);
}

#[tokio::test]
async fn test_offset_total_is_independent_of_window() {
    let app = TestApp::new();
    app.seed_posts(11).await;

    for (page, take, expected_rows) in [("1", "5", 5), ("2", "5", 5), ("3", "5", 0), ("1", "20", 10)] {
        let result = app
            .state
            .posts
            .paginate_posts([
                ("where__id__more_than", "1"),
                ("page", page),
                ("take", take),
            ])
            .await
            .unwrap();
        let result = result.as_offset().unwrap();
        assert_eq!(result.total, 10);
        assert_eq!(result.data.len(), expected_rows);
    }
}

#[tokio::test]
async fn test_comment_listing_links_to_its_post() {
    let app = TestApp::new();
    let post_id = app.seed_posts(1).await[0];
    for _ in 0..3 {
        app.state
            .comments
            .create_comment(
                caller(2),
                post_id,
                CreateCommentRequest {
                    comment: comment_text(),
                },
            )
            .await
            .unwrap();
    }

    let page = app
        .state
        .comments
        .paginate_comments(post_id, [("take", "2")])
        .await
        .unwrap();
    let next = page.as_cursor().unwrap().next.clone().unwrap();
    let url = Url::parse(&next).unwrap();
    assert_eq!(url.path(), format!("/posts/{}/comments", post_id));

    let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let rest = app
        .state
        .comments
        .paginate_comments(post_id, params)
        .await
        .unwrap();
    assert_eq!(rest.data().len(), 1);
    assert_eq!(rest.as_cursor().unwrap().next, None);
}

#[tokio::test]
async fn test_malformed_filters_never_reach_storage() {
    let app = TestApp::new();
    app.backend.set_available(false);

    for (key, value) in [
        ("where__id__more_than__now", "1"),
        ("where__id__between", "3"),
        ("where__likeCount__more_than", "many"),
        ("where__id__near", "1"),
    ] {
        let err = app.state.posts.paginate_posts([(key, value)]).await.unwrap_err();
        assert!(matches!(err, AppError::Filter(_)), "{} should be rejected", key);
    }
}
