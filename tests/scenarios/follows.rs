use crate::common::TestApp;
use crud_core::shared::error::AppError;

#[tokio::test]
async fn test_confirmed_follows_drive_counters() {
    let app = TestApp::new();
    let star = app.create_user("star").await;
    let fans = [
        app.create_user("fan1").await,
        app.create_user("fan2").await,
        app.create_user("fan3").await,
    ];
    let users = &app.state.users;

    for fan in &fans {
        users.follow_user(fan.id, star.id).await.unwrap();
    }
    users.confirm_follow(fans[0].id, star.id).await.unwrap();
    users.confirm_follow(fans[1].id, star.id).await.unwrap();

    assert_eq!(users.get_user(star.id).await.unwrap().follower_count, 2);
    assert_eq!(users.get_followers(star.id, false).await.unwrap().len(), 2);
    assert_eq!(users.get_followers(star.id, true).await.unwrap().len(), 3);

    users.delete_follow(fans[0].id, star.id).await.unwrap();
    users.delete_follow(fans[2].id, star.id).await.unwrap();

    let star = users.get_user(star.id).await.unwrap();
    assert_eq!(star.follower_count, 1);
    assert_eq!(users.get_user(fans[0].id).await.unwrap().followee_count, 0);
    assert_eq!(users.get_user(fans[1].id).await.unwrap().followee_count, 1);
}

#[tokio::test]
async fn test_confirming_unknown_follow_changes_nothing() {
    let app = TestApp::new();
    let a = app.create_user("alpha").await;
    let b = app.create_user("beta").await;

    let err = app.state.users.confirm_follow(a.id, b.id).await.unwrap_err();
    assert!(matches!(err.root_cause(), AppError::NotFound(_)));
    assert_eq!(app.state.users.get_user(b.id).await.unwrap().follower_count, 0);
    assert_eq!(app.backend.open_connections(), 0);
}
