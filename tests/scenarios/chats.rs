use crate::common::TestApp;
use crud_core::application::dto::CreateChatRequest;
use crud_core::shared::error::AppError;

#[tokio::test]
async fn test_chat_creation_and_listing() {
    let app = TestApp::new();
    let a = app.create_user("alpha").await;
    let b = app.create_user("beta").await;
    let chats = &app.state.chats;

    let first = chats
        .create_chat(CreateChatRequest {
            user_ids: vec![a.id, b.id],
        })
        .await
        .unwrap();
    chats
        .create_chat(CreateChatRequest { user_ids: vec![a.id] })
        .await
        .unwrap();

    let members = chats.get_chat_members(first.chat.id).await.unwrap();
    assert_eq!(
        members.iter().map(|m| m.user_id).collect::<Vec<_>>(),
        vec![a.id, b.id]
    );

    let page = chats.paginate_chats([("take", "1")]).await.unwrap();
    let page = page.as_cursor().unwrap();
    assert_eq!(page.data[0].id, first.chat.id);
    assert_eq!(
        page.next.as_deref(),
        Some("http://localhost:3000/chats?take=1&where__id__more_than=1")
    );
}

#[tokio::test]
async fn test_chat_with_unknown_user_is_rolled_back() {
    let app = TestApp::new();
    let a = app.create_user("alpha").await;

    let err = app
        .state
        .chats
        .create_chat(CreateChatRequest {
            user_ids: vec![a.id, a.id + 100],
        })
        .await
        .unwrap_err();

    assert!(matches!(err.root_cause(), AppError::NotFound(_)));
    assert!(!app.state.chats.chat_exists(None, 1).await.unwrap());
}
