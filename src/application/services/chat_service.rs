//! Chat Service
//!
//! Chat rooms and their memberships.

use std::sync::Arc;

use super::pagination_service::PaginationService;
use crate::application::dto::{ChatDetail, CreateChatRequest, Page};
use crate::domain::query::{Direction, FindOptions, OrderSpec, Predicate, QueryComposer};
use crate::domain::value_objects::ID_FIELD;
use crate::domain::{Chat, ChatMember, NewChat, NewChatMember, User, CHAT_SCHEMA};
use crate::infrastructure::database::{Backend, TransactionHandle, TransactionScope};
use crate::infrastructure::repositories::EntityRepository;
use crate::shared::error::AppError;
use crate::shared::validation::validate;

pub struct ChatService<B: Backend> {
    chats: EntityRepository<Chat, B>,
    members: EntityRepository<ChatMember, B>,
    users: EntityRepository<User, B>,
    scope: TransactionScope<B>,
    composer: Arc<QueryComposer>,
    pagination: Arc<PaginationService>,
}

impl<B: Backend> Clone for ChatService<B> {
    fn clone(&self) -> Self {
        Self {
            chats: self.chats.clone(),
            members: self.members.clone(),
            users: self.users.clone(),
            scope: self.scope.clone(),
            composer: Arc::clone(&self.composer),
            pagination: Arc::clone(&self.pagination),
        }
    }
}

impl<B: Backend> ChatService<B> {
    pub fn new(
        chats: EntityRepository<Chat, B>,
        members: EntityRepository<ChatMember, B>,
        users: EntityRepository<User, B>,
        scope: TransactionScope<B>,
        composer: Arc<QueryComposer>,
        pagination: Arc<PaginationService>,
    ) -> Self {
        Self {
            chats,
            members,
            users,
            scope,
            composer,
            pagination,
        }
    }

    /// Open a chat between the given users.
    ///
    /// Repeated ids are collapsed; every user must exist.
    pub async fn create_chat(&self, request: CreateChatRequest) -> Result<ChatDetail, AppError> {
        validate(&request)?;
        let mut user_ids = Vec::with_capacity(request.user_ids.len());
        for id in request.user_ids {
            if !user_ids.contains(&id) {
                user_ids.push(id);
            }
        }
        let this = self.clone();

        let detail = self
            .scope
            .with_transaction(move |tx| {
                Box::pin(async move {
                    for &user_id in &user_ids {
                        if !this
                            .users
                            .exists(Some(&mut *tx), &[Predicate::equal(ID_FIELD, user_id)])
                            .await?
                        {
                            return Err(AppError::NotFound(format!("User {} not found", user_id)));
                        }
                    }

                    let chat = this.chats.save(Some(&mut *tx), NewChat).await?;
                    let mut members = Vec::with_capacity(user_ids.len());
                    for user_id in user_ids {
                        let member = this
                            .members
                            .save(
                                Some(&mut *tx),
                                NewChatMember {
                                    chat_id: chat.id,
                                    user_id,
                                },
                            )
                            .await?;
                        members.push(member);
                    }
                    Ok(ChatDetail { chat, members })
                })
            })
            .await?;

        tracing::info!(
            chat_id = detail.chat.id,
            members = detail.members.len(),
            "Chat created"
        );
        Ok(detail)
    }

    pub async fn chat_exists(
        &self,
        tx: Option<&mut TransactionHandle<B>>,
        id: i64,
    ) -> Result<bool, AppError> {
        Ok(self
            .chats
            .exists(tx, &[Predicate::equal(ID_FIELD, id)])
            .await?)
    }

    pub async fn paginate_chats<I, K, V>(&self, params: I) -> Result<Page<Chat>, AppError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let spec = self.composer.compose(&CHAT_SCHEMA, params)?;
        self.pagination
            .paginate(&self.chats, &spec, Vec::new(), "chats")
            .await
    }

    /// Memberships of a chat in join order.
    pub async fn get_chat_members(&self, chat_id: i64) -> Result<Vec<ChatMember>, AppError> {
        if !self.chat_exists(None, chat_id).await? {
            return Err(AppError::NotFound(format!("Chat {} not found", chat_id)));
        }
        let options = FindOptions::new()
            .filter(Predicate::equal(ChatMember::CHAT_ID, chat_id))
            .order_by(OrderSpec::new(ID_FIELD, Direction::Asc));
        Ok(self.members.find(None, &options).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewUser;
    use crate::infrastructure::database::MemoryBackend;
    use url::Url;

    fn service(backend: &Arc<MemoryBackend>) -> ChatService<MemoryBackend> {
        ChatService::new(
            EntityRepository::new(Arc::clone(backend)),
            EntityRepository::new(Arc::clone(backend)),
            EntityRepository::new(Arc::clone(backend)),
            TransactionScope::new(Arc::clone(backend)),
            Arc::new(QueryComposer::default()),
            Arc::new(PaginationService::new(
                Url::parse("http://localhost:3000/").unwrap(),
            )),
        )
    }

    async fn seed_users(backend: &Arc<MemoryBackend>, count: usize) -> Vec<i64> {
        let users = EntityRepository::<User, _>::new(Arc::clone(backend));
        let mut ids = Vec::new();
        for i in 0..count {
            let user = users
                .save(
                    None,
                    NewUser {
                        nickname: format!("user{}", i),
                        email: format!("user{}@example.com", i),
                        role: Default::default(),
                    },
                )
                .await
                .unwrap();
            ids.push(user.id);
        }
        ids
    }

    #[tokio::test]
    async fn test_create_chat_with_members() {
        let backend = Arc::new(MemoryBackend::new());
        let chats = service(&backend);
        let ids = seed_users(&backend, 2).await;

        let detail = chats
            .create_chat(CreateChatRequest {
                user_ids: vec![ids[1], ids[0], ids[1]],
            })
            .await
            .unwrap();

        let members: Vec<i64> = detail.members.iter().map(|m| m.user_id).collect();
        assert_eq!(members, vec![ids[1], ids[0]]);
        assert!(chats.chat_exists(None, detail.chat.id).await.unwrap());
        assert_eq!(chats.get_chat_members(detail.chat.id).await.unwrap(), detail.members);
    }

    #[tokio::test]
    async fn test_unknown_member_leaves_no_chat() {
        let backend = Arc::new(MemoryBackend::new());
        let chats = service(&backend);
        let ids = seed_users(&backend, 1).await;

        let err = chats
            .create_chat(CreateChatRequest {
                user_ids: vec![ids[0], 999],
            })
            .await
            .unwrap_err();
        assert!(matches!(err.root_cause(), AppError::NotFound(_)));

        let page = chats.paginate_chats([("page", "1")]).await.unwrap();
        assert_eq!(page.as_offset().unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_empty_chat_is_rejected() {
        let backend = Arc::new(MemoryBackend::new());
        let chats = service(&backend);
        assert!(matches!(
            chats.create_chat(CreateChatRequest { user_ids: vec![] }).await,
            Err(AppError::Validation { .. })
        ));
        assert!(matches!(
            chats.get_chat_members(1).await,
            Err(AppError::NotFound(_))
        ));
    }
}
