//! User Service
//!
//! Accounts and the follow lifecycle. A follow starts pending; confirming it
//! bumps `followerCount` on the followee and `followeeCount` on the follower,
//! and removing a confirmed follow lowers both again.

use std::sync::Arc;

use super::pagination_service::PaginationService;
use crate::application::dto::{CreateUserRequest, Page};
use crate::domain::query::{Direction, FindOptions, OrderSpec, Predicate, QueryComposer};
use crate::domain::value_objects::ID_FIELD;
use crate::domain::{NewUser, NewUserFollower, User, UserFollower, USER_SCHEMA};
use crate::infrastructure::database::{Backend, TransactionHandle, TransactionScope};
use crate::infrastructure::repositories::EntityRepository;
use crate::shared::error::AppError;
use crate::shared::validation::validate;

pub struct UserService<B: Backend> {
    users: EntityRepository<User, B>,
    followers: EntityRepository<UserFollower, B>,
    scope: TransactionScope<B>,
    composer: Arc<QueryComposer>,
    pagination: Arc<PaginationService>,
}

impl<B: Backend> Clone for UserService<B> {
    fn clone(&self) -> Self {
        Self {
            users: self.users.clone(),
            followers: self.followers.clone(),
            scope: self.scope.clone(),
            composer: Arc::clone(&self.composer),
            pagination: Arc::clone(&self.pagination),
        }
    }
}

fn follow_of(follower_id: i64, followee_id: i64) -> Vec<Predicate> {
    vec![
        Predicate::equal(UserFollower::FOLLOWER_ID, follower_id),
        Predicate::equal(UserFollower::FOLLOWEE_ID, followee_id),
    ]
}

fn follow_not_found(follower_id: i64, followee_id: i64) -> AppError {
    AppError::NotFound(format!(
        "User {} does not follow user {}",
        follower_id, followee_id
    ))
}

impl<B: Backend> UserService<B> {
    pub fn new(
        users: EntityRepository<User, B>,
        followers: EntityRepository<UserFollower, B>,
        scope: TransactionScope<B>,
        composer: Arc<QueryComposer>,
        pagination: Arc<PaginationService>,
    ) -> Self {
        Self {
            users,
            followers,
            scope,
            composer,
            pagination,
        }
    }

    /// Create an account. Nickname and email must be unused.
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, AppError> {
        validate(&request)?;
        let this = self.clone();

        let user = self
            .scope
            .with_transaction(move |tx| {
                Box::pin(async move {
                    if this
                        .users
                        .exists(Some(&mut *tx), &[Predicate::equal("nickname", request.nickname.as_str())])
                        .await?
                    {
                        return Err(AppError::Conflict("Nickname already taken".into()));
                    }
                    if this
                        .users
                        .exists(Some(&mut *tx), &[Predicate::equal("email", request.email.as_str())])
                        .await?
                    {
                        return Err(AppError::Conflict("Email already registered".into()));
                    }

                    let user = this
                        .users
                        .save(
                            Some(&mut *tx),
                            NewUser {
                                nickname: request.nickname,
                                email: request.email,
                                role: request.role.unwrap_or_default(),
                            },
                        )
                        .await?;
                    Ok(user)
                })
            })
            .await?;

        tracing::info!(user_id = user.id, nickname = %user.nickname, "User created");
        Ok(user)
    }

    pub async fn get_user(&self, id: i64) -> Result<User, AppError> {
        self.users
            .find_by_id(None, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    pub async fn paginate_users<I, K, V>(&self, params: I) -> Result<Page<User>, AppError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let spec = self.composer.compose(&USER_SCHEMA, params)?;
        self.pagination
            .paginate(&self.users, &spec, Vec::new(), "users")
            .await
    }

    async fn require_user(
        &self,
        tx: &mut TransactionHandle<B>,
        id: i64,
    ) -> Result<(), AppError> {
        if self
            .users
            .exists(Some(tx), &[Predicate::equal(ID_FIELD, id)])
            .await?
        {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("User {} not found", id)))
        }
    }

    /// Request to follow `followee_id`. The follow starts unconfirmed.
    pub async fn follow_user(
        &self,
        follower_id: i64,
        followee_id: i64,
    ) -> Result<UserFollower, AppError> {
        if follower_id == followee_id {
            return Err(AppError::BadRequest("Users cannot follow themselves".into()));
        }
        let this = self.clone();

        let follow = self
            .scope
            .with_transaction(move |tx| {
                Box::pin(async move {
                    this.require_user(&mut *tx, follower_id).await?;
                    this.require_user(&mut *tx, followee_id).await?;
                    if this
                        .followers
                        .exists(Some(&mut *tx), &follow_of(follower_id, followee_id))
                        .await?
                    {
                        return Err(AppError::Conflict(format!(
                            "User {} already follows user {}",
                            follower_id, followee_id
                        )));
                    }
                    let follow = this
                        .followers
                        .save(
                            Some(&mut *tx),
                            NewUserFollower {
                                follower_id,
                                followee_id,
                            },
                        )
                        .await?;
                    Ok(follow)
                })
            })
            .await?;

        tracing::info!(follower_id, followee_id, "Follow requested");
        Ok(follow)
    }

    /// Confirm a pending follow and update both users' counters.
    ///
    /// Confirming an already confirmed follow changes nothing.
    pub async fn confirm_follow(
        &self,
        follower_id: i64,
        followee_id: i64,
    ) -> Result<UserFollower, AppError> {
        let this = self.clone();

        self.scope
            .with_transaction(move |tx| {
                Box::pin(async move {
                    let follow = this
                        .followers
                        .find_one(Some(&mut *tx), follow_of(follower_id, followee_id))
                        .await?
                        .ok_or_else(|| follow_not_found(follower_id, followee_id))?;
                    if follow.is_confirmed {
                        return Ok(follow);
                    }

                    let confirmed = this
                        .followers
                        .update(
                            Some(&mut *tx),
                            follow.id,
                            vec![(UserFollower::IS_CONFIRMED, true.into())],
                        )
                        .await?
                        .ok_or_else(|| follow_not_found(follower_id, followee_id))?;
                    this.users
                        .increment(Some(&mut *tx), followee_id, User::FOLLOWER_COUNT, 1)
                        .await?;
                    this.users
                        .increment(Some(&mut *tx), follower_id, User::FOLLOWEE_COUNT, 1)
                        .await?;

                    tracing::info!(follower_id, followee_id, "Follow confirmed");
                    Ok(confirmed)
                })
            })
            .await
    }

    /// Remove a follow, lowering the counters if it had been confirmed.
    pub async fn delete_follow(&self, follower_id: i64, followee_id: i64) -> Result<(), AppError> {
        let this = self.clone();

        self.scope
            .with_transaction(move |tx| {
                Box::pin(async move {
                    let follow = this
                        .followers
                        .find_one(Some(&mut *tx), follow_of(follower_id, followee_id))
                        .await?
                        .ok_or_else(|| follow_not_found(follower_id, followee_id))?;
                    this.followers.delete_by_id(Some(&mut *tx), follow.id).await?;

                    if follow.is_confirmed {
                        this.users
                            .increment(Some(&mut *tx), followee_id, User::FOLLOWER_COUNT, -1)
                            .await?;
                        this.users
                            .increment(Some(&mut *tx), follower_id, User::FOLLOWEE_COUNT, -1)
                            .await?;
                    }
                    Ok(())
                })
            })
            .await?;

        tracing::info!(follower_id, followee_id, "Follow removed");
        Ok(())
    }

    /// Follow rows pointing at `user_id`, oldest first.
    pub async fn get_followers(
        &self,
        user_id: i64,
        include_unconfirmed: bool,
    ) -> Result<Vec<UserFollower>, AppError> {
        let mut options = FindOptions::new()
            .filter(Predicate::equal(UserFollower::FOLLOWEE_ID, user_id))
            .order_by(OrderSpec::new(ID_FIELD, Direction::Asc));
        if !include_unconfirmed {
            options = options.filter(Predicate::equal(UserFollower::IS_CONFIRMED, true));
        }
        Ok(self.followers.find(None, &options).await?)
    }
}
