//! Unit of Work pattern implementation.
//!
//! Centralizes repository access and runs multi-step writes, such as filling a
//! substitute request, inside a single database transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, AccessMode, ActiveModelTrait, ColumnTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, IsolationLevel, PaginatorTrait, QueryFilter, QuerySelect,
    Set, TransactionTrait,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use uuid::Uuid;

use super::repositories::entities::substitute_assignment::{
    self, ActiveModel as AssignmentActiveModel, Entity as AssignmentEntity,
};
use super::repositories::entities::substitute_pool::{self, Entity as PoolEntity};
use super::repositories::entities::substitute_request::{
    ActiveModel as RequestActiveModel, Entity as RequestEntity,
};
use super::repositories::{
    AvailabilityRepository, AvailabilityStore, LeagueRepository, LeagueStore,
    NotificationRepository, NotificationStore, PoolRepository, PoolStore, RoleRepository,
    RoleStore, SubstituteRepository, SubstituteStore, UserRepository, UserStore,
};
use crate::domain::{NewAssignment, RequestStatus, SubstituteAssignment, SubstituteRequest};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Future returned by a transaction body; it borrows the open transaction.
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'a>>;

/// Repository access plus transactions.
///
/// Generic methods keep this out of `automock`; tests implement it over mock
/// repositories instead.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn users(&self) -> Arc<dyn UserRepository>;

    fn league(&self) -> Arc<dyn LeagueRepository>;

    fn availability(&self) -> Arc<dyn AvailabilityRepository>;

    fn substitutes(&self) -> Arc<dyn SubstituteRepository>;

    fn pool(&self) -> Arc<dyn PoolRepository>;

    fn roles(&self) -> Arc<dyn RoleRepository>;

    fn notifications(&self) -> Arc<dyn NotificationRepository>;

    /// Run `f` in a READ COMMITTED transaction: commit on `Ok`, roll back on `Err`.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send;
}

/// Substitute writes issued inside an open transaction.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SubstituteWrites: Send + Sync {
    /// Load the request with a row lock held until commit.
    async fn lock_request(&self, id: Uuid) -> AppResult<Option<SubstituteRequest>>;

    async fn count_assignments(&self, request_id: Uuid) -> AppResult<u64>;

    async fn find_assignment_for(
        &self,
        request_id: Uuid,
        player_id: Uuid,
    ) -> AppResult<Option<SubstituteAssignment>>;

    async fn insert_assignment(&self, new: NewAssignment) -> AppResult<SubstituteAssignment>;

    async fn mark_filled(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;
}

/// Pool writes issued inside an open transaction.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait PoolWrites: Send + Sync {
    /// Bump `matches_played` for the player's league pool entry.
    async fn increment_matches_played(
        &self,
        player_id: Uuid,
        league_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<()>;
}

/// Writers bound to one open transaction.
#[derive(Clone, Copy)]
pub struct TransactionContext<'a> {
    substitutes: &'a dyn SubstituteWrites,
    pool: &'a dyn PoolWrites,
}

impl<'a> TransactionContext<'a> {
    pub fn new(substitutes: &'a dyn SubstituteWrites, pool: &'a dyn PoolWrites) -> Self {
        Self { substitutes, pool }
    }

    pub fn substitutes(&self) -> &'a dyn SubstituteWrites {
        self.substitutes
    }

    pub fn pool(&self) -> &'a dyn PoolWrites {
        self.pool
    }
}

/// Concrete implementation of UnitOfWork
pub struct Persistence {
    db: DatabaseConnection,
    user_repo: Arc<UserStore>,
    league_repo: Arc<LeagueStore>,
    availability_repo: Arc<AvailabilityStore>,
    substitute_repo: Arc<SubstituteStore>,
    pool_repo: Arc<PoolStore>,
    role_repo: Arc<RoleStore>,
    notification_repo: Arc<NotificationStore>,
}

impl Persistence {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            user_repo: Arc::new(UserStore::new(db.clone())),
            league_repo: Arc::new(LeagueStore::new(db.clone())),
            availability_repo: Arc::new(AvailabilityStore::new(db.clone())),
            substitute_repo: Arc::new(SubstituteStore::new(db.clone())),
            pool_repo: Arc::new(PoolStore::new(db.clone())),
            role_repo: Arc::new(RoleStore::new(db.clone())),
            notification_repo: Arc::new(NotificationStore::new(db.clone())),
            db,
        }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.user_repo.clone()
    }

    fn league(&self) -> Arc<dyn LeagueRepository> {
        self.league_repo.clone()
    }

    fn availability(&self) -> Arc<dyn AvailabilityRepository> {
        self.availability_repo.clone()
    }

    fn substitutes(&self) -> Arc<dyn SubstituteRepository> {
        self.substitute_repo.clone()
    }

    fn pool(&self) -> Arc<dyn PoolRepository> {
        self.pool_repo.clone()
    }

    fn roles(&self) -> Arc<dyn RoleRepository> {
        self.role_repo.clone()
    }

    fn notifications(&self) -> Arc<dyn NotificationRepository> {
        self.notification_repo.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        let txn = self
            .db
            .begin_with_config(
                Some(IsolationLevel::ReadCommitted),
                Some(AccessMode::ReadWrite),
            )
            .await?;

        let substitutes = TxSubstituteRepository::new(&txn);
        let pool = TxPoolRepository::new(&txn);
        let outcome = f(TransactionContext::new(&substitutes, &pool)).await;
        match outcome {
            Ok(value) => {
                txn.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = txn.rollback().await {
                    tracing::error!(error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}

/// Transaction-aware substitute repository used while filling requests.
struct TxSubstituteRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxSubstituteRepository<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }
}

#[async_trait]
impl SubstituteWrites for TxSubstituteRepository<'_> {
    async fn lock_request(&self, id: Uuid) -> AppResult<Option<SubstituteRequest>> {
        let result = RequestEntity::find_by_id(id)
            .lock_exclusive()
            .one(self.txn)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(SubstituteRequest::from))
    }

    async fn count_assignments(&self, request_id: Uuid) -> AppResult<u64> {
        AssignmentEntity::find()
            .filter(substitute_assignment::Column::RequestId.eq(request_id))
            .count(self.txn)
            .await
            .map_err(AppError::from)
    }

    async fn find_assignment_for(
        &self,
        request_id: Uuid,
        player_id: Uuid,
    ) -> AppResult<Option<SubstituteAssignment>> {
        let result = AssignmentEntity::find()
            .filter(substitute_assignment::Column::RequestId.eq(request_id))
            .filter(substitute_assignment::Column::PlayerId.eq(player_id))
            .one(self.txn)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(SubstituteAssignment::from))
    }

    async fn insert_assignment(&self, new: NewAssignment) -> AppResult<SubstituteAssignment> {
        let active_model = AssignmentActiveModel {
            id: Set(Uuid::new_v4()),
            request_id: Set(new.request_id),
            player_id: Set(new.player_id),
            assigned_by: Set(new.assigned_by),
            position_assigned: Set(new.position_assigned),
            notes: Set(new.notes),
            notification_sent: Set(false),
            notification_sent_at: Set(None),
            notification_methods: Set(None),
            assigned_at: Set(Utc::now()),
        };

        let model = active_model.insert(self.txn).await.map_err(AppError::from)?;
        Ok(SubstituteAssignment::from(model))
    }

    async fn mark_filled(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let model = RequestEntity::find_by_id(id)
            .one(self.txn)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: RequestActiveModel = model.into();
        active.status = Set(RequestStatus::Filled.as_str().to_string());
        active.filled_at = Set(Some(at));
        active.updated_at = Set(at);

        active.update(self.txn).await.map_err(AppError::from)?;
        Ok(())
    }
}

/// Transaction-aware pool repository.
struct TxPoolRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxPoolRepository<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }
}

#[async_trait]
impl PoolWrites for TxPoolRepository<'_> {
    async fn increment_matches_played(
        &self,
        player_id: Uuid,
        league_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        PoolEntity::update_many()
            .col_expr(
                substitute_pool::Column::MatchesPlayed,
                Expr::col(substitute_pool::Column::MatchesPlayed).add(1),
            )
            .col_expr(substitute_pool::Column::LastActiveAt, Expr::value(at))
            .filter(substitute_pool::Column::PlayerId.eq(player_id))
            .filter(substitute_pool::Column::LeagueId.eq(league_id))
            .exec(self.txn)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
