//! Thread repository.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, Value,
};
use threadline_common::{AppError, AppResult};

use crate::entities::{Thread, participant, thread};

/// Repository for thread operations.
///
/// There is no implicit soft-delete scoping: every query that should see
/// only active rows carries an explicit `deleted_at IS NULL` predicate.
#[derive(Clone)]
pub struct ThreadRepository {
    db: Arc<DatabaseConnection>,
}

impl ThreadRepository {
    /// Create a new thread repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a new thread.
    pub async fn create(&self, model: thread::ActiveModel) -> AppResult<thread::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a thread.
    pub async fn update(&self, model: thread::ActiveModel) -> AppResult<thread::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a thread by ID, archived or not.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<thread::Model>> {
        Thread::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a non-archived thread by ID.
    pub async fn find_active_by_id(&self, id: &str) -> AppResult<Option<thread::Model>> {
        Thread::find_by_id(id)
            .filter(thread::Column::DeletedAt.is_null())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a non-archived thread by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<thread::Model> {
        self.find_active_by_id(id)
            .await?
            .ok_or_else(|| AppError::ThreadNotFound(id.to_string()))
    }

    /// All active threads, most recently updated first. `limit` caps the
    /// page size; `None` returns everything.
    pub async fn get_all_latest(&self, limit: Option<u64>) -> AppResult<Vec<thread::Model>> {
        Thread::find()
            .filter(thread::Column::DeletedAt.is_null())
            .order_by_desc(thread::Column::UpdatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Threads the user is an active participant of, most recently
    /// updated first.
    pub async fn for_user(
        &self,
        user_id: &str,
        limit: Option<u64>,
    ) -> AppResult<Vec<thread::Model>> {
        Thread::find()
            .inner_join(participant::Entity)
            .filter(participant::Column::UserId.eq(user_id))
            .filter(participant::Column::DeletedAt.is_null())
            .filter(thread::Column::DeletedAt.is_null())
            .order_by_desc(thread::Column::UpdatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Threads with unread activity for the user.
    ///
    /// A thread counts as unread when the user's membership has never been
    /// read (`last_read IS NULL`) or the thread was updated after the
    /// membership's `last_read` timestamp.
    pub async fn for_user_with_new_messages(
        &self,
        user_id: &str,
        limit: Option<u64>,
    ) -> AppResult<Vec<thread::Model>> {
        Thread::find()
            .inner_join(participant::Entity)
            .filter(participant::Column::UserId.eq(user_id))
            .filter(participant::Column::DeletedAt.is_null())
            .filter(thread::Column::DeletedAt.is_null())
            .filter(
                Condition::any()
                    .add(participant::Column::LastRead.is_null())
                    .add(
                        Expr::col((thread::Entity, thread::Column::UpdatedAt))
                            .gt(Expr::col((participant::Entity, participant::Column::LastRead))),
                    ),
            )
            .order_by_desc(thread::Column::UpdatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Archive a thread (soft delete). Threads are never hard-deleted.
    pub async fn archive(&self, id: &str) -> AppResult<thread::Model> {
        let thread = self.get_by_id(id).await?;
        let mut active: thread::ActiveModel = thread.into();
        active.deleted_at = Set(Some(Utc::now().into()));

        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Restore an archived thread.
    pub async fn restore(&self, id: &str) -> AppResult<u64> {
        let result = Thread::update_many()
            .col_expr(
                thread::Column::DeletedAt,
                Expr::value(Value::ChronoDateTimeWithTimeZone(None)),
            )
            .filter(thread::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}
