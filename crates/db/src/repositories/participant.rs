//! Participant repository.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, Value,
};
use threadline_common::{AppError, AppResult};

use crate::entities::{Participant, participant};

/// Repository for participant (thread membership) operations.
#[derive(Clone)]
pub struct ParticipantRepository {
    db: Arc<DatabaseConnection>,
}

impl ParticipantRepository {
    /// Create a new participant repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the active membership row for a user in a thread.
    pub async fn find_for_user(
        &self,
        thread_id: &str,
        user_id: &str,
    ) -> AppResult<Option<participant::Model>> {
        Participant::find()
            .filter(participant::Column::ThreadId.eq(thread_id))
            .filter(participant::Column::UserId.eq(user_id))
            .filter(participant::Column::DeletedAt.is_null())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the active membership row, returning an error if not found.
    ///
    /// Read-tracking callers swallow the not-found case; it is never
    /// surfaced past the service layer.
    pub async fn get_for_user(
        &self,
        thread_id: &str,
        user_id: &str,
    ) -> AppResult<participant::Model> {
        self.find_for_user(thread_id, user_id).await?.ok_or_else(|| {
            AppError::NotFound(format!(
                "Participant not found: thread {thread_id}, user {user_id}"
            ))
        })
    }

    /// First-or-create on (thread, user).
    ///
    /// Matches against active rows only, so re-adding an existing member is
    /// a no-op and returns the existing row. The model's `thread_id` and
    /// `user_id` must be set.
    pub async fn first_or_create(
        &self,
        model: participant::ActiveModel,
    ) -> AppResult<participant::Model> {
        let thread_id = model.thread_id.clone().unwrap();
        let user_id = model.user_id.clone().unwrap();

        if let Some(existing) = self.find_for_user(&thread_id, &user_id).await? {
            return Ok(existing);
        }

        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Set the membership's last-read timestamp to now.
    ///
    /// Returns `Ok(None)` when the user has no active membership in the
    /// thread; callers treat that as a no-op.
    pub async fn touch_last_read(
        &self,
        thread_id: &str,
        user_id: &str,
    ) -> AppResult<Option<participant::Model>> {
        let Some(existing) = self.find_for_user(thread_id, user_id).await? else {
            return Ok(None);
        };

        let mut active: participant::ActiveModel = existing.into();
        active.last_read = Set(Some(Utc::now().into()));
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Some(updated))
    }

    /// Restore every membership row of a thread, removed or not.
    ///
    /// Invoked when new activity should resurrect previously-removed
    /// members' visibility. Idempotent on already-active rows. Returns the
    /// number of rows affected.
    pub async fn restore_all_for_thread(&self, thread_id: &str) -> AppResult<u64> {
        let result = Participant::update_many()
            .col_expr(
                participant::Column::DeletedAt,
                Expr::value(Value::ChronoDateTimeWithTimeZone(None)),
            )
            .filter(participant::Column::ThreadId.eq(thread_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Soft-delete a user's membership in a thread.
    pub async fn remove(&self, thread_id: &str, user_id: &str) -> AppResult<u64> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();

        let result = Participant::update_many()
            .col_expr(participant::Column::DeletedAt, Expr::value(now))
            .filter(participant::Column::ThreadId.eq(thread_id))
            .filter(participant::Column::UserId.eq(user_id))
            .filter(participant::Column::DeletedAt.is_null())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Active membership rows of a thread.
    pub async fn find_active_for_thread(
        &self,
        thread_id: &str,
    ) -> AppResult<Vec<participant::Model>> {
        Participant::find()
            .filter(participant::Column::ThreadId.eq(thread_id))
            .filter(participant::Column::DeletedAt.is_null())
            .order_by_asc(participant::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Every membership row of a thread, removed rows included.
    pub async fn find_all_for_thread(&self, thread_id: &str) -> AppResult<Vec<participant::Model>> {
        Participant::find()
            .filter(participant::Column::ThreadId.eq(thread_id))
            .order_by_asc(participant::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// User ids of the thread's active members.
    pub async fn user_ids_for_thread(&self, thread_id: &str) -> AppResult<Vec<String>> {
        Participant::find()
            .select_only()
            .column(participant::Column::UserId)
            .filter(participant::Column::ThreadId.eq(thread_id))
            .filter(participant::Column::DeletedAt.is_null())
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Active members of a thread excluding the message author.
    pub async fn find_recipients(
        &self,
        thread_id: &str,
        author_id: &str,
    ) -> AppResult<Vec<participant::Model>> {
        Participant::find()
            .filter(participant::Column::ThreadId.eq(thread_id))
            .filter(participant::Column::UserId.ne(author_id))
            .filter(participant::Column::DeletedAt.is_null())
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
