//! User repository.

use std::sync::Arc;

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use threadline_common::{AppError, AppResult};

use crate::entities::{User, participant, user};

/// Repository for user lookups needed by the messaging domain.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a user record.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by ID.
    ///
    /// Soft-deleted accounts are included: message authors and participants
    /// stay resolvable after the account is removed.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a user by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    /// Users with a membership row on the thread, excluding the given user.
    ///
    /// Joins users to participants without filtering the membership
    /// tombstone, so removed participants are still listed. This mirrors
    /// the behavior the recipient fan-out has always had.
    pub async fn find_thread_members(
        &self,
        thread_id: &str,
        exclude_user_id: &str,
    ) -> AppResult<Vec<user::Model>> {
        User::find()
            .inner_join(participant::Entity)
            .filter(participant::Column::ThreadId.eq(thread_id))
            .filter(user::Column::Id.ne(exclude_user_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
