//! Message repository.

use std::sync::Arc;

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use threadline_common::{AppError, AppResult};

use crate::entities::{Message, Thread, message, thread};

/// Repository for message operations.
///
/// Messages are immutable once posted; there is no update or delete.
#[derive(Clone)]
pub struct MessageRepository {
    db: Arc<DatabaseConnection>,
}

impl MessageRepository {
    /// Create a new message repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Persist a new message and touch the owning thread.
    ///
    /// The thread's `updated_at` is set to the message's `created_at`, so
    /// a thread's last-activity timestamp always equals its most recent
    /// message's creation time.
    pub async fn create(&self, model: message::ActiveModel) -> AppResult<message::Model> {
        let message = model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Thread::update_many()
            .col_expr(thread::Column::UpdatedAt, Expr::value(message.created_at))
            .filter(thread::Column::Id.eq(message.thread_id.as_str()))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(message)
    }

    /// Find a message by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<message::Model>> {
        Message::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Messages of a thread in creation order.
    pub async fn find_by_thread(&self, thread_id: &str) -> AppResult<Vec<message::Model>> {
        Message::find()
            .filter(message::Column::ThreadId.eq(thread_id))
            .order_by_asc(message::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// The most recent message of a thread, if any.
    pub async fn find_latest_in_thread(&self, thread_id: &str) -> AppResult<Option<message::Model>> {
        Message::find()
            .filter(message::Column::ThreadId.eq(thread_id))
            .order_by_desc(message::Column::CreatedAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of messages in a thread.
    pub async fn count_for_thread(&self, thread_id: &str) -> AppResult<u64> {
        Message::find()
            .filter(message::Column::ThreadId.eq(thread_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
