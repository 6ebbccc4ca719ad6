//! Message service.

use chrono::Utc;
use sea_orm::Set;
use threadline_common::config::MessagingConfig;
use threadline_common::{AppError, AppResult, IdGenerator};
use threadline_db::{
    entities::{message, participant},
    repositories::{MessageRepository, ParticipantRepository, ThreadRepository},
};
use validator::Validate;

/// Input for posting a new message.
#[derive(Debug, Clone, Validate)]
pub struct CreateMessageInput {
    /// Message text; must be non-empty.
    #[validate(length(min = 1, message = "body is required"))]
    pub body: String,
}

/// Message service.
///
/// Messages are immutable: once posted there is no edit or delete.
#[derive(Clone)]
pub struct MessageService {
    message_repo: MessageRepository,
    thread_repo: ThreadRepository,
    participant_repo: ParticipantRepository,
    config: MessagingConfig,
    id_gen: IdGenerator,
}

impl MessageService {
    /// Create a new message service.
    #[must_use]
    pub const fn new(
        message_repo: MessageRepository,
        thread_repo: ThreadRepository,
        participant_repo: ParticipantRepository,
        config: MessagingConfig,
    ) -> Self {
        Self {
            message_repo,
            thread_repo,
            participant_repo,
            config,
            id_gen: IdGenerator::new(),
        }
    }

    /// Post a message to a thread.
    ///
    /// Validates the body (non-blank, within the configured length cap),
    /// requires the thread to exist and be active, and persists the message;
    /// the repository touches the thread's last-activity timestamp as part
    /// of the write.
    pub async fn post_message(
        &self,
        thread_id: &str,
        user_id: &str,
        input: CreateMessageInput,
    ) -> AppResult<message::Model> {
        input.validate()?;
        if input.body.trim().is_empty() {
            return Err(AppError::Validation("body is required".to_string()));
        }
        if input.body.chars().count() > self.config.max_body_length {
            return Err(AppError::Validation(format!(
                "body exceeds {} characters",
                self.config.max_body_length
            )));
        }

        let thread = self.thread_repo.get_by_id(thread_id).await?;

        let model = message::ActiveModel {
            id: Set(self.id_gen.generate()),
            thread_id: Set(thread.id),
            user_id: Set(user_id.to_string()),
            body: Set(input.body),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        self.message_repo.create(model).await
    }

    /// Messages of a thread in creation order.
    pub async fn thread_messages(&self, thread_id: &str) -> AppResult<Vec<message::Model>> {
        self.message_repo.find_by_thread(thread_id).await
    }

    /// The most recent message of a thread, if any.
    pub async fn latest_message(&self, thread_id: &str) -> AppResult<Option<message::Model>> {
        self.message_repo.find_latest_in_thread(thread_id).await
    }

    /// Recipients of a message: every active participant of its thread
    /// except the author.
    pub async fn recipients(&self, message: &message::Model) -> AppResult<Vec<participant::Model>> {
        self.participant_repo
            .find_recipients(&message.thread_id, &message.user_id)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;
    use threadline_db::entities::thread;

    fn create_test_thread(id: &str) -> thread::Model {
        thread::Model {
            id: id.to_string(),
            subject: "Test thread".to_string(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
            deleted_at: None,
        }
    }

    fn create_test_message(id: &str, thread_id: &str, user_id: &str, body: &str) -> message::Model {
        message::Model {
            id: id.to_string(),
            thread_id: thread_id.to_string(),
            user_id: user_id.to_string(),
            body: body.to_string(),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_participant(id: &str, thread_id: &str, user_id: &str) -> participant::Model {
        participant::Model {
            id: id.to_string(),
            thread_id: thread_id.to_string(),
            user_id: user_id.to_string(),
            last_read: None,
            created_at: Utc::now().into(),
            updated_at: None,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn test_post_message_empty_body_fails_validation() {
        let message_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let thread_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let participant_db =
            Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = MessageService::new(
            MessageRepository::new(message_db),
            ThreadRepository::new(thread_db),
            ParticipantRepository::new(participant_db),
            MessagingConfig::default(),
        );

        let result = service
            .post_message(
                "thr1",
                "user5",
                CreateMessageInput {
                    body: String::new(),
                },
            )
            .await;

        // Nothing was persisted; no query results were consumed
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_post_message_blank_body_fails_validation() {
        let message_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let thread_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let participant_db =
            Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = MessageService::new(
            MessageRepository::new(message_db),
            ThreadRepository::new(thread_db),
            ParticipantRepository::new(participant_db),
            MessagingConfig::default(),
        );

        let result = service
            .post_message(
                "thr1",
                "user5",
                CreateMessageInput {
                    body: "   ".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_post_message_over_length_body_fails_validation() {
        let message_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let thread_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let participant_db =
            Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = MessageService::new(
            MessageRepository::new(message_db),
            ThreadRepository::new(thread_db),
            ParticipantRepository::new(participant_db),
            MessagingConfig {
                max_body_length: 8,
                ..MessagingConfig::default()
            },
        );

        let result = service
            .post_message(
                "thr1",
                "user5",
                CreateMessageInput {
                    body: "way past the cap".to_string(),
                },
            )
            .await;

        // Rejected before any query ran
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_post_message_missing_thread_fails() {
        let message_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let thread_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<thread::Model>::new()])
                .into_connection(),
        );
        let participant_db =
            Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = MessageService::new(
            MessageRepository::new(message_db),
            ThreadRepository::new(thread_db),
            ParticipantRepository::new(participant_db),
            MessagingConfig::default(),
        );

        let result = service
            .post_message(
                "missing",
                "user5",
                CreateMessageInput {
                    body: "hello".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::ThreadNotFound(_))));
    }

    #[tokio::test]
    async fn test_post_message_persists() {
        let message = create_test_message("msg1", "thr1", "user5", "hello");

        let message_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[message]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let thread_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_thread("thr1")]])
                .into_connection(),
        );
        let participant_db =
            Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = MessageService::new(
            MessageRepository::new(message_db),
            ThreadRepository::new(thread_db),
            ParticipantRepository::new(participant_db),
            MessagingConfig::default(),
        );

        let result = service
            .post_message(
                "thr1",
                "user5",
                CreateMessageInput {
                    body: "hello".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(result.thread_id, "thr1");
        assert_eq!(result.body, "hello");
    }

    #[tokio::test]
    async fn test_recipients_excludes_author() {
        let message = create_test_message("msg1", "thr1", "user5", "hello");
        let others = vec![
            create_test_participant("par2", "thr1", "user6"),
            create_test_participant("par3", "thr1", "user7"),
        ];

        let message_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let thread_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let participant_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([others])
                .into_connection(),
        );

        let service = MessageService::new(
            MessageRepository::new(message_db),
            ThreadRepository::new(thread_db),
            ParticipantRepository::new(participant_db),
            MessagingConfig::default(),
        );

        let recipients = service.recipients(&message).await.unwrap();

        assert_eq!(recipients.len(), 2);
        assert!(recipients.iter().all(|p| p.user_id != "user5"));
    }
}
