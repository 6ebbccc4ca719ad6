//! Thread service: read tracking, membership, and listings.

use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use threadline_common::config::MessagingConfig;
use threadline_common::{AppResult, IdGenerator};
use threadline_db::{
    entities::{participant, thread},
    repositories::{ParticipantRepository, ThreadRepository, UserRepository},
};

/// Display name and messaging token of a thread member, for the
/// notification fan-out. Delivery itself happens elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantProfile {
    /// Member first name.
    pub first_name: String,
    /// Member last name.
    pub last_name: String,
    /// Messaging token.
    pub user_token: String,
}

/// Thread service.
#[derive(Clone)]
pub struct ThreadService {
    thread_repo: ThreadRepository,
    participant_repo: ParticipantRepository,
    user_repo: UserRepository,
    config: MessagingConfig,
    id_gen: IdGenerator,
}

impl ThreadService {
    /// Create a new thread service.
    #[must_use]
    pub const fn new(
        thread_repo: ThreadRepository,
        participant_repo: ParticipantRepository,
        user_repo: UserRepository,
        config: MessagingConfig,
    ) -> Self {
        Self {
            thread_repo,
            participant_repo,
            user_repo,
            config,
            id_gen: IdGenerator::new(),
        }
    }

    const fn page_size(&self) -> Option<u64> {
        Some(self.config.thread_page_size)
    }

    /// Start a new conversation.
    pub async fn create_thread(&self, subject: &str) -> AppResult<thread::Model> {
        let now = Utc::now();
        let model = thread::ActiveModel {
            id: Set(self.id_gen.generate()),
            subject: Set(subject.to_string()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            deleted_at: Set(None),
        };

        self.thread_repo.create(model).await
    }

    /// All active threads, most recently updated first; one page.
    pub async fn get_all_latest(&self) -> AppResult<Vec<thread::Model>> {
        self.thread_repo.get_all_latest(self.page_size()).await
    }

    /// Threads the user is an active participant of; one page.
    pub async fn for_user(&self, user_id: &str) -> AppResult<Vec<thread::Model>> {
        self.thread_repo.for_user(user_id, self.page_size()).await
    }

    /// Threads with unread activity for the user; one page.
    pub async fn for_user_with_new_messages(&self, user_id: &str) -> AppResult<Vec<thread::Model>> {
        self.thread_repo
            .for_user_with_new_messages(user_id, self.page_size())
            .await
    }

    /// Whether the thread has content the user has not read yet.
    ///
    /// A user without an active membership row is never "unread"; the
    /// missing row degenerates to `false` rather than an error. A member
    /// who has never read the thread (`last_read` is NULL) is unread.
    pub async fn is_unread(&self, thread: &thread::Model, user_id: &str) -> AppResult<bool> {
        let Some(participant) = self
            .participant_repo
            .find_for_user(&thread.id, user_id)
            .await?
        else {
            tracing::debug!(thread_id = %thread.id, user_id, "No membership; treating as read");
            return Ok(false);
        };

        Ok(match participant.last_read {
            None => true,
            Some(last_read) => thread.updated_at > last_read,
        })
    }

    /// Mark the thread read for the user.
    ///
    /// Silent no-op when the user has no active membership row; nothing is
    /// created and no error is surfaced.
    pub async fn mark_as_read(&self, thread_id: &str, user_id: &str) -> AppResult<()> {
        if self
            .participant_repo
            .touch_last_read(thread_id, user_id)
            .await?
            .is_none()
        {
            tracing::debug!(thread_id, user_id, "No membership; nothing to mark read");
        }

        Ok(())
    }

    /// Add users to the thread idempotently.
    ///
    /// Each id is first-or-created on (thread, user); re-adding an existing
    /// member, or passing the same id twice, leaves a single active row.
    pub async fn add_participants(&self, thread_id: &str, user_ids: &[String]) -> AppResult<()> {
        for user_id in user_ids {
            let model = participant::ActiveModel {
                id: Set(self.id_gen.generate()),
                thread_id: Set(thread_id.to_string()),
                user_id: Set(user_id.clone()),
                last_read: Set(None),
                created_at: Set(Utc::now().into()),
                updated_at: Set(None),
                deleted_at: Set(None),
            };

            self.participant_repo.first_or_create(model).await?;
        }

        Ok(())
    }

    /// Restore every membership of the thread, including removed ones.
    ///
    /// Invoked when new activity should resurrect previously-removed
    /// members' visibility. Idempotent on already-active rows.
    pub async fn activate_all_participants(&self, thread_id: &str) -> AppResult<u64> {
        self.participant_repo.restore_all_for_thread(thread_id).await
    }

    /// Remove a user from the thread (soft delete of the membership).
    pub async fn remove_participant(&self, thread_id: &str, user_id: &str) -> AppResult<()> {
        self.participant_repo.remove(thread_id, user_id).await?;
        Ok(())
    }

    /// User ids of the thread's active members.
    ///
    /// `extra_user_id`, when given, is appended to the list; callers use
    /// this to include themselves when composing a reply's recipient list.
    pub async fn participants_user_ids(
        &self,
        thread_id: &str,
        extra_user_id: Option<&str>,
    ) -> AppResult<Vec<String>> {
        let mut ids = self.participant_repo.user_ids_for_thread(thread_id).await?;

        if let Some(extra) = extra_user_id {
            ids.push(extra.to_string());
        }

        Ok(ids)
    }

    /// Display profiles of every thread member except the given user.
    pub async fn participant_profiles(
        &self,
        thread_id: &str,
        user_id: &str,
    ) -> AppResult<Vec<ParticipantProfile>> {
        let members = self
            .user_repo
            .find_thread_members(thread_id, user_id)
            .await?;

        Ok(members
            .into_iter()
            .map(|u| ParticipantProfile {
                first_name: u.first_name,
                last_name: u.last_name,
                user_token: u.user_token,
            })
            .collect())
    }

    /// Messaging tokens of every thread member except the given user.
    pub async fn participant_tokens(
        &self,
        thread_id: &str,
        user_id: &str,
    ) -> AppResult<Vec<String>> {
        let members = self
            .user_repo
            .find_thread_members(thread_id, user_id)
            .await?;

        Ok(members.into_iter().map(|u| u.user_token).collect())
    }

    /// Archive the thread. Its messages and participants are left in place;
    /// the thread simply disappears from listings.
    pub async fn archive_thread(&self, thread_id: &str) -> AppResult<thread::Model> {
        self.thread_repo.archive(thread_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;
    use threadline_db::entities::user;

    fn create_test_thread(id: &str) -> thread::Model {
        thread::Model {
            id: id.to_string(),
            subject: "Test thread".to_string(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
            deleted_at: None,
        }
    }

    fn create_test_participant(
        id: &str,
        thread_id: &str,
        user_id: &str,
        last_read: Option<chrono::DateTime<Utc>>,
    ) -> participant::Model {
        participant::Model {
            id: id.to_string(),
            thread_id: thread_id.to_string(),
            user_id: user_id.to_string(),
            last_read: last_read.map(Into::into),
            created_at: Utc::now().into(),
            updated_at: None,
            deleted_at: None,
        }
    }

    fn create_test_user(id: &str, first_name: &str, token: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            first_name: first_name.to_string(),
            last_name: "Tester".to_string(),
            user_token: token.to_string(),
            created_at: Utc::now().into(),
            updated_at: None,
            deleted_at: None,
        }
    }

    fn service_with(
        participant_results: Vec<Vec<participant::Model>>,
        user_results: Vec<Vec<user::Model>>,
    ) -> ThreadService {
        let thread_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let mut participant_mock = MockDatabase::new(DatabaseBackend::Postgres);
        for rows in participant_results {
            participant_mock = participant_mock.append_query_results([rows]);
        }
        let participant_db = Arc::new(participant_mock.into_connection());

        let mut user_mock = MockDatabase::new(DatabaseBackend::Postgres);
        for rows in user_results {
            user_mock = user_mock.append_query_results([rows]);
        }
        let user_db = Arc::new(user_mock.into_connection());

        ThreadService::new(
            ThreadRepository::new(thread_db),
            ParticipantRepository::new(participant_db),
            UserRepository::new(user_db),
            MessagingConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_is_unread_no_membership_is_false() {
        let service = service_with(vec![vec![]], vec![]);
        let thread = create_test_thread("thr1");

        let unread = service.is_unread(&thread, "user5").await.unwrap();

        assert!(!unread);
    }

    #[tokio::test]
    async fn test_is_unread_never_read_is_true() {
        let part = create_test_participant("par1", "thr1", "user5", None);
        let service = service_with(vec![vec![part]], vec![]);
        let thread = create_test_thread("thr1");

        let unread = service.is_unread(&thread, "user5").await.unwrap();

        assert!(unread);
    }

    #[tokio::test]
    async fn test_is_unread_stale_last_read_is_true() {
        let last_read = Utc::now() - Duration::hours(1);
        let part = create_test_participant("par1", "thr1", "user5", Some(last_read));
        let service = service_with(vec![vec![part]], vec![]);
        let thread = create_test_thread("thr1");

        let unread = service.is_unread(&thread, "user5").await.unwrap();

        assert!(unread);
    }

    #[tokio::test]
    async fn test_is_unread_caught_up_is_false() {
        let last_read = Utc::now() + Duration::seconds(1);
        let part = create_test_participant("par1", "thr1", "user5", Some(last_read));
        let service = service_with(vec![vec![part]], vec![]);
        let thread = create_test_thread("thr1");

        let unread = service.is_unread(&thread, "user5").await.unwrap();

        assert!(!unread);
    }

    #[tokio::test]
    async fn test_mark_as_read_no_membership_is_noop() {
        let service = service_with(vec![vec![]], vec![]);

        let result = service.mark_as_read("thr1", "user5").await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_mark_as_read_then_is_unread_is_false() {
        let mut thread = create_test_thread("thr1");
        thread.updated_at = (Utc::now() - Duration::hours(1)).into();

        let membership = create_test_participant("par1", "thr1", "user5", None);
        let mut caught_up = membership.clone();
        caught_up.last_read = Some(Utc::now().into());
        caught_up.updated_at = Some(Utc::now().into());

        let thread_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        // mark_as_read: lookup, then the returning update; is_unread: lookup
        // of the caught-up row
        let participant_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![membership]])
                .append_query_results([vec![caught_up.clone()]])
                .append_query_results([vec![caught_up]])
                .append_exec_results([sea_orm::MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let user_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = ThreadService::new(
            ThreadRepository::new(thread_db),
            ParticipantRepository::new(participant_db),
            UserRepository::new(user_db),
            MessagingConfig::default(),
        );

        service.mark_as_read("thr1", "user5").await.unwrap();
        let unread = service.is_unread(&thread, "user5").await.unwrap();

        assert!(!unread);
    }

    #[tokio::test]
    async fn test_add_participants_collapses_duplicate_ids() {
        let row5 = create_test_participant("par5", "thr1", "user5", None);
        let row6 = create_test_participant("par6", "thr1", "user6", None);

        let thread_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        // user5: no row, insert. user6: no row, insert. user6 again: row found,
        // no insert.
        let participant_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<participant::Model>::new()])
                .append_query_results([vec![row5]])
                .append_query_results([Vec::<participant::Model>::new()])
                .append_query_results([vec![row6.clone()]])
                .append_query_results([vec![row6]])
                .append_exec_results([
                    sea_orm::MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    sea_orm::MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                ])
                .into_connection(),
        );
        let user_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = ThreadService::new(
            ThreadRepository::new(thread_db),
            ParticipantRepository::new(participant_db),
            UserRepository::new(user_db),
            MessagingConfig::default(),
        );

        let ids = vec![
            "user5".to_string(),
            "user6".to_string(),
            "user6".to_string(),
        ];
        let result = service.add_participants("thr1", &ids).await;

        // The third id matched the existing row; only two inserts ran
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_participants_user_ids_appends_extra() {
        // Raw user_id rows for the select_only query
        let service = {
            let thread_db =
                Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
            let participant_db = Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([vec![user_id_row("user5"), user_id_row("user6")]])
                    .into_connection(),
            );
            let user_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

            ThreadService::new(
                ThreadRepository::new(thread_db),
                ParticipantRepository::new(participant_db),
                UserRepository::new(user_db),
                MessagingConfig::default(),
            )
        };

        let ids = service
            .participants_user_ids("thr1", Some("user9"))
            .await
            .unwrap();

        // The given id is appended, not excluded
        assert_eq!(
            ids,
            vec![
                "user5".to_string(),
                "user6".to_string(),
                "user9".to_string()
            ]
        );
    }

    fn user_id_row(user_id: &str) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
        let mut row = std::collections::BTreeMap::new();
        row.insert("user_id", sea_orm::Value::from(user_id));
        row
    }

    #[tokio::test]
    async fn test_participant_tokens_excludes_self() {
        let members = vec![
            create_test_user("user6", "Alex", "tok6"),
            create_test_user("user7", "Sam", "tok7"),
        ];
        let service = service_with(vec![], vec![members]);

        let tokens = service.participant_tokens("thr1", "user5").await.unwrap();

        assert_eq!(tokens, vec!["tok6".to_string(), "tok7".to_string()]);
    }

    #[tokio::test]
    async fn test_participant_profiles() {
        let members = vec![create_test_user("user6", "Alex", "tok6")];
        let service = service_with(vec![], vec![members]);

        let profiles = service.participant_profiles("thr1", "user5").await.unwrap();

        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].first_name, "Alex");
        assert_eq!(profiles[0].user_token, "tok6");
    }
}
