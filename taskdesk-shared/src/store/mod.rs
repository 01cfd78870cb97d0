/// Persistence ports
///
/// Services talk to storage only through these traits. The process builds a
/// single `Arc<dyn Store>` at startup and hands it to every service, so tests
/// can swap the Postgres adapter for the in-memory one.
///
/// # Adapters
///
/// - [`postgres::PgStore`]: sqlx over a `PgPool`
/// - [`memory::MemoryStore`]: process-local maps, for tests and local runs
///
/// No operation retries. A failure surfaces as [`StoreError`] and is terminal
/// for the request.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    assignment::{AssignedTask, CreatedTask, TaskAssignment},
    notification::Notification,
    task::{NewTask, Task, TaskPatch},
    user::{NewUser, User},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness rule was violated (email, external user id)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The referenced row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backing store failed or is unreachable
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// User and credential storage
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Looks up by the external-facing user id
    async fn find_by_external_id(&self, user_id: &str) -> StoreResult<Option<User>>;

    /// Fails with `Conflict` if the email or external id is taken
    async fn insert(&self, user: NewUser) -> StoreResult<User>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()>;

    /// Stores a reset code, zeroes the attempt counter and stamps the request time
    async fn update_reset_otp(&self, id: Uuid, otp: &str, expires_at: DateTime<Utc>) -> StoreResult<()>;

    async fn clear_reset_otp(&self, id: Uuid) -> StoreResult<()>;

    /// Replaces the password hash and clears the reset code together,
    /// only if the stored code is still `otp`. Returns whether it did.
    async fn consume_reset_otp(&self, id: Uuid, otp: &str, password_hash: &str) -> StoreResult<bool>;

    /// Returns the attempt count after incrementing
    async fn record_failed_reset_attempt(&self, id: Uuid) -> StoreResult<i32>;

    /// Sets external id and password and flips the account to active
    async fn complete_account(&self, id: Uuid, user_id: &str, password_hash: &str) -> StoreResult<User>;
}

/// Task, assignment and listing storage
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, created_by: Uuid, task: NewTask) -> StoreResult<Task>;

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>>;

    /// Sparse merge; None if the task does not exist
    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> StoreResult<Option<Task>>;

    /// Removes the task row only
    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;

    async fn tasks_assigned_to(&self, user_id: Uuid) -> StoreResult<Vec<AssignedTask>>;

    async fn tasks_created_by(&self, user_id: Uuid) -> StoreResult<Vec<CreatedTask>>;

    /// Users matching any of `emails`; unknown emails are skipped
    async fn find_users_by_emails(&self, emails: &[String]) -> StoreResult<Vec<User>>;

    /// Creates one assignment and one notification per user as a single unit of work
    async fn assign_and_notify(
        &self,
        task_id: Uuid,
        user_ids: &[Uuid],
        message: &str,
    ) -> StoreResult<(Vec<TaskAssignment>, Vec<Notification>)>;
}

/// Notification storage
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Newest first
    async fn notifications_for(&self, user_id: Uuid) -> StoreResult<Vec<Notification>>;

    /// Returns false when the id/owner pair matched nothing
    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool>;
}

/// Everything a request handler may need from storage
#[async_trait]
pub trait Store: CredentialStore + TaskStore + NotificationStore {
    /// Cheap liveness probe for the health endpoint
    async fn ping(&self) -> StoreResult<()>;

    /// Short adapter name for logs and health output
    fn backend_name(&self) -> &'static str;
}
