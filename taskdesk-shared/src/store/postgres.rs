/// Postgres store adapter
///
/// Implements the persistence ports on top of a sqlx `PgPool` by delegating
/// to the model queries. The assignment fan-out runs in one transaction, so
/// an assignment is never committed without its notification.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{CredentialStore, NotificationStore, Store, StoreError, StoreResult, TaskStore};
use crate::db::pool::health_check;
use crate::models::{
    assignment::{AssignedTask, CreatedTask, TaskAssignment},
    notification::Notification,
    task::{NewTask, Task, TaskPatch},
    user::{NewUser, User},
};

/// Convert sqlx errors to store errors
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    let constraint = db_err.constraint().unwrap_or_default();
                    if constraint.contains("email") {
                        return StoreError::Conflict("Email already registered".to_string());
                    }
                    if constraint.contains("user_id") {
                        return StoreError::Conflict("User ID is already taken".to_string());
                    }
                    return StoreError::Conflict(format!("Constraint violation: {}", constraint));
                }
                StoreError::Backend(format!("Database error: {}", db_err))
            }
            other => StoreError::Backend(format!("Database error: {}", other)),
        }
    }
}

/// Store backed by PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn missing_user(id: Uuid) -> StoreError {
    StoreError::NotFound(format!("User {} not found", id))
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn find_by_external_id(&self, user_id: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_user_id(&self.pool, user_id).await?)
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        Ok(User::create(&self.pool, user).await?)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        if User::update_password(&self.pool, id, password_hash).await? {
            Ok(())
        } else {
            Err(missing_user(id))
        }
    }

    async fn update_reset_otp(&self, id: Uuid, otp: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        if User::set_reset_otp(&self.pool, id, otp, expires_at).await? {
            Ok(())
        } else {
            Err(missing_user(id))
        }
    }

    async fn clear_reset_otp(&self, id: Uuid) -> StoreResult<()> {
        User::clear_reset_otp(&self.pool, id).await?;
        Ok(())
    }

    async fn consume_reset_otp(&self, id: Uuid, otp: &str, password_hash: &str) -> StoreResult<bool> {
        Ok(User::consume_reset_otp(&self.pool, id, otp, password_hash).await?)
    }

    async fn record_failed_reset_attempt(&self, id: Uuid) -> StoreResult<i32> {
        User::record_failed_reset_attempt(&self.pool, id)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => missing_user(id),
                other => other.into(),
            })
    }

    async fn complete_account(&self, id: Uuid, user_id: &str, password_hash: &str) -> StoreResult<User> {
        User::complete_account(&self.pool, id, user_id, password_hash)
            .await?
            .ok_or_else(|| missing_user(id))
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert_task(&self, created_by: Uuid, task: NewTask) -> StoreResult<Task> {
        Ok(Task::create(&self.pool, created_by, task).await?)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> StoreResult<Option<Task>> {
        Ok(Task::update(&self.pool, id, patch).await?)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Task::delete(&self.pool, id).await?)
    }

    async fn tasks_assigned_to(&self, user_id: Uuid) -> StoreResult<Vec<AssignedTask>> {
        Ok(TaskAssignment::list_assigned_to(&self.pool, user_id).await?)
    }

    async fn tasks_created_by(&self, user_id: Uuid) -> StoreResult<Vec<CreatedTask>> {
        Ok(TaskAssignment::list_created_by(&self.pool, user_id).await?)
    }

    async fn find_users_by_emails(&self, emails: &[String]) -> StoreResult<Vec<User>> {
        Ok(User::find_by_emails(&self.pool, emails).await?)
    }

    async fn assign_and_notify(
        &self,
        task_id: Uuid,
        user_ids: &[Uuid],
        message: &str,
    ) -> StoreResult<(Vec<TaskAssignment>, Vec<Notification>)> {
        let mut tx = self.pool.begin().await?;

        let mut assignments = Vec::with_capacity(user_ids.len());
        let mut notifications = Vec::with_capacity(user_ids.len());

        for &user_id in user_ids {
            assignments.push(TaskAssignment::create(&mut *tx, task_id, user_id).await?);
            notifications.push(Notification::create(&mut *tx, user_id, message).await?);
        }

        tx.commit().await?;

        Ok((assignments, notifications))
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn notifications_for(&self, user_id: Uuid) -> StoreResult<Vec<Notification>> {
        Ok(Notification::list_by_user(&self.pool, user_id).await?)
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        Ok(Notification::mark_read(&self.pool, id, user_id).await?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
