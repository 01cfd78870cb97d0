/// In-memory store adapter
///
/// Keeps every table in one process-local structure behind a single
/// `RwLock`. Uniqueness of emails and external user ids is enforced the same
/// way the database does it, and the assignment fan-out holds the write lock
/// for its whole duration.
///
/// Rows are kept in insertion order; "newest first" listings walk them
/// backwards, which keeps ordering stable when two rows share a timestamp.
///
/// # Example
///
/// ```
/// use taskdesk_shared::models::user::NewUser;
/// use taskdesk_shared::store::{CredentialStore, MemoryStore};
///
/// # tokio_test_block(async {
/// let store = MemoryStore::new();
/// let user = store
///     .insert(NewUser::local("Ada", "ada@example.com", None, "hash".to_string()))
///     .await
///     .unwrap();
///
/// let found = store.find_by_email("ada@example.com").await.unwrap();
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CredentialStore, NotificationStore, Store, StoreError, StoreResult, TaskStore};
use crate::models::{
    assignment::{AssignedTask, Assignee, CreatedTask, TaskAssignment},
    notification::Notification,
    task::{NewTask, Task, TaskPatch},
    user::{AccountStatus, NewUser, User},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    tasks: Vec<Task>,
    assignments: Vec<TaskAssignment>,
    notifications: Vec<Notification>,
}

impl Tables {
    fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn user_mut(&mut self, id: Uuid) -> StoreResult<&mut User> {
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("User {} not found", id)))
    }

    fn task(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

/// Store backed by process memory
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.user(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_external_id(&self, user_id: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.user_id.as_deref() == Some(user_id))
            .cloned())
    }

    async fn insert(&self, data: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;

        if tables.users.iter().any(|u| u.email == data.email) {
            return Err(StoreError::Conflict("Email already registered".to_string()));
        }
        if let Some(user_id) = data.user_id.as_deref() {
            if tables.users.iter().any(|u| u.user_id.as_deref() == Some(user_id)) {
                return Err(StoreError::Conflict("User ID is already taken".to_string()));
            }
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: data.name,
            email: data.email,
            user_id: data.user_id,
            password_hash: data.password_hash,
            auth_provider: data.auth_provider,
            account_status: data.account_status,
            reset_otp: None,
            reset_otp_expires_at: None,
            reset_attempts: 0,
            last_reset_attempt_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());

        Ok(user)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let user = tables.user_mut(id)?;
        user.password_hash = Some(password_hash.to_string());
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn update_reset_otp(&self, id: Uuid, otp: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let user = tables.user_mut(id)?;
        let now = Utc::now();
        user.reset_otp = Some(otp.to_string());
        user.reset_otp_expires_at = Some(expires_at);
        user.reset_attempts = 0;
        user.last_reset_attempt_at = Some(now);
        user.updated_at = now;
        Ok(())
    }

    async fn clear_reset_otp(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Ok(user) = tables.user_mut(id) {
            user.reset_otp = None;
            user.reset_otp_expires_at = None;
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn consume_reset_otp(&self, id: Uuid, otp: &str, password_hash: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let Ok(user) = tables.user_mut(id) else {
            return Ok(false);
        };
        if user.reset_otp.as_deref() != Some(otp) {
            return Ok(false);
        }

        user.password_hash = Some(password_hash.to_string());
        user.reset_otp = None;
        user.reset_otp_expires_at = None;
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn record_failed_reset_attempt(&self, id: Uuid) -> StoreResult<i32> {
        let mut tables = self.tables.write().await;
        let user = tables.user_mut(id)?;
        user.reset_attempts += 1;
        user.updated_at = Utc::now();
        Ok(user.reset_attempts)
    }

    async fn complete_account(&self, id: Uuid, user_id: &str, password_hash: &str) -> StoreResult<User> {
        let mut tables = self.tables.write().await;

        if tables
            .users
            .iter()
            .any(|u| u.id != id && u.user_id.as_deref() == Some(user_id))
        {
            return Err(StoreError::Conflict("User ID is already taken".to_string()));
        }

        let user = tables.user_mut(id)?;
        user.user_id = Some(user_id.to_string());
        user.password_hash = Some(password_hash.to_string());
        user.account_status = AccountStatus::Active;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, created_by: Uuid, data: NewTask) -> StoreResult<Task> {
        let mut tables = self.tables.write().await;

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            status: Default::default(),
            priority: data.priority,
            due_date: data.due_date,
            company: data.company,
            created_by,
            stuck_reason: None,
            completion_remark: None,
            created_at: now,
            updated_at: now,
        };
        tables.tasks.push(task.clone());

        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self.tables.read().await.task(id).cloned())
    }

    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> StoreResult<Option<Task>> {
        let mut tables = self.tables.write().await;
        let Some(task) = tables.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };

        patch.apply_to(task);
        task.updated_at = Utc::now();
        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.tasks.len();
        tables.tasks.retain(|t| t.id != id);
        Ok(tables.tasks.len() < before)
    }

    async fn tasks_assigned_to(&self, user_id: Uuid) -> StoreResult<Vec<AssignedTask>> {
        let tables = self.tables.read().await;

        Ok(tables
            .assignments
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .filter_map(|a| {
                let task = tables.task(a.task_id)?;
                let creator = tables.user(task.created_by)?;
                Some(AssignedTask {
                    assignment_id: a.id,
                    assigned_at: a.created_at,
                    task: task.clone(),
                    assigned_by: creator.summary(),
                })
            })
            .collect())
    }

    async fn tasks_created_by(&self, user_id: Uuid) -> StoreResult<Vec<CreatedTask>> {
        let tables = self.tables.read().await;

        let mut by_task: HashMap<Uuid, Vec<Assignee>> = HashMap::new();
        for a in &tables.assignments {
            if let Some(assignee) = tables.user(a.user_id) {
                by_task.entry(a.task_id).or_default().push(Assignee {
                    assignment_id: a.id,
                    assigned_at: a.created_at,
                    user: assignee.summary(),
                });
            }
        }

        Ok(tables
            .tasks
            .iter()
            .rev()
            .filter(|t| t.created_by == user_id)
            .map(|task| CreatedTask {
                task: task.clone(),
                assignees: by_task.remove(&task.id).unwrap_or_default(),
            })
            .collect())
    }

    async fn find_users_by_emails(&self, emails: &[String]) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;

        let mut users: Vec<User> = tables
            .users
            .iter()
            .filter(|u| emails.contains(&u.email))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));

        Ok(users)
    }

    async fn assign_and_notify(
        &self,
        task_id: Uuid,
        user_ids: &[Uuid],
        message: &str,
    ) -> StoreResult<(Vec<TaskAssignment>, Vec<Notification>)> {
        let mut tables = self.tables.write().await;

        // Validate everything before writing so a failure leaves no partial rows
        if let Some(missing) = user_ids.iter().find(|id| tables.user(**id).is_none()) {
            return Err(StoreError::NotFound(format!("User {} not found", missing)));
        }

        let now = Utc::now();
        let mut assignments = Vec::with_capacity(user_ids.len());
        let mut notifications = Vec::with_capacity(user_ids.len());

        for &user_id in user_ids {
            assignments.push(TaskAssignment {
                id: Uuid::new_v4(),
                task_id,
                user_id,
                created_at: now,
            });
            notifications.push(Notification {
                id: Uuid::new_v4(),
                user_id,
                message: message.to_string(),
                is_read: false,
                created_at: now,
            });
        }

        tables.assignments.extend(assignments.iter().cloned());
        tables.notifications.extend(notifications.iter().cloned());

        Ok((assignments, notifications))
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn notifications_for(&self, user_id: Uuid) -> StoreResult<Vec<Notification>> {
        let tables = self.tables.read().await;
        Ok(tables
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
