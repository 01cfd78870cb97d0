/// Task repository
///
/// Creation optionally fans out to assignees. Updates are sparse merges and,
/// like deletes, are reserved for the task's creator.
///
/// Deleting a task removes the task row only. Its assignments and the
/// notifications they produced stay behind; assignee listings skip
/// assignments whose task is gone.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use super::assignment::{AssignmentEngine, AssignmentResult};
use crate::models::{
    assignment::{AssignedTask, CreatedTask, TaskAssignment},
    task::{NewTask, Task, TaskPatch, DEFAULT_PRIORITY},
};
use crate::store::{Store, StoreError};

/// Error type for task operations
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("{0}")]
    InvalidInput(String),

    /// Value longer than its column allows
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("Task not found")]
    NotFound,

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Longest title or company a task column holds
pub const MAX_TEXT_LENGTH: usize = 255;

fn check_length(field: &'static str, value: Option<&str>) -> Result<(), TaskError> {
    match value {
        Some(v) if v.chars().count() > MAX_TEXT_LENGTH => Err(TaskError::TooLong {
            field,
            max: MAX_TEXT_LENGTH,
        }),
        _ => Ok(()),
    }
}

/// Fields for a new task
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<i32>,
    pub due_date: Option<NaiveDate>,
    pub company: Option<String>,
    /// Emails to assign the task to once it exists
    pub assigned_to: Vec<String>,
}

/// A freshly created task and the assignments made with it
#[derive(Debug, Clone, Serialize)]
pub struct TaskCreated {
    #[serde(flatten)]
    pub task: Task,
    pub assignments: Vec<TaskAssignment>,
}

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn Store>,
    engine: AssignmentEngine,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let engine = AssignmentEngine::new(store.clone());
        Self { store, engine }
    }

    pub async fn create(&self, creator: Uuid, draft: TaskDraft) -> Result<TaskCreated, TaskError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(TaskError::InvalidInput("Title is required".to_string()));
        }
        check_length("title", Some(title))?;
        check_length("company", draft.company.as_deref())?;

        let task = self
            .store
            .insert_task(
                creator,
                NewTask {
                    title: title.to_string(),
                    description: draft.description,
                    priority: draft.priority.unwrap_or(DEFAULT_PRIORITY),
                    due_date: draft.due_date,
                    company: draft.company,
                },
            )
            .await?;

        tracing::info!(task_id = %task.id, created_by = %creator, "Task created");

        let AssignmentResult { assignments, .. } = self.engine.assign_task(&task, &draft.assigned_to).await?;

        Ok(TaskCreated { task, assignments })
    }

    /// Applies the fields present in `patch`
    pub async fn update(&self, task_id: Uuid, requester: Uuid, patch: TaskPatch) -> Result<Task, TaskError> {
        if let Some(title) = patch.title.as_deref() {
            if title.trim().is_empty() {
                return Err(TaskError::InvalidInput("Title cannot be empty".to_string()));
            }
        }
        check_length("title", patch.title.as_deref())?;
        check_length("company", patch.company.as_ref().and_then(|c| c.as_deref()))?;

        self.owned_task(task_id, requester, "Not authorized to update this task")
            .await?;

        let task = self
            .store
            .update_task(task_id, patch)
            .await?
            .ok_or(TaskError::NotFound)?;

        tracing::info!(task_id = %task.id, status = task.status.as_str(), "Task updated");
        Ok(task)
    }

    pub async fn delete(&self, task_id: Uuid, requester: Uuid) -> Result<(), TaskError> {
        self.owned_task(task_id, requester, "Not authorized to delete this task")
            .await?;

        if !self.store.delete_task(task_id).await? {
            return Err(TaskError::NotFound);
        }

        tracing::info!(task_id = %task_id, "Task deleted");
        Ok(())
    }

    /// Assigns an existing task; creator only
    pub async fn assign(&self, task_id: Uuid, requester: Uuid, emails: &[String]) -> Result<AssignmentResult, TaskError> {
        let task = self
            .owned_task(task_id, requester, "Not authorized to assign this task")
            .await?;
        self.engine.assign_task(&task, emails).await
    }

    /// Tasks the user created or is assigned to, newest first, each once
    pub async fn list_visible(&self, user_id: Uuid) -> Result<Vec<Task>, TaskError> {
        let mut tasks: Vec<Task> = self
            .store
            .tasks_created_by(user_id)
            .await?
            .into_iter()
            .map(|created| created.task)
            .collect();

        for assigned in self.store.tasks_assigned_to(user_id).await? {
            if !tasks.iter().any(|t| t.id == assigned.task.id) {
                tasks.push(assigned.task);
            }
        }

        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    pub async fn list_assigned_to(&self, user_id: Uuid) -> Result<Vec<AssignedTask>, TaskError> {
        Ok(self.store.tasks_assigned_to(user_id).await?)
    }

    pub async fn list_created_by(&self, user_id: Uuid) -> Result<Vec<CreatedTask>, TaskError> {
        Ok(self.store.tasks_created_by(user_id).await?)
    }

    async fn owned_task(&self, task_id: Uuid, requester: Uuid, denial: &str) -> Result<Task, TaskError> {
        let task = self
            .store
            .find_task(task_id)
            .await?
            .ok_or(TaskError::NotFound)?;

        if task.created_by != requester {
            tracing::debug!(task_id = %task_id, requester = %requester, "Task access denied");
            return Err(TaskError::Forbidden(denial.to_string()));
        }

        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::TaskStatus;
    use crate::models::user::{NewUser, User};
    use crate::store::{CredentialStore, MemoryStore, NotificationStore, TaskStore};

    struct Harness {
        tasks: TaskService,
        store: Arc<MemoryStore>,
        creator: User,
        other: User,
    }

    async fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let creator = store
            .insert(NewUser::local("Boss", "boss@x.com", None, "hash".to_string()))
            .await
            .unwrap();
        let other = store
            .insert(NewUser::local("Known", "known@x.com", None, "hash".to_string()))
            .await
            .unwrap();
        Harness {
            tasks: TaskService::new(store.clone()),
            store,
            creator,
            other,
        }
    }

    fn draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            description: Some("All the numbers".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_defaults_and_fans_out() {
        let h = harness().await;

        let created = h
            .tasks
            .create(
                h.creator.id,
                TaskDraft {
                    assigned_to: vec!["known@x.com".to_string(), "unknown@x.com".to_string()],
                    ..draft("Report")
                },
            )
            .await
            .unwrap();

        assert_eq!(created.task.priority, DEFAULT_PRIORITY);
        assert_eq!(created.task.status, TaskStatus::Open);
        assert_eq!(created.task.created_by, h.creator.id);
        assert_eq!(created.assignments.len(), 1);
        assert_eq!(h.store.notifications_for(h.other.id).await.unwrap().len(), 1);

        let assigned = h.tasks.list_assigned_to(h.other.id).await.unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].assigned_by.email, "boss@x.com");
    }

    #[tokio::test]
    async fn test_create_requires_title() {
        let h = harness().await;
        assert!(matches!(
            h.tasks.create(h.creator.id, draft("   ")).await,
            Err(TaskError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_overlong_text_is_rejected_before_storage() {
        let h = harness().await;
        let long = "x".repeat(MAX_TEXT_LENGTH + 1);

        let err = h
            .tasks
            .create(
                h.creator.id,
                TaskDraft {
                    company: Some(long.clone()),
                    ..draft("Report")
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::TooLong { field: "company", .. }));
        assert!(h.tasks.list_created_by(h.creator.id).await.unwrap().is_empty());

        let created = h.tasks.create(h.creator.id, draft("Report")).await.unwrap();
        let patch = TaskPatch {
            title: Some(long.clone()),
            ..Default::default()
        };
        let err = h.tasks.update(created.task.id, h.creator.id, patch).await.unwrap_err();
        assert!(matches!(err, TaskError::TooLong { field: "title", .. }));

        let patch = TaskPatch {
            company: Some(Some(long)),
            ..Default::default()
        };
        let err = h.tasks.update(created.task.id, h.creator.id, patch).await.unwrap_err();
        assert!(matches!(err, TaskError::TooLong { field: "company", .. }));

        // Exactly at the limit is fine
        let patch = TaskPatch {
            title: Some("y".repeat(MAX_TEXT_LENGTH)),
            ..Default::default()
        };
        h.tasks.update(created.task.id, h.creator.id, patch).await.unwrap();
    }

    #[tokio::test]
    async fn test_visible_tasks_cover_created_and_assigned() {
        let h = harness().await;

        let own = h.tasks.create(h.other.id, draft("Own")).await.unwrap();
        let assigned = h
            .tasks
            .create(
                h.creator.id,
                TaskDraft {
                    assigned_to: vec!["known@x.com".to_string()],
                    ..draft("Assigned")
                },
            )
            .await
            .unwrap();
        h.tasks
            .assign(assigned.task.id, h.creator.id, &["known@x.com".to_string()])
            .await
            .unwrap();
        h.tasks.create(h.creator.id, draft("Not shared")).await.unwrap();

        let visible = h.tasks.list_visible(h.other.id).await.unwrap();
        let ids: Vec<Uuid> = visible.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&own.task.id));
        assert!(ids.contains(&assigned.task.id));

        assert_eq!(h.tasks.list_visible(h.creator.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_status_only_update_keeps_other_fields() {
        let h = harness().await;
        let created = h.tasks.create(h.creator.id, draft("Report")).await.unwrap();

        let patch: TaskPatch = serde_json::from_str(r#"{"status": "done"}"#).unwrap();
        let updated = h.tasks.update(created.task.id, h.creator.id, patch).await.unwrap();

        assert_eq!(updated.status, TaskStatus::Done);
        assert_eq!(updated.title, "Report");
        assert_eq!(updated.description.as_deref(), Some("All the numbers"));
    }

    #[tokio::test]
    async fn test_update_by_non_creator_forbidden() {
        let h = harness().await;
        let created = h.tasks.create(h.creator.id, draft("Report")).await.unwrap();

        let patch: TaskPatch = serde_json::from_str(r#"{"title": "Mine now"}"#).unwrap();
        assert!(matches!(
            h.tasks.update(created.task.id, h.other.id, patch).await,
            Err(TaskError::Forbidden(_))
        ));
        assert_eq!(
            h.store.find_task(created.task.id).await.unwrap().unwrap().title,
            "Report"
        );
    }

    #[tokio::test]
    async fn test_update_missing_task() {
        let h = harness().await;
        assert!(matches!(
            h.tasks.update(Uuid::new_v4(), h.creator.id, TaskPatch::default()).await,
            Err(TaskError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_by_non_creator_changes_nothing() {
        let h = harness().await;
        let created = h
            .tasks
            .create(
                h.creator.id,
                TaskDraft {
                    assigned_to: vec!["known@x.com".to_string()],
                    ..draft("Report")
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            h.tasks.delete(created.task.id, h.other.id).await,
            Err(TaskError::Forbidden(_))
        ));

        assert!(h.store.find_task(created.task.id).await.unwrap().is_some());
        assert_eq!(h.tasks.list_assigned_to(h.other.id).await.unwrap().len(), 1);
        let notes = h.store.notifications_for(h.other.id).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert!(!notes[0].is_read);
    }

    #[tokio::test]
    async fn test_delete_by_creator() {
        let h = harness().await;
        let created = h.tasks.create(h.creator.id, draft("Report")).await.unwrap();

        h.tasks.delete(created.task.id, h.creator.id).await.unwrap();
        assert!(h.store.find_task(created.task.id).await.unwrap().is_none());
        assert!(matches!(
            h.tasks.delete(created.task.id, h.creator.id).await,
            Err(TaskError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_assign_existing_task_creator_only() {
        let h = harness().await;
        let created = h.tasks.create(h.creator.id, draft("Report")).await.unwrap();
        let emails = vec!["known@x.com".to_string()];

        assert!(matches!(
            h.tasks.assign(created.task.id, h.other.id, &emails).await,
            Err(TaskError::Forbidden(_))
        ));

        let result = h.tasks.assign(created.task.id, h.creator.id, &emails).await.unwrap();
        assert_eq!(result.assignments.len(), 1);

        let created_by = h.tasks.list_created_by(h.creator.id).await.unwrap();
        assert_eq!(created_by[0].assignees.len(), 1);
        assert_eq!(created_by[0].assignees[0].user.id, h.other.id);
    }
}
