/// Assignment fan-out
///
/// Assigning a task to a list of emails resolves each email to an account,
/// silently skipping unknown ones, and then writes one assignment and one
/// notification per resolved user. Both sets of rows are written by the
/// store as a single unit of work.
///
/// Repeating an assignment is allowed and produces duplicate rows; nothing
/// is deduplicated across calls.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::tasks::TaskError;
use crate::models::{
    assignment::TaskAssignment,
    notification::{assignment_message, Notification},
    task::Task,
};
use crate::store::Store;

/// Rows written by one fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentResult {
    pub assignments: Vec<TaskAssignment>,
    pub notifications: Vec<Notification>,
}

impl AssignmentResult {
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

#[derive(Clone)]
pub struct AssignmentEngine {
    store: Arc<dyn Store>,
}

impl AssignmentEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Assigns an existing task by id
    pub async fn assign(&self, task_id: Uuid, emails: &[String]) -> Result<AssignmentResult, TaskError> {
        let task = self
            .store
            .find_task(task_id)
            .await?
            .ok_or(TaskError::NotFound)?;

        self.assign_task(&task, emails).await
    }

    /// Assigns `task` to every account matching one of `emails`
    ///
    /// An empty or entirely unknown list is a no-op.
    pub async fn assign_task(&self, task: &Task, emails: &[String]) -> Result<AssignmentResult, TaskError> {
        let emails: Vec<String> = emails
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect();
        if emails.is_empty() {
            return Ok(AssignmentResult::default());
        }

        let users = self.store.find_users_by_emails(&emails).await?;
        if users.is_empty() {
            tracing::debug!(task_id = %task.id, requested = emails.len(), "No assignee matched");
            return Ok(AssignmentResult::default());
        }

        let user_ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
        let (assignments, notifications) = self
            .store
            .assign_and_notify(task.id, &user_ids, &assignment_message(&task.title))
            .await?;

        tracing::info!(
            task_id = %task.id,
            requested = emails.len(),
            assigned = assignments.len(),
            "Task assigned"
        );

        Ok(AssignmentResult {
            assignments,
            notifications,
        })
    }
}
