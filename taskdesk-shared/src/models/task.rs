/// Task model and database operations
///
/// A task is a work item owned by the user who created it. Other users are
/// attached to it through [`TaskAssignment`](super::assignment::TaskAssignment)
/// rows.
///
/// # Status
///
/// ```text
/// open ⇄ in-progress ⇄ stuck
///            ↓
///          done
/// ```
///
/// Any status can be set at any time; the workflow above is a convention of
/// the frontend, not a constraint of the store.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('open', 'in-progress', 'stuck', 'done');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'open',
///     priority INTEGER NOT NULL DEFAULT 3,
///     due_date DATE,
///     company VARCHAR(255),
///     created_by UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     stuck_reason TEXT,
///     completion_remark TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::double_option;

pub(crate) const TASK_COLUMNS: &str = "id, title, description, status, priority, due_date, company, \
     created_by, stuck_reason, completion_remark, created_at, updated_at";

/// Priority given to tasks created without one
pub const DEFAULT_PRIORITY: i32 = 3;

/// Task status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Not started
    #[default]
    Open,

    /// Someone is working on it
    InProgress,

    /// Blocked, see `stuck_reason`
    Stuck,

    /// Finished, see `completion_remark`
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Stuck => "stuck",
            TaskStatus::Done => "done",
        }
    }
}

/// Task model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    /// Required, non-empty title
    pub title: String,

    pub description: Option<String>,

    pub status: TaskStatus,

    /// Lower is more urgent by convention; defaults to 3
    pub priority: i32,

    pub due_date: Option<NaiveDate>,

    /// Free-form company tag
    pub company: Option<String>,

    /// Owning user; the only one allowed to update or delete the task
    pub created_by: Uuid,

    pub stuck_reason: Option<String>,

    pub completion_remark: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: i32,
    pub due_date: Option<NaiveDate>,
    pub company: Option<String>,
}

/// Sparse update of a task
///
/// `None` means "not sent, leave as is". For nullable columns the inner
/// option distinguishes "sent as null" (`Some(None)`, clears the value) from
/// "sent with a value" (`Some(Some(v))`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    #[serde(default)]
    pub status: Option<TaskStatus>,

    #[serde(default)]
    pub priority: Option<i32>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "double_option")]
    pub company: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub stuck_reason: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub completion_remark: Option<Option<String>>,
}

impl TaskPatch {
    /// True when no field was sent
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.company.is_none()
            && self.stuck_reason.is_none()
            && self.completion_remark.is_none()
    }

    /// Merges the sent fields into `task`, leaving the rest untouched
    pub fn apply_to(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(company) = self.company {
            task.company = company;
        }
        if let Some(stuck_reason) = self.stuck_reason {
            task.stuck_reason = stuck_reason;
        }
        if let Some(completion_remark) = self.completion_remark {
            task.completion_remark = completion_remark;
        }
    }
}

impl Task {
    /// Inserts a task owned by `created_by`
    pub async fn create(pool: &PgPool, created_by: Uuid, data: NewTask) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO tasks (title, description, priority, due_date, company, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(data.title)
            .bind(data.description)
            .bind(data.priority)
            .bind(data.due_date)
            .bind(data.company)
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    /// Finds a task by id
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists the tasks created by a user, newest first
    pub async fn list_by_creator(pool: &PgPool, created_by: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE created_by = $1 ORDER BY created_at DESC"
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(created_by)
            .fetch_all(pool)
            .await
    }

    /// Applies a sparse update
    ///
    /// Only the fields present in `patch` are written. Returns None if the
    /// task does not exist.
    pub async fn update(pool: &PgPool, id: Uuid, patch: TaskPatch) -> Result<Option<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE tasks SET updated_at = NOW()");

        if let Some(title) = patch.title {
            builder.push(", title = ").push_bind(title);
        }
        if let Some(description) = patch.description {
            builder.push(", description = ").push_bind(description);
        }
        if let Some(status) = patch.status {
            builder.push(", status = ").push_bind(status);
        }
        if let Some(priority) = patch.priority {
            builder.push(", priority = ").push_bind(priority);
        }
        if let Some(due_date) = patch.due_date {
            builder.push(", due_date = ").push_bind(due_date);
        }
        if let Some(company) = patch.company {
            builder.push(", company = ").push_bind(company);
        }
        if let Some(stuck_reason) = patch.stuck_reason {
            builder.push(", stuck_reason = ").push_bind(stuck_reason);
        }
        if let Some(completion_remark) = patch.completion_remark {
            builder.push(", completion_remark = ").push_bind(completion_remark);
        }

        builder.push(" WHERE id = ").push_bind(id);
        builder.push(" RETURNING ");
        builder.push(TASK_COLUMNS);

        builder
            .build_query_as::<Task>()
            .fetch_optional(pool)
            .await
    }

    /// Deletes a task. Assignments and notifications are left in place.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
