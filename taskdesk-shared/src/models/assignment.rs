/// Task assignment model and task listing views
///
/// An assignment links one task to one assignee. The pair is not unique:
/// assigning the same user twice produces two rows.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE task_assignments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// `task_id` carries no foreign key: deleting a task leaves its assignments behind.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::task::{Task, TaskStatus};
use super::user::UserSummary;

/// Link between a task and an assignee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskAssignment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A task as seen by one of its assignees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedTask {
    pub assignment_id: Uuid,
    pub assigned_at: DateTime<Utc>,
    pub task: Task,
    /// The task's creator
    pub assigned_by: UserSummary,
}

/// An assignee of a task, for the creator's view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    pub assignment_id: Uuid,
    pub assigned_at: DateTime<Utc>,
    pub user: UserSummary,
}

/// A task as seen by its creator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedTask {
    #[serde(flatten)]
    pub task: Task,
    pub assignees: Vec<Assignee>,
}

#[derive(sqlx::FromRow)]
struct AssignedTaskRow {
    assignment_id: Uuid,
    assigned_at: DateTime<Utc>,
    id: Uuid,
    title: String,
    description: Option<String>,
    status: TaskStatus,
    priority: i32,
    due_date: Option<chrono::NaiveDate>,
    company: Option<String>,
    created_by: Uuid,
    stuck_reason: Option<String>,
    completion_remark: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    creator_name: String,
    creator_email: String,
}

impl From<AssignedTaskRow> for AssignedTask {
    fn from(row: AssignedTaskRow) -> Self {
        AssignedTask {
            assignment_id: row.assignment_id,
            assigned_at: row.assigned_at,
            assigned_by: UserSummary {
                id: row.created_by,
                name: row.creator_name,
                email: row.creator_email,
            },
            task: Task {
                id: row.id,
                title: row.title,
                description: row.description,
                status: row.status,
                priority: row.priority,
                due_date: row.due_date,
                company: row.company,
                created_by: row.created_by,
                stuck_reason: row.stuck_reason,
                completion_remark: row.completion_remark,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct AssigneeRow {
    assignment_id: Uuid,
    task_id: Uuid,
    assigned_at: DateTime<Utc>,
    user_id: Uuid,
    name: String,
    email: String,
}

impl TaskAssignment {
    /// Inserts one assignment
    ///
    /// Takes any executor so the fan-out can run it inside a transaction.
    pub async fn create<'e, E>(executor: E, task_id: Uuid, user_id: Uuid) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, TaskAssignment>(
            r#"
            INSERT INTO task_assignments (task_id, user_id)
            VALUES ($1, $2)
            RETURNING id, task_id, user_id, created_at
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_one(executor)
        .await
    }

    /// Lists every assignment of a task
    pub async fn list_by_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskAssignment>(
            r#"
            SELECT id, task_id, user_id, created_at
            FROM task_assignments
            WHERE task_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    /// Tasks assigned to `user_id`, joined with their creator, newest assignment first
    ///
    /// Assignments whose task was deleted drop out of the join.
    pub async fn list_assigned_to(pool: &PgPool, user_id: Uuid) -> Result<Vec<AssignedTask>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AssignedTaskRow>(
            r#"
            SELECT a.id AS assignment_id, a.created_at AS assigned_at,
                   t.id, t.title, t.description, t.status, t.priority, t.due_date,
                   t.company, t.created_by, t.stuck_reason, t.completion_remark,
                   t.created_at, t.updated_at,
                   u.name AS creator_name, u.email AS creator_email
            FROM task_assignments a
            JOIN tasks t ON t.id = a.task_id
            JOIN users u ON u.id = t.created_by
            WHERE a.user_id = $1
            ORDER BY a.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(AssignedTask::from).collect())
    }

    /// Tasks created by `user_id` with their assignees, newest task first
    pub async fn list_created_by(pool: &PgPool, user_id: Uuid) -> Result<Vec<CreatedTask>, sqlx::Error> {
        let tasks = Task::list_by_creator(pool, user_id).await?;
        let task_ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();

        let rows = sqlx::query_as::<_, AssigneeRow>(
            r#"
            SELECT a.id AS assignment_id, a.task_id, a.created_at AS assigned_at,
                   u.id AS user_id, u.name, u.email
            FROM task_assignments a
            JOIN users u ON u.id = a.user_id
            WHERE a.task_id = ANY($1)
            ORDER BY a.created_at
            "#,
        )
        .bind(&task_ids)
        .fetch_all(pool)
        .await?;

        let mut by_task: HashMap<Uuid, Vec<Assignee>> = HashMap::new();
        for row in rows {
            by_task.entry(row.task_id).or_default().push(Assignee {
                assignment_id: row.assignment_id,
                assigned_at: row.assigned_at,
                user: UserSummary {
                    id: row.user_id,
                    name: row.name,
                    email: row.email,
                },
            });
        }

        Ok(tasks
            .into_iter()
            .map(|task| {
                let assignees = by_task.remove(&task.id).unwrap_or_default();
                CreatedTask { task, assignees }
            })
            .collect())
    }
}
