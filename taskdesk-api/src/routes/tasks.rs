/// Task endpoints
///
/// All routes require authentication. Updates, deletes and explicit
/// assignment are limited to the task's creator.
///
/// # Endpoints
///
/// - `GET /tasks` - Tasks the caller created or is assigned to
/// - `POST /tasks` - Create a task, optionally assigning it by email
/// - `PATCH /tasks/:id` - Sparse update; only the fields sent are changed
/// - `DELETE /tasks/:id` - Delete a task
/// - `POST /tasks/:id/assign` - Assign an existing task by email
/// - `GET /tasks/assignedTo/:user_id` - Tasks assigned to a user
/// - `GET /tasks/assignedBy/:user_id` - Tasks a user created, with assignees

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use taskdesk_shared::{
    models::{
        assignment::{AssignedTask, CreatedTask},
        task::{Task, TaskPatch},
    },
    services::{
        assignment::AssignmentResult,
        tasks::{TaskCreated, TaskDraft},
    },
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::ApiResult,
    middleware::auth::CurrentUser,
    routes::MessageResponse,
};

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: String,

    pub description: Option<String>,

    /// Defaults to 3
    pub priority: Option<i32>,

    pub due_date: Option<NaiveDate>,

    #[validate(length(max = 255, message = "Company must be at most 255 characters"))]
    pub company: Option<String>,

    /// Assignee emails; unknown ones are skipped
    #[serde(default)]
    pub assigned_to: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    #[serde(default)]
    pub user_emails: Vec<String>,
}

/// List the caller's visible tasks, newest first
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.tasks.list_visible(user.id).await?))
}

/// Create a task
///
/// ```text
/// POST /tasks
/// { "title": "Quarterly report", "priority": 2, "assigned_to": ["bob@example.com"] }
/// ```
///
/// Responds `201 Created` with the task and an `assignments` array.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskCreated>)> {
    req.validate()?;

    let created = state
        .tasks
        .create(
            user.id,
            TaskDraft {
                title: req.title,
                description: req.description,
                priority: req.priority,
                due_date: req.due_date,
                company: req.company,
                assigned_to: req.assigned_to,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a task
///
/// Absent fields stay as they are; `null` clears a nullable field.
///
/// # Errors
///
/// - `403 Forbidden`: Caller did not create the task
/// - `404 Not Found`: No such task
pub async fn update_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(task_id): Path<Uuid>,
    Json(patch): Json<TaskPatch>,
) -> ApiResult<Json<Task>> {
    let task = state.tasks.update(task_id, user.id, patch).await?;
    Ok(Json(task))
}

/// Delete a task
///
/// Assignments and notifications for the task are kept.
///
/// # Errors
///
/// - `403 Forbidden`: Caller did not create the task
/// - `404 Not Found`: No such task
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.tasks.delete(task_id, user.id).await?;
    Ok(Json(MessageResponse::new("Task deleted successfully")))
}

/// Assign an existing task
///
/// ```text
/// POST /tasks/:id/assign
/// { "user_emails": ["bob@example.com", "nobody@example.com"] }
/// ```
pub async fn assign_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<AssignRequest>,
) -> ApiResult<Json<AssignmentResult>> {
    let result = state.tasks.assign(task_id, user.id, &req.user_emails).await?;
    Ok(Json(result))
}

pub async fn assigned_to(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<AssignedTask>>> {
    Ok(Json(state.tasks.list_assigned_to(user_id).await?))
}

pub async fn assigned_by(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<CreatedTask>>> {
    Ok(Json(state.tasks.list_created_by(user_id).await?))
}
