/// Notification endpoints
///
/// - `GET /notifications` - The caller's notifications, newest first
/// - `PATCH /notifications/:id/read` - Mark one read
///
/// Marking a notification that belongs to someone else, or does not exist,
/// succeeds without changing anything.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use taskdesk_shared::models::notification::Notification;
use uuid::Uuid;

use crate::{
    app::AppState,
    error::ApiResult,
    middleware::auth::CurrentUser,
    routes::MessageResponse,
};

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(state.notifications.list_for_user(user.id).await?))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(notification_id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.notifications.mark_read(notification_id, user.id).await?;
    Ok(Json(MessageResponse::new("Notification marked as read")))
}
