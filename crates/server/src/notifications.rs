//! Notifications API endpoints

use api_types::notification::{
    NotificationKind as ApiKind, NotificationListParams, NotificationView, UnreadCount,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

const DEFAULT_LIST_LIMIT: u64 = 50;

fn map_kind(kind: engine::NotificationKind) -> ApiKind {
    match kind {
        engine::NotificationKind::BudgetAlert => ApiKind::BudgetAlert,
        engine::NotificationKind::BudgetWarning => ApiKind::BudgetWarning,
        engine::NotificationKind::BudgetExceeded => ApiKind::BudgetExceeded,
    }
}

fn view(note: engine::Notification) -> NotificationView {
    NotificationView {
        id: note.id,
        kind: map_kind(note.kind),
        title: note.title,
        message: note.message,
        payload: note.payload,
        read: note.read,
        created_at: note.created_at.fixed_offset(),
    }
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(params): Query<NotificationListParams>,
) -> Result<Json<Vec<NotificationView>>, ServerError> {
    let notes = state
        .engine
        .list_notifications(
            &user.username,
            params.unread_only.unwrap_or(false),
            params.limit.unwrap_or(DEFAULT_LIST_LIMIT),
        )
        .await?;

    Ok(Json(notes.into_iter().map(view).collect()))
}

pub async fn unread_count(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<UnreadCount>, ServerError> {
    let count = state.engine.unread_count(&user.username).await?;
    Ok(Json(UnreadCount { count }))
}

pub async fn mark_read(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<NotificationView>, ServerError> {
    let note = state
        .engine
        .mark_notification_read(id, &user.username)
        .await?;
    Ok(Json(view(note)))
}

pub async fn mark_all_read(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .mark_all_notifications_read(&user.username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
