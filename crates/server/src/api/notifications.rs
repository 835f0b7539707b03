use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use edulane_core::Notification;
use edulane_shared::{AppError, Page, PageQuery};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::utils::{AppState, Auth};

#[derive(Deserialize, IntoParams)]
pub struct NotificationFilter {
  #[serde(default)]
  pub unread_only: bool,
}

#[derive(Serialize, ToSchema)]
pub struct Count {
  pub count: u64,
}

#[utoipa::path(
  get,
  path = "/api/v1/notifications",
  tag = "notifications",
  security(("bearer" = [])),
  params(NotificationFilter, PageQuery),
  responses((status = 200, description = "Notifications, newest first", body = Page<Notification>))
)]
#[axum::debug_handler]
pub async fn list_notifications(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Query(filter): Query<NotificationFilter>,
  Query(page): Query<PageQuery>,
) -> Result<Json<Page<Notification>>, AppError> {
  let txn = state.begin(&actor).await?;
  let notifications = Notification::list(&actor, filter.unread_only, &page, &txn).await?;
  txn.commit().await?;
  Ok(Json(notifications))
}

#[utoipa::path(
  get,
  path = "/api/v1/notifications/unread-count",
  tag = "notifications",
  security(("bearer" = [])),
  responses((status = 200, description = "Unread notifications", body = Count))
)]
#[axum::debug_handler]
pub async fn unread_count(
  State(state): State<AppState>,
  Auth(actor): Auth,
) -> Result<Json<Count>, AppError> {
  let txn = state.begin(&actor).await?;
  let count = Notification::unread_count(&actor, &txn).await?;
  txn.commit().await?;
  Ok(Json(Count { count }))
}

#[utoipa::path(
  post,
  path = "/api/v1/notifications/{id}/read",
  tag = "notifications",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Notification id")),
  responses(
    (status = 204, description = "Marked as read"),
    (status = 404, description = "Notification not found")
  )
)]
#[axum::debug_handler]
pub async fn mark_read(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
  let txn = state.begin(&actor).await?;
  Notification::mark_read(&actor, id, &txn).await?;
  txn.commit().await?;
  Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
  post,
  path = "/api/v1/notifications/read-all",
  tag = "notifications",
  security(("bearer" = [])),
  responses((status = 200, description = "Number of notifications marked as read", body = Count))
)]
#[axum::debug_handler]
pub async fn mark_all_read(
  State(state): State<AppState>,
  Auth(actor): Auth,
) -> Result<Json<Count>, AppError> {
  let txn = state.begin(&actor).await?;
  let count = Notification::mark_all_read(&actor, &txn).await?;
  txn.commit().await?;
  Ok(Json(Count { count }))
}
