use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use chrono::Utc;
use edulane_core::{
  Lecture, Module, ModuleContent, Progress,
  catalog::{LectureInput, ModuleUpdate},
  enrollment::CourseProgress,
};
use edulane_shared::AppError;
use uuid::Uuid;

use crate::utils::{AppState, Auth, commit_with_media};

/// Open a module: lecture, deck or assessment
#[utoipa::path(
  get,
  path = "/api/v1/modules/{id}",
  tag = "modules",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Module id")),
  responses(
    (status = 200, description = "Module content; answers only for course managers", body = ModuleContent),
    (status = 403, description = "Not enrolled"),
    (status = 404, description = "Module not found")
  )
)]
#[axum::debug_handler]
pub async fn module_content(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<ModuleContent>, AppError> {
  let txn = state.begin(&actor).await?;
  let content = Module::content(&actor, id, &txn).await?;
  txn.commit().await?;
  Ok(Json(content))
}

#[utoipa::path(
  patch,
  path = "/api/v1/modules/{id}",
  tag = "modules",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Module id")),
  request_body = ModuleUpdate,
  responses(
    (status = 200, description = "Module renamed", body = Module),
    (status = 403, description = "Not the course owner")
  )
)]
#[axum::debug_handler]
pub async fn update_module(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
  Json(payload): Json<ModuleUpdate>,
) -> Result<Json<Module>, AppError> {
  let txn = state.begin(&actor).await?;
  let module = Module::update(&actor, id, payload, &txn).await?;
  txn.commit().await?;
  Ok(Json(module))
}

/// Delete a module and its content
#[utoipa::path(
  delete,
  path = "/api/v1/modules/{id}",
  tag = "modules",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Module id")),
  responses(
    (status = 204, description = "Module deleted"),
    (status = 403, description = "Not the course owner")
  )
)]
#[axum::debug_handler]
pub async fn delete_module(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
  let txn = state.begin(&actor).await?;
  let mut plan = state.media_plan(&actor);
  let res = Module::delete(&actor, id, &txn)
    .await
    .map(|keys| plan.supersede(keys));
  commit_with_media(&state, txn, plan, res).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// Mark a module as completed by the caller
#[utoipa::path(
  post,
  path = "/api/v1/modules/{id}/completion",
  tag = "modules",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Module id")),
  responses(
    (status = 200, description = "Updated course progress", body = CourseProgress),
    (status = 403, description = "Not enrolled")
  )
)]
#[axum::debug_handler]
pub async fn complete_module(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<CourseProgress>, AppError> {
  let txn = state.begin(&actor).await?;
  let progress = Progress::complete(&actor, id, Utc::now(), &txn).await?;
  txn.commit().await?;
  Ok(Json(progress))
}

/// Create or replace the lecture of a lecture module
#[utoipa::path(
  put,
  path = "/api/v1/modules/{id}/lecture",
  tag = "modules",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Module id")),
  request_body = LectureInput,
  responses(
    (status = 200, description = "Lecture saved", body = Lecture),
    (status = 400, description = "Module is not a lecture module"),
    (status = 403, description = "Not the course owner")
  )
)]
#[axum::debug_handler]
pub async fn upsert_lecture(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
  Json(payload): Json<LectureInput>,
) -> Result<Json<Lecture>, AppError> {
  let txn = state.begin(&actor).await?;
  let mut plan = state.media_plan(&actor);
  let res = Lecture::upsert(&actor, id, payload, &mut plan, &txn).await;
  Ok(Json(commit_with_media(&state, txn, plan, res).await?))
}
