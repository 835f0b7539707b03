use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use edulane_core::{
  Lesson, Module,
  catalog::{LessonInput, ModuleInput},
};
use edulane_shared::AppError;
use uuid::Uuid;

use super::Reorder;
use crate::utils::{AppState, Auth, commit_with_media};

/// Append a lesson to a course
#[utoipa::path(
  post,
  path = "/api/v1/courses/{id}/lessons",
  tag = "lessons",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Course id")),
  request_body = LessonInput,
  responses(
    (status = 201, description = "Lesson created", body = Lesson),
    (status = 403, description = "Not the course owner")
  )
)]
#[axum::debug_handler]
pub async fn create_lesson(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(course_id): Path<Uuid>,
  Json(payload): Json<LessonInput>,
) -> Result<(StatusCode, Json<Lesson>), AppError> {
  let txn = state.begin(&actor).await?;
  let lesson = Lesson::create(&actor, course_id, payload, &txn).await?;
  txn.commit().await?;
  Ok((StatusCode::CREATED, Json(lesson)))
}

/// Reorder all lessons of a course
#[utoipa::path(
  put,
  path = "/api/v1/courses/{id}/lessons/order",
  tag = "lessons",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Course id")),
  request_body = Reorder,
  responses(
    (status = 200, description = "Lessons in their new order", body = Vec<Lesson>),
    (status = 400, description = "Ids are not exactly the course's lessons")
  )
)]
#[axum::debug_handler]
pub async fn reorder_lessons(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(course_id): Path<Uuid>,
  Json(payload): Json<Reorder>,
) -> Result<Json<Vec<Lesson>>, AppError> {
  let txn = state.begin(&actor).await?;
  let lessons = Lesson::reorder(&actor, course_id, &payload.ids, &txn).await?;
  txn.commit().await?;
  Ok(Json(lessons))
}

#[utoipa::path(
  put,
  path = "/api/v1/lessons/{id}",
  tag = "lessons",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Lesson id")),
  request_body = LessonInput,
  responses(
    (status = 200, description = "Lesson updated", body = Lesson),
    (status = 404, description = "Lesson not found")
  )
)]
#[axum::debug_handler]
pub async fn update_lesson(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
  Json(payload): Json<LessonInput>,
) -> Result<Json<Lesson>, AppError> {
  let txn = state.begin(&actor).await?;
  let lesson = Lesson::update(&actor, id, payload, &txn).await?;
  txn.commit().await?;
  Ok(Json(lesson))
}

/// Delete a lesson and everything in it
#[utoipa::path(
  delete,
  path = "/api/v1/lessons/{id}",
  tag = "lessons",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Lesson id")),
  responses(
    (status = 204, description = "Lesson deleted"),
    (status = 404, description = "Lesson not found")
  )
)]
#[axum::debug_handler]
pub async fn delete_lesson(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
  let txn = state.begin(&actor).await?;
  let mut plan = state.media_plan(&actor);
  let res = Lesson::delete(&actor, id, &txn)
    .await
    .map(|keys| plan.supersede(keys));
  commit_with_media(&state, txn, plan, res).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// Append a module to a lesson
#[utoipa::path(
  post,
  path = "/api/v1/lessons/{id}/modules",
  tag = "lessons",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Lesson id")),
  request_body = ModuleInput,
  responses(
    (status = 201, description = "Module created", body = Module),
    (status = 403, description = "Not the course owner")
  )
)]
#[axum::debug_handler]
pub async fn create_module(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(lesson_id): Path<Uuid>,
  Json(payload): Json<ModuleInput>,
) -> Result<(StatusCode, Json<Module>), AppError> {
  let txn = state.begin(&actor).await?;
  let module = Module::create(&actor, lesson_id, payload, &txn).await?;
  txn.commit().await?;
  Ok((StatusCode::CREATED, Json(module)))
}

/// Reorder all modules of a lesson
#[utoipa::path(
  put,
  path = "/api/v1/lessons/{id}/modules/order",
  tag = "lessons",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Lesson id")),
  request_body = Reorder,
  responses(
    (status = 200, description = "Modules in their new order", body = Vec<Module>),
    (status = 400, description = "Ids are not exactly the lesson's modules")
  )
)]
#[axum::debug_handler]
pub async fn reorder_modules(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(lesson_id): Path<Uuid>,
  Json(payload): Json<Reorder>,
) -> Result<Json<Vec<Module>>, AppError> {
  let txn = state.begin(&actor).await?;
  let modules = Module::reorder(&actor, lesson_id, &payload.ids, &txn).await?;
  txn.commit().await?;
  Ok(Json(modules))
}
