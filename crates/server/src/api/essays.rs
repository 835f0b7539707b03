use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use chrono::Utc;
use edulane_core::{
  EssayPrompt, EssaySubmission,
  assessment::{EssayGrade, EssayInput, EssayPromptInput},
};
use edulane_shared::AppError;
use uuid::Uuid;

use crate::utils::{AppState, Auth, commit_with_media};

/// Create or replace the essay prompt of an assessment
#[utoipa::path(
  put,
  path = "/api/v1/modules/{id}/essay",
  tag = "essays",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Assessment module id")),
  request_body = EssayPromptInput,
  responses(
    (status = 200, description = "Prompt saved", body = EssayPrompt),
    (status = 400, description = "Empty prompt or invalid word limits")
  )
)]
#[axum::debug_handler]
pub async fn upsert_prompt(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(module_id): Path<Uuid>,
  Json(payload): Json<EssayPromptInput>,
) -> Result<Json<EssayPrompt>, AppError> {
  let txn = state.begin(&actor).await?;
  let prompt = EssayPrompt::upsert(&actor, module_id, payload, &txn).await?;
  txn.commit().await?;
  Ok(Json(prompt))
}

/// Remove the essay prompt and all submissions to it
#[utoipa::path(
  delete,
  path = "/api/v1/modules/{id}/essay",
  tag = "essays",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Assessment module id")),
  responses(
    (status = 204, description = "Prompt deleted"),
    (status = 404, description = "No essay prompt")
  )
)]
#[axum::debug_handler]
pub async fn delete_prompt(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(module_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
  let txn = state.begin(&actor).await?;
  let mut plan = state.media_plan(&actor);
  let res = EssayPrompt::delete(&actor, module_id, &txn)
    .await
    .map(|keys| plan.supersede(keys));
  commit_with_media(&state, txn, plan, res).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// Submit or resubmit an essay; graded essays are final
#[utoipa::path(
  put,
  path = "/api/v1/modules/{id}/essay/submission",
  tag = "essays",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Assessment module id")),
  request_body = EssayInput,
  responses(
    (status = 200, description = "Essay submitted", body = EssaySubmission),
    (status = 400, description = "Outside the word limits"),
    (status = 409, description = "Essay already graded")
  )
)]
#[axum::debug_handler]
pub async fn submit_essay(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(module_id): Path<Uuid>,
  Json(payload): Json<EssayInput>,
) -> Result<Json<EssaySubmission>, AppError> {
  let txn = state.begin(&actor).await?;
  let mut plan = state.media_plan(&actor);
  let res = EssaySubmission::submit(&actor, module_id, payload, &mut plan, Utc::now(), &txn).await;
  Ok(Json(commit_with_media(&state, txn, plan, res).await?))
}

/// The caller's essay for a module
#[utoipa::path(
  get,
  path = "/api/v1/modules/{id}/essay/submission",
  tag = "essays",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Assessment module id")),
  responses(
    (status = 200, description = "Submission", body = EssaySubmission),
    (status = 404, description = "Nothing submitted yet")
  )
)]
#[axum::debug_handler]
pub async fn my_essay(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(module_id): Path<Uuid>,
) -> Result<Json<EssaySubmission>, AppError> {
  let txn = state.begin(&actor).await?;
  let submission = EssaySubmission::mine(&actor, module_id, &txn).await?;
  txn.commit().await?;
  submission
    .map(Json)
    .ok_or_else(|| AppError::not_found("no essay submitted"))
}

/// All essays submitted to a module (course managers)
#[utoipa::path(
  get,
  path = "/api/v1/modules/{id}/essay/submissions",
  tag = "essays",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Assessment module id")),
  responses(
    (status = 200, description = "Submissions, oldest first", body = Vec<EssaySubmission>),
    (status = 403, description = "Not the course owner")
  )
)]
#[axum::debug_handler]
pub async fn list_essays(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(module_id): Path<Uuid>,
) -> Result<Json<Vec<EssaySubmission>>, AppError> {
  let txn = state.begin(&actor).await?;
  let submissions = EssaySubmission::list(&actor, module_id, &txn).await?;
  txn.commit().await?;
  Ok(Json(submissions))
}

/// Grade an essay and notify its author
#[utoipa::path(
  put,
  path = "/api/v1/essay-submissions/{id}/grade",
  tag = "essays",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Submission id")),
  request_body = EssayGrade,
  responses(
    (status = 200, description = "Essay graded", body = EssaySubmission),
    (status = 400, description = "Score outside 0 and the maximum score"),
    (status = 403, description = "Not the course owner")
  )
)]
#[axum::debug_handler]
pub async fn grade_essay(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
  Json(payload): Json<EssayGrade>,
) -> Result<Json<EssaySubmission>, AppError> {
  let txn = state.begin(&actor).await?;
  let submission = EssaySubmission::grade(&actor, id, payload, Utc::now(), &txn).await?;
  txn.commit().await?;
  Ok(Json(submission))
}
