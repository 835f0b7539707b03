use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use chrono::Utc;
use edulane_core::{
  Assessment, Attempt, Question,
  assessment::{AnswerInput, AssessmentInput, QuestionInput},
};
use edulane_shared::AppError;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::Reorder;
use crate::utils::{AppState, Auth, commit_with_media};

#[derive(Deserialize, ToSchema)]
pub struct AttemptAnswers {
  pub answers: Vec<AnswerInput>,
}

/// Create or replace the settings of an assessment module
#[utoipa::path(
  put,
  path = "/api/v1/modules/{id}/assessment",
  tag = "assessments",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Assessment module id")),
  request_body = AssessmentInput,
  responses(
    (status = 200, description = "Assessment saved", body = Assessment),
    (status = 400, description = "Invalid pass mark or limits")
  )
)]
#[axum::debug_handler]
pub async fn upsert_assessment(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(module_id): Path<Uuid>,
  Json(payload): Json<AssessmentInput>,
) -> Result<Json<Assessment>, AppError> {
  let txn = state.begin(&actor).await?;
  let assessment = Assessment::upsert(&actor, module_id, payload, &txn).await?;
  txn.commit().await?;
  Ok(Json(assessment))
}

/// Append a question to an assessment
#[utoipa::path(
  post,
  path = "/api/v1/modules/{id}/questions",
  tag = "assessments",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Assessment module id")),
  request_body = QuestionInput,
  responses(
    (status = 201, description = "Question created", body = Question),
    (status = 400, description = "Options or answers do not match the question kind")
  )
)]
#[axum::debug_handler]
pub async fn create_question(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(module_id): Path<Uuid>,
  Json(payload): Json<QuestionInput>,
) -> Result<(StatusCode, Json<Question>), AppError> {
  let txn = state.begin(&actor).await?;
  let mut plan = state.media_plan(&actor);
  let res = Question::create(&actor, module_id, payload, &mut plan, &txn).await;
  let question = commit_with_media(&state, txn, plan, res).await?;
  Ok((StatusCode::CREATED, Json(question)))
}

/// Reorder all questions of an assessment
#[utoipa::path(
  put,
  path = "/api/v1/modules/{id}/questions/order",
  tag = "assessments",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Assessment module id")),
  request_body = Reorder,
  responses((status = 200, description = "Questions in their new order", body = Vec<Question>))
)]
#[axum::debug_handler]
pub async fn reorder_questions(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(module_id): Path<Uuid>,
  Json(payload): Json<Reorder>,
) -> Result<Json<Vec<Question>>, AppError> {
  let txn = state.begin(&actor).await?;
  let questions = Question::reorder(&actor, module_id, &payload.ids, &txn).await?;
  txn.commit().await?;
  Ok(Json(questions))
}

#[utoipa::path(
  put,
  path = "/api/v1/questions/{id}",
  tag = "assessments",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Question id")),
  request_body = QuestionInput,
  responses(
    (status = 200, description = "Question updated", body = Question),
    (status = 404, description = "Question not found")
  )
)]
#[axum::debug_handler]
pub async fn update_question(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
  Json(payload): Json<QuestionInput>,
) -> Result<Json<Question>, AppError> {
  let txn = state.begin(&actor).await?;
  let mut plan = state.media_plan(&actor);
  let res = Question::update(&actor, id, payload, &mut plan, &txn).await;
  Ok(Json(commit_with_media(&state, txn, plan, res).await?))
}

#[utoipa::path(
  delete,
  path = "/api/v1/questions/{id}",
  tag = "assessments",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Question id")),
  responses(
    (status = 204, description = "Question deleted"),
    (status = 404, description = "Question not found")
  )
)]
#[axum::debug_handler]
pub async fn delete_question(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
  let txn = state.begin(&actor).await?;
  let mut plan = state.media_plan(&actor);
  let res = Question::delete(&actor, id, &txn)
    .await
    .map(|keys| plan.supersede(keys));
  commit_with_media(&state, txn, plan, res).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// Start an attempt, or resume the one still running
#[utoipa::path(
  post,
  path = "/api/v1/modules/{id}/attempts",
  tag = "assessments",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Assessment module id")),
  responses(
    (status = 200, description = "Attempt in progress", body = Attempt),
    (status = 403, description = "Not enrolled"),
    (status = 409, description = "No attempts left")
  )
)]
#[axum::debug_handler]
pub async fn start_attempt(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(module_id): Path<Uuid>,
) -> Result<Json<Attempt>, AppError> {
  let txn = state.begin(&actor).await?;
  let attempt = Attempt::start(&actor, module_id, Utc::now(), &txn).await?;
  txn.commit().await?;
  Ok(Json(attempt))
}

/// The caller's attempts at an assessment
#[utoipa::path(
  get,
  path = "/api/v1/modules/{id}/attempts",
  tag = "assessments",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Assessment module id")),
  responses((status = 200, description = "Attempts, newest first", body = Vec<Attempt>))
)]
#[axum::debug_handler]
pub async fn my_attempts(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(module_id): Path<Uuid>,
) -> Result<Json<Vec<Attempt>>, AppError> {
  let txn = state.begin(&actor).await?;
  let attempts = Attempt::mine(&actor, module_id, &txn).await?;
  txn.commit().await?;
  Ok(Json(attempts))
}

/// Submit answers and grade the attempt
#[utoipa::path(
  post,
  path = "/api/v1/attempts/{id}/submission",
  tag = "assessments",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Attempt id")),
  request_body = AttemptAnswers,
  responses(
    (status = 200, description = "Graded attempt", body = Attempt),
    (status = 404, description = "Attempt not found"),
    (status = 409, description = "Attempt already submitted or past its time limit")
  )
)]
#[axum::debug_handler]
pub async fn submit_attempt(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
  Json(payload): Json<AttemptAnswers>,
) -> Result<Json<Attempt>, AppError> {
  let txn = state.begin(&actor).await?;
  let attempt = Attempt::submit(&actor, id, payload.answers, Utc::now(), &txn).await?;
  txn.commit().await?;
  Ok(Json(attempt))
}
