use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
};
use chrono::Utc;
use edulane_core::{PronunciationAttempt, pronunciation::PronunciationInput};
use edulane_shared::{AppError, Page, PageQuery};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::utils::{AppState, Auth, commit_with_media};

#[derive(Deserialize, IntoParams)]
pub struct HistoryFilter {
  /// Only attempts at this flashcard
  pub flashcard_id: Option<Uuid>,
}

/// Score a spoken attempt against its reference text
#[utoipa::path(
  post,
  path = "/api/v1/pronunciation",
  tag = "pronunciation",
  security(("bearer" = [])),
  request_body = PronunciationInput,
  responses(
    (status = 201, description = "Scored attempt", body = PronunciationAttempt),
    (status = 400, description = "No reference text, empty transcript, or a text over 500 words"),
    (status = 403, description = "Not enrolled in the flashcard's course")
  )
)]
#[axum::debug_handler]
pub async fn record_attempt(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Json(payload): Json<PronunciationInput>,
) -> Result<(StatusCode, Json<PronunciationAttempt>), AppError> {
  let txn = state.begin(&actor).await?;
  let mut plan = state.media_plan(&actor);
  let res = PronunciationAttempt::record(&actor, payload, &mut plan, Utc::now(), &txn).await;
  let attempt = commit_with_media(&state, txn, plan, res).await?;
  Ok((StatusCode::CREATED, Json(attempt)))
}

/// The caller's pronunciation attempts
#[utoipa::path(
  get,
  path = "/api/v1/me/pronunciation",
  tag = "pronunciation",
  security(("bearer" = [])),
  params(HistoryFilter, PageQuery),
  responses((status = 200, description = "Attempts, newest first", body = Page<PronunciationAttempt>))
)]
#[axum::debug_handler]
pub async fn history(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Query(filter): Query<HistoryFilter>,
  Query(page): Query<PageQuery>,
) -> Result<Json<Page<PronunciationAttempt>>, AppError> {
  let txn = state.begin(&actor).await?;
  let attempts = PronunciationAttempt::history(&actor, filter.flashcard_id, &page, &txn).await?;
  txn.commit().await?;
  Ok(Json(attempts))
}
