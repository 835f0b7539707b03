use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use chrono::Utc;
use edulane_core::{
  Flashcard, Review,
  flashcard::{DeckStats, DueCard, FlashcardInput},
};
use edulane_shared::AppError;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::Reorder;
use crate::utils::{AppState, Auth, commit_with_media};

const DEFAULT_DUE_LIMIT: u64 = 20;

#[derive(Deserialize, IntoParams)]
pub struct DueQuery {
  /// Cards to return (1-100, default 20)
  pub limit: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct ReviewInput {
  /// Recall quality from 0 (blackout) to 5 (perfect)
  pub quality: i32,
}

/// Add a card to a flashcard deck
#[utoipa::path(
  post,
  path = "/api/v1/modules/{id}/flashcards",
  tag = "flashcards",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Flashcard module id")),
  request_body = FlashcardInput,
  responses(
    (status = 201, description = "Card created", body = Flashcard),
    (status = 400, description = "Module is not a flashcard deck")
  )
)]
#[axum::debug_handler]
pub async fn create_flashcard(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(module_id): Path<Uuid>,
  Json(payload): Json<FlashcardInput>,
) -> Result<(StatusCode, Json<Flashcard>), AppError> {
  let txn = state.begin(&actor).await?;
  let mut plan = state.media_plan(&actor);
  let res = Flashcard::create(&actor, module_id, payload, &mut plan, &txn).await;
  let card = commit_with_media(&state, txn, plan, res).await?;
  Ok((StatusCode::CREATED, Json(card)))
}

/// Reorder all cards of a deck
#[utoipa::path(
  put,
  path = "/api/v1/modules/{id}/flashcards/order",
  tag = "flashcards",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Flashcard module id")),
  request_body = Reorder,
  responses((status = 200, description = "Cards in their new order", body = Vec<Flashcard>))
)]
#[axum::debug_handler]
pub async fn reorder_flashcards(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(module_id): Path<Uuid>,
  Json(payload): Json<Reorder>,
) -> Result<Json<Vec<Flashcard>>, AppError> {
  let txn = state.begin(&actor).await?;
  let cards = Flashcard::reorder(&actor, module_id, &payload.ids, &txn).await?;
  txn.commit().await?;
  Ok(Json(cards))
}

/// Cards due for study now, overdue first, then unseen cards
#[utoipa::path(
  get,
  path = "/api/v1/modules/{id}/flashcards/due",
  tag = "flashcards",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Flashcard module id"), DueQuery),
  responses(
    (status = 200, description = "Study queue", body = Vec<DueCard>),
    (status = 403, description = "Not enrolled")
  )
)]
#[axum::debug_handler]
pub async fn due_flashcards(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(module_id): Path<Uuid>,
  Query(query): Query<DueQuery>,
) -> Result<Json<Vec<DueCard>>, AppError> {
  let limit = query.limit.unwrap_or(DEFAULT_DUE_LIMIT);
  let txn = state.begin(&actor).await?;
  let cards = Review::due(&actor, module_id, limit, Utc::now(), &txn).await?;
  txn.commit().await?;
  Ok(Json(cards))
}

/// The caller's progress through a deck
#[utoipa::path(
  get,
  path = "/api/v1/modules/{id}/flashcards/stats",
  tag = "flashcards",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Flashcard module id")),
  responses((status = 200, description = "Deck statistics", body = DeckStats))
)]
#[axum::debug_handler]
pub async fn deck_stats(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(module_id): Path<Uuid>,
) -> Result<Json<DeckStats>, AppError> {
  let txn = state.begin(&actor).await?;
  let stats = Review::stats(&actor, module_id, Utc::now(), &txn).await?;
  txn.commit().await?;
  Ok(Json(stats))
}

#[utoipa::path(
  put,
  path = "/api/v1/flashcards/{id}",
  tag = "flashcards",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Flashcard id")),
  request_body = FlashcardInput,
  responses(
    (status = 200, description = "Card updated", body = Flashcard),
    (status = 404, description = "Card not found")
  )
)]
#[axum::debug_handler]
pub async fn update_flashcard(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
  Json(payload): Json<FlashcardInput>,
) -> Result<Json<Flashcard>, AppError> {
  let txn = state.begin(&actor).await?;
  let mut plan = state.media_plan(&actor);
  let res = Flashcard::update(&actor, id, payload, &mut plan, &txn).await;
  Ok(Json(commit_with_media(&state, txn, plan, res).await?))
}

#[utoipa::path(
  delete,
  path = "/api/v1/flashcards/{id}",
  tag = "flashcards",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Flashcard id")),
  responses(
    (status = 204, description = "Card deleted"),
    (status = 404, description = "Card not found")
  )
)]
#[axum::debug_handler]
pub async fn delete_flashcard(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
  let txn = state.begin(&actor).await?;
  let mut plan = state.media_plan(&actor);
  let res = Flashcard::delete(&actor, id, &txn)
    .await
    .map(|keys| plan.supersede(keys));
  commit_with_media(&state, txn, plan, res).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// Grade recall of a card and schedule its next review
#[utoipa::path(
  post,
  path = "/api/v1/flashcards/{id}/reviews",
  tag = "flashcards",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Flashcard id")),
  request_body = ReviewInput,
  responses(
    (status = 200, description = "New review state", body = Review),
    (status = 400, description = "Quality outside 0-5"),
    (status = 403, description = "Not enrolled")
  )
)]
#[axum::debug_handler]
pub async fn review_flashcard(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
  Json(payload): Json<ReviewInput>,
) -> Result<Json<Review>, AppError> {
  let txn = state.begin(&actor).await?;
  let review = Review::submit(
    &actor,
    id,
    payload.quality,
    state.scheduler,
    Utc::now(),
    &txn,
  )
  .await?;
  txn.commit().await?;
  Ok(Json(review))
}
