use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use edulane_core::{
  Payment,
  payment::{CheckoutTarget, PaymentOutcome},
};
use edulane_shared::{APP_ENV, AppError, Page, PageQuery};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::utils::{AppState, Auth};

/// Header carrying the shared secret on provider callbacks.
pub const WEBHOOK_SECRET_HEADER: &str = "x-payment-secret";

#[derive(Deserialize, ToSchema)]
pub struct PaymentEvent {
  pub payment_id: Uuid,
  pub outcome: PaymentOutcome,
  /// Provider's own reference for the charge
  pub provider_ref: Option<String>,
}

/// Compares without short-circuiting on the first differing byte.
fn secrets_match(given: &[u8], expected: &[u8]) -> bool {
  given.len() == expected.len()
    && given
      .iter()
      .zip(expected)
      .fold(0u8, |acc, (a, b)| acc | (a ^ b))
      == 0
}

fn verify_webhook(headers: &HeaderMap, expected: &str) -> Result<(), AppError> {
  let given = headers
    .get(WEBHOOK_SECRET_HEADER)
    .map(|v| v.as_bytes())
    .unwrap_or_default();
  if expected.is_empty() || !secrets_match(given, expected.as_bytes()) {
    return Err(AppError::unauthorized("invalid webhook secret"));
  }
  Ok(())
}

/// Start paying for a course or a teacher package
#[utoipa::path(
  post,
  path = "/api/v1/payments/checkout",
  tag = "payments",
  security(("bearer" = [])),
  request_body = CheckoutTarget,
  responses(
    (status = 201, description = "Pending payment", body = Payment),
    (status = 400, description = "Course is free or owned by the caller, or package is retired"),
    (status = 409, description = "Already enrolled")
  )
)]
#[axum::debug_handler]
pub async fn checkout(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Json(payload): Json<CheckoutTarget>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
  let txn = state.begin(&actor).await?;
  let payment = Payment::checkout(&actor, payload, Utc::now(), &txn).await?;
  txn.commit().await?;
  Ok((StatusCode::CREATED, Json(payment)))
}

/// Provider callback settling a pending payment
#[utoipa::path(
  post,
  path = "/api/v1/payments/webhook",
  tag = "payments",
  request_body = PaymentEvent,
  params(("X-Payment-Secret" = String, Header, description = "Shared webhook secret")),
  responses(
    (status = 200, description = "Payment after applying the event", body = Payment),
    (status = 401, description = "Missing or wrong secret"),
    (status = 402, description = "Teacher's student quota is full; retried later"),
    (status = 404, description = "Payment not found")
  )
)]
#[axum::debug_handler]
pub async fn webhook(
  State(state): State<AppState>,
  headers: HeaderMap,
  Json(payload): Json<PaymentEvent>,
) -> Result<Json<Payment>, AppError> {
  verify_webhook(&headers, &APP_ENV.payment_webhook_secret)?;

  let txn = state.begin_system().await?;
  let payment = Payment::confirm(
    payload.payment_id,
    payload.outcome,
    payload.provider_ref,
    Utc::now(),
    &txn,
  )
  .await?;
  txn.commit().await?;
  Ok(Json(payment))
}

/// Refund a settled payment and withdraw what it bought (admin)
#[utoipa::path(
  post,
  path = "/api/v1/payments/{id}/refund",
  tag = "payments",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Payment id")),
  responses(
    (status = 200, description = "Refunded payment", body = Payment),
    (status = 403, description = "Not an admin"),
    (status = 409, description = "Only succeeded payments can be refunded")
  )
)]
#[axum::debug_handler]
pub async fn refund(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<Payment>, AppError> {
  let txn = state.begin(&actor).await?;
  let payment = Payment::refund(&actor, id, Utc::now(), &txn).await?;
  txn.commit().await?;
  Ok(Json(payment))
}

/// The caller's payment history
#[utoipa::path(
  get,
  path = "/api/v1/me/payments",
  tag = "payments",
  security(("bearer" = [])),
  params(PageQuery),
  responses((status = 200, description = "Payments, newest first", body = Page<Payment>))
)]
#[axum::debug_handler]
pub async fn my_payments(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Query(page): Query<PageQuery>,
) -> Result<Json<Page<Payment>>, AppError> {
  let txn = state.begin(&actor).await?;
  let payments = Payment::mine(&actor, &page, &txn).await?;
  txn.commit().await?;
  Ok(Json(payments))
}

#[cfg(test)]
mod tests {
  use axum::http::{HeaderMap, HeaderValue, StatusCode};

  use super::{WEBHOOK_SECRET_HEADER, secrets_match, verify_webhook};

  #[test]
  fn secrets_compare_by_content() {
    assert!(secrets_match(b"s3cret", b"s3cret"));
    assert!(!secrets_match(b"s3cret", b"s3creT"));
    assert!(!secrets_match(b"s3cre", b"s3cret"));
  }

  #[test]
  fn webhook_requires_the_shared_secret() {
    let mut headers = HeaderMap::new();
    assert_eq!(
      verify_webhook(&headers, "s3cret").unwrap_err().status_code(),
      StatusCode::UNAUTHORIZED
    );

    headers.insert(WEBHOOK_SECRET_HEADER, HeaderValue::from_static("s3cret"));
    assert!(verify_webhook(&headers, "s3cret").is_ok());
  }

  #[test]
  fn empty_configured_secret_rejects_everything() {
    let headers = HeaderMap::new();
    assert!(verify_webhook(&headers, "").is_err());
  }
}
