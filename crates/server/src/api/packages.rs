use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use chrono::Utc;
use edulane_core::{PackageInput, Quota, Subscription, TeacherPackage, Usage};
use edulane_shared::{AppError, Role};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::utils::{AppState, Auth};

/// A teacher's plan and how much of it is used.
#[derive(Serialize, ToSchema)]
pub struct PlanOverview {
  /// `None` on the free tier
  pub subscription: Option<Subscription>,
  pub quota: Quota,
  pub usage: Usage,
}

/// Packages on sale
#[utoipa::path(
  get,
  path = "/api/v1/packages",
  tag = "packages",
  responses((status = 200, description = "Active packages, cheapest first", body = Vec<TeacherPackage>))
)]
#[axum::debug_handler]
pub async fn list_packages(
  State(state): State<AppState>,
) -> Result<Json<Vec<TeacherPackage>>, AppError> {
  Ok(Json(TeacherPackage::list(false, &state.db).await?))
}

/// All packages including retired ones (admin)
#[utoipa::path(
  get,
  path = "/api/v1/packages/all",
  tag = "packages",
  security(("bearer" = [])),
  responses(
    (status = 200, description = "Every package", body = Vec<TeacherPackage>),
    (status = 403, description = "Not an admin")
  )
)]
#[axum::debug_handler]
pub async fn list_all_packages(
  State(state): State<AppState>,
  Auth(actor): Auth,
) -> Result<Json<Vec<TeacherPackage>>, AppError> {
  actor.require_role(&[Role::Admin])?;
  Ok(Json(TeacherPackage::list(true, &state.db).await?))
}

#[utoipa::path(
  get,
  path = "/api/v1/packages/{id}",
  tag = "packages",
  params(("id" = Uuid, Path, description = "Package id")),
  responses(
    (status = 200, description = "Package", body = TeacherPackage),
    (status = 404, description = "Package not found")
  )
)]
#[axum::debug_handler]
pub async fn get_package(
  State(state): State<AppState>,
  Path(id): Path<Uuid>,
) -> Result<Json<TeacherPackage>, AppError> {
  Ok(Json(TeacherPackage::get(id, &state.db).await?))
}

/// Create a package (admin)
#[utoipa::path(
  post,
  path = "/api/v1/packages",
  tag = "packages",
  security(("bearer" = [])),
  request_body = PackageInput,
  responses(
    (status = 201, description = "Package created", body = TeacherPackage),
    (status = 400, description = "Invalid limits or price"),
    (status = 403, description = "Not an admin")
  )
)]
#[axum::debug_handler]
pub async fn create_package(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Json(payload): Json<PackageInput>,
) -> Result<(StatusCode, Json<TeacherPackage>), AppError> {
  let package = TeacherPackage::create(&actor, payload, &state.db).await?;
  Ok((StatusCode::CREATED, Json(package)))
}

/// Replace a package (admin)
#[utoipa::path(
  put,
  path = "/api/v1/packages/{id}",
  tag = "packages",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Package id")),
  request_body = PackageInput,
  responses(
    (status = 200, description = "Package updated", body = TeacherPackage),
    (status = 404, description = "Package not found")
  )
)]
#[axum::debug_handler]
pub async fn update_package(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
  Json(payload): Json<PackageInput>,
) -> Result<Json<TeacherPackage>, AppError> {
  Ok(Json(TeacherPackage::update(&actor, id, payload, &state.db).await?))
}

/// Delete a package that was never subscribed to or paid for (admin)
#[utoipa::path(
  delete,
  path = "/api/v1/packages/{id}",
  tag = "packages",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Package id")),
  responses(
    (status = 204, description = "Package deleted"),
    (status = 409, description = "Package has subscriptions or payments; deactivate it instead")
  )
)]
#[axum::debug_handler]
pub async fn delete_package(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
  // Payment rows are only visible inside the admin's scope.
  let txn = state.begin(&actor).await?;
  TeacherPackage::delete(&actor, id, &txn).await?;
  txn.commit().await?;
  Ok(StatusCode::NO_CONTENT)
}

/// The caller's subscription, quota and usage (teachers)
#[utoipa::path(
  get,
  path = "/api/v1/me/plan",
  tag = "packages",
  security(("bearer" = [])),
  responses(
    (status = 200, description = "Plan overview", body = PlanOverview),
    (status = 403, description = "Not a teacher")
  )
)]
#[axum::debug_handler]
pub async fn my_plan(
  State(state): State<AppState>,
  Auth(actor): Auth,
) -> Result<Json<PlanOverview>, AppError> {
  actor.require_role(&[Role::Teacher, Role::Admin])?;
  let now = Utc::now();

  let txn = state.begin(&actor).await?;
  let subscription = Subscription::current(actor.user_id, now, &txn).await?;
  let quota = Quota::of(actor.user_id, now, &txn).await?;
  let usage = Usage::of(actor.user_id, &txn).await?;
  txn.commit().await?;

  Ok(Json(PlanOverview {
    subscription,
    quota,
    usage,
  }))
}
