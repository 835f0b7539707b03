use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use chrono::{Duration, Utc};
use edulane_core::{ProfileUpdate, Registration, Session, Streak, User};
use edulane_shared::{APP_ENV, AppError, Page, PageQuery, Role};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::utils::{AppState, Auth, BearerToken, commit_with_media};

#[derive(Deserialize, ToSchema)]
pub struct Login {
  pub email: String,
  pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RoleChange {
  pub role: Role,
}

#[derive(Deserialize, IntoParams)]
pub struct UserFilter {
  /// Only users with this role
  pub role: Option<Role>,
}

/// Create an account
#[utoipa::path(
  post,
  path = "/api/v1/auth/register",
  tag = "accounts",
  request_body = Registration,
  responses(
    (status = 201, description = "Account created", body = User),
    (status = 400, description = "Invalid email, password or display name"),
    (status = 403, description = "Role cannot be self-assigned"),
    (status = 409, description = "Email already registered")
  )
)]
#[axum::debug_handler]
pub async fn register(
  State(state): State<AppState>,
  Json(payload): Json<Registration>,
) -> Result<(StatusCode, Json<User>), AppError> {
  let user = User::register(payload, &state.db).await?;
  Ok((StatusCode::CREATED, Json(user)))
}

/// Exchange credentials for a session token
#[utoipa::path(
  post,
  path = "/api/v1/auth/login",
  tag = "accounts",
  request_body = Login,
  responses(
    (status = 200, description = "Session created", body = Session),
    (status = 401, description = "Invalid email or password")
  )
)]
#[axum::debug_handler]
pub async fn login(
  State(state): State<AppState>,
  Json(payload): Json<Login>,
) -> Result<Json<Session>, AppError> {
  let ttl = Duration::hours(APP_ENV.session_ttl_hours);
  let session = Session::login(&payload.email, &payload.password, ttl, &state.db).await?;
  Ok(Json(session))
}

/// End the current session
#[utoipa::path(
  post,
  path = "/api/v1/auth/logout",
  tag = "accounts",
  security(("bearer" = [])),
  responses((status = 204, description = "Session ended"))
)]
#[axum::debug_handler]
pub async fn logout(
  State(state): State<AppState>,
  BearerToken(token): BearerToken,
) -> Result<StatusCode, AppError> {
  Session::logout(token, &state.db).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// The signed-in user
#[utoipa::path(
  get,
  path = "/api/v1/me",
  tag = "accounts",
  security(("bearer" = [])),
  responses((status = 200, description = "Current user", body = User))
)]
#[axum::debug_handler]
pub async fn me(State(state): State<AppState>, Auth(actor): Auth) -> Result<Json<User>, AppError> {
  Ok(Json(User::get(actor.user_id, &state.db).await?))
}

/// Update display name or avatar
#[utoipa::path(
  patch,
  path = "/api/v1/me",
  tag = "accounts",
  security(("bearer" = [])),
  request_body = ProfileUpdate,
  responses(
    (status = 200, description = "Profile updated", body = User),
    (status = 400, description = "Invalid display name or upload")
  )
)]
#[axum::debug_handler]
pub async fn update_profile(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Json(payload): Json<ProfileUpdate>,
) -> Result<Json<User>, AppError> {
  let txn = state.begin(&actor).await?;
  let mut plan = state.media_plan(&actor);
  let res = User::update_profile(&actor, payload, &mut plan, &txn).await;
  Ok(Json(commit_with_media(&state, txn, plan, res).await?))
}

/// Current and longest daily activity streak
#[utoipa::path(
  get,
  path = "/api/v1/me/streak",
  tag = "accounts",
  security(("bearer" = [])),
  responses((status = 200, description = "Activity streak", body = Streak))
)]
#[axum::debug_handler]
pub async fn streak(
  State(state): State<AppState>,
  Auth(actor): Auth,
) -> Result<Json<Streak>, AppError> {
  let txn = state.begin(&actor).await?;
  let streak = Streak::get(actor.user_id, Utc::now(), &txn).await?;
  txn.commit().await?;
  Ok(Json(streak))
}

/// List users (admin)
#[utoipa::path(
  get,
  path = "/api/v1/users",
  tag = "accounts",
  security(("bearer" = [])),
  params(UserFilter, PageQuery),
  responses(
    (status = 200, description = "Users", body = Page<User>),
    (status = 403, description = "Not an admin")
  )
)]
#[axum::debug_handler]
pub async fn list_users(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Query(filter): Query<UserFilter>,
  Query(page): Query<PageQuery>,
) -> Result<Json<Page<User>>, AppError> {
  Ok(Json(User::list(&actor, filter.role, &page, &state.db).await?))
}

/// Change a user's role (admin)
#[utoipa::path(
  put,
  path = "/api/v1/users/{id}/role",
  tag = "accounts",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "User id")),
  request_body = RoleChange,
  responses(
    (status = 200, description = "Role changed", body = User),
    (status = 400, description = "Admins cannot demote themselves"),
    (status = 403, description = "Not an admin"),
    (status = 404, description = "User not found")
  )
)]
#[axum::debug_handler]
pub async fn set_role(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
  Json(payload): Json<RoleChange>,
) -> Result<Json<User>, AppError> {
  Ok(Json(User::set_role(&actor, id, payload.role, &state.db).await?))
}
