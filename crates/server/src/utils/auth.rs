use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use edulane_core::{Actor, Session};
use edulane_shared::AppError;
use uuid::Uuid;

use super::AppState;

/// Session token from `Authorization: Bearer <token>`.
#[derive(Debug, Clone, Copy)]
pub struct BearerToken(pub Uuid);

fn bearer_token(headers: &HeaderMap) -> Result<Uuid, AppError> {
  let value = headers
    .get(AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;

  let token = value
    .strip_prefix("Bearer ")
    .or_else(|| value.strip_prefix("bearer "))
    .ok_or_else(|| AppError::unauthorized("authorization must use the Bearer scheme"))?;

  Uuid::parse_str(token.trim()).map_err(|_| AppError::unauthorized("invalid session"))
}

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
  type Rejection = AppError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    bearer_token(&parts.headers).map(Self)
  }
}

/// The authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct Auth(pub Actor);

impl FromRequestParts<AppState> for Auth {
  type Rejection = AppError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers)?;
    let actor = Session::authenticate(token, &state.db).await?;
    Ok(Self(actor))
  }
}

#[cfg(test)]
mod tests {
  use axum::http::{HeaderMap, HeaderValue, StatusCode, header::AUTHORIZATION};
  use uuid::Uuid;

  use super::bearer_token;

  fn headers(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    headers
  }

  #[test]
  fn parses_bearer_tokens() {
    let token = Uuid::new_v4();
    assert_eq!(bearer_token(&headers(&format!("Bearer {token}"))).unwrap(), token);
  }

  #[test]
  fn missing_header_is_401() {
    let err = bearer_token(&HeaderMap::new()).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
  }

  #[test]
  fn other_schemes_are_rejected() {
    let err = bearer_token(&headers("Basic dXNlcjpwYXNz")).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
  }

  #[test]
  fn malformed_token_is_401() {
    let err = bearer_token(&headers("Bearer not-a-uuid")).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
  }
}
