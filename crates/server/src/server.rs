use axum::{Router, http::HeaderValue};
use edulane_core::media::MediaPrefix;
use edulane_shared::{APP_ENV, AppError};
use tokio::net::TcpListener;
use tower_http::{
  cors::{Any, CorsLayer},
  services::ServeDir,
  trace::TraceLayer,
};

use crate::{
  api,
  utils::{AppState, shutdown_signal},
};

fn cors_layer(origins: &[String]) -> Result<CorsLayer, AppError> {
  let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
  if origins.is_empty() {
    return Ok(layer.allow_origin(Any));
  }

  let origins = origins
    .iter()
    .map(|origin| {
      HeaderValue::from_str(origin)
        .map_err(|_| AppError::new(anyhow::anyhow!("invalid CORS origin '{origin}'")))
    })
    .collect::<Result<Vec<_>, _>>()?;
  Ok(layer.allow_origin(origins))
}

/// Read-only access to committed objects. Temp uploads are never served.
fn media_routes(state: &AppState) -> Router<AppState> {
  MediaPrefix::ALL
    .into_iter()
    .fold(Router::new(), |router, prefix| {
      router.nest_service(
        &format!("/media/{prefix}"),
        ServeDir::new(state.media.root().join(prefix.to_string())),
      )
    })
}

pub async fn server(app_state: AppState) -> Result<(), AppError> {
  let app = Router::new()
    .merge(api::app())
    .merge(media_routes(&app_state))
    .layer(cors_layer(&APP_ENV.cors_origins)?)
    .layer(TraceLayer::new_for_http())
    .with_state(app_state);

  let listener = TcpListener::bind(&APP_ENV.listen_addr).await?;

  tracing::info!("server started at http://{}", APP_ENV.listen_addr);

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::cors_layer;

  #[test]
  fn accepts_listed_origins() {
    assert!(cors_layer(&["https://app.edulane.test".to_owned()]).is_ok());
    assert!(cors_layer(&[]).is_ok());
  }

  #[test]
  fn rejects_unparseable_origins() {
    assert!(cors_layer(&["bad\norigin".to_owned()]).is_err());
  }
}
