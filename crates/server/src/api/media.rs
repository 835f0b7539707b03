use axum::{
  Json,
  extract::{Multipart, State, multipart::MultipartError},
  http::StatusCode,
};
use edulane_core::media::StagedMedia;
use edulane_shared::AppError;
use utoipa::ToSchema;

use crate::utils::{AppState, Auth};

const FILE_FIELD: &str = "file";

#[derive(ToSchema)]
pub struct UploadForm {
  /// Image, audio, video or PDF
  #[schema(value_type = String, format = Binary)]
  pub file: Vec<u8>,
}

fn multipart_error(err: MultipartError) -> AppError {
  AppError::with_status(err.status(), anyhow::anyhow!(err.body_text()))
}

/// Upload a file to the temp area; reference its key from a create or update request
#[utoipa::path(
  post,
  path = "/api/v1/media",
  tag = "media",
  security(("bearer" = [])),
  request_body(content = UploadForm, content_type = "multipart/form-data"),
  responses(
    (status = 201, description = "Upload staged", body = StagedMedia),
    (status = 400, description = "Missing file, unsupported type or too large"),
    (status = 413, description = "Request body too large")
  )
)]
#[axum::debug_handler]
pub async fn upload(
  State(state): State<AppState>,
  Auth(actor): Auth,
  mut multipart: Multipart,
) -> Result<(StatusCode, Json<StagedMedia>), AppError> {
  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(multipart_error)?
  {
    if field.name() != Some(FILE_FIELD) {
      continue;
    }
    let content_type = field
      .content_type()
      .map(str::to_owned)
      .ok_or_else(|| AppError::bad_request("upload has no content type"))?;
    let bytes = field.bytes().await.map_err(multipart_error)?;

    let staged = state
      .media
      .stage(actor.user_id, &bytes, &content_type, &state.db)
      .await?;
    return Ok((StatusCode::CREATED, Json(staged)));
  }

  Err(AppError::bad_request(format!(
    "multipart field '{FILE_FIELD}' is required"
  )))
}
