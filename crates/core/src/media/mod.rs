//! Object storage for uploaded media.
//!
//! The bucket is a directory laid out like an S3 bucket: uploads land under `tmp/` and
//! are moved under an entity prefix when the owning record is saved. Every object has a
//! `media_object` row so commits can be checked against the uploader and stale temp
//! uploads can be swept.

mod plan;
pub use plan::{MediaField, MediaPlan};

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use edulane_entities::media_object;
use edulane_shared::AppError;
use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
  QuerySelect, Set, prelude::Expr,
};
use serde::Serialize;
use strum::{AsRefStr, Display};
use tokio::fs;
use utoipa::ToSchema;
use uuid::Uuid;

const TEMP_PREFIX: &str = "tmp";

/// Largest accepted upload, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Where a committed object lives inside the bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum MediaPrefix {
  Avatars,
  Courses,
  Lectures,
  Flashcards,
  Questions,
  Essays,
  Pronunciation,
}

impl MediaPrefix {
  pub const ALL: [Self; 7] = [
    Self::Avatars,
    Self::Courses,
    Self::Lectures,
    Self::Flashcards,
    Self::Questions,
    Self::Essays,
    Self::Pronunciation,
  ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
enum MediaStatus {
  Temp,
  Committed,
}

#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct StagedMedia {
  /// Temp key to reference from a create/update request
  pub key: String,
  pub content_type: String,
  pub size_bytes: u64,
}

/// File extension for an accepted content type.
fn extension_for(content_type: &str) -> Option<&'static str> {
  let ext = match content_type {
    "image/png" => "png",
    "image/jpeg" => "jpg",
    "image/webp" => "webp",
    "image/gif" => "gif",
    "audio/mpeg" => "mp3",
    "audio/wav" | "audio/x-wav" => "wav",
    "audio/webm" => "weba",
    "audio/ogg" => "ogg",
    "video/mp4" => "mp4",
    "video/webm" => "webm",
    "application/pdf" => "pdf",
    _ => return None,
  };
  Some(ext)
}

/// Keys are `<prefix>/<name>` with a single lower-case segment on each side.
pub fn validate_key(key: &str) -> Result<(), AppError> {
  let valid_segment = |s: &str| {
    !s.is_empty()
      && !s.starts_with('.')
      && s
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
  };

  match key.split_once('/') {
    Some((prefix, name)) if valid_segment(prefix) && valid_segment(name) && !name.contains('/') => {
      Ok(())
    }
    _ => Err(AppError::bad_request(format!("invalid media key '{key}'"))),
  }
}

fn is_temp_key(key: &str) -> bool {
  key
    .split_once('/')
    .is_some_and(|(prefix, _)| prefix == TEMP_PREFIX)
}

#[derive(Debug, Clone)]
pub struct MediaStore {
  root: PathBuf,
}

impl MediaStore {
  #[must_use]
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  #[must_use]
  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Create the bucket directory and its temp area.
  pub async fn ensure_layout(&self) -> Result<(), AppError> {
    fs::create_dir_all(self.root.join(TEMP_PREFIX)).await?;
    Ok(())
  }

  fn path_of(&self, key: &str) -> Result<PathBuf, AppError> {
    validate_key(key)?;
    Ok(self.root.join(key))
  }

  /// Store an upload under a fresh temp key.
  pub async fn stage(
    &self,
    owner_id: Uuid,
    bytes: &[u8],
    content_type: &str,
    db: &impl ConnectionTrait,
  ) -> Result<StagedMedia, AppError> {
    let Some(ext) = extension_for(content_type) else {
      return Err(AppError::bad_request(format!(
        "unsupported media type '{content_type}'"
      )));
    };
    if bytes.is_empty() {
      return Err(AppError::bad_request("upload is empty"));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
      return Err(AppError::bad_request("upload is too large"));
    }

    let key = format!("{TEMP_PREFIX}/{}.{ext}", Uuid::now_v7());
    fs::write(self.path_of(&key)?, bytes).await?;

    media_object::ActiveModel {
      key: Set(key.clone()),
      owner_id: Set(owner_id),
      content_type: Set(content_type.to_owned()),
      size_bytes: Set(bytes.len() as i64),
      status: Set(MediaStatus::Temp.to_string()),
      created_at: Set(Utc::now().into()),
      committed_at: Set(None),
    }
    .insert(db)
    .await?;

    tracing::debug!(%owner_id, key, size = bytes.len(), "media staged");

    Ok(StagedMedia {
      key,
      content_type: content_type.to_owned(),
      size_bytes: bytes.len() as u64,
    })
  }

  /// Move a temp upload owned by `owner_id` to its permanent key.
  pub async fn commit(
    &self,
    owner_id: Uuid,
    temp_key: &str,
    prefix: MediaPrefix,
    db: &impl ConnectionTrait,
  ) -> Result<String, AppError> {
    validate_key(temp_key)?;
    if !is_temp_key(temp_key) {
      return Err(AppError::bad_request("only temp uploads can be attached"));
    }

    let Some(object) = media_object::Entity::find_by_id(temp_key.to_owned())
      .filter(media_object::Column::Status.eq(MediaStatus::Temp.as_ref()))
      .one(db)
      .await?
    else {
      return Err(AppError::bad_request(format!(
        "upload '{temp_key}' does not exist or has expired"
      )));
    };
    if object.owner_id != owner_id {
      return Err(AppError::forbidden("upload belongs to another user"));
    }

    let name = temp_key
      .split_once('/')
      .map_or(temp_key, |(_, name)| name);
    let key = format!("{prefix}/{name}");
    let target = self.path_of(&key)?;
    if let Some(parent) = target.parent() {
      fs::create_dir_all(parent).await?;
    }
    fs::rename(self.path_of(temp_key)?, &target).await?;

    let res = media_object::Entity::update_many()
      .col_expr(media_object::Column::Key, Expr::value(key.clone()))
      .col_expr(
        media_object::Column::Status,
        Expr::value(MediaStatus::Committed.to_string()),
      )
      .col_expr(
        media_object::Column::CommittedAt,
        Expr::value(Some(chrono::DateTime::<chrono::FixedOffset>::from(Utc::now()))),
      )
      .filter(media_object::Column::Key.eq(temp_key))
      .exec(db)
      .await;

    if let Err(err) = res {
      // Put the file back so the temp key stays usable.
      if let Err(restore) = self.uncommit(&key, temp_key).await {
        tracing::warn!(key, temp_key, error = %restore, "failed to restore temp upload");
      }
      return Err(err.into());
    }

    tracing::debug!(%owner_id, from = temp_key, to = key, "media committed");

    Ok(key)
  }

  /// Undo a commit whose database write did not go through.
  /// The registry row is restored by the transaction rollback; only the file moves.
  pub async fn uncommit(&self, key: &str, temp_key: &str) -> Result<(), AppError> {
    fs::rename(self.path_of(key)?, self.path_of(temp_key)?).await?;
    Ok(())
  }

  /// Delete an object and its registry row. Missing objects are not an error.
  pub async fn remove(&self, key: &str, db: &impl ConnectionTrait) -> Result<(), AppError> {
    match fs::remove_file(self.path_of(key)?).await {
      Ok(()) => {}
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
        tracing::debug!(key, "media already gone");
      }
      Err(err) => return Err(err.into()),
    }

    media_object::Entity::delete_by_id(key.to_owned())
      .exec(db)
      .await?;

    Ok(())
  }

  /// Remove temp uploads created before `cutoff`. Returns how many were removed.
  pub async fn sweep_expired(
    &self,
    cutoff: DateTime<Utc>,
    batch: u64,
    db: &impl ConnectionTrait,
  ) -> Result<u64, AppError> {
    let expired = media_object::Entity::find()
      .filter(media_object::Column::Status.eq(MediaStatus::Temp.as_ref()))
      .filter(media_object::Column::CreatedAt.lt(cutoff))
      .order_by_asc(media_object::Column::CreatedAt)
      .limit(batch)
      .all(db)
      .await?;

    let mut removed = 0;
    for object in expired {
      self.remove(&object.key, db).await?;
      removed += 1;
    }

    Ok(removed)
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use edulane_entities::media_object;
  use sea_orm::{DatabaseBackend, DbErr, MockDatabase};
  use uuid::Uuid;

  use super::{MediaPrefix, MediaStore, extension_for, is_temp_key, validate_key};

  #[test]
  fn accepts_well_formed_keys() {
    assert!(validate_key("tmp/0190f1c2-aaaa.png").is_ok());
    assert!(validate_key("courses/abc_def.mp4").is_ok());
  }

  #[test]
  fn rejects_traversal_and_nesting() {
    for key in ["../etc/passwd", "tmp/../x.png", "tmp/a/b.png", "tmp/", "/x.png", "TMP/x.png", "x.png"] {
      assert!(validate_key(key).is_err(), "{key} should be rejected");
    }
  }

  #[test]
  fn detects_temp_keys() {
    assert!(is_temp_key("tmp/x.png"));
    assert!(!is_temp_key("courses/x.png"));
  }

  #[test]
  fn maps_known_content_types() {
    assert_eq!(extension_for("image/jpeg"), Some("jpg"));
    assert_eq!(extension_for("audio/x-wav"), Some("wav"));
    assert_eq!(extension_for("text/html"), None);
  }

  #[tokio::test]
  async fn uncommit_moves_the_file_back() {
    let dir = tempfile::tempdir().unwrap();
    let store = MediaStore::new(dir.path());
    store.ensure_layout().await.unwrap();
    tokio::fs::create_dir_all(dir.path().join("courses")).await.unwrap();
    tokio::fs::write(dir.path().join("courses/a.png"), b"png").await.unwrap();

    store.uncommit("courses/a.png", "tmp/a.png").await.unwrap();

    assert!(!dir.path().join("courses/a.png").exists());
    assert_eq!(tokio::fs::read(dir.path().join("tmp/a.png")).await.unwrap(), b"png");
  }

  #[tokio::test]
  async fn failed_registry_update_restores_the_temp_upload() {
    let dir = tempfile::tempdir().unwrap();
    let store = MediaStore::new(dir.path());
    store.ensure_layout().await.unwrap();
    tokio::fs::write(dir.path().join("tmp/a.png"), b"png").await.unwrap();

    let owner_id = Uuid::now_v7();
    let row = media_object::Model {
      key: "tmp/a.png".to_owned(),
      owner_id,
      content_type: "image/png".to_owned(),
      size_bytes: 3,
      status: "temp".to_owned(),
      created_at: Utc::now().into(),
      committed_at: None,
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
      .append_query_results([vec![row]])
      .append_exec_errors([DbErr::Custom("connection reset".to_owned())])
      .into_connection();

    let result = store
      .commit(owner_id, "tmp/a.png", MediaPrefix::Courses, &db)
      .await;

    assert!(result.is_err());
    assert!(dir.path().join("tmp/a.png").exists());
    assert!(!dir.path().join("courses/a.png").exists());
  }
}
