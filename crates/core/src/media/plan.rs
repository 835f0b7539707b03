use std::future::Future;

use edulane_shared::AppError;
use sea_orm::ConnectionTrait;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{MediaPrefix, MediaStore};

/// What a create/update request wants done with one media slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaField {
  /// Leave the slot as it is
  #[default]
  Keep,
  /// Empty the slot; the old object is deleted once the change is saved
  Clear,
  /// Attach a temp upload; the old object is deleted once the change is saved
  Replace(String),
}

#[derive(Debug, PartialEq, Eq)]
enum Resolution<'f> {
  Unchanged(Option<String>),
  Cleared { old: Option<String> },
  Replaced { temp_key: &'f str, old: Option<String> },
}

fn resolve(field: &MediaField, current: Option<String>) -> Resolution<'_> {
  match field {
    MediaField::Keep => Resolution::Unchanged(current),
    MediaField::Clear => Resolution::Cleared { old: current },
    MediaField::Replace(temp_key) => Resolution::Replaced {
      temp_key,
      old: current,
    },
  }
}

/// Media side effects of a single request.
///
/// Temp uploads are committed before the database write. Once the write is durable the
/// caller hands [`MediaPlan::into_superseded`] to the cleanup queue; if the write fails
/// it calls [`MediaPlan::rollback`] so committed files return to their temp keys.
#[derive(Debug)]
pub struct MediaPlan<'a> {
  store: &'a MediaStore,
  owner_id: Uuid,
  // (committed key, original temp key)
  committed: Vec<(String, String)>,
  superseded: Vec<String>,
}

impl<'a> MediaPlan<'a> {
  #[must_use]
  pub const fn new(store: &'a MediaStore, owner_id: Uuid) -> Self {
    Self {
      store,
      owner_id,
      committed: Vec::new(),
      superseded: Vec::new(),
    }
  }

  /// Resolve one slot. Returns the key the record should hold after the write.
  pub async fn apply(
    &mut self,
    field: &MediaField,
    current: Option<String>,
    prefix: MediaPrefix,
    db: &impl ConnectionTrait,
  ) -> Result<Option<String>, AppError> {
    match resolve(field, current) {
      Resolution::Unchanged(current) => Ok(current),
      Resolution::Cleared { old } => {
        self.superseded.extend(old);
        Ok(None)
      }
      Resolution::Replaced { temp_key, old } => {
        let key = self
          .store
          .commit(self.owner_id, temp_key, prefix, db)
          .await?;
        self.committed.push((key.clone(), temp_key.to_owned()));
        self.superseded.extend(old);
        Ok(Some(key))
      }
    }
  }

  /// Mark objects of a deleted record for removal.
  pub fn supersede(&mut self, keys: impl IntoIterator<Item = String>) {
    self.superseded.extend(keys);
  }

  #[must_use]
  pub fn into_superseded(self) -> Vec<String> {
    self.superseded
  }

  /// Run `commit` if the request succeeded. Returns the value and the superseded keys;
  /// on any failure the committed objects are rolled back and the error returned.
  pub async fn finish<T, F, Fut, E>(
    self,
    result: Result<T, AppError>,
    commit: F,
  ) -> Result<(T, Vec<String>), AppError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Into<AppError>,
  {
    let outcome = match result {
      Ok(value) => commit().await.map(|()| value).map_err(Into::into),
      Err(err) => Err(err),
    };

    match outcome {
      Ok(value) => Ok((value, self.into_superseded())),
      Err(err) => {
        self.rollback().await;
        Err(err)
      }
    }
  }

  pub async fn rollback(self) {
    for (key, temp_key) in self.committed {
      if let Err(err) = self.store.uncommit(&key, &temp_key).await {
        tracing::warn!(key, temp_key, error = %err, "failed to roll back media commit");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use edulane_shared::AppError;
  use uuid::Uuid;

  use super::{MediaField, MediaPlan, Resolution, resolve};
  use crate::media::MediaStore;

  async fn store_with_committed(dir: &std::path::Path) -> MediaStore {
    let store = MediaStore::new(dir);
    store.ensure_layout().await.unwrap();
    tokio::fs::create_dir_all(dir.join("courses")).await.unwrap();
    tokio::fs::write(dir.join("courses/a.png"), b"png").await.unwrap();
    store
  }

  fn plan(store: &MediaStore) -> MediaPlan<'_> {
    let mut plan = MediaPlan::new(store, Uuid::now_v7());
    plan
      .committed
      .push(("courses/a.png".to_owned(), "tmp/a.png".to_owned()));
    plan.supersede(["courses/old.png".to_owned()]);
    plan
  }

  #[tokio::test]
  async fn successful_write_hands_back_superseded_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_committed(dir.path()).await;

    let (value, superseded) = plan(&store)
      .finish(Ok(7), || async { Ok::<(), AppError>(()) })
      .await
      .unwrap();

    assert_eq!(value, 7);
    assert_eq!(superseded, vec!["courses/old.png".to_owned()]);
    assert!(dir.path().join("courses/a.png").exists());
  }

  #[tokio::test]
  async fn failed_write_moves_objects_back_to_temp() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_committed(dir.path()).await;

    let err = plan(&store)
      .finish(Err::<(), _>(AppError::conflict("taken")), || async {
        Ok::<(), AppError>(())
      })
      .await
      .unwrap_err();

    assert_eq!(err.status_code().as_u16(), 409);
    assert!(dir.path().join("tmp/a.png").exists());
    assert!(!dir.path().join("courses/a.png").exists());
  }

  #[tokio::test]
  async fn failed_commit_also_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_committed(dir.path()).await;
    let mut committed = false;
    let flag = &mut committed;

    let result = plan(&store)
      .finish(Ok(()), move || async move {
        *flag = true;
        Err(std::io::Error::other("connection reset"))
      })
      .await;

    assert!(committed);
    assert_eq!(result.unwrap_err().status_code().as_u16(), 500);
    assert!(dir.path().join("tmp/a.png").exists());
  }

  #[tokio::test]
  async fn commit_is_skipped_when_the_request_failed() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_committed(dir.path()).await;
    let mut committed = false;
    let flag = &mut committed;

    let result = plan(&store)
      .finish(Err::<(), _>(AppError::bad_request("bad")), move || async move {
        *flag = true;
        Ok::<(), AppError>(())
      })
      .await;

    assert!(result.is_err());

    assert!(!committed);
  }

  #[test]
  fn deserializes_all_shapes() {
    let keep: MediaField = serde_json::from_str(r#""keep""#).unwrap();
    let clear: MediaField = serde_json::from_str(r#""clear""#).unwrap();
    let replace: MediaField = serde_json::from_str(r#"{"replace":"tmp/a.png"}"#).unwrap();

    assert_eq!(keep, MediaField::Keep);
    assert_eq!(clear, MediaField::Clear);
    assert_eq!(replace, MediaField::Replace("tmp/a.png".to_owned()));
  }

  #[test]
  fn keep_leaves_current_key() {
    let current = Some("courses/a.png".to_owned());
    assert_eq!(
      resolve(&MediaField::Keep, current.clone()),
      Resolution::Unchanged(current)
    );
  }

  #[test]
  fn replace_supersedes_previous_key() {
    let field = MediaField::Replace("tmp/b.png".to_owned());
    assert_eq!(
      resolve(&field, Some("courses/a.png".to_owned())),
      Resolution::Replaced {
        temp_key: "tmp/b.png",
        old: Some("courses/a.png".to_owned()),
      }
    );
  }

  #[test]
  fn clear_on_empty_slot_supersedes_nothing() {
    assert_eq!(
      resolve(&MediaField::Clear, None),
      Resolution::Cleared { old: None }
    );
  }
}
