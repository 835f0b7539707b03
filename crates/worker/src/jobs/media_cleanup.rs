use edulane_core::MediaStore;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use super::WorkerError;

/// Objects that lost their owning record and can be deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaCleanupJob {
  pub keys: Vec<String>,
}

impl MediaCleanupJob {
  /// `None` when there is nothing to remove, so callers can skip the push.
  #[must_use]
  pub fn for_keys(keys: Vec<String>) -> Option<Self> {
    let mut keys = keys;
    keys.sort_unstable();
    keys.dedup();
    (!keys.is_empty()).then_some(Self { keys })
  }
}

pub async fn process_media_cleanup(
  job: MediaCleanupJob,
  db: apalis::prelude::Data<DatabaseConnection>,
  store: apalis::prelude::Data<MediaStore>,
) -> Result<(), WorkerError> {
  let db = &*db;
  let store = &*store;

  tracing::debug!(keys = job.keys.len(), "Processing media cleanup");

  // One failing key fails the job so apalis retries it; already-removed keys are no-ops.
  for key in &job.keys {
    store.remove(key, db).await?;
  }

  tracing::info!(keys = job.keys.len(), "Removed superseded media");

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::MediaCleanupJob;

  #[test]
  fn empty_key_list_yields_no_job() {
    assert_eq!(MediaCleanupJob::for_keys(Vec::new()), None);
  }

  #[test]
  fn duplicate_keys_are_collapsed() {
    let job = MediaCleanupJob::for_keys(vec![
      "lectures/b.mp4".to_owned(),
      "courses/a.png".to_owned(),
      "lectures/b.mp4".to_owned(),
    ])
    .unwrap();
    assert_eq!(job.keys, vec!["courses/a.png", "lectures/b.mp4"]);
  }

  #[test]
  fn job_payload_is_plain_json() {
    let job = MediaCleanupJob {
      keys: vec!["essays/x.pdf".to_owned()],
    };
    let value = serde_json::to_value(&job).unwrap();
    assert_eq!(value, serde_json::json!({ "keys": ["essays/x.pdf"] }));
  }
}
