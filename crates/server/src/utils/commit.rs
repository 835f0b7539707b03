use apalis::prelude::TaskSink;
use edulane_core::MediaPlan;
use edulane_shared::AppError;
use edulane_worker::MediaCleanupJob;
use sea_orm::DatabaseTransaction;

use super::AppState;

/// Queue superseded objects for deletion. The database write is already durable, so a
/// failed push only leaves orphans behind and is logged instead of failing the request.
pub async fn enqueue_cleanup(state: &AppState, keys: Vec<String>) {
  let Some(job) = MediaCleanupJob::for_keys(keys) else {
    return;
  };
  let count = job.keys.len();
  let mut storage = state.cleanup_jobs.clone();
  if let Err(err) = storage.push(job).await {
    tracing::warn!(keys = count, error = %err, "failed to enqueue media cleanup");
  }
}

/// Finish a request that touched media: commit the transaction, then queue superseded
/// objects; on any failure move the objects committed by `plan` back to their temp keys.
pub async fn commit_with_media<T>(
  state: &AppState,
  txn: DatabaseTransaction,
  plan: MediaPlan<'_>,
  result: Result<T, AppError>,
) -> Result<T, AppError> {
  let (value, superseded) = plan.finish(result, move || txn.commit()).await?;
  enqueue_cleanup(state, superseded).await;
  Ok(value)
}
