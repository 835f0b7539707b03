use std::time::Duration;

use apalis::{
  layers::WorkerBuilderExt,
  prelude::{Monitor, WorkerBuilder},
};
use apalis_postgres::PostgresStorage;
use chrono::Utc;
use edulane_core::{MediaStore, Session};
use edulane_shared::{APP_ENV, AppError};
use sea_orm::DatabaseConnection;

pub mod jobs;
pub use jobs::MediaCleanupJob;
use jobs::process_media_cleanup;

/// How often expired temp uploads and sessions are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// Temp uploads removed per sweep.
const SWEEP_BATCH: u64 = 500;

pub async fn worker(
  db: &DatabaseConnection,
  store: MediaStore,
  backend: PostgresStorage<MediaCleanupJob>,
) -> Result<(), AppError> {
  let db = db.clone();

  let sweeper = tokio::spawn(sweep_forever(db.clone(), store.clone()));

  let res = Monitor::new()
    .register(move |_run_id| {
      WorkerBuilder::new("media-cleanup")
        .backend(backend.clone())
        .enable_tracing()
        .data(db.clone())
        .data(store.clone())
        .build(process_media_cleanup)
    })
    .shutdown_timeout(Duration::from_secs(5))
    .run_with_signal(tokio::signal::ctrl_c())
    .await
    .map_err(|err| AppError::new(anyhow::Error::new(err)));

  sweeper.abort();
  res
}

async fn sweep_forever(db: DatabaseConnection, store: MediaStore) {
  let mut interval = tokio::time::interval(SWEEP_INTERVAL);
  loop {
    interval.tick().await;
    if let Err(err) = sweep_once(&db, &store).await {
      tracing::warn!(error = %err, "sweep failed");
    }
  }
}

async fn sweep_once(db: &DatabaseConnection, store: &MediaStore) -> Result<(), AppError> {
  let now = Utc::now();
  let cutoff = now - chrono::Duration::minutes(APP_ENV.upload_ttl_minutes);

  let uploads = store.sweep_expired(cutoff, SWEEP_BATCH, db).await?;
  let sessions = Session::purge_expired(now, db).await?;

  if uploads > 0 || sessions > 0 {
    tracing::info!(uploads, sessions, "swept expired uploads and sessions");
  }

  Ok(())
}
