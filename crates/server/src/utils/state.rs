use apalis_postgres::PostgresStorage;
use edulane_core::{
  Actor, MediaPlan, MediaStore, ReviewScheduler,
  rls::{self, Scope},
};
use edulane_shared::AppError;
use edulane_worker::MediaCleanupJob;
use sea_orm::{DatabaseConnection, DatabaseTransaction};

#[derive(Clone)]
pub struct AppState {
  pub db: DatabaseConnection,
  pub media: MediaStore,
  pub cleanup_jobs: PostgresStorage<MediaCleanupJob>,
  pub scheduler: ReviewScheduler,
}

impl AppState {
  #[must_use]
  pub const fn new(
    db: DatabaseConnection,
    media: MediaStore,
    cleanup_jobs: PostgresStorage<MediaCleanupJob>,
    scheduler: ReviewScheduler,
  ) -> Self {
    Self {
      db,
      media,
      cleanup_jobs,
      scheduler,
    }
  }

  /// Transaction scoped to what `actor` may see.
  pub async fn begin(&self, actor: &Actor) -> Result<DatabaseTransaction, AppError> {
    rls::begin(&self.db, Scope::Actor(actor)).await
  }

  pub async fn begin_system(&self) -> Result<DatabaseTransaction, AppError> {
    rls::begin_system(&self.db).await
  }

  #[must_use]
  pub const fn media_plan(&self, actor: &Actor) -> MediaPlan<'_> {
    MediaPlan::new(&self.media, actor.user_id)
  }
}
