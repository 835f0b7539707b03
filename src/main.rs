use std::str::FromStr;

use apalis_postgres::PostgresStorage;
use edulane_core::{MediaStore, ReviewScheduler, User};
use edulane_migration::{Migrator, MigratorTrait};
use edulane_server::{AppState, server};
use edulane_shared::{APP_ENV, AppError};
use edulane_worker::worker;
use sea_orm::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
          format!(
            "{}=debug,edulane_core=debug,edulane_server=debug,edulane_worker=debug,tower_http=info",
            env!("CARGO_CRATE_NAME")
          )
          .into()
        }),
    )
    .with(tracing_subscriber::fmt::layer())
    .with(tracing_error::ErrorLayer::default())
    .init();

  let db = Database::connect(APP_ENV.database_url.as_str()).await?;

  // Apply all pending migrations
  // https://www.sea-ql.org/SeaORM/docs/migration/running-migration/#migrating-programmatically
  Migrator::up(&db, None).await?;
  PostgresStorage::setup(&db.get_postgres_connection_pool()).await?;

  match (&APP_ENV.admin_email, &APP_ENV.admin_password) {
    (Some(email), Some(password)) => {
      let admin = User::seed_admin(email, password, &db).await?;
      tracing::info!(user_id = %admin.id, email = %admin.email, "admin account ready");
    }
    (Some(_), None) | (None, Some(_)) => {
      tracing::warn!("ADMIN_EMAIL and ADMIN_PASSWORD must be set together; no admin seeded");
    }
    (None, None) => {}
  }

  let media = MediaStore::new(&APP_ENV.media_root);
  media.ensure_layout().await?;

  let scheduler = ReviewScheduler::from_str(&APP_ENV.review_scheduler).map_err(|_| {
    AppError::new(anyhow::anyhow!(
      "unknown REVIEW_SCHEDULER '{}', expected sm2 or fsrs",
      APP_ENV.review_scheduler
    ))
  })?;
  tracing::info!(%scheduler, "flashcard scheduler selected");

  let cleanup_jobs = PostgresStorage::new(db.get_postgres_connection_pool());
  let app_state = AppState::new(db.clone(), media.clone(), cleanup_jobs.clone(), scheduler);

  tokio::try_join!(worker(&db, media, cleanup_jobs), server(app_state))?;

  Ok(())
}
