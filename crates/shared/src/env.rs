use std::env;
use std::sync::LazyLock;

pub struct AppEnv {
  pub database_url: String,
  pub listen_addr: String,
  pub media_root: String,
  pub session_ttl_hours: i64,
  pub upload_ttl_minutes: i64,
  pub payment_webhook_secret: String,
  pub review_scheduler: String,
  /// Empty means any origin.
  pub cors_origins: Vec<String>,
  /// Account made admin at boot, together with `admin_password`
  pub admin_email: Option<String>,
  pub admin_password: Option<String>,
}

fn var_or(key: &str, default: &str) -> String {
  env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
  env::var(key)
    .ok()
    .and_then(|v| v.parse().ok())
    .unwrap_or(default)
}

impl AppEnv {
  fn new() -> Self {
    dotenvy::dotenv().ok();

    Self {
      database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
      listen_addr: var_or("LISTEN_ADDR", "0.0.0.0:3000"),
      media_root: var_or("MEDIA_ROOT", "./media"),
      session_ttl_hours: parsed_or("SESSION_TTL_HOURS", 72),
      upload_ttl_minutes: parsed_or("UPLOAD_TTL_MINUTES", 60),
      payment_webhook_secret: env::var("PAYMENT_WEBHOOK_SECRET")
        .expect("PAYMENT_WEBHOOK_SECRET must be set"),
      review_scheduler: var_or("REVIEW_SCHEDULER", "sm2"),
      cors_origins: var_or("CORS_ORIGINS", "")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect(),
      admin_email: env::var("ADMIN_EMAIL").ok().filter(|v| !v.trim().is_empty()),
      admin_password: env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty()),
    }
  }
}

pub static APP_ENV: LazyLock<AppEnv> = LazyLock::new(AppEnv::new);
