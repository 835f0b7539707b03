use argon2::{Argon2, PasswordVerifier};
use edulane_shared::AppError;
use password_hash::{PasswordHash, PasswordHasher, SaltString, rand_core::OsRng};
use tokio::task;

pub const MIN_PASSWORD_LEN: usize = 8;

fn hash_blocking(password: &str) -> Result<String, AppError> {
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?
    .to_string();
  Ok(hash)
}

fn verify_blocking(password: &str, hash: &str) -> Result<bool, AppError> {
  let parsed = PasswordHash::new(hash)
    .map_err(|e| anyhow::anyhow!("failed to parse password hash: {e}"))?;
  Ok(
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok(),
  )
}

/// Hash a password into a PHC string on the blocking pool.
pub async fn hash_password(password: &str) -> Result<String, AppError> {
  let password = password.to_owned();
  task::spawn_blocking(move || hash_blocking(&password)).await?
}

/// `Ok(false)` on mismatch; errors only when the stored hash is malformed.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
  let (password, hash) = (password.to_owned(), hash.to_owned());
  task::spawn_blocking(move || verify_blocking(&password, &hash)).await?
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(AppError::bad_request(format!(
      "password must be at least {MIN_PASSWORD_LEN} characters"
    )));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::{hash_password, validate_password, verify_password};

  #[tokio::test]
  async fn hash_round_trips_and_rejects_wrong_password() {
    let hash = hash_password("correct horse").await.unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("correct horse", &hash).await.unwrap());
    assert!(!verify_password("battery staple", &hash).await.unwrap());
  }

  #[tokio::test]
  async fn malformed_hash_is_an_error() {
    assert!(verify_password("anything", "not-a-phc-string").await.is_err());
  }

  #[test]
  fn short_passwords_are_rejected() {
    assert!(validate_password("short").is_err());
    assert!(validate_password("long enough").is_ok());
  }
}
