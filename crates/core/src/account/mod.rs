mod password;
pub use password::{hash_password, validate_password, verify_password};

use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use edulane_entities::{app_user, user_session};
use edulane_shared::{AppError, Page, PageQuery, Role};
use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
  QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
  Actor,
  media::{MediaField, MediaPlan, MediaPrefix},
};

#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct User {
  pub id: Uuid,
  pub email: String,
  pub display_name: String,
  pub role: Role,
  pub avatar_key: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct Registration {
  pub email: String,
  pub password: String,
  pub display_name: String,
  /// `learner` or `teacher`
  #[serde(default = "default_role")]
  pub role: Role,
}

const fn default_role() -> Role {
  Role::Learner
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProfileUpdate {
  pub display_name: Option<String>,
  #[serde(default)]
  pub avatar: MediaField,
}

/// Trimmed and lower-cased; must look like an address.
pub fn normalize_email(email: &str) -> Result<String, AppError> {
  let email = email.trim().to_lowercase();
  match email.split_once('@') {
    Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !email.contains(' ') => {
      Ok(email)
    }
    _ => Err(AppError::bad_request("invalid email address")),
  }
}

fn clean_display_name(name: &str) -> Result<String, AppError> {
  let name = name.trim();
  if name.is_empty() {
    return Err(AppError::bad_request("display name must not be empty"));
  }
  Ok(name.to_owned())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeedAction {
  Create,
  Promote,
  Keep,
}

/// `current` is `None` when no account has the email, `Some(None)` when its stored role
/// does not parse.
fn seed_action(current: Option<Option<Role>>) -> SeedAction {
  match current {
    None => SeedAction::Create,
    Some(Some(Role::Admin)) => SeedAction::Keep,
    Some(_) => SeedAction::Promote,
  }
}

impl User {
  pub fn from_model(model: app_user::Model) -> Result<Self, AppError> {
    Ok(Self {
      id: model.id,
      role: Role::from_str(&model.role)
        .map_err(|_| anyhow!("unknown role '{}' on user {}", model.role, model.id))?,
      email: model.email,
      display_name: model.display_name,
      avatar_key: model.avatar_key,
      created_at: model.created_at.with_timezone(&Utc),
    })
  }

  pub async fn register(input: Registration, db: &impl ConnectionTrait) -> Result<Self, AppError> {
    if !input.role.is_self_assignable() {
      return Err(AppError::forbidden(format!(
        "role '{}' cannot be chosen at registration",
        input.role
      )));
    }
    let email = normalize_email(&input.email)?;
    let display_name = clean_display_name(&input.display_name)?;
    validate_password(&input.password)?;

    let taken = app_user::Entity::find()
      .filter(app_user::Column::Email.eq(&email))
      .one(db)
      .await?
      .is_some();
    if taken {
      return Err(AppError::conflict("email is already registered"));
    }

    let now = Utc::now();
    let model = app_user::ActiveModel {
      id: Set(Uuid::now_v7()),
      email: Set(email),
      display_name: Set(display_name),
      password_hash: Set(hash_password(&input.password).await?),
      role: Set(input.role.to_string()),
      avatar_key: Set(None),
      created_at: Set(now.into()),
      updated_at: Set(now.into()),
    }
    .insert(db)
    .await?;

    tracing::info!(user_id = %model.id, role = %input.role, "user registered");

    Self::from_model(model)
  }

  /// Make sure an admin account exists for `email`.
  ///
  /// A missing account is created with `password`; an existing one is promoted and
  /// keeps its password.
  pub async fn seed_admin(
    email: &str,
    password: &str,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let email = normalize_email(email)?;
    let existing = app_user::Entity::find()
      .filter(app_user::Column::Email.eq(&email))
      .one(db)
      .await?;
    let current = existing
      .as_ref()
      .map(|model| Role::from_str(&model.role).ok());

    let now = Utc::now();
    match (seed_action(current), existing) {
      (SeedAction::Keep, Some(model)) => Self::from_model(model),
      (SeedAction::Promote, Some(model)) => {
        let mut active: app_user::ActiveModel = model.into();
        active.role = Set(Role::Admin.to_string());
        active.updated_at = Set(now.into());
        let model = active.update(db).await?;
        tracing::info!(user_id = %model.id, "existing account promoted to admin");
        Self::from_model(model)
      }
      _ => {
        validate_password(password)?;
        let model = app_user::ActiveModel {
          id: Set(Uuid::now_v7()),
          email: Set(email),
          display_name: Set("Administrator".to_owned()),
          password_hash: Set(hash_password(password).await?),
          role: Set(Role::Admin.to_string()),
          avatar_key: Set(None),
          created_at: Set(now.into()),
          updated_at: Set(now.into()),
        }
        .insert(db)
        .await?;
        tracing::info!(user_id = %model.id, "admin account created");
        Self::from_model(model)
      }
    }
  }

  pub async fn get(id: Uuid, db: &impl ConnectionTrait) -> Result<Self, AppError> {
    let model = app_user::Entity::find_by_id(id)
      .one(db)
      .await?
      .ok_or_else(|| AppError::not_found("user not found"))?;
    Self::from_model(model)
  }

  pub async fn update_profile(
    actor: &Actor,
    input: ProfileUpdate,
    media: &mut MediaPlan<'_>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let model = app_user::Entity::find_by_id(actor.user_id)
      .one(db)
      .await?
      .ok_or_else(|| AppError::not_found("user not found"))?;

    let avatar_key = media
      .apply(&input.avatar, model.avatar_key.clone(), MediaPrefix::Avatars, db)
      .await?;

    let mut active: app_user::ActiveModel = model.into();
    if let Some(name) = input.display_name {
      active.display_name = Set(clean_display_name(&name)?);
    }
    active.avatar_key = Set(avatar_key);
    active.updated_at = Set(Utc::now().into());

    Self::from_model(active.update(db).await?)
  }

  pub async fn set_role(
    actor: &Actor,
    user_id: Uuid,
    role: Role,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    actor.require_role(&[Role::Admin])?;
    if user_id == actor.user_id && role != Role::Admin {
      return Err(AppError::bad_request("admins cannot demote themselves"));
    }

    let model = app_user::Entity::find_by_id(user_id)
      .one(db)
      .await?
      .ok_or_else(|| AppError::not_found("user not found"))?;

    let mut active: app_user::ActiveModel = model.into();
    active.role = Set(role.to_string());
    active.updated_at = Set(Utc::now().into());
    let model = active.update(db).await?;

    tracing::info!(%user_id, %role, by = %actor.user_id, "role changed");

    Self::from_model(model)
  }

  pub async fn list(
    actor: &Actor,
    role: Option<Role>,
    page: &PageQuery,
    db: &impl ConnectionTrait,
  ) -> Result<Page<Self>, AppError> {
    actor.require_role(&[Role::Admin])?;

    let mut query = app_user::Entity::find();
    if let Some(role) = role {
      query = query.filter(app_user::Column::Role.eq(role.as_ref()));
    }
    let paginator = query
      .order_by_asc(app_user::Column::CreatedAt)
      .paginate(db, page.per_page());
    let total = paginator.num_items().await?;
    let items = paginator
      .fetch_page(page.index())
      .await?
      .into_iter()
      .map(Self::from_model)
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Page::new(items, total, page))
  }
}

#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct Session {
  pub token: Uuid,
  pub expires_at: DateTime<Utc>,
  pub user: User,
}

impl Session {
  pub async fn login(
    email: &str,
    password: &str,
    ttl: Duration,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let invalid = || AppError::unauthorized("invalid email or password");

    let email = normalize_email(email).map_err(|_| invalid())?;
    let Some(model) = app_user::Entity::find()
      .filter(app_user::Column::Email.eq(&email))
      .one(db)
      .await?
    else {
      return Err(invalid());
    };
    if !verify_password(password, &model.password_hash).await? {
      tracing::debug!(user_id = %model.id, "password mismatch");
      return Err(invalid());
    }

    let now = Utc::now();
    let expires_at = now + ttl;
    let session = user_session::ActiveModel {
      token: Set(Uuid::new_v4()),
      user_id: Set(model.id),
      expires_at: Set(expires_at.into()),
      created_at: Set(now.into()),
    }
    .insert(db)
    .await?;

    Ok(Self {
      token: session.token,
      expires_at,
      user: User::from_model(model)?,
    })
  }

  /// Resolve a bearer token to the acting user.
  pub async fn authenticate(token: Uuid, db: &impl ConnectionTrait) -> Result<Actor, AppError> {
    let Some(session) = user_session::Entity::find_by_id(token).one(db).await? else {
      return Err(AppError::unauthorized("invalid session"));
    };
    if session.expires_at.with_timezone(&Utc) <= Utc::now() {
      return Err(AppError::unauthorized("session expired"));
    }

    let user = app_user::Entity::find_by_id(session.user_id)
      .one(db)
      .await?
      .ok_or_else(|| AppError::unauthorized("invalid session"))?;
    let role = Role::from_str(&user.role)
      .map_err(|_| anyhow!("unknown role '{}' on user {}", user.role, user.id))?;

    Ok(Actor::new(user.id, role))
  }

  pub async fn logout(token: Uuid, db: &impl ConnectionTrait) -> Result<(), AppError> {
    user_session::Entity::delete_by_id(token).exec(db).await?;
    Ok(())
  }

  /// Drop sessions that expired before `now`.
  pub async fn purge_expired(now: DateTime<Utc>, db: &impl ConnectionTrait) -> Result<u64, AppError> {
    let res = user_session::Entity::delete_many()
      .filter(user_session::Column::ExpiresAt.lt(now))
      .exec(db)
      .await?;
    Ok(res.rows_affected)
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use edulane_entities::app_user;
  use edulane_shared::Role;
  use sea_orm::{DatabaseBackend, MockDatabase};
  use uuid::Uuid;

  use super::{ProfileUpdate, Registration, SeedAction, User, normalize_email, seed_action};
  use crate::media::MediaField;

  #[test]
  fn emails_are_normalized() {
    assert_eq!(normalize_email("  Ada@Example.COM ").unwrap(), "ada@example.com");
    assert!(normalize_email("no-at-sign").is_err());
    assert!(normalize_email("@example.com").is_err());
    assert!(normalize_email("ada@").is_err());
  }

  #[test]
  fn registration_defaults_to_learner() {
    let input: Registration = serde_json::from_str(
      r#"{"email":"a@b.c","password":"password1","display_name":"Ada"}"#,
    )
    .unwrap();
    assert_eq!(input.role, Role::Learner);
  }

  #[test]
  fn profile_update_keeps_avatar_by_default() {
    let input: ProfileUpdate = serde_json::from_str(r#"{"display_name":"Ada"}"#).unwrap();
    assert_eq!(input.avatar, MediaField::Keep);
  }

  #[test]
  fn admin_seed_creates_promotes_or_keeps() {
    assert_eq!(seed_action(None), SeedAction::Create);
    assert_eq!(seed_action(Some(Some(Role::Learner))), SeedAction::Promote);
    assert_eq!(seed_action(Some(Some(Role::Teacher))), SeedAction::Promote);
    assert_eq!(seed_action(Some(None)), SeedAction::Promote);
    assert_eq!(seed_action(Some(Some(Role::Admin))), SeedAction::Keep);
  }

  #[tokio::test]
  async fn seeding_an_existing_admin_changes_nothing() {
    let admin = app_user::Model {
      id: Uuid::now_v7(),
      email: "root@example.com".to_owned(),
      display_name: "Root".to_owned(),
      password_hash: "$argon2id$stored".to_owned(),
      role: "admin".to_owned(),
      avatar_key: None,
      created_at: Utc::now().into(),
      updated_at: Utc::now().into(),
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
      .append_query_results([vec![admin.clone()]])
      .into_connection();

    let user = User::seed_admin(" Root@Example.com ", "ignored-password", &db)
      .await
      .unwrap();

    assert_eq!(user.id, admin.id);
    assert_eq!(user.role, Role::Admin);
    assert_eq!(db.into_transaction_log().len(), 1);
  }
}
