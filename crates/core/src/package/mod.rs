mod subscription;
pub use subscription::{
  FREE_MAX_COURSES, FREE_MAX_STUDENTS, Quota, Subscription, SubscriptionStatus, Usage,
  ensure_can_admit, ensure_can_create_course,
};

use chrono::{DateTime, Utc};
use edulane_entities::{payment, teacher_package, teacher_subscription};
use edulane_shared::{AppError, Role};
use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
  QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::Actor;

fn ensure_deletable(subscriptions: u64, payments: u64) -> Result<(), AppError> {
  if subscriptions > 0 {
    return Err(AppError::conflict(
      "package has subscriptions; deactivate it instead",
    ));
  }
  if payments > 0 {
    return Err(AppError::conflict(
      "package has payments; deactivate it instead",
    ));
  }
  Ok(())
}

/// A paid tier that raises a teacher's course and student limits.
#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct TeacherPackage {
  pub id: Uuid,
  pub name: String,
  pub description: String,
  pub price_cents: i64,
  pub max_courses: i32,
  pub max_students: i32,
  pub duration_days: i32,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PackageInput {
  pub name: String,
  #[serde(default)]
  pub description: String,
  pub price_cents: i64,
  pub max_courses: i32,
  pub max_students: i32,
  pub duration_days: i32,
  #[serde(default = "default_active")]
  pub is_active: bool,
}

const fn default_active() -> bool {
  true
}

impl PackageInput {
  fn validate(&self) -> Result<(), AppError> {
    if self.name.trim().is_empty() {
      return Err(AppError::bad_request("package name must not be empty"));
    }
    if self.price_cents <= 0 {
      return Err(AppError::bad_request("package price must be positive"));
    }
    if self.max_courses < 1 || self.max_students < 1 {
      return Err(AppError::bad_request("package limits must be at least 1"));
    }
    if self.duration_days < 1 {
      return Err(AppError::bad_request("package duration must be at least one day"));
    }
    Ok(())
  }
}

impl TeacherPackage {
  #[must_use]
  pub fn from_model(model: teacher_package::Model) -> Self {
    Self {
      id: model.id,
      name: model.name,
      description: model.description,
      price_cents: model.price_cents,
      max_courses: model.max_courses,
      max_students: model.max_students,
      duration_days: model.duration_days,
      is_active: model.is_active,
      created_at: model.created_at.with_timezone(&Utc),
    }
  }

  pub async fn get(id: Uuid, db: &impl ConnectionTrait) -> Result<Self, AppError> {
    teacher_package::Entity::find_by_id(id)
      .one(db)
      .await?
      .map(Self::from_model)
      .ok_or_else(|| AppError::not_found("package not found"))
  }

  /// Active packages, cheapest first. Admins may include retired ones.
  pub async fn list(include_inactive: bool, db: &impl ConnectionTrait) -> Result<Vec<Self>, AppError> {
    let mut query = teacher_package::Entity::find();
    if !include_inactive {
      query = query.filter(teacher_package::Column::IsActive.eq(true));
    }
    Ok(
      query
        .order_by_asc(teacher_package::Column::PriceCents)
        .all(db)
        .await?
        .into_iter()
        .map(Self::from_model)
        .collect(),
    )
  }

  pub async fn create(
    actor: &Actor,
    input: PackageInput,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    actor.require_role(&[Role::Admin])?;
    input.validate()?;

    let model = teacher_package::ActiveModel {
      id: Set(Uuid::now_v7()),
      name: Set(input.name.trim().to_owned()),
      description: Set(input.description),
      price_cents: Set(input.price_cents),
      max_courses: Set(input.max_courses),
      max_students: Set(input.max_students),
      duration_days: Set(input.duration_days),
      is_active: Set(input.is_active),
      created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;

    tracing::info!(package_id = %model.id, name = %model.name, "package created");

    Ok(Self::from_model(model))
  }

  pub async fn update(
    actor: &Actor,
    id: Uuid,
    input: PackageInput,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    actor.require_role(&[Role::Admin])?;
    input.validate()?;

    let model = teacher_package::Entity::find_by_id(id)
      .one(db)
      .await?
      .ok_or_else(|| AppError::not_found("package not found"))?;

    let mut active: teacher_package::ActiveModel = model.into();
    active.name = Set(input.name.trim().to_owned());
    active.description = Set(input.description);
    active.price_cents = Set(input.price_cents);
    active.max_courses = Set(input.max_courses);
    active.max_students = Set(input.max_students);
    active.duration_days = Set(input.duration_days);
    active.is_active = Set(input.is_active);

    Ok(Self::from_model(active.update(db).await?))
  }

  /// Packages that were ever subscribed to or paid for can only be retired, not deleted.
  pub async fn delete(actor: &Actor, id: Uuid, db: &impl ConnectionTrait) -> Result<(), AppError> {
    actor.require_role(&[Role::Admin])?;

    let subscriptions = teacher_subscription::Entity::find()
      .filter(teacher_subscription::Column::PackageId.eq(id))
      .count(db)
      .await?;
    let payments = payment::Entity::find()
      .filter(payment::Column::PackageId.eq(id))
      .count(db)
      .await?;
    ensure_deletable(subscriptions, payments)?;

    let res = teacher_package::Entity::delete_by_id(id).exec(db).await?;
    if res.rows_affected == 0 {
      return Err(AppError::not_found("package not found"));
    }

    tracing::info!(package_id = %id, "package deleted");

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::{PackageInput, ensure_deletable};

  fn input() -> PackageInput {
    serde_json::from_str(
      r#"{"name":"Pro","price_cents":1999,"max_courses":10,"max_students":500,"duration_days":30}"#,
    )
    .unwrap()
  }

  #[test]
  fn valid_input_defaults_to_active() {
    let input = input();
    assert!(input.is_active);
    assert!(input.validate().is_ok());
  }

  #[test]
  fn rejects_free_or_empty_packages() {
    let mut free = input();
    free.price_cents = 0;
    assert!(free.validate().is_err());

    let mut blank = input();
    blank.name = "   ".into();
    assert!(blank.validate().is_err());

    let mut no_students = input();
    no_students.max_students = 0;
    assert!(no_students.validate().is_err());
  }

  #[test]
  fn referenced_packages_cannot_be_deleted() {
    assert!(ensure_deletable(0, 0).is_ok());
    assert_eq!(ensure_deletable(2, 0).unwrap_err().status_code().as_u16(), 409);
    // pending or failed payments alone still hold a reference
    assert_eq!(ensure_deletable(0, 1).unwrap_err().status_code().as_u16(), 409);
  }
}
