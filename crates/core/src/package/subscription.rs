use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use edulane_entities::{app_user, course, teacher_subscription};
use edulane_shared::{AppError, Role};
use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, FromQueryResult,
  PaginatorTrait, QueryFilter, QueryOrder, Set, Statement,
};
use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use super::TeacherPackage;
use crate::{Actor, enrollment::EnrollmentStatus};

/// Limits for teachers without an active subscription.
pub const FREE_MAX_COURSES: i64 = 1;
pub const FREE_MAX_STUDENTS: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SubscriptionStatus {
  Active,
  Cancelled,
}

#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct Subscription {
  pub id: Uuid,
  pub teacher_id: Uuid,
  pub package_id: Uuid,
  pub status: SubscriptionStatus,
  pub starts_at: DateTime<Utc>,
  pub ends_at: DateTime<Utc>,
}

/// Effective limits for one teacher.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, ToSchema)]
pub struct Quota {
  /// `None` on the free tier
  pub package_id: Option<Uuid>,
  pub max_courses: i64,
  pub max_students: i64,
  pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, ToSchema)]
pub struct Usage {
  pub courses: i64,
  /// Distinct learners with an active enrollment in any of the teacher's courses
  pub students: i64,
}

#[derive(Debug, PartialEq, Eq)]
enum Activation {
  Extend { id: Uuid, ends_at: DateTime<Utc> },
  Replace { cancel: Option<Uuid>, ends_at: DateTime<Utc> },
}

/// Decide how buying `package_id` changes the current subscription.
fn plan_activation(
  current: Option<&Subscription>,
  package_id: Uuid,
  duration_days: i32,
  now: DateTime<Utc>,
) -> Activation {
  let term = Duration::days(i64::from(duration_days));
  match current {
    Some(sub) if sub.package_id == package_id => Activation::Extend {
      id: sub.id,
      ends_at: sub.ends_at.max(now) + term,
    },
    other => Activation::Replace {
      cancel: other.map(|sub| sub.id),
      ends_at: now + term,
    },
  }
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
  count: i64,
}

impl Subscription {
  pub fn from_model(model: teacher_subscription::Model) -> Result<Self, AppError> {
    Ok(Self {
      id: model.id,
      teacher_id: model.teacher_id,
      package_id: model.package_id,
      status: SubscriptionStatus::from_str(&model.status)
        .map_err(|_| anyhow!("unknown subscription status '{}'", model.status))?,
      starts_at: model.starts_at.with_timezone(&Utc),
      ends_at: model.ends_at.with_timezone(&Utc),
    })
  }

  /// The subscription in force at `now`, if any.
  pub async fn current(
    teacher_id: Uuid,
    now: DateTime<Utc>,
    db: &impl ConnectionTrait,
  ) -> Result<Option<Self>, AppError> {
    teacher_subscription::Entity::find()
      .filter(teacher_subscription::Column::TeacherId.eq(teacher_id))
      .filter(teacher_subscription::Column::Status.eq(SubscriptionStatus::Active.as_ref()))
      .filter(teacher_subscription::Column::EndsAt.gt(now))
      .order_by_desc(teacher_subscription::Column::EndsAt)
      .one(db)
      .await?
      .map(Self::from_model)
      .transpose()
  }

  /// Apply a paid package to a teacher.
  pub async fn activate(
    teacher_id: Uuid,
    package: &TeacherPackage,
    now: DateTime<Utc>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let current = Self::current(teacher_id, now, db).await?;

    match plan_activation(current.as_ref(), package.id, package.duration_days, now) {
      Activation::Extend { id, ends_at } => {
        let model = teacher_subscription::Entity::find_by_id(id)
          .one(db)
          .await?
          .ok_or_else(|| anyhow!("subscription {id} vanished"))?;
        let mut active: teacher_subscription::ActiveModel = model.into();
        active.ends_at = Set(ends_at.into());
        let model = active.update(db).await?;

        tracing::info!(%teacher_id, package_id = %package.id, %ends_at, "subscription extended");

        Self::from_model(model)
      }
      Activation::Replace { cancel, ends_at } => {
        if let Some(id) = cancel {
          teacher_subscription::ActiveModel {
            id: Set(id),
            status: Set(SubscriptionStatus::Cancelled.to_string()),
            ..Default::default()
          }
          .update(db)
          .await?;
          tracing::info!(%teacher_id, subscription_id = %id, "subscription replaced");
        }

        let model = teacher_subscription::ActiveModel {
          id: Set(Uuid::now_v7()),
          teacher_id: Set(teacher_id),
          package_id: Set(package.id),
          status: Set(SubscriptionStatus::Active.to_string()),
          starts_at: Set(now.into()),
          ends_at: Set(ends_at.into()),
          created_at: Set(now.into()),
        }
        .insert(db)
        .await?;

        tracing::info!(%teacher_id, package_id = %package.id, %ends_at, "subscription activated");

        Self::from_model(model)
      }
    }
  }
}

impl Quota {
  const FREE: Self = Self {
    package_id: None,
    max_courses: FREE_MAX_COURSES,
    max_students: FREE_MAX_STUDENTS,
    ends_at: None,
  };

  pub async fn of(teacher_id: Uuid, now: DateTime<Utc>, db: &impl ConnectionTrait) -> Result<Self, AppError> {
    let Some(sub) = Subscription::current(teacher_id, now, db).await? else {
      return Ok(Self::FREE);
    };
    let package = TeacherPackage::get(sub.package_id, db).await?;

    Ok(Self {
      package_id: Some(package.id),
      max_courses: i64::from(package.max_courses),
      max_students: i64::from(package.max_students),
      ends_at: Some(sub.ends_at),
    })
  }
}

impl Usage {
  pub async fn of(teacher_id: Uuid, db: &impl ConnectionTrait) -> Result<Self, AppError> {
    let courses = course::Entity::find()
      .filter(course::Column::TeacherId.eq(teacher_id))
      .count(db)
      .await?;

    let sql = "SELECT COUNT(DISTINCT e.user_id)::BIGINT AS count \
               FROM enrollment e JOIN course c ON c.id = e.course_id \
               WHERE c.teacher_id = $1 AND e.status = $2";
    let students = CountRow::find_by_statement(Statement::from_sql_and_values(
      DbBackend::Postgres,
      sql,
      [teacher_id.into(), EnrollmentStatus::Active.to_string().into()],
    ))
    .one(db)
    .await?
    .map_or(0, |row| row.count);

    Ok(Self {
      courses: i64::try_from(courses).unwrap_or(i64::MAX),
      students,
    })
  }
}

async fn is_admin(user_id: Uuid, db: &impl ConnectionTrait) -> Result<bool, AppError> {
  let user = app_user::Entity::find_by_id(user_id)
    .one(db)
    .await?
    .ok_or_else(|| AppError::not_found("user not found"))?;
  Ok(user.role == Role::Admin.as_ref())
}

/// 402 when the teacher has used up their course allowance.
pub async fn ensure_can_create_course(
  actor: &Actor,
  now: DateTime<Utc>,
  db: &impl ConnectionTrait,
) -> Result<(), AppError> {
  if actor.is_admin() {
    return Ok(());
  }
  let quota = Quota::of(actor.user_id, now, db).await?;
  let usage = Usage::of(actor.user_id, db).await?;
  if usage.courses >= quota.max_courses {
    return Err(AppError::payment_required(format!(
      "course limit of {} reached; upgrade your package",
      quota.max_courses
    )));
  }
  Ok(())
}

/// 402 when admitting `learner_id` would push the teacher past their student limit.
/// Learners already enrolled in another of the teacher's courses do not count again.
pub async fn ensure_can_admit(
  teacher_id: Uuid,
  learner_id: Uuid,
  now: DateTime<Utc>,
  db: &impl ConnectionTrait,
) -> Result<(), AppError> {
  if is_admin(teacher_id, db).await? {
    return Ok(());
  }

  let sql = "SELECT COUNT(*)::BIGINT AS count \
             FROM enrollment e JOIN course c ON c.id = e.course_id \
             WHERE c.teacher_id = $1 AND e.user_id = $2 AND e.status = $3";
  let already_counted = CountRow::find_by_statement(Statement::from_sql_and_values(
    DbBackend::Postgres,
    sql,
    [
      teacher_id.into(),
      learner_id.into(),
      EnrollmentStatus::Active.to_string().into(),
    ],
  ))
  .one(db)
  .await?
  .is_some_and(|row| row.count > 0);
  if already_counted {
    return Ok(());
  }

  let quota = Quota::of(teacher_id, now, db).await?;
  let usage = Usage::of(teacher_id, db).await?;
  ensure_student_room(&quota, &usage).inspect_err(|_| {
    tracing::info!(%teacher_id, students = usage.students, "student limit reached");
  })
}

/// A new learner fits only while the distinct learner count is under the limit.
fn ensure_student_room(quota: &Quota, usage: &Usage) -> Result<(), AppError> {
  if usage.students >= quota.max_students {
    return Err(AppError::payment_required(
      "this course is not accepting new students right now",
    ));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use chrono::{Duration, TimeZone, Utc};
  use edulane_entities::app_user;
  use sea_orm::{DatabaseBackend, MockDatabase, Value};
  use uuid::Uuid;

  use super::{
    Activation, Quota, Subscription, SubscriptionStatus, Usage, ensure_can_admit,
    ensure_student_room, plan_activation,
  };

  fn subscription(package_id: Uuid, ends_in_days: i64) -> Subscription {
    let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
    Subscription {
      id: Uuid::now_v7(),
      teacher_id: Uuid::now_v7(),
      package_id,
      status: SubscriptionStatus::Active,
      starts_at: now - Duration::days(10),
      ends_at: now + Duration::days(ends_in_days),
    }
  }

  #[test]
  fn same_package_extends_from_current_end() {
    let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
    let package = Uuid::now_v7();
    let current = subscription(package, 5);

    let plan = plan_activation(Some(&current), package, 30, now);
    assert_eq!(
      plan,
      Activation::Extend {
        id: current.id,
        ends_at: now + Duration::days(35)
      }
    );
  }

  #[test]
  fn different_package_cancels_and_replaces() {
    let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
    let current = subscription(Uuid::now_v7(), 5);

    let plan = plan_activation(Some(&current), Uuid::now_v7(), 30, now);
    assert_eq!(
      plan,
      Activation::Replace {
        cancel: Some(current.id),
        ends_at: now + Duration::days(30)
      }
    );
  }

  #[test]
  fn first_purchase_starts_now() {
    let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
    let plan = plan_activation(None, Uuid::now_v7(), 7, now);
    assert_eq!(
      plan,
      Activation::Replace {
        cancel: None,
        ends_at: now + Duration::days(7)
      }
    );
  }

  #[test]
  fn expired_same_package_restarts_from_now() {
    let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
    let package = Uuid::now_v7();
    let current = subscription(package, -3);

    let plan = plan_activation(Some(&current), package, 30, now);
    assert_eq!(
      plan,
      Activation::Extend {
        id: current.id,
        ends_at: now + Duration::days(30)
      }
    );
  }

  #[test]
  fn student_room_is_checked_against_distinct_learners() {
    let quota = Quota::FREE;
    let under = Usage {
      courses: 1,
      students: quota.max_students - 1,
    };
    let full = Usage {
      courses: 1,
      students: quota.max_students,
    };

    assert!(ensure_student_room(&quota, &under).is_ok());
    assert_eq!(
      ensure_student_room(&quota, &full).unwrap_err().status_code().as_u16(),
      402
    );
  }

  #[tokio::test]
  async fn learner_of_another_course_is_not_counted_twice() {
    let at = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
    let teacher = app_user::Model {
      id: Uuid::now_v7(),
      email: "t@example.com".to_owned(),
      display_name: "Teacher".to_owned(),
      password_hash: String::new(),
      role: "teacher".to_owned(),
      avatar_key: None,
      created_at: at.into(),
      updated_at: at.into(),
    };
    let already_enrolled = BTreeMap::from([("count", Value::from(1i64))]);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
      .append_query_results([vec![teacher.clone()]])
      .append_query_results([vec![already_enrolled]])
      .into_connection();

    ensure_can_admit(teacher.id, Uuid::now_v7(), at, &db)
      .await
      .unwrap();

    // no quota or usage lookups once the learner is known
    assert_eq!(db.into_transaction_log().len(), 2);
  }
}
