mod progress;
pub use progress::{CourseProgress, Progress};

use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use edulane_entities::{app_user, course, enrollment};
use edulane_shared::AppError;
use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
  sea_query::OnConflict,
};
use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
  Actor,
  catalog::{Course, find_course, managed_course},
  notification::{NewNotification, Notification, NotificationKind},
  package,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EnrollmentStatus {
  Active,
  Cancelled,
}

#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct Enrollment {
  pub id: Uuid,
  pub course_id: Uuid,
  pub user_id: Uuid,
  pub status: EnrollmentStatus,
  pub enrolled_at: DateTime<Utc>,
  pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnrolledCourse {
  pub enrollment: Enrollment,
  pub course: Course,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Student {
  pub user_id: Uuid,
  pub display_name: String,
  pub email: String,
  pub status: EnrollmentStatus,
  pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GrantPlan {
  Keep,
  Reactivate,
  Create,
}

fn plan_grant(existing: Option<&enrollment::Model>) -> GrantPlan {
  match existing {
    Some(model) if model.status == EnrollmentStatus::Active.as_ref() => GrantPlan::Keep,
    Some(_) => GrantPlan::Reactivate,
    None => GrantPlan::Create,
  }
}

impl Enrollment {
  pub fn from_model(model: enrollment::Model) -> Result<Self, AppError> {
    Ok(Self {
      id: model.id,
      course_id: model.course_id,
      user_id: model.user_id,
      status: EnrollmentStatus::from_str(&model.status)
        .map_err(|_| anyhow!("unknown enrollment status '{}'", model.status))?,
      enrolled_at: model.enrolled_at.with_timezone(&Utc),
      cancelled_at: model.cancelled_at.map(|dt| dt.with_timezone(&Utc)),
    })
  }

  async fn find(
    user_id: Uuid,
    course_id: Uuid,
    db: &impl ConnectionTrait,
  ) -> Result<Option<enrollment::Model>, AppError> {
    Ok(
      enrollment::Entity::find()
        .filter(enrollment::Column::CourseId.eq(course_id))
        .filter(enrollment::Column::UserId.eq(user_id))
        .one(db)
        .await?,
    )
  }

  /// Join a free published course.
  ///
  /// Reads other learners' enrollments for the student quota, so the caller runs it
  /// under the system scope.
  pub async fn enroll(
    actor: &Actor,
    course_id: Uuid,
    now: DateTime<Utc>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let course = find_course(course_id, db).await?;
    if !course.is_published {
      return Err(AppError::not_found("course not found"));
    }
    if course.teacher_id == actor.user_id {
      return Err(AppError::bad_request("you cannot enroll in your own course"));
    }
    if course.price_cents > 0 {
      let active = Self::find(actor.user_id, course_id, db)
        .await?
        .is_some_and(|e| e.status == EnrollmentStatus::Active.as_ref());
      if !active {
        return Err(AppError::payment_required(
          "this course must be purchased before enrolling",
        ));
      }
    }

    Self::grant(actor.user_id, &course, now, db).await
  }

  /// Enroll `user_id` without a price check. Re-granting an active enrollment is a no-op.
  pub async fn grant(
    user_id: Uuid,
    course: &course::Model,
    now: DateTime<Utc>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let existing = Self::find(user_id, course.id, db).await?;
    if let (GrantPlan::Keep, Some(model)) = (plan_grant(existing.as_ref()), &existing) {
      return Self::from_model(model.clone());
    }

    package::ensure_can_admit(course.teacher_id, user_id, now, db).await?;

    let model = match existing {
      Some(model) => {
        let mut active: enrollment::ActiveModel = model.into();
        active.status = Set(EnrollmentStatus::Active.to_string());
        active.enrolled_at = Set(now.into());
        active.cancelled_at = Set(None);
        active.update(db).await?
      }
      None => {
        let inserted = enrollment::Entity::insert(enrollment::ActiveModel {
          id: Set(Uuid::now_v7()),
          course_id: Set(course.id),
          user_id: Set(user_id),
          status: Set(EnrollmentStatus::Active.to_string()),
          enrolled_at: Set(now.into()),
          cancelled_at: Set(None),
        })
        .on_conflict(
          OnConflict::columns([enrollment::Column::CourseId, enrollment::Column::UserId])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

        let model = Self::find(user_id, course.id, db)
          .await?
          .ok_or_else(|| anyhow!("enrollment of {user_id} in {} vanished", course.id))?;
        if inserted == 0 {
          // A concurrent grant got there first and sent the notifications.
          return Self::from_model(model);
        }
        model
      }
    };

    tracing::info!(%user_id, course_id = %course.id, "enrolled");

    let learner = app_user::Entity::find_by_id(user_id)
      .one(db)
      .await?
      .map_or_else(|| "A learner".to_owned(), |u| u.display_name);
    let link = Some(format!("/courses/{}", course.id));
    Notification::notify(
      NewNotification {
        user_id,
        kind: NotificationKind::Enrollment,
        title: format!("You are enrolled in \"{}\"", course.title),
        body: "Start with the first lesson whenever you are ready.".to_owned(),
        link: link.clone(),
      },
      db,
    )
    .await?;
    Notification::notify(
      NewNotification {
        user_id: course.teacher_id,
        kind: NotificationKind::NewStudent,
        title: format!("New student in \"{}\"", course.title),
        body: format!("{learner} joined your course."),
        link,
      },
      db,
    )
    .await?;

    Self::from_model(model)
  }

  pub async fn cancel(
    actor: &Actor,
    course_id: Uuid,
    now: DateTime<Utc>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    Self::revoke(actor.user_id, course_id, now, db)
      .await?
      .ok_or_else(|| AppError::not_found("you are not enrolled in this course"))
  }

  /// Cancel an active enrollment, if there is one.
  pub(crate) async fn revoke(
    user_id: Uuid,
    course_id: Uuid,
    now: DateTime<Utc>,
    db: &impl ConnectionTrait,
  ) -> Result<Option<Self>, AppError> {
    let Some(model) = Self::find(user_id, course_id, db)
      .await?
      .filter(|e| e.status == EnrollmentStatus::Active.as_ref())
    else {
      return Ok(None);
    };

    let mut active: enrollment::ActiveModel = model.into();
    active.status = Set(EnrollmentStatus::Cancelled.to_string());
    active.cancelled_at = Set(Some(now.into()));
    let model = active.update(db).await?;

    tracing::info!(%user_id, %course_id, "enrollment cancelled");

    Self::from_model(model).map(Some)
  }

  pub async fn mine(actor: &Actor, db: &impl ConnectionTrait) -> Result<Vec<EnrolledCourse>, AppError> {
    let rows = enrollment::Entity::find()
      .filter(enrollment::Column::UserId.eq(actor.user_id))
      .filter(enrollment::Column::Status.eq(EnrollmentStatus::Active.as_ref()))
      .order_by_desc(enrollment::Column::EnrolledAt)
      .find_also_related(course::Entity)
      .all(db)
      .await?;

    rows
      .into_iter()
      .filter_map(|(enrollment, course)| course.map(|c| (enrollment, c)))
      .map(|(enrollment, course)| {
        Ok(EnrolledCourse {
          enrollment: Self::from_model(enrollment)?,
          course: Course::from_model(course),
        })
      })
      .collect()
  }

  /// Learners of a course. Owner or admin only.
  pub async fn students(
    actor: &Actor,
    course_id: Uuid,
    db: &impl ConnectionTrait,
  ) -> Result<Vec<Student>, AppError> {
    managed_course(actor, course_id, db).await?;

    let rows = enrollment::Entity::find()
      .filter(enrollment::Column::CourseId.eq(course_id))
      .order_by_asc(enrollment::Column::EnrolledAt)
      .find_also_related(app_user::Entity)
      .all(db)
      .await?;

    rows
      .into_iter()
      .filter_map(|(enrollment, user)| user.map(|u| (enrollment, u)))
      .map(|(enrollment, user)| {
        let enrollment = Self::from_model(enrollment)?;
        Ok(Student {
          user_id: user.id,
          display_name: user.display_name,
          email: user.email,
          status: enrollment.status,
          enrolled_at: enrollment.enrolled_at,
        })
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use edulane_entities::{course, enrollment};
  use sea_orm::{DatabaseBackend, MockDatabase};
  use uuid::Uuid;

  use super::{Enrollment, EnrollmentStatus, GrantPlan, plan_grant};

  fn stored(status: EnrollmentStatus, course_id: Uuid, user_id: Uuid) -> enrollment::Model {
    let at = Utc.with_ymd_and_hms(2026, 4, 2, 9, 0, 0).unwrap();
    enrollment::Model {
      id: Uuid::now_v7(),
      course_id,
      user_id,
      status: status.to_string(),
      enrolled_at: at.into(),
      cancelled_at: (status == EnrollmentStatus::Cancelled).then(|| at.into()),
    }
  }

  fn free_course() -> course::Model {
    let at = Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap();
    course::Model {
      id: Uuid::now_v7(),
      teacher_id: Uuid::now_v7(),
      title: "Spanish for travellers".to_owned(),
      description: String::new(),
      price_cents: 0,
      thumbnail_key: None,
      is_published: true,
      created_at: at.into(),
      updated_at: at.into(),
    }
  }

  #[test]
  fn grant_plan_follows_existing_enrollment() {
    let (course_id, user_id) = (Uuid::now_v7(), Uuid::now_v7());
    let active = stored(EnrollmentStatus::Active, course_id, user_id);
    let cancelled = stored(EnrollmentStatus::Cancelled, course_id, user_id);

    assert_eq!(plan_grant(Some(&active)), GrantPlan::Keep);
    assert_eq!(plan_grant(Some(&cancelled)), GrantPlan::Reactivate);
    assert_eq!(plan_grant(None), GrantPlan::Create);
  }

  #[tokio::test]
  async fn regranting_an_active_enrollment_writes_nothing() {
    let course = free_course();
    let user_id = Uuid::now_v7();
    let existing = stored(EnrollmentStatus::Active, course.id, user_id);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
      .append_query_results([vec![existing.clone()]])
      .into_connection();

    let enrollment = Enrollment::grant(user_id, &course, Utc::now(), &db)
      .await
      .unwrap();

    assert_eq!(enrollment.id, existing.id);
    assert_eq!(enrollment.status, EnrollmentStatus::Active);
    assert_eq!(db.into_transaction_log().len(), 1);
  }
}
