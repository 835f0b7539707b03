use chrono::{DateTime, Utc};
use edulane_entities::{lesson_module, module_progress};
use edulane_shared::AppError;
use sea_orm::{
  ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect, Set,
  sea_query::OnConflict,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
  Actor,
  catalog::{find_module, module_access, readable_course},
  streak::Streak,
};

pub struct Progress;

#[derive(Debug, Serialize, Clone, PartialEq, ToSchema)]
pub struct CourseProgress {
  pub course_id: Uuid,
  pub completed: u64,
  pub total: u64,
  /// 0-100, rounded down
  pub percent: u8,
  pub completed_module_ids: Vec<Uuid>,
}

fn percent(completed: u64, total: u64) -> u8 {
  if total == 0 {
    return 0;
  }
  u8::try_from((completed.min(total) * 100) / total).unwrap_or(100)
}

impl Progress {
  /// Mark a module done for the actor. Completing it again changes nothing.
  pub async fn complete(
    actor: &Actor,
    module_id: Uuid,
    now: DateTime<Utc>,
    db: &impl ConnectionTrait,
  ) -> Result<CourseProgress, AppError> {
    let module = find_module(module_id, db).await?;
    module_access(actor, &module, db).await?;

    let inserted = module_progress::Entity::insert(module_progress::ActiveModel {
      id: Set(Uuid::now_v7()),
      user_id: Set(actor.user_id),
      module_id: Set(module_id),
      course_id: Set(module.course_id),
      completed_at: Set(now.into()),
    })
    .on_conflict(
      OnConflict::columns([module_progress::Column::UserId, module_progress::Column::ModuleId])
        .do_nothing()
        .to_owned(),
    )
    .exec_without_returning(db)
    .await?;
    if inserted > 0 {
      tracing::debug!(user_id = %actor.user_id, %module_id, "module completed");
    }
    Streak::record_activity(actor.user_id, now, db).await?;

    Self::tally(actor.user_id, module.course_id, db).await
  }

  pub async fn course(
    actor: &Actor,
    course_id: Uuid,
    db: &impl ConnectionTrait,
  ) -> Result<CourseProgress, AppError> {
    readable_course(actor, course_id, db).await?;
    Self::tally(actor.user_id, course_id, db).await
  }

  async fn tally(
    user_id: Uuid,
    course_id: Uuid,
    db: &impl ConnectionTrait,
  ) -> Result<CourseProgress, AppError> {
    let total = lesson_module::Entity::find()
      .filter(lesson_module::Column::CourseId.eq(course_id))
      .count(db)
      .await?;
    let completed_module_ids: Vec<Uuid> = module_progress::Entity::find()
      .select_only()
      .column(module_progress::Column::ModuleId)
      .filter(module_progress::Column::UserId.eq(user_id))
      .filter(module_progress::Column::CourseId.eq(course_id))
      .into_tuple()
      .all(db)
      .await?;
    let completed = completed_module_ids.len() as u64;

    Ok(CourseProgress {
      course_id,
      completed,
      total,
      percent: percent(completed, total),
      completed_module_ids,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::percent;

  #[test]
  fn percent_rounds_down_and_handles_empty_courses() {
    assert_eq!(percent(0, 0), 0);
    assert_eq!(percent(1, 3), 33);
    assert_eq!(percent(2, 3), 66);
    assert_eq!(percent(3, 3), 100);
    assert_eq!(percent(5, 3), 100);
  }
}
