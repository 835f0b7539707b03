use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use edulane_entities::user_streak;
use edulane_shared::AppError;
use sea_orm::{
  ActiveModelTrait, ConnectionTrait, EntityTrait, QuerySelect, Set, sea_query::OnConflict,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Streak {
  /// Consecutive active days ending today or yesterday; 0 once broken
  pub current: i32,
  pub longest: i32,
  pub last_active_on: Option<NaiveDate>,
}

impl Streak {
  const EMPTY: Self = Self {
    current: 0,
    longest: 0,
    last_active_on: None,
  };

  /// Fold one day of activity into the streak.
  #[must_use]
  pub fn advance(self, today: NaiveDate) -> Self {
    let current = match self.last_active_on {
      Some(last) if last == today => return self,
      // clock skew; keep the recorded streak
      Some(last) if last > today => return self,
      Some(last) if last.succ_opt() == Some(today) => self.current + 1,
      _ => 1,
    };

    Self {
      current,
      longest: self.longest.max(current),
      last_active_on: Some(today),
    }
  }

  /// The streak as it stands on `today` without new activity.
  #[must_use]
  pub fn as_of(self, today: NaiveDate) -> Self {
    let alive = self
      .last_active_on
      .is_some_and(|last| last == today || last.succ_opt() == Some(today));
    if alive { self } else { Self { current: 0, ..self } }
  }

  fn from_model(model: &user_streak::Model) -> Self {
    Self {
      current: model.current_streak,
      longest: model.longest_streak,
      last_active_on: Some(model.last_active_on),
    }
  }

  pub async fn get(user_id: Uuid, now: DateTime<Utc>, db: &impl ConnectionTrait) -> Result<Self, AppError> {
    let streak = user_streak::Entity::find_by_id(user_id)
      .one(db)
      .await?
      .map_or(Self::EMPTY, |model| Self::from_model(&model));

    Ok(streak.as_of(now.date_naive()))
  }

  /// Count learning activity by `user_id` at `now` (UTC day boundaries).
  pub async fn record_activity(
    user_id: Uuid,
    now: DateTime<Utc>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let today = now.date_naive();

    // The first activity creates the row; concurrent first writes fall through to the
    // locked read below.
    let first = Self::EMPTY.advance(today);
    let inserted = user_streak::Entity::insert(user_streak::ActiveModel {
      user_id: Set(user_id),
      current_streak: Set(first.current),
      longest_streak: Set(first.longest),
      last_active_on: Set(today),
      updated_at: Set(now.into()),
    })
    .on_conflict(
      OnConflict::column(user_streak::Column::UserId)
        .do_nothing()
        .to_owned(),
    )
    .exec_without_returning(db)
    .await?;
    if inserted > 0 {
      return Ok(first);
    }

    let model = user_streak::Entity::find_by_id(user_id)
      .lock_exclusive()
      .one(db)
      .await?
      .ok_or_else(|| anyhow!("streak of user {user_id} vanished"))?;

    let before = Self::from_model(&model);
    let after = before.advance(today);
    if after != before {
      let mut active: user_streak::ActiveModel = model.into();
      active.current_streak = Set(after.current);
      active.longest_streak = Set(after.longest);
      if let Some(day) = after.last_active_on {
        active.last_active_on = Set(day);
      }
      active.updated_at = Set(now.into());
      active.update(db).await?;

      if after.current > 1 {
        tracing::debug!(%user_id, streak = after.current, "streak extended");
      }
    }

    Ok(after)
  }
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, TimeZone, Utc};
  use edulane_entities::user_streak;
  use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
  use uuid::Uuid;

  use super::Streak;

  fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
  }

  #[test]
  fn first_activity_starts_a_streak() {
    let streak = Streak::EMPTY.advance(day(1));
    assert_eq!(streak.current, 1);
    assert_eq!(streak.longest, 1);
    assert_eq!(streak.last_active_on, Some(day(1)));
  }

  #[test]
  fn consecutive_days_extend_and_same_day_is_noop() {
    let streak = Streak::EMPTY.advance(day(1)).advance(day(2)).advance(day(2)).advance(day(3));
    assert_eq!(streak.current, 3);
    assert_eq!(streak.longest, 3);
  }

  #[test]
  fn gap_resets_current_but_keeps_longest() {
    let streak = Streak::EMPTY
      .advance(day(1))
      .advance(day(2))
      .advance(day(3))
      .advance(day(6));
    assert_eq!(streak.current, 1);
    assert_eq!(streak.longest, 3);
  }

  #[test]
  fn crosses_month_boundary() {
    let last_of_feb = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
    let streak = Streak::EMPTY.advance(last_of_feb).advance(day(1));
    assert_eq!(streak.current, 2);
  }

  #[test]
  fn broken_streak_reads_as_zero() {
    let streak = Streak::EMPTY.advance(day(1)).advance(day(2));
    assert_eq!(streak.as_of(day(3)).current, 2);
    assert_eq!(streak.as_of(day(4)).current, 0);
    assert_eq!(streak.as_of(day(4)).longest, 2);
  }

  fn inserted(rows_affected: u64) -> MockExecResult {
    MockExecResult {
      last_insert_id: 0,
      rows_affected,
    }
  }

  #[tokio::test]
  async fn first_recorded_activity_inserts_the_row() {
    let now = Utc.with_ymd_and_hms(2026, 3, 4, 18, 0, 0).unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
      .append_exec_results([inserted(1)])
      .into_connection();

    let streak = Streak::record_activity(Uuid::now_v7(), now, &db)
      .await
      .unwrap();

    assert_eq!(streak.current, 1);
    assert_eq!(streak.last_active_on, Some(day(4)));
    assert_eq!(db.into_transaction_log().len(), 1);
  }

  #[tokio::test]
  async fn losing_the_insert_race_reads_the_existing_row() {
    let now = Utc.with_ymd_and_hms(2026, 3, 4, 18, 0, 0).unwrap();
    let user_id = Uuid::now_v7();
    let row = user_streak::Model {
      user_id,
      current_streak: 1,
      longest_streak: 1,
      last_active_on: day(4),
      updated_at: now.into(),
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
      .append_exec_results([inserted(0)])
      .append_query_results([vec![row]])
      .into_connection();

    let streak = Streak::record_activity(user_id, now, &db).await.unwrap();

    // same day as the row just written: nothing left to update
    assert_eq!(streak.current, 1);
    assert_eq!(db.into_transaction_log().len(), 2);
  }
}
