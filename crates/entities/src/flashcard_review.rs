use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Spaced-repetition state of one card for one learner.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "flashcard_review")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub user_id: Uuid,
  pub flashcard_id: Uuid,
  pub module_id: Uuid,
  pub quality: i16,
  pub repetitions: i32,
  pub interval_days: i32,
  pub easiness_factor: f64,
  pub stability: Option<f32>,
  pub difficulty: Option<f32>,
  pub due_at: DateTimeWithTimeZone,
  pub last_reviewed_at: DateTimeWithTimeZone,
  pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
