use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `course_id` is denormalised from the parent lesson for access checks.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lesson_module")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub lesson_id: Uuid,
  pub course_id: Uuid,
  pub title: String,
  pub kind: String,
  pub position: i32,
  pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
