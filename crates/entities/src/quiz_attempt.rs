use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quiz_attempt")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub assessment_id: Uuid,
  pub user_id: Uuid,
  pub status: String,
  #[sea_orm(column_type = "JsonBinary")]
  pub answers: Option<Json>,
  #[sea_orm(column_type = "JsonBinary")]
  pub results: Option<Json>,
  pub score: Option<f64>,
  pub max_score: Option<f64>,
  pub passed: Option<bool>,
  pub started_at: DateTimeWithTimeZone,
  pub submitted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
