use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quiz_question")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub assessment_id: Uuid,
  pub kind: String,
  #[sea_orm(column_type = "Text")]
  pub prompt: String,
  #[sea_orm(column_type = "JsonBinary")]
  pub options: Json,
  #[sea_orm(column_type = "JsonBinary")]
  pub accepted_answers: Json,
  pub points: f64,
  pub position: i32,
  #[sea_orm(column_type = "Text")]
  pub explanation: Option<String>,
  pub image_key: Option<String>,
  pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
