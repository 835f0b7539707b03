use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pronunciation_attempt")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub user_id: Uuid,
  pub flashcard_id: Option<Uuid>,
  #[sea_orm(column_type = "Text")]
  pub reference_text: String,
  #[sea_orm(column_type = "Text")]
  pub recognized_text: String,
  pub audio_key: Option<String>,
  pub accuracy: f64,
  pub completeness: f64,
  pub fluency: f64,
  pub overall: f64,
  #[sea_orm(column_type = "JsonBinary")]
  pub words: Json,
  pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
