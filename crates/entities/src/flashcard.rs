use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "flashcard")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub module_id: Uuid,
  pub term: String,
  #[sea_orm(column_type = "Text")]
  pub definition: String,
  #[sea_orm(column_type = "Text")]
  pub example: Option<String>,
  pub phonetic: Option<String>,
  pub image_key: Option<String>,
  pub audio_key: Option<String>,
  pub position: i32,
  pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
