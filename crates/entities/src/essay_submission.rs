use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "essay_submission")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub essay_id: Uuid,
  pub user_id: Uuid,
  #[sea_orm(column_type = "Text")]
  pub content: String,
  pub attachment_key: Option<String>,
  pub status: String,
  pub score: Option<f64>,
  #[sea_orm(column_type = "Text")]
  pub feedback: Option<String>,
  pub graded_by: Option<Uuid>,
  pub submitted_at: DateTimeWithTimeZone,
  pub graded_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
