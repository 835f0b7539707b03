use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Exactly one of `course_id` / `package_id` is set.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub user_id: Uuid,
  pub course_id: Option<Uuid>,
  pub package_id: Option<Uuid>,
  pub amount_cents: i64,
  pub currency: String,
  pub status: String,
  pub provider_ref: Option<String>,
  pub created_at: DateTimeWithTimeZone,
  pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
