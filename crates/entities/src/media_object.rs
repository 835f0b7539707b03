use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Registry of uploaded objects, used to validate commits and sweep stale temp uploads.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "media_object")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub key: String,
  pub owner_id: Uuid,
  pub content_type: String,
  pub size_bytes: i64,
  pub status: String,
  pub created_at: DateTimeWithTimeZone,
  pub committed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
