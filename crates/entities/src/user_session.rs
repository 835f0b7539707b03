use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Opaque bearer tokens.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_session")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub token: Uuid,
  pub user_id: Uuid,
  pub expires_at: DateTimeWithTimeZone,
  pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
