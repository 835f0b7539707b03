use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "enrollment")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub course_id: Uuid,
  pub user_id: Uuid,
  pub status: String,
  pub enrolled_at: DateTimeWithTimeZone,
  pub cancelled_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::course::Entity",
    from = "Column::CourseId",
    to = "super::course::Column::Id",
    on_update = "NoAction",
    on_delete = "Cascade"
  )]
  Course,
  #[sea_orm(
    belongs_to = "super::app_user::Entity",
    from = "Column::UserId",
    to = "super::app_user::Column::Id",
    on_update = "NoAction",
    on_delete = "Cascade"
  )]
  AppUser,
}

impl Related<super::course::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Course.def()
  }
}

impl Related<super::app_user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::AppUser.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
