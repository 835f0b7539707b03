use sea_orm_migration::{
  prelude::*,
  schema::{big_integer, boolean, integer, string, text, timestamp_with_time_zone, uuid},
};

use crate::m20261001_01_create_account_tables::AppUser;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(TeacherPackage::Table)
          .if_not_exists()
          .col(uuid(TeacherPackage::Id).primary_key())
          .col(string(TeacherPackage::Name))
          .col(text(TeacherPackage::Description).default(""))
          .col(big_integer(TeacherPackage::PriceCents))
          .col(integer(TeacherPackage::MaxCourses))
          .col(integer(TeacherPackage::MaxStudents))
          .col(integer(TeacherPackage::DurationDays))
          .col(boolean(TeacherPackage::IsActive).default(true))
          .col(timestamp_with_time_zone(TeacherPackage::CreatedAt).default(Expr::current_timestamp()))
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(TeacherSubscription::Table)
          .if_not_exists()
          .col(uuid(TeacherSubscription::Id).primary_key())
          .col(uuid(TeacherSubscription::TeacherId))
          .col(uuid(TeacherSubscription::PackageId))
          .col(string(TeacherSubscription::Status))
          .col(timestamp_with_time_zone(TeacherSubscription::StartsAt))
          .col(timestamp_with_time_zone(TeacherSubscription::EndsAt))
          .col(
            timestamp_with_time_zone(TeacherSubscription::CreatedAt)
              .default(Expr::current_timestamp()),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_teacher_subscription_teacher")
              .from(TeacherSubscription::Table, TeacherSubscription::TeacherId)
              .to(AppUser::Table, AppUser::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_teacher_subscription_package")
              .from(TeacherSubscription::Table, TeacherSubscription::PackageId)
              .to(TeacherPackage::Table, TeacherPackage::Id)
              .on_delete(ForeignKeyAction::Restrict),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_teacher_subscription_teacher_status")
          .table(TeacherSubscription::Table)
          .col(TeacherSubscription::TeacherId)
          .col(TeacherSubscription::Status)
          .to_owned(),
      )
      .await?;

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(TeacherSubscription::Table).to_owned())
      .await?;
    manager
      .drop_table(Table::drop().table(TeacherPackage::Table).to_owned())
      .await?;

    Ok(())
  }
}

#[derive(Iden)]
pub enum TeacherPackage {
  Table,

  Id,
  Name,
  Description,
  PriceCents,
  // commercial limits
  MaxCourses,
  MaxStudents,
  DurationDays,
  IsActive,
  CreatedAt,
}

#[derive(Iden)]
pub enum TeacherSubscription {
  Table,

  Id,
  TeacherId,
  PackageId,
  // active | cancelled
  Status,
  StartsAt,
  EndsAt,
  CreatedAt,
}
