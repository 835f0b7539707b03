use sea_orm_migration::{
  prelude::*,
  schema::{
    big_integer, string, string_null, timestamp_with_time_zone, timestamp_with_time_zone_null,
    uuid, uuid_null,
  },
};

use crate::{
  m20261001_01_create_account_tables::AppUser,
  m20261001_02_create_package_tables::TeacherPackage,
  m20261001_03_create_course_tables::{Course, LessonModule},
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Enrollment::Table)
          .if_not_exists()
          .col(uuid(Enrollment::Id).primary_key())
          .col(uuid(Enrollment::CourseId))
          .col(uuid(Enrollment::UserId))
          .col(string(Enrollment::Status))
          .col(timestamp_with_time_zone(Enrollment::EnrolledAt))
          .col(timestamp_with_time_zone_null(Enrollment::CancelledAt))
          .foreign_key(
            ForeignKey::create()
              .name("fk_enrollment_course")
              .from(Enrollment::Table, Enrollment::CourseId)
              .to(Course::Table, Course::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_enrollment_user")
              .from(Enrollment::Table, Enrollment::UserId)
              .to(AppUser::Table, AppUser::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_enrollment_course_user")
          .table(Enrollment::Table)
          .col(Enrollment::CourseId)
          .col(Enrollment::UserId)
          .unique()
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(ModuleProgress::Table)
          .if_not_exists()
          .col(uuid(ModuleProgress::Id).primary_key())
          .col(uuid(ModuleProgress::UserId))
          .col(uuid(ModuleProgress::ModuleId))
          .col(uuid(ModuleProgress::CourseId))
          .col(timestamp_with_time_zone(ModuleProgress::CompletedAt))
          .foreign_key(
            ForeignKey::create()
              .name("fk_module_progress_module")
              .from(ModuleProgress::Table, ModuleProgress::ModuleId)
              .to(LessonModule::Table, LessonModule::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_module_progress_user")
              .from(ModuleProgress::Table, ModuleProgress::UserId)
              .to(AppUser::Table, AppUser::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_module_progress_user_module")
          .table(ModuleProgress::Table)
          .col(ModuleProgress::UserId)
          .col(ModuleProgress::ModuleId)
          .unique()
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(Payment::Table)
          .if_not_exists()
          .col(uuid(Payment::Id).primary_key())
          .col(uuid(Payment::UserId))
          .col(uuid_null(Payment::CourseId))
          .col(uuid_null(Payment::PackageId))
          .col(big_integer(Payment::AmountCents))
          .col(string(Payment::Currency))
          .col(string(Payment::Status))
          .col(string_null(Payment::ProviderRef))
          .col(timestamp_with_time_zone(Payment::CreatedAt).default(Expr::current_timestamp()))
          .col(timestamp_with_time_zone(Payment::UpdatedAt).default(Expr::current_timestamp()))
          .foreign_key(
            ForeignKey::create()
              .name("fk_payment_user")
              .from(Payment::Table, Payment::UserId)
              .to(AppUser::Table, AppUser::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_payment_course")
              .from(Payment::Table, Payment::CourseId)
              .to(Course::Table, Course::Id)
              .on_delete(ForeignKeyAction::SetNull),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_payment_package")
              .from(Payment::Table, Payment::PackageId)
              .to(TeacherPackage::Table, TeacherPackage::Id)
              .on_delete(ForeignKeyAction::Restrict),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_payment_user")
          .table(Payment::Table)
          .col(Payment::UserId)
          .to_owned(),
      )
      .await?;

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(Payment::Table).to_owned())
      .await?;
    manager
      .drop_table(Table::drop().table(ModuleProgress::Table).to_owned())
      .await?;
    manager
      .drop_table(Table::drop().table(Enrollment::Table).to_owned())
      .await?;

    Ok(())
  }
}

#[derive(Iden)]
pub enum Enrollment {
  Table,

  Id,
  CourseId,
  UserId,
  // active | cancelled
  Status,
  EnrolledAt,
  CancelledAt,
}

#[derive(Iden)]
pub enum ModuleProgress {
  Table,

  Id,
  UserId,
  ModuleId,
  CourseId,
  CompletedAt,
}

#[derive(Iden)]
pub enum Payment {
  Table,

  Id,
  UserId,
  // exactly one of course_id / package_id
  CourseId,
  PackageId,
  AmountCents,
  Currency,
  // pending | succeeded | failed | refunded
  Status,
  ProviderRef,
  CreatedAt,
  UpdatedAt,
}
