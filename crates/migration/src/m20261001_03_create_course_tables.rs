use sea_orm_migration::{
  prelude::*,
  schema::{
    big_integer, boolean, integer, integer_null, string, string_null, text, timestamp_with_time_zone,
    uuid,
  },
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
          .table(Course::Table)
          .if_not_exists()
          .col(uuid(Course::Id).primary_key())
          .col(uuid(Course::TeacherId))
          .col(string(Course::Title))
          .col(text(Course::Description).default(""))
          .col(big_integer(Course::PriceCents).default(0))
          .col(string_null(Course::ThumbnailKey))
          .col(boolean(Course::IsPublished).default(false))
          .col(timestamp_with_time_zone(Course::CreatedAt).default(Expr::current_timestamp()))
          .col(timestamp_with_time_zone(Course::UpdatedAt).default(Expr::current_timestamp()))
          .foreign_key(
            ForeignKey::create()
              .name("fk_course_teacher")
              .from(Course::Table, Course::TeacherId)
              .to(AppUser::Table, AppUser::Id)
              .on_delete(ForeignKeyAction::Restrict),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_course_teacher")
          .table(Course::Table)
          .col(Course::TeacherId)
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(Lesson::Table)
          .if_not_exists()
          .col(uuid(Lesson::Id).primary_key())
          .col(uuid(Lesson::CourseId))
          .col(string(Lesson::Title))
          .col(text(Lesson::Description).default(""))
          .col(integer(Lesson::Position))
          .col(timestamp_with_time_zone(Lesson::CreatedAt).default(Expr::current_timestamp()))
          .foreign_key(
            ForeignKey::create()
              .name("fk_lesson_course")
              .from(Lesson::Table, Lesson::CourseId)
              .to(Course::Table, Course::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_lesson_course_position")
          .table(Lesson::Table)
          .col(Lesson::CourseId)
          .col(Lesson::Position)
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(LessonModule::Table)
          .if_not_exists()
          .col(uuid(LessonModule::Id).primary_key())
          .col(uuid(LessonModule::LessonId))
          .col(uuid(LessonModule::CourseId))
          .col(string(LessonModule::Title))
          .col(string(LessonModule::Kind))
          .col(integer(LessonModule::Position))
          .col(timestamp_with_time_zone(LessonModule::CreatedAt).default(Expr::current_timestamp()))
          .foreign_key(
            ForeignKey::create()
              .name("fk_lesson_module_lesson")
              .from(LessonModule::Table, LessonModule::LessonId)
              .to(Lesson::Table, Lesson::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_lesson_module_course")
              .from(LessonModule::Table, LessonModule::CourseId)
              .to(Course::Table, Course::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_lesson_module_lesson_position")
          .table(LessonModule::Table)
          .col(LessonModule::LessonId)
          .col(LessonModule::Position)
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(Lecture::Table)
          .if_not_exists()
          .col(uuid(Lecture::Id).primary_key())
          .col(uuid(Lecture::ModuleId).unique_key())
          .col(text(Lecture::Content).default(""))
          .col(string_null(Lecture::VideoKey))
          .col(string_null(Lecture::AttachmentKey))
          .col(integer_null(Lecture::DurationSeconds))
          .col(timestamp_with_time_zone(Lecture::UpdatedAt).default(Expr::current_timestamp()))
          .foreign_key(
            ForeignKey::create()
              .name("fk_lecture_module")
              .from(Lecture::Table, Lecture::ModuleId)
              .to(LessonModule::Table, LessonModule::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(Lecture::Table).to_owned())
      .await?;
    manager
      .drop_table(Table::drop().table(LessonModule::Table).to_owned())
      .await?;
    manager
      .drop_table(Table::drop().table(Lesson::Table).to_owned())
      .await?;
    manager
      .drop_table(Table::drop().table(Course::Table).to_owned())
      .await?;

    Ok(())
  }
}

#[derive(Iden)]
pub enum Course {
  Table,

  Id,
  TeacherId,
  Title,
  Description,
  // 0 = free
  PriceCents,
  ThumbnailKey,
  IsPublished,
  CreatedAt,
  UpdatedAt,
}

#[derive(Iden)]
pub enum Lesson {
  Table,

  Id,
  CourseId,
  Title,
  Description,
  Position,
  CreatedAt,
}

#[derive(Iden)]
pub enum LessonModule {
  Table,

  Id,
  LessonId,
  CourseId,
  Title,
  // lecture | flashcard | assessment
  Kind,
  Position,
  CreatedAt,
}

#[derive(Iden)]
pub enum Lecture {
  Table,

  Id,
  ModuleId,
  Content,
  VideoKey,
  AttachmentKey,
  DurationSeconds,
  UpdatedAt,
}
