use sea_orm_migration::{
  prelude::*,
  schema::{
    double, float_null, integer, small_integer, string, string_null, text, text_null,
    timestamp_with_time_zone, uuid,
  },
};

use crate::{
  m20261001_01_create_account_tables::AppUser, m20261001_03_create_course_tables::LessonModule,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Flashcard::Table)
          .if_not_exists()
          .col(uuid(Flashcard::Id).primary_key())
          .col(uuid(Flashcard::ModuleId))
          .col(string(Flashcard::Term))
          .col(text(Flashcard::Definition))
          .col(text_null(Flashcard::Example))
          .col(string_null(Flashcard::Phonetic))
          .col(string_null(Flashcard::ImageKey))
          .col(string_null(Flashcard::AudioKey))
          .col(integer(Flashcard::Position))
          .col(timestamp_with_time_zone(Flashcard::CreatedAt).default(Expr::current_timestamp()))
          .foreign_key(
            ForeignKey::create()
              .name("fk_flashcard_module")
              .from(Flashcard::Table, Flashcard::ModuleId)
              .to(LessonModule::Table, LessonModule::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_flashcard_module_position")
          .table(Flashcard::Table)
          .col(Flashcard::ModuleId)
          .col(Flashcard::Position)
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(FlashcardReview::Table)
          .if_not_exists()
          .col(uuid(FlashcardReview::Id).primary_key())
          .col(uuid(FlashcardReview::UserId))
          .col(uuid(FlashcardReview::FlashcardId))
          .col(uuid(FlashcardReview::ModuleId))
          .col(small_integer(FlashcardReview::Quality))
          .col(integer(FlashcardReview::Repetitions))
          .col(integer(FlashcardReview::IntervalDays))
          .col(double(FlashcardReview::EasinessFactor))
          // FSRS Memory State, only when the FSRS scheduler is in use
          .col(float_null(FlashcardReview::Stability))
          .col(float_null(FlashcardReview::Difficulty))
          .col(timestamp_with_time_zone(FlashcardReview::DueAt))
          .col(timestamp_with_time_zone(FlashcardReview::LastReviewedAt))
          .col(
            timestamp_with_time_zone(FlashcardReview::CreatedAt).default(Expr::current_timestamp()),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_flashcard_review_user")
              .from(FlashcardReview::Table, FlashcardReview::UserId)
              .to(AppUser::Table, AppUser::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_flashcard_review_flashcard")
              .from(FlashcardReview::Table, FlashcardReview::FlashcardId)
              .to(Flashcard::Table, Flashcard::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_flashcard_review_user_card")
          .table(FlashcardReview::Table)
          .col(FlashcardReview::UserId)
          .col(FlashcardReview::FlashcardId)
          .unique()
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_flashcard_review_user_module_due")
          .table(FlashcardReview::Table)
          .col(FlashcardReview::UserId)
          .col(FlashcardReview::ModuleId)
          .col(FlashcardReview::DueAt)
          .to_owned(),
      )
      .await?;

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(FlashcardReview::Table).to_owned())
      .await?;
    manager
      .drop_table(Table::drop().table(Flashcard::Table).to_owned())
      .await?;

    Ok(())
  }
}

#[derive(Iden)]
pub enum Flashcard {
  Table,

  Id,
  ModuleId,
  Term,
  Definition,
  Example,
  Phonetic,
  ImageKey,
  AudioKey,
  Position,
  CreatedAt,
}

#[derive(Iden)]
pub enum FlashcardReview {
  Table,

  Id,
  UserId,
  FlashcardId,
  ModuleId,
  // last SM-2 quality, 0..=5
  Quality,
  Repetitions,
  IntervalDays,
  EasinessFactor,
  Stability,
  Difficulty,
  DueAt,
  LastReviewedAt,
  CreatedAt,
}
