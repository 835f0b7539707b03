use sea_orm_migration::{
  prelude::*,
  sea_orm::Statement,
  schema::{
    date, double, integer, json_binary, string, string_null, text, timestamp_with_time_zone,
    timestamp_with_time_zone_null, uuid, uuid_null,
  },
};

use crate::{
  m20261001_01_create_account_tables::AppUser, m20261001_04_create_flashcard_tables::Flashcard,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(PronunciationAttempt::Table)
          .if_not_exists()
          .col(uuid(PronunciationAttempt::Id).primary_key())
          .col(uuid(PronunciationAttempt::UserId))
          .col(uuid_null(PronunciationAttempt::FlashcardId))
          .col(text(PronunciationAttempt::ReferenceText))
          .col(text(PronunciationAttempt::RecognizedText))
          .col(string_null(PronunciationAttempt::AudioKey))
          .col(double(PronunciationAttempt::Accuracy))
          .col(double(PronunciationAttempt::Completeness))
          .col(double(PronunciationAttempt::Fluency))
          .col(double(PronunciationAttempt::Overall))
          .col(json_binary(PronunciationAttempt::Words))
          .col(
            timestamp_with_time_zone(PronunciationAttempt::CreatedAt)
              .default(Expr::current_timestamp()),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_pronunciation_attempt_user")
              .from(PronunciationAttempt::Table, PronunciationAttempt::UserId)
              .to(AppUser::Table, AppUser::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_pronunciation_attempt_flashcard")
              .from(PronunciationAttempt::Table, PronunciationAttempt::FlashcardId)
              .to(Flashcard::Table, Flashcard::Id)
              .on_delete(ForeignKeyAction::SetNull),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(Notification::Table)
          .if_not_exists()
          .col(uuid(Notification::Id).primary_key())
          .col(uuid(Notification::UserId))
          .col(string(Notification::Kind))
          .col(string(Notification::Title))
          .col(text(Notification::Body))
          .col(string_null(Notification::Link))
          .col(timestamp_with_time_zone_null(Notification::ReadAt))
          .col(timestamp_with_time_zone(Notification::CreatedAt).default(Expr::current_timestamp()))
          .foreign_key(
            ForeignKey::create()
              .name("fk_notification_user")
              .from(Notification::Table, Notification::UserId)
              .to(AppUser::Table, AppUser::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    // Partial index for the unread badge
    manager
      .get_connection()
      .execute_raw(Statement::from_string(
        manager.get_database_backend(),
        "CREATE INDEX idx_notification_user_unread ON notification (user_id, created_at DESC) WHERE read_at IS NULL;",
      ))
      .await?;

    manager
      .create_table(
        Table::create()
          .table(UserStreak::Table)
          .if_not_exists()
          .col(uuid(UserStreak::UserId).primary_key())
          .col(integer(UserStreak::CurrentStreak))
          .col(integer(UserStreak::LongestStreak))
          .col(date(UserStreak::LastActiveOn))
          .col(timestamp_with_time_zone(UserStreak::UpdatedAt).default(Expr::current_timestamp()))
          .foreign_key(
            ForeignKey::create()
              .name("fk_user_streak_user")
              .from(UserStreak::Table, UserStreak::UserId)
              .to(AppUser::Table, AppUser::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(UserStreak::Table).to_owned())
      .await?;
    manager
      .drop_table(Table::drop().table(Notification::Table).to_owned())
      .await?;
    manager
      .drop_table(Table::drop().table(PronunciationAttempt::Table).to_owned())
      .await?;

    Ok(())
  }
}

#[derive(Iden)]
pub enum PronunciationAttempt {
  Table,

  Id,
  UserId,
  FlashcardId,
  ReferenceText,
  RecognizedText,
  AudioKey,
  // scores, 0..=100
  Accuracy,
  Completeness,
  Fluency,
  Overall,
  // per-word alignment
  Words,
  CreatedAt,
}

#[derive(Iden)]
pub enum Notification {
  Table,

  Id,
  UserId,
  Kind,
  Title,
  Body,
  Link,
  ReadAt,
  CreatedAt,
}

#[derive(Iden)]
pub enum UserStreak {
  Table,

  UserId,
  CurrentStreak,
  LongestStreak,
  // UTC date
  LastActiveOn,
  UpdatedAt,
}
