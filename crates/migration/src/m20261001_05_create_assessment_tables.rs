use sea_orm_migration::{
  prelude::*,
  schema::{
    boolean_null, double, double_null, integer, integer_null, json_binary, json_binary_null,
    string, string_null, text, text_null, timestamp_with_time_zone, timestamp_with_time_zone_null,
    uuid, uuid_null,
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
          .table(Assessment::Table)
          .if_not_exists()
          .col(uuid(Assessment::Id).primary_key())
          .col(uuid(Assessment::ModuleId).unique_key())
          .col(string(Assessment::Title))
          .col(text(Assessment::Description).default(""))
          .col(double(Assessment::PassScore))
          .col(integer_null(Assessment::TimeLimitMinutes))
          .col(integer_null(Assessment::MaxAttempts))
          .col(timestamp_with_time_zone(Assessment::CreatedAt).default(Expr::current_timestamp()))
          .col(timestamp_with_time_zone(Assessment::UpdatedAt).default(Expr::current_timestamp()))
          .foreign_key(
            ForeignKey::create()
              .name("fk_assessment_module")
              .from(Assessment::Table, Assessment::ModuleId)
              .to(LessonModule::Table, LessonModule::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(QuizQuestion::Table)
          .if_not_exists()
          .col(uuid(QuizQuestion::Id).primary_key())
          .col(uuid(QuizQuestion::AssessmentId))
          .col(string(QuizQuestion::Kind))
          .col(text(QuizQuestion::Prompt))
          .col(json_binary(QuizQuestion::Options))
          .col(json_binary(QuizQuestion::AcceptedAnswers))
          .col(double(QuizQuestion::Points))
          .col(integer(QuizQuestion::Position))
          .col(text_null(QuizQuestion::Explanation))
          .col(string_null(QuizQuestion::ImageKey))
          .col(timestamp_with_time_zone(QuizQuestion::CreatedAt).default(Expr::current_timestamp()))
          .foreign_key(
            ForeignKey::create()
              .name("fk_quiz_question_assessment")
              .from(QuizQuestion::Table, QuizQuestion::AssessmentId)
              .to(Assessment::Table, Assessment::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_quiz_question_assessment_position")
          .table(QuizQuestion::Table)
          .col(QuizQuestion::AssessmentId)
          .col(QuizQuestion::Position)
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(EssayPrompt::Table)
          .if_not_exists()
          .col(uuid(EssayPrompt::Id).primary_key())
          .col(uuid(EssayPrompt::AssessmentId).unique_key())
          .col(text(EssayPrompt::Prompt))
          .col(double(EssayPrompt::MaxScore))
          .col(integer_null(EssayPrompt::MinWords))
          .col(integer_null(EssayPrompt::MaxWords))
          .col(timestamp_with_time_zone(EssayPrompt::CreatedAt).default(Expr::current_timestamp()))
          .col(timestamp_with_time_zone(EssayPrompt::UpdatedAt).default(Expr::current_timestamp()))
          .foreign_key(
            ForeignKey::create()
              .name("fk_essay_prompt_assessment")
              .from(EssayPrompt::Table, EssayPrompt::AssessmentId)
              .to(Assessment::Table, Assessment::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(QuizAttempt::Table)
          .if_not_exists()
          .col(uuid(QuizAttempt::Id).primary_key())
          .col(uuid(QuizAttempt::AssessmentId))
          .col(uuid(QuizAttempt::UserId))
          .col(string(QuizAttempt::Status))
          .col(json_binary_null(QuizAttempt::Answers))
          .col(json_binary_null(QuizAttempt::Results))
          .col(double_null(QuizAttempt::Score))
          .col(double_null(QuizAttempt::MaxScore))
          .col(boolean_null(QuizAttempt::Passed))
          .col(timestamp_with_time_zone(QuizAttempt::StartedAt))
          .col(timestamp_with_time_zone_null(QuizAttempt::SubmittedAt))
          .foreign_key(
            ForeignKey::create()
              .name("fk_quiz_attempt_assessment")
              .from(QuizAttempt::Table, QuizAttempt::AssessmentId)
              .to(Assessment::Table, Assessment::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_quiz_attempt_user")
              .from(QuizAttempt::Table, QuizAttempt::UserId)
              .to(AppUser::Table, AppUser::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_quiz_attempt_user_assessment")
          .table(QuizAttempt::Table)
          .col(QuizAttempt::UserId)
          .col(QuizAttempt::AssessmentId)
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(EssaySubmission::Table)
          .if_not_exists()
          .col(uuid(EssaySubmission::Id).primary_key())
          .col(uuid(EssaySubmission::EssayId))
          .col(uuid(EssaySubmission::UserId))
          .col(text(EssaySubmission::Content))
          .col(string_null(EssaySubmission::AttachmentKey))
          .col(string(EssaySubmission::Status))
          .col(double_null(EssaySubmission::Score))
          .col(text_null(EssaySubmission::Feedback))
          .col(uuid_null(EssaySubmission::GradedBy))
          .col(timestamp_with_time_zone(EssaySubmission::SubmittedAt))
          .col(timestamp_with_time_zone_null(EssaySubmission::GradedAt))
          .foreign_key(
            ForeignKey::create()
              .name("fk_essay_submission_essay")
              .from(EssaySubmission::Table, EssaySubmission::EssayId)
              .to(EssayPrompt::Table, EssayPrompt::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_essay_submission_user")
              .from(EssaySubmission::Table, EssaySubmission::UserId)
              .to(AppUser::Table, AppUser::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_essay_submission_essay_user")
          .table(EssaySubmission::Table)
          .col(EssaySubmission::EssayId)
          .col(EssaySubmission::UserId)
          .to_owned(),
      )
      .await?;

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(EssaySubmission::Table).to_owned())
      .await?;
    manager
      .drop_table(Table::drop().table(QuizAttempt::Table).to_owned())
      .await?;
    manager
      .drop_table(Table::drop().table(EssayPrompt::Table).to_owned())
      .await?;
    manager
      .drop_table(Table::drop().table(QuizQuestion::Table).to_owned())
      .await?;
    manager
      .drop_table(Table::drop().table(Assessment::Table).to_owned())
      .await?;

    Ok(())
  }
}

#[derive(Iden)]
pub enum Assessment {
  Table,

  Id,
  ModuleId,
  Title,
  Description,
  // percent, 0..=100
  PassScore,
  TimeLimitMinutes,
  MaxAttempts,
  CreatedAt,
  UpdatedAt,
}

#[derive(Iden)]
pub enum QuizQuestion {
  Table,

  Id,
  AssessmentId,
  // single_choice | multiple_choice | fill_blank
  Kind,
  Prompt,
  // [{ "text": .., "is_correct": .. }]
  Options,
  // fill_blank only
  AcceptedAnswers,
  Points,
  Position,
  Explanation,
  ImageKey,
  CreatedAt,
}

#[derive(Iden)]
pub enum EssayPrompt {
  Table,

  Id,
  AssessmentId,
  Prompt,
  MaxScore,
  MinWords,
  MaxWords,
  CreatedAt,
  UpdatedAt,
}

#[derive(Iden)]
pub enum QuizAttempt {
  Table,

  Id,
  AssessmentId,
  UserId,
  // in_progress | submitted
  Status,
  Answers,
  // per-question grading
  Results,
  Score,
  MaxScore,
  Passed,
  StartedAt,
  SubmittedAt,
}

#[derive(Iden)]
pub enum EssaySubmission {
  Table,

  Id,
  EssayId,
  UserId,
  Content,
  AttachmentKey,
  // submitted | graded
  Status,
  Score,
  Feedback,
  GradedBy,
  SubmittedAt,
  GradedAt,
}
