use sea_orm_migration::{
  prelude::*,
  schema::{string, string_null, text, timestamp_with_time_zone, uuid},
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(AppUser::Table)
          .if_not_exists()
          .col(uuid(AppUser::Id).primary_key())
          .col(string(AppUser::Email).unique_key())
          .col(string(AppUser::DisplayName))
          .col(text(AppUser::PasswordHash))
          .col(string(AppUser::Role))
          .col(string_null(AppUser::AvatarKey))
          .col(timestamp_with_time_zone(AppUser::CreatedAt).default(Expr::current_timestamp()))
          .col(timestamp_with_time_zone(AppUser::UpdatedAt).default(Expr::current_timestamp()))
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(UserSession::Table)
          .if_not_exists()
          .col(uuid(UserSession::Token).primary_key())
          .col(uuid(UserSession::UserId))
          .col(timestamp_with_time_zone(UserSession::ExpiresAt))
          .col(timestamp_with_time_zone(UserSession::CreatedAt).default(Expr::current_timestamp()))
          .foreign_key(
            ForeignKey::create()
              .name("fk_user_session_user")
              .from(UserSession::Table, UserSession::UserId)
              .to(AppUser::Table, AppUser::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_user_session_user")
          .table(UserSession::Table)
          .col(UserSession::UserId)
          .to_owned(),
      )
      .await?;

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(UserSession::Table).to_owned())
      .await?;
    manager
      .drop_table(Table::drop().table(AppUser::Table).to_owned())
      .await?;

    Ok(())
  }
}

#[derive(Iden)]
pub enum AppUser {
  Table,

  Id, // uuid v7
  // lower-cased, unique
  Email,
  DisplayName,
  // argon2 PHC string
  PasswordHash,
  // admin | teacher | learner
  Role,
  AvatarKey,
  CreatedAt,
  UpdatedAt,
}

#[derive(Iden)]
pub enum UserSession {
  Table,

  Token, // uuid v4
  UserId,
  ExpiresAt,
  CreatedAt,
}
