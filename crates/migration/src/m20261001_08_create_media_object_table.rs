use sea_orm_migration::{
  prelude::*,
  sea_orm::Statement,
  schema::{big_integer, string, timestamp_with_time_zone, timestamp_with_time_zone_null, uuid},
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(MediaObject::Table)
          .if_not_exists()
          .col(string(MediaObject::Key).primary_key())
          .col(uuid(MediaObject::OwnerId))
          .col(string(MediaObject::ContentType))
          .col(big_integer(MediaObject::SizeBytes))
          .col(string(MediaObject::Status))
          .col(timestamp_with_time_zone(MediaObject::CreatedAt).default(Expr::current_timestamp()))
          .col(timestamp_with_time_zone_null(MediaObject::CommittedAt))
          .to_owned(),
      )
      .await?;

    manager
      .get_connection()
      .execute_raw(Statement::from_string(
        manager.get_database_backend(),
        "CREATE INDEX idx_media_object_temp_created ON media_object (created_at) WHERE status = 'temp';",
      ))
      .await?;

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(MediaObject::Table).to_owned())
      .await
  }
}

#[derive(Iden)]
pub enum MediaObject {
  Table,

  // object key, e.g. tmp/<uuid>.png or courses/<uuid>.png
  Key,
  OwnerId,
  ContentType,
  SizeBytes,
  // temp | committed
  Status,
  CreatedAt,
  CommittedAt,
}
