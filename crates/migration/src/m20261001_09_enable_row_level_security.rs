use sea_orm_migration::{prelude::*, sea_orm::Statement};

/// Tables whose rows belong to a single learner (`user_id`).
const USER_SCOPED_TABLES: [&str; 9] = [
  "flashcard_review",
  "quiz_attempt",
  "essay_submission",
  "enrollment",
  "module_progress",
  "payment",
  "notification",
  "pronunciation_attempt",
  "user_streak",
];

/// Row filter shared by `USING` and `WITH CHECK`.
/// Both settings are transaction-local and set by the application per request.
const OWNER_PREDICATE: &str = "\
  user_id = NULLIF(current_setting('app.current_user_id', true), '')::uuid \
  OR current_setting('app.current_role', true) IN ('admin', 'teacher', 'system')";

async fn exec(manager: &SchemaManager<'_>, sql: String) -> Result<(), DbErr> {
  manager
    .get_connection()
    .execute_raw(Statement::from_string(manager.get_database_backend(), sql))
    .await?;
  Ok(())
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    for table in USER_SCOPED_TABLES {
      exec(manager, format!("ALTER TABLE {table} ENABLE ROW LEVEL SECURITY;")).await?;
      // The application connects as the table owner, which bypasses RLS unless forced.
      exec(manager, format!("ALTER TABLE {table} FORCE ROW LEVEL SECURITY;")).await?;
      exec(
        manager,
        format!(
          "CREATE POLICY {table}_owner ON {table} \
           USING ({OWNER_PREDICATE}) WITH CHECK ({OWNER_PREDICATE});"
        ),
      )
      .await?;
    }

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    for table in USER_SCOPED_TABLES {
      exec(manager, format!("DROP POLICY IF EXISTS {table}_owner ON {table};")).await?;
      exec(manager, format!("ALTER TABLE {table} NO FORCE ROW LEVEL SECURITY;")).await?;
      exec(manager, format!("ALTER TABLE {table} DISABLE ROW LEVEL SECURITY;")).await?;
    }

    Ok(())
  }
}
