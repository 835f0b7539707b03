//! Row-level security scoping.
//!
//! Learner-owned tables carry a forced RLS policy keyed on two transaction-local
//! settings, `app.current_user_id` and `app.current_role`. Every request that reads or
//! writes those tables opens its transaction through [`begin`], which sets both values
//! with `set_config(.., true)` (the `SET LOCAL` equivalent) before anything else runs.

use edulane_shared::AppError;
use sea_orm::{
  ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, Statement,
  TransactionTrait,
};
use uuid::Uuid;

use crate::Actor;

/// Role value that passes every policy. Used for webhooks and cross-user writes.
pub const SYSTEM_ROLE: &str = "system";

#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
  /// Rows are filtered to what this actor may see.
  Actor(&'a Actor),
  /// Unrestricted. Only after the service layer has authorised the caller.
  System,
}

impl<'a> Scope<'a> {
  fn settings(self) -> (Uuid, &'a str) {
    match self {
      Self::Actor(actor) => (actor.user_id, actor.role.as_ref()),
      Self::System => (Uuid::nil(), SYSTEM_ROLE),
    }
  }
}

fn session_statement(user_id: Uuid, role: &str) -> Statement {
  Statement::from_sql_and_values(
    DbBackend::Postgres,
    "SELECT set_config('app.current_user_id', $1, true), set_config('app.current_role', $2, true)",
    [user_id.to_string().into(), role.to_owned().into()],
  )
}

/// Open a transaction with the RLS session variables of `scope` applied.
pub async fn begin(db: &DatabaseConnection, scope: Scope<'_>) -> Result<DatabaseTransaction, AppError> {
  let (user_id, role) = scope.settings();
  let txn = db.begin().await?;
  txn.execute_raw(session_statement(user_id, role)).await?;

  tracing::trace!(%user_id, role, "rls scope applied");

  Ok(txn)
}

/// Shorthand for [`begin`] with [`Scope::System`].
pub async fn begin_system(db: &DatabaseConnection) -> Result<DatabaseTransaction, AppError> {
  begin(db, Scope::System).await
}

#[cfg(test)]
mod tests {
  use edulane_shared::Role;
  use uuid::Uuid;

  use super::{Scope, session_statement};
  use crate::Actor;

  #[test]
  fn actor_scope_uses_actor_identity() {
    let actor = Actor::new(Uuid::now_v7(), Role::Learner);
    let scope = Scope::Actor(&actor);
    let (user_id, role) = scope.settings();
    assert_eq!(user_id, actor.user_id);
    assert_eq!(role, "learner");
  }

  #[test]
  fn system_scope_uses_nil_user() {
    let (user_id, role) = Scope::System.settings();
    assert!(user_id.is_nil());
    assert_eq!(role, "system");
  }

  #[test]
  fn settings_are_transaction_local() {
    let stmt = session_statement(Uuid::nil(), "admin");
    assert!(stmt.sql.contains("set_config('app.current_user_id', $1, true)"));
    assert!(stmt.sql.contains("set_config('app.current_role', $2, true)"));
  }
}
