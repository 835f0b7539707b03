use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Account role. Stored as lower-case text in `app_user.role` and mirrored into
/// the `app.current_role` session variable for row-level security.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Admin,
  Teacher,
  Learner,
}

impl Role {
  /// Roles a visitor may pick for themselves at registration.
  #[must_use]
  pub const fn is_self_assignable(self) -> bool {
    matches!(self, Self::Teacher | Self::Learner)
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::Role;

  #[test]
  fn parses_stored_text() {
    assert_eq!(Role::from_str("teacher").unwrap(), Role::Teacher);
    assert_eq!(Role::Admin.as_ref(), "admin");
    assert!(Role::from_str("Teacher").is_err());
  }

  #[test]
  fn admin_is_not_self_assignable() {
    assert!(!Role::Admin.is_self_assignable());
    assert!(Role::Learner.is_self_assignable());
  }
}
