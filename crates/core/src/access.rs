use edulane_shared::{AppError, Role};
use uuid::Uuid;

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
  pub user_id: Uuid,
  pub role: Role,
}

impl Actor {
  #[must_use]
  pub const fn new(user_id: Uuid, role: Role) -> Self {
    Self { user_id, role }
  }

  #[must_use]
  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }

  pub fn require_role(&self, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&self.role) {
      Ok(())
    } else {
      Err(AppError::forbidden(format!(
        "role '{}' is not allowed to perform this action",
        self.role
      )))
    }
  }

  /// Admins manage everything; teachers manage what they own.
  #[must_use]
  pub fn can_manage(&self, owner_id: Uuid) -> bool {
    match self.role {
      Role::Admin => true,
      Role::Teacher => self.user_id == owner_id,
      Role::Learner => false,
    }
  }

  pub fn ensure_can_manage(&self, owner_id: Uuid, what: &str) -> Result<(), AppError> {
    if self.can_manage(owner_id) {
      Ok(())
    } else {
      Err(AppError::forbidden(format!("you cannot manage this {what}")))
    }
  }
}

#[cfg(test)]
mod tests {
  use edulane_shared::Role;
  use uuid::Uuid;

  use super::Actor;

  #[test]
  fn teachers_manage_only_their_own() {
    let owner = Uuid::now_v7();
    let teacher = Actor::new(owner, Role::Teacher);
    let other = Actor::new(Uuid::now_v7(), Role::Teacher);

    assert!(teacher.can_manage(owner));
    assert!(!other.can_manage(owner));
    assert!(Actor::new(Uuid::now_v7(), Role::Admin).can_manage(owner));
  }

  #[test]
  fn learners_never_manage() {
    let id = Uuid::now_v7();
    let learner = Actor::new(id, Role::Learner);
    assert!(!learner.can_manage(id));
    let err = learner.ensure_can_manage(id, "course").unwrap_err();
    assert_eq!(err.status_code().as_u16(), 403);
  }

  #[test]
  fn require_role_checks_membership() {
    let actor = Actor::new(Uuid::now_v7(), Role::Learner);
    assert!(actor.require_role(&[Role::Learner, Role::Teacher]).is_ok());
    assert!(actor.require_role(&[Role::Admin]).is_err());
  }
}
