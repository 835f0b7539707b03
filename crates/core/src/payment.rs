//! Checkout and confirmation of course and package purchases.
//!
//! The payment provider is outside the system: checkout records a pending payment, and
//! the provider later confirms it through the webhook, which calls [`Payment::confirm`].

use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use edulane_entities::{payment, teacher_subscription};
use edulane_shared::{AppError, Page, PageQuery, Role};
use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
  QueryOrder, QuerySelect, Set, prelude::Expr,
};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
  Actor,
  catalog::{find_course, is_enrolled},
  enrollment::Enrollment,
  notification::{NewNotification, Notification, NotificationKind},
  package::{Subscription, SubscriptionStatus, TeacherPackage},
};

pub const CURRENCY: &str = "usd";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Succeeded,
  Failed,
  Refunded,
}

/// What is being bought.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckoutTarget {
  Course { course_id: Uuid },
  Package { package_id: Uuid },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
  Succeeded,
  Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Purchase {
  Course(Uuid),
  Package(Uuid),
}

/// What a confirmation does to a stored payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settlement {
  /// Already settled; the stored payment is returned as is
  Unchanged,
  Fulfil(Purchase),
  Fail,
  /// Paid for a course that has since been deleted
  Orphaned,
}

fn settlement(model: &payment::Model, outcome: PaymentOutcome) -> Settlement {
  if model.status != PaymentStatus::Pending.as_ref() {
    return Settlement::Unchanged;
  }
  match (outcome, model.course_id, model.package_id) {
    (PaymentOutcome::Failed, _, _) => Settlement::Fail,
    (PaymentOutcome::Succeeded, Some(course_id), _) => {
      Settlement::Fulfil(Purchase::Course(course_id))
    }
    (PaymentOutcome::Succeeded, None, Some(package_id)) => {
      Settlement::Fulfil(Purchase::Package(package_id))
    }
    (PaymentOutcome::Succeeded, None, None) => Settlement::Orphaned,
  }
}

#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct Payment {
  pub id: Uuid,
  pub user_id: Uuid,
  pub course_id: Option<Uuid>,
  pub package_id: Option<Uuid>,
  pub amount_cents: i64,
  pub currency: String,
  pub status: PaymentStatus,
  pub provider_ref: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Payment {
  pub fn from_model(model: payment::Model) -> Result<Self, AppError> {
    Ok(Self {
      id: model.id,
      user_id: model.user_id,
      course_id: model.course_id,
      package_id: model.package_id,
      amount_cents: model.amount_cents,
      currency: model.currency,
      status: PaymentStatus::from_str(&model.status)
        .map_err(|_| anyhow!("unknown payment status '{}'", model.status))?,
      provider_ref: model.provider_ref,
      created_at: model.created_at.with_timezone(&Utc),
      updated_at: model.updated_at.with_timezone(&Utc),
    })
  }

  /// Record a pending payment for `target` at its current price.
  pub async fn checkout(
    actor: &Actor,
    target: CheckoutTarget,
    now: DateTime<Utc>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let (course_id, package_id, amount_cents) = match target {
      CheckoutTarget::Course { course_id } => {
        let course = find_course(course_id, db).await?;
        if !course.is_published {
          return Err(AppError::not_found("course not found"));
        }
        if course.teacher_id == actor.user_id {
          return Err(AppError::bad_request("you cannot buy your own course"));
        }
        if course.price_cents == 0 {
          return Err(AppError::bad_request("this course is free; enroll directly"));
        }
        if is_enrolled(actor.user_id, course_id, db).await? {
          return Err(AppError::conflict("you are already enrolled in this course"));
        }
        (Some(course_id), None, course.price_cents)
      }
      CheckoutTarget::Package { package_id } => {
        actor.require_role(&[Role::Teacher])?;
        let package = TeacherPackage::get(package_id, db).await?;
        if !package.is_active {
          return Err(AppError::bad_request("this package is no longer offered"));
        }
        (None, Some(package_id), package.price_cents)
      }
    };

    let model = payment::ActiveModel {
      id: Set(Uuid::now_v7()),
      user_id: Set(actor.user_id),
      course_id: Set(course_id),
      package_id: Set(package_id),
      amount_cents: Set(amount_cents),
      currency: Set(CURRENCY.to_owned()),
      status: Set(PaymentStatus::Pending.to_string()),
      provider_ref: Set(None),
      created_at: Set(now.into()),
      updated_at: Set(now.into()),
    }
    .insert(db)
    .await?;

    tracing::info!(payment_id = %model.id, user_id = %actor.user_id, amount_cents, "checkout started");

    Self::from_model(model)
  }

  /// Apply the provider's verdict. Only pending payments change; repeats return the
  /// stored payment. Runs under the system scope.
  pub async fn confirm(
    payment_id: Uuid,
    outcome: PaymentOutcome,
    provider_ref: Option<String>,
    now: DateTime<Utc>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let model = payment::Entity::find_by_id(payment_id)
      .lock_exclusive()
      .one(db)
      .await?
      .ok_or_else(|| AppError::not_found("payment not found"))?;

    let (status, title, body) = match settlement(&model, outcome) {
      Settlement::Unchanged => {
        tracing::debug!(%payment_id, status = %model.status, "payment already settled");
        return Self::from_model(model);
      }
      Settlement::Fulfil(purchase) => {
        let summary = Self::fulfil(model.user_id, purchase, now, db).await?;
        (
          PaymentStatus::Succeeded,
          "Payment received".to_owned(),
          summary,
        )
      }
      Settlement::Fail => (
        PaymentStatus::Failed,
        "Payment failed".to_owned(),
        "Your payment did not go through. No charge was made.".to_owned(),
      ),
      Settlement::Orphaned => {
        tracing::warn!(%payment_id, "paid item was deleted before confirmation");
        (
          PaymentStatus::Failed,
          "Payment could not be completed".to_owned(),
          "The item you paid for was removed before your payment cleared, so no access \
           was granted. The charge will be reversed."
            .to_owned(),
        )
      }
    };

    let user_id = model.user_id;
    let mut active: payment::ActiveModel = model.into();
    active.status = Set(status.to_string());
    active.provider_ref = Set(provider_ref);
    active.updated_at = Set(now.into());
    let model = active.update(db).await?;

    Notification::notify(
      NewNotification {
        user_id,
        kind: NotificationKind::Payment,
        title,
        body,
        link: Some("/payments".to_owned()),
      },
      db,
    )
    .await?;

    tracing::info!(%payment_id, %status, "payment settled");

    Self::from_model(model)
  }

  /// Grant what was paid for. Returns a line for the payer's notification.
  async fn fulfil(
    user_id: Uuid,
    purchase: Purchase,
    now: DateTime<Utc>,
    db: &impl ConnectionTrait,
  ) -> Result<String, AppError> {
    match purchase {
      Purchase::Course(course_id) => {
        let course = find_course(course_id, db).await?;
        Enrollment::grant(user_id, &course, now, db).await?;
        Ok(format!("You now have access to \"{}\".", course.title))
      }
      Purchase::Package(package_id) => {
        let package = TeacherPackage::get(package_id, db).await?;
        let subscription = Subscription::activate(user_id, &package, now, db).await?;
        Notification::notify(
          NewNotification {
            user_id,
            kind: NotificationKind::Subscription,
            title: format!("{} is active", package.name),
            body: format!(
              "Your plan runs until {}.",
              subscription.ends_at.format("%Y-%m-%d")
            ),
            link: Some("/teacher/subscription".to_owned()),
          },
          db,
        )
        .await?;
        Ok(format!("Your {} package is active.", package.name))
      }
    }
  }

  /// Admin refund of a settled payment. Withdraws the access it granted.
  pub async fn refund(
    actor: &Actor,
    payment_id: Uuid,
    now: DateTime<Utc>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    actor.require_role(&[Role::Admin])?;

    let model = payment::Entity::find_by_id(payment_id)
      .lock_exclusive()
      .one(db)
      .await?
      .ok_or_else(|| AppError::not_found("payment not found"))?;
    if model.status != PaymentStatus::Succeeded.as_ref() {
      return Err(AppError::conflict("only succeeded payments can be refunded"));
    }

    if let Some(course_id) = model.course_id {
      Enrollment::revoke(model.user_id, course_id, now, db).await?;
    }
    if let Some(package_id) = model.package_id {
      teacher_subscription::Entity::update_many()
        .col_expr(
          teacher_subscription::Column::Status,
          Expr::value(SubscriptionStatus::Cancelled.to_string()),
        )
        .filter(teacher_subscription::Column::TeacherId.eq(model.user_id))
        .filter(teacher_subscription::Column::PackageId.eq(package_id))
        .filter(teacher_subscription::Column::Status.eq(SubscriptionStatus::Active.as_ref()))
        .exec(db)
        .await?;
    }

    let user_id = model.user_id;
    let mut active: payment::ActiveModel = model.into();
    active.status = Set(PaymentStatus::Refunded.to_string());
    active.updated_at = Set(now.into());
    let model = active.update(db).await?;

    Notification::notify(
      NewNotification {
        user_id,
        kind: NotificationKind::Payment,
        title: "Payment refunded".to_owned(),
        body: format!(
          "{:.2} {} has been refunded.",
          model.amount_cents as f64 / 100.0,
          model.currency.to_uppercase()
        ),
        link: Some("/payments".to_owned()),
      },
      db,
    )
    .await?;

    tracing::info!(%payment_id, by = %actor.user_id, "payment refunded");

    Self::from_model(model)
  }

  pub async fn mine(
    actor: &Actor,
    page: &PageQuery,
    db: &impl ConnectionTrait,
  ) -> Result<Page<Self>, AppError> {
    let paginator = payment::Entity::find()
      .filter(payment::Column::UserId.eq(actor.user_id))
      .order_by_desc(payment::Column::CreatedAt)
      .paginate(db, page.per_page());
    let total = paginator.num_items().await?;
    let items = paginator
      .fetch_page(page.index())
      .await?
      .into_iter()
      .map(Self::from_model)
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Page::new(items, total, page))
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use edulane_entities::payment;
  use sea_orm::{DatabaseBackend, MockDatabase};
  use uuid::Uuid;

  use super::{
    CheckoutTarget, Payment, PaymentOutcome, PaymentStatus, Purchase, Settlement, settlement,
  };

  fn stored(
    status: PaymentStatus,
    course_id: Option<Uuid>,
    package_id: Option<Uuid>,
  ) -> payment::Model {
    let at = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
    payment::Model {
      id: Uuid::now_v7(),
      user_id: Uuid::now_v7(),
      course_id,
      package_id,
      amount_cents: 4900,
      currency: "usd".to_owned(),
      status: status.to_string(),
      provider_ref: Some("pi_1".to_owned()),
      created_at: at.into(),
      updated_at: at.into(),
    }
  }

  #[test]
  fn pending_payments_settle_by_outcome() {
    let course = Uuid::now_v7();
    let package = Uuid::now_v7();
    let for_course = stored(PaymentStatus::Pending, Some(course), None);
    let for_package = stored(PaymentStatus::Pending, None, Some(package));

    assert_eq!(
      settlement(&for_course, PaymentOutcome::Succeeded),
      Settlement::Fulfil(Purchase::Course(course))
    );
    assert_eq!(
      settlement(&for_package, PaymentOutcome::Succeeded),
      Settlement::Fulfil(Purchase::Package(package))
    );
    assert_eq!(settlement(&for_course, PaymentOutcome::Failed), Settlement::Fail);
  }

  #[test]
  fn settled_payments_are_left_alone() {
    for status in [PaymentStatus::Succeeded, PaymentStatus::Failed, PaymentStatus::Refunded] {
      let model = stored(status, Some(Uuid::now_v7()), None);
      assert_eq!(settlement(&model, PaymentOutcome::Succeeded), Settlement::Unchanged);
      assert_eq!(settlement(&model, PaymentOutcome::Failed), Settlement::Unchanged);
    }
  }

  #[test]
  fn payment_for_deleted_course_is_orphaned() {
    let model = stored(PaymentStatus::Pending, None, None);
    assert_eq!(settlement(&model, PaymentOutcome::Succeeded), Settlement::Orphaned);
    assert_eq!(settlement(&model, PaymentOutcome::Failed), Settlement::Fail);
  }

  #[tokio::test]
  async fn repeated_confirmation_only_reads() {
    let model = stored(PaymentStatus::Succeeded, Some(Uuid::now_v7()), None);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
      .append_query_results([vec![model.clone()]])
      .into_connection();

    let payment = Payment::confirm(
      model.id,
      PaymentOutcome::Failed,
      Some("pi_2".to_owned()),
      Utc::now(),
      &db,
    )
    .await
    .unwrap();

    assert_eq!(payment.status, PaymentStatus::Succeeded);
    assert_eq!(payment.provider_ref.as_deref(), Some("pi_1"));
    assert_eq!(db.into_transaction_log().len(), 1);
  }

  #[test]
  fn checkout_target_is_tagged() {
    let id = Uuid::now_v7();
    let target: CheckoutTarget =
      serde_json::from_str(&format!(r#"{{"type":"course","course_id":"{id}"}}"#)).unwrap();
    assert!(matches!(target, CheckoutTarget::Course { course_id } if course_id == id));

    let target: CheckoutTarget =
      serde_json::from_str(&format!(r#"{{"type":"package","package_id":"{id}"}}"#)).unwrap();
    assert!(matches!(target, CheckoutTarget::Package { package_id } if package_id == id));
  }

  #[test]
  fn outcome_and_status_wire_names() {
    let outcome: PaymentOutcome = serde_json::from_str("\"failed\"").unwrap();
    assert_eq!(outcome, PaymentOutcome::Failed);
    assert_eq!(PaymentStatus::Refunded.to_string(), "refunded");
    assert_eq!(
      serde_json::to_string(&PaymentStatus::Succeeded).unwrap(),
      "\"succeeded\""
    );
  }
}
