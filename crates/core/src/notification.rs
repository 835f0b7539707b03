use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use chrono_humanize::HumanTime;
use edulane_entities::notification;
use edulane_shared::{AppError, Page, PageQuery};
use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
  QueryOrder, Set, prelude::Expr,
};
use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::Actor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
  Enrollment,
  NewStudent,
  Payment,
  EssayGraded,
  Subscription,
  System,
}

#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct Notification {
  pub id: Uuid,
  pub kind: NotificationKind,
  pub title: String,
  pub body: String,
  pub link: Option<String>,
  pub read_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  /// Human readable age, e.g. "2 hours ago"
  pub received: String,
}

/// A notification to be delivered.
#[derive(Debug, Clone)]
pub struct NewNotification {
  pub user_id: Uuid,
  pub kind: NotificationKind,
  pub title: String,
  pub body: String,
  pub link: Option<String>,
}

impl Notification {
  pub fn from_model(model: notification::Model) -> Result<Self, AppError> {
    let created_at = model.created_at.with_timezone(&Utc);
    Ok(Self {
      id: model.id,
      kind: NotificationKind::from_str(&model.kind)
        .map_err(|_| anyhow!("unknown notification kind '{}'", model.kind))?,
      title: model.title,
      body: model.body,
      link: model.link,
      read_at: model.read_at.map(|dt| dt.with_timezone(&Utc)),
      received: HumanTime::from(created_at.signed_duration_since(Utc::now())).to_string(),
      created_at,
    })
  }

  pub async fn notify(
    notification: NewNotification,
    db: &impl ConnectionTrait,
  ) -> Result<(), AppError> {
    tracing::debug!(
      user_id = %notification.user_id,
      kind = %notification.kind,
      "sending notification"
    );

    notification::ActiveModel {
      id: Set(Uuid::now_v7()),
      user_id: Set(notification.user_id),
      kind: Set(notification.kind.to_string()),
      title: Set(notification.title),
      body: Set(notification.body),
      link: Set(notification.link),
      read_at: Set(None),
      created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;

    Ok(())
  }

  pub async fn list(
    actor: &Actor,
    unread_only: bool,
    page: &PageQuery,
    db: &impl ConnectionTrait,
  ) -> Result<Page<Self>, AppError> {
    let mut query =
      notification::Entity::find().filter(notification::Column::UserId.eq(actor.user_id));
    if unread_only {
      query = query.filter(notification::Column::ReadAt.is_null());
    }

    let paginator = query
      .order_by_desc(notification::Column::CreatedAt)
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

  pub async fn unread_count(actor: &Actor, db: &impl ConnectionTrait) -> Result<u64, AppError> {
    Ok(
      notification::Entity::find()
        .filter(notification::Column::UserId.eq(actor.user_id))
        .filter(notification::Column::ReadAt.is_null())
        .count(db)
        .await?,
    )
  }

  pub async fn mark_read(actor: &Actor, id: Uuid, db: &impl ConnectionTrait) -> Result<(), AppError> {
    let res = notification::Entity::update_many()
      .col_expr(notification::Column::ReadAt, Expr::value(now_fixed()))
      .filter(notification::Column::Id.eq(id))
      .filter(notification::Column::UserId.eq(actor.user_id))
      .filter(notification::Column::ReadAt.is_null())
      .exec(db)
      .await?;

    if res.rows_affected == 0 {
      let exists = notification::Entity::find_by_id(id)
        .filter(notification::Column::UserId.eq(actor.user_id))
        .one(db)
        .await?
        .is_some();
      if !exists {
        return Err(AppError::not_found("notification not found"));
      }
    }

    Ok(())
  }

  /// Returns how many notifications were marked.
  pub async fn mark_all_read(actor: &Actor, db: &impl ConnectionTrait) -> Result<u64, AppError> {
    let res = notification::Entity::update_many()
      .col_expr(notification::Column::ReadAt, Expr::value(now_fixed()))
      .filter(notification::Column::UserId.eq(actor.user_id))
      .filter(notification::Column::ReadAt.is_null())
      .exec(db)
      .await?;

    Ok(res.rows_affected)
  }
}

fn now_fixed() -> Option<chrono::DateTime<chrono::FixedOffset>> {
  Some(Utc::now().into())
}
