use chrono::{DateTime, Utc};
use edulane_entities::lecture;
use edulane_shared::AppError;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{ModuleKind, managed_module};
use crate::{
  Actor,
  media::{MediaField, MediaPlan, MediaPrefix},
};

#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct Lecture {
  pub module_id: Uuid,
  pub title: String,
  /// Rich text (HTML) body
  pub content: String,
  pub video_key: Option<String>,
  pub attachment_key: Option<String>,
  pub duration_seconds: Option<i32>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LectureInput {
  pub content: String,
  #[serde(default)]
  pub video: MediaField,
  #[serde(default)]
  pub attachment: MediaField,
  pub duration_seconds: Option<i32>,
}

impl Lecture {
  fn from_model(model: lecture::Model, title: &str) -> Self {
    Self {
      module_id: model.module_id,
      title: title.to_owned(),
      content: model.content,
      video_key: model.video_key,
      attachment_key: model.attachment_key,
      duration_seconds: model.duration_seconds,
      updated_at: model.updated_at.with_timezone(&Utc),
    }
  }

  pub(crate) async fn find(
    module_id: Uuid,
    title: &str,
    db: &impl ConnectionTrait,
  ) -> Result<Option<Self>, AppError> {
    Ok(
      lecture::Entity::find()
        .filter(lecture::Column::ModuleId.eq(module_id))
        .one(db)
        .await?
        .map(|model| Self::from_model(model, title)),
    )
  }

  /// Create or replace the body of a lecture module.
  pub async fn upsert(
    actor: &Actor,
    module_id: Uuid,
    input: LectureInput,
    media: &mut MediaPlan<'_>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let module = managed_module(actor, module_id, ModuleKind::Lecture, db).await?;
    if input.duration_seconds.is_some_and(|d| d < 0) {
      return Err(AppError::bad_request("duration must not be negative"));
    }

    let existing = lecture::Entity::find()
      .filter(lecture::Column::ModuleId.eq(module_id))
      .one(db)
      .await?;
    let (video, attachment) = existing
      .as_ref()
      .map(|m| (m.video_key.clone(), m.attachment_key.clone()))
      .unwrap_or_default();

    let video_key = media
      .apply(&input.video, video, MediaPrefix::Lectures, db)
      .await?;
    let attachment_key = media
      .apply(&input.attachment, attachment, MediaPrefix::Lectures, db)
      .await?;
    let now = Utc::now();

    let model = match existing {
      Some(model) => {
        let mut active: lecture::ActiveModel = model.into();
        active.content = Set(input.content);
        active.video_key = Set(video_key);
        active.attachment_key = Set(attachment_key);
        active.duration_seconds = Set(input.duration_seconds);
        active.updated_at = Set(now.into());
        active.update(db).await?
      }
      None => {
        lecture::ActiveModel {
          id: Set(Uuid::now_v7()),
          module_id: Set(module_id),
          content: Set(input.content),
          video_key: Set(video_key),
          attachment_key: Set(attachment_key),
          duration_seconds: Set(input.duration_seconds),
          updated_at: Set(now.into()),
        }
        .insert(db)
        .await?
      }
    };

    Ok(Self::from_model(model, &module.title))
  }
}
