mod review;
mod scheduler;

pub use review::{DeckStats, DueCard, Review, ReviewState};
pub use scheduler::{CardState, Quality, ReviewScheduler};

use chrono::{DateTime, Utc};
use edulane_entities::flashcard;
use edulane_shared::AppError;
use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ExprTrait, PaginatorTrait,
  QueryFilter, QueryOrder, QuerySelect, Set, prelude::Expr,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
  Actor,
  catalog::{ModuleKind, managed_module, validate_reorder},
  media::{MediaField, MediaPlan, MediaPrefix},
};

#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct Flashcard {
  pub id: Uuid,
  pub module_id: Uuid,
  pub term: String,
  pub definition: String,
  pub example: Option<String>,
  pub phonetic: Option<String>,
  pub image_key: Option<String>,
  pub audio_key: Option<String>,
  pub position: i32,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FlashcardInput {
  pub term: String,
  pub definition: String,
  pub example: Option<String>,
  pub phonetic: Option<String>,
  #[serde(default)]
  pub image: MediaField,
  #[serde(default)]
  pub audio: MediaField,
}

fn required(value: &str, what: &str) -> Result<String, AppError> {
  let value = value.trim();
  if value.is_empty() {
    return Err(AppError::bad_request(format!("{what} must not be empty")));
  }
  Ok(value.to_owned())
}

fn optional(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}

impl Flashcard {
  #[must_use]
  pub fn from_model(model: flashcard::Model) -> Self {
    Self {
      id: model.id,
      module_id: model.module_id,
      term: model.term,
      definition: model.definition,
      example: model.example,
      phonetic: model.phonetic,
      image_key: model.image_key,
      audio_key: model.audio_key,
      position: model.position,
      created_at: model.created_at.with_timezone(&Utc),
    }
  }

  pub(crate) async fn find(id: Uuid, db: &impl ConnectionTrait) -> Result<flashcard::Model, AppError> {
    flashcard::Entity::find_by_id(id)
      .one(db)
      .await?
      .ok_or_else(|| AppError::not_found("flashcard not found"))
  }

  /// Cards of a deck in order. Access is checked by the caller.
  pub(crate) async fn list(module_id: Uuid, db: &impl ConnectionTrait) -> Result<Vec<Self>, AppError> {
    Ok(
      flashcard::Entity::find()
        .filter(flashcard::Column::ModuleId.eq(module_id))
        .order_by_asc(flashcard::Column::Position)
        .all(db)
        .await?
        .into_iter()
        .map(Self::from_model)
        .collect(),
    )
  }

  pub async fn create(
    actor: &Actor,
    module_id: Uuid,
    input: FlashcardInput,
    media: &mut MediaPlan<'_>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    managed_module(actor, module_id, ModuleKind::Flashcard, db).await?;
    let term = required(&input.term, "term")?;
    let definition = required(&input.definition, "definition")?;

    let image_key = media
      .apply(&input.image, None, MediaPrefix::Flashcards, db)
      .await?;
    let audio_key = media
      .apply(&input.audio, None, MediaPrefix::Flashcards, db)
      .await?;

    let position = flashcard::Entity::find()
      .filter(flashcard::Column::ModuleId.eq(module_id))
      .count(db)
      .await?;

    let model = flashcard::ActiveModel {
      id: Set(Uuid::now_v7()),
      module_id: Set(module_id),
      term: Set(term),
      definition: Set(definition),
      example: Set(optional(input.example)),
      phonetic: Set(optional(input.phonetic)),
      image_key: Set(image_key),
      audio_key: Set(audio_key),
      position: Set(i32::try_from(position).unwrap_or(i32::MAX)),
      created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;

    Ok(Self::from_model(model))
  }

  pub async fn update(
    actor: &Actor,
    id: Uuid,
    input: FlashcardInput,
    media: &mut MediaPlan<'_>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let model = Self::find(id, db).await?;
    managed_module(actor, model.module_id, ModuleKind::Flashcard, db).await?;

    let image_key = media
      .apply(&input.image, model.image_key.clone(), MediaPrefix::Flashcards, db)
      .await?;
    let audio_key = media
      .apply(&input.audio, model.audio_key.clone(), MediaPrefix::Flashcards, db)
      .await?;

    let mut active: flashcard::ActiveModel = model.into();
    active.term = Set(required(&input.term, "term")?);
    active.definition = Set(required(&input.definition, "definition")?);
    active.example = Set(optional(input.example));
    active.phonetic = Set(optional(input.phonetic));
    active.image_key = Set(image_key);
    active.audio_key = Set(audio_key);

    Ok(Self::from_model(active.update(db).await?))
  }

  /// Returns the card's media keys for removal.
  pub async fn delete(actor: &Actor, id: Uuid, db: &impl ConnectionTrait) -> Result<Vec<String>, AppError> {
    let model = Self::find(id, db).await?;
    managed_module(actor, model.module_id, ModuleKind::Flashcard, db).await?;

    flashcard::Entity::delete_by_id(id).exec(db).await?;
    flashcard::Entity::update_many()
      .col_expr(
        flashcard::Column::Position,
        Expr::col(flashcard::Column::Position).sub(1),
      )
      .filter(flashcard::Column::ModuleId.eq(model.module_id))
      .filter(flashcard::Column::Position.gt(model.position))
      .exec(db)
      .await?;

    Ok(model.image_key.into_iter().chain(model.audio_key).collect())
  }

  pub async fn reorder(
    actor: &Actor,
    module_id: Uuid,
    ids: &[Uuid],
    db: &impl ConnectionTrait,
  ) -> Result<Vec<Self>, AppError> {
    managed_module(actor, module_id, ModuleKind::Flashcard, db).await?;

    let existing: Vec<Uuid> = flashcard::Entity::find()
      .select_only()
      .column(flashcard::Column::Id)
      .filter(flashcard::Column::ModuleId.eq(module_id))
      .into_tuple()
      .all(db)
      .await?;
    validate_reorder(&existing, ids)?;

    for (position, id) in ids.iter().enumerate() {
      flashcard::Entity::update_many()
        .col_expr(
          flashcard::Column::Position,
          Expr::value(i32::try_from(position).unwrap_or(i32::MAX)),
        )
        .filter(flashcard::Column::Id.eq(*id))
        .exec(db)
        .await?;
    }

    Self::list(module_id, db).await
  }
}

#[cfg(test)]
mod tests {
  use super::{FlashcardInput, optional, required};
  use crate::media::MediaField;

  #[test]
  fn blank_optional_fields_become_none() {
    assert_eq!(optional(Some("  ".into())), None);
    assert_eq!(optional(Some(" /ˈhɛloʊ/ ".into())).as_deref(), Some("/ˈhɛloʊ/"));
    assert!(required("", "term").is_err());
  }

  #[test]
  fn media_slots_default_to_keep() {
    let input: FlashcardInput =
      serde_json::from_str(r#"{"term":"hello","definition":"xin chào"}"#).unwrap();
    assert_eq!(input.image, MediaField::Keep);
    assert_eq!(input.audio, MediaField::Keep);
  }
}
