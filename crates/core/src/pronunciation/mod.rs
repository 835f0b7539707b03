mod scoring;
pub use scoring::{PronunciationScore, WordResult, WordStatus, score};

use chrono::{DateTime, Utc};
use edulane_entities::pronunciation_attempt;
use edulane_shared::{AppError, Page, PageQuery};
use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
  QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
  Actor,
  catalog::{ModuleKind, ensure_kind, find_module, module_access},
  flashcard::Flashcard,
  media::{MediaField, MediaPlan, MediaPrefix},
  streak::Streak,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct PronunciationInput {
  /// Practise a flashcard's term; takes precedence over `reference_text`
  pub flashcard_id: Option<Uuid>,
  pub reference_text: Option<String>,
  /// Transcript produced by the client's speech recogniser
  pub recognized_text: String,
  pub duration_ms: Option<u32>,
  #[serde(default)]
  pub audio: MediaField,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PronunciationAttempt {
  pub id: Uuid,
  pub flashcard_id: Option<Uuid>,
  pub reference_text: String,
  pub recognized_text: String,
  pub audio_key: Option<String>,
  #[serde(flatten)]
  pub score: PronunciationScore,
  pub created_at: DateTime<Utc>,
}

impl PronunciationAttempt {
  fn from_model(model: pronunciation_attempt::Model) -> Result<Self, AppError> {
    Ok(Self {
      id: model.id,
      flashcard_id: model.flashcard_id,
      reference_text: model.reference_text,
      recognized_text: model.recognized_text,
      audio_key: model.audio_key,
      score: PronunciationScore {
        accuracy: model.accuracy,
        completeness: model.completeness,
        fluency: model.fluency,
        overall: model.overall,
        words: serde_json::from_value(model.words)?,
      },
      created_at: model.created_at.with_timezone(&Utc),
    })
  }

  /// Score and store one practice attempt.
  pub async fn record(
    actor: &Actor,
    input: PronunciationInput,
    media: &mut MediaPlan<'_>,
    now: DateTime<Utc>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let reference_text = match (input.flashcard_id, input.reference_text) {
      (Some(flashcard_id), _) => {
        let card = Flashcard::find(flashcard_id, db).await?;
        let module = find_module(card.module_id, db).await?;
        ensure_kind(&module, ModuleKind::Flashcard)?;
        module_access(actor, &module, db).await?;
        card.term
      }
      (None, Some(text)) => text.trim().to_owned(),
      (None, None) => {
        return Err(AppError::bad_request(
          "either flashcard_id or reference_text is required",
        ));
      }
    };

    let score = score(&reference_text, &input.recognized_text, input.duration_ms)?;
    let audio_key = media
      .apply(&input.audio, None, MediaPrefix::Pronunciation, db)
      .await?;

    let model = pronunciation_attempt::ActiveModel {
      id: Set(Uuid::now_v7()),
      user_id: Set(actor.user_id),
      flashcard_id: Set(input.flashcard_id),
      reference_text: Set(reference_text),
      recognized_text: Set(input.recognized_text),
      audio_key: Set(audio_key),
      accuracy: Set(score.accuracy),
      completeness: Set(score.completeness),
      fluency: Set(score.fluency),
      overall: Set(score.overall),
      words: Set(serde_json::to_value(&score.words)?),
      created_at: Set(now.into()),
    }
    .insert(db)
    .await?;

    tracing::debug!(
      attempt_id = %model.id,
      user_id = %actor.user_id,
      overall = score.overall,
      "pronunciation scored"
    );

    Streak::record_activity(actor.user_id, now, db).await?;

    Self::from_model(model)
  }

  /// The actor's attempts, newest first, optionally for one flashcard.
  pub async fn history(
    actor: &Actor,
    flashcard_id: Option<Uuid>,
    page: &PageQuery,
    db: &impl ConnectionTrait,
  ) -> Result<Page<Self>, AppError> {
    let mut query = pronunciation_attempt::Entity::find()
      .filter(pronunciation_attempt::Column::UserId.eq(actor.user_id));
    if let Some(flashcard_id) = flashcard_id {
      query = query.filter(pronunciation_attempt::Column::FlashcardId.eq(flashcard_id));
    }

    let paginator = query
      .order_by_desc(pronunciation_attempt::Column::CreatedAt)
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
