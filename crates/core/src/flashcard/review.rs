use std::collections::HashMap;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use edulane_entities::flashcard_review;
use edulane_shared::AppError;
use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
  sea_query::OnConflict,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{CardState, Flashcard, Quality, ReviewScheduler};
use crate::{
  Actor,
  catalog::{ModuleKind, ensure_kind, find_module, module_access},
  streak::Streak,
};

/// Largest batch `due` hands out at once.
pub const MAX_DUE_BATCH: u64 = 100;

#[derive(Debug, Serialize, Clone, PartialEq, ToSchema)]
pub struct ReviewState {
  pub quality: i16,
  pub repetitions: i32,
  pub interval_days: i32,
  pub easiness_factor: f64,
  pub due_at: DateTime<Utc>,
  pub last_reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Review {
  pub flashcard_id: Uuid,
  pub state: ReviewState,
  pub streak: Streak,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DueCard {
  pub card: Flashcard,
  /// `None` for cards never reviewed
  pub review: Option<ReviewState>,
}

#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq, Eq, ToSchema)]
pub struct DeckStats {
  pub total: u64,
  pub new: u64,
  pub due: u64,
  pub learned: u64,
}

impl ReviewState {
  fn from_model(model: &flashcard_review::Model) -> Self {
    Self {
      quality: model.quality,
      repetitions: model.repetitions,
      interval_days: model.interval_days,
      easiness_factor: model.easiness_factor,
      due_at: model.due_at.with_timezone(&Utc),
      last_reviewed_at: model.last_reviewed_at.with_timezone(&Utc),
    }
  }

  fn is_due(&self, now: DateTime<Utc>) -> bool {
    self.due_at <= now
  }
}

/// Due cards (oldest due first), then new cards in deck order.
fn study_queue(
  cards: Vec<Flashcard>,
  mut reviews: HashMap<Uuid, ReviewState>,
  now: DateTime<Utc>,
  limit: usize,
) -> Vec<DueCard> {
  let mut due = Vec::new();
  let mut fresh = Vec::new();
  for card in cards {
    match reviews.remove(&card.id) {
      Some(review) if review.is_due(now) => due.push(DueCard {
        card,
        review: Some(review),
      }),
      Some(_) => {}
      None => fresh.push(DueCard { card, review: None }),
    }
  }

  due.sort_by_key(|c| c.review.as_ref().map(|r| r.due_at));
  fresh.sort_by_key(|c| c.card.position);
  due.into_iter().chain(fresh).take(limit).collect()
}

fn tally(card_ids: &[Uuid], reviews: &HashMap<Uuid, ReviewState>, now: DateTime<Utc>) -> DeckStats {
  card_ids
    .iter()
    .fold(DeckStats::default(), |mut stats, id| {
      stats.total += 1;
      match reviews.get(id) {
        None => stats.new += 1,
        Some(review) if review.is_due(now) => stats.due += 1,
        Some(review) if review.repetitions >= 1 => stats.learned += 1,
        Some(_) => {}
      }
      stats
    })
}

async fn reviews_in_module(
  user_id: Uuid,
  module_id: Uuid,
  db: &impl ConnectionTrait,
) -> Result<HashMap<Uuid, ReviewState>, AppError> {
  Ok(
    flashcard_review::Entity::find()
      .filter(flashcard_review::Column::UserId.eq(user_id))
      .filter(flashcard_review::Column::ModuleId.eq(module_id))
      .all(db)
      .await?
      .iter()
      .map(|model| (model.flashcard_id, ReviewState::from_model(model)))
      .collect(),
  )
}

async fn open_deck(
  actor: &Actor,
  module_id: Uuid,
  db: &impl ConnectionTrait,
) -> Result<(), AppError> {
  let module = find_module(module_id, db).await?;
  ensure_kind(&module, ModuleKind::Flashcard)?;
  module_access(actor, &module, db).await?;
  Ok(())
}

impl Review {
  /// Grade one card and reschedule it.
  pub async fn submit(
    actor: &Actor,
    flashcard_id: Uuid,
    quality: i32,
    scheduler: ReviewScheduler,
    now: DateTime<Utc>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let quality = Quality::new(quality)?;
    let card = Flashcard::find(flashcard_id, db).await?;
    open_deck(actor, card.module_id, db).await?;

    let existing = flashcard_review::Entity::find()
      .filter(flashcard_review::Column::UserId.eq(actor.user_id))
      .filter(flashcard_review::Column::FlashcardId.eq(flashcard_id))
      .lock_exclusive()
      .one(db)
      .await?;

    let current = existing.as_ref().map_or(CardState::NEW, |model| CardState {
      repetitions: model.repetitions,
      interval_days: model.interval_days,
      easiness_factor: model.easiness_factor,
      stability: model.stability,
      difficulty: model.difficulty,
      last_reviewed_at: Some(model.last_reviewed_at.with_timezone(&Utc)),
    });
    let next = scheduler.schedule(&current, quality, now)?;
    let due_at = next.due_at(now);
    let quality = i16::from(quality.get());

    let model = match existing {
      Some(model) => {
        let mut active: flashcard_review::ActiveModel = model.into();
        active.quality = Set(quality);
        active.repetitions = Set(next.repetitions);
        active.interval_days = Set(next.interval_days);
        active.easiness_factor = Set(next.easiness_factor);
        active.stability = Set(next.stability);
        active.difficulty = Set(next.difficulty);
        active.due_at = Set(due_at.into());
        active.last_reviewed_at = Set(now.into());
        active.update(db).await?
      }
      None => {
        // A concurrent first review of the same card overwrites instead of failing.
        use flashcard_review::Column;
        flashcard_review::Entity::insert(flashcard_review::ActiveModel {
          id: Set(Uuid::now_v7()),
          user_id: Set(actor.user_id),
          flashcard_id: Set(flashcard_id),
          module_id: Set(card.module_id),
          quality: Set(quality),
          repetitions: Set(next.repetitions),
          interval_days: Set(next.interval_days),
          easiness_factor: Set(next.easiness_factor),
          stability: Set(next.stability),
          difficulty: Set(next.difficulty),
          due_at: Set(due_at.into()),
          last_reviewed_at: Set(now.into()),
          created_at: Set(now.into()),
        })
        .on_conflict(
          OnConflict::columns([Column::UserId, Column::FlashcardId])
            .update_columns([
              Column::Quality,
              Column::Repetitions,
              Column::IntervalDays,
              Column::EasinessFactor,
              Column::Stability,
              Column::Difficulty,
              Column::DueAt,
              Column::LastReviewedAt,
            ])
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

        flashcard_review::Entity::find()
          .filter(Column::UserId.eq(actor.user_id))
          .filter(Column::FlashcardId.eq(flashcard_id))
          .one(db)
          .await?
          .ok_or_else(|| anyhow!("review of flashcard {flashcard_id} vanished"))?
      }
    };

    tracing::debug!(
      user_id = %actor.user_id,
      %flashcard_id,
      quality,
      interval = next.interval_days,
      %scheduler,
      "flashcard reviewed"
    );

    let streak = Streak::record_activity(actor.user_id, now, db).await?;

    Ok(Self {
      flashcard_id,
      state: ReviewState::from_model(&model),
      streak,
    })
  }

  /// Cards to study now in a deck.
  pub async fn due(
    actor: &Actor,
    module_id: Uuid,
    limit: u64,
    now: DateTime<Utc>,
    db: &impl ConnectionTrait,
  ) -> Result<Vec<DueCard>, AppError> {
    open_deck(actor, module_id, db).await?;

    let cards = Flashcard::list(module_id, db).await?;
    let reviews = reviews_in_module(actor.user_id, module_id, db).await?;
    let limit = usize::try_from(limit.clamp(1, MAX_DUE_BATCH)).unwrap_or(usize::MAX);

    Ok(study_queue(cards, reviews, now, limit))
  }

  pub async fn stats(
    actor: &Actor,
    module_id: Uuid,
    now: DateTime<Utc>,
    db: &impl ConnectionTrait,
  ) -> Result<DeckStats, AppError> {
    open_deck(actor, module_id, db).await?;

    let card_ids: Vec<Uuid> = Flashcard::list(module_id, db)
      .await?
      .into_iter()
      .map(|card| card.id)
      .collect();
    let reviews = reviews_in_module(actor.user_id, module_id, db).await?;

    Ok(tally(&card_ids, &reviews, now))
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use chrono::{Duration, TimeZone, Utc};
  use uuid::Uuid;

  use super::{DeckStats, ReviewState, study_queue, tally};
  use crate::flashcard::Flashcard;

  fn card(position: i32) -> Flashcard {
    Flashcard {
      id: Uuid::now_v7(),
      module_id: Uuid::nil(),
      term: format!("term {position}"),
      definition: "def".into(),
      example: None,
      phonetic: None,
      image_key: None,
      audio_key: None,
      position,
      created_at: Utc::now(),
    }
  }

  fn reviewed(repetitions: i32, due_at: chrono::DateTime<Utc>) -> ReviewState {
    ReviewState {
      quality: 4,
      repetitions,
      interval_days: 1,
      easiness_factor: 2.5,
      due_at,
      last_reviewed_at: due_at - Duration::days(1),
    }
  }

  #[test]
  fn queue_puts_oldest_due_first_then_new_cards() {
    let now = Utc.with_ymd_and_hms(2026, 4, 10, 0, 0, 0).unwrap();
    let cards = vec![card(0), card(1), card(2), card(3), card(4)];
    let ids: Vec<_> = cards.iter().map(|c| c.id).collect();

    let reviews = HashMap::from([
      (ids[0], reviewed(2, now - Duration::days(1))),
      (ids[1], reviewed(3, now + Duration::days(3))),
      (ids[3], reviewed(1, now - Duration::days(5))),
    ]);

    let queue = study_queue(cards, reviews, now, 10);
    let order: Vec<_> = queue.iter().map(|c| c.card.id).collect();
    assert_eq!(order, vec![ids[3], ids[0], ids[2], ids[4]]);
    assert!(queue[2].review.is_none());
  }

  #[test]
  fn queue_respects_limit() {
    let now = Utc::now();
    let cards = vec![card(0), card(1), card(2)];
    assert_eq!(study_queue(cards, HashMap::new(), now, 2).len(), 2);
  }

  #[test]
  fn tally_splits_new_due_and_learned() {
    let now = Utc.with_ymd_and_hms(2026, 4, 10, 0, 0, 0).unwrap();
    let ids: Vec<_> = (0..4).map(|_| Uuid::now_v7()).collect();
    let reviews = HashMap::from([
      (ids[0], reviewed(2, now + Duration::days(2))),
      (ids[1], reviewed(1, now - Duration::hours(1))),
      (ids[2], reviewed(0, now + Duration::days(1))),
    ]);

    assert_eq!(
      tally(&ids, &reviews, now),
      DeckStats {
        total: 4,
        new: 1,
        due: 1,
        learned: 1,
      }
    );
  }
}
