use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use edulane_entities::{assessment, essay_prompt, essay_submission};
use edulane_shared::AppError;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Assessment;
use crate::{
  Actor,
  catalog::{ModuleKind, ensure_kind, find_module, managed_module, module_access},
  media::{MediaField, MediaPlan, MediaPrefix},
  notification::{NewNotification, Notification, NotificationKind},
};

#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct EssayPrompt {
  pub id: Uuid,
  pub assessment_id: Uuid,
  pub prompt: String,
  pub max_score: f64,
  pub min_words: Option<i32>,
  pub max_words: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EssayPromptInput {
  pub prompt: String,
  pub max_score: f64,
  pub min_words: Option<i32>,
  pub max_words: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SubmissionStatus {
  Submitted,
  Graded,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EssaySubmission {
  pub id: Uuid,
  pub essay_id: Uuid,
  pub user_id: Uuid,
  pub content: String,
  pub word_count: usize,
  pub attachment_key: Option<String>,
  pub status: SubmissionStatus,
  pub score: Option<f64>,
  pub feedback: Option<String>,
  pub graded_by: Option<Uuid>,
  pub submitted_at: DateTime<Utc>,
  pub graded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EssayInput {
  pub content: String,
  #[serde(default)]
  pub attachment: MediaField,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EssayGrade {
  pub score: f64,
  pub feedback: Option<String>,
}

pub(crate) fn count_words(text: &str) -> usize {
  text.split_whitespace().count()
}

impl EssayPromptInput {
  fn validate(&self) -> Result<(), AppError> {
    if self.prompt.trim().is_empty() {
      return Err(AppError::bad_request("essay prompt must not be empty"));
    }
    if !(self.max_score.is_finite() && self.max_score > 0.0) {
      return Err(AppError::bad_request("max score must be greater than zero"));
    }
    if self.min_words.is_some_and(|n| n < 0) || self.max_words.is_some_and(|n| n < 1) {
      return Err(AppError::bad_request("word limits must be positive"));
    }
    if let (Some(min), Some(max)) = (self.min_words, self.max_words)
      && min > max
    {
      return Err(AppError::bad_request("min words exceeds max words"));
    }
    Ok(())
  }
}

impl EssayPrompt {
  #[must_use]
  pub fn from_model(model: essay_prompt::Model) -> Self {
    Self {
      id: model.id,
      assessment_id: model.assessment_id,
      prompt: model.prompt,
      max_score: model.max_score,
      min_words: model.min_words,
      max_words: model.max_words,
    }
  }

  /// Word count check for a submission.
  fn check_length(&self, words: usize) -> Result<(), AppError> {
    let words = i64::try_from(words).unwrap_or(i64::MAX);
    if let Some(min) = self.min_words
      && words < i64::from(min)
    {
      return Err(AppError::bad_request(format!(
        "essay needs at least {min} words, got {words}"
      )));
    }
    if let Some(max) = self.max_words
      && words > i64::from(max)
    {
      return Err(AppError::bad_request(format!(
        "essay allows at most {max} words, got {words}"
      )));
    }
    Ok(())
  }

  async fn for_assessment(
    assessment_id: Uuid,
    db: &impl ConnectionTrait,
  ) -> Result<Option<essay_prompt::Model>, AppError> {
    Ok(
      essay_prompt::Entity::find()
        .filter(essay_prompt::Column::AssessmentId.eq(assessment_id))
        .one(db)
        .await?,
    )
  }

  pub async fn upsert(
    actor: &Actor,
    module_id: Uuid,
    input: EssayPromptInput,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    managed_module(actor, module_id, ModuleKind::Assessment, db).await?;
    let assessment = Assessment::require_for_module(module_id, db).await?;
    input.validate()?;

    let now = Utc::now();
    let model = match Self::for_assessment(assessment.id, db).await? {
      Some(model) => {
        let mut active: essay_prompt::ActiveModel = model.into();
        active.prompt = Set(input.prompt.trim().to_owned());
        active.max_score = Set(input.max_score);
        active.min_words = Set(input.min_words);
        active.max_words = Set(input.max_words);
        active.updated_at = Set(now.into());
        active.update(db).await?
      }
      None => {
        essay_prompt::ActiveModel {
          id: Set(Uuid::now_v7()),
          assessment_id: Set(assessment.id),
          prompt: Set(input.prompt.trim().to_owned()),
          max_score: Set(input.max_score),
          min_words: Set(input.min_words),
          max_words: Set(input.max_words),
          created_at: Set(now.into()),
          updated_at: Set(now.into()),
        }
        .insert(db)
        .await?
      }
    };

    Ok(Self::from_model(model))
  }

  /// Remove the prompt and its submissions. Returns attachment keys for removal.
  pub async fn delete(actor: &Actor, module_id: Uuid, db: &impl ConnectionTrait) -> Result<Vec<String>, AppError> {
    managed_module(actor, module_id, ModuleKind::Assessment, db).await?;
    let assessment = Assessment::require_for_module(module_id, db).await?;
    let Some(prompt) = Self::for_assessment(assessment.id, db).await? else {
      return Err(AppError::not_found("essay prompt not found"));
    };

    let keys = essay_submission::Entity::find()
      .filter(essay_submission::Column::EssayId.eq(prompt.id))
      .all(db)
      .await?
      .into_iter()
      .filter_map(|s| s.attachment_key)
      .collect();
    essay_prompt::Entity::delete_by_id(prompt.id).exec(db).await?;

    Ok(keys)
  }
}

impl EssaySubmission {
  fn from_model(model: essay_submission::Model) -> Result<Self, AppError> {
    Ok(Self {
      id: model.id,
      essay_id: model.essay_id,
      user_id: model.user_id,
      word_count: count_words(&model.content),
      content: model.content,
      attachment_key: model.attachment_key,
      status: SubmissionStatus::from_str(&model.status)
        .map_err(|_| anyhow!("unknown submission status '{}'", model.status))?,
      score: model.score,
      feedback: model.feedback,
      graded_by: model.graded_by,
      submitted_at: model.submitted_at.with_timezone(&Utc),
      graded_at: model.graded_at.map(|dt| dt.with_timezone(&Utc)),
    })
  }

  async fn open_prompt(
    actor: &Actor,
    module_id: Uuid,
    db: &impl ConnectionTrait,
  ) -> Result<EssayPrompt, AppError> {
    let module = find_module(module_id, db).await?;
    ensure_kind(&module, ModuleKind::Assessment)?;
    module_access(actor, &module, db).await?;
    let assessment = Assessment::require_for_module(module_id, db).await?;
    EssayPrompt::for_assessment(assessment.id, db)
      .await?
      .map(EssayPrompt::from_model)
      .ok_or_else(|| AppError::not_found("this assessment has no essay"))
  }

  /// Hand in an essay. Until it is graded, handing in again replaces the text.
  pub async fn submit(
    actor: &Actor,
    module_id: Uuid,
    input: EssayInput,
    media: &mut MediaPlan<'_>,
    now: DateTime<Utc>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let prompt = Self::open_prompt(actor, module_id, db).await?;
    let content = input.content.trim().to_owned();
    if content.is_empty() {
      return Err(AppError::bad_request("essay must not be empty"));
    }
    prompt.check_length(count_words(&content))?;

    let existing = essay_submission::Entity::find()
      .filter(essay_submission::Column::EssayId.eq(prompt.id))
      .filter(essay_submission::Column::UserId.eq(actor.user_id))
      .one(db)
      .await?;

    let model = match existing {
      Some(model) if model.status == SubmissionStatus::Graded.as_ref() => {
        return Err(AppError::conflict("essay has already been graded"));
      }
      Some(model) => {
        let attachment_key = media
          .apply(
            &input.attachment,
            model.attachment_key.clone(),
            MediaPrefix::Essays,
            db,
          )
          .await?;
        let mut active: essay_submission::ActiveModel = model.into();
        active.content = Set(content);
        active.attachment_key = Set(attachment_key);
        active.submitted_at = Set(now.into());
        active.update(db).await?
      }
      None => {
        let attachment_key = media
          .apply(&input.attachment, None, MediaPrefix::Essays, db)
          .await?;
        essay_submission::ActiveModel {
          id: Set(Uuid::now_v7()),
          essay_id: Set(prompt.id),
          user_id: Set(actor.user_id),
          content: Set(content),
          attachment_key: Set(attachment_key),
          status: Set(SubmissionStatus::Submitted.to_string()),
          score: Set(None),
          feedback: Set(None),
          graded_by: Set(None),
          submitted_at: Set(now.into()),
          graded_at: Set(None),
        }
        .insert(db)
        .await?
      }
    };

    tracing::debug!(submission_id = %model.id, user_id = %actor.user_id, "essay submitted");

    Self::from_model(model)
  }

  pub async fn mine(actor: &Actor, module_id: Uuid, db: &impl ConnectionTrait) -> Result<Option<Self>, AppError> {
    let prompt = Self::open_prompt(actor, module_id, db).await?;
    essay_submission::Entity::find()
      .filter(essay_submission::Column::EssayId.eq(prompt.id))
      .filter(essay_submission::Column::UserId.eq(actor.user_id))
      .one(db)
      .await?
      .map(Self::from_model)
      .transpose()
  }

  /// All submissions for a module's essay, oldest first. Course managers only.
  pub async fn list(actor: &Actor, module_id: Uuid, db: &impl ConnectionTrait) -> Result<Vec<Self>, AppError> {
    managed_module(actor, module_id, ModuleKind::Assessment, db).await?;
    let assessment = Assessment::require_for_module(module_id, db).await?;
    let Some(prompt) = EssayPrompt::for_assessment(assessment.id, db).await? else {
      return Ok(Vec::new());
    };

    essay_submission::Entity::find()
      .filter(essay_submission::Column::EssayId.eq(prompt.id))
      .order_by_asc(essay_submission::Column::SubmittedAt)
      .all(db)
      .await?
      .into_iter()
      .map(Self::from_model)
      .collect()
  }

  pub async fn grade(
    actor: &Actor,
    submission_id: Uuid,
    input: EssayGrade,
    now: DateTime<Utc>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let submission = essay_submission::Entity::find_by_id(submission_id)
      .one(db)
      .await?
      .ok_or_else(|| AppError::not_found("submission not found"))?;
    let prompt = essay_prompt::Entity::find_by_id(submission.essay_id)
      .one(db)
      .await?
      .ok_or_else(|| anyhow!("submission {submission_id} has no prompt"))?;
    let assessment = assessment::Entity::find_by_id(prompt.assessment_id)
      .one(db)
      .await?
      .ok_or_else(|| anyhow!("essay {} has no assessment", prompt.id))?;
    managed_module(actor, assessment.module_id, ModuleKind::Assessment, db).await?;

    if !(input.score.is_finite() && (0.0..=prompt.max_score).contains(&input.score)) {
      return Err(AppError::bad_request(format!(
        "score must be between 0 and {}",
        prompt.max_score
      )));
    }

    let learner_id = submission.user_id;
    let mut active: essay_submission::ActiveModel = submission.into();
    active.status = Set(SubmissionStatus::Graded.to_string());
    active.score = Set(Some(input.score));
    active.feedback = Set(input.feedback);
    active.graded_by = Set(Some(actor.user_id));
    active.graded_at = Set(Some(now.into()));
    let model = active.update(db).await?;

    Notification::notify(
      NewNotification {
        user_id: learner_id,
        kind: NotificationKind::EssayGraded,
        title: format!("Your essay for \"{}\" was graded", assessment.title),
        body: format!("You scored {} out of {}.", input.score, prompt.max_score),
        link: Some(format!("/modules/{}", assessment.module_id)),
      },
      db,
    )
    .await?;

    tracing::info!(%submission_id, grader = %actor.user_id, score = input.score, "essay graded");

    Self::from_model(model)
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::{EssayPrompt, EssayPromptInput, count_words};

  fn prompt(min: Option<i32>, max: Option<i32>) -> EssayPrompt {
    EssayPrompt {
      id: Uuid::now_v7(),
      assessment_id: Uuid::now_v7(),
      prompt: "Describe your city".into(),
      max_score: 10.0,
      min_words: min,
      max_words: max,
    }
  }

  #[test]
  fn counts_words_across_whitespace() {
    assert_eq!(count_words("  one two\nthree\tfour  "), 4);
    assert_eq!(count_words(""), 0);
  }

  #[test]
  fn enforces_word_bounds() {
    let p = prompt(Some(3), Some(5));
    assert!(p.check_length(2).is_err());
    assert!(p.check_length(3).is_ok());
    assert!(p.check_length(5).is_ok());
    assert!(p.check_length(6).is_err());
    assert!(prompt(None, None).check_length(0).is_ok());
  }

  #[test]
  fn prompt_limits_must_be_consistent() {
    let input = EssayPromptInput {
      prompt: "Why?".into(),
      max_score: 10.0,
      min_words: Some(200),
      max_words: Some(100),
    };
    assert!(input.validate().is_err());
  }
}
