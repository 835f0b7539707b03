mod attempt;
mod essay;
mod grading;
mod question;

pub use attempt::{AnswerInput, Attempt, AttemptStatus, QuestionResult};
pub use essay::{
  EssayGrade, EssayInput, EssayPrompt, EssayPromptInput, EssaySubmission, SubmissionStatus,
};
pub use question::{OptionView, Question, QuestionInput, QuestionKind, QuestionView, QuizOption};

use chrono::{DateTime, Utc};
use edulane_entities::{assessment, essay_prompt, quiz_question};
use edulane_shared::AppError;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
  Actor,
  catalog::{ModuleKind, managed_module},
};

#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct Assessment {
  pub id: Uuid,
  pub module_id: Uuid,
  pub title: String,
  pub description: String,
  /// Percentage needed to pass
  pub pass_score: f64,
  pub time_limit_minutes: Option<i32>,
  pub max_attempts: Option<i32>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssessmentInput {
  pub title: String,
  #[serde(default)]
  pub description: String,
  pub pass_score: f64,
  pub time_limit_minutes: Option<i32>,
  pub max_attempts: Option<i32>,
}

impl AssessmentInput {
  fn validate(&self) -> Result<(), AppError> {
    if self.title.trim().is_empty() {
      return Err(AppError::bad_request("title must not be empty"));
    }
    if !(0.0..=100.0).contains(&self.pass_score) {
      return Err(AppError::bad_request("pass score must be between 0 and 100"));
    }
    if self.time_limit_minutes.is_some_and(|m| m < 1) {
      return Err(AppError::bad_request("time limit must be at least one minute"));
    }
    if self.max_attempts.is_some_and(|n| n < 1) {
      return Err(AppError::bad_request("max attempts must be at least 1"));
    }
    Ok(())
  }
}

/// An assessment as shown to someone taking or authoring it.
#[derive(Debug, Serialize, ToSchema)]
pub struct AssessmentView {
  #[serde(flatten)]
  pub assessment: Assessment,
  pub questions: Vec<QuestionView>,
  pub essay: Option<EssayPrompt>,
}

impl Assessment {
  #[must_use]
  pub fn from_model(model: assessment::Model) -> Self {
    Self {
      id: model.id,
      module_id: model.module_id,
      title: model.title,
      description: model.description,
      pass_score: model.pass_score,
      time_limit_minutes: model.time_limit_minutes,
      max_attempts: model.max_attempts,
      updated_at: model.updated_at.with_timezone(&Utc),
    }
  }

  pub(crate) async fn for_module(
    module_id: Uuid,
    db: &impl ConnectionTrait,
  ) -> Result<Option<assessment::Model>, AppError> {
    Ok(
      assessment::Entity::find()
        .filter(assessment::Column::ModuleId.eq(module_id))
        .one(db)
        .await?,
    )
  }

  pub(crate) async fn require_for_module(
    module_id: Uuid,
    db: &impl ConnectionTrait,
  ) -> Result<assessment::Model, AppError> {
    Self::for_module(module_id, db)
      .await?
      .ok_or_else(|| AppError::not_found("assessment has not been set up"))
  }

  pub async fn upsert(
    actor: &Actor,
    module_id: Uuid,
    input: AssessmentInput,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    managed_module(actor, module_id, ModuleKind::Assessment, db).await?;
    input.validate()?;

    let now = Utc::now();
    let model = match Self::for_module(module_id, db).await? {
      Some(model) => {
        let mut active: assessment::ActiveModel = model.into();
        active.title = Set(input.title.trim().to_owned());
        active.description = Set(input.description);
        active.pass_score = Set(input.pass_score);
        active.time_limit_minutes = Set(input.time_limit_minutes);
        active.max_attempts = Set(input.max_attempts);
        active.updated_at = Set(now.into());
        active.update(db).await?
      }
      None => {
        assessment::ActiveModel {
          id: Set(Uuid::now_v7()),
          module_id: Set(module_id),
          title: Set(input.title.trim().to_owned()),
          description: Set(input.description),
          pass_score: Set(input.pass_score),
          time_limit_minutes: Set(input.time_limit_minutes),
          max_attempts: Set(input.max_attempts),
          created_at: Set(now.into()),
          updated_at: Set(now.into()),
        }
        .insert(db)
        .await?
      }
    };

    Ok(Self::from_model(model))
  }

  /// The assessment of a module with its questions. Answer keys only when `reveal`.
  pub(crate) async fn view(
    module_id: Uuid,
    reveal: bool,
    db: &impl ConnectionTrait,
  ) -> Result<Option<AssessmentView>, AppError> {
    let Some(model) = Self::for_module(module_id, db).await? else {
      return Ok(None);
    };

    let questions = quiz_question::Entity::find()
      .filter(quiz_question::Column::AssessmentId.eq(model.id))
      .order_by_asc(quiz_question::Column::Position)
      .all(db)
      .await?
      .into_iter()
      .map(|q| Question::from_model(q).map(|q| q.view(reveal)))
      .collect::<Result<Vec<_>, _>>()?;

    let essay = essay_prompt::Entity::find()
      .filter(essay_prompt::Column::AssessmentId.eq(model.id))
      .one(db)
      .await?
      .map(EssayPrompt::from_model);

    Ok(Some(AssessmentView {
      assessment: Self::from_model(model),
      questions,
      essay,
    }))
  }
}

#[cfg(test)]
mod tests {
  use super::AssessmentInput;

  fn input(pass_score: f64) -> AssessmentInput {
    AssessmentInput {
      title: "Unit 1 quiz".into(),
      description: String::new(),
      pass_score,
      time_limit_minutes: Some(15),
      max_attempts: None,
    }
  }

  #[test]
  fn pass_score_is_a_percentage() {
    assert!(input(70.0).validate().is_ok());
    assert!(input(0.0).validate().is_ok());
    assert!(input(100.5).validate().is_err());
    assert!(input(-1.0).validate().is_err());
  }

  #[test]
  fn limits_must_be_positive() {
    let mut zero_minutes = input(50.0);
    zero_minutes.time_limit_minutes = Some(0);
    assert!(zero_minutes.validate().is_err());

    let mut zero_attempts = input(50.0);
    zero_attempts.max_attempts = Some(0);
    assert!(zero_attempts.validate().is_err());
  }
}
