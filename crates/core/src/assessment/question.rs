use std::str::FromStr;

use anyhow::anyhow;
use edulane_entities::{assessment, quiz_question};
use edulane_shared::AppError;
use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ExprTrait, PaginatorTrait,
  QueryFilter, QueryOrder, QuerySelect, Set, prelude::Expr,
};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Assessment;
use crate::{
  Actor,
  catalog::{ModuleKind, managed_module, validate_reorder},
  media::{MediaField, MediaPlan, MediaPrefix},
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QuestionKind {
  SingleChoice,
  MultipleChoice,
  FillBlank,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QuizOption {
  pub text: String,
  #[serde(default)]
  pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Question {
  pub id: Uuid,
  pub assessment_id: Uuid,
  pub kind: QuestionKind,
  pub prompt: String,
  pub options: Vec<QuizOption>,
  pub accepted_answers: Vec<String>,
  pub points: f64,
  pub position: i32,
  pub explanation: Option<String>,
  pub image_key: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct QuestionInput {
  pub kind: QuestionKind,
  pub prompt: String,
  #[serde(default)]
  pub options: Vec<QuizOption>,
  #[serde(default)]
  pub accepted_answers: Vec<String>,
  pub points: f64,
  pub explanation: Option<String>,
  #[serde(default)]
  pub image: MediaField,
}

#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct OptionView {
  pub text: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_correct: Option<bool>,
}

/// A question as displayed. Correctness data is only filled in for authors.
#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct QuestionView {
  pub id: Uuid,
  pub kind: QuestionKind,
  pub prompt: String,
  pub options: Vec<OptionView>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub accepted_answers: Option<Vec<String>>,
  pub points: f64,
  pub position: i32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub explanation: Option<String>,
  pub image_key: Option<String>,
}

impl QuestionInput {
  pub(crate) fn validate(&self) -> Result<(), AppError> {
    if self.prompt.trim().is_empty() {
      return Err(AppError::bad_request("question prompt must not be empty"));
    }
    if !(self.points.is_finite() && self.points > 0.0) {
      return Err(AppError::bad_request("points must be greater than zero"));
    }

    let correct = self.options.iter().filter(|o| o.is_correct).count();
    match self.kind {
      QuestionKind::SingleChoice | QuestionKind::MultipleChoice => {
        if self.options.len() < 2 {
          return Err(AppError::bad_request("choice questions need at least two options"));
        }
        if self.options.iter().any(|o| o.text.trim().is_empty()) {
          return Err(AppError::bad_request("options must not be empty"));
        }
        if self.kind == QuestionKind::SingleChoice && correct != 1 {
          return Err(AppError::bad_request(
            "single choice questions need exactly one correct option",
          ));
        }
        if self.kind == QuestionKind::MultipleChoice && correct == 0 {
          return Err(AppError::bad_request(
            "multiple choice questions need at least one correct option",
          ));
        }
      }
      QuestionKind::FillBlank => {
        if !self.accepted_answers.iter().any(|a| !a.trim().is_empty()) {
          return Err(AppError::bad_request(
            "fill-in-the-blank questions need an accepted answer",
          ));
        }
      }
    }
    Ok(())
  }

  /// Keep only the fields meaningful for the question kind.
  fn normalized_parts(&self) -> (Vec<QuizOption>, Vec<String>) {
    match self.kind {
      QuestionKind::FillBlank => (
        Vec::new(),
        self
          .accepted_answers
          .iter()
          .map(|a| a.trim().to_owned())
          .filter(|a| !a.is_empty())
          .collect(),
      ),
      _ => (
        self
          .options
          .iter()
          .map(|o| QuizOption {
            text: o.text.trim().to_owned(),
            is_correct: o.is_correct,
          })
          .collect(),
        Vec::new(),
      ),
    }
  }
}

impl Question {
  pub fn from_model(model: quiz_question::Model) -> Result<Self, AppError> {
    Ok(Self {
      id: model.id,
      assessment_id: model.assessment_id,
      kind: QuestionKind::from_str(&model.kind)
        .map_err(|_| anyhow!("unknown question kind '{}'", model.kind))?,
      prompt: model.prompt,
      options: serde_json::from_value(model.options)?,
      accepted_answers: serde_json::from_value(model.accepted_answers)?,
      points: model.points,
      position: model.position,
      explanation: model.explanation,
      image_key: model.image_key,
    })
  }

  #[must_use]
  pub fn view(self, reveal: bool) -> QuestionView {
    QuestionView {
      id: self.id,
      kind: self.kind,
      prompt: self.prompt,
      options: self
        .options
        .into_iter()
        .map(|o| OptionView {
          text: o.text,
          is_correct: reveal.then_some(o.is_correct),
        })
        .collect(),
      accepted_answers: reveal.then_some(self.accepted_answers),
      points: self.points,
      position: self.position,
      explanation: if reveal { self.explanation } else { None },
      image_key: self.image_key,
    }
  }

  pub(crate) async fn for_assessment(
    assessment_id: Uuid,
    db: &impl ConnectionTrait,
  ) -> Result<Vec<Self>, AppError> {
    quiz_question::Entity::find()
      .filter(quiz_question::Column::AssessmentId.eq(assessment_id))
      .order_by_asc(quiz_question::Column::Position)
      .all(db)
      .await?
      .into_iter()
      .map(Self::from_model)
      .collect()
  }

  /// The question plus the assessment it belongs to, if `actor` may author it.
  async fn managed(
    actor: &Actor,
    id: Uuid,
    db: &impl ConnectionTrait,
  ) -> Result<(quiz_question::Model, assessment::Model), AppError> {
    let question = quiz_question::Entity::find_by_id(id)
      .one(db)
      .await?
      .ok_or_else(|| AppError::not_found("question not found"))?;
    let assessment = assessment::Entity::find_by_id(question.assessment_id)
      .one(db)
      .await?
      .ok_or_else(|| anyhow!("question {id} has no assessment"))?;
    managed_module(actor, assessment.module_id, ModuleKind::Assessment, db).await?;
    Ok((question, assessment))
  }

  pub async fn create(
    actor: &Actor,
    module_id: Uuid,
    input: QuestionInput,
    media: &mut MediaPlan<'_>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    managed_module(actor, module_id, ModuleKind::Assessment, db).await?;
    let assessment = Assessment::require_for_module(module_id, db).await?;
    input.validate()?;

    let image_key = media
      .apply(&input.image, None, MediaPrefix::Questions, db)
      .await?;
    let (options, accepted_answers) = input.normalized_parts();
    let position = quiz_question::Entity::find()
      .filter(quiz_question::Column::AssessmentId.eq(assessment.id))
      .count(db)
      .await?;

    let model = quiz_question::ActiveModel {
      id: Set(Uuid::now_v7()),
      assessment_id: Set(assessment.id),
      kind: Set(input.kind.to_string()),
      prompt: Set(input.prompt.trim().to_owned()),
      options: Set(serde_json::to_value(options)?),
      accepted_answers: Set(serde_json::to_value(accepted_answers)?),
      points: Set(input.points),
      position: Set(i32::try_from(position).unwrap_or(i32::MAX)),
      explanation: Set(input.explanation),
      image_key: Set(image_key),
      created_at: Set(chrono::Utc::now().into()),
    }
    .insert(db)
    .await?;

    Self::from_model(model)
  }

  pub async fn update(
    actor: &Actor,
    id: Uuid,
    input: QuestionInput,
    media: &mut MediaPlan<'_>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let (model, _) = Self::managed(actor, id, db).await?;
    input.validate()?;

    let image_key = media
      .apply(&input.image, model.image_key.clone(), MediaPrefix::Questions, db)
      .await?;
    let (options, accepted_answers) = input.normalized_parts();

    let mut active: quiz_question::ActiveModel = model.into();
    active.kind = Set(input.kind.to_string());
    active.prompt = Set(input.prompt.trim().to_owned());
    active.options = Set(serde_json::to_value(options)?);
    active.accepted_answers = Set(serde_json::to_value(accepted_answers)?);
    active.points = Set(input.points);
    active.explanation = Set(input.explanation);
    active.image_key = Set(image_key);

    Self::from_model(active.update(db).await?)
  }

  /// Returns the question image key, if any, for removal.
  pub async fn delete(actor: &Actor, id: Uuid, db: &impl ConnectionTrait) -> Result<Vec<String>, AppError> {
    let (model, assessment) = Self::managed(actor, id, db).await?;

    quiz_question::Entity::delete_by_id(id).exec(db).await?;
    quiz_question::Entity::update_many()
      .col_expr(
        quiz_question::Column::Position,
        Expr::col(quiz_question::Column::Position).sub(1),
      )
      .filter(quiz_question::Column::AssessmentId.eq(assessment.id))
      .filter(quiz_question::Column::Position.gt(model.position))
      .exec(db)
      .await?;

    Ok(model.image_key.into_iter().collect())
  }

  pub async fn reorder(
    actor: &Actor,
    module_id: Uuid,
    ids: &[Uuid],
    db: &impl ConnectionTrait,
  ) -> Result<Vec<Self>, AppError> {
    managed_module(actor, module_id, ModuleKind::Assessment, db).await?;
    let assessment = Assessment::require_for_module(module_id, db).await?;

    let existing: Vec<Uuid> = quiz_question::Entity::find()
      .select_only()
      .column(quiz_question::Column::Id)
      .filter(quiz_question::Column::AssessmentId.eq(assessment.id))
      .into_tuple()
      .all(db)
      .await?;
    validate_reorder(&existing, ids)?;

    for (position, id) in ids.iter().enumerate() {
      quiz_question::Entity::update_many()
        .col_expr(
          quiz_question::Column::Position,
          Expr::value(i32::try_from(position).unwrap_or(i32::MAX)),
        )
        .filter(quiz_question::Column::Id.eq(*id))
        .exec(db)
        .await?;
    }

    Self::for_assessment(assessment.id, db).await
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::{Question, QuestionInput, QuestionKind, QuizOption};
  use crate::media::MediaField;

  fn option(text: &str, is_correct: bool) -> QuizOption {
    QuizOption {
      text: text.into(),
      is_correct,
    }
  }

  fn input(kind: QuestionKind, options: Vec<QuizOption>, accepted: Vec<&str>) -> QuestionInput {
    QuestionInput {
      kind,
      prompt: "Pick one".into(),
      options,
      accepted_answers: accepted.into_iter().map(String::from).collect(),
      points: 1.0,
      explanation: None,
      image: MediaField::Keep,
    }
  }

  #[test]
  fn single_choice_needs_exactly_one_correct() {
    let ok = input(
      QuestionKind::SingleChoice,
      vec![option("a", true), option("b", false)],
      vec![],
    );
    assert!(ok.validate().is_ok());

    let two_correct = input(
      QuestionKind::SingleChoice,
      vec![option("a", true), option("b", true)],
      vec![],
    );
    assert!(two_correct.validate().is_err());

    let one_option = input(QuestionKind::SingleChoice, vec![option("a", true)], vec![]);
    assert!(one_option.validate().is_err());
  }

  #[test]
  fn multiple_choice_needs_a_correct_option() {
    let none_correct = input(
      QuestionKind::MultipleChoice,
      vec![option("a", false), option("b", false)],
      vec![],
    );
    assert!(none_correct.validate().is_err());

    let two_correct = input(
      QuestionKind::MultipleChoice,
      vec![option("a", true), option("b", true), option("c", false)],
      vec![],
    );
    assert!(two_correct.validate().is_ok());
  }

  #[test]
  fn fill_blank_needs_an_answer_and_drops_options() {
    assert!(input(QuestionKind::FillBlank, vec![], vec!["  "]).validate().is_err());

    let ok = input(QuestionKind::FillBlank, vec![option("x", true)], vec![" went ", ""]);
    assert!(ok.validate().is_ok());
    let (options, accepted) = ok.normalized_parts();
    assert!(options.is_empty());
    assert_eq!(accepted, vec!["went".to_owned()]);
  }

  #[test]
  fn points_must_be_positive() {
    let mut q = input(QuestionKind::FillBlank, vec![], vec!["a"]);
    q.points = 0.0;
    assert!(q.validate().is_err());
    q.points = f64::NAN;
    assert!(q.validate().is_err());
  }

  #[test]
  fn learner_view_hides_answer_key() {
    let question = Question {
      id: Uuid::now_v7(),
      assessment_id: Uuid::now_v7(),
      kind: QuestionKind::SingleChoice,
      prompt: "2 + 2".into(),
      options: vec![option("4", true), option("5", false)],
      accepted_answers: vec![],
      points: 1.0,
      position: 0,
      explanation: Some("basic arithmetic".into()),
      image_key: None,
    };

    let json = serde_json::to_value(question.clone().view(false)).unwrap();
    assert!(json["options"][0].get("is_correct").is_none());
    assert!(json.get("explanation").is_none());
    assert!(json.get("accepted_answers").is_none());

    let json = serde_json::to_value(question.view(true)).unwrap();
    assert_eq!(json["options"][0]["is_correct"], true);
    assert_eq!(json["explanation"], "basic arithmetic");
  }
}
