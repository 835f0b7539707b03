use std::{collections::HashMap, str::FromStr};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use edulane_entities::{assessment, quiz_attempt};
use edulane_shared::AppError;
use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
  QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
  Assessment, Question,
  grading::{credit, deadline, passed},
};
use crate::{
  Actor,
  catalog::{ModuleKind, ensure_kind, find_module, module_access},
  enrollment::Progress,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttemptStatus {
  InProgress,
  Submitted,
  /// Time ran out before a submission arrived
  Expired,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AnswerInput {
  pub question_id: Uuid,
  /// Option indexes for choice questions
  #[serde(default)]
  pub selected: Vec<usize>,
  /// Answer text for fill-in-the-blank questions
  pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct QuestionResult {
  pub question_id: Uuid,
  pub earned: f64,
  pub points: f64,
  pub correct: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Attempt {
  pub id: Uuid,
  pub assessment_id: Uuid,
  pub user_id: Uuid,
  pub status: AttemptStatus,
  pub score: Option<f64>,
  pub max_score: Option<f64>,
  pub passed: Option<bool>,
  pub results: Option<Vec<QuestionResult>>,
  pub started_at: DateTime<Utc>,
  /// Submissions after this instant are rejected
  pub deadline: Option<DateTime<Utc>>,
  pub submitted_at: Option<DateTime<Utc>>,
}

/// Score every question; unanswered questions earn nothing.
fn grade(questions: &[Question], answers: &[AnswerInput]) -> (Vec<QuestionResult>, f64, f64) {
  let by_question: HashMap<Uuid, &AnswerInput> =
    answers.iter().map(|a| (a.question_id, a)).collect();

  let results: Vec<QuestionResult> = questions
    .iter()
    .map(|question| {
      let fraction = by_question.get(&question.id).map_or(0.0, |answer| {
        credit(question, &answer.selected, answer.text.as_deref())
      });
      QuestionResult {
        question_id: question.id,
        earned: fraction * question.points,
        points: question.points,
        correct: fraction >= 1.0,
      }
    })
    .collect();

  let score = results.iter().map(|r| r.earned).sum();
  let max_score = questions.iter().map(|q| q.points).sum();
  (results, score, max_score)
}

impl Attempt {
  fn from_model(model: quiz_attempt::Model, time_limit_minutes: Option<i32>) -> Result<Self, AppError> {
    let started_at = model.started_at.with_timezone(&Utc);
    Ok(Self {
      id: model.id,
      assessment_id: model.assessment_id,
      user_id: model.user_id,
      status: AttemptStatus::from_str(&model.status)
        .map_err(|_| anyhow!("unknown attempt status '{}'", model.status))?,
      score: model.score,
      max_score: model.max_score,
      passed: model.passed,
      results: model.results.map(serde_json::from_value).transpose()?,
      started_at,
      deadline: deadline(started_at, time_limit_minutes),
      submitted_at: model.submitted_at.map(|dt| dt.with_timezone(&Utc)),
    })
  }

  async fn open(
    actor: &Actor,
    module_id: Uuid,
    db: &impl ConnectionTrait,
  ) -> Result<assessment::Model, AppError> {
    let module = find_module(module_id, db).await?;
    ensure_kind(&module, ModuleKind::Assessment)?;
    module_access(actor, &module, db).await?;
    Assessment::require_for_module(module_id, db).await
  }

  /// Begin an attempt, or resume the one still running.
  pub async fn start(
    actor: &Actor,
    module_id: Uuid,
    now: DateTime<Utc>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let assessment = Self::open(actor, module_id, db).await?;

    let running = quiz_attempt::Entity::find()
      .filter(quiz_attempt::Column::AssessmentId.eq(assessment.id))
      .filter(quiz_attempt::Column::UserId.eq(actor.user_id))
      .filter(quiz_attempt::Column::Status.eq(AttemptStatus::InProgress.as_ref()))
      .all(db)
      .await?;
    for attempt in running {
      let started_at = attempt.started_at.with_timezone(&Utc);
      match deadline(started_at, assessment.time_limit_minutes) {
        Some(limit) if limit < now => {
          let mut active: quiz_attempt::ActiveModel = attempt.into();
          active.status = Set(AttemptStatus::Expired.to_string());
          active.update(db).await?;
        }
        _ => return Self::from_model(attempt, assessment.time_limit_minutes),
      }
    }

    if let Some(max) = assessment.max_attempts {
      let used = quiz_attempt::Entity::find()
        .filter(quiz_attempt::Column::AssessmentId.eq(assessment.id))
        .filter(quiz_attempt::Column::UserId.eq(actor.user_id))
        .count(db)
        .await?;
      if used >= u64::try_from(max).unwrap_or(0) {
        return Err(AppError::conflict(format!(
          "all {max} attempts have been used"
        )));
      }
    }

    let model = quiz_attempt::ActiveModel {
      id: Set(Uuid::now_v7()),
      assessment_id: Set(assessment.id),
      user_id: Set(actor.user_id),
      status: Set(AttemptStatus::InProgress.to_string()),
      answers: Set(None),
      results: Set(None),
      score: Set(None),
      max_score: Set(None),
      passed: Set(None),
      started_at: Set(now.into()),
      submitted_at: Set(None),
    }
    .insert(db)
    .await?;

    tracing::debug!(attempt_id = %model.id, user_id = %actor.user_id, "attempt started");

    Self::from_model(model, assessment.time_limit_minutes)
  }

  /// Grade and close an attempt. A passing grade completes the module.
  pub async fn submit(
    actor: &Actor,
    attempt_id: Uuid,
    answers: Vec<AnswerInput>,
    now: DateTime<Utc>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let model = quiz_attempt::Entity::find_by_id(attempt_id)
      .filter(quiz_attempt::Column::UserId.eq(actor.user_id))
      .one(db)
      .await?
      .ok_or_else(|| AppError::not_found("attempt not found"))?;
    if model.status != AttemptStatus::InProgress.as_ref() {
      return Err(AppError::conflict("attempt has already been submitted"));
    }

    let assessment = assessment::Entity::find_by_id(model.assessment_id)
      .one(db)
      .await?
      .ok_or_else(|| anyhow!("attempt {attempt_id} has no assessment"))?;
    let started_at = model.started_at.with_timezone(&Utc);
    if deadline(started_at, assessment.time_limit_minutes).is_some_and(|limit| now > limit) {
      return Err(AppError::conflict("time limit has passed"));
    }

    let questions = Question::for_assessment(assessment.id, db).await?;
    let (results, score, max_score) = grade(&questions, &answers);
    let passed = passed(score, max_score, assessment.pass_score);

    let mut active: quiz_attempt::ActiveModel = model.into();
    active.status = Set(AttemptStatus::Submitted.to_string());
    active.answers = Set(Some(serde_json::to_value(&answers)?));
    active.results = Set(Some(serde_json::to_value(&results)?));
    active.score = Set(Some(score));
    active.max_score = Set(Some(max_score));
    active.passed = Set(Some(passed));
    active.submitted_at = Set(Some(now.into()));
    let model = active.update(db).await?;

    tracing::info!(
      %attempt_id,
      user_id = %actor.user_id,
      score,
      max_score,
      passed,
      "attempt graded"
    );

    if passed {
      Progress::complete(actor, assessment.module_id, now, db).await?;
    }

    Self::from_model(model, assessment.time_limit_minutes)
  }

  /// The actor's attempts on a module's assessment, newest first.
  pub async fn mine(
    actor: &Actor,
    module_id: Uuid,
    db: &impl ConnectionTrait,
  ) -> Result<Vec<Self>, AppError> {
    let assessment = Self::open(actor, module_id, db).await?;

    quiz_attempt::Entity::find()
      .filter(quiz_attempt::Column::AssessmentId.eq(assessment.id))
      .filter(quiz_attempt::Column::UserId.eq(actor.user_id))
      .order_by_desc(quiz_attempt::Column::StartedAt)
      .all(db)
      .await?
      .into_iter()
      .map(|model| Self::from_model(model, assessment.time_limit_minutes))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::{AnswerInput, grade};
  use crate::assessment::{Question, QuestionKind, QuizOption};

  fn choice(points: f64, correct: usize) -> Question {
    Question {
      id: Uuid::now_v7(),
      assessment_id: Uuid::nil(),
      kind: QuestionKind::SingleChoice,
      prompt: "?".into(),
      options: (0..3)
        .map(|i| QuizOption {
          text: i.to_string(),
          is_correct: i == correct,
        })
        .collect(),
      accepted_answers: vec![],
      points,
      position: 0,
      explanation: None,
      image_key: None,
    }
  }

  fn answer(question: &Question, selected: Vec<usize>) -> AnswerInput {
    AnswerInput {
      question_id: question.id,
      selected,
      text: None,
    }
  }

  #[test]
  fn sums_points_and_skips_unanswered() {
    let questions = vec![choice(2.0, 0), choice(3.0, 1), choice(5.0, 2)];
    let answers = vec![
      answer(&questions[0], vec![0]),
      answer(&questions[1], vec![2]),
    ];

    let (results, score, max_score) = grade(&questions, &answers);
    assert_eq!(score, 2.0);
    assert_eq!(max_score, 10.0);
    assert!(results[0].correct);
    assert!(!results[1].correct);
    assert_eq!(results[2].earned, 0.0);
  }

  #[test]
  fn answers_to_unknown_questions_are_ignored() {
    let questions = vec![choice(1.0, 0)];
    let stray = AnswerInput {
      question_id: Uuid::now_v7(),
      selected: vec![0],
      text: None,
    };
    let (results, score, _) = grade(&questions, &[stray]);
    assert_eq!(results.len(), 1);
    assert_eq!(score, 0.0);
  }
}
