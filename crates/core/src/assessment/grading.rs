//! Pure scoring rules for quiz attempts.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use super::{Question, QuestionKind};

/// Allowance on top of the time limit for network latency.
pub const SUBMIT_GRACE_SECONDS: i64 = 30;

/// Trimmed, whitespace collapsed, case-folded.
pub(crate) fn normalize_answer(text: &str) -> String {
  text
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}

/// Fraction of the question's points earned, 0.0..=1.0.
pub(crate) fn credit(question: &Question, selected: &[usize], text: Option<&str>) -> f64 {
  match question.kind {
    QuestionKind::SingleChoice => {
      let picked: HashSet<_> = selected.iter().collect();
      let exact = picked.len() == 1
        && picked
          .iter()
          .all(|&&i| question.options.get(i).is_some_and(|o| o.is_correct));
      if exact { 1.0 } else { 0.0 }
    }
    QuestionKind::MultipleChoice => {
      let correct = question.options.iter().filter(|o| o.is_correct).count();
      if correct == 0 {
        return 0.0;
      }
      let picked: HashSet<_> = selected.iter().copied().collect();
      let (hits, wrong) = picked.iter().fold((0usize, 0usize), |(hits, wrong), &i| {
        match question.options.get(i) {
          Some(option) if option.is_correct => (hits + 1, wrong),
          _ => (hits, wrong + 1),
        }
      });
      ((hits as f64 - wrong as f64) / correct as f64).max(0.0)
    }
    QuestionKind::FillBlank => {
      let Some(text) = text else {
        return 0.0;
      };
      let given = normalize_answer(text);
      let matched = !given.is_empty()
        && question
          .accepted_answers
          .iter()
          .any(|accepted| normalize_answer(accepted) == given);
      if matched { 1.0 } else { 0.0 }
    }
  }
}

pub(crate) fn passed(score: f64, max_score: f64, pass_score: f64) -> bool {
  max_score > 0.0 && 100.0 * score / max_score >= pass_score
}

/// Latest accepted submission time, if the assessment is timed.
pub(crate) fn deadline(started_at: DateTime<Utc>, time_limit_minutes: Option<i32>) -> Option<DateTime<Utc>> {
  time_limit_minutes.map(|minutes| {
    started_at + Duration::minutes(i64::from(minutes)) + Duration::seconds(SUBMIT_GRACE_SECONDS)
  })
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone, Utc};
  use uuid::Uuid;

  use super::{credit, deadline, normalize_answer, passed};
  use crate::assessment::{Question, QuestionKind, QuizOption};

  fn question(kind: QuestionKind, correct: &[bool], accepted: &[&str]) -> Question {
    Question {
      id: Uuid::now_v7(),
      assessment_id: Uuid::nil(),
      kind,
      prompt: "?".into(),
      options: correct
        .iter()
        .enumerate()
        .map(|(i, &is_correct)| QuizOption {
          text: format!("option {i}"),
          is_correct,
        })
        .collect(),
      accepted_answers: accepted.iter().map(|s| (*s).to_owned()).collect(),
      points: 2.0,
      position: 0,
      explanation: None,
      image_key: None,
    }
  }

  #[test]
  fn single_choice_is_all_or_nothing() {
    let q = question(QuestionKind::SingleChoice, &[false, true, false], &[]);
    assert_eq!(credit(&q, &[1], None), 1.0);
    assert_eq!(credit(&q, &[1, 1], None), 1.0);
    assert_eq!(credit(&q, &[0], None), 0.0);
    assert_eq!(credit(&q, &[0, 1], None), 0.0);
    assert_eq!(credit(&q, &[], None), 0.0);
    assert_eq!(credit(&q, &[9], None), 0.0);
  }

  #[test]
  fn multiple_choice_gives_partial_credit() {
    let q = question(QuestionKind::MultipleChoice, &[true, true, false, false], &[]);
    assert_eq!(credit(&q, &[0, 1], None), 1.0);
    assert_eq!(credit(&q, &[0], None), 0.5);
    assert_eq!(credit(&q, &[0, 2], None), 0.0);
    assert_eq!(credit(&q, &[2, 3], None), 0.0);
    assert_eq!(credit(&q, &[0, 1, 2], None), 0.5);
  }

  #[test]
  fn fill_blank_ignores_case_and_spacing() {
    let q = question(QuestionKind::FillBlank, &[], &["New  York", "NYC"]);
    assert_eq!(credit(&q, &[], Some("  new york ")), 1.0);
    assert_eq!(credit(&q, &[], Some("nyc")), 1.0);
    assert_eq!(credit(&q, &[], Some("boston")), 0.0);
    assert_eq!(credit(&q, &[], Some("   ")), 0.0);
    assert_eq!(credit(&q, &[], None), 0.0);
  }

  #[test]
  fn normalizes_whitespace() {
    assert_eq!(normalize_answer("\tHello   World\n"), "hello world");
  }

  #[test]
  fn pass_threshold_is_inclusive() {
    assert!(passed(7.0, 10.0, 70.0));
    assert!(!passed(6.9, 10.0, 70.0));
    assert!(!passed(0.0, 0.0, 0.0));
  }

  #[test]
  fn deadline_includes_grace() {
    let start = Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap();
    assert_eq!(deadline(start, None), None);
    assert_eq!(
      deadline(start, Some(10)),
      Some(start + Duration::minutes(10) + Duration::seconds(30))
    );
  }
}
