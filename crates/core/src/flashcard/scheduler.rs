use chrono::{DateTime, Duration, Utc};
use edulane_shared::AppError;
use fsrs::{DEFAULT_PARAMETERS, FSRS, MemoryState};
use strum::{Display, EnumString};

pub const INITIAL_EASINESS: f64 = 2.5;
pub const MIN_EASINESS: f64 = 1.3;
pub const DESIRED_RETENTION: f32 = 0.9;

/// Self-graded recall quality, 0 (blackout) to 5 (perfect).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
  pub fn new(value: i32) -> Result<Self, AppError> {
    match u8::try_from(value) {
      Ok(q @ 0..=5) => Ok(Self(q)),
      _ => Err(AppError::bad_request("quality must be between 0 and 5")),
    }
  }

  #[must_use]
  pub const fn get(self) -> u8 {
    self.0
  }

  const fn recalled(self) -> bool {
    self.0 >= 3
  }
}

/// Scheduling state of one card for one learner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardState {
  pub repetitions: i32,
  pub interval_days: i32,
  pub easiness_factor: f64,
  pub stability: Option<f32>,
  pub difficulty: Option<f32>,
  pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl CardState {
  pub const NEW: Self = Self {
    repetitions: 0,
    interval_days: 0,
    easiness_factor: INITIAL_EASINESS,
    stability: None,
    difficulty: None,
    last_reviewed_at: None,
  };

  /// When the card is due again.
  #[must_use]
  pub fn due_at(&self, reviewed_at: DateTime<Utc>) -> DateTime<Utc> {
    reviewed_at + Duration::days(i64::from(self.interval_days))
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ReviewScheduler {
  #[default]
  Sm2,
  Fsrs,
}

impl ReviewScheduler {
  /// State after reviewing `state` with `quality` at `now`.
  pub fn schedule(
    self,
    state: &CardState,
    quality: Quality,
    now: DateTime<Utc>,
  ) -> Result<CardState, AppError> {
    let next = match self {
      Self::Sm2 => sm2(state, quality),
      Self::Fsrs => fsrs(state, quality, now)?,
    };
    Ok(CardState {
      last_reviewed_at: Some(now),
      ..next
    })
  }
}

fn sm2(state: &CardState, quality: Quality) -> CardState {
  let q = f64::from(quality.get());
  let ef = state.easiness_factor;
  let easiness_factor = (ef + 0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02)).max(MIN_EASINESS);

  let (repetitions, interval_days) = if quality.recalled() {
    let interval = match state.repetitions {
      0 => 1,
      1 => 6,
      _ => (f64::from(state.interval_days) * ef).round() as i32,
    };
    (state.repetitions + 1, interval.max(1))
  } else {
    (0, 1)
  };

  CardState {
    repetitions,
    interval_days,
    easiness_factor,
    ..*state
  }
}

fn fsrs(state: &CardState, quality: Quality, now: DateTime<Utc>) -> Result<CardState, AppError> {
  let fsrs = FSRS::new(Some(&DEFAULT_PARAMETERS))?;

  let memory = match (state.stability, state.difficulty) {
    (Some(stability), Some(difficulty)) => Some(MemoryState {
      stability,
      difficulty,
    }),
    _ => None,
  };
  let elapsed_days = state
    .last_reviewed_at
    .map_or(0, |last| (now - last).num_days().max(0) as u32);

  let next = fsrs.next_states(memory, DESIRED_RETENTION, elapsed_days)?;
  let item = match quality.get() {
    0..=2 => next.again,
    3 => next.hard,
    4 => next.good,
    _ => next.easy,
  };

  Ok(CardState {
    repetitions: if quality.recalled() {
      state.repetitions + 1
    } else {
      0
    },
    interval_days: (item.interval.round() as i32).max(1),
    stability: Some(item.memory.stability),
    difficulty: Some(item.memory.difficulty),
    ..*state
  })
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use chrono::{Duration, TimeZone, Utc};

  use super::{CardState, MIN_EASINESS, Quality, ReviewScheduler};

  fn q(value: i32) -> Quality {
    Quality::new(value).unwrap()
  }

  #[test]
  fn quality_must_be_in_range() {
    assert!(Quality::new(-1).is_err());
    assert!(Quality::new(6).is_err());
    assert_eq!(q(5).get(), 5);
  }

  #[test]
  fn sm2_intervals_follow_one_six_then_ef() {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    let sched = ReviewScheduler::Sm2;

    let first = sched.schedule(&CardState::NEW, q(4), now).unwrap();
    assert_eq!((first.repetitions, first.interval_days), (1, 1));
    assert!((first.easiness_factor - 2.5).abs() < 1e-9);

    let second = sched.schedule(&first, q(4), now).unwrap();
    assert_eq!((second.repetitions, second.interval_days), (2, 6));

    let third = sched.schedule(&second, q(4), now).unwrap();
    assert_eq!((third.repetitions, third.interval_days), (3, 15));
  }

  #[test]
  fn sm2_lapse_resets_and_lowers_easiness() {
    let now = Utc::now();
    let state = CardState {
      repetitions: 4,
      interval_days: 30,
      ..CardState::NEW
    };

    let next = ReviewScheduler::Sm2.schedule(&state, q(1), now).unwrap();
    assert_eq!(next.repetitions, 0);
    assert_eq!(next.interval_days, 1);
    // 2.5 + 0.1 - 4 * (0.08 + 4 * 0.02)
    assert!((next.easiness_factor - 1.96).abs() < 1e-9);
  }

  #[test]
  fn sm2_easiness_has_a_floor() {
    let mut state = CardState::NEW;
    for _ in 0..10 {
      state = ReviewScheduler::Sm2.schedule(&state, q(0), Utc::now()).unwrap();
    }
    assert!((state.easiness_factor - MIN_EASINESS).abs() < 1e-9);
  }

  #[test]
  fn perfect_answer_raises_easiness() {
    let next = ReviewScheduler::Sm2
      .schedule(&CardState::NEW, q(5), Utc::now())
      .unwrap();
    assert!((next.easiness_factor - 2.6).abs() < 1e-9);
  }

  #[test]
  fn fsrs_tracks_memory_state_and_ordering() {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    let sched = ReviewScheduler::Fsrs;

    let again = sched.schedule(&CardState::NEW, q(1), now).unwrap();
    let easy = sched.schedule(&CardState::NEW, q(5), now).unwrap();

    assert!(again.stability.is_some() && again.difficulty.is_some());
    assert_eq!(again.repetitions, 0);
    assert_eq!(easy.repetitions, 1);
    assert!(again.interval_days >= 1);
    assert!(easy.interval_days >= again.interval_days);
  }

  #[test]
  fn due_date_adds_interval() {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    let state = CardState {
      interval_days: 6,
      ..CardState::NEW
    };
    assert_eq!(state.due_at(now), now + Duration::days(6));
  }

  #[test]
  fn parses_configured_scheduler() {
    assert_eq!(ReviewScheduler::from_str("fsrs").unwrap(), ReviewScheduler::Fsrs);
    assert_eq!(ReviewScheduler::from_str("sm2").unwrap(), ReviewScheduler::Sm2);
    assert!(ReviewScheduler::from_str("leitner").is_err());
  }
}
