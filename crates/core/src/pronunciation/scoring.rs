//! Word-level comparison of a reference text with what the recogniser heard.

use edulane_shared::AppError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Speaking rate band that earns full fluency, in words per second.
const FLUENT_WPS: (f64, f64) = (1.5, 3.5);
/// Rate at which fluency bottoms out on the fast side.
const MAX_WPS: f64 = 7.0;
/// Longest text, in words, either side of the comparison may have.
pub const MAX_WORDS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WordStatus {
  Correct,
  Mispronounced,
  Omitted,
  Inserted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WordResult {
  /// Reference word, or the extra word for insertions
  pub word: String,
  pub recognized: Option<String>,
  pub status: WordStatus,
  /// Character similarity 0.0..=1.0 for mispronounced words
  #[serde(skip_serializing_if = "Option::is_none")]
  pub similarity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PronunciationScore {
  pub accuracy: f64,
  pub completeness: f64,
  pub fluency: f64,
  pub overall: f64,
  pub words: Vec<WordResult>,
}

/// Lower-case words with punctuation removed.
pub(crate) fn words(text: &str) -> Vec<String> {
  text
    .chars()
    .map(|c| {
      if c.is_alphanumeric() || c == '\'' || c.is_whitespace() {
        c
      } else {
        ' '
      }
    })
    .collect::<String>()
    .to_lowercase()
    .split_whitespace()
    .map(|w| w.trim_matches('\'').to_owned())
    .filter(|w| !w.is_empty())
    .collect()
}

/// Minimal edit script turning `reference` into `heard`.
fn align(reference: &[String], heard: &[String]) -> Vec<WordResult> {
  let (n, m) = (reference.len(), heard.len());
  let mut dist = vec![vec![0usize; m + 1]; n + 1];
  for (i, row) in dist.iter_mut().enumerate() {
    row[0] = i;
  }
  for j in 0..=m {
    dist[0][j] = j;
  }
  for i in 1..=n {
    for j in 1..=m {
      let sub = usize::from(reference[i - 1] != heard[j - 1]);
      dist[i][j] = (dist[i - 1][j - 1] + sub)
        .min(dist[i - 1][j] + 1)
        .min(dist[i][j - 1] + 1);
    }
  }

  let mut out = Vec::with_capacity(n.max(m));
  let (mut i, mut j) = (n, m);
  while i > 0 || j > 0 {
    if i > 0 && j > 0 {
      let same = reference[i - 1] == heard[j - 1];
      if dist[i][j] == dist[i - 1][j - 1] + usize::from(!same) {
        out.push(if same {
          WordResult {
            word: reference[i - 1].clone(),
            recognized: Some(heard[j - 1].clone()),
            status: WordStatus::Correct,
            similarity: None,
          }
        } else {
          WordResult {
            word: reference[i - 1].clone(),
            recognized: Some(heard[j - 1].clone()),
            status: WordStatus::Mispronounced,
            similarity: Some(strsim::normalized_levenshtein(
              &reference[i - 1],
              &heard[j - 1],
            )),
          }
        });
        i -= 1;
        j -= 1;
        continue;
      }
    }
    if i > 0 && dist[i][j] == dist[i - 1][j] + 1 {
      out.push(WordResult {
        word: reference[i - 1].clone(),
        recognized: None,
        status: WordStatus::Omitted,
        similarity: None,
      });
      i -= 1;
    } else {
      out.push(WordResult {
        word: heard[j - 1].clone(),
        recognized: Some(heard[j - 1].clone()),
        status: WordStatus::Inserted,
        similarity: None,
      });
      j -= 1;
    }
  }
  out.reverse();
  out
}

fn ratio(part: usize, whole: usize) -> f64 {
  if whole == 0 {
    0.0
  } else {
    100.0 * part as f64 / whole as f64
  }
}

fn fluency(heard: usize, inserted: usize, duration_ms: Option<u32>) -> f64 {
  match duration_ms {
    Some(ms) if ms > 0 => {
      let wps = heard as f64 / (f64::from(ms) / 1000.0);
      let (low, high) = FLUENT_WPS;
      if wps < low {
        100.0 * wps / low
      } else if wps <= high {
        100.0
      } else {
        100.0 * (MAX_WPS - wps) / (MAX_WPS - high)
      }
    }
    Some(_) => 0.0,
    None if heard == 0 => 0.0,
    None => 100.0 * (1.0 - inserted as f64 / heard as f64),
  }
}

fn round1(value: f64) -> f64 {
  (value.clamp(0.0, 100.0) * 10.0).round() / 10.0
}

pub fn score(reference: &str, recognized: &str, duration_ms: Option<u32>) -> Result<PronunciationScore, AppError> {
  let reference = words(reference);
  if reference.is_empty() {
    return Err(AppError::bad_request("reference text has no words"));
  }
  let heard = words(recognized);
  if reference.len() > MAX_WORDS || heard.len() > MAX_WORDS {
    return Err(AppError::bad_request(format!(
      "texts are limited to {MAX_WORDS} words"
    )));
  }
  let results = align(&reference, &heard);

  let count = |status| results.iter().filter(|w| w.status == status).count();
  let correct = count(WordStatus::Correct);
  let mispronounced = count(WordStatus::Mispronounced);
  let inserted = count(WordStatus::Inserted);

  let accuracy = ratio(correct, correct + mispronounced + inserted).clamp(0.0, 100.0);
  let completeness = ratio(correct, reference.len()).clamp(0.0, 100.0);
  let fluency = fluency(heard.len(), inserted, duration_ms).clamp(0.0, 100.0);
  let overall = 0.5 * accuracy + 0.3 * completeness + 0.2 * fluency;

  Ok(PronunciationScore {
    accuracy: round1(accuracy),
    completeness: round1(completeness),
    fluency: round1(fluency),
    overall: round1(overall),
    words: results,
  })
}

#[cfg(test)]
mod tests {
  use super::{MAX_WORDS, WordStatus, score, words};

  fn statuses(reference: &str, heard: &str) -> Vec<WordStatus> {
    score(reference, heard, None)
      .unwrap()
      .words
      .into_iter()
      .map(|w| w.status)
      .collect()
  }

  #[test]
  fn normalizes_case_and_punctuation() {
    assert_eq!(words("Hello, World! It's me."), vec!["hello", "world", "it's", "me"]);
    assert!(words(" ... ").is_empty());
  }

  #[test]
  fn perfect_reading_scores_full_marks() {
    let s = score("The cat sat.", "the cat sat", None).unwrap();
    assert_eq!(s.accuracy, 100.0);
    assert_eq!(s.completeness, 100.0);
    assert_eq!(s.fluency, 100.0);
    assert_eq!(s.overall, 100.0);
  }

  #[test]
  fn classifies_substitution_omission_and_insertion() {
    use WordStatus::*;
    assert_eq!(statuses("the cat sat", "the bat sat"), vec![Correct, Mispronounced, Correct]);
    assert_eq!(statuses("the cat sat", "the sat"), vec![Correct, Omitted, Correct]);
    assert_eq!(
      statuses("the cat sat", "the big cat sat"),
      vec![Correct, Inserted, Correct, Correct]
    );
  }

  #[test]
  fn mispronounced_words_carry_similarity() {
    let s = score("cat", "bat", None).unwrap();
    let similarity = s.words[0].similarity.unwrap();
    assert!((similarity - 2.0 / 3.0).abs() < 1e-9);
  }

  #[test]
  fn partial_reading_lowers_completeness_not_accuracy() {
    let s = score("one two three four", "one two", None).unwrap();
    assert_eq!(s.accuracy, 100.0);
    assert_eq!(s.completeness, 50.0);
    // 0.5 * 100 + 0.3 * 50 + 0.2 * 100
    assert_eq!(s.overall, 85.0);
  }

  #[test]
  fn fluency_follows_speaking_rate() {
    // 4 words in 2s = 2 wps, inside the band
    assert_eq!(score("a b c d", "a b c d", Some(2000)).unwrap().fluency, 100.0);
    // 4 words in 4s = 1 wps
    assert_eq!(score("a b c d", "a b c d", Some(4000)).unwrap().fluency, 66.7);
    // 4 words in 0.8s = 5 wps
    assert_eq!(score("a b c d", "a b c d", Some(800)).unwrap().fluency, 57.1);
  }

  #[test]
  fn silence_scores_zero() {
    let s = score("hello there", "", None).unwrap();
    assert_eq!(s.overall, 0.0);
    assert!(s.words.iter().all(|w| w.status == WordStatus::Omitted));
  }

  #[test]
  fn overlong_texts_are_rejected() {
    let long = "a ".repeat(MAX_WORDS + 1);
    let err = score(&long, "a", None).unwrap_err();
    assert_eq!(err.status_code().as_u16(), 400);
    assert!(score("a", &"b ".repeat(8000), None).is_err());
    assert!(score(&"a ".repeat(MAX_WORDS), &"a ".repeat(MAX_WORDS), None).is_ok());
  }

  #[test]
  fn empty_reference_is_rejected() {
    assert!(score("?!", "hello", None).is_err());
  }
}
