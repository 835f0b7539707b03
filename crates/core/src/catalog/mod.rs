//! Course authoring: courses hold ordered lessons, lessons hold ordered modules, and
//! each module is a lecture, a flashcard deck or an assessment.

mod course;
mod lecture;
mod lesson;
mod module;

pub use course::{Course, CourseInput, CourseOutline, CourseUpdate, LessonOutline};
pub use lecture::{Lecture, LectureInput};
pub use lesson::{Lesson, LessonInput};
pub use module::{Module, ModuleContent, ModuleInput, ModuleUpdate};

use std::collections::HashSet;

use edulane_entities::{course as course_entity, enrollment, lesson_module};
use edulane_shared::AppError;
use sea_orm::{
  ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, FromQueryResult, QueryFilter, Statement,
};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{Actor, enrollment::EnrollmentStatus};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModuleKind {
  Lecture,
  Flashcard,
  Assessment,
}

pub(crate) fn clean_title(title: &str) -> Result<String, AppError> {
  let title = title.trim();
  if title.is_empty() {
    return Err(AppError::bad_request("title must not be empty"));
  }
  Ok(title.to_owned())
}

/// `requested` must name every existing child exactly once.
pub(crate) fn validate_reorder(existing: &[Uuid], requested: &[Uuid]) -> Result<(), AppError> {
  let existing: HashSet<_> = existing.iter().collect();
  let mut seen = HashSet::with_capacity(requested.len());
  for id in requested {
    if !existing.contains(id) {
      return Err(AppError::bad_request(format!("{id} does not belong here")));
    }
    if !seen.insert(id) {
      return Err(AppError::bad_request(format!("{id} is listed twice")));
    }
  }
  if seen.len() != existing.len() {
    return Err(AppError::bad_request("reorder must list every item"));
  }
  Ok(())
}

pub(crate) async fn find_course(
  id: Uuid,
  db: &impl ConnectionTrait,
) -> Result<course_entity::Model, AppError> {
  course_entity::Entity::find_by_id(id)
    .one(db)
    .await?
    .ok_or_else(|| AppError::not_found("course not found"))
}

/// The course, if `actor` may edit it.
pub(crate) async fn managed_course(
  actor: &Actor,
  id: Uuid,
  db: &impl ConnectionTrait,
) -> Result<course_entity::Model, AppError> {
  let course = find_course(id, db).await?;
  actor.ensure_can_manage(course.teacher_id, "course")?;
  Ok(course)
}

/// The course, if it is published or `actor` manages it. Drafts read as missing.
pub(crate) async fn readable_course(
  actor: &Actor,
  id: Uuid,
  db: &impl ConnectionTrait,
) -> Result<course_entity::Model, AppError> {
  let course = find_course(id, db).await?;
  if course.is_published || actor.can_manage(course.teacher_id) {
    Ok(course)
  } else {
    Err(AppError::not_found("course not found"))
  }
}

pub(crate) async fn is_enrolled(
  user_id: Uuid,
  course_id: Uuid,
  db: &impl ConnectionTrait,
) -> Result<bool, AppError> {
  Ok(
    enrollment::Entity::find()
      .filter(enrollment::Column::CourseId.eq(course_id))
      .filter(enrollment::Column::UserId.eq(user_id))
      .filter(enrollment::Column::Status.eq(EnrollmentStatus::Active.as_ref()))
      .one(db)
      .await?
      .is_some(),
  )
}

pub(crate) async fn find_module(
  id: Uuid,
  db: &impl ConnectionTrait,
) -> Result<lesson_module::Model, AppError> {
  lesson_module::Entity::find_by_id(id)
    .one(db)
    .await?
    .ok_or_else(|| AppError::not_found("module not found"))
}

/// How the actor relates to a module's course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ModuleAccess {
  Manager,
  Learner,
}

/// Module content is open to the course's managers and its actively enrolled learners.
pub(crate) async fn module_access(
  actor: &Actor,
  module: &lesson_module::Model,
  db: &impl ConnectionTrait,
) -> Result<ModuleAccess, AppError> {
  let course = find_course(module.course_id, db).await?;
  if actor.can_manage(course.teacher_id) {
    return Ok(ModuleAccess::Manager);
  }
  if course.is_published && is_enrolled(actor.user_id, course.id, db).await? {
    return Ok(ModuleAccess::Learner);
  }
  Err(AppError::forbidden("enroll in this course to access its content"))
}

/// Module owned by a course the actor manages, checked against the expected kind.
pub(crate) async fn managed_module(
  actor: &Actor,
  id: Uuid,
  kind: ModuleKind,
  db: &impl ConnectionTrait,
) -> Result<lesson_module::Model, AppError> {
  let module = find_module(id, db).await?;
  managed_course(actor, module.course_id, db).await?;
  ensure_kind(&module, kind)?;
  Ok(module)
}

pub(crate) fn ensure_kind(module: &lesson_module::Model, kind: ModuleKind) -> Result<(), AppError> {
  if module.kind == kind.as_ref() {
    Ok(())
  } else {
    Err(AppError::bad_request(format!("module is not a {kind} module")))
  }
}

/// A deleted part of the course tree.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Subtree {
  Course(Uuid),
  Lesson(Uuid),
  Module(Uuid),
}

#[derive(Debug, FromQueryResult)]
struct KeyRow {
  key: String,
}

/// Every media key referenced below `subtree`. Collected before the delete cascades.
pub(crate) async fn subtree_media_keys(
  subtree: Subtree,
  db: &impl ConnectionTrait,
) -> Result<Vec<String>, AppError> {
  let (predicate, id) = match subtree {
    Subtree::Course(id) => ("course_id", id),
    Subtree::Lesson(id) => ("lesson_id", id),
    Subtree::Module(id) => ("id", id),
  };
  let sql = format!(
    "WITH mods AS (SELECT id FROM lesson_module WHERE {predicate} = $1) \
     SELECT key FROM ( \
       SELECT video_key AS key FROM lecture WHERE module_id IN (SELECT id FROM mods) \
       UNION ALL SELECT attachment_key FROM lecture WHERE module_id IN (SELECT id FROM mods) \
       UNION ALL SELECT image_key FROM flashcard WHERE module_id IN (SELECT id FROM mods) \
       UNION ALL SELECT audio_key FROM flashcard WHERE module_id IN (SELECT id FROM mods) \
       UNION ALL SELECT q.image_key FROM quiz_question q \
         JOIN assessment a ON a.id = q.assessment_id WHERE a.module_id IN (SELECT id FROM mods) \
       UNION ALL SELECT s.attachment_key FROM essay_submission s \
         JOIN essay_prompt p ON p.id = s.essay_id \
         JOIN assessment a ON a.id = p.assessment_id WHERE a.module_id IN (SELECT id FROM mods) \
     ) keys WHERE key IS NOT NULL"
  );

  let rows = KeyRow::find_by_statement(Statement::from_sql_and_values(
    DbBackend::Postgres,
    sql,
    [id.into()],
  ))
  .all(db)
  .await?;

  Ok(rows.into_iter().map(|row| row.key).collect())
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use uuid::Uuid;

  use super::{ModuleKind, clean_title, validate_reorder};

  #[test]
  fn titles_are_trimmed_and_required() {
    assert_eq!(clean_title("  Verbs  ").unwrap(), "Verbs");
    assert!(clean_title(" \t ").is_err());
  }

  #[test]
  fn reorder_requires_the_exact_set() {
    let (a, b, c) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
    let existing = [a, b, c];

    assert!(validate_reorder(&existing, &[c, a, b]).is_ok());
    assert!(validate_reorder(&existing, &[a, b]).is_err());
    assert!(validate_reorder(&existing, &[a, b, b]).is_err());
    assert!(validate_reorder(&existing, &[a, b, c, Uuid::now_v7()]).is_err());
    assert!(validate_reorder(&[], &[]).is_ok());
  }

  #[test]
  fn module_kinds_use_snake_case() {
    assert_eq!(ModuleKind::Flashcard.to_string(), "flashcard");
    assert_eq!(ModuleKind::from_str("assessment").unwrap(), ModuleKind::Assessment);
    assert_eq!(
      serde_json::to_string(&ModuleKind::Lecture).unwrap(),
      "\"lecture\""
    );
  }
}
