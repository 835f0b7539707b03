use chrono::{DateTime, Utc};
use edulane_entities::lesson;
use edulane_shared::AppError;
use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ExprTrait, PaginatorTrait,
  QueryFilter, QueryOrder, QuerySelect, Set, prelude::Expr,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Subtree, clean_title, managed_course, subtree_media_keys, validate_reorder};
use crate::Actor;

#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct Lesson {
  pub id: Uuid,
  pub course_id: Uuid,
  pub title: String,
  pub description: String,
  pub position: i32,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LessonInput {
  pub title: String,
  #[serde(default)]
  pub description: String,
}

impl Lesson {
  #[must_use]
  pub fn from_model(model: lesson::Model) -> Self {
    Self {
      id: model.id,
      course_id: model.course_id,
      title: model.title,
      description: model.description,
      position: model.position,
      created_at: model.created_at.with_timezone(&Utc),
    }
  }

  async fn find(id: Uuid, db: &impl ConnectionTrait) -> Result<lesson::Model, AppError> {
    lesson::Entity::find_by_id(id)
      .one(db)
      .await?
      .ok_or_else(|| AppError::not_found("lesson not found"))
  }

  /// Appends the lesson after the course's existing ones.
  pub async fn create(
    actor: &Actor,
    course_id: Uuid,
    input: LessonInput,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    managed_course(actor, course_id, db).await?;
    let title = clean_title(&input.title)?;

    let position = lesson::Entity::find()
      .filter(lesson::Column::CourseId.eq(course_id))
      .count(db)
      .await?;

    let model = lesson::ActiveModel {
      id: Set(Uuid::now_v7()),
      course_id: Set(course_id),
      title: Set(title),
      description: Set(input.description),
      position: Set(i32::try_from(position).unwrap_or(i32::MAX)),
      created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;

    Ok(Self::from_model(model))
  }

  pub async fn update(
    actor: &Actor,
    id: Uuid,
    input: LessonInput,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let model = Self::find(id, db).await?;
    managed_course(actor, model.course_id, db).await?;

    let mut active: lesson::ActiveModel = model.into();
    active.title = Set(clean_title(&input.title)?);
    active.description = Set(input.description);

    Ok(Self::from_model(active.update(db).await?))
  }

  /// Returns the media keys referenced by the deleted lesson.
  pub async fn delete(actor: &Actor, id: Uuid, db: &impl ConnectionTrait) -> Result<Vec<String>, AppError> {
    let model = Self::find(id, db).await?;
    managed_course(actor, model.course_id, db).await?;

    let keys = subtree_media_keys(Subtree::Lesson(id), db).await?;
    lesson::Entity::delete_by_id(id).exec(db).await?;

    // close the gap left behind
    lesson::Entity::update_many()
      .col_expr(
        lesson::Column::Position,
        Expr::col(lesson::Column::Position).sub(1),
      )
      .filter(lesson::Column::CourseId.eq(model.course_id))
      .filter(lesson::Column::Position.gt(model.position))
      .exec(db)
      .await?;

    Ok(keys)
  }

  /// Set lesson order; `ids` must list every lesson of the course.
  pub async fn reorder(
    actor: &Actor,
    course_id: Uuid,
    ids: &[Uuid],
    db: &impl ConnectionTrait,
  ) -> Result<Vec<Self>, AppError> {
    managed_course(actor, course_id, db).await?;

    let existing: Vec<Uuid> = lesson::Entity::find()
      .select_only()
      .column(lesson::Column::Id)
      .filter(lesson::Column::CourseId.eq(course_id))
      .into_tuple()
      .all(db)
      .await?;
    validate_reorder(&existing, ids)?;

    for (position, id) in ids.iter().enumerate() {
      lesson::Entity::update_many()
        .col_expr(
          lesson::Column::Position,
          Expr::value(i32::try_from(position).unwrap_or(i32::MAX)),
        )
        .filter(lesson::Column::Id.eq(*id))
        .exec(db)
        .await?;
    }

    Ok(
      lesson::Entity::find()
        .filter(lesson::Column::CourseId.eq(course_id))
        .order_by_asc(lesson::Column::Position)
        .all(db)
        .await?
        .into_iter()
        .map(Self::from_model)
        .collect(),
    )
  }
}
