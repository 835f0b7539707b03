use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use edulane_entities::{lesson, lesson_module};
use edulane_shared::AppError;
use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ExprTrait, PaginatorTrait,
  QueryFilter, QueryOrder, QuerySelect, Set, prelude::Expr,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
  Lecture, ModuleAccess, ModuleKind, Subtree, clean_title, find_module, managed_course,
  module_access, subtree_media_keys, validate_reorder,
};
use crate::{
  Actor,
  assessment::{Assessment, AssessmentView},
  flashcard::Flashcard,
};

#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct Module {
  pub id: Uuid,
  pub lesson_id: Uuid,
  pub course_id: Uuid,
  pub title: String,
  pub kind: ModuleKind,
  pub position: i32,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ModuleInput {
  pub title: String,
  pub kind: ModuleKind,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ModuleUpdate {
  pub title: String,
}

/// What a learner opens when they enter a module.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleContent {
  Lecture {
    module: Module,
    lecture: Option<Lecture>,
  },
  Flashcard {
    module: Module,
    cards: Vec<Flashcard>,
  },
  Assessment {
    module: Module,
    assessment: Option<AssessmentView>,
  },
}

impl Module {
  pub fn from_model(model: lesson_module::Model) -> Result<Self, AppError> {
    Ok(Self {
      id: model.id,
      lesson_id: model.lesson_id,
      course_id: model.course_id,
      kind: ModuleKind::from_str(&model.kind)
        .map_err(|_| anyhow!("unknown module kind '{}'", model.kind))?,
      title: model.title,
      position: model.position,
      created_at: model.created_at.with_timezone(&Utc),
    })
  }

  pub async fn create(
    actor: &Actor,
    lesson_id: Uuid,
    input: ModuleInput,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let lesson = lesson::Entity::find_by_id(lesson_id)
      .one(db)
      .await?
      .ok_or_else(|| AppError::not_found("lesson not found"))?;
    managed_course(actor, lesson.course_id, db).await?;
    let title = clean_title(&input.title)?;

    let position = lesson_module::Entity::find()
      .filter(lesson_module::Column::LessonId.eq(lesson_id))
      .count(db)
      .await?;

    let model = lesson_module::ActiveModel {
      id: Set(Uuid::now_v7()),
      lesson_id: Set(lesson_id),
      course_id: Set(lesson.course_id),
      title: Set(title),
      kind: Set(input.kind.to_string()),
      position: Set(i32::try_from(position).unwrap_or(i32::MAX)),
      created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;

    tracing::debug!(module_id = %model.id, %lesson_id, kind = %input.kind, "module created");

    Self::from_model(model)
  }

  pub async fn update(
    actor: &Actor,
    id: Uuid,
    input: ModuleUpdate,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let model = find_module(id, db).await?;
    managed_course(actor, model.course_id, db).await?;

    let mut active: lesson_module::ActiveModel = model.into();
    active.title = Set(clean_title(&input.title)?);

    Self::from_model(active.update(db).await?)
  }

  /// Returns the media keys referenced by the deleted module.
  pub async fn delete(actor: &Actor, id: Uuid, db: &impl ConnectionTrait) -> Result<Vec<String>, AppError> {
    let model = find_module(id, db).await?;
    managed_course(actor, model.course_id, db).await?;

    let keys = subtree_media_keys(Subtree::Module(id), db).await?;
    lesson_module::Entity::delete_by_id(id).exec(db).await?;

    lesson_module::Entity::update_many()
      .col_expr(
        lesson_module::Column::Position,
        Expr::col(lesson_module::Column::Position).sub(1),
      )
      .filter(lesson_module::Column::LessonId.eq(model.lesson_id))
      .filter(lesson_module::Column::Position.gt(model.position))
      .exec(db)
      .await?;

    Ok(keys)
  }

  /// Set module order within a lesson; `ids` must list every module of the lesson.
  pub async fn reorder(
    actor: &Actor,
    lesson_id: Uuid,
    ids: &[Uuid],
    db: &impl ConnectionTrait,
  ) -> Result<Vec<Self>, AppError> {
    let lesson = lesson::Entity::find_by_id(lesson_id)
      .one(db)
      .await?
      .ok_or_else(|| AppError::not_found("lesson not found"))?;
    managed_course(actor, lesson.course_id, db).await?;

    let existing: Vec<Uuid> = lesson_module::Entity::find()
      .select_only()
      .column(lesson_module::Column::Id)
      .filter(lesson_module::Column::LessonId.eq(lesson_id))
      .into_tuple()
      .all(db)
      .await?;
    validate_reorder(&existing, ids)?;

    for (position, id) in ids.iter().enumerate() {
      lesson_module::Entity::update_many()
        .col_expr(
          lesson_module::Column::Position,
          Expr::value(i32::try_from(position).unwrap_or(i32::MAX)),
        )
        .filter(lesson_module::Column::Id.eq(*id))
        .exec(db)
        .await?;
    }

    lesson_module::Entity::find()
      .filter(lesson_module::Column::LessonId.eq(lesson_id))
      .order_by_asc(lesson_module::Column::Position)
      .all(db)
      .await?
      .into_iter()
      .map(Self::from_model)
      .collect()
  }

  /// Module body for the course's managers and enrolled learners.
  /// Learners never see answer keys.
  pub async fn content(actor: &Actor, id: Uuid, db: &impl ConnectionTrait) -> Result<ModuleContent, AppError> {
    let model = find_module(id, db).await?;
    let access = module_access(actor, &model, db).await?;
    let module = Self::from_model(model)?;

    let content = match module.kind {
      ModuleKind::Lecture => ModuleContent::Lecture {
        lecture: Lecture::find(id, &module.title, db).await?,
        module,
      },
      ModuleKind::Flashcard => ModuleContent::Flashcard {
        cards: Flashcard::list(id, db).await?,
        module,
      },
      ModuleKind::Assessment => ModuleContent::Assessment {
        assessment: Assessment::view(id, access == ModuleAccess::Manager, db).await?,
        module,
      },
    };

    Ok(content)
  }
}
