use chrono::{DateTime, Utc};
use edulane_entities::{course, lesson, lesson_module};
use edulane_shared::{AppError, Page, PageQuery, Role};
use sea_orm::{
  ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
  QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
  Lesson, Module, Subtree, clean_title, managed_course, readable_course, subtree_media_keys,
};
use crate::{
  Actor,
  media::{MediaField, MediaPlan, MediaPrefix},
  package,
};

#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct Course {
  pub id: Uuid,
  pub teacher_id: Uuid,
  pub title: String,
  pub description: String,
  /// 0 means free
  pub price_cents: i64,
  pub thumbnail_key: Option<String>,
  pub is_published: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CourseInput {
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub price_cents: i64,
  #[serde(default)]
  pub thumbnail: MediaField,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CourseUpdate {
  pub title: Option<String>,
  pub description: Option<String>,
  pub price_cents: Option<i64>,
  #[serde(default)]
  pub thumbnail: MediaField,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LessonOutline {
  #[serde(flatten)]
  pub lesson: Lesson,
  pub modules: Vec<Module>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseOutline {
  pub course: Course,
  pub lessons: Vec<LessonOutline>,
}

fn validate_price(price_cents: i64) -> Result<i64, AppError> {
  if price_cents < 0 {
    return Err(AppError::bad_request("price must not be negative"));
  }
  Ok(price_cents)
}

impl Course {
  #[must_use]
  pub fn from_model(model: course::Model) -> Self {
    Self {
      id: model.id,
      teacher_id: model.teacher_id,
      title: model.title,
      description: model.description,
      price_cents: model.price_cents,
      thumbnail_key: model.thumbnail_key,
      is_published: model.is_published,
      created_at: model.created_at.with_timezone(&Utc),
      updated_at: model.updated_at.with_timezone(&Utc),
    }
  }

  pub async fn get(actor: &Actor, id: Uuid, db: &impl ConnectionTrait) -> Result<Self, AppError> {
    Ok(Self::from_model(readable_course(actor, id, db).await?))
  }

  /// Published courses for everyone, plus own drafts for teachers and all drafts for admins.
  pub async fn list(
    actor: &Actor,
    mine_only: bool,
    page: &PageQuery,
    db: &impl ConnectionTrait,
  ) -> Result<Page<Self>, AppError> {
    let mut query = course::Entity::find();
    if mine_only {
      query = query.filter(course::Column::TeacherId.eq(actor.user_id));
    } else {
      match actor.role {
        Role::Admin => {}
        Role::Teacher => {
          query = query.filter(
            Condition::any()
              .add(course::Column::IsPublished.eq(true))
              .add(course::Column::TeacherId.eq(actor.user_id)),
          );
        }
        Role::Learner => {
          query = query.filter(course::Column::IsPublished.eq(true));
        }
      }
    }

    let paginator = query
      .order_by_desc(course::Column::CreatedAt)
      .paginate(db, page.per_page());
    let total = paginator.num_items().await?;
    let items = paginator
      .fetch_page(page.index())
      .await?
      .into_iter()
      .map(Self::from_model)
      .collect();

    Ok(Page::new(items, total, page))
  }

  pub async fn create(
    actor: &Actor,
    input: CourseInput,
    media: &mut MediaPlan<'_>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    actor.require_role(&[Role::Teacher, Role::Admin])?;
    let title = clean_title(&input.title)?;
    let price_cents = validate_price(input.price_cents)?;

    let now = Utc::now();
    package::ensure_can_create_course(actor, now, db).await?;

    let thumbnail_key = media
      .apply(&input.thumbnail, None, MediaPrefix::Courses, db)
      .await?;

    let model = course::ActiveModel {
      id: Set(Uuid::now_v7()),
      teacher_id: Set(actor.user_id),
      title: Set(title),
      description: Set(input.description),
      price_cents: Set(price_cents),
      thumbnail_key: Set(thumbnail_key),
      is_published: Set(false),
      created_at: Set(now.into()),
      updated_at: Set(now.into()),
    }
    .insert(db)
    .await?;

    tracing::info!(course_id = %model.id, teacher_id = %actor.user_id, "course created");

    Ok(Self::from_model(model))
  }

  pub async fn update(
    actor: &Actor,
    id: Uuid,
    input: CourseUpdate,
    media: &mut MediaPlan<'_>,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let model = managed_course(actor, id, db).await?;

    let thumbnail_key = media
      .apply(
        &input.thumbnail,
        model.thumbnail_key.clone(),
        MediaPrefix::Courses,
        db,
      )
      .await?;

    let mut active: course::ActiveModel = model.into();
    if let Some(title) = input.title {
      active.title = Set(clean_title(&title)?);
    }
    if let Some(description) = input.description {
      active.description = Set(description);
    }
    if let Some(price_cents) = input.price_cents {
      active.price_cents = Set(validate_price(price_cents)?);
    }
    active.thumbnail_key = Set(thumbnail_key);
    active.updated_at = Set(Utc::now().into());

    Ok(Self::from_model(active.update(db).await?))
  }

  pub async fn set_published(
    actor: &Actor,
    id: Uuid,
    published: bool,
    db: &impl ConnectionTrait,
  ) -> Result<Self, AppError> {
    let model = managed_course(actor, id, db).await?;
    if model.is_published == published {
      return Ok(Self::from_model(model));
    }

    let mut active: course::ActiveModel = model.into();
    active.is_published = Set(published);
    active.updated_at = Set(Utc::now().into());
    let model = active.update(db).await?;

    tracing::info!(course_id = %id, published, "course visibility changed");

    Ok(Self::from_model(model))
  }

  /// Delete the course and everything below it. Returns the media keys to remove.
  pub async fn delete(actor: &Actor, id: Uuid, db: &impl ConnectionTrait) -> Result<Vec<String>, AppError> {
    let model = managed_course(actor, id, db).await?;

    let mut keys = subtree_media_keys(Subtree::Course(id), db).await?;
    keys.extend(model.thumbnail_key);

    course::Entity::delete_by_id(id).exec(db).await?;

    tracing::info!(course_id = %id, media = keys.len(), "course deleted");

    Ok(keys)
  }

  /// Course with its lessons and modules in order.
  pub async fn outline(actor: &Actor, id: Uuid, db: &impl ConnectionTrait) -> Result<CourseOutline, AppError> {
    let course = readable_course(actor, id, db).await?;

    let lessons = lesson::Entity::find()
      .filter(lesson::Column::CourseId.eq(id))
      .order_by_asc(lesson::Column::Position)
      .all(db)
      .await?;
    let modules = lesson_module::Entity::find()
      .filter(lesson_module::Column::CourseId.eq(id))
      .order_by_asc(lesson_module::Column::Position)
      .all(db)
      .await?
      .into_iter()
      .map(Module::from_model)
      .collect::<Result<Vec<_>, _>>()?;

    let lessons = lessons
      .into_iter()
      .map(|lesson| LessonOutline {
        modules: modules
          .iter()
          .filter(|module| module.lesson_id == lesson.id)
          .cloned()
          .collect(),
        lesson: Lesson::from_model(lesson),
      })
      .collect();

    Ok(CourseOutline {
      course: Self::from_model(course),
      lessons,
    })
  }
}
