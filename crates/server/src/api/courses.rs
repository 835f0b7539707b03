use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use chrono::Utc;
use edulane_core::{
  Course, Enrollment, Progress,
  catalog::{CourseInput, CourseOutline, CourseUpdate},
  enrollment::{CourseProgress, EnrolledCourse, Student},
};
use edulane_shared::{AppError, Page, PageQuery};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::utils::{AppState, Auth, commit_with_media};

#[derive(Deserialize, IntoParams)]
pub struct CourseFilter {
  /// Only courses the caller teaches
  #[serde(default)]
  pub mine: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct Publication {
  pub published: bool,
}

/// Courses visible to the caller
#[utoipa::path(
  get,
  path = "/api/v1/courses",
  tag = "courses",
  security(("bearer" = [])),
  params(CourseFilter, PageQuery),
  responses((status = 200, description = "Courses, newest first", body = Page<Course>))
)]
#[axum::debug_handler]
pub async fn list_courses(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Query(filter): Query<CourseFilter>,
  Query(page): Query<PageQuery>,
) -> Result<Json<Page<Course>>, AppError> {
  Ok(Json(Course::list(&actor, filter.mine, &page, &state.db).await?))
}

/// Create a draft course (teachers)
#[utoipa::path(
  post,
  path = "/api/v1/courses",
  tag = "courses",
  security(("bearer" = [])),
  request_body = CourseInput,
  responses(
    (status = 201, description = "Course created", body = Course),
    (status = 402, description = "Course quota of the current plan reached"),
    (status = 403, description = "Learners cannot create courses")
  )
)]
#[axum::debug_handler]
pub async fn create_course(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Json(payload): Json<CourseInput>,
) -> Result<(StatusCode, Json<Course>), AppError> {
  let txn = state.begin(&actor).await?;
  let mut plan = state.media_plan(&actor);
  let res = Course::create(&actor, payload, &mut plan, &txn).await;
  let course = commit_with_media(&state, txn, plan, res).await?;
  Ok((StatusCode::CREATED, Json(course)))
}

#[utoipa::path(
  get,
  path = "/api/v1/courses/{id}",
  tag = "courses",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Course id")),
  responses(
    (status = 200, description = "Course", body = Course),
    (status = 404, description = "Course not found or not published")
  )
)]
#[axum::debug_handler]
pub async fn get_course(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<Course>, AppError> {
  Ok(Json(Course::get(&actor, id, &state.db).await?))
}

#[utoipa::path(
  patch,
  path = "/api/v1/courses/{id}",
  tag = "courses",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Course id")),
  request_body = CourseUpdate,
  responses(
    (status = 200, description = "Course updated", body = Course),
    (status = 403, description = "Not the course owner")
  )
)]
#[axum::debug_handler]
pub async fn update_course(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
  Json(payload): Json<CourseUpdate>,
) -> Result<Json<Course>, AppError> {
  let txn = state.begin(&actor).await?;
  let mut plan = state.media_plan(&actor);
  let res = Course::update(&actor, id, payload, &mut plan, &txn).await;
  Ok(Json(commit_with_media(&state, txn, plan, res).await?))
}

/// Publish or unpublish a course
#[utoipa::path(
  put,
  path = "/api/v1/courses/{id}/publication",
  tag = "courses",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Course id")),
  request_body = Publication,
  responses(
    (status = 200, description = "Publication state set", body = Course),
    (status = 403, description = "Not the course owner")
  )
)]
#[axum::debug_handler]
pub async fn set_publication(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
  Json(payload): Json<Publication>,
) -> Result<Json<Course>, AppError> {
  Ok(Json(
    Course::set_published(&actor, id, payload.published, &state.db).await?,
  ))
}

/// Delete a course with all of its lessons, modules and media
#[utoipa::path(
  delete,
  path = "/api/v1/courses/{id}",
  tag = "courses",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Course id")),
  responses(
    (status = 204, description = "Course deleted"),
    (status = 403, description = "Not the course owner")
  )
)]
#[axum::debug_handler]
pub async fn delete_course(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
  let txn = state.begin(&actor).await?;
  let mut plan = state.media_plan(&actor);
  let res = Course::delete(&actor, id, &txn)
    .await
    .map(|keys| plan.supersede(keys));
  commit_with_media(&state, txn, plan, res).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// Lessons and modules of a course, in order
#[utoipa::path(
  get,
  path = "/api/v1/courses/{id}/outline",
  tag = "courses",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Course id")),
  responses(
    (status = 200, description = "Course outline", body = CourseOutline),
    (status = 404, description = "Course not found or not published")
  )
)]
#[axum::debug_handler]
pub async fn course_outline(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<CourseOutline>, AppError> {
  Ok(Json(Course::outline(&actor, id, &state.db).await?))
}

/// Learners actively enrolled in a course (course owner)
#[utoipa::path(
  get,
  path = "/api/v1/courses/{id}/students",
  tag = "courses",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Course id")),
  responses(
    (status = 200, description = "Enrolled learners", body = Vec<Student>),
    (status = 403, description = "Not the course owner")
  )
)]
#[axum::debug_handler]
pub async fn course_students(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Student>>, AppError> {
  let txn = state.begin(&actor).await?;
  let students = Enrollment::students(&actor, id, &txn).await?;
  txn.commit().await?;
  Ok(Json(students))
}

/// The caller's completion of a course
#[utoipa::path(
  get,
  path = "/api/v1/courses/{id}/progress",
  tag = "courses",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Course id")),
  responses(
    (status = 200, description = "Course progress", body = CourseProgress),
    (status = 403, description = "Not enrolled")
  )
)]
#[axum::debug_handler]
pub async fn course_progress(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<CourseProgress>, AppError> {
  let txn = state.begin(&actor).await?;
  let progress = Progress::course(&actor, id, &txn).await?;
  txn.commit().await?;
  Ok(Json(progress))
}

/// Enroll in a free course, or confirm access to a paid one
#[utoipa::path(
  post,
  path = "/api/v1/courses/{id}/enrollment",
  tag = "courses",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Course id")),
  responses(
    (status = 201, description = "Enrolled", body = Enrollment),
    (status = 400, description = "Owners cannot enroll in their own course"),
    (status = 402, description = "Course must be bought first, or the teacher's student quota is full"),
    (status = 404, description = "Course not found or not published")
  )
)]
#[axum::debug_handler]
pub async fn enroll(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
  // Counts the teacher's students and notifies them, so it runs unrestricted.
  let txn = state.begin_system().await?;
  let enrollment = Enrollment::enroll(&actor, id, Utc::now(), &txn).await?;
  txn.commit().await?;
  Ok((StatusCode::CREATED, Json(enrollment)))
}

/// Leave a course
#[utoipa::path(
  delete,
  path = "/api/v1/courses/{id}/enrollment",
  tag = "courses",
  security(("bearer" = [])),
  params(("id" = Uuid, Path, description = "Course id")),
  responses(
    (status = 200, description = "Enrollment cancelled", body = Enrollment),
    (status = 404, description = "Not enrolled")
  )
)]
#[axum::debug_handler]
pub async fn cancel_enrollment(
  State(state): State<AppState>,
  Auth(actor): Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<Enrollment>, AppError> {
  let txn = state.begin(&actor).await?;
  let enrollment = Enrollment::cancel(&actor, id, Utc::now(), &txn).await?;
  txn.commit().await?;
  Ok(Json(enrollment))
}

/// Courses the caller is enrolled in
#[utoipa::path(
  get,
  path = "/api/v1/me/enrollments",
  tag = "courses",
  security(("bearer" = [])),
  responses((status = 200, description = "Active enrollments", body = Vec<EnrolledCourse>))
)]
#[axum::debug_handler]
pub async fn my_enrollments(
  State(state): State<AppState>,
  Auth(actor): Auth,
) -> Result<Json<Vec<EnrolledCourse>>, AppError> {
  let txn = state.begin(&actor).await?;
  let enrollments = Enrollment::mine(&actor, &txn).await?;
  txn.commit().await?;
  Ok(Json(enrollments))
}
