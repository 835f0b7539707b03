use axum::{
  Json, Router,
  extract::DefaultBodyLimit,
  routing::{get, post, put},
};
use edulane_core::media::MAX_UPLOAD_BYTES;
use serde::Deserialize;
use utoipa::{
  Modify, OpenApi, ToSchema,
  openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_scalar::{Scalar, Servable};
use uuid::Uuid;

use crate::utils::AppState;

mod accounts;
mod assessments;
mod courses;
mod essays;
mod flashcards;
mod lessons;
mod media;
mod modules;
mod notifications;
mod packages;
mod payments;
mod pronunciation;

pub use accounts::{Login, RoleChange};
pub use assessments::AttemptAnswers;
pub use courses::Publication;
pub use flashcards::ReviewInput;
pub use media::UploadForm;
pub use notifications::Count;
pub use packages::PlanOverview;
pub use payments::{PaymentEvent, WEBHOOK_SECRET_HEADER};

/// New order for every child of a parent, as a list of ids.
#[derive(Deserialize, ToSchema)]
pub struct Reorder {
  pub ids: Vec<Uuid>,
}

/// Multipart framing on top of the largest accepted file.
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

struct BearerAuth;

impl Modify for BearerAuth {
  fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
    let components = openapi.components.get_or_insert_with(Default::default);
    components.add_security_scheme("bearer", SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)));
  }
}

#[derive(OpenApi)]
#[openapi(
  info(
    title = "Edulane API",
    version = "0.0.1",
    description = "Courses, flashcards, assessments and payments for the Edulane learning platform"
  ),
  modifiers(&BearerAuth),
  paths(
    accounts::register,
    accounts::login,
    accounts::logout,
    accounts::me,
    accounts::update_profile,
    accounts::streak,
    accounts::list_users,
    accounts::set_role,
    packages::list_packages,
    packages::list_all_packages,
    packages::get_package,
    packages::create_package,
    packages::update_package,
    packages::delete_package,
    packages::my_plan,
    courses::list_courses,
    courses::create_course,
    courses::get_course,
    courses::update_course,
    courses::set_publication,
    courses::delete_course,
    courses::course_outline,
    courses::course_students,
    courses::course_progress,
    courses::enroll,
    courses::cancel_enrollment,
    courses::my_enrollments,
    lessons::create_lesson,
    lessons::reorder_lessons,
    lessons::update_lesson,
    lessons::delete_lesson,
    lessons::create_module,
    lessons::reorder_modules,
    modules::module_content,
    modules::update_module,
    modules::delete_module,
    modules::complete_module,
    modules::upsert_lecture,
    flashcards::create_flashcard,
    flashcards::reorder_flashcards,
    flashcards::due_flashcards,
    flashcards::deck_stats,
    flashcards::update_flashcard,
    flashcards::delete_flashcard,
    flashcards::review_flashcard,
    assessments::upsert_assessment,
    assessments::create_question,
    assessments::reorder_questions,
    assessments::update_question,
    assessments::delete_question,
    assessments::start_attempt,
    assessments::my_attempts,
    assessments::submit_attempt,
    essays::upsert_prompt,
    essays::delete_prompt,
    essays::submit_essay,
    essays::my_essay,
    essays::list_essays,
    essays::grade_essay,
    payments::checkout,
    payments::webhook,
    payments::refund,
    payments::my_payments,
    pronunciation::record_attempt,
    pronunciation::history,
    notifications::list_notifications,
    notifications::unread_count,
    notifications::mark_read,
    notifications::mark_all_read,
    media::upload,
  ),
  components(schemas(
    Reorder,
    Login,
    RoleChange,
    Publication,
    ReviewInput,
    AttemptAnswers,
    PaymentEvent,
    PlanOverview,
    Count,
    UploadForm,
    edulane_core::MediaField,
    edulane_shared::Role,
  ))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
  Json(ApiDoc::openapi())
}

fn v1() -> Router<AppState> {
  Router::new()
    // accounts
    .route("/auth/register", post(accounts::register))
    .route("/auth/login", post(accounts::login))
    .route("/auth/logout", post(accounts::logout))
    .route("/me", get(accounts::me).patch(accounts::update_profile))
    .route("/me/streak", get(accounts::streak))
    .route("/me/plan", get(packages::my_plan))
    .route("/me/enrollments", get(courses::my_enrollments))
    .route("/me/payments", get(payments::my_payments))
    .route("/me/pronunciation", get(pronunciation::history))
    .route("/users", get(accounts::list_users))
    .route("/users/{id}/role", put(accounts::set_role))
    // packages
    .route(
      "/packages",
      get(packages::list_packages).post(packages::create_package),
    )
    .route("/packages/all", get(packages::list_all_packages))
    .route(
      "/packages/{id}",
      get(packages::get_package)
        .put(packages::update_package)
        .delete(packages::delete_package),
    )
    // catalog
    .route(
      "/courses",
      get(courses::list_courses).post(courses::create_course),
    )
    .route(
      "/courses/{id}",
      get(courses::get_course)
        .patch(courses::update_course)
        .delete(courses::delete_course),
    )
    .route("/courses/{id}/publication", put(courses::set_publication))
    .route("/courses/{id}/outline", get(courses::course_outline))
    .route("/courses/{id}/students", get(courses::course_students))
    .route("/courses/{id}/progress", get(courses::course_progress))
    .route(
      "/courses/{id}/enrollment",
      post(courses::enroll).delete(courses::cancel_enrollment),
    )
    .route("/courses/{id}/lessons", post(lessons::create_lesson))
    .route("/courses/{id}/lessons/order", put(lessons::reorder_lessons))
    .route(
      "/lessons/{id}",
      put(lessons::update_lesson).delete(lessons::delete_lesson),
    )
    .route("/lessons/{id}/modules", post(lessons::create_module))
    .route("/lessons/{id}/modules/order", put(lessons::reorder_modules))
    .route(
      "/modules/{id}",
      get(modules::module_content)
        .patch(modules::update_module)
        .delete(modules::delete_module),
    )
    .route("/modules/{id}/completion", post(modules::complete_module))
    .route("/modules/{id}/lecture", put(modules::upsert_lecture))
    // flashcards
    .route("/modules/{id}/flashcards", post(flashcards::create_flashcard))
    .route(
      "/modules/{id}/flashcards/order",
      put(flashcards::reorder_flashcards),
    )
    .route("/modules/{id}/flashcards/due", get(flashcards::due_flashcards))
    .route("/modules/{id}/flashcards/stats", get(flashcards::deck_stats))
    .route(
      "/flashcards/{id}",
      put(flashcards::update_flashcard).delete(flashcards::delete_flashcard),
    )
    .route("/flashcards/{id}/reviews", post(flashcards::review_flashcard))
    // assessments
    .route("/modules/{id}/assessment", put(assessments::upsert_assessment))
    .route("/modules/{id}/questions", post(assessments::create_question))
    .route(
      "/modules/{id}/questions/order",
      put(assessments::reorder_questions),
    )
    .route(
      "/questions/{id}",
      put(assessments::update_question).delete(assessments::delete_question),
    )
    .route(
      "/modules/{id}/attempts",
      get(assessments::my_attempts).post(assessments::start_attempt),
    )
    .route("/attempts/{id}/submission", post(assessments::submit_attempt))
    .route(
      "/modules/{id}/essay",
      put(essays::upsert_prompt).delete(essays::delete_prompt),
    )
    .route(
      "/modules/{id}/essay/submission",
      get(essays::my_essay).put(essays::submit_essay),
    )
    .route("/modules/{id}/essay/submissions", get(essays::list_essays))
    .route("/essay-submissions/{id}/grade", put(essays::grade_essay))
    // payments
    .route("/payments/checkout", post(payments::checkout))
    .route("/payments/webhook", post(payments::webhook))
    .route("/payments/{id}/refund", post(payments::refund))
    // pronunciation
    .route("/pronunciation", post(pronunciation::record_attempt))
    // notifications
    .route("/notifications", get(notifications::list_notifications))
    .route("/notifications/unread-count", get(notifications::unread_count))
    .route("/notifications/read-all", post(notifications::mark_all_read))
    .route("/notifications/{id}/read", post(notifications::mark_read))
    // media
    .route(
      "/media",
      post(media::upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
    )
}

pub fn app() -> Router<AppState> {
  Router::new()
    .nest("/api/v1", v1())
    .route("/openapi.json", get(openapi_json))
    .merge(Scalar::with_url("/openapi/", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
  use utoipa::OpenApi;

  use super::ApiDoc;

  #[test]
  fn every_route_is_documented_under_v1() {
    let doc = ApiDoc::openapi();
    assert!(doc.paths.paths.keys().all(|path| path.starts_with("/api/v1/")));
    assert!(doc.paths.paths.contains_key("/api/v1/courses/{id}/enrollment"));
    assert!(doc.paths.paths.contains_key("/api/v1/payments/webhook"));
  }

  #[test]
  fn bearer_scheme_is_registered() {
    let doc = ApiDoc::openapi();
    let components = doc.components.expect("components");
    assert!(components.security_schemes.contains_key("bearer"));
  }
}
