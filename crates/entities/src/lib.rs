pub mod app_user;
pub mod assessment;
pub mod course;
pub mod enrollment;
pub mod essay_prompt;
pub mod essay_submission;
pub mod flashcard;
pub mod flashcard_review;
pub mod lecture;
pub mod lesson;
pub mod lesson_module;
pub mod media_object;
pub mod module_progress;
pub mod notification;
pub mod payment;
pub mod pronunciation_attempt;
pub mod quiz_attempt;
pub mod quiz_question;
pub mod teacher_package;
pub mod teacher_subscription;
pub mod user_session;
pub mod user_streak;
