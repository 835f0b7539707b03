mod access;
pub use access::Actor;

pub mod rls;

pub mod account;
pub use account::{ProfileUpdate, Registration, Session, User};

pub mod package;
pub use package::{PackageInput, Quota, Subscription, TeacherPackage, Usage};

pub mod catalog;
pub use catalog::{Course, Lecture, Lesson, Module, ModuleContent, ModuleKind};

pub mod flashcard;
pub use flashcard::{Flashcard, Review, ReviewScheduler};

pub mod assessment;
pub use assessment::{Assessment, Attempt, EssayPrompt, EssaySubmission, Question};

pub mod enrollment;
pub use enrollment::{Enrollment, Progress};

pub mod payment;
pub use payment::Payment;

pub mod pronunciation;
pub use pronunciation::PronunciationAttempt;

pub mod notification;
pub use notification::Notification;

pub mod streak;
pub use streak::Streak;

pub mod media;
pub use media::{MediaField, MediaPlan, MediaStore};
