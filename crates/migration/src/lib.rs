pub use sea_orm_migration::*;

mod m20261001_01_create_account_tables;
mod m20261001_02_create_package_tables;
mod m20261001_03_create_course_tables;
mod m20261001_04_create_flashcard_tables;
mod m20261001_05_create_assessment_tables;
mod m20261001_06_create_enrollment_tables;
mod m20261001_07_create_engagement_tables;
mod m20261001_08_create_media_object_table;
mod m20261001_09_enable_row_level_security;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20261001_01_create_account_tables::Migration),
      Box::new(m20261001_02_create_package_tables::Migration),
      Box::new(m20261001_03_create_course_tables::Migration),
      Box::new(m20261001_04_create_flashcard_tables::Migration),
      Box::new(m20261001_05_create_assessment_tables::Migration),
      Box::new(m20261001_06_create_enrollment_tables::Migration),
      Box::new(m20261001_07_create_engagement_tables::Migration),
      Box::new(m20261001_08_create_media_object_table::Migration),
      Box::new(m20261001_09_enable_row_level_security::Migration),
    ]
  }
}
