mod error;
pub use error::AppError;

mod env;
pub use env::{APP_ENV, AppEnv};

mod page;
pub use page::{Page, PageQuery};

mod role;
pub use role::Role;
