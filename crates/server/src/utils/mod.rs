mod auth;
pub use auth::{Auth, BearerToken};

mod commit;
pub use commit::{commit_with_media, enqueue_cleanup};

mod shutdown_signal;
pub use shutdown_signal::shutdown_signal;

mod state;
pub use state::AppState;
