mod auth;
mod health_check;
mod secret;
mod users;

pub use auth::{login, logout_access, logout_refresh, refresh, register};
pub use health_check::health_check;
pub use secret::secret;
pub use users::{delete_users, list_users};
