mod helpers;
mod middleware;
mod password;
pub mod session;

pub use helpers::extract_session_token;
pub use middleware::{AuthError, LoginRedirect, PageUser, RequireUser};
pub use password::PasswordHasher;
pub use session::SESSION_COOKIE;
