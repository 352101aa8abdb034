pub mod refresh_session;
pub mod role;
pub mod user;

pub use refresh_session::RefreshSession;
pub use role::{Role, DEFAULT_ROLE};
pub use user::{NewUser, User, UserDto};
