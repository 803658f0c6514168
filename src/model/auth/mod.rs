mod context;
mod token;
mod user;

pub use context::{AccessContext, AdminSession};
pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
pub use user::{Rights, User};
