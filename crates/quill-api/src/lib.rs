//! Request-handling core: password hashing, session tokens, the auth and
//! prompt services, and the HTTP routes that expose them.

pub mod auth;
pub mod error;
pub mod extract;
pub mod password;
pub mod prompts;
pub mod routes;
pub mod token;

pub use error::ApiError;
pub use routes::{AppState, AppStateInner, app, router};
