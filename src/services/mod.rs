pub mod auth_service;
pub mod user_service;

pub use auth_service::{AuthService, TokenPair};
pub use user_service::UserService;
