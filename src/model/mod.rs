pub mod auth;
pub mod common;
pub mod form;
pub mod global_error;
pub mod incident;

pub use auth::{Claims, LoginForm, RegisterForm, SessionUser};
pub use global_error::{AppError, ErrorCode};
