pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::JwtUtils;
pub use middleware::AuthMiddleware;
