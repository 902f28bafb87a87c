mod auth;
mod error_handler;
mod role_guard;

pub use auth::auth_middleware;
pub use error_handler::log_errors;
pub use role_guard::{PROTECTED_ROUTES, RouteRule, guard_decision, role_guard};
