pub mod auth;
pub mod rate_limit;

pub use auth::require_user;
pub use rate_limit::{RateLimitLayer, RateLimiterBackend};
