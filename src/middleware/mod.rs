/// Middleware module
///
/// Request authentication and request timing.

mod auth_middleware;
mod request_timing;

pub use auth_middleware::{AuthenticatedUser, RequireAuth};
pub use request_timing::RequestTiming;
