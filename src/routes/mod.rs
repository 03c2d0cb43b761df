mod health_check;
mod sessions;
mod users;

pub use health_check::health_check;
pub use sessions::{login, refresh, revoke, LoginRequest, LoginResponse, TokenResponse};
pub use users::{create_user, update_user, CredentialsRequest, UserResponse};
