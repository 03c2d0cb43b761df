/// Authentication module
///
/// Password hashing, credential extraction, access tokens (stateless JWT),
/// refresh tokens (persisted, revocable) and the session service that
/// orchestrates them.

mod claims;
mod credentials;
mod jwt;
mod password;
mod refresh_token;
mod session;

pub use claims::{Claims, ISSUER};
pub use credentials::{get_api_key, get_bearer_token, ApiKey, BearerToken};
pub use jwt::{make_access_token, validate_access_token};
pub use password::{validate_password_strength, PasswordHasher};
pub use refresh_token::{generate_refresh_token, RefreshTokenStore, SessionState};
pub use session::{Session, SessionService};
