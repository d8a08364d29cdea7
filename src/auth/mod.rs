//! Authentication: password hashing, session tokens, and the request guard.

pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use password::{PasswordHash, PasswordHasher};
pub use token::{Claims, TokenError, TokenService};
