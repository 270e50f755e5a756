//! Authentication: credential checks and cookie sessions
//!
//! - `password`: Argon2 hashing and verification
//! - `credentials`: the account store backing the login form
//! - `session`: signed-cookie sessions and the `AuthUser` gate

mod credentials;
mod password;
mod session;

pub use credentials::*;
pub use password::*;
pub use session::*;
