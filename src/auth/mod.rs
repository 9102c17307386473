/// Authentication module
///
/// Token issuing and validation, the revocation registry, and password
/// hashing.

mod claims;
mod jwt;
mod password;
mod revocation;
mod validator;

pub use claims::{Claims, TokenType};
pub use jwt::{IssuedToken, TokenIssuer};
pub use password::PasswordHasher;
pub use revocation::RevocationRegistry;
pub use validator::TokenValidator;
