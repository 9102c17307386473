/// Middleware module
///
/// Route guarding by token type.

mod jwt_middleware;

pub use jwt_middleware::{bearer_token, JwtMiddleware};
