//! Caller authentication: session JWTs and the resolved `AuthContext`.

mod claims;
mod context;
mod jwt;

pub use claims::Claims;
pub use context::{AuthContext, AuthMethod};
pub use jwt::JwtValidator;
