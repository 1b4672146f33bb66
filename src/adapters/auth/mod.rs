//! Authentication adapters implementing the `SessionValidator` port.
//!
//! - `jwt_validator` - HS256 session tokens
//! - `mock` - fixed token map for tests

mod jwt_validator;
mod mock;

pub use jwt_validator::{JwtConfig, JwtSessionValidator};
pub use mock::MockSessionValidator;
