//! Bearer-token authorization.
//!
//! Protected handlers take an [`AuthUser`] as their first argument; the
//! extractor verifies the token before any other extraction or controller
//! logic runs and rejects the request with 401 otherwise. The caller's role
//! is read from the users table on every request, so a demotion applies to
//! tokens that were issued earlier.

mod extractor;
pub mod jwt;

pub use extractor::{AuthError, AuthUser};
pub use jwt::{Claims, JwtKeys};
