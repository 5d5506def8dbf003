//! Scopes, redacted secrets, and access tokens.

pub mod scope;
pub mod token;

pub use scope::*;
pub use token::*;
