//! Identity primitives: tenant and client identifiers, scope sets, redacted secrets, and cached
//! access tokens.

pub mod id;
pub mod scope;
pub mod secret;
pub mod token;

pub use id::*;
pub use scope::*;
pub use secret::*;
pub use token::*;
