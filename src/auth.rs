//! Credential models: the cached bearer token and the client credentials that mint it.

pub mod credential;
pub mod secret;

pub use credential::*;
pub use secret::*;
