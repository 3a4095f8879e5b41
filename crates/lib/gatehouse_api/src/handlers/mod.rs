//! Request handlers.

pub mod sessions;
pub mod whoami;
