//! Domain models shared by the authenticator, the execution gate and the
//! storage layer.

pub mod auth;
pub mod plugin;
pub mod review;
pub mod session;
