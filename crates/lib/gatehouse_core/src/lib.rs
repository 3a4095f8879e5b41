//! # gatehouse_core
//!
//! Core domain logic for Gatehouse: the stream authenticator, the
//! review-gated execution gate and their storage collaborators.

pub mod auth;
pub mod exec;
pub mod migrate;
pub mod models;
pub mod store;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
