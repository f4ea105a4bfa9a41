//! # board_core
//!
//! Core domain logic for the Redis board: accounts and tokens, server and
//! user records, the Redis probe and the WeChat message dispatcher.

pub mod auth;
pub mod db;
pub mod migrate;
pub mod models;
pub mod probe;
pub mod secrets;
pub mod store;
pub mod validation;
pub mod wx;

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
