//! # TaskDesk Shared Library
//!
//! Domain types and core behavior behind the TaskDesk API server.
//!
//! ## Module Organization
//!
//! - `models`: users, tasks, assignments, notifications and their SQL
//! - `store`: persistence ports with Postgres and in-memory adapters
//! - `db`: connection pool and migrations
//! - `auth`: password hashing, tokens, reset codes and the request guard
//! - `mail`: outbound mail and the background delivery queue
//! - `services`: accounts, password reset, Google sign-in, tasks,
//!   assignment fan-out and notifications

pub mod auth;
pub mod db;
pub mod mail;
pub mod models;
pub mod services;
pub mod store;

/// Current version of the TaskDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
