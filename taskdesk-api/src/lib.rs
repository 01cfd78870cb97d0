//! # TaskDesk API Server Library
//!
//! HTTP surface of TaskDesk: configuration, error mapping, the Axum router
//! and its handlers. Behavior lives in `taskdesk-shared`; this crate parses
//! requests, calls the services and shapes responses.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Token authentication for protected routes
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
