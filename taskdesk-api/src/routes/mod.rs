/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Service banner and health check
/// - `auth`: Registration, login, password change and reset, account completion
/// - `oauth`: Google sign-in redirects
/// - `tasks`: Task CRUD, assignment and listings
/// - `notifications`: Notification inbox

pub mod auth;
pub mod health;
pub mod notifications;
pub mod oauth;
pub mod tasks;

use serde::Serialize;

/// Plain `{ "message": ... }` acknowledgement
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
