/// Middleware modules for the API server
///
/// - `auth`: resolves the caller's token to a user for protected routes

pub mod auth;
