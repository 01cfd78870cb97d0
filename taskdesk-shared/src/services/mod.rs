/// Core services
///
/// Each service owns one slice of behavior and talks to storage only through
/// the injected [`Store`](crate::store::Store).
///
/// - [`accounts`]: registration, login, password change, account completion
/// - [`reset`]: password reset by emailed code
/// - [`identity`]: Google sign-in and account linking
/// - [`tasks`]: task create, update, delete and listings
/// - [`assignment`]: assignment and notification fan-out
/// - [`notifications`]: per-user notification inbox

pub mod accounts;
pub mod assignment;
pub mod identity;
pub mod notifications;
pub mod reset;
pub mod tasks;
