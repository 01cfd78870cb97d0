/// Database models for TaskDesk
///
/// Each model owns its SQL. The Postgres store adapter calls these; services
/// never touch them directly.
///
/// # Models
///
/// - `user`: accounts, credentials and inline reset codes
/// - `task`: work items and sparse updates
/// - `assignment`: task ↔ assignee links and the listing views built on them
/// - `notification`: per-user messages

pub mod assignment;
pub mod notification;
pub mod task;
pub mod user;

use serde::{Deserialize, Deserializer};

/// Deserializes a field that may be absent, null, or set
///
/// Paired with `#[serde(default)]`: absent stays `None`, `null` becomes
/// `Some(None)`, a value becomes `Some(Some(v))`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
