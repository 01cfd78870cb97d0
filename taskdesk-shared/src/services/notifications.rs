/// Per-user notification inbox

use std::sync::Arc;

use uuid::Uuid;

use crate::models::notification::Notification;
use crate::store::{Store, StoreError};

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn Store>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>, StoreError> {
        self.store.notifications_for(user_id).await
    }

    /// Marks a notification read if `user_id` owns it
    ///
    /// An id/owner mismatch is not an error; nothing changes.
    pub async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        if !self.store.mark_read(notification_id, user_id).await? {
            tracing::debug!(
                notification_id = %notification_id,
                user_id = %user_id,
                "Mark read matched nothing"
            );
        }
        Ok(())
    }
}
