//! Renewal reminder repository port.

use async_trait::async_trait;

use crate::domain::billing::RenewalReminder;
use crate::domain::foundation::{DomainError, ProductId, Timestamp, UserId};

/// Repository port for RenewalReminder records.
#[async_trait]
pub trait ReminderRepository: Send + Sync {
    /// Insert a reminder.
    async fn save(&self, reminder: &RenewalReminder) -> Result<(), DomainError>;

    /// Update a reminder's status/bookkeeping fields.
    async fn update(&self, reminder: &RenewalReminder) -> Result<(), DomainError>;

    /// Pending reminders whose fire time is at or before `now`. Feeds the
    /// dispatch sweep.
    async fn find_pending_due(&self, now: Timestamp)
        -> Result<Vec<RenewalReminder>, DomainError>;

    /// Pending reminders for a user+product pair.
    ///
    /// There should be at most one, but renewal cleanup tolerates more.
    async fn find_pending_for_user_product(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<Vec<RenewalReminder>, DomainError>;
}
