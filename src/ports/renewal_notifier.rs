//! Renewal notifier port.
//!
//! When the sweeper marks a reminder dispatched, the actual notification
//! (email, push) is handed off to an external collaborator. The core's
//! obligation ends at "mark dispatched"; notifier failures are logged and
//! never abort the sweep.

use async_trait::async_trait;

use crate::domain::billing::RenewalReminder;
use crate::domain::foundation::DomainError;

/// Port for the external notification collaborator.
#[async_trait]
pub trait RenewalNotifier: Send + Sync {
    /// Deliver a renewal/expiry notification for the reminder.
    async fn notify(&self, reminder: &RenewalReminder) -> Result<(), DomainError>;
}
