//! Purchase repository port.

use async_trait::async_trait;

use crate::domain::billing::Purchase;
use crate::domain::foundation::DomainError;

/// Repository port for Purchase records.
#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    /// Insert a purchase record.
    async fn save(&self, purchase: &Purchase) -> Result<(), DomainError>;

    /// Find a purchase by its provider payment reference.
    ///
    /// Webhook handlers check this before inserting so a re-delivered
    /// completion event does not book the sale twice.
    async fn find_by_provider_payment_id(
        &self,
        provider_payment_id: &str,
    ) -> Result<Option<Purchase>, DomainError>;
}
