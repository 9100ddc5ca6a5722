//! Payment intent repository port.

use async_trait::async_trait;

use crate::domain::billing::PaymentIntent;
use crate::domain::foundation::DomainError;

/// Repository port for crypto-rail payment intents.
#[async_trait]
pub trait PaymentIntentRepository: Send + Sync {
    /// Persist a pending intent before redirecting the user.
    async fn save(&self, intent: &PaymentIntent) -> Result<(), DomainError>;

    /// Update an intent's status/settlement fields.
    async fn update(&self, intent: &PaymentIntent) -> Result<(), DomainError>;

    /// Find an intent by the provider's payment uuid - the webhook
    /// reconciliation key. Returns `None` if absent.
    async fn find_by_provider_uuid(
        &self,
        uuid: &str,
    ) -> Result<Option<PaymentIntent>, DomainError>;
}
