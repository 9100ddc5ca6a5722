//! Subscription repository port.

use async_trait::async_trait;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, SubscriptionId, Timestamp, UserId};

/// Repository port for Subscription rows.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Insert a new subscription row.
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Update an existing subscription row.
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Find by ledger id. Returns `None` if absent.
    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    /// Find by id constrained to an owner, for user-facing mutations.
    async fn find_by_id_for_user(
        &self,
        id: &SubscriptionId,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Find by the provider subscription id - the card-rail upsert key.
    async fn find_by_provider_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// The user's single current (active or trialing) subscription, if any.
    ///
    /// The single-plan-per-user invariant is enforced by this query
    /// pattern, not by a store constraint.
    async fn find_current_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Active subscriptions whose current period ended before `cutoff`.
    /// Feeds the expiry sweep.
    async fn find_active_ending_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// A user's active subscriptions ending before `cutoff`, for the
    /// expiring-soon view.
    async fn find_active_for_user_ending_before(
        &self,
        user_id: &UserId,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError>;
}
