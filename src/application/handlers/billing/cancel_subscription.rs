//! Cancel and reactivate handlers.
//!
//! Native card-rail subscriptions are canceled provider-side (at period
//! end) and the flag mirrored locally. Synthetic rows - crypto prepaid and
//! promotional grants - have no provider object to mutate, so only the
//! local flag changes and the sweep retires them when the period lapses.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Subscription, SubscriptionOrigin};
use crate::domain::foundation::{SubscriptionId, UserId};
use crate::ports::{CardRail, SubscriptionRepository};

/// Handler flagging a subscription to cancel at period end.
pub struct CancelSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    card: Arc<dyn CardRail>,
}

impl CancelSubscriptionHandler {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>, card: Arc<dyn CardRail>) -> Self {
        Self {
            subscriptions,
            card,
        }
    }

    pub async fn handle(
        &self,
        subscription_id: SubscriptionId,
        user_id: UserId,
    ) -> Result<Subscription, BillingError> {
        let mut subscription = self
            .subscriptions
            .find_by_id_for_user(&subscription_id, &user_id)
            .await?
            .ok_or(BillingError::NotFound("Subscription"))?;

        if subscription.origin == SubscriptionOrigin::Card {
            self.card
                .cancel_at_period_end(&subscription.provider_subscription_id)
                .await?;
        }

        subscription.cancel_at_period_end = true;
        self.subscriptions.update(&subscription).await?;

        tracing::info!(
            subscription = %subscription.id,
            origin = ?subscription.origin,
            "subscription flagged to cancel at period end"
        );
        Ok(subscription)
    }
}

/// Handler clearing the cancel-at-period-end flag before the period lapses.
pub struct ReactivateSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    card: Arc<dyn CardRail>,
}

impl ReactivateSubscriptionHandler {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>, card: Arc<dyn CardRail>) -> Self {
        Self {
            subscriptions,
            card,
        }
    }

    pub async fn handle(
        &self,
        subscription_id: SubscriptionId,
        user_id: UserId,
    ) -> Result<Subscription, BillingError> {
        let mut subscription = self
            .subscriptions
            .find_by_id_for_user(&subscription_id, &user_id)
            .await?
            .ok_or(BillingError::NotFound("Subscription"))?;

        if !subscription.cancel_at_period_end {
            return Err(BillingError::Validation(
                "Subscription is not scheduled for cancellation".to_string(),
            ));
        }
        if !subscription.is_current() {
            return Err(BillingError::Validation(
                "Subscription has already ended".to_string(),
            ));
        }

        if subscription.origin == SubscriptionOrigin::Card {
            self.card
                .reactivate(&subscription.provider_subscription_id)
                .await?;
        }

        subscription.cancel_at_period_end = false;
        self.subscriptions.update(&subscription).await?;

        tracing::info!(subscription = %subscription.id, "subscription reactivated");
        Ok(subscription)
    }
}
