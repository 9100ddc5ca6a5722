//! UpgradeSubscriptionHandler - moves a native card subscription to a
//! different subscription product.

use std::sync::Arc;

use crate::domain::billing::{BillingError, ProductKind, Subscription, SubscriptionOrigin};
use crate::domain::foundation::{ProductId, SubscriptionId, UserId};
use crate::ports::{CardRail, ProductRepository, ProrationPolicy, SubscriptionRepository};

/// Handler swapping the subscription item to another product's price.
pub struct UpgradeSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    products: Arc<dyn ProductRepository>,
    card: Arc<dyn CardRail>,
}

impl UpgradeSubscriptionHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        products: Arc<dyn ProductRepository>,
        card: Arc<dyn CardRail>,
    ) -> Self {
        Self {
            subscriptions,
            products,
            card,
        }
    }

    /// Changes the plan with prorations. Only native card-rail
    /// subscriptions support this; prepaid and promotional rows have no
    /// provider-side subscription to mutate.
    pub async fn handle(
        &self,
        subscription_id: SubscriptionId,
        user_id: UserId,
        new_product_id: ProductId,
    ) -> Result<Subscription, BillingError> {
        let mut subscription = self
            .subscriptions
            .find_by_id_for_user(&subscription_id, &user_id)
            .await?
            .ok_or(BillingError::NotFound("Subscription"))?;

        if subscription.origin != SubscriptionOrigin::Card {
            return Err(BillingError::Misconfigured(
                "Plan changes are only available for card subscriptions - contact support"
                    .to_string(),
            ));
        }

        let mut product = self
            .products
            .find_by_id_and_kind(&new_product_id, ProductKind::Subscription)
            .await?
            .ok_or(BillingError::NotFound("Product"))?;

        let mirror = self.card.ensure_product_mirror(&product).await?;
        if product.card_price_id.as_deref() != Some(mirror.price_id.as_str()) {
            product.set_card_mirror(&mirror.product_id, &mirror.price_id);
            self.products.update(&product).await?;
        }

        self.card
            .change_subscription_item(
                &subscription.provider_subscription_id,
                &mirror.price_id,
                ProrationPolicy::CreateProrations,
            )
            .await?;

        subscription.product_id = product.id;
        self.subscriptions.update(&subscription).await?;

        tracing::info!(
            subscription = %subscription.id,
            new_product = %product.id,
            "subscription item changed"
        );
        Ok(subscription)
    }
}
