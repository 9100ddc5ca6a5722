//! Subscription entity.
//!
//! Subscriptions are keyed by a provider subscription id. Native card-rail
//! subscriptions carry the provider's own id; crypto and promotional
//! subscriptions get synthetic ids prefixed `cryptomus_`, `free_` or
//! `free_crypto_`. The prefixes are kept for compatibility with existing
//! rows, but every behavioral branch goes through the explicit [`SubscriptionOrigin`].

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ProductId, SubscriptionId, Timestamp, UserId};

/// Subscription lifecycle status, using the card rail's vocabulary for
/// both rails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    Incomplete,
    IncompleteExpired,
    PastDue,
    Trialing,
    Unpaid,
}

impl SubscriptionStatus {
    /// Parse the status string used by the card rail's webhooks.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "canceled" => Some(Self::Canceled),
            "incomplete" => Some(Self::Incomplete),
            "incomplete_expired" => Some(Self::IncompleteExpired),
            "past_due" => Some(Self::PastDue),
            "trialing" => Some(Self::Trialing),
            "unpaid" => Some(Self::Unpaid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Canceled => "canceled",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::PastDue => "past_due",
            Self::Trialing => "trialing",
            Self::Unpaid => "unpaid",
        }
    }

    /// Statuses that count as the user's one current subscription.
    pub fn is_current(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

/// Where a subscription originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionOrigin {
    /// Native card-rail subscription; the rail drives its lifecycle.
    Card,
    /// Prepaid emulation on the crypto rail; periods tracked locally.
    Crypto,
    /// Granted free of charge (100%-off coupon).
    Promotional,
}

impl SubscriptionOrigin {
    /// Recovers the origin from a stored provider subscription id.
    ///
    /// Rows written before the origin field existed only carry the prefix
    /// convention, so ingest still has to sniff it.
    pub fn from_provider_id(provider_id: &str) -> Self {
        if provider_id.starts_with("cryptomus_") {
            SubscriptionOrigin::Crypto
        } else if provider_id.starts_with("free_crypto_") || provider_id.starts_with("free_") {
            SubscriptionOrigin::Promotional
        } else {
            SubscriptionOrigin::Card
        }
    }
}

/// A subscription row in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub status: SubscriptionStatus,
    pub origin: SubscriptionOrigin,
    /// Native card-rail id, or a synthetic prefixed marker.
    pub provider_subscription_id: String,
    /// Card-rail customer id; empty for crypto and promotional rows.
    pub provider_customer_id: String,
    pub current_period_start: Timestamp,
    pub current_period_end: Timestamp,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Creates a subscription row ingested from a native card-rail event.
    #[allow(clippy::too_many_arguments)]
    pub fn from_card_rail(
        user_id: UserId,
        product_id: ProductId,
        provider_subscription_id: impl Into<String>,
        provider_customer_id: impl Into<String>,
        status: SubscriptionStatus,
        period_start: Timestamp,
        period_end: Timestamp,
        cancel_at_period_end: bool,
        canceled_at: Option<Timestamp>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: SubscriptionId::new(),
            user_id,
            product_id,
            status,
            origin: SubscriptionOrigin::Card,
            provider_subscription_id: provider_subscription_id.into(),
            provider_customer_id: provider_customer_id.into(),
            current_period_start: period_start,
            current_period_end: period_end,
            cancel_at_period_end,
            canceled_at,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates an active crypto-origin subscription with a synthetic
    /// `cryptomus_{uuid}` provider id.
    pub fn from_crypto_payment(
        user_id: UserId,
        product_id: ProductId,
        payment_uuid: &str,
        period_start: Timestamp,
        period_end: Timestamp,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: SubscriptionId::new(),
            user_id,
            product_id,
            status: SubscriptionStatus::Active,
            origin: SubscriptionOrigin::Crypto,
            provider_subscription_id: format!("cryptomus_{}", payment_uuid),
            provider_customer_id: String::new(),
            current_period_start: period_start,
            current_period_end: period_end,
            cancel_at_period_end: false,
            canceled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates an active promotional subscription granted by a 100%-off
    /// coupon, with a 30-day synthetic period. The marker prefix depends on
    /// which rail the checkout came through.
    pub fn promotional(
        user_id: UserId,
        product_id: ProductId,
        crypto_checkout: bool,
        now: Timestamp,
    ) -> Self {
        let prefix = if crypto_checkout { "free_crypto" } else { "free" };
        Self {
            id: SubscriptionId::new(),
            user_id,
            product_id,
            status: SubscriptionStatus::Active,
            origin: SubscriptionOrigin::Promotional,
            provider_subscription_id: format!("{}_{}", prefix, now.as_unix_millis()),
            provider_customer_id: String::new(),
            current_period_start: now,
            current_period_end: now.add_days(30),
            cancel_at_period_end: false,
            canceled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// True while the subscription grants access.
    pub fn is_current(&self) -> bool {
        self.status.is_current()
    }

    /// Applies period/status fields from a card-rail event (upsert-update
    /// path; a duplicate event converges to the same state).
    pub fn apply_card_update(
        &mut self,
        status: SubscriptionStatus,
        period_start: Timestamp,
        period_end: Timestamp,
        cancel_at_period_end: bool,
        canceled_at: Option<Timestamp>,
    ) {
        self.status = status;
        self.current_period_start = period_start;
        self.current_period_end = period_end;
        self.cancel_at_period_end = cancel_at_period_end;
        self.canceled_at = canceled_at;
        self.updated_at = Timestamp::now();
    }

    /// Marks the subscription canceled now.
    pub fn cancel(&mut self, now: Timestamp) {
        self.status = SubscriptionStatus::Canceled;
        self.canceled_at = Some(now);
        self.updated_at = now;
    }

    /// Advances the billing period after a confirmed renewal payment.
    /// The new period begins where the old one ended.
    pub fn renew(&mut self, period_days: i64) {
        let start = self.current_period_end;
        self.current_period_start = start;
        self.current_period_end = start.add_days(period_days);
        self.status = SubscriptionStatus::Active;
        self.cancel_at_period_end = false;
        self.updated_at = Timestamp::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_recovered_from_prefixes() {
        assert_eq!(
            SubscriptionOrigin::from_provider_id("cryptomus_abc"),
            SubscriptionOrigin::Crypto
        );
        assert_eq!(
            SubscriptionOrigin::from_provider_id("free_crypto_123"),
            SubscriptionOrigin::Promotional
        );
        assert_eq!(
            SubscriptionOrigin::from_provider_id("free_123"),
            SubscriptionOrigin::Promotional
        );
        assert_eq!(
            SubscriptionOrigin::from_provider_id("sub_1Nxyz"),
            SubscriptionOrigin::Card
        );
    }

    #[test]
    fn crypto_subscription_gets_synthetic_id_and_empty_customer() {
        let now = Timestamp::now();
        let sub = Subscription::from_crypto_payment(
            UserId::new(),
            ProductId::new(),
            "abc-123",
            now,
            now.add_days(30),
        );
        assert_eq!(sub.provider_subscription_id, "cryptomus_abc-123");
        assert_eq!(sub.provider_customer_id, "");
        assert_eq!(sub.origin, SubscriptionOrigin::Crypto);
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[test]
    fn promotional_subscription_has_30_day_period() {
        let now = Timestamp::from_unix_secs(1_700_000_000);
        let sub = Subscription::promotional(UserId::new(), ProductId::new(), false, now);
        assert!(sub.provider_subscription_id.starts_with("free_"));
        assert_eq!(sub.current_period_end, now.add_days(30));
        assert_eq!(sub.origin, SubscriptionOrigin::Promotional);

        let crypto = Subscription::promotional(UserId::new(), ProductId::new(), true, now);
        assert!(crypto.provider_subscription_id.starts_with("free_crypto_"));
    }

    #[test]
    fn renew_extends_from_old_period_end() {
        let now = Timestamp::from_unix_secs(1_700_000_000);
        let mut sub = Subscription::from_crypto_payment(
            UserId::new(),
            ProductId::new(),
            "abc",
            now.minus_days(30),
            now,
        );
        sub.status = SubscriptionStatus::Canceled;
        sub.cancel_at_period_end = true;

        sub.renew(30);

        assert_eq!(sub.current_period_start, now);
        assert_eq!(sub.current_period_end, now.add_days(30));
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(!sub.cancel_at_period_end);
    }

    #[test]
    fn cancel_sets_canceled_at() {
        let now = Timestamp::now();
        let mut sub = Subscription::from_crypto_payment(
            UserId::new(),
            ProductId::new(),
            "abc",
            now,
            now.add_days(30),
        );
        sub.cancel(now);
        assert_eq!(sub.status, SubscriptionStatus::Canceled);
        assert_eq!(sub.canceled_at, Some(now));
    }

    #[test]
    fn status_parse_roundtrips() {
        for s in [
            "active",
            "canceled",
            "incomplete",
            "incomplete_expired",
            "past_due",
            "trialing",
            "unpaid",
        ] {
            assert_eq!(SubscriptionStatus::parse(s).unwrap().as_str(), s);
        }
        assert!(SubscriptionStatus::parse("paused").is_none());
    }

    #[test]
    fn only_active_and_trialing_are_current() {
        assert!(SubscriptionStatus::Active.is_current());
        assert!(SubscriptionStatus::Trialing.is_current());
        assert!(!SubscriptionStatus::PastDue.is_current());
        assert!(!SubscriptionStatus::Canceled.is_current());
    }
}
