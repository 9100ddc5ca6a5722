//! Billing command and query handlers.
//!
//! One handler per concern, each depending only on ports. Handlers are
//! cheap to construct; the HTTP layer builds them per request from shared
//! `Arc` dependencies.

mod billing_overview;
mod cancel_subscription;
mod card_webhook;
mod checkout;
mod crypto_webhook;
mod portal;
mod renewal;
mod sweeper;
mod upgrade_subscription;
mod validate_coupon;

#[cfg(test)]
pub mod test_support;

pub use billing_overview::{BillingOverview, GetBillingOverviewHandler, GetCryptoPaymentHandler};
pub use cancel_subscription::{CancelSubscriptionHandler, ReactivateSubscriptionHandler};
pub use card_webhook::CardWebhookHandler;
pub use checkout::{CheckoutCommand, CheckoutHandler, CheckoutOutcome, CheckoutRail, RedirectUrls};
pub use crypto_webhook::CryptoWebhookHandler;
pub use portal::PortalHandler;
pub use renewal::{
    CompleteRenewalHandler, ExpiringSubscription, GetExpiringSubscriptionsHandler,
    RenewSubscriptionHandler, RenewalPayment,
};
pub use sweeper::{SweepReport, SweeperHandler};
pub use upgrade_subscription::UpgradeSubscriptionHandler;
pub use validate_coupon::{CouponValidation, DiscountInfo, ValidateCouponHandler};
