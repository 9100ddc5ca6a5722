//! Ports - trait boundaries onto external collaborators.
//!
//! The document store, the two payment rails, and the notification system
//! all live behind these traits. Adapters implement them; application
//! handlers depend only on the traits.

mod card_rail;
mod coupon_repository;
mod crypto_rail;
mod payment_intent_repository;
mod product_repository;
mod purchase_repository;
mod reminder_repository;
mod renewal_notifier;
mod subscription_repository;
mod user_directory;
mod webhook_event_repository;

pub use card_rail::{
    CardCheckoutSession, CardRail, CheckoutMetadata, CheckoutMode, CreateCardCheckout,
    ProductMirror, ProrationPolicy, RailError, RailErrorCode,
};
pub use coupon_repository::CouponRepository;
pub use crypto_rail::{CreateCryptoPayment, CryptoPayment, CryptoRail};
pub use payment_intent_repository::PaymentIntentRepository;
pub use product_repository::ProductRepository;
pub use purchase_repository::PurchaseRepository;
pub use reminder_repository::ReminderRepository;
pub use renewal_notifier::RenewalNotifier;
pub use subscription_repository::SubscriptionRepository;
pub use user_directory::{BillingUser, UserDirectory};
pub use webhook_event_repository::{
    SaveResult, WebhookEventRecord, WebhookEventRepository, WebhookEventStatus, WebhookResult,
};
