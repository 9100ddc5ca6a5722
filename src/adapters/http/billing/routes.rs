//! Axum router for the billing API.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{
    billing_overview, cancel_subscription, card_webhook, create_card_checkout,
    create_crypto_checkout, create_portal_session, crypto_payment_status, crypto_webhook,
    expiring_subscriptions, reactivate_subscription, renew_subscription, run_sweep,
    upgrade_subscription, validate_coupon, BillingAppState,
};

/// Builds the full billing router, mounted at `/api`.
///
/// # Routes
///
/// ## Card rail
/// - `POST /stripe/checkout` - start a card checkout session
/// - `POST /stripe/portal` - open the billing portal
/// - `POST /stripe/cancel-subscription` - cancel at period end
/// - `POST /stripe/reactivate-subscription` - undo a pending cancellation
/// - `POST /stripe/upgrade-subscription` - change plan
/// - `POST /stripe/webhook` - signed event ingress
///
/// ## Crypto rail
/// - `POST /cryptomus/checkout` - start a crypto payment
/// - `POST /cryptomus/renew` - pay for the next prepaid period
/// - `POST /cryptomus/webhook` - signed payment notifications
///
/// ## Shared
/// - `GET /billing` - products + current subscription
/// - `POST /billing/coupons/validate` - coupon preview
/// - `GET /billing/payments/:uuid` - crypto payment status
/// - `GET /subscriptions/expiring` - crypto subscriptions near expiry
/// - `POST /maintenance/sweep` - externally triggered sweeper pass
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .route("/stripe/checkout", post(create_card_checkout))
        .route("/stripe/portal", post(create_portal_session))
        .route("/stripe/cancel-subscription", post(cancel_subscription))
        .route(
            "/stripe/reactivate-subscription",
            post(reactivate_subscription),
        )
        .route("/stripe/upgrade-subscription", post(upgrade_subscription))
        .route("/stripe/webhook", post(card_webhook))
        .route("/cryptomus/checkout", post(create_crypto_checkout))
        .route("/cryptomus/renew", post(renew_subscription))
        .route("/cryptomus/webhook", post(crypto_webhook))
        .route("/billing", get(billing_overview))
        .route("/billing/coupons/validate", post(validate_coupon))
        .route("/billing/payments/:uuid", get(crypto_payment_status))
        .route("/subscriptions/expiring", get(expiring_subscriptions))
        .route("/maintenance/sweep", post(run_sweep))
}
