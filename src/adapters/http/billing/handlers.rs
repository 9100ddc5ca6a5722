//! HTTP handlers for the billing API.
//!
//! These connect axum routes to the application handlers. Webhook routes
//! take the raw body (card rail) or raw JSON (crypto rail) because the
//! signature covers the exact bytes/fields delivered.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::handlers::billing::{
    CancelSubscriptionHandler, CardWebhookHandler, CheckoutCommand, CheckoutHandler, CheckoutRail,
    CompleteRenewalHandler, CryptoWebhookHandler, GetBillingOverviewHandler,
    GetCryptoPaymentHandler, GetExpiringSubscriptionsHandler, PortalHandler,
    ReactivateSubscriptionHandler, RedirectUrls, RenewSubscriptionHandler, SweeperHandler,
    UpgradeSubscriptionHandler, ValidateCouponHandler,
};
use crate::domain::billing::{BillingError, CardWebhookVerifier, CryptoSigner, ProductKind};
use crate::domain::foundation::{ProductId, SubscriptionId, Timestamp, UserId};
use crate::ports::{
    CardRail, CouponRepository, CryptoRail, PaymentIntentRepository, ProductRepository,
    PurchaseRepository, ReminderRepository, RenewalNotifier, SubscriptionRepository,
    UserDirectory, WebhookEventRepository,
};

use super::dto::{
    CheckoutRequest, CheckoutResponse, CryptoPaymentResponse, ErrorResponse, ExpiringResponse,
    OverviewResponse, PortalRequest, PortalResponse, RenewRequest, RenewResponse,
    SubscriptionActionRequest, SubscriptionResponse, SweepResponse, UpgradeRequest,
    ValidateCouponRequest, ValidateCouponResponse,
};

/// How many days ahead the expiring-subscriptions view looks.
const EXPIRING_WINDOW_DAYS: i64 = 7;

// ════════════════════════════════════════════════════════════════════════════
// Application state
// ════════════════════════════════════════════════════════════════════════════

/// Shared state: ports, rail clients, and the two webhook credentials.
#[derive(Clone)]
pub struct BillingAppState {
    pub products: Arc<dyn ProductRepository>,
    pub coupons: Arc<dyn CouponRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub purchases: Arc<dyn PurchaseRepository>,
    pub intents: Arc<dyn PaymentIntentRepository>,
    pub reminders: Arc<dyn ReminderRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub webhook_events: Arc<dyn WebhookEventRepository>,
    pub notifier: Arc<dyn RenewalNotifier>,
    pub card: Arc<dyn CardRail>,
    pub crypto: Arc<dyn CryptoRail>,
    pub card_verifier: CardWebhookVerifier,
    pub crypto_signer: CryptoSigner,
    pub urls: RedirectUrls,
}

impl BillingAppState {
    pub fn checkout_handler(&self) -> CheckoutHandler {
        CheckoutHandler::new(
            self.products.clone(),
            self.coupons.clone(),
            self.subscriptions.clone(),
            self.purchases.clone(),
            self.intents.clone(),
            self.users.clone(),
            self.card.clone(),
            self.crypto.clone(),
            self.urls.clone(),
        )
    }

    pub fn validate_coupon_handler(&self) -> ValidateCouponHandler {
        ValidateCouponHandler::new(self.coupons.clone(), self.products.clone())
    }

    pub fn card_webhook_handler(&self) -> CardWebhookHandler {
        CardWebhookHandler::new(
            self.users.clone(),
            self.products.clone(),
            self.subscriptions.clone(),
            self.purchases.clone(),
            self.coupons.clone(),
            self.webhook_events.clone(),
        )
    }

    pub fn crypto_webhook_handler(&self) -> CryptoWebhookHandler {
        CryptoWebhookHandler::new(
            self.crypto_signer.clone(),
            self.intents.clone(),
            self.products.clone(),
            self.subscriptions.clone(),
            self.purchases.clone(),
            self.coupons.clone(),
            self.reminders.clone(),
            Arc::new(self.complete_renewal_handler()),
        )
    }

    pub fn complete_renewal_handler(&self) -> CompleteRenewalHandler {
        CompleteRenewalHandler::new(
            self.subscriptions.clone(),
            self.products.clone(),
            self.reminders.clone(),
        )
    }

    pub fn renew_handler(&self) -> RenewSubscriptionHandler {
        RenewSubscriptionHandler::new(
            self.subscriptions.clone(),
            self.products.clone(),
            self.intents.clone(),
            self.crypto.clone(),
            self.urls.clone(),
        )
    }

    pub fn expiring_handler(&self) -> GetExpiringSubscriptionsHandler {
        GetExpiringSubscriptionsHandler::new(self.subscriptions.clone(), self.products.clone())
    }

    pub fn sweeper_handler(&self) -> SweeperHandler {
        SweeperHandler::new(
            self.subscriptions.clone(),
            self.products.clone(),
            self.reminders.clone(),
            self.notifier.clone(),
        )
    }

    pub fn portal_handler(&self) -> PortalHandler {
        PortalHandler::new(self.users.clone(), self.card.clone(), self.urls.clone())
    }

    pub fn cancel_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(self.subscriptions.clone(), self.card.clone())
    }

    pub fn reactivate_handler(&self) -> ReactivateSubscriptionHandler {
        ReactivateSubscriptionHandler::new(self.subscriptions.clone(), self.card.clone())
    }

    pub fn upgrade_handler(&self) -> UpgradeSubscriptionHandler {
        UpgradeSubscriptionHandler::new(
            self.subscriptions.clone(),
            self.products.clone(),
            self.card.clone(),
        )
    }

    pub fn overview_handler(&self) -> GetBillingOverviewHandler {
        GetBillingOverviewHandler::new(self.products.clone(), self.subscriptions.clone())
    }

    pub fn crypto_payment_handler(&self) -> GetCryptoPaymentHandler {
        GetCryptoPaymentHandler::new(self.crypto.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Authenticated user extraction
// ════════════════════════════════════════════════════════════════════════════

/// Authenticated user context extracted from the request.
///
/// Session handling is owned by the surrounding application; by the time a
/// request reaches this API, the authenticated user id travels in the
/// `X-User-Id` header set by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Authentication required")),
        )
            .into_response()
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let user_id = parts
                .headers
                .get("X-User-Id")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<UserId>().ok())
                .ok_or(AuthenticationRequired)?;

            Ok(AuthenticatedUser { user_id })
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Error mapping
// ════════════════════════════════════════════════════════════════════════════

/// Wraps BillingError for axum responses.
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "billing request failed");
        }
        (status, Json(ErrorResponse::new(self.0.to_string()))).into_response()
    }
}

fn parse_id<T: std::str::FromStr>(value: &str, field: &str) -> Result<T, BillingApiError> {
    value
        .parse::<T>()
        .map_err(|_| BillingError::Validation(format!("Invalid {}", field)).into())
}

// ════════════════════════════════════════════════════════════════════════════
// Checkout endpoints
// ════════════════════════════════════════════════════════════════════════════

async fn checkout_on(
    state: BillingAppState,
    user: AuthenticatedUser,
    rail: CheckoutRail,
    request: CheckoutRequest,
) -> Result<Json<CheckoutResponse>, BillingApiError> {
    let product_id: ProductId = parse_id(&request.product_id, "productId")?;
    let price_type = ProductKind::parse(&request.price_type).ok_or_else(|| {
        BillingError::Validation(
            "Invalid priceType. Must be \"subscription\" or \"one_time\"".to_string(),
        )
    })?;

    let outcome = state
        .checkout_handler()
        .handle(CheckoutCommand {
            user_id: user.user_id,
            rail,
            product_id,
            price_type,
            coupon_code: request.coupon_code,
            success_url: request.success_url,
            cancel_url: request.cancel_url,
        })
        .await?;

    Ok(Json(outcome.into()))
}

/// POST /api/stripe/checkout
pub async fn create_card_checkout(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, BillingApiError> {
    checkout_on(state, user, CheckoutRail::Card, request).await
}

/// POST /api/cryptomus/checkout
pub async fn create_crypto_checkout(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, BillingApiError> {
    checkout_on(state, user, CheckoutRail::Crypto, request).await
}

/// POST /api/billing/coupons/validate
pub async fn validate_coupon(
    State(state): State<BillingAppState>,
    _user: AuthenticatedUser,
    Json(request): Json<ValidateCouponRequest>,
) -> Result<Json<ValidateCouponResponse>, BillingApiError> {
    let product_id = match &request.product_id {
        Some(id) => Some(parse_id::<ProductId>(id, "productId")?),
        None => None,
    };

    let validation = state
        .validate_coupon_handler()
        .handle(&request.code, product_id)
        .await?;

    Ok(Json(validation.into()))
}

// ════════════════════════════════════════════════════════════════════════════
// Subscription management endpoints
// ════════════════════════════════════════════════════════════════════════════

/// POST /api/stripe/portal
pub async fn create_portal_session(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Json(request): Json<PortalRequest>,
) -> Result<Json<PortalResponse>, BillingApiError> {
    let url = state
        .portal_handler()
        .handle(user.user_id, request.return_url)
        .await?;
    Ok(Json(PortalResponse { url }))
}

/// POST /api/stripe/cancel-subscription
pub async fn cancel_subscription(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Json(request): Json<SubscriptionActionRequest>,
) -> Result<Json<SubscriptionResponse>, BillingApiError> {
    let subscription_id: SubscriptionId = parse_id(&request.subscription_id, "subscriptionId")?;
    let subscription = state
        .cancel_handler()
        .handle(subscription_id, user.user_id)
        .await?;
    Ok(Json(subscription.into()))
}

/// POST /api/stripe/reactivate-subscription
pub async fn reactivate_subscription(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Json(request): Json<SubscriptionActionRequest>,
) -> Result<Json<SubscriptionResponse>, BillingApiError> {
    let subscription_id: SubscriptionId = parse_id(&request.subscription_id, "subscriptionId")?;
    let subscription = state
        .reactivate_handler()
        .handle(subscription_id, user.user_id)
        .await?;
    Ok(Json(subscription.into()))
}

/// POST /api/stripe/upgrade-subscription
pub async fn upgrade_subscription(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Json(request): Json<UpgradeRequest>,
) -> Result<Json<SubscriptionResponse>, BillingApiError> {
    let subscription_id: SubscriptionId =
        parse_id(&request.current_subscription_id, "currentSubscriptionId")?;
    let product_id: ProductId = parse_id(&request.new_product_id, "newProductId")?;
    let subscription = state
        .upgrade_handler()
        .handle(subscription_id, user.user_id, product_id)
        .await?;
    Ok(Json(subscription.into()))
}

// ════════════════════════════════════════════════════════════════════════════
// Renewal endpoints
// ════════════════════════════════════════════════════════════════════════════

/// POST /api/cryptomus/renew
pub async fn renew_subscription(
    State(state): State<BillingAppState>,
    Json(request): Json<RenewRequest>,
) -> Result<Json<RenewResponse>, BillingApiError> {
    let subscription_id: SubscriptionId = parse_id(&request.subscription_id, "subscriptionId")?;
    let user_id: UserId = parse_id(&request.user_id, "userId")?;

    let payment = state
        .renew_handler()
        .handle(subscription_id, user_id)
        .await?;
    Ok(Json(payment.into()))
}

/// GET /api/subscriptions/expiring
pub async fn expiring_subscriptions(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
) -> Result<Json<ExpiringResponse>, BillingApiError> {
    let expiring = state
        .expiring_handler()
        .handle(user.user_id, EXPIRING_WINDOW_DAYS)
        .await?;
    Ok(Json(ExpiringResponse {
        subscriptions: expiring.into_iter().map(Into::into).collect(),
    }))
}

// ════════════════════════════════════════════════════════════════════════════
// Overview / payments / maintenance
// ════════════════════════════════════════════════════════════════════════════

/// GET /api/billing
pub async fn billing_overview(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
) -> Result<Json<OverviewResponse>, BillingApiError> {
    let overview = state.overview_handler().handle(user.user_id).await?;
    Ok(Json(overview.into()))
}

/// GET /api/billing/payments/{uuid}
pub async fn crypto_payment_status(
    State(state): State<BillingAppState>,
    _user: AuthenticatedUser,
    Path(uuid): Path<String>,
) -> Result<Json<CryptoPaymentResponse>, BillingApiError> {
    let payment = state.crypto_payment_handler().handle(&uuid).await?;
    Ok(Json(payment.into()))
}

/// POST /api/maintenance/sweep
pub async fn run_sweep(
    State(state): State<BillingAppState>,
) -> Result<Json<SweepResponse>, BillingApiError> {
    let report = state.sweeper_handler().run(Timestamp::now()).await?;
    Ok(Json(report.into()))
}

// ════════════════════════════════════════════════════════════════════════════
// Webhooks
// ════════════════════════════════════════════════════════════════════════════

/// POST /api/stripe/webhook
///
/// Verifies the signature over the raw body, then applies the event. The
/// response status controls the provider's retry behavior.
pub async fn card_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(signature) = headers.get("stripe-signature").and_then(|v| v.to_str().ok()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("No signature")),
        )
            .into_response();
    };

    let event = match state.card_verifier.verify_and_parse(&body, signature) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(error = %err, "card webhook rejected");
            return (err.status_code(), Json(ErrorResponse::new(err.to_string())))
                .into_response();
        }
    };

    match state.card_webhook_handler().handle(event).await {
        Ok(_) => Json(serde_json::json!({"received": true})).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "card webhook handler failed");
            (err.status_code(), Json(ErrorResponse::new(err.to_string()))).into_response()
        }
    }
}

/// POST /api/cryptomus/webhook
pub async fn crypto_webhook(
    State(state): State<BillingAppState>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    match state.crypto_webhook_handler().handle(payload).await {
        Ok(()) => Json(serde_json::json!({"success": true})).into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "crypto webhook rejected");
            (err.status_code(), Json(ErrorResponse::new(err.to_string()))).into_response()
        }
    }
}
