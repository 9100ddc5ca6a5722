//! Card-rail adapter over the provider's form-encoded REST API.
//!
//! Implements [`CardRail`] with reqwest. Every request authenticates with
//! the secret key via HTTP basic auth. Mirror creation is idempotent: an
//! existing mirror id is verified upstream before reuse and recreated when
//! it no longer resolves.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::domain::billing::{Coupon, DiscountKind, Product, ProductKind};
use crate::domain::foundation::UserId;
use crate::ports::{
    CardCheckoutSession, CardRail, CreateCardCheckout, ProductMirror, ProrationPolicy, RailError,
    RailErrorCode,
};

use super::wire_types::{
    StripeCheckoutSession, StripeCoupon, StripeCustomer, StripePortalSession, StripePrice,
    StripeProduct, StripeSubscription,
};

/// Card rail API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    api_key: SecretString,
    api_base_url: String,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: "https://api.stripe.com".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Card-rail adapter.
pub struct StripeCardAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeCardAdapter {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, RailError> {
        let url = format!("{}{}", self.config.api_base_url, path);
        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(params)
            .send()
            .await
            .map_err(|e| RailError::network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(path = %path, status = %status, body = %body, "card rail request failed");
            return Err(RailError::new(
                RailErrorCode::Provider,
                format!("card rail error ({}): {}", status, body),
            ));
        }

        response.json().await.map_err(|e| {
            RailError::new(
                RailErrorCode::Provider,
                format!("failed to parse card rail response: {}", e),
            )
        })
    }

    /// GET that treats 404 as `None`.
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, RailError> {
        let url = format!("{}{}", self.config.api_base_url, path);
        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| RailError::network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RailError::new(
                RailErrorCode::Provider,
                format!("card rail error ({}): {}", status, body),
            ));
        }

        let value = response.json().await.map_err(|e| {
            RailError::new(
                RailErrorCode::Provider,
                format!("failed to parse card rail response: {}", e),
            )
        })?;
        Ok(Some(value))
    }

    /// True when a stored price mirror still resolves upstream.
    async fn price_mirror_is_live(&self, price_id: &str) -> Result<bool, RailError> {
        match self
            .get_optional::<StripePrice>(&format!("/v1/prices/{}", price_id))
            .await?
        {
            Some(price) => Ok(price.active && !price.deleted),
            None => Ok(false),
        }
    }

    async fn create_product_mirror(&self, product: &Product) -> Result<ProductMirror, RailError> {
        let mut params = vec![
            ("name".to_string(), product.name.clone()),
            ("metadata[product_ref]".to_string(), product.id.to_string()),
        ];
        if let Some(description) = &product.description {
            params.push(("description".to_string(), description.clone()));
        }
        let created: StripeProduct = self.post_form("/v1/products", &params).await?;

        let mut price_params = vec![
            ("product".to_string(), created.id.clone()),
            ("unit_amount".to_string(), product.price.to_string()),
            ("currency".to_string(), product.currency.clone()),
            ("metadata[product_ref]".to_string(), product.id.to_string()),
        ];
        if product.kind == ProductKind::Subscription {
            let interval = product
                .interval
                .map(|i| i.as_str())
                .unwrap_or("month");
            price_params.push(("recurring[interval]".to_string(), interval.to_string()));
        }
        let price: StripePrice = self.post_form("/v1/prices", &price_params).await?;

        tracing::info!(
            product = %product.id,
            mirror_product = %created.id,
            mirror_price = %price.id,
            "created card rail product mirror"
        );

        Ok(ProductMirror {
            product_id: created.id,
            price_id: price.id,
        })
    }
}

#[async_trait]
impl CardRail for StripeCardAdapter {
    async fn create_customer(
        &self,
        user_id: &UserId,
        email: &str,
        name: Option<&str>,
    ) -> Result<String, RailError> {
        let mut params = vec![
            ("email".to_string(), email.to_string()),
            ("metadata[user_id]".to_string(), user_id.to_string()),
        ];
        if let Some(name) = name {
            params.push(("name".to_string(), name.to_string()));
        }

        let customer: StripeCustomer = self.post_form("/v1/customers", &params).await?;
        Ok(customer.id)
    }

    async fn create_checkout_session(
        &self,
        request: CreateCardCheckout,
    ) -> Result<CardCheckoutSession, RailError> {
        let mut params = vec![
            ("mode".to_string(), request.mode.as_str().to_string()),
            ("customer".to_string(), request.customer_id),
            ("line_items[0][price]".to_string(), request.price_id),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), request.success_url),
            ("cancel_url".to_string(), request.cancel_url),
            (
                "billing_address_collection".to_string(),
                "required".to_string(),
            ),
            (
                "metadata[user_id]".to_string(),
                request.metadata.user_id.to_string(),
            ),
            (
                "metadata[product_id]".to_string(),
                request.metadata.product_id.to_string(),
            ),
            ("metadata[type]".to_string(), request.metadata.price_type),
        ];

        // A session-level discount and generic promotion codes are mutually
        // exclusive on this rail.
        match request.discount_coupon_id {
            Some(coupon_id) => {
                params.push(("discounts[0][coupon]".to_string(), coupon_id));
                if let Some(code) = request.metadata.coupon_code {
                    params.push(("metadata[coupon_code]".to_string(), code));
                }
            }
            None => {
                params.push(("allow_promotion_codes".to_string(), "true".to_string()));
            }
        }

        let session: StripeCheckoutSession =
            self.post_form("/v1/checkout/sessions", &params).await?;
        let url = session.url.ok_or_else(|| {
            RailError::new(RailErrorCode::Provider, "checkout session has no URL")
        })?;

        Ok(CardCheckoutSession {
            id: session.id,
            url,
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<String, RailError> {
        let params = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("return_url".to_string(), return_url.to_string()),
        ];
        let session: StripePortalSession =
            self.post_form("/v1/billing_portal/sessions", &params).await?;
        Ok(session.url)
    }

    async fn cancel_at_period_end(&self, subscription_id: &str) -> Result<(), RailError> {
        let params = vec![("cancel_at_period_end".to_string(), "true".to_string())];
        let _: StripeSubscription = self
            .post_form(&format!("/v1/subscriptions/{}", subscription_id), &params)
            .await?;
        Ok(())
    }

    async fn reactivate(&self, subscription_id: &str) -> Result<(), RailError> {
        let params = vec![("cancel_at_period_end".to_string(), "false".to_string())];
        let _: StripeSubscription = self
            .post_form(&format!("/v1/subscriptions/{}", subscription_id), &params)
            .await?;
        Ok(())
    }

    async fn change_subscription_item(
        &self,
        subscription_id: &str,
        new_price_id: &str,
        proration: ProrationPolicy,
    ) -> Result<(), RailError> {
        // The item id has to be read back before it can be swapped.
        let subscription: StripeSubscription = self
            .get_optional(&format!("/v1/subscriptions/{}", subscription_id))
            .await?
            .ok_or_else(|| RailError::not_found("subscription"))?;
        let item = subscription
            .items
            .data
            .first()
            .ok_or_else(|| RailError::not_found("subscription item"))?;

        let params = vec![
            ("items[0][id]".to_string(), item.id.clone()),
            ("items[0][price]".to_string(), new_price_id.to_string()),
            (
                "proration_behavior".to_string(),
                proration.as_str().to_string(),
            ),
        ];
        let _: StripeSubscription = self
            .post_form(&format!("/v1/subscriptions/{}", subscription_id), &params)
            .await?;
        Ok(())
    }

    async fn ensure_product_mirror(&self, product: &Product) -> Result<ProductMirror, RailError> {
        if let (Some(product_id), Some(price_id)) =
            (&product.card_product_id, &product.card_price_id)
        {
            if self.price_mirror_is_live(price_id).await? {
                return Ok(ProductMirror {
                    product_id: product_id.clone(),
                    price_id: price_id.clone(),
                });
            }
            tracing::warn!(
                product = %product.id,
                price = %price_id,
                "stored price mirror no longer resolves; recreating"
            );
        }

        self.create_product_mirror(product).await
    }

    async fn ensure_coupon_mirror(&self, coupon: &Coupon) -> Result<String, RailError> {
        if let Some(coupon_id) = &coupon.card_coupon_id {
            let live = self
                .get_optional::<StripeCoupon>(&format!("/v1/coupons/{}", coupon_id))
                .await?
                .map(|c| c.valid && !c.deleted)
                .unwrap_or(false);
            if live {
                return Ok(coupon_id.clone());
            }
            tracing::warn!(coupon = %coupon.code, "stored coupon mirror no longer resolves; recreating");
        }

        let mut params = vec![
            ("name".to_string(), coupon.code.clone()),
            ("duration".to_string(), "once".to_string()),
        ];
        match coupon.kind {
            DiscountKind::Percentage => {
                params.push(("percent_off".to_string(), coupon.value.to_string()));
            }
            DiscountKind::Fixed => {
                params.push(("amount_off".to_string(), coupon.value.to_string()));
                params.push(("currency".to_string(), "usd".to_string()));
            }
        }

        let created: StripeCoupon = self.post_form("/v1/coupons", &params).await?;
        tracing::info!(coupon = %coupon.code, mirror = %created.id, "created card rail coupon mirror");
        Ok(created.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_satisfies_the_port() {
        fn _accepts(_rail: &dyn CardRail) {}
        let adapter = StripeCardAdapter::new(StripeConfig::new("sk_test_xxx"));
        _accepts(&adapter);
    }

    #[test]
    fn base_url_override_is_applied() {
        let config = StripeConfig::new("sk_test_xxx").with_base_url("http://localhost:12111");
        assert_eq!(config.api_base_url, "http://localhost:12111");
    }
}
