//! Card rail configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Card rail configuration (Stripe)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeSettings {
    /// Secret API key (sk_test_... or sk_live_...)
    pub api_key: String,

    /// Webhook signing secret (whsec_...)
    pub webhook_secret: String,
}

impl StripeSettings {
    /// Check if using test mode
    pub fn is_test_mode(&self) -> bool {
        self.api_key.starts_with("sk_test_")
    }

    /// Check if using live mode
    pub fn is_live_mode(&self) -> bool {
        self.api_key.starts_with("sk_live_")
    }

    /// Validate card rail configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_API_KEY"));
        }
        if self.webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
        }

        // Verify key prefixes for safety
        if !self.api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidCardApiKey);
        }
        if !self.webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidCardWebhookSecret);
        }

        Ok(())
    }
}
