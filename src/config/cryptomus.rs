//! Crypto rail configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Crypto rail configuration (Cryptomus)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CryptomusSettings {
    /// Merchant API key used for request/webhook signing
    pub api_key: String,

    /// Merchant id sent with every request
    pub merchant_id: String,
}

impl CryptomusSettings {
    /// Validate crypto rail configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingRequired("CRYPTOMUS_API_KEY"));
        }
        if self.merchant_id.is_empty() {
            return Err(ValidationError::MissingRequired("CRYPTOMUS_MERCHANT_ID"));
        }
        Ok(())
    }
}
