//! Public URL configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Public-facing URLs used for redirects and webhook callbacks
#[derive(Debug, Clone, Deserialize)]
pub struct UrlSettings {
    /// Base URL the application is reachable at
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

impl UrlSettings {
    /// Validate URL configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.public_base_url.starts_with("http://")
            && !self.public_base_url.starts_with("https://")
        {
            return Err(ValidationError::InvalidPublicBaseUrl);
        }
        Ok(())
    }
}

impl Default for UrlSettings {
    fn default() -> Self {
        Self {
            public_base_url: default_public_base_url(),
        }
    }
}

fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_url_is_valid() {
        assert!(UrlSettings::default().validate().is_ok());
    }

    #[test]
    fn scheme_is_required() {
        let config = UrlSettings {
            public_base_url: "app.example.com".to_string(),
        };
        assert!(config.validate().is_err());
    }
}
