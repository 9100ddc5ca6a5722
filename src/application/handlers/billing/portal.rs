//! PortalHandler - opens the card rail's hosted billing portal.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::domain::foundation::UserId;
use crate::ports::{CardRail, UserDirectory};

use super::checkout::RedirectUrls;

/// Handler creating a billing portal session for the current user.
pub struct PortalHandler {
    users: Arc<dyn UserDirectory>,
    card: Arc<dyn CardRail>,
    urls: RedirectUrls,
}

impl PortalHandler {
    pub fn new(users: Arc<dyn UserDirectory>, card: Arc<dyn CardRail>, urls: RedirectUrls) -> Self {
        Self { users, card, urls }
    }

    /// Returns the portal URL. Users without a card customer mirror have
    /// nothing to manage there.
    pub async fn handle(
        &self,
        user_id: UserId,
        return_url: Option<String>,
    ) -> Result<String, BillingError> {
        let user = self
            .users
            .find_by_id(&user_id)
            .await?
            .ok_or(BillingError::Unauthenticated)?;

        let Some(customer_id) = user.card_customer_id else {
            return Err(BillingError::Misconfigured(
                "No card customer found".to_string(),
            ));
        };

        let return_url = return_url.unwrap_or_else(|| self.urls.portal_return());
        let url = self
            .card
            .create_portal_session(&customer_id, &return_url)
            .await?;
        Ok(url)
    }
}
