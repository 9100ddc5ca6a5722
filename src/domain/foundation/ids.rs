//! Strongly-typed identifier value objects.
//!
//! Every record kind owned by the external document store gets its own id
//! type so a `ProductId` can never be passed where a `CouponId` is expected.
//! Ids are UUID-backed and opaque to the core.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an id from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

define_id! {
    /// Unique identifier for an application user.
    UserId
}

define_id! {
    /// Unique identifier for a purchasable product.
    ProductId
}

define_id! {
    /// Unique identifier for a discount coupon.
    CouponId
}

define_id! {
    /// Unique identifier for a crypto-rail payment intent record.
    PaymentIntentId
}

define_id! {
    /// Unique identifier for a subscription row in the ledger.
    SubscriptionId
}

define_id! {
    /// Unique identifier for a one-time purchase record.
    PurchaseId
}

define_id! {
    /// Unique identifier for a renewal reminder record.
    ReminderId
}
