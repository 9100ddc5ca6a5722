//! Card-rail adapter (Stripe-shaped REST API).

mod card_adapter;
mod wire_types;

pub use card_adapter::{StripeCardAdapter, StripeConfig};
