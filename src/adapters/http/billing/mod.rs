//! HTTP adapter for the billing API.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{AuthenticatedUser, BillingAppState};
pub use routes::billing_router;
