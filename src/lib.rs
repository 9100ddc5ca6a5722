//! Paylane - two-rail billing backend.
//!
//! Checkout sessions on a card processor, single payments on a crypto
//! gateway, and a webhook reconciliation engine that turns asynchronous
//! provider notifications into a durable subscription/purchase ledger.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
