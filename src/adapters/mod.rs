//! Adapters implementing the ports against concrete technologies.

pub mod cryptomus;
pub mod http;
pub mod memory;
pub mod stripe;
