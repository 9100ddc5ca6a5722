//! Crypto-rail adapter (Cryptomus-shaped signed JSON API).

mod client;

pub use client::{CryptomusAdapter, CryptomusConfig};
