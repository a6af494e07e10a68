//! Hosted payment provider client.
//!
//! Implements the core `PaymentGateway` port over the provider's REST API:
//! checkout initialization and verification by `tx_ref`.

mod client;
mod dto;

pub use client::{ClientError, GatewayClient, GatewaySettings};
