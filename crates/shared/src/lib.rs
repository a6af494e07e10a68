//! Shared types, errors, and configuration for PharmaCare.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for principals, companies, and ledger rows
//! - Session token claims and the JWT service that signs them
//! - Request/response payloads for the auth, company, and billing endpoints
//! - Application-wide error types
//! - Configuration management

pub mod auth;
pub mod billing;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

#[cfg(test)]
mod error_tests;
#[cfg(test)]
mod jwt_tests;

pub use auth::Claims;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
