//! Registration, approval, and company membership.

pub mod error;
pub mod service;

pub use error::AccountError;
pub use service::AccountService;
