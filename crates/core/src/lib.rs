//! Core business logic for PharmaCare.
//!
//! This crate contains the tenant access-resolution and subscription
//! entitlement subsystem with ZERO web or database dependencies. Storage and
//! the payment gateway are reached through the ports in [`ports`] and
//! [`payment::gateway`].
//!
//! # Modules
//!
//! - `auth` - Roles, account kinds, password hashing
//! - `principal` - The two principal stores behind one sum type
//! - `access` - Which principals' records a requester may see
//! - `entitlement` - Plans, mirrors, history, and the entitlement read path
//! - `payment` - Payment state machine and reconciliation
//! - `session` - Login and session token issuing
//! - `accounts` - Registration, approval, company membership

pub mod access;
pub mod accounts;
pub mod auth;
pub mod entitlement;
pub mod payment;
pub mod ports;
pub mod principal;
pub mod session;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use access::{AccessRequest, AccessResolver, AccessScope};
pub use accounts::{AccountError, AccountService};
pub use entitlement::{Entitlement, EntitlementReader};
pub use payment::PaymentReconciler;
pub use ports::{DataStore, StoreError, StoreHandles};
pub use principal::{Principal, PrincipalDirectory, StoreKind};
pub use session::SessionIssuer;
