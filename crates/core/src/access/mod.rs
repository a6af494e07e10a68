//! Access resolution.
//!
//! Decides which principals' records a requester may see. The answer is an
//! [`AccessScope`]: either everything, or a finite set of owner ids that
//! always contains the requester.
//!
//! # Modules
//!
//! - `scope` - `AccessScope`, `AccessRequest`, `AccessDenied`
//! - `resolver` - The rule table and the store-backed resolver

pub mod resolver;
pub mod scope;

#[cfg(test)]
mod resolver_props;

pub use resolver::{AccessResolver, ScopeRule};
pub use scope::{AccessDenied, AccessRequest, AccessScope};
