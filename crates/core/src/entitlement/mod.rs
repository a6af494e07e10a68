//! Subscription entitlement.
//!
//! # Modules
//!
//! - `types` - Mirrors, companies, history rows, resolved entitlement
//! - `plan` - Plan catalogue and term arithmetic
//! - `reader` - The single read path that merges mirrors and history

pub mod plan;
pub mod reader;
pub mod types;

pub use plan::{BillingPeriod, CATALOGUE, Plan, PlanScope, PlanTerms, find_plan};
pub use reader::EntitlementReader;
pub use types::{
    Company, Entitlement, EntitlementMirror, EntitlementSource, SubscriptionEvent,
    SubscriptionStatus,
};
