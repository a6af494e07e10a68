//! `SeaORM` entities.
//!
//! The two principal tables share one shape. Mirror columns
//! (`subscription_status`, `plan_id`, `subscription_end_date`) are denormalized
//! copies of the subscription history.

pub mod companies;
pub mod company_principals;
pub mod payments;
pub mod principals;
pub mod subscription_events;

use chrono::{DateTime, Utc};
use pharmacare_core::entitlement::{EntitlementMirror, SubscriptionStatus};
use sea_orm::prelude::DateTimeWithTimeZone;

pub(crate) fn utc(at: DateTimeWithTimeZone) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}

pub(crate) fn mirror_from_columns(
    status: &str,
    plan_id: Option<String>,
    end_date: Option<DateTimeWithTimeZone>,
) -> EntitlementMirror {
    EntitlementMirror {
        status: SubscriptionStatus::parse(status),
        plan_id,
        end_date: end_date.map(utc),
    }
}
