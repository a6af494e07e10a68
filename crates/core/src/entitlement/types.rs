//! Entitlement domain types.
//!
//! A principal or company carries a denormalized *mirror* of its current
//! entitlement. The append-only subscription history is the authoritative
//! record the mirrors are derived from.

use chrono::{DateTime, Utc};
use pharmacare_shared::auth::SubscriptionInfo;
use pharmacare_shared::billing::SubscriptionEventView;
use pharmacare_shared::types::{CompanyId, PrincipalId, SubscriptionEventId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription status as stored on mirrors and history rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// Paid and within its term.
    Active,
    /// Never paid, lapsed, or cleared.
    #[default]
    Inactive,
}

impl SubscriptionStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    /// Parses a status from a string; anything unrecognised is inactive.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("active") {
            Self::Active
        } else {
            Self::Inactive
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Denormalized entitlement fields carried by a principal or company row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementMirror {
    /// Stored status.
    pub status: SubscriptionStatus,
    /// Plan that granted the entitlement.
    pub plan_id: Option<String>,
    /// When the entitlement lapses; `None` means open-ended.
    pub end_date: Option<DateTime<Utc>>,
}

impl EntitlementMirror {
    /// A mirror with no entitlement.
    #[must_use]
    pub fn inactive() -> Self {
        Self::default()
    }

    /// An active mirror for `plan_id` running until `end_date`.
    #[must_use]
    pub fn active(plan_id: impl Into<String>, end_date: DateTime<Utc>) -> Self {
        Self {
            status: SubscriptionStatus::Active,
            plan_id: Some(plan_id.into()),
            end_date: Some(end_date),
        }
    }

    /// Returns true if the mirror grants access at `now`.
    ///
    /// A stored `active` status whose end date has already passed does not
    /// count.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.end_date.is_none_or(|end| end > now)
    }
}

/// A tenant company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Company {
    /// Company ID.
    pub id: CompanyId,
    /// Display name.
    pub name: String,
    /// Principal that administers the company.
    pub admin_principal_id: Option<PrincipalId>,
    /// Company-level entitlement mirror.
    pub mirror: EntitlementMirror,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// One row of the append-only subscription history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionEvent {
    /// Event ID.
    pub id: SubscriptionEventId,
    /// Principal that paid.
    pub principal_id: PrincipalId,
    /// Company covered, for company-typed payments.
    pub company_id: Option<CompanyId>,
    /// Plan purchased.
    pub plan_id: String,
    /// Status granted.
    pub status: SubscriptionStatus,
    /// Start of the term.
    pub start_date: DateTime<Utc>,
    /// End of the term.
    pub end_date: DateTime<Utc>,
    /// Payment correlation id; unique across the history.
    pub tx_ref: String,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
}

impl SubscriptionEvent {
    /// Returns true if this event grants access at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.end_date > now
    }

    /// Converts the event into its client-facing form.
    #[must_use]
    pub fn to_view(&self) -> SubscriptionEventView {
        SubscriptionEventView {
            id: self.id.into_inner(),
            principal_id: self.principal_id.into_inner(),
            company_id: self.company_id.map(CompanyId::into_inner),
            plan_id: self.plan_id.clone(),
            status: self.status.as_str().to_string(),
            start_date: self.start_date,
            end_date: self.end_date,
            tx_ref: self.tx_ref.clone(),
        }
    }
}

/// Where a resolved entitlement came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitlementSource {
    /// The principal's own mirror.
    Principal,
    /// The company mirror.
    Company,
    /// An active company event, used when the company mirror has drifted.
    History,
    /// Nothing active was found.
    None,
}

impl EntitlementSource {
    /// Returns the string representation of the source.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Principal => "principal",
            Self::Company => "company",
            Self::History => "history",
            Self::None => "none",
        }
    }
}

/// The entitlement a principal effectively holds right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entitlement {
    /// Effective status.
    pub status: SubscriptionStatus,
    /// Plan, if any.
    pub plan_id: Option<String>,
    /// When the entitlement lapses.
    pub end_date: Option<DateTime<Utc>>,
    /// Which record the answer was taken from.
    pub source: EntitlementSource,
}

impl Entitlement {
    /// Returns true if the entitlement grants access.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    pub(crate) fn from_mirror(
        mirror: &EntitlementMirror,
        source: EntitlementSource,
        now: DateTime<Utc>,
    ) -> Self {
        let status = if mirror.is_active_at(now) {
            SubscriptionStatus::Active
        } else {
            SubscriptionStatus::Inactive
        };
        Self {
            status,
            plan_id: mirror.plan_id.clone(),
            end_date: mirror.end_date,
            source,
        }
    }

    pub(crate) fn from_event(event: &SubscriptionEvent) -> Self {
        Self {
            status: SubscriptionStatus::Active,
            plan_id: Some(event.plan_id.clone()),
            end_date: Some(event.end_date),
            source: EntitlementSource::History,
        }
    }

    /// Converts the entitlement into its client-facing form.
    #[must_use]
    pub fn to_info(&self) -> SubscriptionInfo {
        SubscriptionInfo {
            status: self.status.as_str().to_string(),
            plan_id: self.plan_id.clone(),
            end_date: self.end_date,
            source: self.source.as_str().to_string(),
        }
    }
}
