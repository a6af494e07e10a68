//! Principals and the two stores that hold them.
//!
//! A principal row lives either in the *primary* store (individuals,
//! company owners, platform admins) or in the *company-scoped* store
//! (members added by a company admin). The same email may be present in
//! both while accounts are being synced; lookups by email prefer the
//! primary row.

mod directory;

pub use directory::PrincipalDirectory;

use chrono::{DateTime, Utc};
use pharmacare_shared::types::{CompanyId, PrincipalId};
use serde::{Deserialize, Serialize};

use crate::auth::{AccountKind, Role};
use crate::entitlement::EntitlementMirror;

/// Which store a principal row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Individuals, company owners, and platform admins.
    Primary,
    /// Members created by a company admin.
    CompanyScoped,
}

impl StoreKind {
    /// Both stores, in lookup precedence order.
    pub const ALL: [Self; 2] = [Self::Primary, Self::CompanyScoped];

    /// Returns the string representation of the store.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::CompanyScoped => "company_scoped",
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trims and lowercases an email for storage and lookup.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A principal row as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalRecord {
    /// Principal ID.
    pub id: PrincipalId,
    /// Normalized email.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Argon2 PHC hash; empty for synced rows that cannot log in directly.
    pub password_hash: String,
    /// Role.
    pub role: Role,
    /// Stored account kind.
    pub account_kind: AccountKind,
    /// Whether an admin has approved the principal.
    pub approved: bool,
    /// Company membership.
    pub company_id: Option<CompanyId>,
    /// Entitlement mirror.
    pub mirror: EntitlementMirror,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A principal together with the store it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Row from the primary store.
    Primary(PrincipalRecord),
    /// Row from the company-scoped store.
    CompanyScoped(PrincipalRecord),
}

impl Principal {
    /// Wraps a record with its origin.
    #[must_use]
    pub fn from_store(store: StoreKind, record: PrincipalRecord) -> Self {
        match store {
            StoreKind::Primary => Self::Primary(record),
            StoreKind::CompanyScoped => Self::CompanyScoped(record),
        }
    }

    /// The underlying record.
    #[must_use]
    pub const fn record(&self) -> &PrincipalRecord {
        match self {
            Self::Primary(record) | Self::CompanyScoped(record) => record,
        }
    }

    /// Consumes the principal, returning the record.
    #[must_use]
    pub fn into_record(self) -> PrincipalRecord {
        match self {
            Self::Primary(record) | Self::CompanyScoped(record) => record,
        }
    }

    /// Store the row came from.
    #[must_use]
    pub const fn store(&self) -> StoreKind {
        match self {
            Self::Primary(_) => StoreKind::Primary,
            Self::CompanyScoped(_) => StoreKind::CompanyScoped,
        }
    }

    /// Principal ID.
    #[must_use]
    pub const fn id(&self) -> PrincipalId {
        self.record().id
    }

    /// Normalized email.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.record().email
    }

    /// Role.
    #[must_use]
    pub const fn role(&self) -> &Role {
        &self.record().role
    }

    /// Company membership as stored on this row.
    #[must_use]
    pub const fn company_id(&self) -> Option<CompanyId> {
        self.record().company_id
    }

    /// Returns true for rows from the company-scoped store.
    #[must_use]
    pub const fn is_company_scoped(&self) -> bool {
        matches!(self, Self::CompanyScoped(_))
    }

    /// Account kind to report for this principal once its company link is
    /// known.
    ///
    /// Anyone from the company-scoped store, or with a resolved company, is a
    /// company user; everyone else keeps their stored kind.
    #[must_use]
    pub fn effective_account_kind(&self, resolved_company: Option<CompanyId>) -> AccountKind {
        if self.is_company_scoped() || resolved_company.is_some() {
            AccountKind::CompanyUser
        } else {
            self.record().account_kind
        }
    }
}
