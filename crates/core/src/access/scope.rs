//! Access scope types.

use std::collections::BTreeSet;

use pharmacare_shared::auth::Claims;
use pharmacare_shared::types::{CompanyId, PrincipalId};
use pharmacare_shared::AppError;
use thiserror::Error;

use crate::auth::{AccountKind, Role};

/// The set of owners whose records a requester may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessScope {
    /// No ownership filter.
    All,
    /// Only records owned by these principals.
    Ids(BTreeSet<PrincipalId>),
}

impl AccessScope {
    /// A scope containing only `principal_id`.
    #[must_use]
    pub fn own(principal_id: PrincipalId) -> Self {
        Self::Ids(BTreeSet::from([principal_id]))
    }

    /// Returns true for the unrestricted scope.
    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Returns true if records owned by `owner` are visible.
    #[must_use]
    pub fn allows(&self, owner: PrincipalId) -> bool {
        match self {
            Self::All => true,
            Self::Ids(ids) => ids.contains(&owner),
        }
    }

    /// The owner ids to filter by, or `None` for no filter.
    #[must_use]
    pub const fn owner_ids(&self) -> Option<&BTreeSet<PrincipalId>> {
        match self {
            Self::All => None,
            Self::Ids(ids) => Some(ids),
        }
    }

    /// Fails with [`AccessDenied`] unless `owner` is in scope.
    ///
    /// # Errors
    ///
    /// Returns `AccessDenied` when the target is outside the scope.
    pub fn ensure_allows(&self, owner: PrincipalId) -> Result<(), AccessDenied> {
        if self.allows(owner) {
            Ok(())
        } else {
            Err(AccessDenied { target: owner })
        }
    }
}

/// A target principal lies outside the caller's scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("principal {target} is outside the caller's access scope")]
pub struct AccessDenied {
    /// The principal the caller tried to reach.
    pub target: PrincipalId,
}

impl From<AccessDenied> for AppError {
    fn from(err: AccessDenied) -> Self {
        Self::Forbidden(err.to_string())
    }
}

/// Identity facts the resolver decides on, as stamped into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    /// Requester.
    pub principal_id: PrincipalId,
    /// Requester role.
    pub role: Role,
    /// Company the session declares, if any.
    pub company_id: Option<CompanyId>,
    /// Account kind the session declares.
    pub account_kind: AccountKind,
}

impl AccessRequest {
    /// Builds a request from verified session claims.
    ///
    /// An unrecognised account kind is read as `individual`, which only ever
    /// narrows the resulting scope.
    #[must_use]
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            principal_id: PrincipalId::from_uuid(claims.principal_id()),
            role: Role::from(claims.role.as_str()),
            company_id: claims.company_id().map(CompanyId::from_uuid),
            account_kind: claims.account_kind.parse().unwrap_or_default(),
        }
    }

    /// Returns true if the request describes a company member.
    #[must_use]
    pub const fn is_company_user(&self) -> bool {
        matches!(self.account_kind, AccountKind::CompanyUser) || self.role.is_company_user()
    }
}
