//! Access resolver.
//!
//! Rules, first match wins:
//! 1. platform admin → everything;
//! 2. company member with no declared company → look the company up;
//! 3. a company is known → every principal in either store with that
//!    company, plus the requester;
//! 4. otherwise → the requester only.
//!
//! Any store failure narrows the answer to the requester only. Resolution
//! never returns an error.

use std::sync::Arc;

use pharmacare_shared::types::{CompanyId, PrincipalId};

use super::scope::{AccessRequest, AccessScope};
use crate::ports::{DataStore, StoreError};
use crate::principal::PrincipalDirectory;

/// The rule that applies to a request before any store is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeRule {
    /// Unrestricted.
    All,
    /// Company member without a declared company; look it up.
    LookupCompany,
    /// Company declared in the session.
    Company(CompanyId),
    /// Requester only.
    Own,
}

impl ScopeRule {
    /// Picks the rule for a request.
    #[must_use]
    pub fn for_request(request: &AccessRequest) -> Self {
        if request.role.is_platform_admin() {
            return Self::All;
        }
        match request.company_id {
            None if request.is_company_user() => Self::LookupCompany,
            Some(company_id) => Self::Company(company_id),
            None => Self::Own,
        }
    }
}

/// Resolves access scopes against the principal stores.
#[derive(Clone, Debug)]
pub struct AccessResolver {
    directory: PrincipalDirectory,
}

impl AccessResolver {
    /// Creates a resolver over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            directory: PrincipalDirectory::new(store),
        }
    }

    /// Resolves the scope for a request.
    pub async fn resolve(&self, request: &AccessRequest) -> AccessScope {
        let me = request.principal_id;
        match ScopeRule::for_request(request) {
            ScopeRule::All => AccessScope::All,
            ScopeRule::Own => AccessScope::own(me),
            ScopeRule::Company(company_id) => self.company_scope(me, company_id).await,
            ScopeRule::LookupCompany => match self.lookup_company(me).await {
                Ok(Some(company_id)) => self.company_scope(me, company_id).await,
                Ok(None) => AccessScope::own(me),
                Err(e) => {
                    tracing::warn!(
                        principal_id = %me,
                        error = %e,
                        "company lookup failed; scope narrowed to self"
                    );
                    AccessScope::own(me)
                }
            },
        }
    }

    async fn lookup_company(&self, me: PrincipalId) -> Result<Option<CompanyId>, StoreError> {
        match self.directory.find_by_id(me).await? {
            Some(principal) => self.directory.company_of(&principal).await,
            None => Ok(None),
        }
    }

    async fn company_scope(&self, me: PrincipalId, company_id: CompanyId) -> AccessScope {
        match self.directory.company_member_ids(company_id).await {
            Ok(mut ids) => {
                ids.insert(me);
                AccessScope::Ids(ids)
            }
            Err(e) => {
                tracing::warn!(
                    principal_id = %me,
                    company_id = %company_id,
                    error = %e,
                    "company member lookup failed; scope narrowed to self"
                );
                AccessScope::own(me)
            }
        }
    }
}
