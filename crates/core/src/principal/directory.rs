//! Uniform lookups over both principal stores.

use std::collections::BTreeSet;
use std::sync::Arc;

use pharmacare_shared::types::{CompanyId, PrincipalId};

use super::{Principal, StoreKind, normalize_email};
use crate::ports::{DataStore, StoreError};

/// Looks principals up across the primary and company-scoped stores.
#[derive(Clone)]
pub struct PrincipalDirectory {
    store: Arc<dyn DataStore>,
}

impl PrincipalDirectory {
    /// Creates a directory over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DataStore> {
        &self.store
    }

    /// Finds a principal by email, primary store first.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, StoreError> {
        let email = normalize_email(email);
        for kind in StoreKind::ALL {
            if let Some(record) = self.store.find_principal_by_email(kind, &email).await? {
                return Ok(Some(Principal::from_store(kind, record)));
            }
        }
        Ok(None)
    }

    /// Finds a principal by id, primary store first.
    pub async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, StoreError> {
        for kind in StoreKind::ALL {
            if let Some(record) = self.store.find_principal_by_id(kind, id).await? {
                return Ok(Some(Principal::from_store(kind, record)));
            }
        }
        Ok(None)
    }

    /// Resolves the company a principal belongs to.
    ///
    /// Uses the principal's own link when present. A primary row without one
    /// falls back to a company-scoped row with the same email.
    pub async fn company_of(&self, principal: &Principal) -> Result<Option<CompanyId>, StoreError> {
        if let Some(company_id) = principal.company_id() {
            return Ok(Some(company_id));
        }
        if principal.is_company_scoped() {
            return Ok(None);
        }
        let scoped = self
            .store
            .find_principal_by_email(StoreKind::CompanyScoped, principal.email())
            .await?;
        Ok(scoped.and_then(|record| record.company_id))
    }

    /// Ids of every principal in either store linked to `company_id`.
    pub async fn company_member_ids(
        &self,
        company_id: CompanyId,
    ) -> Result<BTreeSet<PrincipalId>, StoreError> {
        let mut ids = BTreeSet::new();
        for kind in StoreKind::ALL {
            ids.extend(self.store.principal_ids_in_company(kind, company_id).await?);
        }
        Ok(ids)
    }

    /// Returns true if either store already holds `email`.
    pub async fn email_taken(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.find_by_email(email).await?.is_some())
    }
}

impl std::fmt::Debug for PrincipalDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalDirectory").finish_non_exhaustive()
    }
}
