//! Entitlement read path.
//!
//! Every caller that needs to know whether a principal is paid up (login,
//! profile, payment verification) goes through [`EntitlementReader::current`].

use std::sync::Arc;

use mockable::Clock;
use pharmacare_shared::types::CompanyId;

use super::types::{Entitlement, EntitlementSource};
use crate::ports::{DataStore, StoreError};
use crate::principal::{Principal, PrincipalDirectory, PrincipalRecord};

/// Resolves a principal's effective entitlement.
#[derive(Clone)]
pub struct EntitlementReader {
    store: Arc<dyn DataStore>,
    directory: PrincipalDirectory,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl EntitlementReader {
    /// Creates a reader over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            directory: PrincipalDirectory::new(Arc::clone(&store)),
            store,
            clock,
        }
    }

    /// Resolves the entitlement for a principal row and its company.
    ///
    /// Order of precedence:
    /// 1. an active company mirror;
    /// 2. the latest active company history event, when the company mirror
    ///    has drifted (history is authoritative);
    /// 3. the principal's own mirror.
    ///
    /// Nothing is written back; a drifted mirror is healed in the answer only.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the company row cannot be read. A failed
    /// history probe is logged and skipped.
    pub async fn current(
        &self,
        principal: &PrincipalRecord,
        company_id: Option<CompanyId>,
    ) -> Result<Entitlement, StoreError> {
        let now = self.clock.utc();

        if let Some(company_id) = company_id {
            if let Some(company) = self.store.find_company(company_id).await? {
                if company.mirror.is_active_at(now) {
                    return Ok(Entitlement::from_mirror(
                        &company.mirror,
                        EntitlementSource::Company,
                        now,
                    ));
                }
            }

            match self.store.latest_active_company_event(company_id, now).await {
                Ok(Some(event)) => {
                    tracing::debug!(
                        company_id = %company_id,
                        tx_ref = %event.tx_ref,
                        "company mirror inactive; using subscription history"
                    );
                    return Ok(Entitlement::from_event(&event));
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        company_id = %company_id,
                        error = %e,
                        "subscription history probe failed"
                    );
                }
            }
        }

        let source = if principal.mirror.plan_id.is_some() || principal.mirror.end_date.is_some() {
            EntitlementSource::Principal
        } else {
            EntitlementSource::None
        };
        Ok(Entitlement::from_mirror(&principal.mirror, source, now))
    }

    /// Resolves the entitlement for a principal, looking its company up first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the company link or company row cannot be read.
    pub async fn for_principal(&self, principal: &Principal) -> Result<Entitlement, StoreError> {
        let company_id = self.directory.company_of(principal).await?;
        self.current(principal.record(), company_id).await
    }
}

impl std::fmt::Debug for EntitlementReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementReader").finish_non_exhaustive()
    }
}
