//! Storage ports.
//!
//! The core never talks to a database directly. Adapters (Postgres in
//! `pharmacare-db`, the in-memory store under `testing`) implement these
//! traits and are handed to services through [`StoreHandles`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pharmacare_shared::AppError;
use pharmacare_shared::types::{CompanyId, PrincipalId};
use thiserror::Error;

use crate::entitlement::{Company, EntitlementMirror, SubscriptionEvent};
use crate::payment::{PaymentRecord, PaymentStatus};
use crate::principal::{PrincipalRecord, StoreKind};

/// Errors raised by store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection could not be established or was lost.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Query or mutation failed.
    #[error("store query failed: {0}")]
    Query(String),

    /// A uniqueness constraint was violated.
    #[error("duplicate record: {0}")]
    Duplicate(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(msg) => Self::Conflict(msg),
            other => Self::Database(other.to_string()),
        }
    }
}

/// Principal persistence, addressed per store.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Finds a principal by normalized email.
    async fn find_principal_by_email(
        &self,
        store: StoreKind,
        email: &str,
    ) -> Result<Option<PrincipalRecord>, StoreError>;

    /// Finds a principal by id.
    async fn find_principal_by_id(
        &self,
        store: StoreKind,
        id: PrincipalId,
    ) -> Result<Option<PrincipalRecord>, StoreError>;

    /// Lists the ids of every principal linked to `company_id`.
    async fn principal_ids_in_company(
        &self,
        store: StoreKind,
        company_id: CompanyId,
    ) -> Result<Vec<PrincipalId>, StoreError>;

    /// Inserts a principal. Fails with [`StoreError::Duplicate`] on an email
    /// or id collision within the store.
    async fn insert_principal(
        &self,
        store: StoreKind,
        record: &PrincipalRecord,
    ) -> Result<(), StoreError>;

    /// Overwrites the profile fields of an existing principal (approval,
    /// password, role, company link). The mirror is left alone.
    ///
    /// Returns false if no such principal exists.
    async fn update_principal(
        &self,
        store: StoreKind,
        record: &PrincipalRecord,
    ) -> Result<bool, StoreError>;

    /// Hard-deletes a principal. Returns false if it did not exist.
    async fn delete_principal(&self, store: StoreKind, id: PrincipalId)
    -> Result<bool, StoreError>;

    /// Sets one principal's mirror. Returns false if it did not exist.
    async fn set_principal_mirror(
        &self,
        store: StoreKind,
        id: PrincipalId,
        mirror: &EntitlementMirror,
    ) -> Result<bool, StoreError>;

    /// Sets the mirror of every principal linked to `company_id`.
    ///
    /// Returns the number of rows touched.
    async fn set_company_members_mirror(
        &self,
        store: StoreKind,
        company_id: CompanyId,
        mirror: &EntitlementMirror,
    ) -> Result<u64, StoreError>;
}

/// Company persistence.
#[async_trait]
pub trait CompanyStore: Send + Sync {
    /// Finds a company by id.
    async fn find_company(&self, id: CompanyId) -> Result<Option<Company>, StoreError>;

    /// Inserts a company.
    async fn insert_company(&self, company: &Company) -> Result<(), StoreError>;

    /// Sets the company mirror. Returns false if it did not exist.
    async fn set_company_mirror(
        &self,
        id: CompanyId,
        mirror: &EntitlementMirror,
    ) -> Result<bool, StoreError>;
}

/// The append-only subscription history.
#[async_trait]
pub trait SubscriptionLedger: Send + Sync {
    /// Appends an event.
    ///
    /// Returns false without writing if an event with the same `tx_ref`
    /// already exists.
    async fn append_event(&self, event: &SubscriptionEvent) -> Result<bool, StoreError>;

    /// Finds the event recorded for a payment.
    async fn find_event_by_tx_ref(
        &self,
        tx_ref: &str,
    ) -> Result<Option<SubscriptionEvent>, StoreError>;

    /// Returns the active company event with the latest end date after `now`.
    async fn latest_active_company_event(
        &self,
        company_id: CompanyId,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEvent>, StoreError>;

    /// Lists events paid by `principal_id` or covering `company_id`, newest
    /// first.
    async fn list_events(
        &self,
        principal_id: PrincipalId,
        company_id: Option<CompanyId>,
    ) -> Result<Vec<SubscriptionEvent>, StoreError>;
}

/// Payment record persistence.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Inserts a pending payment. Fails with [`StoreError::Duplicate`] if the
    /// `tx_ref` is taken.
    async fn insert_payment(&self, record: &PaymentRecord) -> Result<(), StoreError>;

    /// Finds a payment by `tx_ref`.
    async fn find_payment(&self, tx_ref: &str) -> Result<Option<PaymentRecord>, StoreError>;

    /// Moves a payment out of `pending`.
    ///
    /// The write is conditional: it only applies while the stored status is
    /// still `pending`. Returns true for the caller whose write applied and
    /// false for everyone else.
    async fn complete_payment(
        &self,
        tx_ref: &str,
        status: PaymentStatus,
        gateway_response: &serde_json::Value,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError>;
}

/// Everything a service may need from storage.
pub trait DataStore: PrincipalStore + CompanyStore + SubscriptionLedger + PaymentStore {}

impl<T> DataStore for T where T: PrincipalStore + CompanyStore + SubscriptionLedger + PaymentStore {}

/// The two capability levels of store access.
///
/// `standard` is the request-scoped handle used for reads on behalf of an
/// authenticated caller. `elevated` bypasses tenant row policies and is used
/// by login, payment reconciliation, and other cross-tenant writes. Services
/// pick one explicitly at construction.
#[derive(Clone)]
pub struct StoreHandles {
    standard: Arc<dyn DataStore>,
    elevated: Arc<dyn DataStore>,
}

impl StoreHandles {
    /// Creates handles from two distinct stores.
    #[must_use]
    pub fn new(standard: Arc<dyn DataStore>, elevated: Arc<dyn DataStore>) -> Self {
        Self { standard, elevated }
    }

    /// Uses one store for both levels.
    #[must_use]
    pub fn single(store: Arc<dyn DataStore>) -> Self {
        Self {
            standard: Arc::clone(&store),
            elevated: store,
        }
    }

    /// Request-scoped store.
    #[must_use]
    pub fn standard(&self) -> Arc<dyn DataStore> {
        Arc::clone(&self.standard)
    }

    /// Cross-tenant store.
    #[must_use]
    pub fn elevated(&self) -> Arc<dyn DataStore> {
        Arc::clone(&self.elevated)
    }
}

impl std::fmt::Debug for StoreHandles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandles").finish_non_exhaustive()
    }
}
