//! Postgres implementation of the core storage ports.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pharmacare_core::entitlement::{Company, EntitlementMirror, SubscriptionEvent};
use pharmacare_core::payment::{PaymentRecord, PaymentStatus};
use pharmacare_core::ports::{
    CompanyStore, PaymentStore, PrincipalStore, StoreError, SubscriptionLedger,
};
use pharmacare_core::principal::{PrincipalRecord, StoreKind};
use pharmacare_shared::types::{CompanyId, PrincipalId};
use sea_orm::{DatabaseConnection, DbErr, SqlErr};

use crate::repositories::{
    CompanyRepository, PaymentRepository, PrincipalRepository, SubscriptionEventRepository,
};

/// Maps a database error onto the port error.
pub fn store_error(err: DbErr) -> StoreError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        return StoreError::Duplicate(detail);
    }
    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => StoreError::Unavailable(err.to_string()),
        other => StoreError::Query(other.to_string()),
    }
}

/// Every port over one connection pool.
///
/// The server builds two of these, one per database role, and hands them to
/// the services as `StoreHandles`.
#[derive(Debug, Clone)]
pub struct SeaStore {
    principals: PrincipalRepository,
    companies: CompanyRepository,
    events: SubscriptionEventRepository,
    payments: PaymentRepository,
}

impl SeaStore {
    /// Creates a store over `db`.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            principals: PrincipalRepository::new(db.clone()),
            companies: CompanyRepository::new(db.clone()),
            events: SubscriptionEventRepository::new(db.clone()),
            payments: PaymentRepository::new(db),
        }
    }
}

#[async_trait]
impl PrincipalStore for SeaStore {
    async fn find_principal_by_email(
        &self,
        store: StoreKind,
        email: &str,
    ) -> Result<Option<PrincipalRecord>, StoreError> {
        self.principals
            .find_by_email(store, email)
            .await
            .map_err(store_error)
    }

    async fn find_principal_by_id(
        &self,
        store: StoreKind,
        id: PrincipalId,
    ) -> Result<Option<PrincipalRecord>, StoreError> {
        self.principals.find_by_id(store, id).await.map_err(store_error)
    }

    async fn principal_ids_in_company(
        &self,
        store: StoreKind,
        company_id: CompanyId,
    ) -> Result<Vec<PrincipalId>, StoreError> {
        self.principals
            .ids_in_company(store, company_id)
            .await
            .map_err(store_error)
    }

    async fn insert_principal(
        &self,
        store: StoreKind,
        record: &PrincipalRecord,
    ) -> Result<(), StoreError> {
        self.principals.insert(store, record).await.map_err(store_error)
    }

    async fn update_principal(
        &self,
        store: StoreKind,
        record: &PrincipalRecord,
    ) -> Result<bool, StoreError> {
        self.principals
            .update_profile(store, record)
            .await
            .map_err(store_error)
    }

    async fn delete_principal(
        &self,
        store: StoreKind,
        id: PrincipalId,
    ) -> Result<bool, StoreError> {
        self.principals.delete(store, id).await.map_err(store_error)
    }

    async fn set_principal_mirror(
        &self,
        store: StoreKind,
        id: PrincipalId,
        mirror: &EntitlementMirror,
    ) -> Result<bool, StoreError> {
        self.principals
            .set_mirror(store, id, mirror)
            .await
            .map_err(store_error)
    }

    async fn set_company_members_mirror(
        &self,
        store: StoreKind,
        company_id: CompanyId,
        mirror: &EntitlementMirror,
    ) -> Result<u64, StoreError> {
        self.principals
            .set_company_mirror(store, company_id, mirror)
            .await
            .map_err(store_error)
    }
}

#[async_trait]
impl CompanyStore for SeaStore {
    async fn find_company(&self, id: CompanyId) -> Result<Option<Company>, StoreError> {
        self.companies.find_by_id(id).await.map_err(store_error)
    }

    async fn insert_company(&self, company: &Company) -> Result<(), StoreError> {
        self.companies.insert(company).await.map_err(store_error)
    }

    async fn set_company_mirror(
        &self,
        id: CompanyId,
        mirror: &EntitlementMirror,
    ) -> Result<bool, StoreError> {
        self.companies.set_mirror(id, mirror).await.map_err(store_error)
    }
}

#[async_trait]
impl SubscriptionLedger for SeaStore {
    async fn append_event(&self, event: &SubscriptionEvent) -> Result<bool, StoreError> {
        self.events.append(event).await.map_err(store_error)
    }

    async fn find_event_by_tx_ref(
        &self,
        tx_ref: &str,
    ) -> Result<Option<SubscriptionEvent>, StoreError> {
        self.events.find_by_tx_ref(tx_ref).await.map_err(store_error)
    }

    async fn latest_active_company_event(
        &self,
        company_id: CompanyId,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEvent>, StoreError> {
        self.events
            .latest_active_for_company(company_id, now)
            .await
            .map_err(store_error)
    }

    async fn list_events(
        &self,
        principal_id: PrincipalId,
        company_id: Option<CompanyId>,
    ) -> Result<Vec<SubscriptionEvent>, StoreError> {
        self.events
            .list(principal_id, company_id)
            .await
            .map_err(store_error)
    }
}

#[async_trait]
impl PaymentStore for SeaStore {
    async fn insert_payment(&self, record: &PaymentRecord) -> Result<(), StoreError> {
        self.payments.insert(record).await.map_err(store_error)
    }

    async fn find_payment(&self, tx_ref: &str) -> Result<Option<PaymentRecord>, StoreError> {
        self.payments.find_by_tx_ref(tx_ref).await.map_err(store_error)
    }

    async fn complete_payment(
        &self,
        tx_ref: &str,
        status: PaymentStatus,
        gateway_response: &serde_json::Value,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError> {
        self.payments
            .complete(tx_ref, status, gateway_response, paid_at)
            .await
            .map_err(store_error)
    }
}
