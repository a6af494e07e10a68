//! In-memory adapters for tests.
//!
//! Enabled for this crate's own tests and, through the `test-support`
//! feature, for the API crate's route tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use pharmacare_shared::types::{CompanyId, PaymentId, PrincipalId, SubscriptionEventId};
use rust_decimal::Decimal;

use crate::auth::{AccountKind, Role};
use crate::entitlement::{Company, EntitlementMirror, SubscriptionEvent, SubscriptionStatus};
use crate::payment::{
    CheckoutRequest, GatewayError, GatewayOutcome, GatewayVerification, PaymentGateway,
    PaymentRecord, PaymentStatus,
};
use crate::ports::{CompanyStore, PaymentStore, PrincipalStore, StoreError, SubscriptionLedger};
use crate::principal::{PrincipalRecord, StoreKind};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Operations an [`InMemoryStore`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// Principal lookups.
    PrincipalReads,
    /// Company lookups.
    CompanyReads,
    /// Subscription history reads.
    HistoryReads,
    /// Every write.
    Writes,
}

#[derive(Debug, Default)]
struct State {
    primary: BTreeMap<PrincipalId, PrincipalRecord>,
    company_scoped: BTreeMap<PrincipalId, PrincipalRecord>,
    companies: BTreeMap<CompanyId, Company>,
    events: Vec<SubscriptionEvent>,
    payments: BTreeMap<String, PaymentRecord>,
}

impl State {
    fn principals(&self, store: StoreKind) -> &BTreeMap<PrincipalId, PrincipalRecord> {
        match store {
            StoreKind::Primary => &self.primary,
            StoreKind::CompanyScoped => &self.company_scoped,
        }
    }

    fn principals_mut(&mut self, store: StoreKind) -> &mut BTreeMap<PrincipalId, PrincipalRecord> {
        match store {
            StoreKind::Primary => &mut self.primary,
            StoreKind::CompanyScoped => &mut self.company_scoped,
        }
    }
}

/// A `DataStore` backed by maps behind a mutex.
///
/// Each trait call takes the lock once, so `complete_payment` and
/// `append_event` are atomic the way the Postgres adapter's conditional
/// writes are.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    failures: Mutex<HashSet<FailPoint>>,
}

impl InMemoryStore {
    /// Makes `point` fail until [`Self::heal`] is called.
    pub fn fail(&self, point: FailPoint) {
        lock(&self.failures).insert(point);
    }

    /// Clears every injected failure.
    pub fn heal(&self) {
        lock(&self.failures).clear();
    }

    fn check(&self, point: FailPoint) -> Result<(), StoreError> {
        if lock(&self.failures).contains(&point) {
            return Err(StoreError::Unavailable(format!("injected {point:?} failure")));
        }
        Ok(())
    }

    /// Inserts or replaces a principal directly.
    pub fn put_principal(&self, store: StoreKind, record: PrincipalRecord) {
        lock(&self.state)
            .principals_mut(store)
            .insert(record.id, record);
    }

    /// Reads a principal directly.
    pub fn principal(&self, store: StoreKind, id: PrincipalId) -> Option<PrincipalRecord> {
        lock(&self.state).principals(store).get(&id).cloned()
    }

    /// Number of principals in a store.
    pub fn principal_count(&self, store: StoreKind) -> usize {
        lock(&self.state).principals(store).len()
    }

    /// Inserts or replaces a company directly.
    pub fn put_company(&self, company: Company) {
        lock(&self.state).companies.insert(company.id, company);
    }

    /// Reads a company directly.
    pub fn company(&self, id: CompanyId) -> Option<Company> {
        lock(&self.state).companies.get(&id).cloned()
    }

    /// Appends a history event directly.
    pub fn put_event(&self, event: SubscriptionEvent) {
        lock(&self.state).events.push(event);
    }

    /// All history events in insertion order.
    pub fn events(&self) -> Vec<SubscriptionEvent> {
        lock(&self.state).events.clone()
    }

    /// Inserts or replaces a payment directly.
    pub fn put_payment(&self, record: PaymentRecord) {
        lock(&self.state)
            .payments
            .insert(record.tx_ref.clone(), record);
    }

    /// Reads a payment directly.
    pub fn payment(&self, tx_ref: &str) -> Option<PaymentRecord> {
        lock(&self.state).payments.get(tx_ref).cloned()
    }

    /// Every payment.
    pub fn payments(&self) -> Vec<PaymentRecord> {
        lock(&self.state).payments.values().cloned().collect()
    }
}

#[async_trait]
impl PrincipalStore for InMemoryStore {
    async fn find_principal_by_email(
        &self,
        store: StoreKind,
        email: &str,
    ) -> Result<Option<PrincipalRecord>, StoreError> {
        self.check(FailPoint::PrincipalReads)?;
        Ok(lock(&self.state)
            .principals(store)
            .values()
            .find(|p| p.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_principal_by_id(
        &self,
        store: StoreKind,
        id: PrincipalId,
    ) -> Result<Option<PrincipalRecord>, StoreError> {
        self.check(FailPoint::PrincipalReads)?;
        Ok(lock(&self.state).principals(store).get(&id).cloned())
    }

    async fn principal_ids_in_company(
        &self,
        store: StoreKind,
        company_id: CompanyId,
    ) -> Result<Vec<PrincipalId>, StoreError> {
        self.check(FailPoint::PrincipalReads)?;
        Ok(lock(&self.state)
            .principals(store)
            .values()
            .filter(|p| p.company_id == Some(company_id))
            .map(|p| p.id)
            .collect())
    }

    async fn insert_principal(
        &self,
        store: StoreKind,
        record: &PrincipalRecord,
    ) -> Result<(), StoreError> {
        self.check(FailPoint::Writes)?;
        let mut state = lock(&self.state);
        let rows = state.principals_mut(store);
        if rows.contains_key(&record.id)
            || rows.values().any(|p| p.email.eq_ignore_ascii_case(&record.email))
        {
            return Err(StoreError::Duplicate(format!(
                "{} principal {}",
                store, record.email
            )));
        }
        rows.insert(record.id, record.clone());
        Ok(())
    }

    async fn update_principal(
        &self,
        store: StoreKind,
        record: &PrincipalRecord,
    ) -> Result<bool, StoreError> {
        self.check(FailPoint::Writes)?;
        let mut state = lock(&self.state);
        let Some(existing) = state.principals_mut(store).get_mut(&record.id) else {
            return Ok(false);
        };
        let mirror = existing.mirror.clone();
        *existing = PrincipalRecord {
            mirror,
            ..record.clone()
        };
        Ok(true)
    }

    async fn delete_principal(
        &self,
        store: StoreKind,
        id: PrincipalId,
    ) -> Result<bool, StoreError> {
        self.check(FailPoint::Writes)?;
        Ok(lock(&self.state).principals_mut(store).remove(&id).is_some())
    }

    async fn set_principal_mirror(
        &self,
        store: StoreKind,
        id: PrincipalId,
        mirror: &EntitlementMirror,
    ) -> Result<bool, StoreError> {
        self.check(FailPoint::Writes)?;
        let mut state = lock(&self.state);
        Ok(match state.principals_mut(store).get_mut(&id) {
            Some(existing) => {
                existing.mirror = mirror.clone();
                true
            }
            None => false,
        })
    }

    async fn set_company_members_mirror(
        &self,
        store: StoreKind,
        company_id: CompanyId,
        mirror: &EntitlementMirror,
    ) -> Result<u64, StoreError> {
        self.check(FailPoint::Writes)?;
        let mut state = lock(&self.state);
        let mut touched = 0;
        for member in state
            .principals_mut(store)
            .values_mut()
            .filter(|p| p.company_id == Some(company_id))
        {
            member.mirror = mirror.clone();
            touched += 1;
        }
        Ok(touched)
    }
}

#[async_trait]
impl CompanyStore for InMemoryStore {
    async fn find_company(&self, id: CompanyId) -> Result<Option<Company>, StoreError> {
        self.check(FailPoint::CompanyReads)?;
        Ok(lock(&self.state).companies.get(&id).cloned())
    }

    async fn insert_company(&self, company: &Company) -> Result<(), StoreError> {
        self.check(FailPoint::Writes)?;
        let mut state = lock(&self.state);
        if state.companies.contains_key(&company.id) {
            return Err(StoreError::Duplicate(format!("company {}", company.id)));
        }
        state.companies.insert(company.id, company.clone());
        Ok(())
    }

    async fn set_company_mirror(
        &self,
        id: CompanyId,
        mirror: &EntitlementMirror,
    ) -> Result<bool, StoreError> {
        self.check(FailPoint::Writes)?;
        let mut state = lock(&self.state);
        Ok(match state.companies.get_mut(&id) {
            Some(company) => {
                company.mirror = mirror.clone();
                true
            }
            None => false,
        })
    }
}

#[async_trait]
impl SubscriptionLedger for InMemoryStore {
    async fn append_event(&self, event: &SubscriptionEvent) -> Result<bool, StoreError> {
        self.check(FailPoint::Writes)?;
        let mut state = lock(&self.state);
        if state.events.iter().any(|e| e.tx_ref == event.tx_ref) {
            return Ok(false);
        }
        state.events.push(event.clone());
        Ok(true)
    }

    async fn find_event_by_tx_ref(
        &self,
        tx_ref: &str,
    ) -> Result<Option<SubscriptionEvent>, StoreError> {
        self.check(FailPoint::HistoryReads)?;
        Ok(lock(&self.state)
            .events
            .iter()
            .find(|e| e.tx_ref == tx_ref)
            .cloned())
    }

    async fn latest_active_company_event(
        &self,
        company_id: CompanyId,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEvent>, StoreError> {
        self.check(FailPoint::HistoryReads)?;
        Ok(lock(&self.state)
            .events
            .iter()
            .filter(|e| e.company_id == Some(company_id) && e.is_active_at(now))
            .max_by_key(|e| e.end_date)
            .cloned())
    }

    async fn list_events(
        &self,
        principal_id: PrincipalId,
        company_id: Option<CompanyId>,
    ) -> Result<Vec<SubscriptionEvent>, StoreError> {
        self.check(FailPoint::HistoryReads)?;
        let mut events: Vec<_> = lock(&self.state)
            .events
            .iter()
            .filter(|e| {
                e.principal_id == principal_id || (company_id.is_some() && e.company_id == company_id)
            })
            .cloned()
            .collect();
        events.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(events)
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn insert_payment(&self, record: &PaymentRecord) -> Result<(), StoreError> {
        self.check(FailPoint::Writes)?;
        let mut state = lock(&self.state);
        if state.payments.contains_key(&record.tx_ref) {
            return Err(StoreError::Duplicate(format!("payment {}", record.tx_ref)));
        }
        state.payments.insert(record.tx_ref.clone(), record.clone());
        Ok(())
    }

    async fn find_payment(&self, tx_ref: &str) -> Result<Option<PaymentRecord>, StoreError> {
        Ok(lock(&self.state).payments.get(tx_ref).cloned())
    }

    async fn complete_payment(
        &self,
        tx_ref: &str,
        status: PaymentStatus,
        gateway_response: &serde_json::Value,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError> {
        self.check(FailPoint::Writes)?;
        let mut state = lock(&self.state);
        match state.payments.get_mut(tx_ref) {
            Some(record) if record.status == PaymentStatus::Pending => {
                record.status = status;
                record.gateway_response = gateway_response.clone();
                record.paid_at = paid_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// What a [`ScriptedGateway`] answers to `verify`.
#[derive(Debug, Clone)]
pub enum VerifyScript {
    /// Report this verification.
    Respond(GatewayVerification),
    /// Fail with a transport error.
    Unreachable,
}

/// A `PaymentGateway` that answers from a script and counts calls.
#[derive(Debug)]
pub struct ScriptedGateway {
    verify: Mutex<VerifyScript>,
    delay: Option<Duration>,
    refuse_checkout: bool,
    verify_calls: AtomicUsize,
    initialize_calls: AtomicUsize,
}

impl ScriptedGateway {
    /// Reports `outcome` without amount details.
    #[must_use]
    pub fn with_outcome(outcome: GatewayOutcome) -> Self {
        Self::with_script(VerifyScript::Respond(GatewayVerification {
            outcome,
            amount: None,
            currency: None,
            raw: serde_json::json!({ "status": format!("{outcome:?}").to_lowercase() }),
        }))
    }

    /// Uses a specific script.
    #[must_use]
    pub fn with_script(script: VerifyScript) -> Self {
        Self {
            verify: Mutex::new(script),
            delay: None,
            refuse_checkout: false,
            verify_calls: AtomicUsize::new(0),
            initialize_calls: AtomicUsize::new(0),
        }
    }

    /// Sleeps for `delay` before answering `verify`.
    #[must_use]
    pub const fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Makes `initialize` fail.
    #[must_use]
    pub const fn refusing_checkout(mut self) -> Self {
        self.refuse_checkout = true;
        self
    }

    /// Replaces the verify script.
    pub fn set_script(&self, script: VerifyScript) {
        *lock(&self.verify) = script;
    }

    /// Number of `verify` calls so far.
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    /// Number of `initialize` calls so far.
    pub fn initialize_calls(&self) -> usize {
        self.initialize_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn initialize(&self, request: &CheckoutRequest) -> Result<String, GatewayError> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        if self.refuse_checkout {
            return Err(GatewayError::Rejected {
                status: 400,
                message: "checkout refused".into(),
            });
        }
        Ok(format!("https://checkout.test/pay/{}", request.tx_ref))
    }

    async fn verify(&self, _tx_ref: &str) -> Result<GatewayVerification, GatewayError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let script = lock(&self.verify).clone();
        match script {
            VerifyScript::Respond(verification) => Ok(verification),
            VerifyScript::Unreachable => Err(GatewayError::Transport("connection refused".into())),
        }
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    /// A clock stopped at `now`.
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Current reading.
    pub fn now(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: chrono::Duration) {
        *lock(&self.0) += by;
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::at(Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).single().unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.now().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.now()
    }
}

/// An approved principal with an inactive mirror and no password.
#[must_use]
pub fn principal_record(email: &str, role: Role, company_id: Option<CompanyId>) -> PrincipalRecord {
    let account_kind = match role {
        Role::CompanyAdmin => AccountKind::Company,
        Role::CompanyUser => AccountKind::CompanyUser,
        _ => AccountKind::Individual,
    };
    PrincipalRecord {
        id: PrincipalId::new(),
        email: email.to_lowercase(),
        full_name: email.split('@').next().unwrap_or_default().to_string(),
        password_hash: String::new(),
        role,
        account_kind,
        approved: true,
        company_id,
        mirror: EntitlementMirror::inactive(),
        created_at: FixedClock::default().now(),
    }
}

/// A company with no admin and an inactive mirror.
#[must_use]
pub fn company(name: &str) -> Company {
    Company {
        id: CompanyId::new(),
        name: name.to_string(),
        admin_principal_id: None,
        mirror: EntitlementMirror::inactive(),
        created_at: FixedClock::default().now(),
    }
}

/// An active history event.
#[must_use]
pub fn subscription_event(
    principal_id: PrincipalId,
    company_id: Option<CompanyId>,
    plan_id: &str,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    tx_ref: &str,
) -> SubscriptionEvent {
    SubscriptionEvent {
        id: SubscriptionEventId::new(),
        principal_id,
        company_id,
        plan_id: plan_id.to_string(),
        status: SubscriptionStatus::Active,
        start_date,
        end_date,
        tx_ref: tx_ref.to_string(),
        created_at: start_date,
    }
}

/// A pending payment.
#[must_use]
pub fn pending_payment(tx_ref: &str, email: &str, plan_id: &str, amount: Decimal) -> PaymentRecord {
    PaymentRecord {
        id: PaymentId::new(),
        tx_ref: tx_ref.to_string(),
        principal_email: email.to_lowercase(),
        plan_id: plan_id.to_string(),
        amount,
        currency: "NGN".to_string(),
        status: PaymentStatus::Pending,
        gateway_response: serde_json::Value::Null,
        paid_at: None,
        created_at: FixedClock::default().now(),
    }
}
