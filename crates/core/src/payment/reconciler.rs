//! Payment reconciliation.
//!
//! A payment record is moved out of `pending` exactly once, by whichever of
//! the webhook or verify-on-demand paths wins the conditional write. Only the
//! winner propagates entitlement.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mockable::Clock;
use pharmacare_shared::billing::CreatePaymentRequest;
use pharmacare_shared::types::{PaymentId, SubscriptionEventId};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::PaymentError;
use super::gateway::{CheckoutRequest, GatewayError, PaymentGateway};
use super::types::{
    Checkout, GatewayOutcome, PaymentRecord, PaymentStatus, VerificationReport, WebhookAck,
};
use crate::entitlement::{
    EntitlementMirror, EntitlementReader, PlanTerms, SubscriptionEvent, SubscriptionStatus,
    find_plan,
};
use crate::ports::{DataStore, StoreError};
use crate::principal::{Principal, PrincipalDirectory, StoreKind, normalize_email};

/// Default upper bound on one gateway verify call.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Prefix of every generated `tx_ref`.
pub const TX_REF_PREFIX: &str = "PC-";

/// Drives payment records through their state machine and propagates
/// entitlement on success.
#[derive(Clone)]
pub struct PaymentReconciler {
    store: Arc<dyn DataStore>,
    directory: PrincipalDirectory,
    entitlement: EntitlementReader,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock + Send + Sync>,
    verify_timeout: Duration,
    default_currency: String,
}

impl PaymentReconciler {
    /// Creates a reconciler. `store` should be the elevated handle: webhook
    /// deliveries carry no caller identity and propagation crosses tenants.
    #[must_use]
    pub fn new(
        store: Arc<dyn DataStore>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            directory: PrincipalDirectory::new(Arc::clone(&store)),
            entitlement: EntitlementReader::new(Arc::clone(&store), Arc::clone(&clock)),
            store,
            gateway,
            clock,
            verify_timeout: DEFAULT_VERIFY_TIMEOUT,
            default_currency: "NGN".to_string(),
        }
    }

    /// Sets the verify timeout.
    #[must_use]
    pub const fn with_verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }

    /// Sets the currency used when a checkout does not name one.
    #[must_use]
    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    /// Starts a checkout: stores a pending record and asks the gateway for a
    /// payment link.
    ///
    /// # Errors
    ///
    /// - `PaymentError::Invalid` for a missing plan, missing email, or an
    ///   amount that is absent for an unknown plan or not positive
    /// - `PaymentError::UnknownPayer` if no principal has the email
    /// - `PaymentError::Gateway` if the gateway refuses the checkout; the
    ///   pending record is kept so a later retry of verify can still find it
    pub async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
    ) -> Result<Checkout, PaymentError> {
        let plan_id = request.plan_id.trim();
        if plan_id.is_empty() {
            return Err(PaymentError::Invalid("plan_id is required".into()));
        }
        let email = normalize_email(&request.email);
        if email.is_empty() {
            return Err(PaymentError::Invalid("email is required".into()));
        }

        let amount = match (request.amount, find_plan(plan_id)) {
            (Some(amount), _) => amount,
            (None, Some(plan)) => plan.list_price,
            (None, None) => {
                return Err(PaymentError::Invalid(format!(
                    "unknown plan {plan_id}; an amount is required"
                )));
            }
        };
        if amount <= Decimal::ZERO {
            return Err(PaymentError::Invalid("amount must be positive".into()));
        }
        let currency = request
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map_or_else(|| self.default_currency.clone(), str::to_ascii_uppercase);

        let payer = self
            .directory
            .find_by_email(&email)
            .await?
            .ok_or_else(|| PaymentError::UnknownPayer(email.clone()))?;

        let record = PaymentRecord {
            id: PaymentId::new(),
            tx_ref: format!("{TX_REF_PREFIX}{}", Uuid::new_v4()),
            principal_email: email,
            plan_id: plan_id.to_string(),
            amount,
            currency,
            status: PaymentStatus::Pending,
            gateway_response: serde_json::Value::Null,
            paid_at: None,
            created_at: self.clock.utc(),
        };
        self.store.insert_payment(&record).await?;

        let payment_url = self
            .gateway
            .initialize(&CheckoutRequest {
                tx_ref: record.tx_ref.clone(),
                amount: record.amount,
                currency: record.currency.clone(),
                customer_email: record.principal_email.clone(),
                customer_name: payer.record().full_name.clone(),
                plan_id: record.plan_id.clone(),
            })
            .await
            .inspect_err(|e| {
                tracing::error!(tx_ref = %record.tx_ref, error = %e, "checkout initialization failed");
            })?;

        tracing::info!(
            tx_ref = %record.tx_ref,
            plan_id = %record.plan_id,
            amount = %record.amount,
            "checkout created"
        );

        Ok(Checkout {
            tx_ref: record.tx_ref,
            payment_url,
            amount: record.amount,
            currency: record.currency,
        })
    }

    /// Applies a gateway callback.
    ///
    /// Deliveries for terminal records, and deliveries whose status is not a
    /// final outcome, are acknowledged without changing the payment. A paid
    /// record missing its subscription event has propagation replayed.
    ///
    /// # Errors
    ///
    /// - `PaymentError::NotFound` if no payment has this `tx_ref`; nothing is
    ///   written
    /// - `PaymentError::Store` if the record cannot be read or written
    pub async fn handle_webhook(
        &self,
        tx_ref: &str,
        status: &str,
        raw: serde_json::Value,
    ) -> Result<WebhookAck, PaymentError> {
        let record = self.load(tx_ref).await?;

        if record.status.is_terminal() {
            tracing::debug!(tx_ref, status = %record.status, "webhook for settled payment ignored");
            self.repair_paid(&record).await;
            return Ok(WebhookAck::Unchanged(record.status));
        }

        let outcome = GatewayOutcome::from_status(status);
        match self.settle(&record, outcome, &raw).await? {
            Some(applied) => Ok(WebhookAck::Applied(applied)),
            None => {
                let current = self.load(tx_ref).await?.status;
                Ok(WebhookAck::Unchanged(current))
            }
        }
    }

    /// Verifies a payment on demand.
    ///
    /// A paid or failed record is reported as-is without calling the
    /// gateway, after replaying propagation for a paid record that has no
    /// subscription event. A pending record is checked with the gateway under the
    /// configured timeout; any gateway failure, a timeout, or a captured
    /// amount that does not match the record leaves it pending.
    ///
    /// # Errors
    ///
    /// - `PaymentError::NotFound` if no payment has this `tx_ref`
    /// - `PaymentError::Store` if the record cannot be read or written
    pub async fn verify(&self, tx_ref: &str) -> Result<VerificationReport, PaymentError> {
        let record = self.load(tx_ref).await?;

        if record.status.is_terminal() {
            self.repair_paid(&record).await;
            return self.report(&record.principal_email, tx_ref, record.status).await;
        }

        let verification =
            match tokio::time::timeout(self.verify_timeout, self.gateway.verify(tx_ref)).await {
                Ok(Ok(verification)) => verification,
                Ok(Err(e)) => {
                    tracing::warn!(tx_ref, error = %e, "gateway verify failed; payment left pending");
                    return self.report(&record.principal_email, tx_ref, record.status).await;
                }
                Err(_) => {
                    tracing::warn!(
                        tx_ref,
                        error = %GatewayError::Timeout,
                        timeout_ms = u64::try_from(self.verify_timeout.as_millis()).unwrap_or(u64::MAX),
                        "gateway verify timed out; payment left pending"
                    );
                    return self.report(&record.principal_email, tx_ref, record.status).await;
                }
            };

        if verification.outcome == GatewayOutcome::Success && !amount_matches(&record, &verification)
        {
            tracing::warn!(
                tx_ref,
                expected_amount = %record.amount,
                expected_currency = %record.currency,
                captured_amount = ?verification.amount,
                captured_currency = ?verification.currency,
                "gateway amount mismatch; payment left pending"
            );
            return self.report(&record.principal_email, tx_ref, record.status).await;
        }

        let status = match self
            .settle(&record, verification.outcome, &verification.raw)
            .await?
        {
            Some(applied) => applied,
            None => self.load(tx_ref).await?.status,
        };
        self.report(&record.principal_email, tx_ref, status).await
    }

    /// Performs the conditional pending → terminal write and, for the winner
    /// of a successful transition, propagates entitlement.
    ///
    /// Returns the new status if this call applied the transition.
    async fn settle(
        &self,
        record: &PaymentRecord,
        outcome: GatewayOutcome,
        raw: &serde_json::Value,
    ) -> Result<Option<PaymentStatus>, PaymentError> {
        let Some(next) = record.status.transition(outcome) else {
            return Ok(None);
        };

        let now = self.clock.utc();
        let paid_at = (next == PaymentStatus::Paid).then_some(now);
        let won = self
            .store
            .complete_payment(&record.tx_ref, next, raw, paid_at)
            .await?;
        if !won {
            tracing::debug!(tx_ref = %record.tx_ref, "payment already settled by a concurrent delivery");
            return Ok(None);
        }

        tracing::info!(tx_ref = %record.tx_ref, status = %next, "payment settled");

        if next == PaymentStatus::Paid {
            // Paid is final even if propagation fails; the event's tx_ref
            // makes a later replay safe.
            if let Err(e) = self.propagate(record, now).await {
                tracing::error!(
                    tx_ref = %record.tx_ref,
                    email = %record.principal_email,
                    error = %e,
                    "entitlement propagation failed after payment was marked paid"
                );
            }
        }

        Ok(Some(next))
    }

    /// Replays propagation for a paid record that has no subscription event.
    ///
    /// Failures are logged; the next delivery or verify retries.
    async fn repair_paid(&self, record: &PaymentRecord) {
        if record.status != PaymentStatus::Paid {
            return;
        }
        match self.store.find_event_by_tx_ref(&record.tx_ref).await {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(e) => {
                tracing::error!(tx_ref = %record.tx_ref, error = %e, "subscription event lookup failed");
                return;
            }
        }

        tracing::warn!(tx_ref = %record.tx_ref, "paid payment has no subscription event; replaying propagation");
        let paid_at = record.paid_at.unwrap_or_else(|| self.clock.utc());
        if let Err(e) = self.propagate(record, paid_at).await {
            tracing::error!(
                tx_ref = %record.tx_ref,
                email = %record.principal_email,
                error = %e,
                "entitlement propagation replay failed"
            );
        }
    }

    /// Records the subscription event for a paid record and updates mirrors.
    ///
    /// Company-typed payments (company plan, or a company admin payer) by a
    /// payer with a company set the company mirror and every member's mirror
    /// in both stores. Everything else updates the payer only.
    ///
    /// Safe to call again for the same record: the event is keyed by
    /// `tx_ref`, and a replay reuses the recorded term.
    pub async fn propagate(
        &self,
        record: &PaymentRecord,
        paid_at: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEvent>, PaymentError> {
        let Some(payer) = self.directory.find_by_email(&record.principal_email).await? else {
            tracing::error!(
                tx_ref = %record.tx_ref,
                email = %record.principal_email,
                "payer not found for paid payment; no entitlement granted"
            );
            return Ok(None);
        };

        let terms = PlanTerms::classify(&record.plan_id);
        let company_id = self.directory.company_of(&payer).await?;
        let company_target = if terms.is_company() || payer.role().is_company_admin() {
            company_id
        } else {
            None
        };

        let candidate = SubscriptionEvent {
            id: SubscriptionEventId::new(),
            principal_id: payer.id(),
            company_id: company_target,
            plan_id: record.plan_id.clone(),
            status: SubscriptionStatus::Active,
            start_date: paid_at,
            end_date: terms.term_end(paid_at),
            tx_ref: record.tx_ref.clone(),
            created_at: self.clock.utc(),
        };
        let event = if self.store.append_event(&candidate).await? {
            candidate
        } else {
            self.store
                .find_event_by_tx_ref(&record.tx_ref)
                .await?
                .unwrap_or(candidate)
        };

        let mirror = EntitlementMirror::active(&event.plan_id, event.end_date);
        match company_target {
            Some(company_id) => {
                if !self.store.set_company_mirror(company_id, &mirror).await? {
                    tracing::warn!(company_id = %company_id, "company row missing; only members updated");
                }
                let mut touched = 0;
                for kind in StoreKind::ALL {
                    touched += self
                        .store
                        .set_company_members_mirror(kind, company_id, &mirror)
                        .await?;
                }
                tracing::info!(
                    tx_ref = %record.tx_ref,
                    company_id = %company_id,
                    members = touched,
                    end_date = %event.end_date,
                    "company entitlement propagated"
                );
            }
            None => {
                self.set_own_mirror(&payer, &mirror).await?;
                tracing::info!(
                    tx_ref = %record.tx_ref,
                    principal_id = %payer.id(),
                    end_date = %event.end_date,
                    "individual entitlement propagated"
                );
            }
        }

        Ok(Some(event))
    }

    /// Updates the payer's mirror in every store that holds its id.
    async fn set_own_mirror(
        &self,
        payer: &Principal,
        mirror: &EntitlementMirror,
    ) -> Result<(), StoreError> {
        for kind in StoreKind::ALL {
            self.store.set_principal_mirror(kind, payer.id(), mirror).await?;
        }
        Ok(())
    }

    async fn load(&self, tx_ref: &str) -> Result<PaymentRecord, PaymentError> {
        self.store
            .find_payment(tx_ref)
            .await?
            .ok_or_else(|| PaymentError::NotFound(tx_ref.to_string()))
    }

    async fn report(
        &self,
        email: &str,
        tx_ref: &str,
        status: PaymentStatus,
    ) -> Result<VerificationReport, PaymentError> {
        let entitlement = if status == PaymentStatus::Paid {
            match self.directory.find_by_email(email).await? {
                Some(payer) => Some(self.entitlement.for_principal(&payer).await?),
                None => None,
            }
        } else {
            None
        };

        Ok(VerificationReport {
            tx_ref: tx_ref.to_string(),
            status,
            entitlement,
        })
    }
}

impl std::fmt::Debug for PaymentReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentReconciler")
            .field("verify_timeout", &self.verify_timeout)
            .field("default_currency", &self.default_currency)
            .finish_non_exhaustive()
    }
}

/// Returns true if what the gateway captured agrees with the record.
///
/// Fields the gateway does not report are not checked.
fn amount_matches(
    record: &PaymentRecord,
    verification: &super::gateway::GatewayVerification,
) -> bool {
    let amount_ok = verification.amount.is_none_or(|amount| amount == record.amount);
    let currency_ok = verification
        .currency
        .as_deref()
        .is_none_or(|currency| currency.eq_ignore_ascii_case(&record.currency));
    amount_ok && currency_ok
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
