//! Tests for `PaymentReconciler`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as TermLength;
use pharmacare_shared::billing::CreatePaymentRequest;
use pharmacare_shared::types::CompanyId;
use rust_decimal_macros::dec;
use serde_json::json;

use super::*;
use crate::auth::Role;
use crate::entitlement::EntitlementSource;
use crate::payment::GatewayVerification;
use crate::principal::PrincipalRecord;
use crate::testing::{
    FailPoint, FixedClock, InMemoryStore, ScriptedGateway, VerifyScript, company,
    pending_payment, principal_record,
};

struct Harness {
    store: Arc<InMemoryStore>,
    gateway: Arc<ScriptedGateway>,
    clock: Arc<FixedClock>,
    reconciler: PaymentReconciler,
}

fn harness(gateway: ScriptedGateway) -> Harness {
    let store = Arc::new(InMemoryStore::default());
    let gateway = Arc::new(gateway);
    let clock = Arc::new(FixedClock::default());
    let reconciler = PaymentReconciler::new(store.clone(), gateway.clone(), clock.clone())
        .with_verify_timeout(Duration::from_millis(100));
    Harness {
        store,
        gateway,
        clock,
        reconciler,
    }
}

fn succeeding() -> Harness {
    harness(ScriptedGateway::with_outcome(GatewayOutcome::Success))
}

/// An individual payer with a pending `individual_monthly` payment.
fn individual_setup(h: &Harness, tx_ref: &str) -> PrincipalRecord {
    let payer = principal_record("pharm@solo.test", Role::Pharmacist, None);
    h.store.put_principal(StoreKind::Primary, payer.clone());
    h.store.put_payment(pending_payment(
        tx_ref,
        &payer.email,
        "individual_monthly",
        dec!(5000),
    ));
    payer
}

struct CompanySetup {
    company_id: CompanyId,
    admin: PrincipalRecord,
    primary_member: PrincipalRecord,
    scoped_member: PrincipalRecord,
    outsider: PrincipalRecord,
}

fn company_setup(h: &Harness, tx_ref: &str, plan_id: &str) -> CompanySetup {
    let acme = company("Acme Pharmacy");
    h.store.put_company(acme.clone());
    let admin = principal_record("admin@acme.test", Role::CompanyAdmin, Some(acme.id));
    let primary_member = principal_record("doc@acme.test", Role::Doctor, Some(acme.id));
    let scoped_member = principal_record("tech@acme.test", Role::CompanyUser, Some(acme.id));
    let outsider = principal_record("solo@else.test", Role::Nurse, None);
    h.store.put_principal(StoreKind::Primary, admin.clone());
    h.store.put_principal(StoreKind::Primary, primary_member.clone());
    h.store.put_principal(StoreKind::CompanyScoped, scoped_member.clone());
    h.store.put_principal(StoreKind::Primary, outsider.clone());
    h.store.put_payment(pending_payment(tx_ref, &admin.email, plan_id, dec!(20000)));
    CompanySetup {
        company_id: acme.id,
        admin,
        primary_member,
        scoped_member,
        outsider,
    }
}

// ============================================================================
// Webhook path
// ============================================================================

#[tokio::test]
async fn test_webhook_success_marks_paid_and_grants_thirty_days() {
    let h = succeeding();
    let payer = individual_setup(&h, "PC-1");

    let ack = h
        .reconciler
        .handle_webhook("PC-1", "successful", json!({"status": "successful"}))
        .await
        .unwrap();

    assert_eq!(ack, WebhookAck::Applied(PaymentStatus::Paid));
    let payment = h.store.payment("PC-1").unwrap();
    assert_eq!(payment.status, PaymentStatus::Paid);
    assert_eq!(payment.paid_at, Some(h.clock.now()));
    assert_eq!(payment.gateway_response, json!({"status": "successful"}));

    let stored = h.store.principal(StoreKind::Primary, payer.id).unwrap();
    assert_eq!(stored.mirror.status, SubscriptionStatus::Active);
    assert_eq!(stored.mirror.plan_id.as_deref(), Some("individual_monthly"));
    assert_eq!(stored.mirror.end_date, Some(h.clock.now() + TermLength::days(30)));

    let events = h.store.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].tx_ref, "PC-1");
    assert_eq!(events[0].principal_id, payer.id);
    assert_eq!(events[0].company_id, None);
}

#[tokio::test]
async fn test_individual_payment_leaves_company_untouched() {
    let h = succeeding();
    let setup = company_setup(&h, "PC-co", "company_monthly");
    let member = &setup.primary_member;
    h.store.put_payment(pending_payment(
        "PC-own",
        &member.email,
        "individual_monthly",
        dec!(5000),
    ));

    h.reconciler
        .handle_webhook("PC-own", "successful", json!({}))
        .await
        .unwrap();

    let acme = h.store.company(setup.company_id).unwrap();
    assert_eq!(acme.mirror.status, SubscriptionStatus::Inactive);
    let admin = h.store.principal(StoreKind::Primary, setup.admin.id).unwrap();
    assert_eq!(admin.mirror.status, SubscriptionStatus::Inactive);
    let stored = h.store.principal(StoreKind::Primary, member.id).unwrap();
    assert_eq!(stored.mirror.status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn test_double_webhook_yields_one_event() {
    let h = succeeding();
    individual_setup(&h, "PC-dup");

    let first = h
        .reconciler
        .handle_webhook("PC-dup", "successful", json!({"n": 1}))
        .await
        .unwrap();
    let second = h
        .reconciler
        .handle_webhook("PC-dup", "successful", json!({"n": 2}))
        .await
        .unwrap();

    assert_eq!(first, WebhookAck::Applied(PaymentStatus::Paid));
    assert_eq!(second, WebhookAck::Unchanged(PaymentStatus::Paid));
    assert_eq!(h.store.events().len(), 1);
    // The first payload is kept.
    assert_eq!(h.store.payment("PC-dup").unwrap().gateway_response, json!({"n": 1}));
}

#[tokio::test]
async fn test_webhook_failure_marks_failed_without_entitlement() {
    let h = succeeding();
    let payer = individual_setup(&h, "PC-f");

    let ack = h
        .reconciler
        .handle_webhook("PC-f", "cancelled", json!({}))
        .await
        .unwrap();

    assert_eq!(ack, WebhookAck::Applied(PaymentStatus::Failed));
    let payment = h.store.payment("PC-f").unwrap();
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert!(payment.paid_at.is_none());
    assert!(h.store.events().is_empty());
    let stored = h.store.principal(StoreKind::Primary, payer.id).unwrap();
    assert_eq!(stored.mirror.status, SubscriptionStatus::Inactive);

    // Terminal: a late success does nothing.
    let late = h
        .reconciler
        .handle_webhook("PC-f", "successful", json!({}))
        .await
        .unwrap();
    assert_eq!(late, WebhookAck::Unchanged(PaymentStatus::Failed));
    assert!(h.store.events().is_empty());
}

#[tokio::test]
async fn test_webhook_in_flight_status_is_acknowledged_without_change() {
    let h = succeeding();
    individual_setup(&h, "PC-p");

    let ack = h
        .reconciler
        .handle_webhook("PC-p", "pending", json!({}))
        .await
        .unwrap();

    assert_eq!(ack, WebhookAck::Unchanged(PaymentStatus::Pending));
    assert_eq!(h.store.payment("PC-p").unwrap().status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_unknown_tx_ref_is_not_found_and_mutates_nothing() {
    let h = succeeding();
    let payer = individual_setup(&h, "PC-known");
    let before = h.store.payments();

    let result = h
        .reconciler
        .handle_webhook("zzz", "successful", json!({}))
        .await;

    assert!(matches!(result, Err(PaymentError::NotFound(ref t)) if t == "zzz"));
    assert_eq!(h.store.payments(), before);
    assert!(h.store.events().is_empty());
    let stored = h.store.principal(StoreKind::Primary, payer.id).unwrap();
    assert_eq!(stored.mirror.status, SubscriptionStatus::Inactive);
}

// ============================================================================
// Company cascade
// ============================================================================

#[tokio::test]
async fn test_company_payment_cascades_to_every_member_in_both_stores() {
    let h = succeeding();
    let setup = company_setup(&h, "PC-co", "company_monthly");

    h.reconciler
        .handle_webhook("PC-co", "successful", json!({}))
        .await
        .unwrap();

    let end = Some(h.clock.now() + TermLength::days(30));
    let acme = h.store.company(setup.company_id).unwrap();
    assert_eq!(acme.mirror.status, SubscriptionStatus::Active);
    assert_eq!(acme.mirror.end_date, end);

    for (store, member) in [
        (StoreKind::Primary, &setup.admin),
        (StoreKind::Primary, &setup.primary_member),
        (StoreKind::CompanyScoped, &setup.scoped_member),
    ] {
        let stored = h.store.principal(store, member.id).unwrap();
        assert_eq!(stored.mirror.status, SubscriptionStatus::Active, "{}", member.email);
        assert_eq!(stored.mirror.plan_id.as_deref(), Some("company_monthly"));
        assert_eq!(stored.mirror.end_date, end);
    }
    let outsider = h.store.principal(StoreKind::Primary, setup.outsider.id).unwrap();
    assert_eq!(outsider.mirror.status, SubscriptionStatus::Inactive);

    let events = h.store.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].company_id, Some(setup.company_id));
}

#[tokio::test]
async fn test_company_admin_paying_individual_plan_is_company_typed() {
    let h = succeeding();
    let setup = company_setup(&h, "PC-adm", "individual_yearly");

    h.reconciler
        .handle_webhook("PC-adm", "successful", json!({}))
        .await
        .unwrap();

    let acme = h.store.company(setup.company_id).unwrap();
    assert_eq!(acme.mirror.status, SubscriptionStatus::Active);
    assert_eq!(acme.mirror.end_date, Some(h.clock.now() + TermLength::days(365)));
    let scoped = h
        .store
        .principal(StoreKind::CompanyScoped, setup.scoped_member.id)
        .unwrap();
    assert_eq!(scoped.mirror.status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn test_company_plan_without_company_updates_payer_only() {
    let h = succeeding();
    let payer = principal_record("owner@new.test", Role::Pharmacist, None);
    h.store.put_principal(StoreKind::Primary, payer.clone());
    h.store.put_payment(pending_payment("PC-nc", &payer.email, "company_yearly", dec!(200000)));

    h.reconciler
        .handle_webhook("PC-nc", "successful", json!({}))
        .await
        .unwrap();

    let stored = h.store.principal(StoreKind::Primary, payer.id).unwrap();
    assert_eq!(stored.mirror.status, SubscriptionStatus::Active);
    assert_eq!(h.store.events()[0].company_id, None);
}

#[tokio::test]
async fn test_unknown_plan_grants_fallback_term() {
    let h = succeeding();
    let payer = principal_record("x@solo.test", Role::Nurse, None);
    h.store.put_principal(StoreKind::Primary, payer.clone());
    h.store.put_payment(pending_payment("PC-zzz", &payer.email, "zzz", dec!(1)));

    h.reconciler
        .handle_webhook("PC-zzz", "successful", json!({}))
        .await
        .unwrap();

    let stored = h.store.principal(StoreKind::Primary, payer.id).unwrap();
    assert_eq!(stored.mirror.end_date, Some(h.clock.now() + TermLength::days(30)));
}

#[tokio::test]
async fn test_propagation_failure_keeps_payment_paid() {
    let h = succeeding();
    let payer = individual_setup(&h, "PC-pf");
    h.store.fail(FailPoint::PrincipalReads);

    let ack = h
        .reconciler
        .handle_webhook("PC-pf", "successful", json!({}))
        .await
        .unwrap();

    assert_eq!(ack, WebhookAck::Applied(PaymentStatus::Paid));
    assert_eq!(h.store.payment("PC-pf").unwrap().status, PaymentStatus::Paid);
    assert!(h.store.events().is_empty());

    // Replaying propagation once the store recovers fills the gap exactly once.
    h.store.heal();
    let record = h.store.payment("PC-pf").unwrap();
    let paid_at = record.paid_at.unwrap();
    h.reconciler.propagate(&record, paid_at).await.unwrap();
    h.reconciler.propagate(&record, paid_at).await.unwrap();
    assert_eq!(h.store.events().len(), 1);
    let stored = h.store.principal(StoreKind::Primary, payer.id).unwrap();
    assert_eq!(stored.mirror.status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn test_redelivery_repairs_paid_payment_without_event() {
    let h = succeeding();
    let payer = individual_setup(&h, "PC-gap");
    h.store.fail(FailPoint::PrincipalReads);
    h.reconciler
        .handle_webhook("PC-gap", "successful", json!({}))
        .await
        .unwrap();
    assert!(h.store.events().is_empty());
    let paid_at = h.store.payment("PC-gap").unwrap().paid_at.unwrap();

    h.store.heal();
    h.clock.advance(TermLength::hours(2));
    let ack = h
        .reconciler
        .handle_webhook("PC-gap", "successful", json!({}))
        .await
        .unwrap();

    assert_eq!(ack, WebhookAck::Unchanged(PaymentStatus::Paid));
    let events = h.store.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].start_date, paid_at);
    assert_eq!(events[0].end_date, paid_at + TermLength::days(30));
    let stored = h.store.principal(StoreKind::Primary, payer.id).unwrap();
    assert_eq!(stored.mirror.status, SubscriptionStatus::Active);

    h.reconciler
        .handle_webhook("PC-gap", "successful", json!({}))
        .await
        .unwrap();
    assert_eq!(h.store.events().len(), 1);
}

#[tokio::test]
async fn test_verify_repairs_paid_payment_without_event() {
    let h = succeeding();
    let payer = individual_setup(&h, "PC-gap-v");
    h.store.fail(FailPoint::PrincipalReads);
    h.reconciler
        .handle_webhook("PC-gap-v", "successful", json!({}))
        .await
        .unwrap();
    h.store.heal();

    let report = h.reconciler.verify("PC-gap-v").await.unwrap();

    assert_eq!(report.status, PaymentStatus::Paid);
    assert_eq!(
        report.to_response().subscription_end_date,
        Some(h.clock.now() + TermLength::days(30))
    );
    assert_eq!(h.gateway.verify_calls(), 0);
    assert_eq!(h.store.events().len(), 1);
    let stored = h.store.principal(StoreKind::Primary, payer.id).unwrap();
    assert_eq!(stored.mirror.status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn test_paid_payment_with_unknown_payer_stays_without_event_until_payer_exists() {
    let h = succeeding();
    h.store.put_payment(pending_payment(
        "PC-ghost",
        "ghost@nowhere.test",
        "individual_monthly",
        dec!(5000),
    ));

    h.reconciler
        .handle_webhook("PC-ghost", "successful", json!({}))
        .await
        .unwrap();
    assert_eq!(h.store.payment("PC-ghost").unwrap().status, PaymentStatus::Paid);
    assert!(h.store.events().is_empty());

    let payer = principal_record("ghost@nowhere.test", Role::Pharmacist, None);
    h.store.put_principal(StoreKind::Primary, payer.clone());
    h.reconciler.verify("PC-ghost").await.unwrap();

    assert_eq!(h.store.events().len(), 1);
    assert_eq!(h.store.events()[0].principal_id, payer.id);
}

// ============================================================================
// Verify-on-demand
// ============================================================================

#[tokio::test]
async fn test_verify_pending_success_settles_and_reports_end_date() {
    let h = succeeding();
    individual_setup(&h, "PC-v");

    let report = h.reconciler.verify("PC-v").await.unwrap();

    assert_eq!(report.status, PaymentStatus::Paid);
    let entitlement = report.entitlement.clone().unwrap();
    assert_eq!(entitlement.source, EntitlementSource::Principal);
    let response = report.to_response();
    assert!(response.is_paid);
    assert_eq!(
        response.subscription_end_date,
        Some(h.clock.now() + TermLength::days(30))
    );
    assert_eq!(h.gateway.verify_calls(), 1);
    assert_eq!(h.store.events().len(), 1);
}

#[tokio::test]
async fn test_verify_already_paid_skips_gateway() {
    let h = succeeding();
    individual_setup(&h, "PC-paid");
    h.reconciler
        .handle_webhook("PC-paid", "successful", json!({}))
        .await
        .unwrap();

    let report = h.reconciler.verify("PC-paid").await.unwrap();

    assert_eq!(report.status, PaymentStatus::Paid);
    assert_eq!(h.gateway.verify_calls(), 0);
    assert_eq!(h.store.events().len(), 1);
}

#[tokio::test]
async fn test_verify_confirmed_failure_marks_failed() {
    let h = harness(ScriptedGateway::with_outcome(GatewayOutcome::Failure));
    individual_setup(&h, "PC-vf");

    let report = h.reconciler.verify("PC-vf").await.unwrap();

    assert_eq!(report.status, PaymentStatus::Failed);
    assert!(report.entitlement.is_none());
    assert!(h.store.events().is_empty());
}

#[tokio::test]
async fn test_verify_gateway_error_returns_pending() {
    let h = harness(ScriptedGateway::with_script(VerifyScript::Unreachable));
    individual_setup(&h, "PC-ge");

    let report = h.reconciler.verify("PC-ge").await.unwrap();

    assert_eq!(report.status, PaymentStatus::Pending);
    assert_eq!(h.store.payment("PC-ge").unwrap().status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_verify_timeout_leaves_record_pending() {
    let h = harness(
        ScriptedGateway::with_outcome(GatewayOutcome::Success).delayed(Duration::from_secs(30)),
    );
    individual_setup(&h, "PC-slow");

    let report = h.reconciler.verify("PC-slow").await.unwrap();

    assert_eq!(report.status, PaymentStatus::Pending);
    assert_eq!(h.gateway.verify_calls(), 1);
    assert_eq!(h.store.payment("PC-slow").unwrap().status, PaymentStatus::Pending);
    assert!(h.store.events().is_empty());
}

#[tokio::test]
async fn test_verify_amount_mismatch_leaves_record_pending() {
    let h = harness(ScriptedGateway::with_script(VerifyScript::Respond(
        GatewayVerification {
            outcome: GatewayOutcome::Success,
            amount: Some(dec!(100)),
            currency: Some("NGN".into()),
            raw: json!({}),
        },
    )));
    individual_setup(&h, "PC-short");

    let report = h.reconciler.verify("PC-short").await.unwrap();

    assert_eq!(report.status, PaymentStatus::Pending);
    assert!(h.store.events().is_empty());
}

#[tokio::test]
async fn test_verify_matching_amount_is_accepted() {
    let h = harness(ScriptedGateway::with_script(VerifyScript::Respond(
        GatewayVerification {
            outcome: GatewayOutcome::Success,
            amount: Some(dec!(5000.00)),
            currency: Some("ngn".into()),
            raw: json!({}),
        },
    )));
    individual_setup(&h, "PC-exact");

    let report = h.reconciler.verify("PC-exact").await.unwrap();

    assert_eq!(report.status, PaymentStatus::Paid);
}

#[tokio::test]
async fn test_verify_unknown_tx_ref() {
    let h = succeeding();

    let result = h.reconciler.verify("zzz").await;

    assert!(matches!(result, Err(PaymentError::NotFound(_))));
    assert_eq!(h.gateway.verify_calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_webhook_and_verify_transition_once() {
    for round in 0..20 {
        let h = succeeding();
        let tx_ref = format!("PC-race-{round}");
        individual_setup(&h, &tx_ref);

        let webhook = tokio::spawn({
            let reconciler = h.reconciler.clone();
            let tx_ref = tx_ref.clone();
            async move {
                reconciler
                    .handle_webhook(&tx_ref, "successful", json!({"via": "webhook"}))
                    .await
            }
        });
        let verify = tokio::spawn({
            let reconciler = h.reconciler.clone();
            let tx_ref = tx_ref.clone();
            async move { reconciler.verify(&tx_ref).await }
        });

        let webhook = webhook.await.unwrap().unwrap();
        let verify = verify.await.unwrap().unwrap();
        assert_eq!(webhook.status(), PaymentStatus::Paid);
        assert_eq!(verify.status, PaymentStatus::Paid);
        assert_eq!(h.store.events().len(), 1, "round {round}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_webhook_deliveries_apply_once() {
    let h = succeeding();
    individual_setup(&h, "PC-storm");
    let reconciler = Arc::new(h.reconciler.clone());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let reconciler = Arc::clone(&reconciler);
            tokio::spawn(async move {
                reconciler
                    .handle_webhook("PC-storm", "successful", json!({}))
                    .await
            })
        })
        .collect();

    let mut applied = 0;
    for task in tasks {
        if let WebhookAck::Applied(_) = task.await.unwrap().unwrap() {
            applied += 1;
        }
    }

    assert_eq!(applied, 1);
    assert_eq!(h.store.events().len(), 1);
}

// ============================================================================
// Checkout
// ============================================================================

fn checkout_request(plan_id: &str, email: &str) -> CreatePaymentRequest {
    CreatePaymentRequest {
        plan_id: plan_id.to_string(),
        email: email.to_string(),
        amount: None,
        currency: None,
    }
}

#[tokio::test]
async fn test_create_payment_uses_list_price() {
    let h = succeeding();
    let payer = principal_record("buyer@solo.test", Role::Pharmacist, None);
    h.store.put_principal(StoreKind::Primary, payer);

    let checkout = h
        .reconciler
        .create_payment(&checkout_request("individual_yearly", " Buyer@Solo.test "))
        .await
        .unwrap();

    assert!(checkout.tx_ref.starts_with(TX_REF_PREFIX));
    assert_eq!(
        checkout.payment_url,
        format!("https://checkout.test/pay/{}", checkout.tx_ref)
    );
    assert_eq!(checkout.amount, dec!(50000));
    assert_eq!(checkout.currency, "NGN");

    let stored = h.store.payment(&checkout.tx_ref).unwrap();
    assert_eq!(stored.status, PaymentStatus::Pending);
    assert_eq!(stored.principal_email, "buyer@solo.test");
    assert_eq!(h.gateway.initialize_calls(), 1);
}

#[tokio::test]
async fn test_create_payment_generates_distinct_tx_refs() {
    let h = succeeding();
    h.store.put_principal(
        StoreKind::Primary,
        principal_record("buyer@solo.test", Role::Pharmacist, None),
    );
    let request = checkout_request("individual_monthly", "buyer@solo.test");

    let a = h.reconciler.create_payment(&request).await.unwrap();
    let b = h.reconciler.create_payment(&request).await.unwrap();

    assert_ne!(a.tx_ref, b.tx_ref);
}

#[tokio::test]
async fn test_create_payment_with_override_amount_and_currency() {
    let h = succeeding();
    h.store.put_principal(
        StoreKind::Primary,
        principal_record("buyer@solo.test", Role::Pharmacist, None),
    );
    let mut request = checkout_request("custom_quarterly", "buyer@solo.test");
    request.amount = Some(dec!(12500.50));
    request.currency = Some("usd".into());

    let checkout = h.reconciler.create_payment(&request).await.unwrap();

    assert_eq!(checkout.amount, dec!(12500.50));
    assert_eq!(checkout.currency, "USD");
}

#[tokio::test]
async fn test_create_payment_rejections() {
    let h = succeeding();
    h.store.put_principal(
        StoreKind::Primary,
        principal_record("buyer@solo.test", Role::Pharmacist, None),
    );

    let unknown_plan = h
        .reconciler
        .create_payment(&checkout_request("zzz", "buyer@solo.test"))
        .await;
    assert!(matches!(unknown_plan, Err(PaymentError::Invalid(_))));

    let mut negative = checkout_request("individual_monthly", "buyer@solo.test");
    negative.amount = Some(dec!(-1));
    assert!(matches!(
        h.reconciler.create_payment(&negative).await,
        Err(PaymentError::Invalid(_))
    ));

    let stranger = h
        .reconciler
        .create_payment(&checkout_request("individual_monthly", "who@else.test"))
        .await;
    assert!(matches!(stranger, Err(PaymentError::UnknownPayer(_))));

    assert!(h.store.payments().is_empty());
    assert_eq!(h.gateway.initialize_calls(), 0);
}

#[tokio::test]
async fn test_create_payment_gateway_refusal_surfaces() {
    let h = harness(ScriptedGateway::with_outcome(GatewayOutcome::Success).refusing_checkout());
    h.store.put_principal(
        StoreKind::Primary,
        principal_record("buyer@solo.test", Role::Pharmacist, None),
    );

    let result = h
        .reconciler
        .create_payment(&checkout_request("individual_monthly", "buyer@solo.test"))
        .await;

    assert!(matches!(result, Err(PaymentError::Gateway(_))));
}

#[tokio::test]
async fn test_create_payment_sends_payer_details_to_gateway() {
    use crate::payment::gateway::MockPaymentGateway;

    let store = Arc::new(InMemoryStore::default());
    let mut payer = principal_record("buyer@solo.test", Role::Pharmacist, None);
    payer.full_name = "Bola Buyer".into();
    store.put_principal(StoreKind::Primary, payer);

    let mut gateway = MockPaymentGateway::new();
    gateway
        .expect_initialize()
        .withf(|req| {
            req.customer_email == "buyer@solo.test"
                && req.customer_name == "Bola Buyer"
                && req.plan_id == "company_monthly"
                && req.amount == dec!(20000)
                && req.currency == "GHS"
                && req.tx_ref.starts_with(TX_REF_PREFIX)
        })
        .times(1)
        .returning(|req| Ok(format!("https://gateway.test/{}", req.tx_ref)));
    gateway.expect_verify().never();

    let reconciler = PaymentReconciler::new(
        store.clone(),
        Arc::new(gateway),
        Arc::new(FixedClock::default()),
    )
    .with_default_currency("GHS");

    let checkout = reconciler
        .create_payment(&checkout_request("company_monthly", "buyer@solo.test"))
        .await
        .unwrap();

    assert_eq!(checkout.currency, "GHS");
    assert_eq!(store.payment(&checkout.tx_ref).unwrap().currency, "GHS");
}
