//! Route tests over the in-memory store and a scripted gateway.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use pharmacare_api::{AppState, create_router};
use pharmacare_core::auth::{Role, hash_password};
use pharmacare_core::payment::{GatewayOutcome, PaymentReconciler, PaymentStatus};
use pharmacare_core::principal::{PrincipalRecord, StoreKind};
use pharmacare_core::testing::{
    FixedClock, InMemoryStore, ScriptedGateway, company, pending_payment, principal_record,
};
use pharmacare_core::StoreHandles;
use pharmacare_shared::types::CompanyId;
use pharmacare_shared::{JwtConfig, JwtService};
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use tower::ServiceExt;

const PASSWORD: &str = "dispense-carefully";

struct TestApp {
    store: Arc<InMemoryStore>,
    gateway: Arc<ScriptedGateway>,
    jwt: Arc<JwtService>,
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        Self::with_gateway(ScriptedGateway::with_outcome(GatewayOutcome::Success))
    }

    fn with_gateway(gateway: ScriptedGateway) -> Self {
        let store = Arc::new(InMemoryStore::default());
        let gateway = Arc::new(gateway);
        let clock = Arc::new(FixedClock::default());
        let jwt = Arc::new(JwtService::new(JwtConfig {
            secret: "route-test-secret".into(),
            session_ttl_secs: 86_400,
        }));
        let stores = StoreHandles::single(store.clone());
        let payments = PaymentReconciler::new(stores.elevated(), gateway.clone(), clock.clone());
        let state = AppState::new(&stores, Arc::clone(&jwt), payments, clock);
        Self {
            store,
            gateway,
            jwt,
            state,
        }
    }

    fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    fn seed(&self, email: &str, role: Role, company_id: Option<CompanyId>) -> PrincipalRecord {
        let mut record = principal_record(email, role, company_id);
        record.password_hash = hash_password(PASSWORD).unwrap();
        self.store.put_principal(StoreKind::Primary, record.clone());
        record
    }

    fn token_for(&self, record: &PrincipalRecord) -> String {
        self.jwt
            .generate_session_token(
                record.id.into_inner(),
                &record.email,
                record.role.as_str(),
                record.account_kind.as_str(),
                record.company_id.map(CompanyId::into_inner),
            )
            .unwrap()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send_with(self.router(), method, uri, token, body, &[]).await
    }

    async fn send_with(
        &self,
        router: Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/api/v1/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_login_then_me() {
    let app = TestApp::new();
    app.seed("pharm@clinic.test", Role::Pharmacist, None);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "Pharm@Clinic.test", "password": PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_type"], "individual");
    let token = body["token"].as_str().unwrap().to_string();

    let (status, me) = app
        .send(Method::GET, "/api/v1/auth/me", Some(&token), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "pharm@clinic.test");
    assert_eq!(me["subscription"]["status"], "inactive");
}

#[tokio::test]
async fn test_wrong_password_is_generic_401() {
    let app = TestApp::new();
    app.seed("pharm@clinic.test", Role::Pharmacist, None);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "pharm@clinic.test", "password": "not-the-password"})),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(body["message"], "invalid email or password");
}

#[tokio::test]
async fn test_verbose_mode_names_the_failure() {
    let mut app = TestApp::new();
    app.state = app.state.clone().with_verbose_errors(true);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "nobody@clinic.test", "password": PASSWORD})),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].as_str().unwrap().contains("no account with that email"));
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = TestApp::new();

    let (missing, _) = app.send(Method::GET, "/api/v1/auth/me", None, None).await;
    let (forged, _) = app
        .send(Method::GET, "/api/v1/auth/me", Some("not.a.jwt"), None)
        .await;

    assert_eq!(missing, StatusCode::UNAUTHORIZED);
    assert_eq!(forged, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_then_pending_until_approved() {
    let app = TestApp::new();
    let admin = app.seed("root@pharmacare.test", Role::Admin, None);
    let admin_token = app.token_for(&admin);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "email": "new@clinic.test",
                "password": PASSWORD,
                "full_name": "New Pharmacist"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["approved"], false);
    let id = body["user"]["id"].as_str().unwrap().to_string();

    let login = json!({"email": "new@clinic.test", "password": PASSWORD});
    let (status, body) = app
        .send(Method::POST, "/api/v1/auth/login", None, Some(login.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "account is pending approval");

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/admin/principals/{id}/approve"),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["approved"], true);

    let (status, _) = app
        .send(Method::POST, "/api/v1/auth/login", None, Some(login))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_duplicate_registration_is_409() {
    let app = TestApp::new();
    app.seed("taken@clinic.test", Role::Pharmacist, None);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "email": "taken@clinic.test",
                "password": PASSWORD,
                "full_name": "Someone Else"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_only_admin_may_approve() {
    let app = TestApp::new();
    let pharmacist = app.seed("pharm@clinic.test", Role::Pharmacist, None);
    let token = app.token_for(&pharmacist);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/v1/admin/principals/{}/approve", pharmacist.id),
            Some(&token),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_payment_returns_hosted_link() {
    let app = TestApp::new();
    app.seed("payer@clinic.test", Role::Pharmacist, None);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/payments/create",
            None,
            Some(json!({"plan_id": "individual_monthly", "email": "payer@clinic.test"})),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let tx_ref = body["tx_ref"].as_str().unwrap();
    assert!(tx_ref.starts_with("PC-"));
    assert!(body["payment_url"].as_str().unwrap().ends_with(tx_ref));
    let record = app.store.payment(tx_ref).unwrap();
    assert_eq!(record.status, PaymentStatus::Pending);
    assert_eq!(record.amount, dec!(5000));
}

#[tokio::test]
async fn test_webhook_unknown_tx_ref_is_404() {
    let app = TestApp::new();

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/payments/webhook",
            None,
            Some(json!({"tx_ref": "zzz", "status": "successful"})),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    assert!(app.store.events().is_empty());
}

#[tokio::test]
async fn test_webhook_applies_once_and_acks_repeats() {
    let app = TestApp::new();
    let payer = app.seed("payer@clinic.test", Role::Pharmacist, None);
    app.store.put_payment(pending_payment(
        "PC-HOOK",
        &payer.email,
        "individual_monthly",
        dec!(5000),
    ));
    let delivery = json!({"event": "charge.completed", "data": {"tx_ref": "PC-HOOK", "status": "successful"}});

    let (first, body) = app
        .send(Method::POST, "/api/v1/payments/webhook", None, Some(delivery.clone()))
        .await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(body["applied"], true);
    assert_eq!(body["status"], "paid");

    let (second, body) = app
        .send(Method::POST, "/api/v1/payments/webhook", None, Some(delivery))
        .await;
    assert_eq!(second, StatusCode::OK);
    assert_eq!(body["applied"], false);
    assert_eq!(app.store.events().len(), 1);
}

#[tokio::test]
async fn test_webhook_hash_is_enforced() {
    let mut app = TestApp::new();
    app.state = app
        .state
        .clone()
        .with_webhook_hash(Some("shared-secret".into()));
    let payer = app.seed("payer@clinic.test", Role::Pharmacist, None);
    app.store.put_payment(pending_payment(
        "PC-SIGNED",
        &payer.email,
        "individual_monthly",
        dec!(5000),
    ));
    let delivery = json!({"tx_ref": "PC-SIGNED", "status": "successful"});

    let (status, _) = app
        .send_with(
            app.router(),
            Method::POST,
            "/api/v1/payments/webhook",
            None,
            Some(delivery.clone()),
            &[("verif-hash", "wrong")],
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        app.store.payment("PC-SIGNED").unwrap().status,
        PaymentStatus::Pending
    );

    let (status, _) = app
        .send_with(
            app.router(),
            Method::POST,
            "/api/v1/payments/webhook",
            None,
            Some(delivery),
            &[("verif-hash", "shared-secret")],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        app.store.payment("PC-SIGNED").unwrap().status,
        PaymentStatus::Paid
    );
}

#[tokio::test]
async fn test_verify_reports_paid_with_end_date() {
    let app = TestApp::new();
    let payer = app.seed("payer@clinic.test", Role::Pharmacist, None);
    app.store.put_payment(pending_payment(
        "PC-VERIFY",
        &payer.email,
        "individual_monthly",
        dec!(5000),
    ));

    let (status, body) = app
        .send(Method::GET, "/api/v1/payments/PC-VERIFY/verify", None, None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_paid"], true);
    assert_eq!(body["status"], "paid");
    assert!(body["subscription_end_date"].is_string());
    assert_eq!(app.gateway.verify_calls(), 1);
}

#[tokio::test]
async fn test_company_admin_adds_and_removes_member() {
    let app = TestApp::new();
    let acme = company("Acme Pharmacy");
    app.store.put_company(acme.clone());
    let admin = app.seed("owner@acme.test", Role::CompanyAdmin, Some(acme.id));
    let token = app.token_for(&admin);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/companies/users",
            Some(&token),
            Some(json!({
                "email": "tech@acme.test",
                "password": PASSWORD,
                "full_name": "Acme Tech"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "company_user");
    let member_id = body["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/v1/companies/users/{member_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.store.principal_count(StoreKind::CompanyScoped), 0);
}

#[tokio::test]
async fn test_removing_someone_elses_member_is_403() {
    let app = TestApp::new();
    let acme = company("Acme Pharmacy");
    let rival = company("Rival Pharmacy");
    app.store.put_company(acme.clone());
    app.store.put_company(rival.clone());
    let admin = app.seed("owner@acme.test", Role::CompanyAdmin, Some(acme.id));
    let outsider = principal_record("tech@rival.test", Role::CompanyUser, Some(rival.id));
    app.store
        .put_principal(StoreKind::CompanyScoped, outsider.clone());

    let (status, body) = app
        .send(
            Method::DELETE,
            &format!("/api/v1/companies/users/{}", outsider.id),
            Some(&app.token_for(&admin)),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
    assert_eq!(app.store.principal_count(StoreKind::CompanyScoped), 1);
}

#[tokio::test]
async fn test_history_lists_paid_subscription() {
    let app = TestApp::new();
    let payer = app.seed("payer@clinic.test", Role::Pharmacist, None);
    app.store.put_payment(pending_payment(
        "PC-HIST",
        &payer.email,
        "individual_yearly",
        dec!(50000),
    ));
    let (status, _) = app
        .send(Method::GET, "/api/v1/payments/PC-HIST/verify", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(
            Method::GET,
            "/api/v1/subscriptions/history",
            Some(&app.token_for(&payer)),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let events = body.as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["tx_ref"], "PC-HIST");
    assert_eq!(events[0]["plan_id"], "individual_yearly");
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .unwrap();

    let response = app.router().oneshot(request).await.unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}
