//! Unit tests for session tokens.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::Claims;
use crate::jwt::{JwtConfig, JwtError, JwtService};

fn create_test_service() -> JwtService {
    JwtService::new(JwtConfig {
        secret: "test-secret-key-for-testing".to_string(),
        session_ttl_secs: 86_400,
    })
}

#[test]
fn test_claims_new_sets_correct_fields() {
    let principal_id = Uuid::new_v4();
    let company_id = Uuid::new_v4();
    let expires_at = Utc::now() + Duration::hours(24);

    let claims = Claims::new(
        principal_id,
        "a@x.com",
        "company_user",
        "company_user",
        Some(company_id),
        expires_at,
    );

    assert_eq!(claims.principal_id(), principal_id);
    assert_eq!(claims.company_id(), Some(company_id));
    assert_eq!(claims.email, "a@x.com");
    assert_eq!(claims.role, "company_user");
    assert!(claims.iat <= Utc::now().timestamp());
    assert_eq!(claims.exp, expires_at.timestamp());
}

#[test]
fn test_session_token_round_trip_keeps_claims() {
    let service = create_test_service();
    let principal_id = Uuid::new_v4();

    let token = service
        .generate_session_token(principal_id, "b@x.com", "pharmacist", "individual", None)
        .unwrap();
    let claims = service.validate_token(&token).unwrap();

    assert_eq!(claims.principal_id(), principal_id);
    assert_eq!(claims.role, "pharmacist");
    assert_eq!(claims.account_kind, "individual");
    assert!(claims.company_id().is_none());
}

#[test]
fn test_session_token_lasts_a_day() {
    let service = create_test_service();
    assert_eq!(service.session_expires_in(), 86_400);

    let token = service
        .generate_session_token(Uuid::new_v4(), "c@x.com", "admin", "individual", None)
        .unwrap();
    let claims = service.validate_token(&token).unwrap();
    assert_eq!(claims.exp - claims.iat, 86_400);
}

#[test]
fn test_session_ttl_keeps_sub_hour_precision() {
    let service = JwtService::new(JwtConfig {
        secret: "test-secret-key-for-testing".to_string(),
        session_ttl_secs: 5_400,
    });
    assert_eq!(service.session_expires_in(), 5_400);

    let token = service
        .generate_session_token(Uuid::new_v4(), "f@x.com", "doctor", "individual", None)
        .unwrap();
    let claims = service.validate_token(&token).unwrap();
    assert_eq!(claims.exp - claims.iat, 5_400);
}

#[test]
fn test_expired_token_is_rejected() {
    let service = create_test_service();
    let claims = Claims::new(
        Uuid::new_v4(),
        "d@x.com",
        "doctor",
        "individual",
        None,
        Utc::now() - Duration::hours(2),
    );
    let token = service.encode_claims(&claims).unwrap();

    assert!(matches!(
        service.validate_token(&token),
        Err(JwtError::Expired)
    ));
}

#[test]
fn test_token_signed_with_other_secret_is_rejected() {
    let other = JwtService::new(JwtConfig {
        secret: "another-secret".to_string(),
        session_ttl_secs: 86_400,
    });
    let token = other
        .generate_session_token(Uuid::new_v4(), "e@x.com", "nurse", "individual", None)
        .unwrap();

    assert!(matches!(
        create_test_service().validate_token(&token),
        Err(JwtError::DecodingError(_))
    ));
}

#[test]
fn test_invalid_token() {
    let service = create_test_service();
    assert!(service.validate_token("invalid.token.here").is_err());
}
