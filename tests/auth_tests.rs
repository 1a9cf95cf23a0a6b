//! Token codec and auth service tests

mod common;

use axum::http::StatusCode;
use common::*;
use kuryr_admin::auth::{
    LoginRequest, MemorySessionStore, Principal, SessionStore, SigningKeys, TokenCodec, UserType,
};
use kuryr_admin::Error;
use std::sync::Arc;

fn principal() -> Principal {
    Principal {
        uid: 77,
        sid: "4b7b3c0e-session".to_string(),
        bid: 3,
        user_type: UserType::Operator,
    }
}

#[test]
fn test_token_is_jwt_shaped() {
    let codec = TokenCodec::new("kuryr-admin", 60, keys());
    let token = codec.issue(&principal()).expect("Failed to create token");
    assert!(!token.is_empty());
    assert_eq!(token.split('.').count(), 3); // JWT format: header.payload.signature
}

#[test]
fn test_round_trip_both_kinds() {
    let access = TokenCodec::new("kuryr-admin", 60, keys());
    let refresh = TokenCodec::new("kuryr-admin-refresh", 600, keys());

    for p in [
        principal(),
        Principal {
            uid: u64::MAX,
            sid: String::new(),
            bid: 0,
            user_type: UserType::Administrator,
        },
    ] {
        assert_eq!(access.verify(&access.issue(&p).unwrap()).unwrap(), p);
        assert_eq!(refresh.verify(&refresh.issue(&p).unwrap()).unwrap(), p);
    }
}

#[test]
fn test_access_expires_before_refresh() {
    let access = TokenCodec::new("kuryr-admin", 60, keys());
    let refresh = TokenCodec::new("kuryr-admin-refresh", 600, keys());
    let now = 1_700_000_000;

    let at = access.issue_at(&principal(), now).unwrap();
    let rt = refresh.issue_at(&principal(), now).unwrap();

    let at_exp = access.decode_at(&at, now).unwrap().exp;
    let rt_exp = refresh.decode_at(&rt, now).unwrap().exp;
    assert!(at_exp < rt_exp);
}

#[test]
fn test_expired_token_rejected() {
    let codec = TokenCodec::new("kuryr-admin", 60, keys());
    let now = chrono::Utc::now().timestamp();
    let token = codec.issue_at(&principal(), now - 120).unwrap();

    assert!(matches!(codec.verify(&token), Err(Error::InvalidToken(_))));
}

#[test]
fn test_token_verified_at_expiry_instant_is_expired() {
    let codec = TokenCodec::new("kuryr-admin", 60, keys());
    let now = 1_700_000_000;
    let token = codec.issue_at(&principal(), now).unwrap();

    assert!(codec.verify_at(&token, now + 60).is_err());
}

#[test]
fn test_wrong_key_rejected() {
    let other = SigningKeys::from_ed_pem(OTHER_PRIVATE_PEM.as_bytes(), OTHER_PUBLIC_PEM.as_bytes())
        .unwrap();
    let signer = TokenCodec::new("kuryr-admin", 60, other);
    let verifier = TokenCodec::new("kuryr-admin", 60, keys());

    let token = signer.issue(&principal()).unwrap();
    assert!(matches!(verifier.verify(&token), Err(Error::InvalidToken(_))));
}

#[test]
fn test_tampered_token_rejected() {
    let codec = TokenCodec::new("kuryr-admin", 60, keys());
    let token = codec.issue(&principal()).unwrap();
    let mut parts: Vec<&str> = token.split('.').collect();
    let forged = codec.issue(&Principal {
        uid: 1,
        ..principal()
    })
    .unwrap();
    let forged_payload = forged.split('.').nth(1).unwrap().to_string();
    parts[1] = forged_payload.as_str();

    assert!(codec.verify(&parts.join(".")).is_err());
}

#[test]
fn test_malformed_token_rejected() {
    let codec = TokenCodec::new("kuryr-admin", 60, keys());
    assert!(codec.verify("not-a-jwt-token").is_err());
    assert!(codec.verify("").is_err());
}

#[test]
fn test_tokens_for_same_principal_differ() {
    let codec = TokenCodec::new("kuryr-admin", 60, keys());
    let first = codec.issue(&principal()).unwrap();
    let second = codec.issue(&principal()).unwrap();
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_login_tokens_decode_to_subject() {
    let service = test_service(MemorySessionStore::new());

    let principal = service
        .login(&LoginRequest::password(ALICE_EMAIL, ALICE_PASSWORD))
        .await
        .expect("login should succeed");
    let pair = service.issue_token_pair(&principal).unwrap();

    let from_access = service.access_codec().verify(&pair.access_token).unwrap();
    let from_refresh = service.refresh_codec().verify(&pair.refresh_token).unwrap();

    assert_eq!(from_access.uid, ALICE_ID);
    assert_eq!(from_access, principal);
    assert_eq!(from_refresh, principal);
    assert_eq!(pair.expires_in, 60);
}

#[tokio::test]
async fn test_login_mints_fresh_session_ids() {
    let service = test_service(MemorySessionStore::new());
    let req = LoginRequest::password(ALICE_EMAIL, ALICE_PASSWORD);

    let first = service.login(&req).await.unwrap();
    let second = service.login(&req).await.unwrap();

    assert_ne!(first.sid, second.sid);
    assert_ne!(first.sid, ALICE_ID.to_string());
}

#[tokio::test]
async fn test_login_failures_are_identical() {
    let service = test_service(MemorySessionStore::new());

    let wrong = service
        .login(&LoginRequest::password(ALICE_EMAIL, "wrong-pw"))
        .await
        .unwrap_err();
    let unknown = service
        .login(&LoginRequest::password("nobody", "x"))
        .await
        .unwrap_err();

    assert!(matches!(wrong, Error::InvalidCredentials));
    assert!(matches!(unknown, Error::InvalidCredentials));
    assert_eq!(wrong.to_string(), unknown.to_string());
}

#[tokio::test]
async fn test_refresh_reissues_new_tokens() {
    let service = test_service(MemorySessionStore::new());
    let principal = service
        .login(&LoginRequest::password(ALICE_EMAIL, ALICE_PASSWORD))
        .await
        .unwrap();
    let pair = service.issue_token_pair(&principal).unwrap();

    let renewed = service.refresh(&pair.refresh_token).await.unwrap();

    assert_ne!(renewed.access_token, pair.access_token);
    assert_ne!(renewed.refresh_token, pair.refresh_token);
    assert_eq!(service.access_codec().verify(&renewed.access_token).unwrap(), principal);
}

#[tokio::test]
async fn test_access_token_cannot_refresh() {
    let service = test_service(MemorySessionStore::new());
    let principal = service
        .login(&LoginRequest::password(ALICE_EMAIL, ALICE_PASSWORD))
        .await
        .unwrap();
    let pair = service.issue_token_pair(&principal).unwrap();

    assert!(matches!(
        service.refresh(&pair.access_token).await,
        Err(Error::InvalidToken(_))
    ));
}

#[tokio::test]
async fn test_logout_revokes_refresh() {
    let store = MemorySessionStore::new();
    let service = test_service(store.clone());
    let principal = service
        .login(&LoginRequest::password(ALICE_EMAIL, ALICE_PASSWORD))
        .await
        .unwrap();
    let pair = service.issue_token_pair(&principal).unwrap();

    service.logout(&principal.sid).await.expect("logout task should not panic");

    // The token itself is still cryptographically valid...
    assert!(service.refresh_codec().verify(&pair.refresh_token).is_ok());
    // ...but its session is gone.
    assert!(matches!(
        service.refresh(&pair.refresh_token).await,
        Err(Error::SessionNotFound)
    ));
    assert!(!store.exists(&principal.sid).await.unwrap());
}

#[tokio::test]
async fn test_logout_twice_is_harmless() {
    let service = test_service(MemorySessionStore::new());
    let principal = service
        .login(&LoginRequest::password(ALICE_EMAIL, ALICE_PASSWORD))
        .await
        .unwrap();

    service.logout(&principal.sid).await.unwrap();
    service.logout(&principal.sid).await.unwrap();
}

#[tokio::test]
async fn test_refresh_survives_failed_ttl_extension() {
    let store = FlakyStore::default();
    let service = test_service_with(Arc::new(store.clone()));
    let principal = service
        .login(&LoginRequest::password(ALICE_EMAIL, ALICE_PASSWORD))
        .await
        .unwrap();
    let pair = service.issue_token_pair(&principal).unwrap();

    set(&store.fail_refresh, true);
    let renewed = service
        .refresh(&pair.refresh_token)
        .await
        .expect("a failed TTL extension should not fail the refresh");

    assert_eq!(service.refresh_codec().verify(&renewed.refresh_token).unwrap(), principal);
}

#[tokio::test]
async fn test_store_outage_on_login_is_internal() {
    let store = FlakyStore::default();
    let service = test_service_with(Arc::new(store.clone()));
    set(&store.fail_create, true);

    let err = service
        .login(&LoginRequest::password(ALICE_EMAIL, ALICE_PASSWORD))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::StoreUnavailable(_)));
    assert!(!err.is_unauthorized());
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_store_outage_on_session_check_is_internal() {
    let store = FlakyStore::default();
    let service = test_service_with(Arc::new(store.clone()));
    let principal = service
        .login(&LoginRequest::password(ALICE_EMAIL, ALICE_PASSWORD))
        .await
        .unwrap();
    let pair = service.issue_token_pair(&principal).unwrap();

    set(&store.fail_reads, true);
    let err = service.refresh(&pair.refresh_token).await.unwrap_err();

    assert!(matches!(err, Error::StoreUnavailable(_)));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_failed_logout_is_swallowed_and_not_retried() {
    let store = FlakyStore::default();
    let service = test_service_with(Arc::new(store.clone()));
    let principal = service
        .login(&LoginRequest::password(ALICE_EMAIL, ALICE_PASSWORD))
        .await
        .unwrap();

    set(&store.fail_delete, true);
    service
        .logout(&principal.sid)
        .await
        .expect("logout task should finish without panicking");

    set(&store.fail_delete, false);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(store.inner.exists(&principal.sid).await.unwrap());
}
