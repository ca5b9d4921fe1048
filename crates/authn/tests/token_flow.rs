//! End-to-end token requests through [`TokenService`].
//!
//! Each test drives the service the way a registry client would: a Basic
//! credential plus the `service` / `scope` / `offline_token` query, and then
//! verifies the returned token with the service certificate.
#![allow(clippy::expect_used, clippy::panic)]

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{Harness, admin, basic, request, scoped};
use jsonwebtoken::DecodingKey;
use registry_auth_authn::{
    AccessClaims, AccessRequest, AuthError, DenyReason, ErrorClass, RefreshClaims, ScopeParam,
    TokenRequest,
    issuer::REFRESH_TOKEN_USAGE,
    jwt::{decode_token_header, verify_token},
};
use registry_auth_storage::{
    AuditAction, AuditResult, Entity, EntityDirectory, ModelAccessRequest, StorageError,
    StorageResult, testutil::FixtureIds,
};

fn pull(name: &str) -> AccessRequest {
    AccessRequest::new("repository", name, vec!["pull".to_owned()])
}

// ---------------------------------------------------------------------------
// Authentication and request checks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_missing_credential_is_refused() {
    let harness = Harness::new();
    let err = harness.service.handle(None, &request(None)).await.expect_err("must refuse");

    assert!(matches!(err, AuthError::MissingCredential));
    assert_eq!(err.class(), ErrorClass::Forbidden);

    let events = harness.audit.events_for(AuditAction::RejectCredential);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].actor, "anonymous");
    assert_eq!(events[0].result, AuditResult::Failure("credential_missing".to_owned()));
}

#[tokio::test]
async fn test_wrong_secret_is_refused() {
    let harness = Harness::new();
    let header = registry_auth_authn::credential::BasicCredentials::encode("alice", "nope");
    let err = harness.service.handle(Some(&header), &request(None)).await.expect_err("must refuse");
    assert!(matches!(err, AuthError::InvalidCredential(_)));
}

#[tokio::test]
async fn test_bearer_header_is_refused() {
    let harness = Harness::new();
    let err = harness
        .service
        .handle(Some("Bearer abc.def.ghi"), &request(None))
        .await
        .expect_err("must refuse");
    assert_eq!(err.code(), "credential_invalid");
}

#[tokio::test]
async fn test_unexpected_service_is_refused() {
    let harness = Harness::new();
    let request = TokenRequest::builder().service("someone-else").build();
    let err = harness
        .service
        .handle(Some(&basic(FixtureIds::COLLABORATOR)), &request)
        .await
        .expect_err("must refuse");

    assert!(matches!(err, AuthError::UnexpectedService { ref requested } if requested == "someone-else"));
    assert_eq!(err.context()["service"], serde_json::json!("someone-else"));
}

// ---------------------------------------------------------------------------
// Login probes and refresh tokens
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_login_probe_issues_empty_grant() {
    let harness = Harness::new();
    for req in [request(None), scoped(""), scoped("   "), request(Some(ScopeParam::Many(vec![])))] {
        let response = harness
            .service
            .handle(Some(&basic(FixtureIds::STRANGER)), &req)
            .await
            .expect("login should succeed");
        let claims = harness.access_claims(&response.token).await;
        assert!(claims.access.is_empty());
        assert_eq!(claims.sub, FixtureIds::STRANGER);
        assert_eq!(claims.user, format!("u-{}", FixtureIds::STRANGER));
    }
    assert_eq!(harness.store.lookup_count(), 0);
}

#[tokio::test]
async fn test_empty_grant_verifies_with_published_public_key() {
    let harness = Harness::new();
    let response = harness
        .service
        .handle(Some(&basic(FixtureIds::STRANGER)), &request(None))
        .await
        .expect("login should succeed");

    let pem = std::fs::read(common::fixture("public.pem")).expect("read public key");
    let key = DecodingKey::from_rsa_pem(&pem).expect("parse public key");
    let claims: AccessClaims =
        verify_token(&response.token, &key, common::SERVICE, common::ISSUER).expect("verify");
    assert!(claims.access.is_empty());

    let header = decode_token_header(&response.token).expect("header");
    assert_eq!(header.kid.as_deref(), Some(common::KEY_ID));
}

#[tokio::test]
async fn test_offline_token_skips_authorization() {
    let harness = Harness::new();
    // A scope this caller could never be granted.
    let mut req = scoped("repository:model-a/img:push");
    req.offline_token = true;

    let response = harness
        .service
        .handle(Some(&basic(FixtureIds::STRANGER)), &req)
        .await
        .expect("refresh token should be issued");

    let key = harness.keys.decoding_key().await.expect("decoding key");
    let claims: RefreshClaims =
        verify_token(&response.token, &key, common::SERVICE, common::ISSUER).expect("verify");
    assert_eq!(claims.usage, REFRESH_TOKEN_USAGE);
    assert_eq!(claims.sub, FixtureIds::STRANGER);
    assert_eq!(harness.store.lookup_count(), 0);
    assert_eq!(harness.audit.events_for(AuditAction::IssueRefreshToken).len(), 1);
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let harness = Harness::new();
    let mut req = request(None);
    req.offline_token = true;
    let response = harness
        .service
        .handle(Some(&basic(FixtureIds::COLLABORATOR)), &req)
        .await
        .expect("refresh token should be issued");

    let key = harness.keys.decoding_key().await.expect("decoding key");
    let result: Result<AccessClaims, _> =
        verify_token(&response.token, &key, common::SERVICE, common::ISSUER);
    assert!(matches!(result, Err(AuthError::InvalidTokenFormat(_))));
}

// ---------------------------------------------------------------------------
// Current-model tier
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_collaborator_gets_every_action() {
    let harness = Harness::new();
    let response = harness
        .service
        .handle(
            Some(&basic(FixtureIds::COLLABORATOR)),
            &scoped("repository:model-a/img:pull,push,delete"),
        )
        .await
        .expect("collaborator should be allowed");

    let claims = harness.access_claims(&response.token).await;
    assert_eq!(
        claims.access,
        vec![AccessRequest::new(
            "repository",
            "model-a/img",
            vec!["pull".into(), "push".into(), "delete".into()]
        )]
    );
}

#[tokio::test]
async fn test_collaborator_allowed_without_any_access_request() {
    let harness = Harness::new();
    harness
        .store
        .delete_access_request(&"ar-analysts".into())
        .expect("access request exists");

    let response = harness
        .service
        .handle(Some(&basic(FixtureIds::COLLABORATOR)), &scoped("repository:model-a/img:push"))
        .await;
    assert!(response.is_ok());
}

#[tokio::test]
async fn test_requester_pull_returns_single_access_entry() {
    let harness = Harness::new();
    let response = harness
        .service
        .handle(Some(&basic(FixtureIds::REQUESTER)), &scoped("repository:model-a/img:pull"))
        .await
        .expect("approved requester should be allowed");

    let claims = harness.access_claims(&response.token).await;
    assert_eq!(claims.access, vec![pull("model-a/img")]);

    let raw: serde_json::Value =
        registry_auth_authn::jwt::decode_unverified_claims(&response.token).expect("claims");
    assert_eq!(
        raw["access"],
        serde_json::json!([{"type": "repository", "name": "model-a/img", "actions": ["pull"]}])
    );
}

#[tokio::test]
async fn test_requester_pull_push_denied_despite_access_request() {
    let harness = Harness::new();
    let err = harness
        .service
        .handle(Some(&basic(FixtureIds::REQUESTER)), &scoped("repository:model-a/img:pull,push"))
        .await
        .expect_err("must deny");

    match err {
        AuthError::AccessDenied { ref access, reason, ref caller } => {
            assert_eq!(access.actions, vec!["pull".to_owned(), "push".to_owned()]);
            assert_eq!(reason, DenyReason::NonCollaboratorWrite);
            assert_eq!(caller, FixtureIds::REQUESTER);
        },
        other => panic!("expected AccessDenied, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_collaborator_push_denied_regardless_of_access_requests() {
    let harness = Harness::new();
    harness.store.insert_access_request(
        ModelAccessRequest::builder()
            .id("ar-mallory")
            .model_id(FixtureIds::MODEL)
            .entities(vec![Entity::user(FixtureIds::STRANGER)])
            .build(),
    );

    for user in [FixtureIds::REQUESTER, FixtureIds::STRANGER] {
        let err = harness
            .service
            .handle(Some(&basic(user)), &scoped("repository:model-a/img:push"))
            .await
            .expect_err("push must be denied");
        assert!(matches!(
            err,
            AuthError::AccessDenied { reason: DenyReason::NonCollaboratorWrite, .. }
        ));
    }
}

#[tokio::test]
async fn test_stranger_pull_denied_without_access_request() {
    let harness = Harness::new();
    let err = harness
        .service
        .handle(Some(&basic(FixtureIds::STRANGER)), &scoped("repository:model-a/img:pull"))
        .await
        .expect_err("must deny");

    assert_eq!(err.code(), "access_denied");
    assert_eq!(err.context()["reason"], serde_json::json!("no valid access request found"));

    let denials = harness.audit.events_for(AuditAction::DenyAccess);
    assert_eq!(denials.len(), 1);
    assert_eq!(denials[0].actor, FixtureIds::STRANGER);
    assert_eq!(denials[0].resource, "repository:model-a/img");
    assert_eq!(denials[0].metadata["tier"], "current_model");
    assert_eq!(denials[0].metadata["client_id"], "docker");
}

// ---------------------------------------------------------------------------
// Legacy deployment tier
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_legacy_owner_may_pull() {
    let harness = Harness::new();
    let response = harness
        .service
        .handle(
            Some(&basic(FixtureIds::DEPLOYMENT_OWNER)),
            &scoped("repository:dep-legacy/img:pull"),
        )
        .await
        .expect("owner pull should be allowed");

    let claims = harness.access_claims(&response.token).await;
    assert_eq!(claims.access, vec![pull("dep-legacy/img")]);
}

#[tokio::test]
async fn test_legacy_owner_may_not_push() {
    let harness = Harness::new();
    let err = harness
        .service
        .handle(
            Some(&basic(FixtureIds::DEPLOYMENT_OWNER)),
            &scoped("repository:dep-legacy/img:push"),
        )
        .await
        .expect_err("owner push must be denied");
    assert!(matches!(
        err,
        AuthError::AccessDenied { reason: DenyReason::LegacyWriteRequested, .. }
    ));
}

#[tokio::test]
async fn test_unknown_repository_denied() {
    let harness = Harness::new();
    let err = harness
        .service
        .handle(Some(&basic(FixtureIds::COLLABORATOR)), &scoped("repository:ghost/img:pull"))
        .await
        .expect_err("must deny");
    assert!(matches!(err, AuthError::AccessDenied { reason: DenyReason::DeploymentNotFound, .. }));
}

// ---------------------------------------------------------------------------
// Admin bypass and multi-entry scopes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_admin_bypasses_every_tier() {
    let harness = Harness::new();
    let response = harness
        .service
        .handle(
            Some(&admin("ci-bot")),
            &scoped("repository:ghost/img:push repository:model-a/img:delete"),
        )
        .await
        .expect("admin should be allowed");

    let claims = harness.access_claims(&response.token).await;
    assert_eq!(claims.sub, "ci-bot");
    assert_eq!(claims.user, "admin");
    assert_eq!(claims.access.len(), 2);
    assert_eq!(harness.store.lookup_count(), 0);
}

#[tokio::test]
async fn test_partial_grant_is_never_issued() {
    let harness = Harness::new();
    let err = harness
        .service
        .handle(
            Some(&basic(FixtureIds::REQUESTER)),
            &request(Some(ScopeParam::Many(vec![
                "repository:model-a/img:pull".to_owned(),
                "repository:model-a/img:push".to_owned(),
            ]))),
        )
        .await
        .expect_err("must deny the whole request");

    match err {
        AuthError::AccessDenied { access, .. } => {
            assert_eq!(access.actions, vec!["push".to_owned()]);
        },
        other => panic!("expected AccessDenied, got {other:?}"),
    }
    assert!(harness.audit.events_for(AuditAction::IssueAccessToken).is_empty());
}

#[tokio::test]
async fn test_multiple_entries_all_allowed() {
    let harness = Harness::new();
    let response = harness
        .service
        .handle(
            Some(&basic(FixtureIds::COLLABORATOR)),
            &scoped("repository:model-a/img:pull,push repository:model-a/other:pull"),
        )
        .await
        .expect("collaborator should be allowed");

    let claims = harness.access_claims(&response.token).await;
    assert_eq!(claims.access.len(), 2);
    assert_eq!(claims.access[1], pull("model-a/other"));

    let issued = harness.audit.events_for(AuditAction::IssueAccessToken);
    assert_eq!(issued.len(), 1);
    assert_eq!(
        issued[0].resource,
        "repository:model-a/img:pull,push repository:model-a/other:pull"
    );
}

// ---------------------------------------------------------------------------
// Infrastructure faults
// ---------------------------------------------------------------------------

struct BrokenDirectory;

#[async_trait]
impl EntityDirectory for BrokenDirectory {
    async fn entities_for(&self, _user_id: &str) -> StorageResult<Vec<Entity>> {
        Err(StorageError::timeout())
    }
}

#[tokio::test]
async fn test_directory_failure_is_internal() {
    let harness = Harness::with_directory(
        registry_auth_storage::testutil::seeded_store(),
        Arc::new(BrokenDirectory),
    );
    let err = harness
        .service
        .handle(Some(&basic(FixtureIds::COLLABORATOR)), &scoped("repository:model-a/img:pull"))
        .await
        .expect_err("must fail");

    assert!(matches!(err, AuthError::Lookup(StorageError::Timeout)));
    assert_eq!(err.class(), ErrorClass::Internal);
    assert!(err.context().is_empty());
    assert!(harness.audit.events().is_empty());
}

#[tokio::test]
async fn test_login_probe_does_not_need_the_directory() {
    let harness = Harness::with_directory(
        registry_auth_storage::testutil::seeded_store(),
        Arc::new(BrokenDirectory),
    );
    let response =
        harness.service.handle(Some(&basic(FixtureIds::COLLABORATOR)), &request(None)).await;
    assert!(response.is_ok());
}

// ---------------------------------------------------------------------------
// Malformed action lists
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_stray_commas_are_not_a_pull() {
    let harness = Harness::new();
    let cases = [
        (FixtureIds::REQUESTER, "repository:model-a/img:pull,", DenyReason::NonCollaboratorWrite),
        (
            FixtureIds::DEPLOYMENT_OWNER,
            "repository:dep-legacy/img:,pull",
            DenyReason::LegacyWriteRequested,
        ),
    ];

    for (user, scope, expected) in cases {
        let err = harness
            .service
            .handle(Some(&basic(user)), &scoped(scope))
            .await
            .expect_err("stray comma must not pass as pull");
        match err {
            AuthError::AccessDenied { reason, .. } => assert_eq!(reason, expected, "{scope}"),
            other => panic!("expected AccessDenied for {scope}, got {other:?}"),
        }
    }
    assert!(harness.audit.events_for(AuditAction::IssueAccessToken).is_empty());
}
