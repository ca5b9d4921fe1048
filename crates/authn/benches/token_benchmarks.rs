#![allow(clippy::expect_used)]

use std::{path::PathBuf, sync::Arc};

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use registry_auth_authn::{
    AccessRequest, AuthorizationDecider, CallerContext, CallerIdentity, KeyMaterial, ScopeParam,
    TokenIssuer, TokenSettings, keys::format_key_id, parse_scope,
};
use registry_auth_storage::testutil::{FixtureIds, seeded_store};
use tokio::runtime::Runtime;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn rt() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to create tokio runtime")
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn scope_of(entries: usize) -> String {
    (0..entries)
        .map(|i| format!("repository:model-a/img-{i}:pull,push"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// 1. scope_parsing
// ---------------------------------------------------------------------------

fn scope_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("scope_parsing");

    for &entries in &[1, 8, 64] {
        let scope = ScopeParam::from(scope_of(entries).as_str());
        group.throughput(Throughput::Elements(entries as u64));
        group.bench_with_input(BenchmarkId::new("single_string", entries), &scope, |b, scope| {
            b.iter(|| parse_scope(scope));
        });
    }

    group.bench_function("host_with_port", |b| {
        b.iter(|| AccessRequest::parse("repository:registry.local:5000/model-a/img:pull"));
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// 2. key_id
// ---------------------------------------------------------------------------

fn key_id(c: &mut Criterion) {
    let digest = [0x5Au8; 30];
    c.bench_function("key_id/format", |b| {
        b.iter(|| format_key_id(&digest).expect("valid length"));
    });
}

// ---------------------------------------------------------------------------
// 3. decider
// ---------------------------------------------------------------------------

fn decider(c: &mut Criterion) {
    let mut group = c.benchmark_group("decider");
    let rt = rt();
    let store = Arc::new(seeded_store());
    let decider = AuthorizationDecider::standard(store.clone());

    let cases = [
        ("collaborator", FixtureIds::COLLABORATOR, "repository:model-a/img:push"),
        ("access_request", FixtureIds::REQUESTER, "repository:model-a/img:pull"),
        ("legacy_owner", FixtureIds::DEPLOYMENT_OWNER, "repository:dep-legacy/img:pull"),
        ("denied", FixtureIds::STRANGER, "repository:ghost/img:pull"),
    ];

    for (name, user, scope) in cases {
        let identity = CallerIdentity::builder().id(user).internal_id(user).build();
        let ctx = rt
            .block_on(CallerContext::resolve(identity, store.as_ref()))
            .expect("entities resolve");
        let access = AccessRequest::parse(scope);
        group.bench_function(name, |b| {
            b.to_async(&rt).iter(|| async {
                decider.decide(&ctx, &access).await.expect("decision");
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// 4. issuance
// ---------------------------------------------------------------------------

fn issuance(c: &mut Criterion) {
    let mut group = c.benchmark_group("issuance");
    let rt = rt();
    let keys = Arc::new(KeyMaterial::new(fixture("key.pem"), fixture("cert.pem")));
    rt.block_on(keys.preload()).expect("fixture keys load");
    let issuer = TokenIssuer::new(keys, TokenSettings::default());
    let identity = CallerIdentity::builder().id("alice").internal_id("u-1").build();

    for &entries in &[0, 1, 16] {
        let access = parse_scope(&ScopeParam::from(scope_of(entries).as_str()));
        group.bench_with_input(BenchmarkId::new("access_token", entries), &access, |b, access| {
            b.to_async(&rt).iter(|| async {
                issuer.issue_access_token(&identity, access).await.expect("signed");
            });
        });
    }

    group.bench_function("refresh_token", |b| {
        b.to_async(&rt).iter(|| async {
            issuer.issue_refresh_token(&identity).await.expect("signed");
        });
    });

    group.finish();
}

criterion_group!(benches, scope_parsing, key_id, decider, issuance);
criterion_main!(benches);
