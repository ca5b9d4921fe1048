//! Structured fuzz target for registry token claims.
//!
//! Uses the `arbitrary` crate to assemble plausible three-part tokens
//! (header, payload with an `access` claim, signature bytes) so the decoders
//! see valid-ish JSON rather than noise.

#![no_main]

use arbitrary::Arbitrary;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use libfuzzer_sys::fuzz_target;
use registry_auth_authn::{
    AccessClaims,
    jwt::{decode_token_header, decode_unverified_claims},
    validation::{validate_algorithm, validate_kid},
};
use serde_json::{Map, Value, json};

#[derive(Debug, Arbitrary)]
struct FuzzedToken {
    alg: FuzzedAlg,
    kid: Option<String>,
    sub: String,
    user: String,
    aud: String,
    iss: String,
    exp: i64,
    iat: i64,
    access: Vec<FuzzedAccess>,
    signature_bytes: Vec<u8>,
}

#[derive(Debug, Arbitrary)]
struct FuzzedAccess {
    resource_type: String,
    name: String,
    actions: Vec<String>,
}

/// Algorithm values covering the downgrade attacks and arbitrary strings.
#[derive(Debug, Arbitrary)]
enum FuzzedAlg {
    RS256,
    RS384,
    None,
    HS256,
    HS512,
    EdDSA,
    Other(String),
}

impl FuzzedAlg {
    fn as_str(&self) -> &str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::None => "none",
            Self::HS256 => "HS256",
            Self::HS512 => "HS512",
            Self::EdDSA => "EdDSA",
            Self::Other(s) => s,
        }
    }
}

fn build_token(input: &FuzzedToken) -> String {
    let mut header = Map::new();
    header.insert("alg".to_owned(), Value::String(input.alg.as_str().to_owned()));
    header.insert("typ".to_owned(), Value::String("JWT".to_owned()));
    if let Some(ref kid) = input.kid {
        header.insert("kid".to_owned(), Value::String(kid.clone()));
    }

    let access: Vec<Value> = input
        .access
        .iter()
        .map(|a| json!({"type": a.resource_type, "name": a.name, "actions": a.actions}))
        .collect();
    let payload = json!({
        "sub": input.sub,
        "user": input.user,
        "access": access,
        "jti": "fuzz",
        "aud": input.aud,
        "iss": input.iss,
        "iat": input.iat,
        "exp": input.exp,
    });

    let header_b64 = URL_SAFE_NO_PAD.encode(Value::Object(header).to_string());
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload.to_string());
    let sig_b64 = URL_SAFE_NO_PAD.encode(&input.signature_bytes);
    format!("{header_b64}.{payload_b64}.{sig_b64}")
}

fuzz_target!(|input: FuzzedToken| {
    let token = build_token(&input);

    if let Ok(claims) = decode_unverified_claims::<AccessClaims>(&token) {
        for access in &claims.access {
            let _ = access.is_pull_only();
            let _ = access.repository_key();
        }
    }

    if let Ok(header) = decode_token_header(&token) {
        let _ = validate_algorithm(&format!("{:?}", header.alg));
        if let Some(ref kid) = header.kid {
            let _ = validate_kid(kid);
        }
    }
});
