//! Registry token decoding and verification.
//!
//! The registry verifies every token this service issues against the
//! configured certificate. The same checks are available here for tests,
//! health probes and tooling.
//!
//! # Example
//!
//! ```no_run
//! // Requires a token issued by this service.
//! use registry_auth_authn::{issuer::AccessClaims, jwt::verify_token};
//! use jsonwebtoken::DecodingKey;
//!
//! # fn example(token: &str, key: &DecodingKey) -> Result<(), Box<dyn std::error::Error>> {
//! let claims: AccessClaims = verify_token(token, key, "RegistryAuth", "RegistryIssuer")?;
//! println!("{} may {:?}", claims.sub, claims.access);
//! # Ok(())
//! # }
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation, decode, decode_header};
use serde::de::DeserializeOwned;

use crate::{
    error::{AuthError, Result},
    issuer::{AccessClaims, TokenSettings},
    keys::KeyMaterial,
    validation::{validate_algorithm, validate_kid},
};

/// Decode the token header without verifying anything.
///
/// # Errors
///
/// Returns [`AuthError::InvalidTokenFormat`] if the header cannot be decoded.
pub fn decode_token_header(token: &str) -> Result<Header> {
    decode_header(token)
        .map_err(|e| AuthError::invalid_token_format(format!("Failed to decode JWT header: {e}")))
}

/// Decode the claims without verifying the signature.
///
/// # Errors
///
/// Returns [`AuthError::InvalidTokenFormat`] if the token does not have three
/// parts or the payload is not base64url JSON of the requested shape.
pub fn decode_unverified_claims<C: DeserializeOwned>(token: &str) -> Result<C> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::invalid_token_format("JWT must have 3 parts separated by dots"));
    }

    let payload = URL_SAFE_NO_PAD.decode(parts[1]).map_err(|e| {
        AuthError::invalid_token_format(format!("Failed to decode JWT payload: {e}"))
    })?;

    serde_json::from_slice(&payload)
        .map_err(|e| AuthError::invalid_token_format(format!("Failed to parse JWT claims: {e}")))
}

/// Verify signature, algorithm, expiry, audience and issuer.
///
/// # Errors
///
/// - [`AuthError::UnsupportedAlgorithm`] for anything but RS256
/// - [`AuthError::InvalidSignature`] if the key does not match
/// - [`AuthError::TokenExpired`], [`AuthError::InvalidAudience`], [`AuthError::InvalidIssuer`]
///   for failing registered claims
/// - [`AuthError::InvalidTokenFormat`] for malformed tokens
pub fn verify_token<C: DeserializeOwned>(
    token: &str,
    key: &DecodingKey,
    audience: &str,
    issuer: &str,
) -> Result<C> {
    let header = decode_token_header(token)?;
    validate_algorithm(&format!("{:?}", header.alg))?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[audience]);
    validation.set_issuer(&[issuer]);
    validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);
    validation.validate_exp = true;
    validation.validate_nbf = false;

    Ok(decode::<C>(token, key, &validation)?.claims)
}

/// Verify an access token the way a registry configured with this service's
/// certificate would, including the `kid` header.
///
/// # Errors
///
/// Everything [`verify_token`] reports, plus [`AuthError::InvalidTokenFormat`]
/// when `kid` is missing, malformed, or names a different certificate.
pub async fn verify_access_token(
    token: &str,
    keys: &KeyMaterial,
    settings: &TokenSettings,
) -> Result<AccessClaims> {
    let header = decode_token_header(token)?;
    let kid = header.kid.ok_or_else(|| AuthError::invalid_token_format("missing kid header"))?;
    validate_kid(&kid)?;
    if kid != keys.key_id().await? {
        return Err(AuthError::invalid_token_format("kid does not match the signing certificate"));
    }

    let key = keys.decoding_key().await?;
    verify_token(token, &key, &settings.audience, &settings.issuer)
}
