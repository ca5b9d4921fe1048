//! Token header validation.
//!
//! Registry tokens are always RS256 with a certificate-derived `kid`.
//! Verifiers use these checks before touching the signature so an attacker
//! cannot downgrade to a symmetric algorithm or `none`.

use crate::{
    error::AuthError,
    keys::{KEY_ID_ALPHABET, KEY_ID_DIGEST_BYTES, KEY_ID_GROUP_LEN},
};

/// Forbidden JWT algorithms that are never accepted.
///
/// - `none`: no signature at all
/// - `HS256`, `HS384`, `HS512`: symmetric; the public certificate would become the shared secret
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none", "HS256", "HS384", "HS512"];

/// Accepted JWT algorithms. Registries only understand RS256 from this service.
pub const ACCEPTED_ALGORITHMS: &[&str] = &["RS256"];

/// Validate a JWT algorithm name against the policy.
///
/// # Errors
///
/// Returns [`AuthError::UnsupportedAlgorithm`] if the algorithm is forbidden
/// or not in [`ACCEPTED_ALGORITHMS`].
///
/// # Examples
///
/// ```
/// use registry_auth_authn::validation::validate_algorithm;
///
/// assert!(validate_algorithm("RS256").is_ok());
/// assert!(validate_algorithm("HS256").is_err());
/// assert!(validate_algorithm("EdDSA").is_err());
/// ```
pub fn validate_algorithm(alg: &str) -> Result<(), AuthError> {
    if FORBIDDEN_ALGORITHMS.contains(&alg) {
        return Err(AuthError::unsupported_algorithm(format!(
            "Algorithm '{alg}' is not allowed for security reasons"
        )));
    }

    if !ACCEPTED_ALGORITHMS.contains(&alg) {
        return Err(AuthError::unsupported_algorithm(format!(
            "Algorithm '{alg}' is not in accepted list (only RS256 is supported)"
        )));
    }

    Ok(())
}

/// Validate the shape of a `kid` header.
///
/// A well-formed key id has 12 groups of 4 characters from
/// [`KEY_ID_ALPHABET`] separated by `:`.
///
/// # Errors
///
/// Returns [`AuthError::InvalidTokenFormat`] describing the first problem.
pub fn validate_kid(kid: &str) -> Result<(), AuthError> {
    let expected_groups = KEY_ID_DIGEST_BYTES * 8 / 5 / KEY_ID_GROUP_LEN;
    let groups: Vec<&str> = kid.split(':').collect();

    if groups.len() != expected_groups {
        return Err(AuthError::invalid_token_format(format!(
            "kid must have {expected_groups} groups, found {}",
            groups.len()
        )));
    }

    for group in groups {
        if group.len() != KEY_ID_GROUP_LEN {
            return Err(AuthError::invalid_token_format(format!(
                "kid group '{group}' must be {KEY_ID_GROUP_LEN} characters"
            )));
        }
        if let Some(bad) = group.bytes().find(|b| !KEY_ID_ALPHABET.contains(b)) {
            return Err(AuthError::invalid_token_format(format!(
                "kid contains invalid character '{}'",
                char::from(bad)
            )));
        }
    }

    Ok(())
}
