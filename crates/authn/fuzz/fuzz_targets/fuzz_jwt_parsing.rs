//! Fuzz target for registry token parsing.
//!
//! Feeds arbitrary byte strings as tokens to the header and claim decoders
//! and the header policy checks. Every result must be `Ok(...)` or
//! `Err(AuthError)`; nothing may panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use registry_auth_authn::{
    AccessClaims, RefreshClaims,
    jwt::{decode_token_header, decode_unverified_claims},
    validation::{validate_algorithm, validate_kid},
};

fuzz_target!(|data: &[u8]| {
    // Tokens are always UTF-8
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };

    let header_result = decode_token_header(token);
    let _ = decode_unverified_claims::<AccessClaims>(token);
    let _ = decode_unverified_claims::<RefreshClaims>(token);

    if let Ok(ref header) = header_result {
        let _ = validate_algorithm(&format!("{:?}", header.alg));
        if let Some(ref kid) = header.kid {
            let _ = validate_kid(kid);
        }
    }
});
