//! Fuzz target for registry scope parsing.
//!
//! Scopes arrive straight from the query string, so any UTF-8 input must
//! parse into access entries without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use registry_auth_authn::scope::{AccessRequest, ScopeParam, parse_scope};

fuzz_target!(|data: &[u8]| {
    let Ok(scope) = std::str::from_utf8(data) else {
        return;
    };

    let single = ScopeParam::from(scope);
    let entries = parse_scope(&single);
    assert_eq!(entries.is_empty(), single.is_empty());

    let many = ScopeParam::from(scope.split('\n').map(str::to_owned).collect::<Vec<_>>());
    for access in parse_scope(&many) {
        let _ = access.is_pull_only();
        let _ = access.is_repository();
        let _ = access.repository_key();
    }

    let _ = AccessRequest::parse(scope);
});
