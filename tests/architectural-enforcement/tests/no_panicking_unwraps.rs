//! Integration Test: No Panicking Unwraps
//!
//! **Policy**: Production code propagates errors with `?` or handles them.
//! `unwrap()` and `expect()` are for tests only.

use architectural_enforcement::{assert_clean, scan};

#[test]
fn test_no_unwrap_or_expect_in_production_code() {
    let violations = scan(|_, lines, idx| {
        let code = &lines[idx].code;
        code.contains(".unwrap()") || code.contains(".expect(")
    });

    assert_clean(
        "unwrap()/expect() in production code",
        "Return a Result, or use unwrap_or / unwrap_or_default / a match.",
        &violations,
    );
}
