//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Async functions MUST NOT use blocking I/O.
//! **Required**: `tokio::fs`, `tokio::io`, async `reqwest`
//!
//! **Acceptable**: blocking I/O in plain functions (config and preference
//! files are read before the coordinator starts), test code

use architectural_enforcement::{assert_clean, in_async_fn, scan};

const FORBIDDEN: &[&str] = &[
    "std::fs::",
    "std::net::",
    "std::process::Command",
    "reqwest::blocking",
    "std::io::stdin()",
    "std::io::stdout()",
];

#[test]
fn test_no_blocking_io_in_async_functions() {
    let violations = scan(|_, lines, idx| {
        let code = &lines[idx].code;
        FORBIDDEN.iter().any(|pattern| code.contains(pattern)) && in_async_fn(lines, idx)
    });

    assert_clean(
        "Blocking I/O inside async functions",
        "Use tokio::fs / tokio::io, or move the call into a plain function run before the runtime work starts.",
        &violations,
    );
}
