//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT sleep for a duration. Every timed
//! behavior (movement ticks, bubble expiry, falls, dozing off) is a deadline
//! the coordinator waits on with `sleep_until`, and the playground paces
//! frames with `tokio::time::interval`.
//!
//! **Exceptions**: test code

use architectural_enforcement::{assert_clean, scan};

#[test]
fn test_no_sleep_in_production_code() {
    let violations = scan(|_, lines, idx| {
        let code = &lines[idx].code;
        code.contains("::sleep(") || code.contains(".sleep(")
    });

    assert_clean(
        "Sleep calls in production code",
        "Use a deadline (tokio::time::sleep_until) or tokio::time::interval instead.",
        &violations,
    );
}

#[test]
fn test_no_thread_sleep_anywhere_in_production_code() {
    let violations = scan(|_, lines, idx| lines[idx].code.contains("thread::sleep"));

    assert_clean(
        "Blocking thread sleeps in production code",
        "The runtime's worker threads must never block.",
        &violations,
    );
}
