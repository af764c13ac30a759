//! Cross-thread behavior of the error channel.

use std::sync::Arc;
use std::sync::Barrier;
use std::thread;
use talos::error::{self, ErrorCode};

#[test]
fn threads_observe_only_their_own_error() {
    let barrier = Arc::new(Barrier::new(2));

    let io_side = {
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            error::clear();
            let _: Option<()> =
                error::raise(ErrorCode::IoError, "disk detached");

            // Both threads hold a raised error at the same time.
            barrier.wait();

            assert_eq!(error::current(), ErrorCode::IoError);
            assert_eq!(error::current_message(), "disk detached");
        })
    };

    let key_side = {
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            error::clear();
            let _: Option<()> =
                error::raise(ErrorCode::KeyError, "no such attribute");

            barrier.wait();

            assert_eq!(error::current(), ErrorCode::KeyError);
            assert_eq!(error::current_message(), "no such attribute");
        })
    };

    io_side.join().unwrap();
    key_side.join().unwrap();
}

#[test]
fn accumulation_is_per_thread() {
    error::clear();
    let _: Option<()> = error::raise(ErrorCode::Overflow, "first");

    let handle = thread::spawn(|| {
        // A fresh thread starts with a clean channel.
        assert_eq!(error::current(), ErrorCode::None);
        let _: Option<()> = error::raise(ErrorCode::Underflow, "other");
        error::current_message()
    });
    assert_eq!(handle.join().unwrap(), "other");

    // The spawned thread never touched this one's accumulation.
    let _: Option<()> = error::raise(ErrorCode::Overflow, "second");
    assert_eq!(error::current(), ErrorCode::Overflow);
    assert_eq!(error::current_message(), "first\nsecond");

    error::clear();
}

#[test]
fn log_warning_leaves_nothing_pending() {
    error::clear();

    talos::log_warning!("slack space on {} ignored", "volume0");

    // The warning was printed and cleared in one step.
    assert_eq!(error::current(), ErrorCode::None);
}

#[test]
fn raise_macro_reports_the_call_site() {
    error::clear();

    fn failing_lookup() -> Option<u32> {
        talos::raise!(ErrorCode::KeyError, "attribute `{}` missing", "mtime")
    }

    assert!(failing_lookup().is_none());
    let message = error::current_message();
    assert!(message.contains("attribute `mtime` missing"));
    assert!(message.contains("error_state.rs"));

    error::clear();
}
