//! Cooperative cancellation: the caller-owned [`Interrupt`] and the per-attempt abort token.
//!
//! Threads cannot be interrupted from the outside, so the "interrupted" condition
//! of a calling thread is an explicit token carried in the per-call `Config`.
//! The library only ever reads it; clearing it is the caller's business.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Granularity at which blocking waits re-check their tokens.
pub(crate) const POLL_SLICE: Duration = Duration::from_millis(20);

/// Returned by [`Interrupt::sleep`] when the token is (or becomes) set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

impl std::fmt::Display for Interrupted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "interrupted")
    }
}

impl std::error::Error for Interrupted {}

/// Shared interrupted flag for one logical call chain. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. In-flight attempts abort and retry loops stop.
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Reset the flag (caller-side acknowledgement).
    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Sleep for `duration`, waking early with `Err(Interrupted)` if the flag is set.
    /// A duration too large for the clock sleeps until interrupted.
    pub fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        let deadline = Instant::now().checked_add(duration);
        loop {
            if self.is_interrupted() {
                return Err(Interrupted);
            }
            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(());
                    }
                    (deadline - now).min(POLL_SLICE)
                }
                None => POLL_SLICE,
            };
            std::thread::sleep(slice);
        }
    }
}

/// Abort token for one attempt: set by the waiting caller, polled by the worker.
#[derive(Debug, Clone, Default)]
pub(crate) struct AbortToken(Arc<AtomicBool>);

impl AbortToken {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
