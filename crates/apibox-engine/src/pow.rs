//! The PoW primitive: `pow(trytes, difficulty) -> nonce`, globally
//! cancellable via a sentinel call rather than per-invocation, matching
//! the source's single shared cancel flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use apibox_core::trytes::Trytes;

use crate::transaction::valid_nonce;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("pow cancelled")]
pub struct PowCancelled;

struct PowEngineState {
    cancelled: AtomicBool,
}

/// Process-wide PoW service. There is exactly one: the dispatcher and the
/// embedded worker both call `global()` rather than constructing their own.
pub struct PowEngine {
    state: &'static PowEngineState,
}

static STATE: OnceLock<PowEngineState> = OnceLock::new();

impl PowEngine {
    pub fn global() -> PowEngine {
        let state = STATE.get_or_init(|| PowEngineState {
            cancelled: AtomicBool::new(false),
        });
        PowEngine { state }
    }

    /// Advisory sentinel cancel (`pow("", 0)` in the source). Affects the
    /// run currently in flight, if any; process-wide, not scoped to a task.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
    }

    fn clear_cancel(&self) {
        self.state.cancelled.store(false, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Searches nonce space starting from the all-`9` nonce, checking a
    /// shared difficulty predicate. Blocks the calling (blocking) thread
    /// until a winning nonce is found or `cancel()` is observed.
    pub fn run(&self, trytes: Trytes, difficulty: i64) -> Result<Trytes, PowCancelled> {
        self.clear_cancel();
        let mut candidate = trytes;
        let mut tries: u64 = 0;
        loop {
            if valid_nonce(&candidate, difficulty) {
                return Ok(candidate);
            }
            if self.is_cancelled() {
                return Err(PowCancelled);
            }
            tries += 1;
            candidate = candidate.step(1);
            if tries % 4096 == 0 && self.is_cancelled() {
                return Err(PowCancelled);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_a_winning_nonce_at_low_difficulty() {
        let engine = PowEngine::global();
        let trytes = Trytes::parse(&"9".repeat(apibox_core::trytes::NONCE_LEN)).unwrap();
        let won = engine.run(trytes, 1).unwrap();
        assert!(crate::transaction::valid_nonce(&won, 1));
    }

    #[test]
    fn cancel_before_run_has_no_lingering_effect() {
        let engine = PowEngine::global();
        engine.cancel();
        let trytes = Trytes::parse(&"9".repeat(apibox_core::trytes::NONCE_LEN)).unwrap();
        // run() clears the flag on entry, so a stale cancel from a prior job
        // must not immediately abort this one.
        let won = engine.run(trytes, 1).unwrap();
        assert!(crate::transaction::valid_nonce(&won, 1));
    }
}
