use std::sync::atomic::{AtomicI64, Ordering};

use serde::Serialize;

use crate::trytes::Trytes;

/// A unit of proof-of-work: `{ id, difficulty, trytes }`. `id` is non-zero
/// and monotonically assigned; uniqueness across the lifetime of one job is
/// all that's required, so a process-wide counter seeded from wall-clock
/// seconds is sufficient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: i64,
    pub difficulty: i64,
    pub trytes: Trytes,
}

static NEXT_ID: AtomicI64 = AtomicI64::new(1);

/// Assigns the next task id. Never returns 0, so callers can use `id == 0`
/// as "no task" the way the worker-control responses do.
pub fn next_task_id() -> i64 {
    let seed = i64::try_from(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0),
    )
    .unwrap_or(1)
    .max(1);

    NEXT_ID
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
            Some(prev.max(seed) + 1)
        })
        .unwrap_or(seed)
}

impl Task {
    pub fn new(difficulty: i64, trytes: Trytes) -> Self {
        Self {
            id: next_task_id(),
            difficulty,
            trytes,
        }
    }
}
