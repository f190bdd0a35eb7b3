//! The dispatcher: a single-slot job board with rendezvous semantics
//! between one submitter, a pool of workers, and an optional embedded
//! worker. Re-architected from a goroutine/channel soup into an explicit
//! state machine (`Idle` / `Offered` / `Settling`) guarded by one lock plus
//! two `Notify` rendezvous points, per the design notes this crate follows.

use std::sync::Mutex;

use apibox_core::error::DispatchError;
use apibox_core::task::Task;
use apibox_core::trytes::Trytes;
use serde::Serialize;
use tokio::sync::{oneshot, Notify};
use tracing::{debug, warn};

use crate::pow::PowEngine;
use crate::transaction::valid_nonce;

enum SlotState {
    Idle,
    Offered { task: Task, n_workers: u64 },
    Settling,
}

struct Inner {
    state: SlotState,
    result_tx: Option<oneshot::Sender<Trytes>>,
}

/// Read-only projection served by `getstatus`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub task: Option<Task>,
    pub working: bool,
    pub n: u64,
}

pub struct Dispatcher {
    submit_gate: tokio::sync::Mutex<()>,
    inner: Mutex<Inner>,
    offered: Notify,
    settled: Notify,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            submit_gate: tokio::sync::Mutex::new(()),
            inner: Mutex::new(Inner {
                state: SlotState::Idle,
                result_tx: None,
            }),
            offered: Notify::new(),
            settled: Notify::new(),
        }
    }

    /// Blocks until the slot is free, places `task`, and blocks again until
    /// a worker delivers a valid nonce for it. Submitters queue here in
    /// arrival order via `submit_gate`, which is what gives FIFO ordering
    /// across distinct submitters without a separate wait queue.
    pub async fn submit(&self, task: Task) -> Trytes {
        let gate = self.submit_gate.lock().await;
        let task_id = task.id;
        let (tx, rx) = oneshot::channel();
        {
            let mut inner = self.inner.lock().unwrap();
            inner.state = SlotState::Offered { task, n_workers: 0 };
            inner.result_tx = Some(tx);
        }
        debug!(task_id, "task offered to dispatcher slot");
        self.offered.notify_waiters();

        let mut guard = GiveUpGuard {
            dispatcher: self,
            task_id,
            _gate: gate,
            armed: true,
        };
        // The only path that drops `tx` without sending is `give_up`, which
        // only runs from this guard's own `Drop` — unreachable while this
        // future is still being polled.
        let winning = rx
            .await
            .expect("submit result sender is only dropped by this call's own give_up");
        guard.armed = false;
        winning
    }

    /// If the slot is `Offered`, returns immediately with a stepped copy
    /// and bumps the worker count. If `Idle`, blocks until a task is
    /// offered. Never reserves the task: concurrent claimants race.
    pub async fn claim(&self) -> Task {
        loop {
            let notified = self.offered.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut inner = self.inner.lock().unwrap();
                if let SlotState::Offered { task, n_workers } = &mut inner.state {
                    let step = *n_workers + 1;
                    *n_workers += 1;
                    return Task {
                        id: task.id,
                        difficulty: task.difficulty,
                        trytes: task.trytes.step(step),
                    };
                }
            }
            notified.await;
        }
    }

    /// Embedded-worker counterpart to `claim()`: the embedded worker is
    /// worker 0, so it reads the task unstepped and does not bump
    /// `n_workers` — that count is reserved for external `getwork` callers,
    /// which start stepping from 1 and so never collide with it.
    pub async fn claim_embedded(&self) -> Task {
        loop {
            let notified = self.offered.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let inner = self.inner.lock().unwrap();
                if let SlotState::Offered { task, .. } = &inner.state {
                    return task.clone();
                }
            }
            notified.await;
        }
    }

    /// Validates `nonce` against the current task and, on success, hands
    /// the winning trytes to the waiting submitter and clears the slot.
    /// Only the first valid completion per task wins; later calls (wrong
    /// id, already-settled, or failing `valid_nonce`) are rejected.
    pub fn complete(&self, id: i64, nonce: &Trytes) -> Result<(), DispatchError> {
        let (candidate, sender) = {
            let mut inner = self.inner.lock().unwrap();
            let task = match &inner.state {
                SlotState::Offered { task, .. } if task.id == id => task.clone(),
                _ => return Err(DispatchError::Stale),
            };
            let candidate = task.trytes.with_nonce(nonce);
            if !valid_nonce(&candidate, task.difficulty) {
                return Err(DispatchError::InvalidNonce);
            }
            inner.state = SlotState::Settling;
            (candidate, inner.result_tx.take())
        };

        if let Some(sender) = sender {
            let _ = sender.send(candidate);
        }
        {
            let mut inner = self.inner.lock().unwrap();
            inner.state = SlotState::Idle;
        }
        debug!(task_id = id, "task completed, slot cleared");
        self.settled.notify_waiters();
        Ok(())
    }

    /// Long-poll status read: blocks while the slot is `Offered`, so
    /// workers can discover that a job they are not participating in has
    /// finished, then cancel their own local PoW advisory.
    pub async fn snapshot(&self) -> StatusSnapshot {
        loop {
            let notified = self.settled.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let inner = self.inner.lock().unwrap();
                if !matches!(inner.state, SlotState::Offered { .. }) {
                    return Self::snapshot_of(&inner);
                }
            }
            notified.await;
        }
    }

    fn snapshot_of(inner: &Inner) -> StatusSnapshot {
        match &inner.state {
            SlotState::Offered { task, n_workers } => StatusSnapshot {
                task: Some(task.clone()),
                working: true,
                n: *n_workers,
            },
            SlotState::Idle | SlotState::Settling => StatusSnapshot {
                task: None,
                working: false,
                n: 0,
            },
        }
    }

    /// Submitter gave up on `task_id` (HTTP client disconnect): clears the
    /// slot if it is still holding that task, advisory-cancels the PoW
    /// primitive, and wakes anyone long-polling `snapshot`.
    fn give_up(&self, task_id: i64) {
        let cleared = {
            let mut inner = self.inner.lock().unwrap();
            match &inner.state {
                SlotState::Offered { task, .. } if task.id == task_id => {
                    inner.state = SlotState::Idle;
                    inner.result_tx = None;
                    true
                }
                _ => false,
            }
        };
        if cleared {
            warn!(task_id, "submitter gave up, clearing dispatcher slot");
            PowEngine::global().cancel();
            self.settled.notify_waiters();
        }
    }
}

struct GiveUpGuard<'d> {
    dispatcher: &'d Dispatcher,
    task_id: i64,
    _gate: tokio::sync::MutexGuard<'d, ()>,
    armed: bool,
}

impl Drop for GiveUpGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.dispatcher.give_up(self.task_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apibox_core::trytes::NONCE_LEN;

    fn base_trytes() -> Trytes {
        Trytes::parse(&"9".repeat(NONCE_LEN)).unwrap()
    }

    #[tokio::test]
    async fn claim_steps_distinct_workers() {
        let dispatcher = Dispatcher::new();
        let task = Task::new(1, base_trytes());
        let task_id = task.id;

        let submit_fut = dispatcher.submit(task);
        tokio::pin!(submit_fut);

        // drive submit() far enough to offer the task, then claim twice.
        tokio::select! {
            _ = &mut submit_fut => unreachable!("submit should not complete before a worker answers"),
            _ = tokio::task::yield_now() => {}
        }
        let a = dispatcher.claim().await;
        let b = dispatcher.claim().await;
        assert_eq!(a.id, task_id);
        assert_eq!(b.id, task_id);
        assert_ne!(a.trytes, b.trytes);

        // finish the job so the submit future completes. The test trytes
        // are exactly NONCE_LEN long, so the winning trytes string doubles
        // as the nonce itself.
        let won = crate::pow::PowEngine::global().run(b.trytes.clone(), 1).unwrap();
        dispatcher.complete(task_id, &won).ok();
        let _ = tokio::time::timeout(std::time::Duration::from_secs(5), submit_fut).await;
    }

    #[tokio::test]
    async fn claim_embedded_does_not_step_or_bump_worker_count() {
        let dispatcher = Dispatcher::new();
        let task = Task::new(1, base_trytes());
        let task_id = task.id;

        let submit_fut = dispatcher.submit(task.clone());
        tokio::pin!(submit_fut);
        tokio::select! {
            _ = &mut submit_fut => unreachable!("submit should not complete before a worker answers"),
            _ = tokio::task::yield_now() => {}
        }

        let embedded = dispatcher.claim_embedded().await;
        assert_eq!(embedded.trytes, task.trytes);

        // an external worker claiming afterwards still starts stepping from
        // 1, unaffected by the embedded worker's unstepped read.
        let external = dispatcher.claim().await;
        assert_eq!(external.trytes, task.trytes.step(1));

        let won = crate::pow::PowEngine::global()
            .run(external.trytes.clone(), 1)
            .unwrap();
        dispatcher.complete(task_id, &won).ok();
        let _ = tokio::time::timeout(std::time::Duration::from_secs(5), submit_fut).await;
    }

    #[tokio::test]
    async fn stale_completion_is_rejected() {
        let dispatcher = Dispatcher::new();
        let task = Task::new(0, base_trytes());
        let task_id = task.id;
        let submit_fut = dispatcher.submit(task);
        tokio::pin!(submit_fut);
        tokio::select! {
            _ = &mut submit_fut => unreachable!("submit should not complete before a worker answers"),
            _ = tokio::task::yield_now() => {}
        }

        let claimed = dispatcher.claim().await;
        assert_eq!(dispatcher.complete(task_id, &claimed.trytes), Ok(()));
        // second completion for the same id is now stale.
        assert_eq!(
            dispatcher.complete(task_id, &claimed.trytes),
            Err(DispatchError::Stale)
        );
        let _ = tokio::time::timeout(std::time::Duration::from_secs(5), submit_fut).await;
    }

    #[tokio::test]
    async fn wrong_id_is_stale() {
        let dispatcher = Dispatcher::new();
        let task = Task::new(0, base_trytes());
        let submit_fut = dispatcher.submit(task);
        tokio::pin!(submit_fut);
        tokio::task::yield_now().await;

        assert_eq!(
            dispatcher.complete(999_999, &base_trytes()),
            Err(DispatchError::Stale)
        );
    }
}
