//! Embedded PoW worker (C7): in standalone mode, consumes tasks from the
//! same dispatcher external workers would poll. Does not step its own
//! trytes — it is worker 0, so external workers (stepping from 1) never
//! collide with it.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::dispatcher::Dispatcher;
use crate::pow::PowEngine;
use apibox_core::trytes::NONCE_LEN;

/// Runs forever, alternating between waiting for an offered task and
/// computing its PoW. Intended to be spawned once when `standalone` is
/// configured.
pub async fn run(dispatcher: Arc<Dispatcher>) {
    loop {
        let task = dispatcher.claim_embedded().await;
        debug!(task_id = task.id, "embedded worker claimed task");

        let engine = PowEngine::global();
        let trytes = task.trytes.clone();
        let difficulty = task.difficulty;
        let result =
            tokio::task::spawn_blocking(move || engine.run(trytes, difficulty)).await;

        match result {
            Ok(Ok(won)) => {
                let nonce_start = won.len().saturating_sub(NONCE_LEN);
                let nonce = match apibox_core::trytes::Trytes::parse(&won.as_str()[nonce_start..])
                {
                    Ok(n) => n,
                    Err(err) => {
                        warn!(task_id = task.id, %err, "embedded worker produced an invalid nonce");
                        continue;
                    }
                };
                if let Err(err) = dispatcher.complete(task.id, &nonce) {
                    debug!(task_id = task.id, %err, "embedded worker result was stale");
                }
            }
            Ok(Err(_cancelled)) => {
                debug!(task_id = task.id, "embedded worker pow cancelled, moving on");
            }
            Err(join_err) => {
                warn!(%join_err, "embedded worker pow task panicked");
            }
        }
    }
}
