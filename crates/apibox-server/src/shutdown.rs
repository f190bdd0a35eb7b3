use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownEvent {
    Graceful,
    Immediate,
}

#[derive(Debug)]
pub struct ShutdownController {
    forced: AtomicU8,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self {
            forced: AtomicU8::new(0),
        }
    }

    fn bump_forced(&self) -> u8 {
        self.forced.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// First Ctrl+C asks the server to drain in-flight requests and stop;
/// second Ctrl+C forces an immediate exit.
pub fn spawn_ctrl_c_handler(shutdown: Arc<ShutdownController>) -> watch::Receiver<Option<ShutdownEvent>> {
    let (tx, rx) = watch::channel(None);
    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            let n = shutdown.bump_forced();
            if n == 1 {
                let _ = tx.send(Some(ShutdownEvent::Graceful));
            } else {
                let _ = tx.send(Some(ShutdownEvent::Immediate));
                return;
            }
        }
    });
    rx
}
