// src/pipeline/gate.rs

//! Bootstrap gate.
//!
//! Right after start-up every item on a listing page looks new. Until the
//! gate opens, the poll cycle only records what it sees.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;

/// One-way, process-scoped flag. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct BootstrapGate {
    opened: Arc<AtomicBool>,
}

impl BootstrapGate {
    /// A closed gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// An already open gate, for one-off announce runs.
    pub fn opened() -> Self {
        let gate = Self::new();
        gate.open();
        gate
    }

    pub fn elapsed(&self) -> bool {
        self.opened.load(Ordering::Acquire)
    }

    /// Open the gate. Returns `true` if this call opened it.
    pub fn open(&self) -> bool {
        !self.opened.swap(true, Ordering::AcqRel)
    }

    /// Open the gate once `delay` has passed.
    pub fn arm(&self, delay: Duration) -> JoinHandle<()> {
        let gate = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if gate.open() {
                log::info!("[news] bootstrap finished, new items will be announced");
            }
        })
    }
}
