//! Registry of external processes spawned on behalf of one job.

use std::sync::{Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Kill signal handed to the task that owns a spawned process.
///
/// The owner selects on [`KillSwitch::killed`] while waiting for the child
/// and terminates it forcibly when the switch trips.
#[derive(Debug, Clone)]
pub struct KillSwitch(CancellationToken);

impl KillSwitch {
    #[cfg(test)]
    pub fn is_killed(&self) -> bool {
        self.0.is_cancelled()
    }

    pub async fn killed(&self) {
        self.0.cancelled().await
    }
}

#[derive(Debug)]
struct Entry {
    pid: Option<u32>,
    label: String,
    switch: CancellationToken,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<Entry>,
    killed: bool,
}

/// Ordered collection of handles to a job's spawned fetch processes.
///
/// Workers only append. The job manager trips every switch on cancellation;
/// anything registered afterwards is handed an already-tripped switch so a
/// process spawned during teardown dies immediately.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    inner: Mutex<Inner>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave the entry list invalid.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Records a spawned process and returns its kill switch.
    pub fn register(&self, pid: Option<u32>, label: impl Into<String>) -> KillSwitch {
        let switch = CancellationToken::new();
        let mut inner = self.lock();
        if inner.killed {
            switch.cancel();
        }
        inner.entries.push(Entry {
            pid,
            label: label.into(),
            switch: switch.clone(),
        });
        KillSwitch(switch)
    }

    /// Trips every registered switch. Returns the number of processes signalled.
    pub fn kill_all(&self) -> usize {
        let mut inner = self.lock();
        inner.killed = true;
        let mut signalled = 0;
        for entry in inner.entries.drain(..) {
            if !entry.switch.is_cancelled() {
                debug!("Killing fetch process {:?} ({})", entry.pid, entry.label);
                entry.switch.cancel();
                signalled += 1;
            }
        }
        signalled
    }

    /// Drops all handles without signalling (job finished normally).
    pub fn release(&self) {
        self.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
