//! Background rebuilds for hosts that cannot rebuild on the UI thread.
//!
//! Requests are queued on a channel and collapsed: however many arrive while
//! a rebuild runs, the worker performs one more rebuild afterwards, over the
//! newest data. The currently served snapshot stays valid throughout.
//!
//! After each batch the worker posts to a single-slot completion channel,
//! which is what [`RebuildWorker::wait_current`] blocks on.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, warn};

use crate::index::CatalogIndex;

/// Owns a thread that rebuilds a [`CatalogIndex`] on request.
///
/// Dropping the worker stops the thread after any rebuild in progress.
pub struct RebuildWorker {
    index: Arc<CatalogIndex>,
    sender: Option<Sender<()>>,
    completed: Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl RebuildWorker {
    /// Start the rebuild thread.
    ///
    /// # Errors
    /// Returns an error if the OS refuses to spawn the thread.
    pub fn spawn(index: Arc<CatalogIndex>) -> std::io::Result<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let (done_tx, completed) = crossbeam_channel::bounded(1);
        let worker_index = Arc::clone(&index);

        let handle = thread::Builder::new()
            .name("catalog-rebuild".to_string())
            .spawn(move || Self::run(worker_index, receiver, done_tx))?;

        Ok(Self {
            index,
            sender: Some(sender),
            completed,
            handle: Some(handle),
        })
    }

    /// Ask for a rebuild. Never blocks.
    pub fn request(&self) {
        if let Some(sender) = &self.sender {
            if sender.send(()).is_err() {
                warn!("Rebuild thread has exited; request dropped");
            }
        }
    }

    /// Wait until the published snapshot reflects the latest change.
    ///
    /// Returns false if `timeout` elapses first.
    ///
    /// Blocks on worker completions and never polls. A change that was
    /// never followed by [`RebuildWorker::request`] waits out the timeout.
    pub fn wait_current(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.index.is_stale() {
                return true;
            }
            if self.completed.recv_deadline(deadline).is_err() {
                return !self.index.is_stale();
            }
        }
    }

    fn run(index: Arc<CatalogIndex>, receiver: Receiver<()>, completed: Sender<()>) {
        while receiver.recv().is_ok() {
            let collapsed = receiver.try_iter().count();
            if collapsed > 0 {
                debug!("Collapsed {collapsed} queued rebuild requests");
            }
            if index.is_stale() {
                index.rebuild();
            }
            // A full slot already wakes the waiter
            let _ = completed.try_send(());
        }
        debug!("Rebuild thread stopping");
    }
}

impl Drop for RebuildWorker {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Rebuild thread panicked");
            }
        }
    }
}
