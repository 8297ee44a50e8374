//! Repair task queue — bounded parallelism across all nodes.
//!
//! The queue is constructed paused and released once the feed
//! subscription is confirmed active, so no repair runs before the
//! system is fully initialized. Tasks are opaque futures; the queue
//! never retries them — retry pacing belongs to the controller's
//! timeout loop.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;
use tracing::debug;

/// An opaque unit of repair work.
pub type RepairTask = std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>;

struct Shared {
    /// FIFO of tasks not yet started. Tasks stay here until an
    /// execution slot is free, so `clear()` catches everything that has
    /// not begun running.
    pending: Mutex<VecDeque<RepairTask>>,
    /// Wakes the dispatcher when work arrives.
    wake: Notify,
    /// In-flight limit.
    permits: Arc<Semaphore>,
    /// Tasks currently executing.
    running: AtomicUsize,
}

/// Decrements the running counter even if the task panics.
struct RunningGuard(Arc<Shared>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Concurrency-bounded work queue for repair actions.
pub struct RepairQueue {
    shared: Arc<Shared>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl RepairQueue {
    /// Create a paused queue with a fixed concurrency limit.
    ///
    /// Tasks can be pushed right away; none runs until [`start`] spawns
    /// the dispatcher.
    ///
    /// [`start`]: RepairQueue::start
    pub fn new(concurrency: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                pending: Mutex::new(VecDeque::new()),
                wake: Notify::new(),
                permits: Arc::new(Semaphore::new(concurrency)),
                running: AtomicUsize::new(0),
            }),
            dispatcher: Mutex::new(None),
        }
    }

    /// Spawn the dispatcher. Until this is called no task runs.
    /// Calling it again after a shutdown is a no-op.
    pub fn start(&self) {
        let mut dispatcher = self.dispatcher.lock().expect("queue lock poisoned");
        if dispatcher.is_none() && !self.shared.permits.is_closed() {
            *dispatcher = Some(tokio::spawn(dispatch(self.shared.clone())));
            debug!("repair queue started");
        }
    }

    /// Enqueue a repair task.
    pub fn push<F>(&self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.shared
            .pending
            .lock()
            .expect("queue lock poisoned")
            .push_back(Box::pin(task));
        self.shared.wake.notify_one();
    }

    /// Drop all queued-but-not-started tasks. In-flight tasks are
    /// unaffected. Returns how many tasks were dropped.
    pub fn clear(&self) -> usize {
        let mut pending = self.shared.pending.lock().expect("queue lock poisoned");
        let dropped = pending.len();
        pending.clear();
        if dropped > 0 {
            debug!(dropped, "cleared queued repair tasks");
        }
        dropped
    }

    /// Number of tasks waiting for a slot.
    pub fn queued(&self) -> usize {
        self.shared.pending.lock().expect("queue lock poisoned").len()
    }

    /// Number of tasks currently executing.
    pub fn in_flight(&self) -> usize {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Clear queued work and stop dispatching for good.
    pub fn shutdown(&self) {
        self.clear();
        self.shared.permits.close();
        if let Some(dispatcher) = self.dispatcher.lock().expect("queue lock poisoned").take() {
            dispatcher.abort();
        }
    }
}

impl Drop for RepairQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Dispatcher loop: claim an execution slot, then run the next task.
///
/// The slot is claimed first so queued tasks stay in `pending` until
/// they actually start.
async fn dispatch(shared: Arc<Shared>) {
    loop {
        let permit = match shared.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return, // shutdown
        };

        let task = loop {
            let next = shared
                .pending
                .lock()
                .expect("queue lock poisoned")
                .pop_front();
            match next {
                Some(task) => break task,
                None => shared.wake.notified().await,
            }
        };

        shared.running.fetch_add(1, Ordering::SeqCst);
        let guard = RunningGuard(shared.clone());
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
            drop(permit);
        });
    }
}
