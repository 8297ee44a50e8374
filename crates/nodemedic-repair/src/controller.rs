//! Repair controller — the per-node health state machine.
//!
//! A single control task owns the broken-node store and processes feed
//! events and timer fires in delivery order. An attempt sequence for a
//! node moves through:
//!
//! ```text
//! Pending ──debounce──▶ Verifying ──still unhealthy──▶ Queued/Repairing
//!    ▲                     │                                │
//!    │                healthy │                     timeout timer fires
//!    │                     ▼                                ▼
//!  (record            record removed          attempt failed ── budget left ──▶ Verifying
//!   created)          (success reported                │
//!                      if attempts > 0)           budget exhausted ──▶ record removed,
//!                                                                      attempts-failed reported
//! ```
//!
//! Only the live re-fetch and the repair action itself suspend; map
//! mutation, health computation, and timer arming are synchronous
//! inside the control task, so no locking is needed around the store.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use nodemedic_feed::{FeedEvent, FeedSupervisor, NodeFeed};
use nodemedic_state::{BrokenNode, BrokenNodeStore, HealthSnapshot, NodeName, TimerHandle};

use crate::config::RepairConfig;
use crate::error::{RepairError, RepairResult};
use crate::hooks::{AutoRepair, NodeReader};
use crate::queue::RepairQueue;

/// Messages driving the control task.
enum Msg {
    /// A node add/update from the health feed.
    Feed(FeedEvent),
    /// A debounce or post-timeout verification is due.
    Verify { name: NodeName },
    /// A repair-timeout timer fired.
    Timeout { name: NodeName },
    /// Tear down: drop all records and exit.
    Shutdown,
}

/// Handles owned by a started controller.
struct Running {
    supervisor: FeedSupervisor,
    msgs: mpsc::UnboundedSender<Msg>,
    control: JoinHandle<()>,
}

/// Drives the automated repair workflow for a cluster's nodes.
pub struct RepairController {
    config: RepairConfig,
    feed: Arc<dyn NodeFeed>,
    reader: Arc<dyn NodeReader>,
    repair: Arc<dyn AutoRepair>,
    queue: Arc<RepairQueue>,
    running: Option<Running>,
}

impl RepairController {
    /// Create a stopped controller. Validates the config.
    pub fn new(
        config: RepairConfig,
        feed: Arc<dyn NodeFeed>,
        reader: Arc<dyn NodeReader>,
        repair: Arc<dyn AutoRepair>,
    ) -> RepairResult<Self> {
        config.validate()?;
        let queue = Arc::new(RepairQueue::new(config.concurrency));
        Ok(Self {
            config,
            feed,
            reader,
            repair,
            queue,
            running: None,
        })
    }

    /// Start the workflow.
    ///
    /// Spawns the control task, establishes the feed subscription, and
    /// only once the subscription is confirmed active releases the
    /// repair queue. Errors if called on an already-started controller.
    pub async fn start(&mut self) -> RepairResult<()> {
        if self.running.is_some() {
            return Err(RepairError::AlreadyStarted);
        }

        let (msgs, msg_rx) = mpsc::unbounded_channel();

        let control = ControlTask {
            config: self.config.clone(),
            store: BrokenNodeStore::new(),
            reader: self.reader.clone(),
            repair: self.repair.clone(),
            queue: self.queue.clone(),
            msgs: msgs.clone(),
        };
        let control = tokio::spawn(control.run(msg_rx));

        // Bridge feed events into the control channel so feed and timer
        // processing stay serialized on one task.
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<FeedEvent>();
        let bridge = msgs.clone();
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                if bridge.send(Msg::Feed(event)).is_err() {
                    break;
                }
            }
        });

        let mut supervisor = FeedSupervisor::new(self.feed.clone(), event_tx);
        if let Err(err) = supervisor.start().await {
            control.abort();
            return Err(err.into());
        }

        // Feed confirmed active: repairs may now run.
        self.queue.start();

        info!(
            concurrency = self.config.concurrency,
            max_attempts = self.config.max_attempts,
            "repair controller started"
        );

        self.running = Some(Running {
            supervisor,
            msgs,
            control,
        });
        Ok(())
    }

    /// Stop the workflow.
    ///
    /// Clears queued repair tasks, tears down the feed subscription,
    /// and drops every broken-node record, cancelling its pending
    /// timer. Repair actions already dispatched are left to drain.
    pub async fn stop(&mut self) {
        let Some(mut running) = self.running.take() else {
            return;
        };

        self.queue.clear();
        running.supervisor.stop();

        let _ = running.msgs.send(Msg::Shutdown);
        let _ = running.control.await;

        info!("repair controller stopped");
    }

    /// Number of repair actions currently executing.
    pub fn repairs_in_flight(&self) -> usize {
        self.queue.in_flight()
    }
}

impl Drop for RepairController {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.control.abort();
        }
    }
}

/// The single-owner control loop.
struct ControlTask {
    config: RepairConfig,
    store: BrokenNodeStore,
    reader: Arc<dyn NodeReader>,
    repair: Arc<dyn AutoRepair>,
    queue: Arc<RepairQueue>,
    msgs: mpsc::UnboundedSender<Msg>,
}

impl ControlTask {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Msg>) {
        while let Some(msg) = rx.recv().await {
            match msg {
                Msg::Feed(event) => self.handle_feed(event),
                Msg::Verify { name } => self.verify(&name).await,
                Msg::Timeout { name } => self.handle_timeout(&name).await,
                Msg::Shutdown => break,
            }
        }

        // Dropping the records aborts their pending timers.
        let dropped = self.store.drain().count();
        if dropped > 0 {
            debug!(records = dropped, "dropped in-flight repair records on shutdown");
        }
    }

    /// Debounce step: react to an observed node state.
    fn handle_feed(&mut self, event: FeedEvent) {
        let node = event.node;
        let name = node.name.clone();
        let snapshot = HealthSnapshot::of(&node);

        if snapshot.healthy {
            if let Some(record) = self.store.remove(&name) {
                let attempts = record.attempts();
                drop(record); // cancels any pending timer
                if attempts > 0 {
                    info!(node = %name, attempts, "node recovered");
                    self.repair.repair_success(&node, attempts);
                } else {
                    debug!(node = %name, "node recovered before the first repair attempt");
                }
            }
            return;
        }

        if self.store.contains(&name) {
            // An in-flight attempt sequence owns this node already.
            return;
        }

        // Debounce from the transition time, not the observation time,
        // so a node that was already down waits only the remainder.
        let down = snapshot.down_time(SystemTime::now());
        let wait = self.config.unhealthy_time.saturating_sub(down);
        debug!(
            node = %name,
            down_secs = down.as_secs(),
            wait_secs = wait.as_secs(),
            "node unhealthy, verification scheduled"
        );

        let mut record = BrokenNode::new(node);
        record.timer = Some(self.arm(&name, wait, Due::Verify));
        self.store.insert(&name, record);
    }

    /// Freshness verification: re-fetch the live node, then either
    /// close out the sequence or dispatch the next repair attempt.
    async fn verify(&mut self, name: &str) {
        if !self.store.contains(name) {
            // Stale timer fire for a node that recovered meanwhile.
            return;
        }
        if let Some(record) = self.store.get_mut(name) {
            record.timer = None;
        }

        let node = match self.reader.get_node(name).await {
            Ok(Some(node)) => node,
            Ok(None) => {
                info!(node = %name, "node gone from the cluster, dropping repair record");
                self.store.remove(name);
                return;
            }
            Err(err) => {
                warn!(node = %name, error = %err, "node fetch failed, re-verifying later");
                let timer = self.arm(name, self.config.repair_timeout, Due::Verify);
                if let Some(record) = self.store.get_mut(name) {
                    record.timer = Some(timer);
                }
                return;
            }
        };

        if HealthSnapshot::of(&node).healthy {
            // Stale-read race resolved in the node's favor: no repair
            // is enqueued and no timeout timer armed this cycle.
            if let Some(record) = self.store.remove(name) {
                let attempts = record.attempts();
                drop(record);
                if attempts > 0 {
                    info!(node = %name, attempts, "node verified healthy");
                    self.repair.repair_success(&node, attempts);
                }
            }
            return;
        }

        // Still unhealthy: dispatch a repair and arm the timeout
        // immediately, without waiting for the task to start or finish.
        let Some(record) = self.store.get_mut(name) else {
            return;
        };
        record.node = node.clone();
        let attempts = record.attempts.clone();
        let repair = self.repair.clone();
        self.queue.push(async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            debug!(node = %node.name, attempt, "repair dispatched");
            if let Err(err) = repair.repair(node, attempt).await {
                warn!(error = %err, "repair attempt returned an error");
            }
        });

        let timer = self.arm(name, self.config.repair_timeout, Due::Timeout);
        if let Some(record) = self.store.get_mut(name) {
            record.timer = Some(timer);
        }
    }

    /// The repair timeout elapsed without the node recovering.
    async fn handle_timeout(&mut self, name: &str) {
        let Some(record) = self.store.get_mut(name) else {
            return;
        };
        record.timer = None;
        let attempts = record.attempts();
        let node = record.node.clone();

        warn!(node = %name, attempts, "repair attempt did not restore health in time");
        self.repair.repair_attempt_failed(&node, attempts);

        if attempts >= self.config.max_attempts {
            warn!(node = %name, attempts, "attempt budget exhausted, giving up");
            self.repair.repair_attempts_failed(&node, attempts);
            self.store.remove(name);
        } else {
            // Straight back to verification, no extra delay.
            self.verify(name).await;
        }
    }

    /// Arm a timer that posts `due` for `name` after `wait`.
    fn arm(&self, name: &str, wait: Duration, due: Due) -> TimerHandle {
        let msgs = self.msgs.clone();
        let name = name.to_string();
        TimerHandle::new(tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            let msg = match due {
                Due::Verify => Msg::Verify { name },
                Due::Timeout => Msg::Timeout { name },
            };
            let _ = msgs.send(msg);
        }))
    }
}

/// What an armed timer is for.
#[derive(Clone, Copy)]
enum Due {
    Verify,
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::SystemTime;

    use tokio::time::Instant;

    use nodemedic_feed::{FeedError, FeedEventKind, FeedItem, StartFuture};
    use nodemedic_state::Node;

    use crate::hooks::{FetchFuture, RepairFuture};

    fn unhealthy_node(name: &str) -> Node {
        Node::with_readiness(name, "False", SystemTime::now())
    }

    fn unhealthy_for(name: &str, secs: u64) -> Node {
        Node::with_readiness(name, "False", SystemTime::now() - Duration::from_secs(secs))
    }

    fn healthy_node(name: &str) -> Node {
        Node::with_readiness(name, "True", SystemTime::now())
    }

    /// Feed the tests drive by hand.
    struct TestFeed {
        senders: Mutex<Vec<mpsc::Sender<FeedItem>>>,
        stopped: AtomicBool,
    }

    impl TestFeed {
        fn new() -> Self {
            Self {
                senders: Mutex::new(Vec::new()),
                stopped: AtomicBool::new(false),
            }
        }

        async fn emit(&self, node: Node) {
            let tx = self
                .senders
                .lock()
                .unwrap()
                .last()
                .cloned()
                .expect("feed not started");
            tx.send(FeedItem::Event(FeedEvent {
                kind: FeedEventKind::Updated,
                node,
            }))
            .await
            .unwrap();
        }
    }

    impl NodeFeed for TestFeed {
        fn start(&self) -> StartFuture<'_> {
            Box::pin(async move {
                if self.stopped.load(Ordering::SeqCst) {
                    return Err(FeedError::Aborted);
                }
                let (tx, rx) = mpsc::channel(64);
                self.senders.lock().unwrap().push(tx);
                Ok(rx)
            })
        }

        fn stop(&self) {
            self.stopped.store(true, Ordering::SeqCst);
            for tx in self.senders.lock().unwrap().iter() {
                let _ = tx.try_send(FeedItem::Error(FeedError::Aborted));
            }
        }
    }

    /// Per-call outcome of the live node fetch.
    enum Read {
        Healthy,
        Unhealthy,
        Gone,
        Fail,
    }

    /// Live reader with per-node scripted outcomes; unscripted calls
    /// report the node still unhealthy.
    struct ScriptedReader {
        script: Mutex<HashMap<String, VecDeque<Read>>>,
        calls: Mutex<Vec<(String, Instant)>>,
    }

    impl ScriptedReader {
        fn new() -> Self {
            Self {
                script: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn script(self, name: &str, outcomes: Vec<Read>) -> Self {
            self.script
                .lock()
                .unwrap()
                .insert(name.to_string(), outcomes.into_iter().collect());
            self
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
        }
    }

    impl NodeReader for ScriptedReader {
        fn get_node<'a>(&'a self, name: &'a str) -> FetchFuture<'a> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push((name.to_string(), Instant::now()));

                let outcome = self
                    .script
                    .lock()
                    .unwrap()
                    .get_mut(name)
                    .and_then(|q| q.pop_front())
                    .unwrap_or(Read::Unhealthy);

                match outcome {
                    Read::Healthy => Ok(Some(healthy_node(name))),
                    Read::Unhealthy => Ok(Some(unhealthy_node(name))),
                    Read::Gone => Ok(None),
                    Read::Fail => Err(anyhow::anyhow!("node fetch failed")),
                }
            })
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Repair(String, u32),
        Success(String, u32),
        AttemptFailed(String, u32),
        AttemptsFailed(String, u32),
    }

    /// Records every callback; `repair` optionally takes a while.
    struct RecordingRepair {
        calls: Mutex<Vec<Call>>,
        delay: Duration,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl RecordingRepair {
        fn new() -> Self {
            Self::with_delay(Duration::ZERO)
        }

        fn with_delay(delay: Duration) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                delay,
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn peak_concurrency(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    impl AutoRepair for RecordingRepair {
        fn repair(&self, node: Node, attempts: u32) -> RepairFuture<'_> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push(Call::Repair(node.name.clone(), attempts));
                let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(running, Ordering::SeqCst);
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                self.active.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            })
        }

        fn repair_success(&self, node: &Node, attempts: u32) {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Success(node.name.clone(), attempts));
        }

        fn repair_attempt_failed(&self, node: &Node, attempts: u32) {
            self.calls
                .lock()
                .unwrap()
                .push(Call::AttemptFailed(node.name.clone(), attempts));
        }

        fn repair_attempts_failed(&self, node: &Node, attempts: u32) {
            self.calls
                .lock()
                .unwrap()
                .push(Call::AttemptsFailed(node.name.clone(), attempts));
        }
    }

    struct Harness {
        controller: RepairController,
        feed: Arc<TestFeed>,
        reader: Arc<ScriptedReader>,
        repair: Arc<RecordingRepair>,
    }

    async fn started(
        config: RepairConfig,
        reader: ScriptedReader,
        repair: RecordingRepair,
    ) -> Harness {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();

        let feed = Arc::new(TestFeed::new());
        let reader = Arc::new(reader);
        let repair = Arc::new(repair);

        let mut controller = RepairController::new(
            config,
            feed.clone(),
            reader.clone(),
            repair.clone(),
        )
        .unwrap();
        controller.start().await.unwrap();

        Harness {
            controller,
            feed,
            reader,
            repair,
        }
    }

    fn quick_config() -> RepairConfig {
        RepairConfig {
            concurrency: 1,
            max_attempts: 3,
            unhealthy_time: Duration::ZERO,
            repair_timeout: Duration::from_secs(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_waits_full_unhealthy_time() {
        let config = RepairConfig {
            unhealthy_time: Duration::from_secs(60),
            repair_timeout: Duration::from_secs(1000),
            ..RepairConfig::default()
        };
        let h = started(config, ScriptedReader::new(), RecordingRepair::new()).await;
        let t0 = Instant::now();

        h.feed.emit(unhealthy_node("node-a")).await;
        tokio::time::sleep(Duration::from_secs(61)).await;

        let times = h.reader.call_times();
        assert_eq!(times.len(), 1);
        assert!(times[0] - t0 >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_counts_existing_downtime() {
        let config = RepairConfig {
            unhealthy_time: Duration::from_secs(60),
            repair_timeout: Duration::from_secs(1000),
            ..RepairConfig::default()
        };
        let h = started(config, ScriptedReader::new(), RecordingRepair::new()).await;
        let t0 = Instant::now();

        // Already down for 45s: only the remaining 15s are waited.
        h.feed.emit(unhealthy_for("node-a", 45)).await;
        tokio::time::sleep(Duration::from_secs(30)).await;

        let times = h.reader.call_times();
        assert_eq!(times.len(), 1);
        let waited = times[0] - t0;
        assert!(waited >= Duration::from_secs(15) && waited <= Duration::from_secs(16));
    }

    #[tokio::test(start_paused = true)]
    async fn recovery_before_debounce_cancels_the_sequence() {
        let config = RepairConfig {
            unhealthy_time: Duration::from_secs(60),
            ..RepairConfig::default()
        };
        let h = started(config, ScriptedReader::new(), RecordingRepair::new()).await;

        h.feed.emit(unhealthy_node("node-a")).await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        h.feed.emit(healthy_node("node-a")).await;

        tokio::time::sleep(Duration::from_secs(200)).await;
        assert_eq!(h.reader.call_count(), 0);
        // Zero attempts were made, so no success is reported either.
        assert!(h.repair.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn verification_finding_healthy_ends_quietly() {
        let reader = ScriptedReader::new().script("node-a", vec![Read::Healthy]);
        let h = started(quick_config(), reader, RecordingRepair::new()).await;

        h.feed.emit(unhealthy_node("node-a")).await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(h.reader.call_count(), 1);
        assert!(h.repair.calls().is_empty());

        // The record is gone: a fresh unhealthy observation starts a
        // new sequence.
        h.feed.emit(unhealthy_node("node-a")).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.reader.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_attempt_reverifies_after_timeout() {
        let h = started(quick_config(), ScriptedReader::new(), RecordingRepair::new()).await;

        h.feed.emit(unhealthy_node("node-a")).await;
        tokio::time::sleep(Duration::from_secs(15)).await;

        assert_eq!(
            h.repair.calls(),
            vec![
                Call::Repair("node-a".to_string(), 1),
                Call::AttemptFailed("node-a".to_string(), 1),
                Call::Repair("node-a".to_string(), 2),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn single_attempt_budget_scenario() {
        // unhealthy_time=0, repair_timeout=10, max_attempts=1.
        let config = RepairConfig {
            max_attempts: 1,
            ..quick_config()
        };
        let h = started(config, ScriptedReader::new(), RecordingRepair::new()).await;

        h.feed.emit(unhealthy_node("node-a")).await;
        tokio::time::sleep(Duration::from_secs(50)).await;

        assert_eq!(
            h.repair.calls(),
            vec![
                Call::Repair("node-a".to_string(), 1),
                Call::AttemptFailed("node-a".to_string(), 1),
                Call::AttemptsFailed("node-a".to_string(), 1),
            ]
        );
        assert_eq!(h.reader.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_three_attempts_exactly_once() {
        let h = started(quick_config(), ScriptedReader::new(), RecordingRepair::new()).await;

        h.feed.emit(unhealthy_node("node-a")).await;
        tokio::time::sleep(Duration::from_secs(100)).await;

        let name = "node-a".to_string();
        assert_eq!(
            h.repair.calls(),
            vec![
                Call::Repair(name.clone(), 1),
                Call::AttemptFailed(name.clone(), 1),
                Call::Repair(name.clone(), 2),
                Call::AttemptFailed(name.clone(), 2),
                Call::Repair(name.clone(), 3),
                Call::AttemptFailed(name.clone(), 3),
                Call::AttemptsFailed(name.clone(), 3),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn new_episode_after_give_up_starts_fresh() {
        let config = RepairConfig {
            max_attempts: 1,
            ..quick_config()
        };
        let h = started(config, ScriptedReader::new(), RecordingRepair::new()).await;

        h.feed.emit(unhealthy_node("node-a")).await;
        tokio::time::sleep(Duration::from_secs(50)).await;

        // Recovers, then breaks again: the attempt counter restarts.
        h.feed.emit(healthy_node("node-a")).await;
        h.feed.emit(unhealthy_node("node-a")).await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        let repairs: Vec<_> = h
            .repair
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Repair(_, _)))
            .collect();
        assert_eq!(
            repairs,
            vec![
                Call::Repair("node-a".to_string(), 1),
                Call::Repair("node-a".to_string(), 1),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn recovery_during_attempt_cancels_timeout() {
        let config = RepairConfig {
            repair_timeout: Duration::from_secs(100),
            ..quick_config()
        };
        let h = started(config, ScriptedReader::new(), RecordingRepair::new()).await;

        h.feed.emit(unhealthy_node("node-a")).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        h.feed.emit(healthy_node("node-a")).await;

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(
            h.repair.calls(),
            vec![
                Call::Repair("node-a".to_string(), 1),
                Call::Success("node-a".to_string(), 1),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_unhealthy_events_are_ignored() {
        let config = RepairConfig {
            repair_timeout: Duration::from_secs(1000),
            ..quick_config()
        };
        let h = started(config, ScriptedReader::new(), RecordingRepair::new()).await;

        h.feed.emit(unhealthy_node("node-a")).await;
        h.feed.emit(unhealthy_node("node-a")).await;
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert_eq!(h.reader.call_count(), 1);
        assert_eq!(
            h.repair.calls(),
            vec![Call::Repair("node-a".to_string(), 1)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_cap_holds_across_nodes() {
        let config = RepairConfig {
            concurrency: 2,
            repair_timeout: Duration::from_secs(10_000),
            ..quick_config()
        };
        let repair = RecordingRepair::with_delay(Duration::from_secs(50));
        let h = started(config, ScriptedReader::new(), repair).await;

        for name in ["node-a", "node-b", "node-c", "node-d"] {
            h.feed.emit(unhealthy_node(name)).await;
        }
        tokio::time::sleep(Duration::from_secs(200)).await;

        assert_eq!(h.repair.peak_concurrency(), 2);
        let repairs = h
            .repair
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Repair(_, _)))
            .count();
        assert_eq!(repairs, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_keeps_the_sequence_alive() {
        let reader = ScriptedReader::new().script("node-a", vec![Read::Fail, Read::Healthy]);
        let h = started(quick_config(), reader, RecordingRepair::new()).await;

        h.feed.emit(unhealthy_node("node-a")).await;
        tokio::time::sleep(Duration::from_secs(15)).await;

        // Failed fetch consumed no attempt; the retry found it healthy.
        assert_eq!(h.reader.call_count(), 2);
        assert!(h.repair.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn vanished_node_drops_the_record() {
        let reader = ScriptedReader::new().script("node-a", vec![Read::Gone]);
        let h = started(quick_config(), reader, RecordingRepair::new()).await;

        h.feed.emit(unhealthy_node("node-a")).await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(h.reader.call_count(), 1);
        assert!(h.repair.calls().is_empty());

        // A later observation starts over.
        h.feed.emit(unhealthy_node("node-a")).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.reader.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_pending_work() {
        let config = RepairConfig {
            unhealthy_time: Duration::from_secs(60),
            ..RepairConfig::default()
        };
        let mut h = started(config, ScriptedReader::new(), RecordingRepair::new()).await;

        h.feed.emit(unhealthy_node("node-a")).await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        h.controller.stop().await;
        tokio::time::sleep(Duration::from_secs(500)).await;

        assert_eq!(h.reader.call_count(), 0);
        assert!(h.repair.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_errors() {
        let mut h = started(quick_config(), ScriptedReader::new(), RecordingRepair::new()).await;
        let err = h.controller.start().await.unwrap_err();
        assert!(matches!(err, RepairError::AlreadyStarted));
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = RepairConfig {
            concurrency: 0,
            ..RepairConfig::default()
        };
        let result = RepairController::new(
            config,
            Arc::new(TestFeed::new()),
            Arc::new(ScriptedReader::new()),
            Arc::new(RecordingRepair::new()),
        );
        assert!(matches!(result, Err(RepairError::Config(_))));
    }
}
