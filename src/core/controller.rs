//! Contention controller - Timer-driven monitor loop
//!
//! A single task owns the [`Guard`]. Timer ticks and manual actions are
//! handled one at a time by the same loop, so commands reach the daemon in
//! the order they were decided and ticks never overlap.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::client::ControlClient;
use super::detector::Detector;
use super::guard::{Command, Guard, GuardState, PauseReason, TransitionRecord};
use super::notifier::{Notification, Notifier};

/// Pause/resume requested by a human
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualAction {
    Pause,
    Resume,
}

impl ManualAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pause => "Pause",
            Self::Resume => "Resume",
        }
    }
}

/// Read-only view of the controller, published after every step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuardSnapshot {
    pub state: GuardState,
    /// Verdict of the most recent tick, `None` before the first one
    pub last_verdict: Option<bool>,
    /// Heavy process seen by the most recent tick
    pub last_match: Option<String>,
    pub ticks: u64,
    pub last_transition: Option<TransitionRecord>,
    pub last_manual: Option<(DateTime<Local>, ManualAction)>,
}

type SharedDetector = Arc<Mutex<Box<dyn Detector>>>;

/// Owns the guard state and drives detector, client and notifier
pub struct Controller {
    guard: Guard,
    detector: SharedDetector,
    client: Arc<dyn ControlClient>,
    notifier: Arc<dyn Notifier>,
    snapshot: GuardSnapshot,
    snapshot_tx: watch::Sender<GuardSnapshot>,
}

impl Controller {
    pub fn new(
        guard: Guard,
        detector: Box<dyn Detector>,
        client: Arc<dyn ControlClient>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let snapshot = GuardSnapshot {
            state: guard.current_state(),
            ..Default::default()
        };
        let (snapshot_tx, _) = watch::channel(snapshot.clone());
        Self {
            guard,
            detector: Arc::new(Mutex::new(detector)),
            client,
            notifier,
            snapshot,
            snapshot_tx,
        }
    }

    #[cfg(test)]
    pub fn current_state(&self) -> GuardState {
        self.guard.current_state()
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> &GuardSnapshot {
        &self.snapshot
    }

    pub fn subscribe(&self) -> watch::Receiver<GuardSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Sample the process table off the async runtime.
    ///
    /// A panicking detector counts as "no heavy workload".
    async fn sample(&self) -> Option<String> {
        let detector = Arc::clone(&self.detector);
        let sampled = tokio::task::spawn_blocking(move || {
            // A poisoned lock only means an earlier sample panicked
            let mut detector = detector.lock().unwrap_or_else(|e| e.into_inner());
            detector.find_heavy()
        })
        .await;

        match sampled {
            Ok(found) => found,
            Err(e) => {
                error!("Process sampling failed, treating system as free: {}", e);
                None
            }
        }
    }

    /// Deliver a command. Delivery problems stay inside this call.
    async fn execute(&self, command: Command) {
        let client = Arc::clone(&self.client);
        let delivery = tokio::spawn(async move { client.dispatch(&command).await });
        if let Err(e) = delivery.await {
            error!("Control dispatch aborted: {}", e);
        }
    }

    /// One timer tick: detect, transition, dispatch, notify
    pub async fn tick(&mut self) -> GuardState {
        let found = self.sample().await;
        let heavy = found.is_some();
        let from = self.guard.current_state();
        let (state, command) = self.guard.apply_verdict(heavy);

        self.snapshot.ticks += 1;
        self.snapshot.last_verdict = Some(heavy);
        self.snapshot.last_match = found.clone();
        self.snapshot.state = state;

        if let Some(command) = command {
            let notification = match &command {
                Command::Pause { .. } => {
                    info!(
                        "Pausing daemon: heavy workload {}",
                        found.as_deref().unwrap_or("detected")
                    );
                    Notification::Paused {
                        trigger: found.clone(),
                    }
                }
                Command::Resume => {
                    info!("Resuming daemon: system free");
                    Notification::Resumed
                }
            };

            self.execute(command).await;
            self.snapshot.last_transition = Some(TransitionRecord {
                at: Local::now(),
                from,
                to: state,
                trigger: found,
            });
            self.notifier.notify(&notification);
        } else {
            debug!("Tick {}: state {} unchanged", self.snapshot.ticks, state);
        }

        self.publish();
        state
    }

    /// Manual pause/resume. Goes straight to the daemon and leaves the
    /// automatic guard state untouched.
    pub async fn manual(&mut self, action: ManualAction) {
        info!("Manual {} requested", action.label().to_lowercase());
        let (command, notification) = match action {
            ManualAction::Pause => (
                Command::pause(PauseReason::Manual),
                Notification::ManualPause,
            ),
            ManualAction::Resume => (Command::Resume, Notification::ManualResume),
        };

        self.execute(command).await;
        self.snapshot.last_manual = Some((Local::now(), action));
        self.notifier.notify(&notification);
        self.publish();
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot.clone());
    }

    /// Start the monitor loop on the current tokio runtime
    pub fn spawn(self, interval: Duration) -> ControllerTask {
        let (actions_tx, actions_rx) = mpsc::unbounded_channel();
        let snapshots = self.subscribe();
        let cancel = CancellationToken::new();
        let join = tokio::spawn(self.run(interval, actions_rx, cancel.clone()));

        ControllerTask {
            handle: GuardHandle {
                actions: actions_tx,
                snapshots,
            },
            cancel,
            join,
        }
    }

    async fn run(
        mut self,
        interval: Duration,
        mut actions: mpsc::UnboundedReceiver<ManualAction>,
        cancel: CancellationToken,
    ) {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Monitor loop started (every {:?})", interval);

        loop {
            let action = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(action) = actions.recv() => Some(action),
                _ = ticker.tick() => None,
            };

            // Shutdown does not wait for an in-flight step
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.step(action) => {}
            }
        }

        info!("Monitor loop stopped");
    }

    async fn step(&mut self, action: Option<ManualAction>) {
        match action {
            Some(action) => self.manual(action).await,
            None => {
                self.tick().await;
            }
        }
    }
}

/// Cloneable entry point for the presentation shell
#[derive(Clone)]
pub struct GuardHandle {
    actions: mpsc::UnboundedSender<ManualAction>,
    snapshots: watch::Receiver<GuardSnapshot>,
}

impl GuardHandle {
    /// Queue a manual pause. Returns false once the controller has stopped.
    pub fn pause_now(&self) -> bool {
        self.actions.send(ManualAction::Pause).is_ok()
    }

    /// Queue a manual resume. Returns false once the controller has stopped.
    pub fn resume_now(&self) -> bool {
        self.actions.send(ManualAction::Resume).is_ok()
    }

    pub fn snapshot(&self) -> GuardSnapshot {
        self.snapshots.borrow().clone()
    }

    #[cfg(test)]
    pub fn current_state(&self) -> GuardState {
        self.snapshots.borrow().state
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<GuardSnapshot> {
        self.snapshots.clone()
    }
}

/// Running controller; stop it with [`ControllerTask::shutdown`]
pub struct ControllerTask {
    handle: GuardHandle,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl ControllerTask {
    pub fn handle(&self) -> GuardHandle {
        self.handle.clone()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the timer and wait for the loop to exit
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.join.await {
            error!("Monitor loop ended abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::HttpControlClient;
    use crate::core::notifier::ChannelNotifier;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc as std_mpsc;

    /// Replays a fixed list of verdicts, then reports a free system
    struct ScriptedDetector {
        verdicts: VecDeque<bool>,
    }

    impl ScriptedDetector {
        fn boxed(verdicts: &[bool]) -> Box<dyn Detector> {
            Box::new(Self {
                verdicts: verdicts.iter().copied().collect(),
            })
        }
    }

    impl Detector for ScriptedDetector {
        fn find_heavy(&mut self) -> Option<String> {
            match self.verdicts.pop_front() {
                Some(true) => Some("Blender.exe".to_string()),
                _ => None,
            }
        }
    }

    struct PanickingDetector;

    impl Detector for PanickingDetector {
        fn find_heavy(&mut self) -> Option<String> {
            panic!("process table exploded");
        }
    }

    #[derive(Default)]
    struct RecordingClient {
        sent: Mutex<Vec<Command>>,
    }

    impl RecordingClient {
        fn sent(&self) -> Vec<Command> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ControlClient for RecordingClient {
        async fn send_pause(&self, reason: &PauseReason) {
            self.sent
                .lock()
                .unwrap()
                .push(Command::pause(reason.clone()));
        }

        async fn send_resume(&self) {
            self.sent.lock().unwrap().push(Command::Resume);
        }
    }

    /// Takes longer than a tick to answer and tracks overlapping calls
    struct SlowClient {
        delay: Duration,
        sent: Mutex<Vec<Command>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl SlowClient {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                sent: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn sent(&self) -> Vec<Command> {
            self.sent.lock().unwrap().clone()
        }

        async fn deliver(&self, command: Command) {
            self.sent.lock().unwrap().push(command);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ControlClient for SlowClient {
        async fn send_pause(&self, reason: &PauseReason) {
            self.deliver(Command::pause(reason.clone())).await;
        }

        async fn send_resume(&self) {
            self.deliver(Command::Resume).await;
        }
    }

    fn controller(
        detector: Box<dyn Detector>,
        client: Arc<dyn ControlClient>,
    ) -> (Controller, std_mpsc::Receiver<Notification>) {
        let (tx, rx) = std_mpsc::channel();
        let controller = Controller::new(
            Guard::default(),
            detector,
            client,
            Arc::new(ChannelNotifier::new(tx)),
        );
        (controller, rx)
    }

    async fn trace(controller: &mut Controller, ticks: usize) -> Vec<GuardState> {
        let mut states = Vec::new();
        for _ in 0..ticks {
            states.push(controller.tick().await);
        }
        states
    }

    #[tokio::test]
    async fn pause_hold_resume_over_three_ticks() {
        let client = Arc::new(RecordingClient::default());
        let (mut controller, notifications) =
            controller(ScriptedDetector::boxed(&[true, true, false]), client.clone());

        assert_eq!(controller.tick().await, GuardState::Busy);
        assert_eq!(client.sent(), vec![Command::pause(PauseReason::Automatic)]);
        assert_eq!(
            notifications.try_recv().unwrap(),
            Notification::Paused {
                trigger: Some("Blender.exe".into())
            }
        );

        assert_eq!(controller.tick().await, GuardState::Busy);
        assert_eq!(client.sent().len(), 1);
        assert!(notifications.try_recv().is_err());

        assert_eq!(controller.tick().await, GuardState::Free);
        assert_eq!(
            client.sent(),
            vec![Command::pause(PauseReason::Automatic), Command::Resume]
        );
        assert_eq!(notifications.try_recv().unwrap(), Notification::Resumed);
        assert!(notifications.try_recv().is_err());
    }

    #[tokio::test]
    async fn free_ticks_send_nothing() {
        let client = Arc::new(RecordingClient::default());
        let (mut controller, notifications) =
            controller(ScriptedDetector::boxed(&[false, false]), client.clone());

        trace(&mut controller, 2).await;
        assert!(client.sent().is_empty());
        assert!(notifications.try_recv().is_err());
        assert_eq!(controller.snapshot().ticks, 2);
        assert_eq!(controller.snapshot().last_verdict, Some(false));
    }

    #[tokio::test]
    async fn unreachable_daemon_leaves_trace_unchanged() {
        let verdicts = [true, true, false, true, false];

        let recording = Arc::new(RecordingClient::default());
        let (mut ok, _) = controller(ScriptedDetector::boxed(&verdicts), recording);
        let expected = trace(&mut ok, verdicts.len()).await;

        let failing =
            Arc::new(HttpControlClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap());
        let (mut failing, notifications) = controller(ScriptedDetector::boxed(&verdicts), failing);
        let actual = trace(&mut failing, verdicts.len()).await;

        assert_eq!(actual, expected);
        assert_eq!(
            actual,
            vec![
                GuardState::Busy,
                GuardState::Busy,
                GuardState::Free,
                GuardState::Busy,
                GuardState::Free
            ]
        );
        // Notifications still fire for every transition
        assert_eq!(notifications.try_iter().count(), 4);
    }

    #[tokio::test]
    async fn panicking_detector_fails_open() {
        let client = Arc::new(RecordingClient::default());
        let (mut controller, _) = controller(Box::new(PanickingDetector), client.clone());

        assert_eq!(controller.tick().await, GuardState::Free);
        // The loop survives and keeps sampling
        assert_eq!(controller.tick().await, GuardState::Free);
        assert_eq!(controller.snapshot().ticks, 2);
        assert!(client.sent().is_empty());
    }

    #[tokio::test]
    async fn manual_actions_bypass_guard_state() {
        let client = Arc::new(RecordingClient::default());
        let (mut controller, notifications) =
            controller(ScriptedDetector::boxed(&[false]), client.clone());

        controller.manual(ManualAction::Pause).await;
        assert_eq!(controller.current_state(), GuardState::Free);
        assert_eq!(client.sent(), vec![Command::pause(PauseReason::Manual)]);
        assert_eq!(notifications.try_recv().unwrap(), Notification::ManualPause);

        // Free tick after a manual pause: state already Free, nothing sent
        assert_eq!(controller.tick().await, GuardState::Free);
        assert_eq!(client.sent().len(), 1);
    }

    #[tokio::test]
    async fn transition_is_recorded_in_snapshot() {
        let client = Arc::new(RecordingClient::default());
        let (mut controller, _) = controller(ScriptedDetector::boxed(&[true]), client);
        let snapshots = controller.subscribe();

        controller.tick().await;
        let snapshot = snapshots.borrow().clone();
        assert_eq!(snapshot.state, GuardState::Busy);
        assert_eq!(snapshot.last_match.as_deref(), Some("Blender.exe"));
        let transition = snapshot.last_transition.unwrap();
        assert_eq!(transition.from, GuardState::Free);
        assert_eq!(transition.to, GuardState::Busy);
    }

    #[tokio::test]
    async fn spawned_loop_ticks_handles_manual_and_shuts_down() {
        let client = Arc::new(RecordingClient::default());
        let (controller, _) = controller(ScriptedDetector::boxed(&[true]), client.clone());
        let task = controller.spawn(Duration::from_secs(3600));
        let handle = task.handle();

        // The first tick fires immediately
        let mut snapshots = handle.subscribe();
        time::timeout(
            Duration::from_secs(5),
            snapshots.wait_for(|s| s.ticks >= 1),
        )
        .await
        .expect("first tick")
        .expect("controller alive");
        assert_eq!(handle.current_state(), GuardState::Busy);

        assert!(handle.resume_now());
        time::timeout(
            Duration::from_secs(5),
            snapshots.wait_for(|s| s.last_manual.is_some()),
        )
        .await
        .expect("manual resume handled")
        .expect("controller alive");

        assert_eq!(
            client.sent(),
            vec![Command::pause(PauseReason::Automatic), Command::Resume]
        );
        // Manual resume does not move the guard
        assert_eq!(handle.current_state(), GuardState::Busy);

        task.shutdown().await;
        assert!(!handle.pause_now());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_daemon_never_sees_overlapping_requests() {
        let client = Arc::new(SlowClient::new(Duration::from_millis(250)));
        let (controller, _) = controller(
            ScriptedDetector::boxed(&[true, false, true, false]),
            client.clone(),
        );
        let task = controller.spawn(Duration::from_millis(100));
        let handle = task.handle();

        // Queue a manual pause while the first automatic pause is in flight
        while client.sent().is_empty() {
            time::sleep(Duration::from_millis(10)).await;
        }
        assert!(handle.pause_now());

        time::timeout(Duration::from_secs(10), async {
            while client.sent().len() < 5 {
                time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("all commands delivered");

        assert_eq!(
            client.sent(),
            vec![
                Command::pause(PauseReason::Automatic),
                Command::pause(PauseReason::Manual),
                Command::Resume,
                Command::pause(PauseReason::Automatic),
                Command::Resume,
            ]
        );
        assert_eq!(client.max_in_flight.load(Ordering::SeqCst), 1);

        // Once the script runs out the system stays free
        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(client.sent().len(), 5);

        task.shutdown().await;
    }
}
