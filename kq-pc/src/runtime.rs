//! Controller event loop
//!
//! One task owns the `Controller`, the `QueueClient` and the `Player`. Poll
//! ticks, idle ticks, queue-change notifications and inputs are handled
//! strictly one at a time; a mutation is finished (or has failed) before its
//! re-poll is issued and before the next event is looked at.

use kq_common::config::DisplayConfig;
use kq_common::events::QueueEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::client::QueueClient;
use crate::controller::{Action, Controller, Input};
use crate::player::Player;

/// Timer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub poll_interval: Duration,
    pub idle_timeout: Duration,
    pub idle_check_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from(&DisplayConfig::default())
    }
}

impl From<&DisplayConfig> for RuntimeConfig {
    fn from(display: &DisplayConfig) -> Self {
        Self {
            poll_interval: display.poll_interval(),
            idle_timeout: display.idle_timeout(),
            idle_check_interval: display.idle_check_interval(),
        }
    }
}

enum Command {
    Input(Input),
    /// The store reported a mutation; re-poll now instead of at the next tick
    QueueChanged(QueueEvent),
    Shutdown,
}

/// Weak sender for queue-change notifications
///
/// Does not keep the loop alive: once the `ControllerHandle` is gone,
/// `notify` returns false.
#[derive(Clone)]
pub struct QueueNotifier {
    tx: mpsc::WeakSender<Command>,
}

impl QueueNotifier {
    /// Ask for an immediate re-poll; false once the loop has stopped
    ///
    /// A full channel drops the nudge; the loop is busy and will poll anyway.
    pub fn notify(&self, event: QueueEvent) -> bool {
        let Some(tx) = self.tx.upgrade() else {
            return false;
        };
        match tx.try_send(Command::QueueChanged(event)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Controller busy, dropping queue notification");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.upgrade().map_or(true, |tx| tx.is_closed())
    }
}

/// Handle to a running controller
///
/// Dropping the handle also stops the loop.
pub struct ControllerHandle {
    tx: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

impl ControllerHandle {
    /// Queue an input; false once the loop has stopped
    pub async fn send(&self, input: Input) -> bool {
        self.tx.send(Command::Input(input)).await.is_ok()
    }

    /// Notifier for an event follower
    pub fn notifier(&self) -> QueueNotifier {
        QueueNotifier {
            tx: self.tx.downgrade(),
        }
    }

    /// Stop the timers and wait for the loop to exit
    pub async fn shutdown(self) {
        let _ = self.tx.send(Command::Shutdown).await;
        if let Err(e) = self.task.await {
            warn!("Controller task ended abnormally: {}", e);
        }
    }
}

/// Start the controller loop on the current runtime
pub fn spawn<C, P>(client: C, player: P, config: RuntimeConfig) -> ControllerHandle
where
    C: QueueClient + 'static,
    P: Player + 'static,
{
    let (tx, rx) = mpsc::channel(64);
    let runtime = Runtime {
        controller: Controller::new(config.idle_timeout, Instant::now()),
        client,
        player,
    };
    let task = tokio::spawn(runtime.run(rx, config));
    ControllerHandle { tx, task }
}

struct Runtime<C, P> {
    controller: Controller,
    client: C,
    player: P,
}

impl<C: QueueClient, P: Player> Runtime<C, P> {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>, config: RuntimeConfig) {
        info!(
            "Controller started: poll every {:?}, auto-fill after {:?} idle",
            config.poll_interval, config.idle_timeout
        );

        let mut poll_timer = time::interval(config.poll_interval);
        poll_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // First idle check one period in, not immediately
        let mut idle_timer = time::interval_at(
            Instant::now() + config.idle_check_interval,
            config.idle_check_interval,
        );
        idle_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Input(input)) => {
                        debug!("Input: {:?}", input);
                        let actions = self.controller.handle_input(input);
                        self.perform(actions).await;
                    }
                    Some(Command::QueueChanged(event)) => {
                        debug!("Queue changed ({}), re-polling", event.event_type());
                        self.poll().await;
                    }
                    Some(Command::Shutdown) | None => break,
                },
                _ = poll_timer.tick() => self.poll().await,
                _ = idle_timer.tick() => {
                    if let Some(action) = self.controller.check_idle(Instant::now()) {
                        self.perform(vec![action]).await;
                    }
                }
            }
        }

        info!("Controller stopped");
    }

    /// Fetch a snapshot and apply it; a failed fetch leaves state unchanged
    async fn poll(&mut self) {
        match self.client.snapshot().await {
            Ok(snapshot) => {
                let actions = self.controller.apply_snapshot(&snapshot, Instant::now());
                for action in actions {
                    self.execute(action).await;
                }
            }
            Err(e) => warn!("Failed to fetch queue snapshot: {}", e),
        }
    }

    async fn perform(&mut self, actions: Vec<Action>) {
        for action in actions {
            let mutation = action.is_mutation();
            self.execute(action).await;
            if mutation {
                self.poll().await;
            }
        }
    }

    async fn execute(&mut self, action: Action) {
        match action {
            Action::Load(entry) => self.player.load(&entry),
            Action::Stop => self.player.stop(),
            Action::ShowFallback { entry, kind } => self.player.show_fallback(&entry, kind),
            Action::OpenExternal(url) => self.player.open_external(&url),

            Action::Advance => match self.client.advance().await {
                Ok(Some(removed)) => {
                    info!("Removed {} from the queue", removed.media_id);
                    self.controller.advance_completed(&removed);
                }
                Ok(None) => debug!("Queue was already empty"),
                Err(e) => warn!("Failed to advance queue: {}", e),
            },

            Action::AutoFill => match self.client.auto_fill().await {
                Ok(entry) => info!("Auto-filled {} ({})", entry.media_id, entry.title),
                Err(e) => warn!("Auto-fill failed: {}", e),
            },

            Action::Delete(id) => match self.client.delete_entry(&id).await {
                Ok(true) => info!("Deleted entry {}", id),
                Ok(false) => debug!("Entry {} was already gone", id),
                Err(e) => warn!("Failed to delete entry {}: {}", id, e),
            },
        }
    }
}
