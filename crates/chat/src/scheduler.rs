use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tavern_core::CollectionKey;
use tavern_store::CollectionStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::handlers::random_pick;
use crate::socket::OutboundMessenger;

/// Repeating broadcast of one random entry from a list collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduledTask {
    pub interval: Duration,
    pub key: CollectionKey,
    pub channel_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerPhase {
    WaitingForReady,
    Running,
    Stopped,
}

pub struct QuoteBroadcaster {
    task: ScheduledTask,
    store: Arc<CollectionStore>,
    messenger: Arc<dyn OutboundMessenger>,
}

/// Handle on a spawned broadcaster.
pub struct BroadcastHandle {
    phase: watch::Receiver<SchedulerPhase>,
    join: JoinHandle<()>,
}

impl BroadcastHandle {
    pub fn phase(&self) -> SchedulerPhase {
        *self.phase.borrow()
    }

    pub async fn join(self) {
        if let Err(error) = self.join.await {
            warn!(error = %error, "quote broadcaster task ended abnormally");
        }
    }
}

impl QuoteBroadcaster {
    pub fn new(
        task: ScheduledTask,
        store: Arc<CollectionStore>,
        messenger: Arc<dyn OutboundMessenger>,
    ) -> Self {
        Self { task, store, messenger }
    }

    /// Starts the broadcaster. Nothing fires until `ready` turns `true`; the
    /// first firing follows immediately, then one per interval. Setting
    /// `shutdown` to `true` (or dropping its sender) stops it in any phase.
    pub fn spawn(
        self,
        ready: watch::Receiver<bool>,
        shutdown: watch::Receiver<bool>,
    ) -> BroadcastHandle {
        let (phase_tx, phase) = watch::channel(SchedulerPhase::WaitingForReady);
        let join = tokio::spawn(self.run(ready, shutdown, phase_tx));
        BroadcastHandle { phase, join }
    }

    async fn run(
        self,
        mut ready: watch::Receiver<bool>,
        mut shutdown: watch::Receiver<bool>,
        phase: watch::Sender<SchedulerPhase>,
    ) {
        info!(
            event_name = "schedule.broadcast.waiting",
            collection = %self.task.key,
            channel_id = %self.task.channel_id,
            "quote broadcaster waiting for chat readiness"
        );

        let became_ready = tokio::select! {
            biased;
            () = shutdown_requested(&mut shutdown) => false,
            ready = wait_until_ready(&mut ready) => ready,
        };

        if became_ready {
            phase.send_replace(SchedulerPhase::Running);
            info!(
                event_name = "schedule.broadcast.started",
                interval_secs = self.task.interval.as_secs(),
                "quote broadcaster running"
            );

            let mut ticker = tokio::time::interval(self.task.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    () = shutdown_requested(&mut shutdown) => break,
                    _ = ticker.tick() => self.fire().await,
                }
            }
        }

        phase.send_replace(SchedulerPhase::Stopped);
        info!(event_name = "schedule.broadcast.stopped", "quote broadcaster stopped");
    }

    async fn fire(&self) {
        let fired_at = Utc::now();
        let text = match random_pick(&self.store, self.task.key).await {
            Ok(text) => text,
            Err(error) => {
                warn!(
                    event_name = "schedule.broadcast.failed",
                    fired_at = %fired_at.to_rfc3339(),
                    error_class = error.error_class(),
                    error = %error,
                    "scheduled broadcast skipped"
                );
                return;
            }
        };

        match self.messenger.send_message(&self.task.channel_id, &text).await {
            Ok(()) => info!(
                event_name = "schedule.broadcast.fired",
                fired_at = %fired_at.to_rfc3339(),
                channel_id = %self.task.channel_id,
                "scheduled broadcast sent"
            ),
            Err(error) => warn!(
                event_name = "schedule.broadcast.failed",
                fired_at = %fired_at.to_rfc3339(),
                channel_id = %self.task.channel_id,
                error = %error,
                "scheduled broadcast could not be delivered"
            ),
        }
    }
}

async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// `false` when the readiness sender went away before reporting ready.
async fn wait_until_ready(ready: &mut watch::Receiver<bool>) -> bool {
    ready.wait_for(|ready| *ready).await.is_ok()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tavern_core::CollectionKey;
    use tavern_store::{CollectionStore, InMemoryStore, KeyValueStore};
    use tokio::sync::{watch, Mutex};

    use super::{QuoteBroadcaster, ScheduledTask, SchedulerPhase};
    use crate::socket::{OutboundMessenger, TransportError};

    #[derive(Default)]
    struct RecordingMessenger {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingMessenger {
        async fn count(&self) -> usize {
            self.sent.lock().await.len()
        }
    }

    #[async_trait]
    impl OutboundMessenger for RecordingMessenger {
        async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), TransportError> {
            self.sent.lock().await.push((channel_id.to_owned(), text.to_owned()));
            Ok(())
        }
    }

    fn broadcaster(
        backend: Arc<InMemoryStore>,
        messenger: Arc<RecordingMessenger>,
    ) -> QuoteBroadcaster {
        QuoteBroadcaster::new(
            ScheduledTask {
                interval: Duration::from_secs(60),
                key: CollectionKey::Quotes,
                channel_id: "general".to_owned(),
            },
            Arc::new(CollectionStore::new(backend)),
            messenger,
        )
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn never_fires_before_ready_then_fires_immediately() {
        let backend = Arc::new(InMemoryStore::with_values([("quotes", r#"["carpe diem"]"#)]));
        let messenger = Arc::new(RecordingMessenger::default());
        let (ready_tx, ready_rx) = watch::channel(false);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = broadcaster(backend, messenger.clone()).spawn(ready_rx, shutdown_rx);
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(messenger.count().await, 0);
        assert_eq!(handle.phase(), SchedulerPhase::WaitingForReady);

        ready_tx.send_replace(true);
        settle().await;
        assert_eq!(handle.phase(), SchedulerPhase::Running);
        assert_eq!(messenger.count().await, 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(messenger.count().await, 2);

        let sent = messenger.sent.lock().await.clone();
        assert!(sent.iter().all(|(channel, text)| channel == "general" && text == "carpe diem"));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_firing_does_not_stop_the_schedule() {
        let backend = Arc::new(InMemoryStore::with_values([("quotes", "[]")]));
        let messenger = Arc::new(RecordingMessenger::default());
        let (ready_tx, ready_rx) = watch::channel(true);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = broadcaster(backend.clone(), messenger.clone()).spawn(ready_rx, shutdown_rx);
        settle().await;
        assert_eq!(messenger.count().await, 0);
        assert_eq!(handle.phase(), SchedulerPhase::Running);

        backend.set("quotes", r#"["late"]"#).await.expect("set");
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(messenger.count().await, 1);
        drop(ready_tx);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_in_every_phase() {
        let backend = Arc::new(InMemoryStore::with_values([("quotes", r#"["q"]"#)]));
        let messenger = Arc::new(RecordingMessenger::default());

        let (_ready_tx, ready_rx) = watch::channel(false);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = broadcaster(backend.clone(), messenger.clone()).spawn(ready_rx, shutdown_rx);
        shutdown_tx.send_replace(true);
        settle().await;
        assert_eq!(handle.phase(), SchedulerPhase::Stopped);
        handle.join().await;

        let (_ready_tx, ready_rx) = watch::channel(true);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = broadcaster(backend, messenger.clone()).spawn(ready_rx, shutdown_rx);
        settle().await;
        assert_eq!(messenger.count().await, 1);
        drop(shutdown_tx);
        handle.join().await;

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(messenger.count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn missed_ticks_are_not_replayed() {
        let backend = Arc::new(InMemoryStore::with_values([("quotes", r#"["q"]"#)]));
        let messenger = Arc::new(RecordingMessenger::default());
        let (_ready_tx, ready_rx) = watch::channel(true);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let _handle = broadcaster(backend, messenger.clone()).spawn(ready_rx, shutdown_rx);
        settle().await;
        assert_eq!(messenger.count().await, 1);

        // Jump the clock without yielding so several periods elapse at once.
        tokio::time::advance(Duration::from_secs(300)).await;
        settle().await;
        assert_eq!(messenger.count().await, 2);
    }
}
