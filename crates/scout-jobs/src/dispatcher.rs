//! Turn dispatcher: bounded concurrency with per-conversation ordering.
//!
//! Every inbound turn is queued under its conversation key. A key has at
//! most one drain task, which runs that key's turns one at a time in
//! arrival order; different keys drain concurrently, bounded by a
//! semaphore of `max_concurrent_turns` permits.

use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use futures::FutureExt;
use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use scout_core::{defaults, ConversationKey, Error, Result};

use crate::config::DispatcherConfig;
use crate::handler::{TurnContext, TurnHandler, TurnOutcome};

/// Event emitted by the dispatcher.
#[derive(Debug, Clone)]
pub enum DispatcherEvent {
    /// Dispatcher started.
    DispatcherStarted,
    /// A turn began executing.
    TurnStarted { turn_id: Uuid, key: ConversationKey },
    /// A turn finished (handled or deliberately ignored).
    TurnCompleted {
        turn_id: Uuid,
        key: ConversationKey,
        outcome: TurnOutcome,
    },
    /// A turn failed or its handler panicked.
    TurnFailed {
        turn_id: Uuid,
        key: ConversationKey,
        error: String,
    },
    /// Dispatcher stopped after draining queued turns.
    DispatcherStopped,
}

/// Handle for feeding and controlling a running dispatcher.
pub struct DispatcherHandle {
    inbound_tx: mpsc::Sender<TurnContext>,
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<DispatcherEvent>,
}

impl DispatcherHandle {
    /// Queue a turn. Waits while the inbound queue is full.
    pub async fn submit(&self, ctx: TurnContext) -> Result<()> {
        self.inbound_tx
            .send(ctx)
            .await
            .map_err(|_| Error::Internal("Turn dispatcher is not running".into()))
    }

    /// Signal the dispatcher to shut down after finishing queued turns.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))
    }

    /// Get a receiver for dispatcher events.
    pub fn events(&self) -> broadcast::Receiver<DispatcherEvent> {
        self.event_rx.resubscribe()
    }
}

/// State shared by the dispatch loop and the per-key drain tasks.
struct Shared {
    handler: Arc<dyn TurnHandler>,
    permits: Arc<Semaphore>,
    /// Keys with an active drain task, mapped to their pending turns.
    queues: Mutex<HashMap<ConversationKey, VecDeque<TurnContext>>>,
    event_tx: broadcast::Sender<DispatcherEvent>,
}

impl Shared {
    fn queues(&self) -> MutexGuard<'_, HashMap<ConversationKey, VecDeque<TurnContext>>> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: DispatcherEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Queue behind an active drain, or claim the key and return the turn
    /// for a new drain task.
    fn enqueue(&self, ctx: TurnContext) -> Option<TurnContext> {
        match self.queues().entry(ctx.key.clone()) {
            Entry::Occupied(mut pending) => {
                debug!(
                    turn_id = %ctx.turn_id,
                    conversation_key = %ctx.key,
                    queued = pending.get().len() + 1,
                    "Turn queued behind in-flight turn"
                );
                pending.get_mut().push_back(ctx);
                None
            }
            Entry::Vacant(slot) => {
                slot.insert(VecDeque::new());
                Some(ctx)
            }
        }
    }

    /// Next pending turn for `key`, releasing the key when none is left.
    fn next_for(&self, key: &ConversationKey) -> Option<TurnContext> {
        let mut queues = self.queues();
        let next = queues.get_mut(key).and_then(VecDeque::pop_front);
        if next.is_none() {
            queues.remove(key);
        }
        next
    }

    async fn drain(self: Arc<Self>, first: TurnContext) {
        let key = first.key.clone();
        let mut current = Some(first);
        while let Some(ctx) = current {
            self.run_turn(ctx).await;
            current = self.next_for(&key);
        }
    }

    async fn run_turn(&self, ctx: TurnContext) {
        let Ok(_permit) = self.permits.clone().acquire_owned().await else {
            error!(turn_id = %ctx.turn_id, "Turn permits closed, dropping turn");
            return;
        };

        let start = Instant::now();
        let turn_id = ctx.turn_id;
        let key = ctx.key.clone();
        self.emit(DispatcherEvent::TurnStarted {
            turn_id,
            key: key.clone(),
        });

        let outcome = AssertUnwindSafe(self.handler.handle(ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| TurnOutcome::Failed(panic_message(panic.as_ref())));
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            TurnOutcome::Failed(error) => {
                warn!(%turn_id, conversation_key = %key, %error, duration_ms, "Turn failed");
                self.emit(DispatcherEvent::TurnFailed {
                    turn_id,
                    key,
                    error,
                });
            }
            outcome => {
                info!(%turn_id, conversation_key = %key, duration_ms, "Turn completed");
                self.emit(DispatcherEvent::TurnCompleted {
                    turn_id,
                    key,
                    outcome,
                });
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("Turn handler panicked: {}", detail)
}

/// Dispatches inbound turns to a [`TurnHandler`].
pub struct TurnDispatcher {
    config: DispatcherConfig,
    handler: Arc<dyn TurnHandler>,
    event_tx: broadcast::Sender<DispatcherEvent>,
}

impl TurnDispatcher {
    pub fn new(config: DispatcherConfig, handler: Arc<dyn TurnHandler>) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self {
            config,
            handler,
            event_tx,
        }
    }

    /// Get a receiver for dispatcher events.
    pub fn events(&self) -> broadcast::Receiver<DispatcherEvent> {
        self.event_tx.subscribe()
    }

    /// Start the dispatcher and return a handle for control.
    pub fn start(self) -> DispatcherHandle {
        let (inbound_tx, inbound_rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        tokio::spawn(self.run(inbound_rx, shutdown_rx));

        DispatcherHandle {
            inbound_tx,
            shutdown_tx,
            event_rx,
        }
    }

    #[instrument(skip_all)]
    async fn run(
        self,
        mut inbound_rx: mpsc::Receiver<TurnContext>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        if !self.config.enabled {
            info!("Turn dispatcher is disabled, not starting");
            return;
        }

        info!(
            max_concurrent = self.config.max_concurrent_turns,
            queue_capacity = self.config.queue_capacity,
            "Turn dispatcher started"
        );
        let _ = self.event_tx.send(DispatcherEvent::DispatcherStarted);

        let shared = Arc::new(Shared {
            handler: self.handler,
            permits: Arc::new(Semaphore::new(self.config.max_concurrent_turns.max(1))),
            queues: Mutex::new(HashMap::new()),
            event_tx: self.event_tx.clone(),
        });
        let mut drains = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Turn dispatcher received shutdown signal");
                    break;
                }
                Some(ctx) = inbound_rx.recv() => {
                    if let Some(first) = shared.enqueue(ctx) {
                        drains.spawn(shared.clone().drain(first));
                    }
                }
                Some(result) = drains.join_next(), if !drains.is_empty() => {
                    if let Err(e) = result {
                        error!(error = ?e, "Turn drain task panicked");
                    }
                }
                else => break,
            }
        }

        // Finish everything already accepted.
        inbound_rx.close();
        while let Some(ctx) = inbound_rx.recv().await {
            if let Some(first) = shared.enqueue(ctx) {
                drains.spawn(shared.clone().drain(first));
            }
        }
        while let Some(result) = drains.join_next().await {
            if let Err(e) = result {
                error!(error = ?e, "Turn drain task panicked");
            }
        }

        let _ = self.event_tx.send(DispatcherEvent::DispatcherStopped);
        info!("Turn dispatcher stopped");
    }
}
