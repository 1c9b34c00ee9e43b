//! Asynchronous countdown engine.
//!
//! Wraps a [`Countdown`] in a tokio task that sleeps until each deadline and
//! publishes the resulting [`TimerEvent`] to every subscriber. One schedule
//! task per engine: `start` aborts the previous task and bumps a generation
//! token, and a task whose generation no longer matches exits without
//! publishing. Publishing happens under the engine lock, so once `stop()`
//! returns nothing from the cancelled schedule is delivered.

use crate::countdown::Countdown;
use countdown_core::event::{EngineState, TimerEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

struct Inner {
    countdown: Countdown,
    generation: u64,
    subscribers: Vec<mpsc::UnboundedSender<TimerEvent>>,
    task: Option<JoinHandle<()>>,
}

impl Inner {
    /// Invalidate the current schedule, if any.
    fn cancel_schedule(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn publish(&mut self, event: TimerEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}

pub struct CountdownEngine {
    inner: Arc<Mutex<Inner>>,
}

impl CountdownEngine {
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                countdown: Countdown::new(tick_interval),
                generation: 0,
                subscribers: Vec::new(),
                task: None,
            })),
        }
    }

    /// Register for events published from now on. Dropping the receiver
    /// unsubscribes.
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<TimerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().await.subscribers.push(tx);
        rx
    }

    /// Start counting down `duration_ms`, replacing any running countdown.
    pub async fn start(&self, duration_ms: u64) {
        let mut inner = self.inner.lock().await;
        if inner.countdown.state().is_running() {
            debug!("replacing running countdown");
        }
        inner.cancel_schedule();
        inner.countdown.start(duration_ms, Instant::now());
        let generation = inner.generation;
        inner.task = Some(tokio::spawn(run_schedule(Arc::clone(&self.inner), generation)));
        info!(duration_ms, generation, "countdown started");
    }

    /// Cancel the running countdown without publishing anything.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        if inner.countdown.stop() {
            inner.cancel_schedule();
            info!("countdown stopped");
        }
    }

    pub async fn state(&self) -> EngineState {
        self.inner.lock().await.countdown.state()
    }
}

async fn run_schedule(inner: Arc<Mutex<Inner>>, generation: u64) {
    loop {
        let deadline = {
            let guard = inner.lock().await;
            if guard.generation != generation {
                return;
            }
            match guard.countdown.next_deadline() {
                Some(deadline) => deadline,
                None => return,
            }
        };

        tokio::time::sleep_until(deadline).await;

        let mut guard = inner.lock().await;
        if guard.generation != generation {
            debug!(generation, "discarding firing from superseded schedule");
            return;
        }
        let Some(event) = guard.countdown.check_timer(Instant::now()) else {
            continue;
        };
        debug!(?event, "publishing");
        guard.publish(event);
        if event == TimerEvent::Finished {
            guard.task = None;
            info!("countdown finished");
            return;
        }
    }
}
