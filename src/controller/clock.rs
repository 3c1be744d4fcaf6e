//! Timers for the address recovery poll.
//!
//! Provides a [`PollClock`] trait, a default [`TokioClock`] that sleeps on
//! tokio time, and a [`ManualClock`] that lets a test fire ticks one at a
//! time and wait for each to be handled.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Waits between poll attempts.
#[async_trait]
pub trait PollTimer: Send {
    /// Wait until the next attempt should run.
    async fn wait(&mut self, delay: Duration);
}

/// Hands out a fresh timer for each poll task.
pub trait PollClock: Send + Sync {
    /// Create a timer for a new poll task.
    fn timer(&self) -> Box<dyn PollTimer>;
}

/// Clock backed by `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

struct TokioTimer;

#[async_trait]
impl PollTimer for TokioTimer {
    async fn wait(&mut self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

impl PollClock for TokioClock {
    fn timer(&self) -> Box<dyn PollTimer> {
        Box::new(TokioTimer)
    }
}

/// Test-side ends of the channels shared with the current [`ManualTimer`].
struct DriverEnds {
    ticks: mpsc::Sender<()>,
    idle: mpsc::Receiver<Duration>,
    /// The timer has already reported idle and is waiting for a tick.
    ready: Option<Duration>,
}

impl DriverEnds {
    async fn fire(&mut self) -> Option<Duration> {
        let delay = match self.ready.take() {
            Some(delay) => delay,
            None => self.idle.recv().await?,
        };
        self.ticks.send(()).await.ok()?;
        // The next idle report means the tick has been fully handled.
        self.ready = Some(self.idle.recv().await?);
        Some(delay)
    }
}

/// Deterministic clock driven from tests.
///
/// Every call to [`PollClock::timer`] replaces the timer the clock drives, so
/// a new session after a disconnect is picked up automatically.
#[derive(Clone, Default)]
pub struct ManualClock {
    slot: Arc<Mutex<Option<DriverEnds>>>,
}

impl ManualClock {
    /// Create a clock with no timer attached yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire one tick and wait until the poll task has handled it.
    ///
    /// Returns the delay the task asked for, or `None` when no poll task is
    /// running or the task stopped instead of waiting again.
    pub async fn advance(&self) -> Option<Duration> {
        let mut ends = self.slot.lock().ok()?.take()?;
        let delay = ends.fire().await;
        if delay.is_some() {
            if let Ok(mut slot) = self.slot.lock() {
                if slot.is_none() {
                    *slot = Some(ends);
                }
            }
        }
        delay
    }

    /// Check whether a timer is attached.
    pub fn is_attached(&self) -> bool {
        self.slot.lock().map(|s| s.is_some()).unwrap_or(false)
    }
}

impl PollClock for ManualClock {
    fn timer(&self) -> Box<dyn PollTimer> {
        let (tick_tx, tick_rx) = mpsc::channel(1);
        let (idle_tx, idle_rx) = mpsc::channel(1);
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(DriverEnds {
                ticks: tick_tx,
                idle: idle_rx,
                ready: None,
            });
        }
        Box::new(ManualTimer {
            ticks: tick_rx,
            idle: idle_tx,
        })
    }
}

struct ManualTimer {
    ticks: mpsc::Receiver<()>,
    idle: mpsc::Sender<Duration>,
}

#[async_trait]
impl PollTimer for ManualTimer {
    async fn wait(&mut self, delay: Duration) {
        if self.idle.send(delay).await.is_err() || self.ticks.recv().await.is_none() {
            // Driver gone: park until the task is cancelled.
            std::future::pending::<()>().await;
        }
    }
}
