//! Request cooldown
//!
//! A one-second countdown gating the summarize endpoint. The ticker task
//! exits when the count reaches zero, so nothing runs while idle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::debug;

const TICK: Duration = Duration::from_secs(1);

#[derive(Default)]
struct Countdown {
    generation: u64,
    ticker: Option<JoinHandle<()>>,
}

struct Shared {
    countdown: Mutex<Countdown>,
    remaining: watch::Sender<u32>,
}

impl Shared {
    fn countdown(&self) -> MutexGuard<'_, Countdown> {
        self.countdown.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct CooldownGovernor {
    shared: Arc<Shared>,
}

impl CooldownGovernor {
    pub fn new() -> Self {
        let (remaining, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                countdown: Mutex::new(Countdown::default()),
                remaining,
            }),
        }
    }

    /// Start, or restart, the countdown at `seconds`
    ///
    /// Re-arming resets the count; it never adds to what is left.
    pub fn arm(&self, seconds: u32) {
        let mut countdown = self.shared.countdown();
        countdown.generation += 1;
        if let Some(ticker) = countdown.ticker.take() {
            ticker.abort();
        }

        self.shared.remaining.send_replace(seconds);
        if seconds == 0 {
            return;
        }

        let generation = countdown.generation;
        let shared = Arc::clone(&self.shared);

        countdown.ticker = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + TICK, TICK);
            loop {
                interval.tick().await;

                let mut countdown = shared.countdown();
                if countdown.generation != generation {
                    break;
                }

                let left = shared.remaining.borrow().saturating_sub(1);
                shared.remaining.send_replace(left);
                if left == 0 {
                    countdown.ticker = None;
                    debug!("Cooldown elapsed");
                    break;
                }
            }
        }));

        debug!("Cooldown armed for {}s", seconds);
    }

    /// Stop the countdown and clear it
    pub fn cancel(&self) {
        let mut countdown = self.shared.countdown();
        countdown.generation += 1;
        if let Some(ticker) = countdown.ticker.take() {
            ticker.abort();
            debug!("Cooldown cancelled");
        }
        self.shared.remaining.send_replace(0);
    }

    pub fn seconds_remaining(&self) -> u32 {
        *self.shared.remaining.borrow()
    }

    pub fn is_blocked(&self) -> bool {
        self.seconds_remaining() > 0
    }

    /// Whether a ticker task is currently alive
    pub fn is_ticking(&self) -> bool {
        self.shared.countdown().ticker.is_some()
    }

    /// Receive every change of the remaining seconds
    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.shared.remaining.subscribe()
    }
}

impl Default for CooldownGovernor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CooldownGovernor {
    fn drop(&mut self) {
        self.cancel();
    }
}
