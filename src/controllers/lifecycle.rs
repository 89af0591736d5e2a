//! Building blocks shared by the controllers: request sequencing and the
//! polling timer.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Orders overlapping fetches of one controller.
///
/// Each fetch takes a ticket. A result is applied only if no newer ticket
/// has been applied already, so a slow stale response can never overwrite
/// a fresher one.
#[derive(Debug, Default)]
pub(crate) struct Sequencer {
    issued: u64,
    applied: u64,
}

impl Sequencer {
    pub fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Record `ticket` as applied; false when it has been superseded
    pub fn accept(&mut self, ticket: u64) -> bool {
        if ticket < self.applied {
            return false;
        }
        self.applied = ticket;
        true
    }

    pub fn has_resolved(&self) -> bool {
        self.applied > 0
    }

    /// True once the most recently issued ticket has been applied
    pub fn is_idle(&self) -> bool {
        self.applied >= self.issued
    }
}

/// Repeating timer owned by one controller.
///
/// At most one timer is alive at a time: installing a new one cancels the
/// previous one first. The timer token is a child of the controller's
/// liveness token, so teardown stops it as well.
pub(crate) struct Poller {
    current: Mutex<Option<CancellationToken>>,
}

impl Poller {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    /// Replace the running timer. `None` or a zero period only clears.
    ///
    /// `on_tick` returns false once its controller is gone, which ends the
    /// timer. The first tick fires one full period after install.
    pub fn install<F>(&self, period: Option<Duration>, parent: &CancellationToken, on_tick: F) -> bool
    where
        F: Fn() -> bool + Send + 'static,
    {
        let mut current = self.current.lock();
        if let Some(previous) = current.take() {
            previous.cancel();
        }

        let period = match period {
            Some(period) if !period.is_zero() && !parent.is_cancelled() => period,
            _ => return false,
        };

        let token = parent.child_token();
        let stop = token.clone();
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        if !on_tick() {
                            break;
                        }
                    }
                }
            }
            info!(period_ms = period.as_millis() as u64, "polling timer stopped");
        });

        info!(period_ms = period.as_millis() as u64, "polling timer installed");
        *current = Some(token);
        true
    }

    pub fn clear(&self) {
        if let Some(token) = self.current.lock().take() {
            token.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }
}
