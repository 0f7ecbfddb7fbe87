//! The pre-match countdown.
//!
//! A [`Countdown`] is a state machine a room actor folds into its
//! `select!` loop: while idle, [`Countdown::tick`] pends forever and the
//! loop only sees commands; once started, each tick resolves after the
//! configured interval with the new remaining count. The owning actor
//! decides what a tick means (announce the number, re-check the room is
//! still full, start the match at zero).
//!
//! Ticks are anchored to the start instant rather than rescheduled from
//! "now", so slow tick handling does not stretch the total countdown.

use std::time::Duration;

use tokio::time::Instant;

/// Tuning for a [`Countdown`].
#[derive(Debug, Clone)]
pub struct CountdownConfig {
    /// First announced value. The countdown emits `start_from - 1`
    /// down to `0`, one value per interval.
    pub start_from: u8,
    /// Time between ticks.
    pub interval: Duration,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            start_from: 5,
            interval: Duration::from_secs(1),
        }
    }
}

/// A cancellable, restartable countdown.
pub struct Countdown {
    config: CountdownConfig,
    remaining: Option<u8>,
    next_tick: Option<Instant>,
}

impl Countdown {
    pub fn new(config: CountdownConfig) -> Self {
        Self {
            config,
            remaining: None,
            next_tick: None,
        }
    }

    /// Arms the countdown from the configured start value. If one is
    /// already running it is discarded and restarted from the top.
    pub fn start(&mut self) {
        if self.remaining.is_some() {
            tracing::debug!("countdown restarted while running");
        }
        self.remaining = Some(self.config.start_from);
        self.next_tick = Some(Instant::now() + self.config.interval);
    }

    /// Disarms the countdown. A no-op if idle.
    pub fn cancel(&mut self) {
        self.remaining = None;
        self.next_tick = None;
    }

    /// The value most recently armed or ticked to, if running.
    pub fn remaining(&self) -> Option<u8> {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.remaining.is_some()
    }

    /// Resolves at the next tick boundary with the new remaining count,
    /// ending with `0`. Pends forever while idle, which makes it safe to
    /// poll unconditionally from a `select!` arm.
    ///
    /// After the `0` tick the countdown returns to idle on its own.
    pub async fn tick(&mut self) -> u8 {
        let (remaining, deadline) = match (self.remaining, self.next_tick) {
            (Some(r), Some(d)) => (r, d),
            _ => return std::future::pending().await,
        };

        tokio::time::sleep_until(deadline).await;

        let next = remaining.saturating_sub(1);
        if next == 0 {
            self.remaining = None;
            self.next_tick = None;
        } else {
            self.remaining = Some(next);
            self.next_tick = Some(deadline + self.config.interval);
        }
        next
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(CountdownConfig::default())
    }
}
