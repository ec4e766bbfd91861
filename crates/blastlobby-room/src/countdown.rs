//! Cancellable countdown driven from inside the room actor.
//!
//! The countdown never runs on its own task. The room actor polls
//! [`Countdown::tick`] in its `tokio::select!` loop next to the command
//! channel, so starting, restarting, and cancelling are plain field writes
//! made while the actor has exclusive access. There is only ever one
//! countdown per room and a replaced countdown cannot fire late.
//!
//! When idle, `tick` pends forever; `select!` keeps servicing commands.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace};

/// A seconds countdown that decrements once per `interval`.
#[derive(Debug)]
pub(crate) struct Countdown {
    interval: Duration,
    remaining: i32,
    /// When the next tick fires. `None` means no countdown is running.
    next_tick: Option<Instant>,
}

impl Countdown {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            remaining: 0,
            next_tick: None,
        }
    }

    /// Starts counting down from `seconds`, replacing any running countdown.
    ///
    /// The first tick fires one `interval` from now.
    pub(crate) fn start(&mut self, seconds: i32) {
        if self.next_tick.is_some() {
            debug!(
                previous = self.remaining,
                seconds, "replacing running countdown"
            );
        }
        self.remaining = seconds;
        self.next_tick = Some(Instant::now() + self.interval);
    }

    /// Stops the countdown. Idempotent.
    pub(crate) fn cancel(&mut self) {
        self.next_tick = None;
    }

    pub(crate) fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Waits for the next tick and returns the decremented seconds.
    ///
    /// Cancel-safe: state only changes after the sleep completes, so a
    /// dropped future leaves the countdown untouched.
    pub(crate) async fn tick(&mut self) -> i32 {
        let Some(next) = self.next_tick else {
            return std::future::pending().await;
        };

        time::sleep_until(next).await;

        self.next_tick = Some(next + self.interval);
        self.remaining -= 1;
        trace!(remaining = self.remaining, "countdown tick");
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_decrement_once_per_interval() {
        let mut countdown = Countdown::new(Duration::from_secs(1));
        countdown.start(3);

        let started = Instant::now();
        assert_eq!(countdown.tick().await, 2);
        assert_eq!(countdown.tick().await, 1);
        assert_eq!(countdown.tick().await, 0);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_second_countdown_goes_negative_on_first_tick() {
        let mut countdown = Countdown::new(Duration::from_secs(1));
        countdown.start(0);
        assert_eq!(countdown.tick().await, -1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_countdown_never_fires() {
        let mut countdown = Countdown::new(Duration::from_secs(1));
        assert!(!countdown.is_running());

        let fired = time::timeout(Duration::from_secs(60), countdown.tick()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let mut countdown = Countdown::new(Duration::from_secs(1));
        countdown.start(10);
        countdown.cancel();
        assert!(!countdown.is_running());

        let fired = time::timeout(Duration::from_secs(5), countdown.tick()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_remaining_and_deadline() {
        let mut countdown = Countdown::new(Duration::from_secs(1));
        countdown.start(10);
        assert_eq!(countdown.tick().await, 9);

        time::advance(Duration::from_millis(500)).await;
        countdown.start(3);

        let restarted = Instant::now();
        assert_eq!(countdown.tick().await, 2);
        assert_eq!(restarted.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_tick_future_leaves_state_unchanged() {
        let mut countdown = Countdown::new(Duration::from_secs(1));
        countdown.start(5);

        let _ = time::timeout(Duration::from_millis(100), countdown.tick()).await;
        assert_eq!(countdown.tick().await, 4);
    }
}
