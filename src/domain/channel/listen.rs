use std::time::Duration;

use tokio::time::{Instant, sleep_until};

use crate::domain::channel::bus::MessageBus;
use crate::domain::utils::id::ChannelId;

/// Raise the poll interval an order of magnitude after this many consecutive
/// empty polls.
const BACKOFF_EVERY: u32 = 100;

/// Waits on a fixed set of channels without busy-spinning.
///
/// `listen` polls with exponential backoff pacing: the interval starts at
/// 1 ms and multiplies by 10 every 100 consecutive empty polls, capped at
/// the caller's `max_interval_ms`. Sleeps are drift-corrected: each sleep
/// target comes from a fixed next-tick accumulator rather than
/// "now + interval", so timing skew does not accumulate across many polls.
///
/// The first non-empty channel is returned and cached; `consume` then reads
/// that exact message exactly once. Separating peek from consume keeps two
/// concurrent listeners from racing on the same message.
#[derive(Debug)]
pub struct Listener {
    bus: MessageBus,
    hit: Option<ChannelId>,
    polls: u64,
}

impl Listener {
    pub fn new(bus: MessageBus) -> Self {
        Listener { bus, hit: None, polls: 0 }
    }

    /// Poll rounds performed by the most recent `listen` call.
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Returns the first channel holding a message, or `None` once
    /// `timeout_ms` elapsed without one.
    pub async fn listen(&mut self, channels: &[ChannelId], timeout_ms: i64, max_interval_ms: i64) -> Option<ChannelId> {
        let start = Instant::now();
        let deadline = start + Duration::from_millis(timeout_ms.max(0) as u64);

        let mut interval: i64 = 1;
        let mut count: u32 = 0;
        let mut next_tick = start + Duration::from_millis(interval as u64);

        self.polls = 0;

        log::debug!("Listening on {} channels for up to {} ms.", channels.len(), timeout_ms);

        loop {
            self.polls += 1;

            for &channel in channels {
                // peek/read separation keeps the message from being lost to
                // a racing reader between discovery and consumption.
                if self.bus.peek(channel).is_some() {
                    log::debug!("Found message on {} after {} polls.", channel, self.polls);
                    self.hit = Some(channel);
                    return Some(channel);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                log::debug!("Listen timeout after {} polls.", self.polls);
                return None;
            }

            if count >= BACKOFF_EVERY && interval < max_interval_ms {
                interval = (interval * 10).min(max_interval_ms);
                count = 0;
                log::debug!("Raising listen interval to {} ms.", interval);
            } else {
                count += 1;
            }

            // Drifting sleeps to stick close to the tick grid
            let target = next_tick.min(deadline);
            if target > now {
                sleep_until(target).await;
            }
            next_tick += Duration::from_millis(interval as u64);
        }
    }

    /// Consumes the message found by the last successful `listen`.
    /// A second call without a new hit returns `None`.
    pub fn consume(&mut self) -> Option<String> {
        let channel = self.hit.take()?;
        self.bus.read(channel)
    }
}
