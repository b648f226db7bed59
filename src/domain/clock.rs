use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Time source for planning and tracking. All planned start/end timestamps
/// are absolute milliseconds from this clock.
///
/// Kept behind a trait so that tests can drive the timeline by hand and so
/// that a tokio-paused-time clock can stand in during async tests.
pub trait Clock: std::fmt::Debug + Send + Sync {
    fn now_ms(&self) -> i64;
}

pub type SharedClock = Arc<dyn Clock>;

/// Wall clock, epoch milliseconds.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO).as_millis() as i64
    }
}

/// Clock backed by the tokio timer, so `tokio::time::pause()` controls it.
/// Reads as milliseconds elapsed since construction plus a fixed base.
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin: tokio::time::Instant,
    base_ms: i64,
}

impl TokioClock {
    pub fn new(base_ms: i64) -> Self {
        TokioClock { origin: tokio::time::Instant::now(), base_ms }
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> i64 {
        self.base_ms + self.origin.elapsed().as_millis() as i64
    }
}

/// Hand-driven clock for synchronous tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<i64>>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        ManualClock { now: Arc::new(Mutex::new(start_ms)) }
    }

    pub fn advance(&self, delta_ms: i64) {
        let mut now = self.now.lock().expect("clock mutex poisoned");
        *now += delta_ms;
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        *self.now.lock().expect("clock mutex poisoned")
    }
}
