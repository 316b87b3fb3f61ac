//! Time source and cooperative shutdown flag.
//!
//! The sampler never reads the system clock directly: it goes through
//! [`Clock`], so tests can drive it with a [`ManualClock`] and check the exact
//! pauses it asks for.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Slice length for interruptible sleeps.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Shutdown request shared between the sampling loop and a signal handler.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the loop to stop at its next checkpoint.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

pub trait Clock {
    /// Monotonic time since an arbitrary origin.
    fn now(&self) -> Duration;

    /// Wall-clock milliseconds since the Unix epoch.
    fn epoch_millis(&self) -> i64;

    /// Sleeps for `duration`, returning early once shutdown is requested.
    fn sleep(&self, duration: Duration, shutdown: &Shutdown);
}

/// The real clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn epoch_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn sleep(&self, duration: Duration, shutdown: &Shutdown) {
        // Sleep with periodic checks for shutdown signal
        let mut remaining = duration;
        while remaining > Duration::ZERO && !shutdown.is_requested() {
            let sleep_time = remaining.min(SLEEP_SLICE);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }
}

#[derive(Debug, Default)]
struct ManualState {
    now: Duration,
    epoch_origin_ms: i64,
    sleeps: Vec<Duration>,
}

/// Clock that only moves when told to.
///
/// `sleep` advances time by the full requested duration and records it.
/// Clones share the same time, so a mock source can advance the clock the
/// sampler reads.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the wall clock at the given epoch milliseconds.
    pub fn with_epoch_origin(self, epoch_ms: i64) -> Self {
        self.lock().epoch_origin_ms = epoch_ms;
        self
    }

    pub fn advance(&self, by: Duration) {
        self.lock().now += by;
    }

    /// Every pause the sampler asked for, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.lock().now
    }

    fn epoch_millis(&self) -> i64 {
        let state = self.lock();
        state.epoch_origin_ms + state.now.as_millis() as i64
    }

    fn sleep(&self, duration: Duration, _shutdown: &Shutdown) {
        let mut state = self.lock();
        state.sleeps.push(duration);
        state.now += duration;
    }
}
