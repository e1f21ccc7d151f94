//! Real-time tick scheduling.
//!
//! Wall-clock time is converted into fixed 100 µs batches. Each batch runs a
//! whole number of clock ticks (400 at 4 MHz), so devices advance in lockstep
//! and the guest runs at roughly its real speed. After a stall (window drag,
//! debugger break) at most 50 ms is caught up at once.

use log::debug;
use std::time::{Duration, Instant};

/// Emulated time covered by one batch.
pub const TICK_QUANTUM: Duration = Duration::from_micros(100);

/// Longest wall-clock interval processed in one scheduling step.
pub const MAX_CATCH_UP: Duration = Duration::from_millis(50);

/// Work for one scheduling step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickPlan {
    pub batches: u32,
    pub ticks_per_batch: u32,
    pub seconds_per_batch: f64,
}

impl TickPlan {
    /// A plan that does nothing.
    pub fn idle(ticks_per_batch: u32, seconds_per_batch: f64) -> Self {
        Self {
            batches: 0,
            ticks_per_batch,
            seconds_per_batch,
        }
    }

    pub fn total_ticks(&self) -> u64 {
        self.batches as u64 * self.ticks_per_batch as u64
    }
}

/// Converts elapsed wall-clock time into tick batches.
///
/// # Examples
///
/// ```rust
/// use sbc6502::Scheduler;
/// use std::time::Duration;
///
/// let scheduler = Scheduler::new(4_000_000);
/// let plan = scheduler.plan(Duration::from_micros(300));
/// assert_eq!(plan.batches, 3);
/// assert_eq!(plan.ticks_per_batch, 400);
/// ```
#[derive(Debug, Clone)]
pub struct Scheduler {
    clock_hz: u32,
    quantum: Duration,
    max_elapsed: Duration,
    last: Option<Instant>,
}

impl Scheduler {
    pub fn new(clock_hz: u32) -> Self {
        Self::with_timing(clock_hz, TICK_QUANTUM, MAX_CATCH_UP)
    }

    /// Scheduler with a custom quantum and catch-up limit.
    ///
    /// A zero quantum is replaced by [`TICK_QUANTUM`].
    pub fn with_timing(clock_hz: u32, quantum: Duration, max_elapsed: Duration) -> Self {
        let quantum = if quantum.is_zero() {
            TICK_QUANTUM
        } else {
            quantum
        };
        Self {
            clock_hz,
            quantum,
            max_elapsed,
            last: None,
        }
    }

    pub fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    pub fn quantum(&self) -> Duration {
        self.quantum
    }

    /// Clock ticks in one batch: `round(clock_hz * quantum)`.
    pub fn ticks_per_batch(&self) -> u32 {
        let nanos = self.clock_hz as u128 * self.quantum.as_nanos();
        ((nanos + 500_000_000) / 1_000_000_000) as u32
    }

    /// Batches for `elapsed` wall-clock time.
    ///
    /// Zero elapsed time yields no batches; any positive interval yields at
    /// least one.
    pub fn plan(&self, elapsed: Duration) -> TickPlan {
        let ticks_per_batch = self.ticks_per_batch();
        let seconds_per_batch = self.quantum.as_secs_f64();

        if elapsed.is_zero() {
            return TickPlan::idle(ticks_per_batch, seconds_per_batch);
        }

        let clamped = if elapsed > self.max_elapsed {
            debug!(
                "scheduler clamped {:?} to {:?}",
                elapsed, self.max_elapsed
            );
            self.max_elapsed
        } else {
            elapsed
        };

        let batches = (clamped.as_nanos() / self.quantum.as_nanos()).max(1);

        TickPlan {
            batches: batches.min(u32::MAX as u128) as u32,
            ticks_per_batch,
            seconds_per_batch,
        }
    }

    /// Plan for the time since the previous call.
    ///
    /// The first call only starts the clock and returns an idle plan.
    pub fn advance(&mut self, now: Instant) -> TickPlan {
        match self.last.replace(now) {
            Some(previous) => self.plan(now.saturating_duration_since(previous)),
            None => TickPlan::idle(self.ticks_per_batch(), self.quantum.as_secs_f64()),
        }
    }

    /// Forget the previous timestamp so time spent paused is not caught up.
    pub fn restart_clock(&mut self) {
        self.last = None;
    }
}
