//! Interrupt line aggregation for memory-mapped devices.
//!
//! The 6502 has a single active-low IRQ input shared by every peripheral on
//! the board. Each peripheral drives its own numbered line into a wired-OR;
//! the CPU sees the IRQ input asserted while any line asserts.
//!
//! # Line Signals
//!
//! Every line holds one of three signals:
//!
//! - **Raise**: level request, contributes to the aggregate until released
//! - **Trigger**: one-shot pulse; contributes exactly once and then falls back
//!   to `Release`
//! - **Release**: contributes nothing
//!
//! The aggregate is recomputed after every `raise` call and delivered as the
//! CPU's maskable interrupt input, readable through
//! [`InterruptController::irq_asserted`].
//!
//! # Example
//!
//! ```rust
//! use sbc6502::{InterruptController, InterruptSignal};
//!
//! let mut irq = InterruptController::new();
//!
//! irq.raise(2, InterruptSignal::Raise);
//! assert!(irq.irq_asserted());
//!
//! irq.raise(2, InterruptSignal::Release);
//! assert!(!irq.irq_asserted());
//!
//! // Line 0 is "no interrupt" in device configuration and is ignored.
//! irq.raise(0, InterruptSignal::Raise);
//! assert!(!irq.irq_asserted());
//! ```

use log::trace;

/// Number of interrupt lines feeding the aggregate.
pub const IRQ_LINE_COUNT: usize = 5;

/// Signal driven onto an interrupt line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterruptSignal {
    /// Line idle.
    #[default]
    Release,
    /// Level request held until released.
    Raise,
    /// Single pulse consumed by the next aggregation.
    Trigger,
}

impl InterruptSignal {
    /// Contribute this line to the aggregate.
    ///
    /// Returns whether the line asserts. A `Trigger` asserts once and is
    /// consumed, leaving the line at `Release`.
    fn contribute(&mut self) -> bool {
        match *self {
            InterruptSignal::Raise => true,
            InterruptSignal::Trigger => {
                *self = InterruptSignal::Release;
                true
            }
            InterruptSignal::Release => false,
        }
    }
}

/// Wired-OR aggregator for the numbered interrupt lines (1..=5).
#[derive(Debug, Clone, Default)]
pub struct InterruptController {
    lines: [InterruptSignal; IRQ_LINE_COUNT],
    cpu_irq: bool,
}

impl InterruptController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive `signal` onto `line` and recompute the CPU IRQ input.
    ///
    /// Lines outside `1..=5` are ignored. Returns the resulting IRQ input.
    pub fn raise(&mut self, line: u8, signal: InterruptSignal) -> bool {
        let Some(slot) = Self::index(line).and_then(|i| self.lines.get_mut(i)) else {
            return self.cpu_irq;
        };
        if *slot != signal {
            trace!("irq line {} -> {:?}", line, signal);
        }
        *slot = signal;
        self.recompute()
    }

    /// Recompute the aggregate from the current line signals.
    ///
    /// Triggered lines are consumed by this call.
    pub fn recompute(&mut self) -> bool {
        let mut asserted = false;
        for line in self.lines.iter_mut() {
            // every line must be visited so pending triggers are consumed
            asserted |= line.contribute();
        }
        if asserted != self.cpu_irq {
            trace!(
                "cpu irq input {}",
                if asserted { "asserted" } else { "released" }
            );
        }
        self.cpu_irq = asserted;
        asserted
    }

    /// Current state of the CPU's maskable interrupt input.
    pub fn irq_asserted(&self) -> bool {
        self.cpu_irq
    }

    /// Signal currently held by `line`, or `None` if the line does not exist.
    pub fn line(&self, line: u8) -> Option<InterruptSignal> {
        Self::index(line).and_then(|i| self.lines.get(i)).copied()
    }

    /// Release every line and the CPU IRQ input.
    pub fn reset(&mut self) {
        self.lines = [InterruptSignal::Release; IRQ_LINE_COUNT];
        self.cpu_irq = false;
    }

    fn index(line: u8) -> Option<usize> {
        match line as usize {
            0 => None,
            n if n <= IRQ_LINE_COUNT => Some(n - 1),
            _ => None,
        }
    }
}
