//! Edge timestamp capture for the HLW8012 pulse outputs.
//!
//! The metering chip emits a square wave on `CF` (active power) and `CF1`
//! (RMS current) whose frequency is proportional to the measured quantity.
//! A GPIO ISR fires on every rising edge and calls
//! [`PulseChannel::record_edge`] with the current microsecond timestamp.
//!
//! ## Consistent snapshots
//!
//! The estimator needs `(last_period, last_edge)` as a pair taken at the
//! same instant.  Two separate atomic loads could straddle an edge, so the
//! channel uses a sequence counter:
//!
//! - writer (ISR): sequence → odd, store fields, sequence → even
//! - reader: retry while the sequence is odd or changed across the copy
//!
//! The ISR never waits on the reader, and the reader retries at most once
//! per edge that lands during its copy.  Everything is fixed-size atomics,
//! so nothing allocates on the interrupt path.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering, fence};

/// A consistent copy of one channel's edge state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PulseSnapshot {
    /// Duration between the two most recent rising edges (µs).
    /// `0` means fewer than two edges have been seen.
    pub last_period_us: u32,
    /// Timestamp of the most recent rising edge (µs, wrapping).
    pub last_edge_us: u32,
}

/// One monitored pulse line.
///
/// `const`-constructible so the two ISR-facing channels can live in
/// statics; tests build their own instances on the stack.
pub struct PulseChannel {
    seq: AtomicU32,
    last_edge_us: AtomicU32,
    last_period_us: AtomicU32,
    /// Set on the first edge; keeps an edge at `t = 0` from being read as
    /// "no previous edge".
    primed: AtomicBool,
}

impl PulseChannel {
    pub const fn new() -> Self {
        Self {
            seq: AtomicU32::new(0),
            last_edge_us: AtomicU32::new(0),
            last_period_us: AtomicU32::new(0),
            primed: AtomicBool::new(false),
        }
    }

    /// Record a rising edge observed at `now_us`.
    ///
    /// Bounded and lock-free.  Must only be called from the channel's own
    /// edge handler (single writer).
    pub fn record_edge(&self, now_us: u32) {
        let primed = self.primed.load(Ordering::Relaxed);
        let prev_edge = self.last_edge_us.load(Ordering::Relaxed);

        let seq = self.seq.load(Ordering::Relaxed);
        self.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        if primed {
            self.last_period_us
                .store(now_us.wrapping_sub(prev_edge), Ordering::Relaxed);
        }
        self.last_edge_us.store(now_us, Ordering::Relaxed);

        self.seq.store(seq.wrapping_add(2), Ordering::Release);
        self.primed.store(true, Ordering::Relaxed);
    }

    /// Copy both fields as they were at a single instant.
    pub fn snapshot(&self) -> PulseSnapshot {
        loop {
            let before = self.seq.load(Ordering::Acquire);
            if before & 1 == 1 {
                core::hint::spin_loop();
                continue;
            }

            let last_period_us = self.last_period_us.load(Ordering::Relaxed);
            let last_edge_us = self.last_edge_us.load(Ordering::Relaxed);

            fence(Ordering::Acquire);
            if self.seq.load(Ordering::Relaxed) == before {
                return PulseSnapshot {
                    last_period_us,
                    last_edge_us,
                };
            }
        }
    }
}

impl Default for PulseChannel {
    fn default() -> Self {
        Self::new()
    }
}

// ── ISR-facing channels ───────────────────────────────────────

/// `CF` line: pulse frequency proportional to active power.
pub static POWER_PULSES: PulseChannel = PulseChannel::new();

/// `CF1` line: pulse frequency proportional to RMS current.
pub static CURRENT_PULSES: PulseChannel = PulseChannel::new();

/// Called from the `CF` GPIO ISR on each rising edge.
pub fn power_pulse_isr(now_us: u32) {
    POWER_PULSES.record_edge(now_us);
}

/// Called from the `CF1` GPIO ISR on each rising edge.
pub fn current_pulse_isr(now_us: u32) {
    CURRENT_PULSES.record_edge(now_us);
}
