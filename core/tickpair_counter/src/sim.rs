//! Simulated split-counter hardware, for testing code that consumes wide
//! counter values without the real registers.

use core::cell::Cell;
use portable_atomic::{AtomicU64, Ordering};
use tickpair_traits::SplitCounter;

/// Replays fixed sequences of register values.
///
/// The n-th `read_high` returns `highs[n]` and the n-th `read_low` returns
/// `lows[n]`, whatever order the two registers are read in. Reading past the
/// end of a script panics: a reader that needs more reads than scripted is a
/// failing test.
#[derive(Debug)]
pub struct ScriptedPair<'a> {
    highs: &'a [u32],
    lows: &'a [u32],
    next_high: Cell<usize>,
    next_low: Cell<usize>,
}

impl<'a> ScriptedPair<'a> {
    pub fn new(highs: &'a [u32], lows: &'a [u32]) -> Self {
        Self {
            highs,
            lows,
            next_high: Cell::new(0),
            next_low: Cell::new(0),
        }
    }

    pub fn high_reads(&self) -> usize {
        self.next_high.get()
    }

    pub fn low_reads(&self) -> usize {
        self.next_low.get()
    }

    fn replay(script: &[u32], cursor: &Cell<usize>, register: &str) -> u32 {
        let index = cursor.get();
        let Some(value) = script.get(index) else {
            panic!("{register} register read #{} is past the end of the script", index + 1);
        };
        cursor.set(index + 1);
        *value
    }
}

impl SplitCounter for ScriptedPair<'_> {
    fn read_low(&self) -> u32 {
        Self::replay(self.lows, &self.next_low, "low")
    }

    fn read_high(&self) -> u32 {
        Self::replay(self.highs, &self.next_high, "high")
    }
}

/// A free-running 64-bit counter that moves forward by `step` on every
/// register access, so any reader sees it advance between its own reads.
///
/// The value lives in an atomic and the type is `Sync`: several threads can
/// hammer the same counter to exercise readers under contention.
#[derive(Debug)]
pub struct SimulatedCounter {
    value: AtomicU64,
    step: u64,
}

impl SimulatedCounter {
    pub fn new(start: u64, step: u64) -> Self {
        Self {
            value: AtomicU64::new(start),
            step,
        }
    }

    /// Current value, without advancing.
    pub fn value(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }

    pub fn set_value(&self, value: u64) {
        self.value.store(value, Ordering::SeqCst);
    }

    /// Moves the counter forward outside of any register access.
    pub fn advance(&self, ticks: u64) {
        self.value.fetch_add(ticks, Ordering::SeqCst);
    }

    #[inline]
    fn tick(&self) -> u64 {
        self.value
            .fetch_add(self.step, Ordering::SeqCst)
            .wrapping_add(self.step)
    }
}

impl SplitCounter for SimulatedCounter {
    fn read_low(&self) -> u32 {
        self.tick() as u32
    }

    fn read_high(&self) -> u32 {
        (self.tick() >> 32) as u32
    }
}
