// Development hosts have a native 64-bit counter. It is exposed here through the
// same split view as the RV32 registers so the reader runs, and races, for real.

#[cfg(not(feature = "std"))]
compile_error!("no split counter backend for this target without the std feature");

use crate::{read_wide_counter, WideCounterValue};
use quanta::Clock;
use std::sync::OnceLock;
use tickpair_traits::SplitCounter;

/// A split view of the host's raw monotonic counter (TSC, `cntvct_el0`, or
/// the OS monotonic clock, whichever quanta picked).
///
/// Each half comes from its own counter read, exactly like two CSR reads.
#[derive(Clone, Debug)]
pub struct HostCounter {
    clock: Clock,
}

impl HostCounter {
    pub fn new() -> Self {
        HostCounter {
            clock: Clock::new(),
        }
    }

    /// Builds a host counter driven by a quanta mock. The mock value is what
    /// both halves are cut from.
    pub fn mock() -> (Self, std::sync::Arc<quanta::Mock>) {
        let (clock, mock) = Clock::mock();
        (HostCounter { clock }, mock)
    }
}

impl Default for HostCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl SplitCounter for HostCounter {
    #[inline(always)]
    fn read_low(&self) -> u32 {
        self.clock.raw() as u32
    }

    #[inline(always)]
    fn read_high(&self) -> u32 {
        (self.clock.raw() >> 32) as u32
    }
}

static HOST_COUNTER: OnceLock<HostCounter> = OnceLock::new();

fn host_counter() -> &'static HostCounter {
    HOST_COUNTER.get_or_init(HostCounter::new)
}

/// Builds the host counter up front; quanta calibrates on first use.
pub fn initialize() {
    let _ = host_counter();
}

/// On hosts, the time and cycle counters are the same raw source.
#[inline(always)]
pub fn read_time() -> WideCounterValue {
    read_wide_counter(host_counter())
}

#[inline(always)]
pub fn read_cycle() -> WideCounterValue {
    read_wide_counter(host_counter())
}
