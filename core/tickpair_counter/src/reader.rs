use crate::WideCounterValue;
use core::fmt::{Display, Formatter};
use core::sync::atomic::{compiler_fence, Ordering};
use tickpair_traits::SplitCounter;

/// Attempts used by callers of [`read_wide_counter_bounded`] that have no
/// better figure for their hardware.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Reads a split counter as one consistent 64-bit value.
///
/// Three register reads in the common case (high, low, high), four when a
/// carry into the high half is observed between the two high reads. In that
/// case the first low read may belong to either side of the carry, so it is
/// discarded and the low half is read again to go with the later high value.
///
/// At most one carry is assumed to fit in the read window. Debug builds
/// assert it.
#[inline(always)]
pub fn read_wide_counter<C: SplitCounter + ?Sized>(counter: &C) -> WideCounterValue {
    let high1 = counter.read_high();
    compiler_fence(Ordering::SeqCst);
    let low = counter.read_low();
    compiler_fence(Ordering::SeqCst);
    let high2 = counter.read_high();

    if high1 == high2 {
        return WideCounterValue::from_halves(high1, low);
    }

    debug_assert_eq!(
        high2,
        high1.wrapping_add(1),
        "more than one carry between two reads of the high half"
    );

    compiler_fence(Ordering::SeqCst);
    let low2 = counter.read_low();
    WideCounterValue::from_halves(high2, low2)
}

/// The high half of a split counter kept moving for longer than the caller
/// allowed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CarryStorm {
    pub attempts: u32,
    pub first_high: u32,
    pub last_high: u32,
}

impl Display for CarryStorm {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "high half still changing after {} attempts (0x{:08x} -> 0x{:08x})",
            self.attempts, self.first_high, self.last_high
        )
    }
}

impl core::error::Error for CarryStorm {}

#[cfg(feature = "std")]
impl From<CarryStorm> for tickpair_traits::TickError {
    fn from(storm: CarryStorm) -> Self {
        tickpair_traits::TickError::from("Torn read of a split counter").add_cause(&storm.to_string())
    }
}

/// Reads a split counter on hardware where more than one carry can land in
/// the read window.
///
/// Each attempt reads the low half and then the high half again; the value
/// is accepted once the high half did not move across the low read. Gives up
/// with [`CarryStorm`] after `max_attempts` (a bound of 0 counts as 1)
/// instead of returning a value that may be torn.
pub fn read_wide_counter_bounded<C: SplitCounter + ?Sized>(
    counter: &C,
    max_attempts: u32,
) -> Result<WideCounterValue, CarryStorm> {
    let max_attempts = max_attempts.max(1);
    let first_high = counter.read_high();
    let mut high = first_high;
    let mut last_high = first_high;
    for _ in 0..max_attempts {
        compiler_fence(Ordering::SeqCst);
        let low = counter.read_low();
        compiler_fence(Ordering::SeqCst);
        last_high = counter.read_high();
        if last_high == high {
            return Ok(WideCounterValue::from_halves(high, low));
        }
        high = last_high;
    }

    let storm = CarryStorm {
        attempts: max_attempts,
        first_high,
        last_high,
    };
    log::warn!("{storm}");
    Err(storm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{ScriptedPair, SimulatedCounter};

    #[test]
    fn test_no_carry() {
        let pair = ScriptedPair::new(&[0x0000_0001, 0x0000_0001], &[0xFFFF_FFF0]);
        assert_eq!(read_wide_counter(&pair), WideCounterValue(0x1_FFFF_FFF0));
        assert_eq!(pair.high_reads(), 2);
        assert_eq!(pair.low_reads(), 1);
    }

    #[test]
    fn test_carry_uses_later_high_and_fresh_low() {
        let pair = ScriptedPair::new(&[0x0000_0001, 0x0000_0002], &[0x0000_0002, 0x0000_0005]);
        let value = read_wide_counter(&pair);
        assert_eq!(value, WideCounterValue(0x2_0000_0005));
        assert_ne!(value, WideCounterValue(0x1_0000_0002));
        assert_eq!(pair.high_reads(), 2);
        assert_eq!(pair.low_reads(), 2);
    }

    #[test]
    fn test_carry_with_stale_low_from_before_the_wrap() {
        // the low read landed just before the wrap
        let pair = ScriptedPair::new(&[0x7, 0x8], &[0xFFFF_FFFF, 0x0000_0001]);
        assert_eq!(read_wide_counter(&pair), WideCounterValue(0x8_0000_0001));
    }

    #[test]
    fn test_high_wrapping_to_zero_is_a_single_carry() {
        let pair = ScriptedPair::new(&[u32::MAX, 0], &[0x0000_0003, 0x0000_0004]);
        assert_eq!(read_wide_counter(&pair), WideCounterValue(0x4));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "more than one carry")]
    fn test_double_carry_is_fatal_in_debug() {
        let pair = ScriptedPair::new(&[0x1, 0x3], &[0x0, 0x0]);
        let _ = read_wide_counter(&pair);
    }

    #[test]
    fn test_simulated_counter_across_the_wrap() {
        let counter = SimulatedCounter::new(0xFFFF_FFFE, 1);
        // reads observe 0xFFFF_FFFF (high), 0x1_0000_0000 (low), 0x1_0000_0001 (high)
        // then the fresh low at 0x1_0000_0002
        assert_eq!(read_wide_counter(&counter), WideCounterValue(0x1_0000_0002));
        assert_eq!(counter.value(), 0x1_0000_0002);
    }

    #[test]
    fn test_result_is_a_value_the_counter_held() {
        for start in [0u64, 0xFFFF_FFF0, 0xFFFF_FFFD, 0x1_FFFF_FFFF, 0x41_FFFF_FFFE] {
            for step in [1u64, 3, 7, 0x1000] {
                let counter = SimulatedCounter::new(start, step);
                let value = read_wide_counter(&counter).ticks();
                assert!(value > start, "start {start:#x} step {step}");
                assert!(value <= counter.value(), "start {start:#x} step {step}");
                assert_eq!((value - start) % step, 0, "start {start:#x} step {step}");
            }
        }
    }

    #[test]
    fn test_bounded_without_carry() {
        let pair = ScriptedPair::new(&[0x5, 0x5], &[0x10]);
        assert_eq!(
            read_wide_counter_bounded(&pair, DEFAULT_MAX_ATTEMPTS),
            Ok(WideCounterValue(0x5_0000_0010))
        );
    }

    #[test]
    fn test_bounded_retries_through_two_carries() {
        let pair = ScriptedPair::new(&[0x1, 0x2, 0x3, 0x3], &[0xFFFF_FFFF, 0xFFFF_FFFE, 0x9]);
        assert_eq!(
            read_wide_counter_bounded(&pair, 3),
            Ok(WideCounterValue(0x3_0000_0009))
        );
        assert_eq!(pair.high_reads(), 4);
        assert_eq!(pair.low_reads(), 3);
    }

    #[test]
    fn test_bounded_gives_up_loudly() {
        let pair = ScriptedPair::new(&[0x1, 0x2, 0x3], &[0x0, 0x0]);
        let err = read_wide_counter_bounded(&pair, 2).unwrap_err();
        assert_eq!(
            err,
            CarryStorm {
                attempts: 2,
                first_high: 0x1,
                last_high: 0x3,
            }
        );
        assert_eq!(
            err.to_string(),
            "high half still changing after 2 attempts (0x00000001 -> 0x00000003)"
        );
    }

    #[test]
    fn test_bounded_zero_attempts_still_reads_once() {
        let pair = ScriptedPair::new(&[0x2, 0x2], &[0x1]);
        assert_eq!(
            read_wide_counter_bounded(&pair, 0),
            Ok(WideCounterValue(0x2_0000_0001))
        );
    }

    #[test]
    fn test_bounded_zero_attempts_reports_a_single_attempt() {
        let pair = ScriptedPair::new(&[0x7, 0x8], &[0x0]);
        assert_eq!(
            read_wide_counter_bounded(&pair, 0),
            Err(CarryStorm {
                attempts: 1,
                first_high: 0x7,
                last_high: 0x8,
            })
        );
        assert_eq!(pair.high_reads(), 2);
        assert_eq!(pair.low_reads(), 1);
    }

    #[test]
    #[cfg(feature = "std")]
    fn test_carry_storm_into_tick_error() {
        let err: tickpair_traits::TickError = CarryStorm {
            attempts: 4,
            first_high: 0,
            last_high: 4,
        }
        .into();
        assert_eq!(err.message(), "Torn read of a split counter");
        assert!(err.cause().unwrap().contains("after 4 attempts"));
    }
}
