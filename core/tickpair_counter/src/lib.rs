#![cfg_attr(not(feature = "std"), no_std)]
//! Wide (64-bit) reads of hardware counters that the platform only exposes as
//! a pair of 32-bit registers.
//!
//! The counter is read high, low, high. If both high reads agree the low read
//! belongs to them. If they differ the low half wrapped somewhere in between,
//! so the low register is read once more and paired with the later high value.
//! No lock, no interrupt masking and no allocation is involved, which makes
//! every reader here callable from any context, including trap handlers.
//!
//! The per-target backends ([`read_time`], [`read_cycle`]) are thin wrappers
//! around the one generic algorithm, [`read_wide_counter`].

mod reader;
pub mod sim;

#[cfg(target_arch = "riscv32")]
mod riscv32;
#[cfg(target_arch = "riscv32")]
pub use riscv32::*;

#[cfg(target_arch = "riscv64")]
mod riscv64;
#[cfg(target_arch = "riscv64")]
pub use riscv64::*;

#[cfg(not(any(target_arch = "riscv32", target_arch = "riscv64")))]
mod fallback;
#[cfg(not(any(target_arch = "riscv32", target_arch = "riscv64")))]
pub use fallback::*;

pub use reader::{read_wide_counter, read_wide_counter_bounded, CarryStorm, DEFAULT_MAX_ATTEMPTS};
pub use tickpair_traits::SplitCounter;

use bincode::de::{BorrowDecoder, Decoder};
use bincode::enc::Encoder;
use bincode::error::{DecodeError, EncodeError};
use bincode::{BorrowDecode, Decode, Encode};
use core::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};

/// The logically correct 64-bit value of a split hardware counter at the
/// instant it was read.
///
/// This is a raw tick (or cycle) count: there is no unit attached and no
/// conversion to wall-clock time.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct WideCounterValue(pub u64);

impl WideCounterValue {
    pub const ZERO: WideCounterValue = WideCounterValue(0);
    pub const MAX: WideCounterValue = WideCounterValue(u64::MAX);

    /// Assembles `(high << 32) | low`.
    #[inline(always)]
    pub const fn from_halves(high: u32, low: u32) -> Self {
        WideCounterValue(((high as u64) << 32) | low as u64)
    }

    #[inline]
    pub const fn high(&self) -> u32 {
        (self.0 >> 32) as u32
    }

    #[inline]
    pub const fn low(&self) -> u32 {
        self.0 as u32
    }

    #[inline]
    pub const fn ticks(&self) -> u64 {
        self.0
    }

    /// Number of ticks from `earlier` to `self`.
    ///
    /// The subtraction wraps so that a 64-bit rollover between the two reads
    /// still yields the elapsed count.
    #[inline]
    pub const fn ticks_since(&self, earlier: WideCounterValue) -> u64 {
        self.0.wrapping_sub(earlier.0)
    }
}

impl From<u64> for WideCounterValue {
    fn from(ticks: u64) -> Self {
        WideCounterValue(ticks)
    }
}

impl From<WideCounterValue> for u64 {
    fn from(val: WideCounterValue) -> Self {
        let WideCounterValue(ticks) = val;
        ticks
    }
}

impl Encode for WideCounterValue {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        let WideCounterValue(ticks) = self;
        ticks.encode(encoder)
    }
}

impl<Context> Decode<Context> for WideCounterValue {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        Ok(WideCounterValue(u64::decode(decoder)?))
    }
}

impl<'de, Context> BorrowDecode<'de, Context> for WideCounterValue {
    fn borrow_decode<D: BorrowDecoder<'de, Context = Context>>(
        decoder: &mut D,
    ) -> Result<Self, DecodeError> {
        Ok(WideCounterValue(u64::decode(decoder)?))
    }
}

impl Display for WideCounterValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let Self(ticks) = *self;
        write!(f, "{ticks} ticks")
    }
}
