// --- RV32: every user counter is split into a low CSR and an `h` CSR.

use crate::{read_wide_counter, WideCounterValue};
use tickpair_traits::SplitCounter;

macro_rules! split_csr {
    ($(#[$meta:meta])* $name:ident, $low:literal, $high:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, Default)]
        pub struct $name;

        impl SplitCounter for $name {
            #[inline(always)]
            fn read_low(&self) -> u32 {
                let low: u32;
                // SAFETY: reading a user counter CSR has no side effect.
                unsafe {
                    core::arch::asm!(concat!($low, " {}"), out(reg) low, options(nomem, nostack));
                }
                low
            }

            #[inline(always)]
            fn read_high(&self) -> u32 {
                let high: u32;
                // SAFETY: reading a user counter CSR has no side effect.
                unsafe {
                    core::arch::asm!(concat!($high, " {}"), out(reg) high, options(nomem, nostack));
                }
                high
            }
        }
    };
}

split_csr!(
    /// The platform real-time counter (`time` / `timeh`).
    TimeCsr,
    "rdtime",
    "rdtimeh"
);

split_csr!(
    /// Core clock cycles (`cycle` / `cycleh`).
    CycleCsr,
    "rdcycle",
    "rdcycleh"
);

split_csr!(
    /// Retired instructions (`instret` / `instreth`).
    InstretCsr,
    "rdinstret",
    "rdinstreth"
);

pub fn initialize() {}

#[inline(always)]
pub fn read_time() -> WideCounterValue {
    read_wide_counter(&TimeCsr)
}

#[inline(always)]
pub fn read_cycle() -> WideCounterValue {
    read_wide_counter(&CycleCsr)
}

#[inline(always)]
pub fn read_instret() -> WideCounterValue {
    read_wide_counter(&InstretCsr)
}
