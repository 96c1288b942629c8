// --- RV64: the counter CSRs are XLEN wide, a single read is already atomic.

use crate::WideCounterValue;

pub fn initialize() {}

#[inline(always)]
pub fn read_time() -> WideCounterValue {
    let counter: u64;
    // SAFETY: Reading the time CSR is a side-effect-free instruction.
    unsafe {
        core::arch::asm!("rdtime {}", out(reg) counter, options(nomem, nostack));
    }
    WideCounterValue(counter)
}

#[inline(always)]
pub fn read_cycle() -> WideCounterValue {
    let counter: u64;
    // SAFETY: Reading the cycle counter register is a side-effect-free CPU instruction.
    unsafe {
        core::arch::asm!("rdcycle {}", out(reg) counter, options(nomem, nostack));
    }
    WideCounterValue(counter)
}

#[inline(always)]
pub fn read_instret() -> WideCounterValue {
    let counter: u64;
    // SAFETY: Reading the instret CSR is a side-effect-free instruction.
    unsafe {
        core::arch::asm!("rdinstret {}", out(reg) counter, options(nomem, nostack));
    }
    WideCounterValue(counter)
}
