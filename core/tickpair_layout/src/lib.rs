#![cfg_attr(not(feature = "std"), no_std)]
//! Virtual address space of a 32-bit RISC-V kernel.
//!
//! ```text
//!         2^32 +-------------------+
//!              |  Kernel Devices   |
//!  2^32 - 2^22 +-------------------+ KDEV_BASE
//!              |    Kernel ELF     |
//!  2^32 - 2^23 +-------------------+ KERNEL_ELF_BASE
//!              |   (log buffer)    |
//!              +-------------------+ PPTR_TOP
//!              |  Physical Memory  |
//!              |       Window      |
//!              +-------------------+ USER_TOP / PPTR_BASE
//!              |       User        |
//!          0x0 +-------------------+
//! ```
//!
//! The layout is plain data. It is assembled once from [`PlatformParams`],
//! validated, and handed to whoever needs the boundaries.

#[cfg(feature = "std")]
pub mod config;

use bincode::{Decode, Encode};
use core::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};

/// Exclusive upper bound of a 32-bit address space.
pub const ADDRESS_SPACE_LIMIT: u64 = 1 << 32;

pub const DEFAULT_USER_TOP: u64 = 0x8000_0000;
pub const DEFAULT_PADDR_BASE: u64 = 0x8000_0000;

/// Top of the physical memory window when no log buffer is carved out.
pub const PPTR_TOP: u64 = 0xFF80_0000;

/// Room taken from the top of the physical memory window by the kernel log
/// buffer.
pub const LOG_BUFFER_SIZE: u64 = 0x40_0000;

/// Physical address the kernel image is linked to (1 GiB aligned).
pub const KERNEL_ELF_PADDR_BASE: u64 = 0x8400_0000;
pub const KERNEL_ELF_BASE: u64 = 0xFF80_0000;
pub const KDEV_BASE: u64 = 0xFFC0_0000;

/// What a platform has to tell us to build its [`AddressLayout`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
#[serde(default, deny_unknown_fields)]
pub struct PlatformParams {
    /// Last address usable by user space, also where the physical memory
    /// window starts.
    pub user_top: u64,
    /// First physical address mapped by the physical memory window.
    pub paddr_base: u64,
    /// Carve the kernel log buffer out of the top of the window.
    pub kernel_log_buffer: bool,
}

impl Default for PlatformParams {
    fn default() -> Self {
        PlatformParams {
            user_top: DEFAULT_USER_TOP,
            paddr_base: DEFAULT_PADDR_BASE,
            kernel_log_buffer: false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct LogBufferRegion {
    pub base: u64,
    pub size: u64,
}

impl LogBufferRegion {
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr - self.base < self.size
    }

    /// First address past the buffer, `None` if it would not fit in a `u64`.
    pub fn end(&self) -> Option<u64> {
        self.base.checked_add(self.size)
    }
}

/// The address space boundaries, all in one immutable value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct AddressLayout {
    pub user_top: u64,
    pub paddr_base: u64,
    pub pptr_base: u64,
    pub pptr_top: u64,
    pub kernel_elf_paddr_base: u64,
    pub kernel_elf_base: u64,
    pub kdev_base: u64,
    pub address_space_limit: u64,
    pub log_buffer: Option<LogBufferRegion>,
}

/// Where an address falls in an [`AddressLayout`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Region {
    User,
    PhysicalWindow,
    LogBuffer,
    KernelElf,
    KernelDevices,
    OutOfRange,
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Region::User => "user",
            Region::PhysicalWindow => "physical memory window",
            Region::LogBuffer => "kernel log buffer",
            Region::KernelElf => "kernel ELF",
            Region::KernelDevices => "kernel devices",
            Region::OutOfRange => "out of range",
        };
        f.write_str(name)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LayoutError {
    EmptyUserSpace,
    Misordered {
        lower: &'static str,
        lower_addr: u64,
        upper: &'static str,
        upper_addr: u64,
    },
    BeyondAddressSpace {
        name: &'static str,
        addr: u64,
        limit: u64,
    },
    /// Two regions that must touch do not.
    NotAdjacent {
        lower: &'static str,
        upper: &'static str,
        expected: u64,
        found: u64,
    },
    /// A region starting at `base` cannot be `size` bytes long.
    Overflow {
        name: &'static str,
        base: u64,
        size: u64,
    },
}

impl Display for LayoutError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            LayoutError::EmptyUserSpace => write!(f, "USER_TOP is 0, user space would be empty"),
            LayoutError::Misordered {
                lower,
                lower_addr,
                upper,
                upper_addr,
            } => write!(
                f,
                "{lower} (0x{lower_addr:08x}) must not be above {upper} (0x{upper_addr:08x})"
            ),
            LayoutError::BeyondAddressSpace { name, addr, limit } => write!(
                f,
                "{name} (0x{addr:08x}) is outside the address space (limit 0x{limit:x})"
            ),
            LayoutError::NotAdjacent {
                lower,
                upper,
                expected,
                found,
            } => write!(
                f,
                "{lower} must end where {upper} starts: expected 0x{expected:08x}, found 0x{found:08x}"
            ),
            LayoutError::Overflow { name, base, size } => write!(
                f,
                "{name} at 0x{base:08x} cannot span 0x{size:x} bytes"
            ),
        }
    }
}

impl core::error::Error for LayoutError {}

#[cfg(feature = "std")]
impl From<LayoutError> for tickpair_traits::TickError {
    fn from(err: LayoutError) -> Self {
        tickpair_traits::TickError::from("Invalid address layout").add_cause(&err.to_string())
    }
}

impl AddressLayout {
    /// Builds and validates the layout for a platform.
    pub fn new(params: &PlatformParams) -> Result<Self, LayoutError> {
        let (pptr_top, log_buffer) = if params.kernel_log_buffer {
            let top = PPTR_TOP - LOG_BUFFER_SIZE;
            let buffer = LogBufferRegion {
                base: top,
                size: LOG_BUFFER_SIZE,
            };
            (top, Some(buffer))
        } else {
            (PPTR_TOP, None)
        };

        let layout = AddressLayout {
            user_top: params.user_top,
            paddr_base: params.paddr_base,
            pptr_base: params.user_top,
            pptr_top,
            kernel_elf_paddr_base: KERNEL_ELF_PADDR_BASE,
            kernel_elf_base: KERNEL_ELF_BASE,
            kdev_base: KDEV_BASE,
            address_space_limit: ADDRESS_SPACE_LIMIT,
            log_buffer,
        };
        layout.validate()?;

        log::debug!(
            "address layout: user [0, 0x{:08x}) window [0x{:08x}, 0x{:08x}) log buffer {} elf 0x{:08x} kdev 0x{:08x}",
            layout.user_top,
            layout.pptr_base,
            layout.pptr_top,
            layout.log_buffer.is_some(),
            layout.kernel_elf_base,
            layout.kdev_base
        );
        Ok(layout)
    }

    /// Checks `0 < USER_TOP = PPTR_BASE <= PPTR_TOP <= KERNEL_ELF_BASE <= KDEV_BASE < limit`,
    /// and that the window (plus the log buffer, if any) runs right up to the
    /// kernel image.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.user_top == 0 {
            return Err(LayoutError::EmptyUserSpace);
        }
        if self.pptr_base != self.user_top {
            return Err(LayoutError::NotAdjacent {
                lower: "USER_TOP",
                upper: "PPTR_BASE",
                expected: self.user_top,
                found: self.pptr_base,
            });
        }

        let ordered = [
            ("PPTR_BASE", self.pptr_base),
            ("PPTR_TOP", self.pptr_top),
            ("KERNEL_ELF_BASE", self.kernel_elf_base),
            ("KDEV_BASE", self.kdev_base),
        ];
        for pair in ordered.windows(2) {
            let (lower, lower_addr) = pair[0];
            let (upper, upper_addr) = pair[1];
            if lower_addr > upper_addr {
                return Err(LayoutError::Misordered {
                    lower,
                    lower_addr,
                    upper,
                    upper_addr,
                });
            }
        }

        if self.kdev_base >= self.address_space_limit {
            return Err(LayoutError::BeyondAddressSpace {
                name: "KDEV_BASE",
                addr: self.kdev_base,
                limit: self.address_space_limit,
            });
        }

        let window_end = match self.log_buffer {
            Some(buffer) => {
                if buffer.base != self.pptr_top {
                    return Err(LayoutError::NotAdjacent {
                        lower: "PPTR_TOP",
                        upper: "the log buffer",
                        expected: self.pptr_top,
                        found: buffer.base,
                    });
                }
                buffer.end().ok_or(LayoutError::Overflow {
                    name: "the log buffer",
                    base: buffer.base,
                    size: buffer.size,
                })?
            }
            None => self.pptr_top,
        };
        if window_end != self.kernel_elf_base {
            return Err(LayoutError::NotAdjacent {
                lower: "the physical memory window",
                upper: "KERNEL_ELF_BASE",
                expected: self.kernel_elf_base,
                found: window_end,
            });
        }

        let window_size = self.pptr_window_size();
        if self.paddr_base.checked_add(window_size).is_none() {
            return Err(LayoutError::Overflow {
                name: "PADDR_BASE",
                base: self.paddr_base,
                size: window_size,
            });
        }
        Ok(())
    }

    pub fn pptr_window_size(&self) -> u64 {
        self.pptr_top.saturating_sub(self.pptr_base)
    }

    pub fn region_of(&self, addr: u64) -> Region {
        if addr < self.user_top {
            Region::User
        } else if addr < self.pptr_top {
            Region::PhysicalWindow
        } else if self.log_buffer.is_some_and(|b| b.contains(addr)) {
            Region::LogBuffer
        } else if addr >= self.kernel_elf_base && addr < self.kdev_base {
            Region::KernelElf
        } else if addr >= self.kdev_base && addr < self.address_space_limit {
            Region::KernelDevices
        } else {
            Region::OutOfRange
        }
    }

    /// Virtual address of a physical address through the 1:1 window.
    pub fn paddr_to_pptr(&self, paddr: u64) -> Option<u64> {
        let offset = paddr.checked_sub(self.paddr_base)?;
        if offset >= self.pptr_window_size() {
            return None;
        }
        self.pptr_base.checked_add(offset)
    }

    /// Physical address behind a window address.
    pub fn pptr_to_paddr(&self, pptr: u64) -> Option<u64> {
        if pptr < self.pptr_base || pptr >= self.pptr_top {
            return None;
        }
        (pptr - self.pptr_base).checked_add(self.paddr_base)
    }

    pub fn kernel_elf_vaddr_to_paddr(&self, vaddr: u64) -> Option<u64> {
        if vaddr < self.kernel_elf_base || vaddr >= self.kdev_base {
            return None;
        }
        (vaddr - self.kernel_elf_base).checked_add(self.kernel_elf_paddr_base)
    }
}
