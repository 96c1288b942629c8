#![cfg_attr(not(feature = "std"), no_std)]
extern crate alloc;

use alloc::string::{String, ToString};
use core::error::Error;
use core::fmt::{Debug, Display, Formatter};

/// A hardware counter that is only visible to software as two independent
/// 32-bit read-only registers.
///
/// The true value is `(high << 32) | low`. `low` increments continuously and
/// carries into `high` when it wraps. The two halves are read by separate
/// instructions, so nothing ties a `read_low` to the `read_high` before or
/// after it: that is the job of the reader built on top of this trait.
///
/// Every call must perform a real read of the register. Implementations
/// must not cache, and calls made in program order must reach the hardware
/// in program order.
pub trait SplitCounter {
    /// Reads the low 32 bits.
    fn read_low(&self) -> u32;

    /// Reads the high 32 bits.
    fn read_high(&self) -> u32;
}

impl<T: SplitCounter + ?Sized> SplitCounter for &T {
    #[inline(always)]
    fn read_low(&self) -> u32 {
        (**self).read_low()
    }

    #[inline(always)]
    fn read_high(&self) -> u32 {
        (**self).read_high()
    }
}

/// Common tickpair Error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickError {
    message: String,
    cause: Option<String>,
}

impl Display for TickError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}\n   cause: {}", self.message, cause),
            None => write!(f, "{}", self.message),
        }
    }
}

impl Error for TickError {}

impl From<&str> for TickError {
    fn from(s: &str) -> TickError {
        TickError {
            message: s.to_string(),
            cause: None,
        }
    }
}

impl From<String> for TickError {
    fn from(s: String) -> TickError {
        TickError {
            message: s,
            cause: None,
        }
    }
}

impl TickError {
    pub fn new_with_cause(message: &str, cause: impl Error) -> TickError {
        TickError {
            message: message.to_string(),
            cause: Some(cause.to_string()),
        }
    }

    pub fn add_cause(mut self, context: &str) -> TickError {
        self.cause = Some(context.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }
}

// Generic Result type for tickpair.
pub type TickResult<T> = Result<T, TickError>;

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct Fixed {
        high: u32,
        low: u32,
        reads: Cell<usize>,
    }

    impl SplitCounter for Fixed {
        fn read_low(&self) -> u32 {
            self.reads.set(self.reads.get() + 1);
            self.low
        }

        fn read_high(&self) -> u32 {
            self.reads.set(self.reads.get() + 1);
            self.high
        }
    }

    fn halves<C: SplitCounter>(counter: C) -> (u32, u32) {
        (counter.read_high(), counter.read_low())
    }

    #[test]
    fn test_split_counter_through_reference() {
        let fixed = Fixed {
            high: 7,
            low: 42,
            reads: Cell::new(0),
        };
        assert_eq!(halves(&fixed), (7, 42));
        assert_eq!(halves(&&fixed), (7, 42));
        assert_eq!(fixed.reads.get(), 4);
    }

    #[test]
    fn test_error_display() {
        let err = TickError::from("Failed to read configuration");
        assert_eq!(err.to_string(), "Failed to read configuration");
        assert_eq!(err.cause(), None);

        let err = err.add_cause("file not found");
        assert_eq!(
            err.to_string(),
            "Failed to read configuration\n   cause: file not found"
        );
        assert_eq!(err.message(), "Failed to read configuration");
        assert_eq!(err.cause(), Some("file not found"));
    }

    #[test]
    fn test_error_with_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = TickError::new_with_cause("Failed to open", io);
        assert_eq!(err.cause(), Some("gone"));
        let from_string: TickError = format!("code {}", 3).into();
        assert_eq!(from_string.message(), "code 3");
    }
}
