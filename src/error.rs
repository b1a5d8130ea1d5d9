//! Driver error type
//!
//! Every operation of the driver returns `Result<T, Error>`. The variants fall in
//! two groups:
//! - Transport failures ([`Error::Timeout`], [`Error::AckLength`], [`Error::Bus`],
//!   [`Error::Pin`]) where the handshake itself did not complete
//! - Chip failures ([`Error::AckError`], [`Error::SpiTestFail`]) where the chip
//!   answered but reported or produced something wrong
//!
//! The driver never retries. Retry policy belongs to the application.

use core::fmt;

use crate::commands::DeviceError;

/// Errors returned by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The busy line did not reach the expected level within the timeout budget
    Timeout,
    /// The acknowledgement length declared by the chip is zero, shorter than the
    /// header, or larger than the receive capacity
    AckLength,
    /// The chip acknowledged the command with a non-`None` error code
    AckError(DeviceError),
    /// The echo self-test did not return the complement of the test pattern
    SpiTestFail,
    /// SPI transfer failed
    Bus,
    /// Chip-select or busy GPIO access failed
    Pin,
    /// The acknowledgement payload could not be decoded into the response type
    Deserialization,
}

impl Error {
    /// Returns the chip error code when the chip itself reported the failure
    pub fn device_error(&self) -> Option<DeviceError> {
        match self {
            Error::AckError(code) => Some(*code),
            _ => None,
        }
    }

    /// True when the chip answered and reported or produced a failure
    pub fn is_device_error(&self) -> bool {
        matches!(self, Error::AckError(_) | Error::SpiTestFail)
    }

    /// True when the handshake or the bus failed before a usable reply arrived
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Error::Timeout | Error::AckLength | Error::Bus | Error::Pin
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Timeout => f.write_str("timed out waiting for the busy line"),
            Error::AckLength => f.write_str("invalid acknowledgement length"),
            Error::AckError(code) => write!(f, "device reported error 0x{:02X}", code.code()),
            Error::SpiTestFail => f.write_str("SPI echo self-test failed"),
            Error::Bus => f.write_str("SPI bus error"),
            Error::Pin => f.write_str("GPIO error"),
            Error::Deserialization => f.write_str("malformed acknowledgement payload"),
        }
    }
}
