#![cfg_attr(not(test), no_std)]
//! OL23xx SIGFOX Transceiver Driver
//!
//! This crate provides a type-safe interface for the NXP OL2385 and OL2361
//! SIGFOX transceivers. Both chips run the SIGFOX protocol in their own firmware
//! and are driven by a host MCU through a small command set over SPI.
//!
//! # Features
//! - Command/acknowledgement framing with per-command timeouts
//! - GPIO handshake (chip-select plus busy/ACK line) with bounded polling
//! - Typed commands built on `regiface`
//! - Uplink frequency conversion for both FREQCON register layouts
//! - Blocking, non-blocking and async operation
//!
//! # Architecture
//! The driver is organized into several modules:
//!
//! - [`device`]: Command engine and mirrored device status
//! - [`operations`]: One method per chip command and the init sequence
//! - [`transport`]: The chip-select/busy handshake around SPI transfers
//! - [`frame`]: Information and acknowledgement frame codec
//! - [`commands`]: Command catalog, typed commands and status codes
//!   - [`commands::system`]: Power, identity, watchdog and register commands
//!   - [`commands::radio`]: Uplink, downlink and RF test commands
//!   - [`commands::status`]: Device state and error codes
//! - [`registers`]: Frequency register encoding
//! - [`config`]: Chip model, init parameters and protocol timing
//!
//! # Usage
//! The main entry point is the [`Device`] struct which owns an SPI bus, the
//! chip-select output, the busy input and a delay provider.
//!
//! 1. Create a new [`Device`] instance with your peripherals and a [`Config`]
//! 2. Run [`Device::init`] once after power-up
//! 3. Configure the uplink frequency if the network standard needs it
//! 4. Send frames
//!
//! # Important Notes
//! - Chip-select is driven by the driver, the SPI bus must not manage it
//! - Commands are strictly sequential, one exchange at a time
//! - The driver never retries, failed operations are reported as is
//! - The last device state and error code stay readable after a failure
//!
//! # Example
//! ```ignore
//! use ol23xx::{Config, Device, Error};
//!
//! fn send_hello<SPI, CS, BUSY, D>(spi: SPI, cs: CS, busy: BUSY, delay: D) -> Result<(), Error>
//! where
//!     SPI: embedded_hal::spi::SpiBus,
//!     CS: embedded_hal::digital::OutputPin,
//!     BUSY: embedded_hal::digital::InputPin,
//!     D: embedded_hal::delay::DelayNs,
//! {
//!     let mut device = Device::new(spi, cs, busy, delay, Config::default());
//!
//!     device.init()?;
//!     device.send_payload(b"hello")?;
//!
//!     Ok(())
//! }
//! ```

pub use regiface::{
    Command, FromByteArray, NoParameters, ReadableRegister, ToByteArray, WritableRegister,
};

pub mod commands;
pub mod config;
pub mod device;
pub mod error;
pub mod frame;
pub mod operations;
pub mod registers;
pub mod transport;

#[cfg(test)]
mod sim;

pub use commands::*;
pub use config::Config;
pub use device::{Device, LengthAnomaly};
pub use error::Error;
pub use operations::DeviceInfo;
pub use registers::*;
