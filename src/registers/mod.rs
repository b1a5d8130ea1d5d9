//! Register definitions for the OL2385/OL2361
//!
//! - [`frequency`]: FCINT/FCFRAC conversion and the FREQCON register layouts
//!
//! Other chip registers are accessed through
//! [`Device::read_register`](crate::Device::read_register) and
//! [`Device::write_register`](crate::Device::write_register) with `regiface`
//! register types whose id is the 8 bit register address and whose value is
//! 16 bits wide.

pub mod frequency;

pub use frequency::*;
