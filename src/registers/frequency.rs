//! Uplink frequency registers
//!
//! The synthesizer divider is split into an integer part (FCINT) and a 19 bit
//! fractional part (FCFRAC) relative to the 27.6 MHz crystal:
//!
//! ```text
//! FCINT  = f / XO
//! FCFRAC = ((f - FCINT * XO) << 19) / XO
//! ```
//!
//! The conversion back to Hz uses the firmware's fixed-point approximation, which
//! is not an exact inverse of the forward formula. It must stay bit-compatible
//! with the chip, so it is reproduced as is.
//!
//! The pair is stored in two 16 bit FREQCON registers whose layout differs
//! between chip models, see [`FreqconLayout`].

use core::convert::Infallible;

use regiface::{FromByteArray, ToByteArray};

/// Crystal oscillator frequency in Hz
pub const XO_HZ: u32 = 27_600_000;
/// Lowest supported uplink frequency in Hz
pub const FREQUENCY_MIN_HZ: u32 = 775_000_000;
/// Highest supported uplink frequency in Hz
pub const FREQUENCY_MAX_HZ: u32 = 1_100_000_000;

/// Frequency multiplier, 1 with the fixed divider disabled
const FREQUENCY_FACTOR: u32 = 1;
const FCFRAC_BITS: u32 = 19;

/// Synthesizer divider pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrequencyRegisters {
    /// Integer part of the divider
    pub fcint: u32,
    /// Fractional part of the divider, 19 bits
    pub fcfrac: u32,
}

impl FrequencyRegisters {
    /// Computes the divider pair for a frequency
    ///
    /// # Panics
    /// Panics when `hz` is outside `775_000_000..=1_100_000_000`.
    pub fn from_hz(hz: u32) -> Self {
        assert!(
            (FREQUENCY_MIN_HZ..=FREQUENCY_MAX_HZ).contains(&hz),
            "uplink frequency out of range"
        );

        let f = FREQUENCY_FACTOR * hz;
        let fcint = f / XO_HZ;
        let remainder = u64::from(f - fcint * XO_HZ);
        let fcfrac = ((remainder << FCFRAC_BITS) / u64::from(XO_HZ)) as u32;

        Self { fcint, fcfrac }
    }

    /// Converts the divider pair back to Hz with the firmware's approximation
    ///
    /// Uses wrapping 32 bit arithmetic like the chip does, so values read back
    /// from a chip always convert without panicking.
    pub fn to_hz(self) -> u32 {
        let fraction = self
            .fcfrac
            .wrapping_mul(5266)
            .wrapping_add(2048)
            >> 13;

        fraction
            .wrapping_add(self.fcfrac.wrapping_mul(52))
            .wrapping_add(self.fcint.wrapping_mul(XO_HZ))
            / FREQUENCY_FACTOR
    }
}

/// Raw FREQCON register bytes as carried by SetUlFrequency and GetUlFrequency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Freqcon(pub [u8; 4]);

impl ToByteArray for Freqcon {
    type Error = Infallible;
    type Array = [u8; 4];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.0)
    }
}

impl FromByteArray for Freqcon {
    type Error = Infallible;
    type Array = [u8; 4];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self(bytes))
    }
}

/// Placement of the divider pair inside the FREQCON registers
pub trait FreqconLayout {
    /// Encodes the pair into register bytes
    fn store(&self, registers: FrequencyRegisters) -> Freqcon;

    /// Decodes register bytes into the pair
    fn restore(&self, freqcon: Freqcon) -> FrequencyRegisters;
}

/// OL2385 layout
///
/// # Byte Format
/// - Byte 0: FCINT
/// - Bytes 1..4: FCFRAC, big endian
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteAligned;

impl FreqconLayout for ByteAligned {
    fn store(&self, registers: FrequencyRegisters) -> Freqcon {
        let [_, frac_hi, frac_mid, frac_lo] = registers.fcfrac.to_be_bytes();
        Freqcon([registers.fcint as u8, frac_hi, frac_mid, frac_lo])
    }

    fn restore(&self, freqcon: Freqcon) -> FrequencyRegisters {
        let [fcint, frac_hi, frac_mid, frac_lo] = freqcon.0;
        FrequencyRegisters {
            fcint: u32::from(fcint),
            fcfrac: u32::from_be_bytes([0, frac_hi, frac_mid, frac_lo]),
        }
    }
}

/// OL2361 layout
///
/// # Register Format
/// - FREQCON0 bits 15:7: FCFRAC bits 8:0
/// - FREQCON0 bit 0: FCDISFRAC, always set
/// - FREQCON1 bits 15:10: FCINT
/// - FREQCON1 bits 9:8: FCFRAC bits 18:17
/// - FREQCON1 bits 7:0: FCFRAC bits 16:9
///
/// Each register is sent big endian, FREQCON0 first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitPacked;

impl BitPacked {
    const FCDISFRAC: u16 = 0x0001;
    const FREQCON0_FCFRAC_SHIFT: u32 = 7;
    const FREQCON1_FCINT_SHIFT: u32 = 10;
    const FCINT_MASK: u32 = 0x3F;
    const FCFRAC_LOW_MASK: u32 = 0x0_01FF;
    const FCFRAC_MID_MASK: u32 = 0x1_FE00;
    const FCFRAC_HIGH_MASK: u32 = 0x6_0000;
}

impl FreqconLayout for BitPacked {
    fn store(&self, registers: FrequencyRegisters) -> Freqcon {
        let fcfrac = registers.fcfrac;

        let freqcon0 = (((fcfrac & Self::FCFRAC_LOW_MASK) << Self::FREQCON0_FCFRAC_SHIFT) as u16)
            | Self::FCDISFRAC;
        let freqcon1 = (((registers.fcint & Self::FCINT_MASK) << Self::FREQCON1_FCINT_SHIFT)
            | ((fcfrac & Self::FCFRAC_HIGH_MASK) >> 9)
            | ((fcfrac & Self::FCFRAC_MID_MASK) >> 9)) as u16;

        let [c0_hi, c0_lo] = freqcon0.to_be_bytes();
        let [c1_hi, c1_lo] = freqcon1.to_be_bytes();
        Freqcon([c0_hi, c0_lo, c1_hi, c1_lo])
    }

    fn restore(&self, freqcon: Freqcon) -> FrequencyRegisters {
        let [c0_hi, c0_lo, c1_hi, c1_lo] = freqcon.0;
        let freqcon0 = u32::from(u16::from_be_bytes([c0_hi, c0_lo]));
        let freqcon1 = u32::from(u16::from_be_bytes([c1_hi, c1_lo]));

        FrequencyRegisters {
            fcint: (freqcon1 >> Self::FREQCON1_FCINT_SHIFT) & Self::FCINT_MASK,
            fcfrac: ((freqcon0 >> Self::FREQCON0_FCFRAC_SHIFT) & Self::FCFRAC_LOW_MASK)
                | ((freqcon1 & 0x00FF) << 9)
                | ((freqcon1 & 0x0300) << 9),
        }
    }
}

/// Supported transceiver models
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipModel {
    /// OL2385, byte aligned FREQCON layout
    #[default]
    Ol2385,
    /// OL2361, bit packed FREQCON layout
    Ol2361,
}

impl ChipModel {
    /// Encodes a divider pair with this model's layout
    pub fn store(self, registers: FrequencyRegisters) -> Freqcon {
        match self {
            Self::Ol2385 => ByteAligned.store(registers),
            Self::Ol2361 => BitPacked.store(registers),
        }
    }

    /// Decodes register bytes with this model's layout
    pub fn restore(self, freqcon: Freqcon) -> FrequencyRegisters {
        match self {
            Self::Ol2385 => ByteAligned.restore(freqcon),
            Self::Ol2361 => BitPacked.restore(freqcon),
        }
    }
}
