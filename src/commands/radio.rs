//! Radio commands
//!
//! This module contains commands that drive the SIGFOX radio:
//! - Uplink frames (payload, single bit, out of band, keep alive)
//! - Bidirectional frames with downlink reception
//! - Uplink frequency configuration
//! - Continuous wave and SIGFOX test modes
//! - Network standard (RCZ) selection
//!
//! Transmitting commands run in the transmission timeout class. Receiving a
//! downlink can take up to a minute.

use core::convert::Infallible;

use crate::registers::Freqcon;
use crate::{Command, CommandId, NoParameters, ToByteArray};

/// Error type for invalid network standard values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStandardError {
    /// The value does not correspond to a network standard
    InvalidValue(u8),
}

/// SIGFOX radio configuration zone
///
/// The ordinal is added to the id of [`CommandId::ChangeToRcz1`] to obtain the
/// change-standard command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NetworkStandard {
    /// RCZ1, Europe
    Etsi = 0,
    /// RCZ2, USA
    FccUsa = 1,
    /// RCZ3, Japan
    Arib = 2,
    /// RCZ4, South America
    FccSouthAmerica = 3,
}

impl NetworkStandard {
    /// Command that switches the chip to this standard
    pub fn command_id(self) -> CommandId {
        match self {
            Self::Etsi => CommandId::ChangeToRcz1,
            Self::FccUsa => CommandId::ChangeToRcz2,
            Self::Arib => CommandId::ChangeToRcz3,
            Self::FccSouthAmerica => CommandId::ChangeToRcz4,
        }
    }
}

impl TryFrom<u8> for NetworkStandard {
    type Error = NetworkStandardError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Etsi),
            1 => Ok(Self::FccUsa),
            2 => Ok(Self::Arib),
            3 => Ok(Self::FccSouthAmerica),
            invalid => Err(NetworkStandardError::InvalidValue(invalid)),
        }
    }
}

/// SendBit command (0x05)
///
/// Sends a single bit uplink frame.
#[derive(Debug, Clone)]
pub struct SendBit;

impl Command for SendBit {
    type IdType = CommandId;
    type CommandParameters = NoParameters;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        CommandId::SendBit
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// SendOutOfBand command (0x06)
///
/// Sends an out of band frame carrying the chip's own status.
#[derive(Debug, Clone)]
pub struct SendOutOfBand;

impl Command for SendOutOfBand {
    type IdType = CommandId;
    type CommandParameters = NoParameters;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        CommandId::SendOutOfBand
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// SetUlFrequency command (0x09)
///
/// Writes the uplink frequency registers. The register bytes depend on the
/// chip model, see [`crate::registers::FreqconLayout`].
#[derive(Debug, Clone)]
pub struct SetUlFrequency {
    /// Encoded FREQCON registers
    pub freqcon: Freqcon,
}

impl Command for SetUlFrequency {
    type IdType = CommandId;
    type CommandParameters = Freqcon;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        CommandId::SetUlFrequency
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.freqcon
    }
}

/// GetUlFrequency command (0x0A)
#[derive(Debug, Clone)]
pub struct GetUlFrequency;

impl Command for GetUlFrequency {
    type IdType = CommandId;
    type CommandParameters = NoParameters;
    type ResponseParameters = Freqcon;

    fn id() -> Self::IdType {
        CommandId::GetUlFrequency
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// ContinuousWave command (0x0B)
///
/// Starts an unmodulated carrier at the uplink frequency.
///
/// # Important Notes
/// - Not acknowledged
/// - The carrier runs until the chip is reset or put to sleep
#[derive(Debug, Clone)]
pub struct ContinuousWave;

impl Command for ContinuousWave {
    type IdType = CommandId;
    type CommandParameters = NoParameters;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        CommandId::ContinuousWave
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// KeepAlive command (0x13)
#[derive(Debug, Clone)]
pub struct KeepAlive;

impl Command for KeepAlive {
    type IdType = CommandId;
    type CommandParameters = NoParameters;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        CommandId::KeepAlive
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// SIGFOX test mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TestMode {
    /// BPSK transmission of a fixed pattern
    TxBpsk = 0,
    /// Full protocol uplink
    TxProtocol = 1,
    /// Full protocol uplink and downlink
    RxProtocol = 2,
    /// GFSK downlink reception
    RxGfsk = 3,
    /// Receiver sensitivity
    RxSensitivity = 4,
    /// Synthesizer check
    TxSynthesis = 5,
}

/// Test mode request
///
/// # Payload Format
/// - Bytes 0..2: test mode, big endian
/// - Byte 2: test configuration, always 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestModeParameters {
    /// Mode to run
    pub mode: TestMode,
}

impl ToByteArray for TestModeParameters {
    type Error = Infallible;
    type Array = [u8; 3];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let [hi, lo] = (self.mode as u16).to_be_bytes();
        Ok([hi, lo, 0x00])
    }
}

/// SendTestMode command (0x14)
#[derive(Debug, Clone)]
pub struct SendTestMode {
    /// Mode to run
    pub mode: TestMode,
}

impl Command for SendTestMode {
    type IdType = CommandId;
    type CommandParameters = TestModeParameters;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        CommandId::SendTestMode
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        TestModeParameters { mode: self.mode }
    }
}

/// Downlink data returned by the receive frame command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DownlinkFrame {
    data: [u8; 8],
    len: usize,
}

impl DownlinkFrame {
    /// Maximum downlink payload length
    pub const MAX_LEN: usize = 8;

    pub(crate) fn new(payload: &[u8]) -> Self {
        let len = payload.len().min(Self::MAX_LEN);
        let mut data = [0; Self::MAX_LEN];
        data[..len].copy_from_slice(&payload[..len]);
        Self { data, len }
    }

    /// Received bytes
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len]
    }
}
