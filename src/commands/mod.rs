//! Command catalog
//!
//! This module contains the complete command set understood by the OL2385/OL2361
//! SIGFOX firmware. Every command is identified by a one byte [`CommandId`] and
//! described by a compile time [`CommandDescriptor`]:
//! - Whether an I-frame payload follows the command byte
//! - Whether the chip answers with an acknowledgement at all
//! - Maximum request payload and expected acknowledgement payload lengths
//! - Which [`TimeoutClass`] bounds the wait for the acknowledgement
//!
//! Commands are organized into functional categories:
//!
//! - [`system`]: Power, identification, watchdog and register access
//! - [`radio`]: Uplink, downlink, frequency and test mode commands
//! - [`status`]: Device state and error codes reported in acknowledgements
//!
//! # Important Notes
//! - Wake-up, sleep, continuous wave and watchdog trigger are never acknowledged
//! - Change-standard commands form a contiguous id block starting at 0x15
//! - The busy line must be monitored for every transfer, see [`crate::transport`]

use core::convert::Infallible;

use bitflags::bitflags;

use crate::config::timing;
use crate::ToByteArray;

pub mod radio;
pub mod status;
pub mod system;

pub use radio::*;
pub use status::*;
pub use system::*;

/// Error type for invalid command id values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandIdError {
    /// The value is outside the command id range 0x01..=0x18
    InvalidValue(u8),
}

/// Command identifiers
///
/// Sent as byte 1 of every I-frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CommandId {
    /// Wake the chip from power-down
    WakeUp = 0x01,
    /// Echo a payload back complemented
    Echo = 0x02,
    /// Put the chip into power-down
    Sleep = 0x03,
    /// Send an uplink frame of up to 12 bytes
    SendPayload = 0x04,
    /// Send a single bit uplink frame
    SendBit = 0x05,
    /// Send an out of band frame
    SendOutOfBand = 0x06,
    /// Send a bidirectional frame and wait for the downlink
    ReceiveFrame = 0x07,
    /// Read device id, PAC and library version
    GetInfo = 0x08,
    /// Write the uplink frequency registers
    SetUlFrequency = 0x09,
    /// Read the uplink frequency registers
    GetUlFrequency = 0x0A,
    /// Start a continuous wave transmission
    ContinuousWave = 0x0B,
    /// Check the ID/key pair
    CheckIdKey = 0x0C,
    /// Read the device version
    GetDeviceVersion = 0x0D,
    /// Set the watchdog period
    SetWatchdogTimer = 0x0E,
    /// Read the watchdog period
    GetWatchdogTimer = 0x0F,
    /// Write a chip register
    SetRegister = 0x10,
    /// Read a chip register
    GetRegister = 0x11,
    /// Let the watchdog expire
    TriggerWatchdog = 0x12,
    /// Send a keep alive frame
    KeepAlive = 0x13,
    /// Run a SIGFOX test mode
    SendTestMode = 0x14,
    /// Switch to RCZ1 (ETSI)
    ChangeToRcz1 = 0x15,
    /// Switch to RCZ2 (FCC USA)
    ChangeToRcz2 = 0x16,
    /// Switch to RCZ3 (ARIB)
    ChangeToRcz3 = 0x17,
    /// Switch to RCZ4 (FCC South America)
    ChangeToRcz4 = 0x18,
}

impl CommandId {
    /// Lowest valid command id
    pub const FIRST: u8 = 0x01;
    /// Highest valid command id
    pub const LAST: u8 = 0x18;

    /// Every command in id order
    pub const ALL: [CommandId; 24] = [
        Self::WakeUp,
        Self::Echo,
        Self::Sleep,
        Self::SendPayload,
        Self::SendBit,
        Self::SendOutOfBand,
        Self::ReceiveFrame,
        Self::GetInfo,
        Self::SetUlFrequency,
        Self::GetUlFrequency,
        Self::ContinuousWave,
        Self::CheckIdKey,
        Self::GetDeviceVersion,
        Self::SetWatchdogTimer,
        Self::GetWatchdogTimer,
        Self::SetRegister,
        Self::GetRegister,
        Self::TriggerWatchdog,
        Self::KeepAlive,
        Self::SendTestMode,
        Self::ChangeToRcz1,
        Self::ChangeToRcz2,
        Self::ChangeToRcz3,
        Self::ChangeToRcz4,
    ];

    /// Returns the compile time descriptor of this command
    pub const fn descriptor(self) -> CommandDescriptor {
        const NONE: CommandFlags = CommandFlags::empty();
        const ACK: CommandFlags = CommandFlags::ACKNOWLEDGED;
        const REQ_ACK: CommandFlags =
            CommandFlags::REQUEST_PAYLOAD.union(CommandFlags::ACKNOWLEDGED);

        use TimeoutClass::*;

        match self {
            Self::WakeUp => CommandDescriptor::new(self, NONE, 0, 0, NoTransmission),
            Self::Echo => CommandDescriptor::new(self, REQ_ACK, 5, 5, NoTransmission),
            Self::Sleep => CommandDescriptor::new(self, NONE, 0, 0, NoTransmission),
            Self::SendPayload => CommandDescriptor::new(self, REQ_ACK, 12, 0, Transmission),
            Self::SendBit => CommandDescriptor::new(self, ACK, 0, 0, Transmission),
            Self::SendOutOfBand => CommandDescriptor::new(self, ACK, 0, 0, Transmission),
            Self::ReceiveFrame => {
                CommandDescriptor::new(self, ACK, 0, 8, TransmissionWithReceive)
            }
            Self::GetInfo => CommandDescriptor::new(self, ACK, 0, 23, NoTransmission),
            Self::SetUlFrequency => CommandDescriptor::new(self, REQ_ACK, 4, 0, NoTransmission),
            Self::GetUlFrequency => CommandDescriptor::new(self, ACK, 0, 4, NoTransmission),
            Self::ContinuousWave => CommandDescriptor::new(self, NONE, 0, 0, Transmission),
            Self::CheckIdKey => CommandDescriptor::new(self, ACK, 0, 1, NoTransmission),
            Self::GetDeviceVersion => CommandDescriptor::new(self, ACK, 0, 15, NoTransmission),
            Self::SetWatchdogTimer => CommandDescriptor::new(self, REQ_ACK, 1, 0, NoTransmission),
            Self::GetWatchdogTimer => CommandDescriptor::new(self, ACK, 0, 1, NoTransmission),
            Self::SetRegister => CommandDescriptor::new(self, REQ_ACK, 3, 0, NoTransmission),
            Self::GetRegister => CommandDescriptor::new(self, REQ_ACK, 1, 2, NoTransmission),
            Self::TriggerWatchdog => CommandDescriptor::new(self, NONE, 0, 0, NoTransmission),
            Self::KeepAlive => CommandDescriptor::new(self, ACK, 0, 0, Transmission),
            Self::SendTestMode => CommandDescriptor::new(self, REQ_ACK, 3, 0, Transmission),
            Self::ChangeToRcz1
            | Self::ChangeToRcz2
            | Self::ChangeToRcz3
            | Self::ChangeToRcz4 => CommandDescriptor::new(self, ACK, 0, 0, NoTransmission),
        }
    }
}

impl TryFrom<u8> for CommandId {
    type Error = CommandIdError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::FIRST..=Self::LAST).contains(&value) {
            Ok(Self::ALL[usize::from(value - Self::FIRST)])
        } else {
            Err(CommandIdError::InvalidValue(value))
        }
    }
}

impl From<CommandId> for u8 {
    fn from(id: CommandId) -> Self {
        id as u8
    }
}

impl ToByteArray for CommandId {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self as u8])
    }
}

impl regiface::id::Id for CommandId {}

bitflags! {
    /// Shape of a command's exchange
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CommandFlags: u8 {
        /// The I-frame carries a payload after the command byte
        const REQUEST_PAYLOAD = 1;
        /// The chip answers with an acknowledgement frame
        const ACKNOWLEDGED = 1 << 1;
    }
}

/// Bound on the wait for a command's acknowledgement
///
/// The class reflects the worst case work the chip performs before it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeoutClass {
    /// Local firmware processing only (~2 s)
    NoTransmission,
    /// On-air transmission, including synthesizer settling in test mode 5 (~15 s)
    Transmission,
    /// Transmission followed by the firmware's downlink window (~60 s)
    TransmissionWithReceive,
    /// Chip readiness after power-up, used once during init (~5 s)
    Init,
}

impl TimeoutClass {
    /// Timeout budget in microseconds
    pub const fn as_micros(self) -> u32 {
        match self {
            Self::NoTransmission => timing::ACK_NO_TRANSMISSION_US,
            Self::Transmission => timing::ACK_TRANSMISSION_US,
            Self::TransmissionWithReceive => timing::ACK_TRANSMISSION_RECEIVE_US,
            Self::Init => timing::ACK_INIT_US,
        }
    }
}

/// Compile time description of one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescriptor {
    /// Command id
    pub id: CommandId,
    /// Exchange shape
    pub flags: CommandFlags,
    /// Maximum request payload length in bytes
    pub request_len: usize,
    /// Expected acknowledgement payload length in bytes
    pub ack_len: usize,
    /// Timeout class of the acknowledgement wait
    pub timeout: TimeoutClass,
}

impl CommandDescriptor {
    const fn new(
        id: CommandId,
        flags: CommandFlags,
        request_len: usize,
        ack_len: usize,
        timeout: TimeoutClass,
    ) -> Self {
        Self {
            id,
            flags,
            request_len,
            ack_len,
            timeout,
        }
    }

    /// True when the I-frame carries a payload
    pub const fn has_request_payload(&self) -> bool {
        self.flags.contains(CommandFlags::REQUEST_PAYLOAD)
    }

    /// True when the chip answers with an acknowledgement frame
    pub const fn is_acknowledged(&self) -> bool {
        self.flags.contains(CommandFlags::ACKNOWLEDGED)
    }
}
