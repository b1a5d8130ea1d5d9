//! System commands
//!
//! This module contains commands that do not touch the radio network:
//! - Wake-up and sleep
//! - Device identification (id, PAC, library and device versions)
//! - ID/key check
//! - Watchdog configuration
//! - Chip register access
//!
//! All of them complete within the no-transmission timeout class.

use core::convert::Infallible;

use regiface::FromByteArray;

use crate::registers::ChipModel;
use crate::{Command, CommandId, NoParameters, ToByteArray};

/// WakeUp command (0x01)
///
/// Brings the chip out of power-down.
///
/// # Important Notes
/// - Not acknowledged
/// - The host must wait ~100 ms before the next command
/// - The chip reports `WaitForCommand` in the next acknowledgement
#[derive(Debug, Clone)]
pub struct WakeUp;

impl Command for WakeUp {
    type IdType = CommandId;
    type CommandParameters = NoParameters;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        CommandId::WakeUp
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// Sleep command (0x03)
///
/// Puts the chip into power-down. Not acknowledged.
#[derive(Debug, Clone)]
pub struct Sleep;

impl Command for Sleep {
    type IdType = CommandId;
    type CommandParameters = NoParameters;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        CommandId::Sleep
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// Identification data returned by GetInfo
///
/// # Payload Format
/// - Bytes 0..4: device id, little endian
/// - Bytes 4..12: PAC
/// - Bytes 12..23: SIGFOX library version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfoResponse {
    /// SIGFOX device id
    pub device_id: u32,
    /// Porting authorization code
    pub pac: [u8; 8],
    /// SIGFOX library version string bytes
    pub library_version: [u8; 11],
}

impl FromByteArray for InfoResponse {
    type Error = Infallible;
    type Array = [u8; 23];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        let mut device_id = [0; 4];
        let mut pac = [0; 8];
        let mut library_version = [0; 11];

        device_id.copy_from_slice(&bytes[0..4]);
        pac.copy_from_slice(&bytes[4..12]);
        library_version.copy_from_slice(&bytes[12..23]);

        Ok(Self {
            device_id: u32::from_le_bytes(device_id),
            pac,
            library_version,
        })
    }
}

/// GetInfo command (0x08)
///
/// Reads the device id, PAC and library version.
#[derive(Debug, Clone)]
pub struct GetInfo;

impl Command for GetInfo {
    type IdType = CommandId;
    type CommandParameters = NoParameters;
    type ResponseParameters = InfoResponse;

    fn id() -> Self::IdType {
        CommandId::GetInfo
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// Device version returned by GetDeviceVersion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceVersion(pub [u8; 15]);

impl FromByteArray for DeviceVersion {
    type Error = Infallible;
    type Array = [u8; 15];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self(bytes))
    }
}

/// GetDeviceVersion command (0x0D)
#[derive(Debug, Clone)]
pub struct GetDeviceVersion;

impl Command for GetDeviceVersion {
    type IdType = CommandId;
    type CommandParameters = NoParameters;
    type ResponseParameters = DeviceVersion;

    fn id() -> Self::IdType {
        CommandId::GetDeviceVersion
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// Result of CheckIdKey
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdKeyStatus {
    /// True when the provisioned ID/key pair is valid
    pub valid: bool,
}

impl FromByteArray for IdKeyStatus {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            valid: bytes[0] != 0,
        })
    }
}

/// CheckIdKey command (0x0C)
#[derive(Debug, Clone)]
pub struct CheckIdKey;

impl Command for CheckIdKey {
    type IdType = CommandId;
    type CommandParameters = NoParameters;
    type ResponseParameters = IdKeyStatus;

    fn id() -> Self::IdType {
        CommandId::CheckIdKey
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// Error type for invalid watchdog period codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogTimeError {
    /// The value does not correspond to a watchdog period
    InvalidValue(u8),
}

/// Watchdog period
///
/// The period is `base << code`. The base tick differs between models:
/// - OL2385: 16 ms, codes up to 0x0C
/// - OL2361: 16.384 ms, codes up to 0x0F
///
/// Variant names give the OL2385 period for the codes both models share and
/// the OL2361 period for the codes only the OL2361 accepts. Use
/// [`period_micros`](WatchdogTime::period_micros) for the actual period of a
/// model. Out of range codes for a model are rejected by the chip itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WatchdogTime {
    /// 16 ms
    Ms16 = 0x00,
    /// 32 ms
    Ms32 = 0x01,
    /// 64 ms
    Ms64 = 0x02,
    /// 128 ms
    Ms128 = 0x03,
    /// 256 ms
    Ms256 = 0x04,
    /// 512 ms
    Ms512 = 0x05,
    /// 1.024 s
    S1_024 = 0x06,
    /// 2.048 s
    S2_048 = 0x07,
    /// 4.096 s
    S4_096 = 0x08,
    /// 8.192 s
    S8_192 = 0x09,
    /// 16.384 s
    S16_384 = 0x0A,
    /// 32.768 s
    S32_768 = 0x0B,
    /// 65.536 s (67.109 s on the OL2361)
    S65_536 = 0x0C,
    /// 134.218 s, OL2361 only
    S134_218 = 0x0D,
    /// 268.435 s, OL2361 only
    S268_435 = 0x0E,
    /// 536.871 s, OL2361 only
    S536_871 = 0x0F,
}

impl WatchdogTime {
    /// Watchdog period of `model` in microseconds
    pub fn period_micros(self, model: ChipModel) -> u64 {
        let base_us: u64 = match model {
            ChipModel::Ol2385 => 16_000,
            ChipModel::Ol2361 => 16_384,
        };

        base_us << (self as u8)
    }
}

impl TryFrom<u8> for WatchdogTime {
    type Error = WatchdogTimeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Ms16),
            0x01 => Ok(Self::Ms32),
            0x02 => Ok(Self::Ms64),
            0x03 => Ok(Self::Ms128),
            0x04 => Ok(Self::Ms256),
            0x05 => Ok(Self::Ms512),
            0x06 => Ok(Self::S1_024),
            0x07 => Ok(Self::S2_048),
            0x08 => Ok(Self::S4_096),
            0x09 => Ok(Self::S8_192),
            0x0A => Ok(Self::S16_384),
            0x0B => Ok(Self::S32_768),
            0x0C => Ok(Self::S65_536),
            0x0D => Ok(Self::S134_218),
            0x0E => Ok(Self::S268_435),
            0x0F => Ok(Self::S536_871),
            invalid => Err(WatchdogTimeError::InvalidValue(invalid)),
        }
    }
}

impl From<WatchdogTime> for u8 {
    fn from(time: WatchdogTime) -> Self {
        time as u8
    }
}

impl ToByteArray for WatchdogTime {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self as u8])
    }
}

impl FromByteArray for WatchdogTime {
    type Error = WatchdogTimeError;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Self::try_from(bytes[0])
    }
}

/// SetWatchdogTimer command (0x0E)
#[derive(Debug, Clone)]
pub struct SetWatchdogTimer {
    /// New watchdog period
    pub time: WatchdogTime,
}

impl Command for SetWatchdogTimer {
    type IdType = CommandId;
    type CommandParameters = WatchdogTime;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        CommandId::SetWatchdogTimer
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.time
    }
}

/// GetWatchdogTimer command (0x0F)
#[derive(Debug, Clone)]
pub struct GetWatchdogTimer;

impl Command for GetWatchdogTimer {
    type IdType = CommandId;
    type CommandParameters = NoParameters;
    type ResponseParameters = WatchdogTime;

    fn id() -> Self::IdType {
        CommandId::GetWatchdogTimer
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// TriggerWatchdog command (0x12)
///
/// Makes the chip stop servicing its watchdog so that it resets.
/// Not acknowledged.
#[derive(Debug, Clone)]
pub struct TriggerWatchdog;

impl Command for TriggerWatchdog {
    type IdType = CommandId;
    type CommandParameters = NoParameters;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        CommandId::TriggerWatchdog
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// Register write request
///
/// # Payload Format
/// - Byte 0: register address
/// - Bytes 1..3: value, big endian
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWrite {
    /// Register address
    pub address: u8,
    /// Value to write
    pub value: u16,
}

impl ToByteArray for RegisterWrite {
    type Error = Infallible;
    type Array = [u8; 3];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let [hi, lo] = self.value.to_be_bytes();
        Ok([self.address, hi, lo])
    }
}

/// SetRegister command (0x10)
#[derive(Debug, Clone)]
pub struct SetRegister {
    /// Address and value
    pub write: RegisterWrite,
}

impl Command for SetRegister {
    type IdType = CommandId;
    type CommandParameters = RegisterWrite;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        CommandId::SetRegister
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.write
    }
}

/// Register address of a GetRegister request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterAddress(pub u8);

impl ToByteArray for RegisterAddress {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.0])
    }
}

/// Raw register contents, big endian on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterValue(pub [u8; 2]);

impl RegisterValue {
    /// Register value as an integer
    pub fn value(self) -> u16 {
        u16::from_be_bytes(self.0)
    }
}

impl FromByteArray for RegisterValue {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self(bytes))
    }
}

/// GetRegister command (0x11)
#[derive(Debug, Clone)]
pub struct GetRegister {
    /// Address to read
    pub address: u8,
}

impl Command for GetRegister {
    type IdType = CommandId;
    type CommandParameters = RegisterAddress;
    type ResponseParameters = RegisterValue;

    fn id() -> Self::IdType {
        CommandId::GetRegister
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        RegisterAddress(self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_layout() {
        let mut raw = [0u8; 23];
        raw[0..4].copy_from_slice(&[0x78, 0x56, 0x34, 0x12]);
        raw[4..12].copy_from_slice(b"PAC01234");
        raw[12..23].copy_from_slice(b"v2.0.3-lib ");

        let info = InfoResponse::from_bytes(raw).unwrap();
        assert_eq!(info.device_id, 0x1234_5678);
        assert_eq!(&info.pac, b"PAC01234");
        assert_eq!(&info.library_version, b"v2.0.3-lib ");
    }

    #[test]
    fn watchdog_periods() {
        assert_eq!(WatchdogTime::Ms16.period_micros(ChipModel::Ol2385), 16_000);
        assert_eq!(
            WatchdogTime::S65_536.period_micros(ChipModel::Ol2385),
            65_536_000
        );
        assert_eq!(
            WatchdogTime::S65_536.period_micros(ChipModel::Ol2361),
            67_108_864
        );
        assert_eq!(
            WatchdogTime::S134_218.period_micros(ChipModel::Ol2361),
            134_217_728
        );
        assert_eq!(
            WatchdogTime::S536_871.period_micros(ChipModel::Ol2361),
            536_870_912
        );

        for code in 0x00..=0x0F {
            assert_eq!(u8::from(WatchdogTime::try_from(code).unwrap()), code);
        }
        assert_eq!(
            WatchdogTime::from_bytes([0x10]),
            Err(WatchdogTimeError::InvalidValue(0x10))
        );
    }

    #[test]
    fn register_payloads() {
        let write = RegisterWrite {
            address: 0x2A,
            value: 0xBEEF,
        };
        assert_eq!(write.to_bytes(), Ok([0x2A, 0xBE, 0xEF]));
        assert_eq!(RegisterAddress(0x2A).to_bytes(), Ok([0x2A]));
        assert_eq!(RegisterValue([0x12, 0x34]).value(), 0x1234);
    }

    #[test]
    fn id_key_status() {
        assert!(!IdKeyStatus::from_bytes([0]).unwrap().valid);
        assert!(IdKeyStatus::from_bytes([3]).unwrap().valid);
    }
}
