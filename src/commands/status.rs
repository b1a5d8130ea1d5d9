//! Device state and error codes
//!
//! Every acknowledgement frame carries two status bytes:
//! - The error code of the command that was just executed
//! - The lifecycle state of the chip's firmware state machine
//!
//! Both are copied verbatim into the driver after every acknowledged command.
//! Unknown values are preserved rather than rejected, the chip is the authority
//! on its own state.

/// Lifecycle state reported by the chip
///
/// The driver never forces a transition, it only mirrors what the last
/// acknowledgement reported. Any transition is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    /// Firmware idle, reached through internal events only
    Idle,
    /// After reset or sleep
    Init,
    /// After wake-up, ready to accept commands
    WaitForCommand,
    /// A state value this driver does not know
    Unknown(u8),
}

impl From<u8> for DeviceState {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::Idle,
            0x01 => Self::Init,
            0x02 => Self::WaitForCommand,
            other => Self::Unknown(other),
        }
    }
}

impl From<DeviceState> for u8 {
    fn from(state: DeviceState) -> Self {
        match state {
            DeviceState::Idle => 0x00,
            DeviceState::Init => 0x01,
            DeviceState::WaitForCommand => 0x02,
            DeviceState::Unknown(other) => other,
        }
    }
}

/// Command family an error code belongs to
///
/// The high nibble of a chip error code identifies the operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorFamily {
    /// No error
    None,
    /// Library open
    Open,
    /// Library close
    Close,
    /// Send frame
    SendFrame,
    /// Send bit
    SendBit,
    /// Send out of band frame
    OutOfBand,
    /// Standard configuration
    Config,
    /// Test mode 0
    TestMode0,
    /// Test mode state check
    TestModeState,
    /// Test mode 2
    TestMode2,
    /// Test mode 3
    TestMode3,
    /// Test mode 4
    TestMode4,
    /// Test mode 5
    TestMode5,
    /// Code not known to this driver
    Unknown,
}

/// Error code reported by the chip in an acknowledgement
///
/// `None` is the only success value. The remaining codes identify the exact
/// failure inside the chip's SIGFOX library and are meant for diagnostics; the
/// protocol layer treats all of them the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError {
    /// No error (0x00)
    None,

    /// Memory allocation failed while opening the library (0x10)
    OpenMalloc,
    /// Device id pointer was null (0x11)
    OpenIdPointer,
    /// Reading the sequence number from non-volatile memory failed (0x12)
    OpenGetSequence,
    /// Reading the PN value from non-volatile memory failed (0x13)
    OpenGetPn,
    /// Library was not idle when opening (0x14)
    OpenState,

    /// Freeing library memory failed (0x20)
    CloseFree,
    /// Stopping the RF front end failed (0x21)
    CloseRfStop,

    /// Customer data longer than 12 bytes (0x30)
    SendFrameDataLength,
    /// Library not ready, must be closed and reopened (0x31)
    SendFrameState,
    /// Response pointer was null for a bidirectional frame (0x32)
    SendFrameResponsePointer,
    /// Building the uplink frame failed (0x33)
    SendFrameBuildUplink,
    /// Sending the uplink frame failed (0x34)
    SendFrameSendUplink,
    /// Receiving the downlink frame failed or timed out (0x35)
    SendFrameReceive,
    /// Delay before the out of band acknowledgement failed (0x36)
    SendFrameDelayOobAck,
    /// Building the out of band acknowledgement failed (0x37)
    SendFrameBuildOobAck,
    /// Sending the out of band acknowledgement failed (0x38)
    SendFrameSendOobAck,
    /// Customer data pointer was null (0x39)
    SendFrameDataPointer,
    /// Carrier sense configuration required (0x3A)
    SendFrameCarrierSenseConfig,
    /// Waiting for the frame timed out (0x3E)
    SendFrameWaitTimeout,
    /// Invalid FCC channel (0x3F)
    SendFrameInvalidFccChannel,

    /// Library not ready, must be closed and reopened (0x41)
    SendBitState,
    /// Response pointer was null for a bidirectional frame (0x42)
    SendBitResponsePointer,
    /// Building the uplink frame failed (0x43)
    SendBitBuildUplink,
    /// Sending the uplink frame failed (0x44)
    SendBitSendUplink,
    /// Receiving the downlink frame failed or timed out (0x45)
    SendBitReceive,
    /// Delay before the out of band acknowledgement failed (0x46)
    SendBitDelayOobAck,
    /// Building the out of band acknowledgement failed (0x47)
    SendBitBuildOobAck,
    /// Sending the out of band acknowledgement failed (0x48)
    SendBitSendOobAck,
    /// Customer data pointer was null (0x49)
    SendBitDataPointer,
    /// Waiting for the frame timed out (0x4E)
    SendBitWaitTimeout,
    /// Invalid FCC channel (0x4F)
    SendBitInvalidFccChannel,

    /// Library not ready, must be closed and reopened (0x51)
    OutOfBandState,
    /// Building the uplink frame failed (0x53)
    OutOfBandBuildUplink,
    /// Sending the uplink frame failed (0x54)
    OutOfBandSendUplink,
    /// Invalid FCC channel (0x5F)
    OutOfBandInvalidFccChannel,

    /// Default SIGFOX channel out of range (0x90)
    ConfigSigfoxChannel,
    /// Unable to apply the configuration (0x91)
    ConfigSet,

    /// RF init failed (0xA0)
    TestMode0RfInit,
    /// Frequency change failed (0xA1)
    TestMode0ChangeFrequency,
    /// RF send failed (0xA2)
    TestMode0RfSend,
    /// Delay failed (0xA3)
    TestMode0Delay,
    /// RF stop failed (0xA4)
    TestMode0RfStop,

    /// Library not ready for a test mode (0xB1)
    TestModeState,

    /// Reporting the test result failed (0xC0)
    TestMode2ReportTest,

    /// RF init failed (0xD0)
    TestMode3RfInit,
    /// Frequency change failed (0xD1)
    TestMode3ChangeFrequency,
    /// Timer start failed (0xD2)
    TestMode3TimerStart,
    /// Reporting the test result failed (0xD3)
    TestMode3ReportTest,
    /// Timer stop failed (0xD4)
    TestMode3TimerStop,
    /// RF stop failed (0xD5)
    TestMode3RfStop,

    /// Building the uplink frame failed (0xE0)
    TestMode4BuildUplink,
    /// Sending the uplink frame failed (0xE1)
    TestMode4SendUplink,
    /// Reporting the test result failed (0xE2)
    TestMode4ReportTest,
    /// Reading the RSSI failed (0xE3)
    TestMode4GetRssi,
    /// Delay failed (0xE4)
    TestMode4Delay,

    /// RF init failed (0xF0)
    TestMode5RfInit,
    /// Frequency change failed (0xF1)
    TestMode5ChangeFrequency,
    /// Building the uplink frame failed (0xF2)
    TestMode5BuildUplink,
    /// Sending the uplink frame failed (0xF3)
    TestMode5SendUplink,
    /// RF stop failed (0xF4)
    TestMode5RfStop,

    /// An error code this driver does not know
    Unknown(u8),
}

impl DeviceError {
    /// Decodes the raw error byte of an acknowledgement
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => Self::None,
            0x10 => Self::OpenMalloc,
            0x11 => Self::OpenIdPointer,
            0x12 => Self::OpenGetSequence,
            0x13 => Self::OpenGetPn,
            0x14 => Self::OpenState,
            0x20 => Self::CloseFree,
            0x21 => Self::CloseRfStop,
            0x30 => Self::SendFrameDataLength,
            0x31 => Self::SendFrameState,
            0x32 => Self::SendFrameResponsePointer,
            0x33 => Self::SendFrameBuildUplink,
            0x34 => Self::SendFrameSendUplink,
            0x35 => Self::SendFrameReceive,
            0x36 => Self::SendFrameDelayOobAck,
            0x37 => Self::SendFrameBuildOobAck,
            0x38 => Self::SendFrameSendOobAck,
            0x39 => Self::SendFrameDataPointer,
            0x3A => Self::SendFrameCarrierSenseConfig,
            0x3E => Self::SendFrameWaitTimeout,
            0x3F => Self::SendFrameInvalidFccChannel,
            0x41 => Self::SendBitState,
            0x42 => Self::SendBitResponsePointer,
            0x43 => Self::SendBitBuildUplink,
            0x44 => Self::SendBitSendUplink,
            0x45 => Self::SendBitReceive,
            0x46 => Self::SendBitDelayOobAck,
            0x47 => Self::SendBitBuildOobAck,
            0x48 => Self::SendBitSendOobAck,
            0x49 => Self::SendBitDataPointer,
            0x4E => Self::SendBitWaitTimeout,
            0x4F => Self::SendBitInvalidFccChannel,
            0x51 => Self::OutOfBandState,
            0x53 => Self::OutOfBandBuildUplink,
            0x54 => Self::OutOfBandSendUplink,
            0x5F => Self::OutOfBandInvalidFccChannel,
            0x90 => Self::ConfigSigfoxChannel,
            0x91 => Self::ConfigSet,
            0xA0 => Self::TestMode0RfInit,
            0xA1 => Self::TestMode0ChangeFrequency,
            0xA2 => Self::TestMode0RfSend,
            0xA3 => Self::TestMode0Delay,
            0xA4 => Self::TestMode0RfStop,
            0xB1 => Self::TestModeState,
            0xC0 => Self::TestMode2ReportTest,
            0xD0 => Self::TestMode3RfInit,
            0xD1 => Self::TestMode3ChangeFrequency,
            0xD2 => Self::TestMode3TimerStart,
            0xD3 => Self::TestMode3ReportTest,
            0xD4 => Self::TestMode3TimerStop,
            0xD5 => Self::TestMode3RfStop,
            0xE0 => Self::TestMode4BuildUplink,
            0xE1 => Self::TestMode4SendUplink,
            0xE2 => Self::TestMode4ReportTest,
            0xE3 => Self::TestMode4GetRssi,
            0xE4 => Self::TestMode4Delay,
            0xF0 => Self::TestMode5RfInit,
            0xF1 => Self::TestMode5ChangeFrequency,
            0xF2 => Self::TestMode5BuildUplink,
            0xF3 => Self::TestMode5SendUplink,
            0xF4 => Self::TestMode5RfStop,
            other => Self::Unknown(other),
        }
    }

    /// Raw error byte as sent by the chip
    pub fn code(self) -> u8 {
        match self {
            Self::None => 0x00,
            Self::OpenMalloc => 0x10,
            Self::OpenIdPointer => 0x11,
            Self::OpenGetSequence => 0x12,
            Self::OpenGetPn => 0x13,
            Self::OpenState => 0x14,
            Self::CloseFree => 0x20,
            Self::CloseRfStop => 0x21,
            Self::SendFrameDataLength => 0x30,
            Self::SendFrameState => 0x31,
            Self::SendFrameResponsePointer => 0x32,
            Self::SendFrameBuildUplink => 0x33,
            Self::SendFrameSendUplink => 0x34,
            Self::SendFrameReceive => 0x35,
            Self::SendFrameDelayOobAck => 0x36,
            Self::SendFrameBuildOobAck => 0x37,
            Self::SendFrameSendOobAck => 0x38,
            Self::SendFrameDataPointer => 0x39,
            Self::SendFrameCarrierSenseConfig => 0x3A,
            Self::SendFrameWaitTimeout => 0x3E,
            Self::SendFrameInvalidFccChannel => 0x3F,
            Self::SendBitState => 0x41,
            Self::SendBitResponsePointer => 0x42,
            Self::SendBitBuildUplink => 0x43,
            Self::SendBitSendUplink => 0x44,
            Self::SendBitReceive => 0x45,
            Self::SendBitDelayOobAck => 0x46,
            Self::SendBitBuildOobAck => 0x47,
            Self::SendBitSendOobAck => 0x48,
            Self::SendBitDataPointer => 0x49,
            Self::SendBitWaitTimeout => 0x4E,
            Self::SendBitInvalidFccChannel => 0x4F,
            Self::OutOfBandState => 0x51,
            Self::OutOfBandBuildUplink => 0x53,
            Self::OutOfBandSendUplink => 0x54,
            Self::OutOfBandInvalidFccChannel => 0x5F,
            Self::ConfigSigfoxChannel => 0x90,
            Self::ConfigSet => 0x91,
            Self::TestMode0RfInit => 0xA0,
            Self::TestMode0ChangeFrequency => 0xA1,
            Self::TestMode0RfSend => 0xA2,
            Self::TestMode0Delay => 0xA3,
            Self::TestMode0RfStop => 0xA4,
            Self::TestModeState => 0xB1,
            Self::TestMode2ReportTest => 0xC0,
            Self::TestMode3RfInit => 0xD0,
            Self::TestMode3ChangeFrequency => 0xD1,
            Self::TestMode3TimerStart => 0xD2,
            Self::TestMode3ReportTest => 0xD3,
            Self::TestMode3TimerStop => 0xD4,
            Self::TestMode3RfStop => 0xD5,
            Self::TestMode4BuildUplink => 0xE0,
            Self::TestMode4SendUplink => 0xE1,
            Self::TestMode4ReportTest => 0xE2,
            Self::TestMode4GetRssi => 0xE3,
            Self::TestMode4Delay => 0xE4,
            Self::TestMode5RfInit => 0xF0,
            Self::TestMode5ChangeFrequency => 0xF1,
            Self::TestMode5BuildUplink => 0xF2,
            Self::TestMode5SendUplink => 0xF3,
            Self::TestMode5RfStop => 0xF4,
            Self::Unknown(other) => other,
        }
    }

    /// True only for [`DeviceError::None`]
    pub fn is_none(self) -> bool {
        self == Self::None
    }

    /// Command family the code belongs to
    pub fn family(self) -> ErrorFamily {
        if let Self::Unknown(_) = self {
            return ErrorFamily::Unknown;
        }

        match self.code() >> 4 {
            0x0 => ErrorFamily::None,
            0x1 => ErrorFamily::Open,
            0x2 => ErrorFamily::Close,
            0x3 => ErrorFamily::SendFrame,
            0x4 => ErrorFamily::SendBit,
            0x5 => ErrorFamily::OutOfBand,
            0x9 => ErrorFamily::Config,
            0xA => ErrorFamily::TestMode0,
            0xB => ErrorFamily::TestModeState,
            0xC => ErrorFamily::TestMode2,
            0xD => ErrorFamily::TestMode3,
            0xE => ErrorFamily::TestMode4,
            0xF => ErrorFamily::TestMode5,
            _ => ErrorFamily::Unknown,
        }
    }
}

impl From<u8> for DeviceError {
    fn from(code: u8) -> Self {
        Self::from_code(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_survives_decoding() {
        for code in 0..=u8::MAX {
            assert_eq!(DeviceError::from_code(code).code(), code);
        }
    }

    #[test]
    fn known_codes_count() {
        let known = (0..=u8::MAX)
            .filter(|code| !matches!(DeviceError::from_code(*code), DeviceError::Unknown(_)))
            .count();
        assert_eq!(known, 61);
    }

    #[test]
    fn families() {
        assert_eq!(DeviceError::None.family(), ErrorFamily::None);
        assert_eq!(DeviceError::OpenState.family(), ErrorFamily::Open);
        assert_eq!(DeviceError::SendFrameInvalidFccChannel.family(), ErrorFamily::SendFrame);
        assert_eq!(DeviceError::OutOfBandSendUplink.family(), ErrorFamily::OutOfBand);
        assert_eq!(DeviceError::ConfigSet.family(), ErrorFamily::Config);
        assert_eq!(DeviceError::TestMode5RfStop.family(), ErrorFamily::TestMode5);
        assert_eq!(DeviceError::Unknown(0x3B).family(), ErrorFamily::Unknown);
    }

    #[test]
    fn state_values() {
        assert_eq!(DeviceState::from(0), DeviceState::Idle);
        assert_eq!(DeviceState::from(1), DeviceState::Init);
        assert_eq!(DeviceState::from(2), DeviceState::WaitForCommand);
        assert_eq!(DeviceState::from(7), DeviceState::Unknown(7));
        assert_eq!(u8::from(DeviceState::Unknown(7)), 7);
        assert_eq!(u8::from(DeviceState::WaitForCommand), 2);
    }
}
