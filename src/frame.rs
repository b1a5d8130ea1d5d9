//! Frame codec
//!
//! Two frame types travel over the bus:
//!
//! - Information frames (host to chip):
//!   `[length, command, payload...]` where `length = 2 + payload.len()`
//! - Acknowledgement frames (chip to host):
//!   `[length, error, state, payload...]` where `length = 3 + payload.len()`
//!
//! Both live in fixed size stack buffers sized to the largest frame.

use crate::commands::{CommandId, DeviceError, DeviceState};
use crate::Error;

/// Information frame header size (length and command bytes)
pub const INFO_HEADER_LEN: usize = 2;
/// Largest information frame payload
pub const INFO_PAYLOAD_MAX: usize = 12;
/// Largest information frame
pub const INFO_FRAME_MAX: usize = INFO_HEADER_LEN + INFO_PAYLOAD_MAX;

/// Acknowledgement frame header size (length, error and state bytes)
pub const ACK_HEADER_LEN: usize = 3;
/// Largest acknowledgement payload (GetInfo)
pub const ACK_PAYLOAD_MAX: usize = 23;
/// Largest acknowledgement frame
pub const ACK_FRAME_MAX: usize = ACK_HEADER_LEN + ACK_PAYLOAD_MAX;

/// Outbound information frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InformationFrame {
    bytes: [u8; INFO_FRAME_MAX],
}

impl InformationFrame {
    /// Packs a command and its payload
    ///
    /// # Panics
    /// Panics when `payload` is longer than [`INFO_PAYLOAD_MAX`].
    pub fn pack(command: CommandId, payload: &[u8]) -> Self {
        assert!(
            payload.len() <= INFO_PAYLOAD_MAX,
            "information frame payload too long"
        );

        let mut bytes = [0; INFO_FRAME_MAX];
        bytes[0] = (INFO_HEADER_LEN + payload.len()) as u8;
        bytes[1] = command as u8;
        bytes[INFO_HEADER_LEN..INFO_HEADER_LEN + payload.len()].copy_from_slice(payload);

        Self { bytes }
    }

    /// Frame length in bytes, header included
    pub fn len(&self) -> usize {
        usize::from(self.bytes[0])
    }

    /// Command byte
    pub fn command(&self) -> u8 {
        self.bytes[1]
    }

    /// Payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.bytes[INFO_HEADER_LEN..self.len()]
    }

    /// Bytes to put on the wire
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len()]
    }
}

/// Parsed acknowledgement frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckFrame {
    length: u8,
    error: u8,
    state: u8,
    payload: [u8; ACK_PAYLOAD_MAX],
}

impl AckFrame {
    /// Parses a received acknowledgement
    ///
    /// `capacity` is the number of payload bytes the caller is prepared to
    /// accept.
    ///
    /// # Errors
    /// * [`Error::AckLength`] - The declared length is shorter than the header,
    ///   implies a payload larger than `capacity`, or exceeds the bytes received
    pub fn parse(bytes: &[u8], capacity: usize) -> Result<Self, Error> {
        let length = *bytes.first().ok_or(Error::AckLength)?;
        let declared = usize::from(length);

        if declared < ACK_HEADER_LEN || declared > bytes.len() {
            return Err(Error::AckLength);
        }

        let payload_len = declared - ACK_HEADER_LEN;
        if payload_len > capacity.min(ACK_PAYLOAD_MAX) {
            return Err(Error::AckLength);
        }

        let mut payload = [0; ACK_PAYLOAD_MAX];
        payload[..payload_len].copy_from_slice(&bytes[ACK_HEADER_LEN..declared]);

        Ok(Self {
            length,
            error: bytes[1],
            state: bytes[2],
            payload,
        })
    }

    /// Declared frame length, header included
    pub fn len(&self) -> usize {
        usize::from(self.length)
    }

    /// Error code reported by the chip
    pub fn error(&self) -> DeviceError {
        DeviceError::from_code(self.error)
    }

    /// Device state reported by the chip
    pub fn state(&self) -> DeviceState {
        DeviceState::from(self.state)
    }

    /// Payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.len() - ACK_HEADER_LEN]
    }

    /// True when the payload length equals the length expected for a command
    pub fn matches_expected(&self, expected_payload_len: usize) -> bool {
        self.len() - ACK_HEADER_LEN == expected_payload_len
    }
}
