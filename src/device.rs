//! OL23xx Device Interface
//!
//! This module provides the command engine for the OL2385/OL2361 transceivers.
//! It supports both synchronous and asynchronous operation.
//!
//! The interface is built around the `Device<SPI, CS, BUSY, D>` struct which owns
//! the [`Handshake`] transport and the last device state and error code reported
//! by the chip. It provides methods for:
//! - Sending raw commands by [`CommandId`] and payload
//! - Executing typed `regiface` commands
//! - Reading and writing chip registers
//! - Splitting a command into send, poll and receive steps
//!
//! Per-command helpers and initialization live in [`crate::operations`].
//!
//! # Example
//! ```ignore
//! use ol23xx::{commands::CommandId, Config, Device};
//!
//! // Create device with SPI bus, chip-select, busy pin and delay
//! let mut device = Device::new(spi, cs, busy, delay, Config::default());
//!
//! // Raw command
//! let ack = device.send_command(CommandId::GetWatchdogTimer, &[])?;
//!
//! // Typed command
//! let info = device.execute_command(ol23xx::commands::GetInfo)?;
//! ```

use core::convert::Infallible;

use embedded_hal::digital::{InputPin, OutputPin};
use regiface::{ByteArray, Command, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

use crate::commands::{
    CommandDescriptor, CommandId, DeviceError, DeviceState, GetRegister, RegisterWrite,
    SetRegister, TimeoutClass,
};
use crate::config::Config;
use crate::frame::{AckFrame, InformationFrame, ACK_FRAME_MAX, ACK_PAYLOAD_MAX};
use crate::transport::Handshake;
use crate::Error;

/// Acknowledgement whose payload length differs from the catalog value
///
/// Not an error: the acknowledgement was accepted and its payload used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LengthAnomaly {
    /// Command the acknowledgement answered
    pub command: CommandId,
    /// Payload length listed in the command catalog
    pub expected: usize,
    /// Payload length the chip sent
    pub received: usize,
}

/// Main device interface for the OL23xx transceivers
///
/// Owns the transport peripherals and mirrors the device state and error code
/// of the last acknowledgement. Nothing is reset automatically; the mirrored
/// values only change when an acknowledgement is received or
/// [`init`](Device::init) starts.
pub struct Device<SPI, CS, BUSY, D> {
    pub(crate) bus: Handshake<SPI, CS, BUSY, D>,
    pub(crate) config: Config,
    pub(crate) state: DeviceState,
    pub(crate) error: DeviceError,
    pub(crate) anomaly: Option<LengthAnomaly>,
    pending: Option<CommandId>,
}

impl<SPI, CS, BUSY, D> Device<SPI, CS, BUSY, D> {
    /// Creates a new Device
    ///
    /// # Arguments
    /// * `spi` - SPI bus (mode 0, MSB first; the reference board runs it at 125 kHz)
    /// * `cs` - Chip-select output, active low
    /// * `busy` - Busy/ACK input driven by the chip
    /// * `delay` - Delay provider used for polling and settling delays
    /// * `config` - Chip model and init parameters
    pub fn new(spi: SPI, cs: CS, busy: BUSY, delay: D, config: Config) -> Self {
        Self {
            bus: Handshake::new(spi, cs, busy, delay),
            config,
            state: DeviceState::Init,
            error: DeviceError::None,
            anomaly: None,
            pending: None,
        }
    }

    /// Releases the underlying peripherals
    pub fn release(self) -> (SPI, CS, BUSY, D) {
        self.bus.release()
    }

    /// Configuration the device was created with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Device state reported by the last acknowledgement
    pub fn device_state(&self) -> DeviceState {
        self.state
    }

    /// Error code reported by the last acknowledgement
    pub fn device_error(&self) -> DeviceError {
        self.error
    }

    /// Length anomaly of the last acknowledged command
    ///
    /// Cleared when the next command is sent.
    pub fn last_ack_anomaly(&self) -> Option<LengthAnomaly> {
        self.anomaly
    }

    fn pack(command: CommandId, payload: &[u8]) -> InformationFrame {
        let descriptor = command.descriptor();
        assert!(
            payload.len() <= descriptor.request_len,
            "request payload too long for command"
        );

        InformationFrame::pack(command, payload)
    }

    /// Parses an acknowledgement and mirrors its status into the driver
    fn accept(
        &mut self,
        bytes: &[u8],
        capacity: usize,
        descriptor: Option<CommandDescriptor>,
    ) -> Result<AckFrame, Error> {
        let ack = AckFrame::parse(bytes, capacity)?;

        self.state = ack.state();
        self.error = ack.error();

        #[cfg(feature = "defmt")]
        defmt::debug!("ack: error {} state {}", self.error, self.state);

        if let Some(descriptor) = descriptor {
            if self.error.is_none() && !ack.matches_expected(descriptor.ack_len) {
                let anomaly = LengthAnomaly {
                    command: descriptor.id,
                    expected: descriptor.ack_len,
                    received: ack.payload().len(),
                };

                #[cfg(feature = "defmt")]
                defmt::warn!("acknowledgement length anomaly: {}", anomaly);

                self.anomaly = Some(anomaly);
            }
        }

        if self.error.is_none() {
            Ok(ack)
        } else {
            Err(Error::AckError(self.error))
        }
    }
}

impl<SPI, CS, BUSY, D> Device<SPI, CS, BUSY, D>
where
    CS: OutputPin,
    BUSY: InputPin,
{
    /// True when the chip has an acknowledgement ready
    ///
    /// Reads the busy line once, without waiting.
    pub fn is_ack_ready(&mut self) -> Result<bool, Error> {
        self.bus.is_ack_ready()
    }
}

/// Copies an acknowledgement payload into a typed response
fn decode_response<R: FromByteArray>(ack: Option<AckFrame>) -> Result<R, Error> {
    let mut raw = R::Array::new();
    let len = raw.as_ref().len();

    if len > 0 {
        let ack = ack.ok_or(Error::AckLength)?;
        let payload = ack.payload();
        if payload.len() < len {
            return Err(Error::AckLength);
        }
        raw.as_mut().copy_from_slice(&payload[..len]);
    }

    R::from_bytes(raw).map_err(|_| Error::Deserialization)
}

impl<SPI, CS, BUSY, D> Device<SPI, CS, BUSY, D>
where
    SPI: embedded_hal::spi::SpiBus,
    CS: OutputPin,
    BUSY: InputPin,
    D: embedded_hal::delay::DelayNs,
{
    /// Sends a command and waits for its acknowledgement
    ///
    /// The wait is bounded by the command's [`TimeoutClass`]. Commands that are
    /// never acknowledged return `Ok(None)` once the frame has been sent.
    ///
    /// # Errors
    /// * `Error::Timeout` - The handshake did not complete in time
    /// * `Error::AckLength` - The acknowledgement length is invalid
    /// * `Error::AckError` - The chip reported an error code
    /// * `Error::Bus` / `Error::Pin` - HAL failure
    ///
    /// # Panics
    /// Panics when `payload` is longer than the command accepts.
    pub fn send_command(
        &mut self,
        command: CommandId,
        payload: &[u8],
    ) -> Result<Option<AckFrame>, Error> {
        self.send_command_with_timeout(command, payload, command.descriptor().timeout)
    }

    /// Sends a command and waits for its acknowledgement within `timeout`
    ///
    /// Same as [`send_command`](Device::send_command) with an explicit timeout class.
    pub fn send_command_with_timeout(
        &mut self,
        command: CommandId,
        payload: &[u8],
        timeout: TimeoutClass,
    ) -> Result<Option<AckFrame>, Error> {
        let descriptor = command.descriptor();
        let frame = Self::pack(command, payload);
        self.anomaly = None;

        #[cfg(feature = "defmt")]
        defmt::trace!("send_command({}, {=[u8]:02x})", command, payload);

        self.bus.send_frame(frame.as_bytes())?;

        if !descriptor.is_acknowledged() {
            return Ok(None);
        }

        let mut buffer = [0u8; ACK_FRAME_MAX];
        let len = self.bus.receive_frame(&mut buffer, timeout.as_micros())?;

        self.accept(&buffer[..len], ACK_PAYLOAD_MAX, Some(descriptor))
            .map(Some)
    }

    /// Executes a typed command
    ///
    /// # Type Parameters
    /// * `C` - Command type implementing the Command trait with a [`CommandId`] id
    ///
    /// # Errors
    /// Same as [`send_command`](Device::send_command), plus
    /// * `Error::AckLength` - The payload is shorter than the response type
    /// * `Error::Deserialization` - Failed to parse the command response
    pub fn execute_command<C>(&mut self, command: C) -> Result<C::ResponseParameters, Error>
    where
        C: Command<IdType = CommandId>,
        C::CommandParameters: ToByteArray<Error = Infallible>,
    {
        let request = command
            .invoking_parameters()
            .to_bytes()
            .unwrap_or_else(|never| match never {});

        let ack = self.send_command(C::id(), request.as_ref())?;
        decode_response(ack)
    }

    /// Reads a chip register through GetRegister
    ///
    /// # Type Parameters
    /// * `R` - Register type with an 8 bit address and a 16 bit value
    pub fn read_register<R>(&mut self) -> Result<R, Error>
    where
        R: ReadableRegister<IdType = u8> + FromByteArray<Array = [u8; 2]>,
    {
        let value = self.execute_command(GetRegister { address: R::id() })?;
        R::from_bytes(value.0).map_err(|_| Error::Deserialization)
    }

    /// Writes a chip register through SetRegister
    ///
    /// # Type Parameters
    /// * `R` - Register type with an 8 bit address and a 16 bit value
    pub fn write_register<R>(&mut self, register: R) -> Result<(), Error>
    where
        R: WritableRegister<IdType = u8> + ToByteArray<Array = [u8; 2], Error = Infallible>,
    {
        let value = register.to_bytes().unwrap_or_else(|never| match never {});

        self.execute_command(SetRegister {
            write: RegisterWrite {
                address: R::id(),
                value: u16::from_be_bytes(value),
            },
        })
        .map(|_| ())
    }

    /// Sends a command without waiting for its acknowledgement
    ///
    /// Poll [`is_ack_ready`](Device::is_ack_ready) and then call
    /// [`read_ack_nonblock`](Device::read_ack_nonblock) for acknowledged commands.
    ///
    /// # Panics
    /// Panics when `payload` is longer than the command accepts.
    pub fn send_command_nonblock(&mut self, command: CommandId, payload: &[u8]) -> Result<(), Error> {
        let frame = Self::pack(command, payload);
        self.anomaly = None;
        self.pending = Some(command);

        #[cfg(feature = "defmt")]
        defmt::trace!("send_command_nonblock({}, {=[u8]:02x})", command, payload);

        self.bus.send_frame(frame.as_bytes())
    }

    /// Reads a pending acknowledgement
    ///
    /// Intended to be called after [`is_ack_ready`](Device::is_ack_ready)
    /// returned true. `capacity` is the largest payload the caller accepts.
    ///
    /// # Errors
    /// * `Error::AckLength` - The payload exceeds `capacity`
    /// * `Error::AckError` - The chip reported an error code
    /// * `Error::Timeout` / `Error::Bus` / `Error::Pin` - Transport failure
    pub fn read_ack_nonblock(&mut self, capacity: usize) -> Result<AckFrame, Error> {
        let descriptor = self.pending.take().map(CommandId::descriptor);
        let mut buffer = [0u8; ACK_FRAME_MAX];
        let len = self.bus.receive_frame(
            &mut buffer,
            TimeoutClass::TransmissionWithReceive.as_micros(),
        )?;

        self.accept(&buffer[..len], capacity, descriptor)
    }
}

impl<SPI, CS, BUSY, D> Device<SPI, CS, BUSY, D>
where
    SPI: embedded_hal_async::spi::SpiBus,
    CS: OutputPin,
    BUSY: InputPin,
    D: embedded_hal_async::delay::DelayNs,
{
    /// Asynchronously sends a command and waits for its acknowledgement
    ///
    /// This is the async version of [`send_command`](Device::send_command).
    pub async fn send_command_async(
        &mut self,
        command: CommandId,
        payload: &[u8],
    ) -> Result<Option<AckFrame>, Error> {
        self.send_command_with_timeout_async(command, payload, command.descriptor().timeout)
            .await
    }

    /// Asynchronously sends a command and waits for its acknowledgement within `timeout`
    ///
    /// This is the async version of
    /// [`send_command_with_timeout`](Device::send_command_with_timeout).
    pub async fn send_command_with_timeout_async(
        &mut self,
        command: CommandId,
        payload: &[u8],
        timeout: TimeoutClass,
    ) -> Result<Option<AckFrame>, Error> {
        let descriptor = command.descriptor();
        let frame = Self::pack(command, payload);
        self.anomaly = None;

        #[cfg(feature = "defmt")]
        defmt::trace!("send_command_async({}, {=[u8]:02x})", command, payload);

        self.bus.send_frame_async(frame.as_bytes()).await?;

        if !descriptor.is_acknowledged() {
            return Ok(None);
        }

        let mut buffer = [0u8; ACK_FRAME_MAX];
        let len = self
            .bus
            .receive_frame_async(&mut buffer, timeout.as_micros())
            .await?;

        self.accept(&buffer[..len], ACK_PAYLOAD_MAX, Some(descriptor))
            .map(Some)
    }

    /// Asynchronously executes a typed command
    ///
    /// This is the async version of [`execute_command`](Device::execute_command).
    pub async fn execute_command_async<C>(
        &mut self,
        command: C,
    ) -> Result<C::ResponseParameters, Error>
    where
        C: Command<IdType = CommandId>,
        C::CommandParameters: ToByteArray<Error = Infallible>,
    {
        let request = command
            .invoking_parameters()
            .to_bytes()
            .unwrap_or_else(|never| match never {});

        let ack = self.send_command_async(C::id(), request.as_ref()).await?;
        decode_response(ack)
    }

    /// Asynchronously reads a chip register through GetRegister
    ///
    /// This is the async version of [`read_register`](Device::read_register).
    pub async fn read_register_async<R>(&mut self) -> Result<R, Error>
    where
        R: ReadableRegister<IdType = u8> + FromByteArray<Array = [u8; 2]>,
    {
        let value = self
            .execute_command_async(GetRegister { address: R::id() })
            .await?;
        R::from_bytes(value.0).map_err(|_| Error::Deserialization)
    }

    /// Asynchronously writes a chip register through SetRegister
    ///
    /// This is the async version of [`write_register`](Device::write_register).
    pub async fn write_register_async<R>(&mut self, register: R) -> Result<(), Error>
    where
        R: WritableRegister<IdType = u8> + ToByteArray<Array = [u8; 2], Error = Infallible>,
    {
        let value = register.to_bytes().unwrap_or_else(|never| match never {});

        self.execute_command_async(SetRegister {
            write: RegisterWrite {
                address: R::id(),
                value: u16::from_be_bytes(value),
            },
        })
        .await
        .map(|_| ())
    }

    /// Asynchronously sends a command without waiting for its acknowledgement
    ///
    /// This is the async version of
    /// [`send_command_nonblock`](Device::send_command_nonblock).
    pub async fn send_command_nonblock_async(
        &mut self,
        command: CommandId,
        payload: &[u8],
    ) -> Result<(), Error> {
        let frame = Self::pack(command, payload);
        self.anomaly = None;
        self.pending = Some(command);

        self.bus.send_frame_async(frame.as_bytes()).await
    }

    /// Asynchronously reads a pending acknowledgement
    ///
    /// This is the async version of [`read_ack_nonblock`](Device::read_ack_nonblock).
    pub async fn read_ack_nonblock_async(&mut self, capacity: usize) -> Result<AckFrame, Error> {
        let descriptor = self.pending.take().map(CommandId::descriptor);
        let mut buffer = [0u8; ACK_FRAME_MAX];
        let len = self
            .bus
            .receive_frame_async(&mut buffer, TimeoutClass::TransmissionWithReceive.as_micros())
            .await?;

        self.accept(&buffer[..len], capacity, descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{GetInfo, GetUlFrequency, GetWatchdogTimer, WatchdogTime};
    use crate::registers::Freqcon;
    use crate::sim::SimChip;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinMockState, Transaction as PinTransaction,
    };
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};
    use futures::executor::block_on;
    use regiface::{register, ReadableRegister, WritableRegister};
    use std::vec;

    #[register(0x2Au8)]
    #[derive(Debug, Clone, Copy, PartialEq, ReadableRegister, WritableRegister)]
    struct TestRegister {
        value: u16,
    }

    impl FromByteArray for TestRegister {
        type Error = Infallible;
        type Array = [u8; 2];

        fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
            Ok(Self {
                value: u16::from_be_bytes(bytes),
            })
        }
    }

    impl ToByteArray for TestRegister {
        type Error = Infallible;
        type Array = [u8; 2];

        fn to_bytes(self) -> Result<Self::Array, Self::Error> {
            Ok(self.value.to_be_bytes())
        }
    }

    #[test]
    fn watchdog_query_on_the_wire() {
        let spi = SpiMock::new(&[
            SpiTransaction::transfer(vec![0x02, 0x0F], vec![0x00, 0x00]),
            SpiTransaction::flush(),
            SpiTransaction::transfer(vec![0xFF], vec![0x04]),
            SpiTransaction::transfer(vec![0xFF, 0xFF, 0xFF], vec![0x00, 0x02, 0x0C]),
            SpiTransaction::flush(),
        ]);
        let cs = PinMock::new(&[
            PinTransaction::set(PinMockState::Low),
            PinTransaction::set(PinMockState::High),
            PinTransaction::set(PinMockState::Low),
            PinTransaction::set(PinMockState::High),
        ]);
        let busy = PinMock::new(&[
            PinTransaction::get(PinMockState::High),
            PinTransaction::get(PinMockState::Low),
            PinTransaction::get(PinMockState::High),
            PinTransaction::get(PinMockState::Low),
            PinTransaction::get(PinMockState::High),
        ]);

        let mut device = Device::new(spi, cs, busy, NoopDelay::new(), Config::default());
        let watchdog = device.execute_command(GetWatchdogTimer).unwrap();

        assert_eq!(watchdog, WatchdogTime::S65_536);
        assert_eq!(device.device_state(), DeviceState::WaitForCommand);

        let (mut spi, mut cs, mut busy, _) = device.release();
        spi.done();
        cs.done();
        busy.done();
    }

    #[test]
    fn chip_error_is_kept() {
        let sim = SimChip::new();
        sim.with(|chip| chip.error_code = 0x91);

        let mut device = sim.device(Config::default());
        let result = device.send_command(CommandId::ChangeToRcz1, &[]);

        assert_eq!(result, Err(Error::AckError(DeviceError::ConfigSet)));
        assert_eq!(device.device_error(), DeviceError::ConfigSet);
        assert_eq!(device.device_state(), DeviceState::Init);
    }

    #[test]
    fn unacknowledged_command_skips_receive() {
        let sim = SimChip::new();
        let mut device = sim.device(Config::default());

        assert_eq!(device.send_command(CommandId::WakeUp, &[]), Ok(None));
        sim.with(|chip| {
            assert_eq!(chip.frames, [vec![0x02, 0x01]]);
            assert_eq!(chip.selects, 1);
            assert_eq!(chip.releases, 1);
        });
    }

    #[test]
    fn state_is_copied_passively() {
        let sim = SimChip::new();
        let mut device = sim.device(Config::default());

        for state in [2u8, 0, 1, 2, 0, 7] {
            sim.with(|chip| chip.state = state);
            device.send_command(CommandId::KeepAlive, &[]).unwrap();
            assert_eq!(device.device_state(), DeviceState::from(state));
        }
    }

    #[test]
    fn typed_info_command() {
        let sim = SimChip::new();
        let mut device = sim.device(Config::default());

        let info = device.execute_command(GetInfo).unwrap();
        assert_eq!(info.device_id, 0x0042_1337);
        assert_eq!(&info.pac, b"PAC12345");
    }

    #[test]
    fn short_payload_for_typed_response() {
        let sim = SimChip::new();
        sim.with(|chip| chip.next_reply = Some(vec![0x05, 0x00, 0x02, 0x20, 0x05]));

        let mut device = sim.device(Config::default());
        assert_eq!(device.execute_command(GetUlFrequency), Err(Error::AckLength));
    }

    #[test]
    fn length_anomaly_is_not_fatal() {
        let sim = SimChip::new();
        sim.with(|chip| chip.next_reply = Some(vec![0x04, 0x00, 0x02, 0x99]));

        let mut device = sim.device(Config::default());
        let ack = device.send_command(CommandId::KeepAlive, &[]).unwrap().unwrap();

        assert_eq!(ack.payload(), &[0x99]);
        assert!(!ack.matches_expected(CommandId::KeepAlive.descriptor().ack_len));
        assert_eq!(
            device.last_ack_anomaly(),
            Some(LengthAnomaly {
                command: CommandId::KeepAlive,
                expected: 0,
                received: 1,
            })
        );

        device.send_command(CommandId::KeepAlive, &[]).unwrap();
        assert_eq!(device.last_ack_anomaly(), None);
    }

    #[test]
    fn anomaly_not_reported_for_chip_errors() {
        let sim = SimChip::new();
        sim.with(|chip| chip.error_code = 0x91);

        let mut device = sim.device(Config::default());
        assert!(device.execute_command(GetInfo).is_err());
        assert_eq!(device.last_ack_anomaly(), None);
    }

    #[test]
    fn non_blocking_anomaly() {
        let sim = SimChip::new();
        sim.with(|chip| chip.next_reply = Some(vec![0x05, 0x00, 0x02, 0x0C, 0x00]));

        let mut device = sim.device(Config::default());
        device
            .send_command_nonblock(CommandId::GetWatchdogTimer, &[])
            .unwrap();
        sim.with(|chip| chip.advance_us(10_000));

        let ack = device.read_ack_nonblock(ACK_PAYLOAD_MAX).unwrap();
        assert_eq!(ack.payload(), &[0x0C, 0x00]);
        assert_eq!(
            device.last_ack_anomaly(),
            Some(LengthAnomaly {
                command: CommandId::GetWatchdogTimer,
                expected: 1,
                received: 2,
            })
        );
    }

    #[test]
    fn undecodable_response() {
        let sim = SimChip::new();
        sim.with(|chip| chip.next_reply = Some(vec![0x04, 0x00, 0x02, 0x10]));

        let mut device = sim.device(Config::default());
        assert_eq!(
            device.execute_command(GetWatchdogTimer),
            Err(Error::Deserialization)
        );
        assert_eq!(device.device_state(), DeviceState::WaitForCommand);
    }

    #[test]
    fn oversized_ack_is_rejected_and_released() {
        let sim = SimChip::new();
        sim.with(|chip| {
            let mut reply = vec![0xFFu8; 40];
            reply[0] = 40;
            chip.next_reply = Some(reply);
        });

        let mut device = sim.device(Config::default());
        assert_eq!(device.send_command(CommandId::GetInfo, &[]), Err(Error::AckLength));
        sim.with(|chip| {
            assert_eq!(chip.selects, 2);
            assert_eq!(chip.releases, 2);
        });
    }

    #[test]
    #[should_panic]
    fn oversized_request_payload() {
        let sim = SimChip::new();
        let mut device = sim.device(Config::default());
        let _ = device.send_command(CommandId::SetWatchdogTimer, &[0x01, 0x02]);
    }

    #[test]
    fn register_access() {
        let sim = SimChip::new();
        let mut device = sim.device(Config::default());

        device.write_register(TestRegister { value: 0xBEEF }).unwrap();
        sim.with(|chip| {
            assert_eq!(chip.registers[0x2A], 0xBEEF);
            assert_eq!(chip.frames.last().unwrap(), &vec![0x05, 0x10, 0x2A, 0xBE, 0xEF]);
        });

        let register: TestRegister = device.read_register().unwrap();
        assert_eq!(register, TestRegister { value: 0xBEEF });
    }

    #[test]
    fn async_register_access() {
        let sim = SimChip::new();
        let mut device = sim.device(Config::default());

        block_on(device.write_register_async(TestRegister { value: 0x1234 })).unwrap();
        sim.with(|chip| assert_eq!(chip.registers[0x2A], 0x1234));

        let register: TestRegister = block_on(device.read_register_async()).unwrap();
        assert_eq!(register, TestRegister { value: 0x1234 });
    }

    #[test]
    fn non_blocking_flow() {
        let sim = SimChip::new();
        sim.with(|chip| chip.ack_latency_us = 5_000);

        let mut device = sim.device(Config::default());
        device
            .send_command_nonblock(CommandId::GetWatchdogTimer, &[])
            .unwrap();

        assert_eq!(device.is_ack_ready(), Ok(false));
        sim.with(|chip| chip.advance_us(5_000));
        assert_eq!(device.is_ack_ready(), Ok(true));

        let ack = device.read_ack_nonblock(1).unwrap();
        assert_eq!(ack.payload(), &[0x0C]);
        assert_eq!(device.is_ack_ready(), Ok(false));
    }

    #[test]
    fn non_blocking_capacity() {
        let sim = SimChip::new();
        let mut device = sim.device(Config::default());

        device.send_command_nonblock(CommandId::GetInfo, &[]).unwrap();
        sim.with(|chip| chip.advance_us(10_000));

        assert_eq!(device.read_ack_nonblock(8), Err(Error::AckLength));
        sim.with(|chip| assert_eq!(chip.selects, chip.releases));
    }

    #[test]
    fn async_typed_command() {
        let sim = SimChip::new();
        let mut device = sim.device(Config::default());

        let freqcon = block_on(device.execute_command_async(GetUlFrequency)).unwrap();
        assert_eq!(freqcon, Freqcon([0x20, 0x05, 0x81, 0xDA]));

        let ack = block_on(device.send_command_async(CommandId::KeepAlive, &[])).unwrap();
        assert!(ack.unwrap().payload().is_empty());
        assert_eq!(device.device_state(), DeviceState::Init);
    }

    #[test]
    fn async_non_blocking_flow() {
        let sim = SimChip::new();
        let mut device = sim.device(Config::default());

        block_on(device.send_command_nonblock_async(CommandId::CheckIdKey, &[])).unwrap();
        sim.with(|chip| chip.advance_us(10_000));
        assert_eq!(device.is_ack_ready(), Ok(true));

        let ack = block_on(device.read_ack_nonblock_async(1)).unwrap();
        assert_eq!(ack.payload(), &[0x01]);
    }
}
