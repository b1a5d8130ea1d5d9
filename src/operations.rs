//! Device operations
//!
//! One method per chip command, plus the power-up initialization sequence.
//! Every method returns `Result<T, Error>` where:
//! - `Ok` means the chip acknowledged the command without error
//! - `Err(Error::AckError(_))` carries the chip's own error code
//! - any other error is a transport failure
//!
//! The last reported device state and error code remain readable through
//! [`Device::device_state`] and [`Device::device_error`] for diagnostics. An
//! acknowledgement of unexpected length still succeeds and is reported through
//! [`Device::last_ack_anomaly`].
//!
//! Every operation has an `_async` counterpart.
//!
//! # Initialization
//! [`Device::init`] must run once after power-up:
//! 1. Wait for the busy line to go high (chip ready)
//! 2. Wake the chip and let it settle for 100 ms
//! 3. Echo `[1, 2, 3, 4, 5]` and expect the bitwise complement back
//! 4. Select the configured network standard
//! 5. Set the configured watchdog period
//!
//! The first failing step aborts the sequence; nothing is retried.

use embedded_hal::digital::{InputPin, OutputPin, PinState};

use crate::commands::{
    CheckIdKey, CommandId, ContinuousWave, DeviceError, DeviceState, DeviceVersion,
    DownlinkFrame, GetDeviceVersion, GetInfo, GetUlFrequency, GetWatchdogTimer, InfoResponse,
    KeepAlive, NetworkStandard, SendBit, SendOutOfBand, SendTestMode, SetUlFrequency,
    SetWatchdogTimer, Sleep, TestMode, TimeoutClass, TriggerWatchdog, WakeUp, WatchdogTime,
};
use crate::config::timing;
use crate::frame::AckFrame;
use crate::registers::FrequencyRegisters;
use crate::{Device, Error};

/// Pattern sent by the echo self-test
pub const ECHO_PATTERN: [u8; 5] = [0x01, 0x02, 0x03, 0x04, 0x05];

/// Identification data of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// SIGFOX device id
    pub device_id: u32,
    /// Porting authorization code
    pub pac: [u8; 8],
    /// SIGFOX library version
    pub library_version: [u8; 11],
    /// Device firmware version
    pub device_version: [u8; 15],
}

impl DeviceInfo {
    fn new(info: InfoResponse, version: DeviceVersion) -> Self {
        Self {
            device_id: info.device_id,
            pac: info.pac,
            library_version: info.library_version,
            device_version: version.0,
        }
    }
}

fn echo_matches(payload: &[u8]) -> bool {
    payload.len() == ECHO_PATTERN.len()
        && payload
            .iter()
            .zip(ECHO_PATTERN.iter())
            .all(|(reply, sent)| *reply == !*sent)
}

fn downlink(ack: Option<AckFrame>) -> Result<DownlinkFrame, Error> {
    let ack = ack.ok_or(Error::AckLength)?;

    if ack.payload().len() > DownlinkFrame::MAX_LEN {
        return Err(Error::AckLength);
    }

    Ok(DownlinkFrame::new(ack.payload()))
}

impl<SPI, CS, BUSY, D> Device<SPI, CS, BUSY, D> {
    fn reset_status(&mut self) {
        self.state = DeviceState::Init;
        self.error = DeviceError::None;
        self.anomaly = None;
    }
}

impl<SPI, CS, BUSY, D> Device<SPI, CS, BUSY, D>
where
    SPI: embedded_hal::spi::SpiBus,
    CS: OutputPin,
    BUSY: InputPin,
    D: embedded_hal::delay::DelayNs,
{
    /// Runs the power-up initialization sequence
    ///
    /// # Errors
    /// * `Error::SpiTestFail` - The echo reply was not the complement of the pattern
    /// * any error of the individual steps
    pub fn init(&mut self) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("init({})", self.config);

        self.reset_status();

        self.bus
            .wait_busy(PinState::High, TimeoutClass::Init.as_micros())?;
        self.wake_up()?;

        if !self.test_spi_connection()? {
            return Err(Error::SpiTestFail);
        }

        self.change_network_standard(self.config.network_standard)?;
        self.set_watchdog(self.config.watchdog)
    }

    /// Wakes the chip and waits for it to settle
    pub fn wake_up(&mut self) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("wake_up()");

        let result = self.execute_command(WakeUp).map(|_| ());
        self.bus.delay_ms(timing::WAKEUP_DELAY_MS);
        result
    }

    /// Puts the chip into power-down
    pub fn sleep(&mut self) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("sleep()");

        self.execute_command(Sleep).map(|_| ())
    }

    /// Echo self-test
    ///
    /// Returns `Ok(false)` when the reply is not the complement of
    /// [`ECHO_PATTERN`].
    pub fn test_spi_connection(&mut self) -> Result<bool, Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("test_spi_connection()");

        let ack = self.send_command(CommandId::Echo, &ECHO_PATTERN)?;
        Ok(ack.is_some_and(|ack| echo_matches(ack.payload())))
    }

    /// Sends an uplink frame
    ///
    /// # Panics
    /// Panics when `data` is empty or longer than 12 bytes.
    pub fn send_payload(&mut self, data: &[u8]) -> Result<(), Error> {
        assert!(!data.is_empty(), "empty uplink payload");

        #[cfg(feature = "defmt")]
        defmt::trace!("send_payload({=[u8]:02x})", data);

        self.send_command(CommandId::SendPayload, data).map(|_| ())
    }

    /// Sends a single bit uplink frame
    pub fn send_bit(&mut self) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("send_bit()");

        self.execute_command(SendBit).map(|_| ())
    }

    /// Sends an out of band frame
    pub fn send_out_of_band(&mut self) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("send_out_of_band()");

        self.execute_command(SendOutOfBand).map(|_| ())
    }

    /// Sends a bidirectional frame and returns the downlink data
    ///
    /// Can block for up to a minute while the chip listens for the downlink.
    pub fn receive_message(&mut self) -> Result<DownlinkFrame, Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("receive_message()");

        let ack = self.send_command(CommandId::ReceiveFrame, &[])?;
        downlink(ack)
    }

    /// Reads device id, PAC, library version and device version
    pub fn get_device_info(&mut self) -> Result<DeviceInfo, Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("get_device_info()");

        let info = self.execute_command(GetInfo)?;
        let version = self.get_device_version()?;

        Ok(DeviceInfo::new(info, version))
    }

    /// Reads the device version
    pub fn get_device_version(&mut self) -> Result<DeviceVersion, Error> {
        self.execute_command(GetDeviceVersion)
    }

    /// Sets the uplink frequency
    ///
    /// The registers are encoded with the layout of the configured chip model.
    ///
    /// # Panics
    /// Panics when `hz` is outside `775_000_000..=1_100_000_000`.
    pub fn set_ul_frequency(&mut self, hz: u32) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("set_ul_frequency({=u32})", hz);

        let freqcon = self.config.model.store(FrequencyRegisters::from_hz(hz));
        self.execute_command(SetUlFrequency { freqcon }).map(|_| ())
    }

    /// Reads the uplink frequency in Hz
    pub fn get_ul_frequency(&mut self) -> Result<u32, Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("get_ul_frequency()");

        let freqcon = self.execute_command(GetUlFrequency)?;
        Ok(self.config.model.restore(freqcon).to_hz())
    }

    /// Starts a continuous wave at the uplink frequency
    pub fn continuous_wave(&mut self) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("continuous_wave()");

        self.execute_command(ContinuousWave).map(|_| ())
    }

    /// Checks the provisioned ID/key pair
    pub fn check_id_key(&mut self) -> Result<bool, Error> {
        self.execute_command(CheckIdKey).map(|status| status.valid)
    }

    /// Sets the watchdog period
    pub fn set_watchdog(&mut self, time: WatchdogTime) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("set_watchdog({})", time);

        self.execute_command(SetWatchdogTimer { time }).map(|_| ())
    }

    /// Reads the watchdog period
    pub fn get_watchdog(&mut self) -> Result<WatchdogTime, Error> {
        self.execute_command(GetWatchdogTimer)
    }

    /// Makes the chip reset through its watchdog
    pub fn trigger_watchdog(&mut self) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("trigger_watchdog()");

        self.execute_command(TriggerWatchdog).map(|_| ())
    }

    /// Sends a keep alive frame
    pub fn keep_alive(&mut self) -> Result<(), Error> {
        self.execute_command(KeepAlive).map(|_| ())
    }

    /// Runs a SIGFOX test mode
    pub fn send_test_mode(&mut self, mode: TestMode) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("send_test_mode({})", mode);

        self.execute_command(SendTestMode { mode }).map(|_| ())
    }

    /// Switches the chip to a network standard
    pub fn change_network_standard(&mut self, standard: NetworkStandard) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("change_network_standard({})", standard);

        self.send_command(standard.command_id(), &[]).map(|_| ())
    }
}

impl<SPI, CS, BUSY, D> Device<SPI, CS, BUSY, D>
where
    SPI: embedded_hal_async::spi::SpiBus,
    CS: OutputPin,
    BUSY: InputPin,
    D: embedded_hal_async::delay::DelayNs,
{
    /// Asynchronously runs the power-up initialization sequence
    ///
    /// This is the async version of [`init`](Device::init).
    pub async fn init_async(&mut self) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        defmt::trace!("init_async({})", self.config);

        self.reset_status();

        self.bus
            .wait_busy_async(PinState::High, TimeoutClass::Init.as_micros())
            .await?;
        self.wake_up_async().await?;

        if !self.test_spi_connection_async().await? {
            return Err(Error::SpiTestFail);
        }

        self.change_network_standard_async(self.config.network_standard)
            .await?;
        self.set_watchdog_async(self.config.watchdog).await
    }

    /// Asynchronously wakes the chip and waits for it to settle
    pub async fn wake_up_async(&mut self) -> Result<(), Error> {
        let result = self.execute_command_async(WakeUp).await.map(|_| ());
        self.bus.delay_ms_async(timing::WAKEUP_DELAY_MS).await;
        result
    }

    /// Asynchronously puts the chip into power-down
    pub async fn sleep_async(&mut self) -> Result<(), Error> {
        self.execute_command_async(Sleep).await.map(|_| ())
    }

    /// Asynchronous echo self-test
    pub async fn test_spi_connection_async(&mut self) -> Result<bool, Error> {
        let ack = self
            .send_command_async(CommandId::Echo, &ECHO_PATTERN)
            .await?;
        Ok(ack.is_some_and(|ack| echo_matches(ack.payload())))
    }

    /// Asynchronously sends an uplink frame
    ///
    /// This is the async version of [`send_payload`](Device::send_payload).
    pub async fn send_payload_async(&mut self, data: &[u8]) -> Result<(), Error> {
        assert!(!data.is_empty(), "empty uplink payload");

        self.send_command_async(CommandId::SendPayload, data)
            .await
            .map(|_| ())
    }

    /// Asynchronously sends a single bit uplink frame
    pub async fn send_bit_async(&mut self) -> Result<(), Error> {
        self.execute_command_async(SendBit).await.map(|_| ())
    }

    /// Asynchronously sends an out of band frame
    pub async fn send_out_of_band_async(&mut self) -> Result<(), Error> {
        self.execute_command_async(SendOutOfBand).await.map(|_| ())
    }

    /// Asynchronously sends a bidirectional frame and returns the downlink data
    pub async fn receive_message_async(&mut self) -> Result<DownlinkFrame, Error> {
        let ack = self
            .send_command_async(CommandId::ReceiveFrame, &[])
            .await?;
        downlink(ack)
    }

    /// Asynchronously reads device id, PAC, library version and device version
    pub async fn get_device_info_async(&mut self) -> Result<DeviceInfo, Error> {
        let info = self.execute_command_async(GetInfo).await?;
        let version = self.get_device_version_async().await?;

        Ok(DeviceInfo::new(info, version))
    }

    /// Asynchronously reads the device version
    pub async fn get_device_version_async(&mut self) -> Result<DeviceVersion, Error> {
        self.execute_command_async(GetDeviceVersion).await
    }

    /// Asynchronously sets the uplink frequency
    ///
    /// This is the async version of [`set_ul_frequency`](Device::set_ul_frequency).
    pub async fn set_ul_frequency_async(&mut self, hz: u32) -> Result<(), Error> {
        let freqcon = self.config.model.store(FrequencyRegisters::from_hz(hz));
        self.execute_command_async(SetUlFrequency { freqcon })
            .await
            .map(|_| ())
    }

    /// Asynchronously reads the uplink frequency in Hz
    pub async fn get_ul_frequency_async(&mut self) -> Result<u32, Error> {
        let freqcon = self.execute_command_async(GetUlFrequency).await?;
        Ok(self.config.model.restore(freqcon).to_hz())
    }

    /// Asynchronously starts a continuous wave
    pub async fn continuous_wave_async(&mut self) -> Result<(), Error> {
        self.execute_command_async(ContinuousWave).await.map(|_| ())
    }

    /// Asynchronously checks the provisioned ID/key pair
    pub async fn check_id_key_async(&mut self) -> Result<bool, Error> {
        self.execute_command_async(CheckIdKey)
            .await
            .map(|status| status.valid)
    }

    /// Asynchronously sets the watchdog period
    pub async fn set_watchdog_async(&mut self, time: WatchdogTime) -> Result<(), Error> {
        self.execute_command_async(SetWatchdogTimer { time })
            .await
            .map(|_| ())
    }

    /// Asynchronously reads the watchdog period
    pub async fn get_watchdog_async(&mut self) -> Result<WatchdogTime, Error> {
        self.execute_command_async(GetWatchdogTimer).await
    }

    /// Asynchronously makes the chip reset through its watchdog
    pub async fn trigger_watchdog_async(&mut self) -> Result<(), Error> {
        self.execute_command_async(TriggerWatchdog).await.map(|_| ())
    }

    /// Asynchronously sends a keep alive frame
    pub async fn keep_alive_async(&mut self) -> Result<(), Error> {
        self.execute_command_async(KeepAlive).await.map(|_| ())
    }

    /// Asynchronously runs a SIGFOX test mode
    pub async fn send_test_mode_async(&mut self, mode: TestMode) -> Result<(), Error> {
        self.execute_command_async(SendTestMode { mode })
            .await
            .map(|_| ())
    }

    /// Asynchronously switches the chip to a network standard
    pub async fn change_network_standard_async(
        &mut self,
        standard: NetworkStandard,
    ) -> Result<(), Error> {
        self.send_command_async(standard.command_id(), &[])
            .await
            .map(|_| ())
    }
}
