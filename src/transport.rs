//! Handshake transport
//!
//! The chip gates every SPI transfer with two GPIO lines:
//! - Chip-select (driven by the host, active low) brackets one frame
//! - Busy/ACK (driven by the chip) signals readiness and progress
//!
//! # Send Sequence
//! 1. Wait for busy high (chip idle)
//! 2. Assert chip-select
//! 3. Wait for busy low (chip accepted the select)
//! 4. Transfer the frame, ignoring the bytes shifted in
//! 5. Wait for busy high (frame consumed)
//! 6. De-assert chip-select
//!
//! # Receive Sequence
//! 1. Wait for busy low (acknowledgement ready), bounded by the command's timeout
//! 2. Assert chip-select
//! 3. Clock one `0xFF` byte to learn the declared frame length
//! 4. Clock the remaining `length - 1` bytes
//! 5. Wait for busy high (frame sent)
//! 6. De-assert chip-select
//!
//! # Important Notes
//! - Every wait is a bounded busy-poll with a 100 µs step
//! - Chip-select is de-asserted exactly once per transaction on every exit path
//! - One transaction at a time, enforced by `&mut self`

use embedded_hal::digital::{InputPin, OutputPin, PinState};

use crate::commands::TimeoutClass;
use crate::config::timing;
use crate::frame::{ACK_FRAME_MAX, INFO_FRAME_MAX};
use crate::Error;

/// Dummy bytes clocked out while reading an acknowledgement
const DUMMY: [u8; ACK_FRAME_MAX] = [0xFF; ACK_FRAME_MAX];

/// GPIO gated SPI transport to the chip
///
/// Owns the SPI bus, the chip-select output, the busy input and a delay
/// provider used for polling.
pub struct Handshake<SPI, CS, BUSY, D> {
    spi: SPI,
    cs: CS,
    busy: BUSY,
    delay: D,
}

impl<SPI, CS, BUSY, D> Handshake<SPI, CS, BUSY, D> {
    /// Creates a transport from its peripherals
    pub fn new(spi: SPI, cs: CS, busy: BUSY, delay: D) -> Self {
        Self {
            spi,
            cs,
            busy,
            delay,
        }
    }

    /// Releases the peripherals
    pub fn release(self) -> (SPI, CS, BUSY, D) {
        (self.spi, self.cs, self.busy, self.delay)
    }
}

impl<SPI, CS, BUSY, D> Handshake<SPI, CS, BUSY, D>
where
    CS: OutputPin,
    BUSY: InputPin,
{
    /// Non-blocking check of the busy line, low means an acknowledgement is ready
    ///
    /// # Errors
    /// * `Error::Pin` - Reading the busy line failed
    pub fn is_ack_ready(&mut self) -> Result<bool, Error> {
        self.busy.is_low().map_err(|_| Error::Pin)
    }

    fn busy_is(&mut self, level: PinState) -> Result<bool, Error> {
        match level {
            PinState::High => self.busy.is_high(),
            PinState::Low => self.busy.is_low(),
        }
        .map_err(|_| Error::Pin)
    }

    fn select(&mut self) -> Result<(), Error> {
        self.cs.set_low().map_err(|_| Error::Pin)
    }

    fn deselect(&mut self) -> Result<(), Error> {
        self.cs.set_high().map_err(|_| Error::Pin)
    }
}

impl<SPI, CS, BUSY, D> Handshake<SPI, CS, BUSY, D>
where
    SPI: embedded_hal::spi::SpiBus,
    CS: OutputPin,
    BUSY: InputPin,
    D: embedded_hal::delay::DelayNs,
{
    /// Sends one information frame
    ///
    /// # Errors
    /// * `Error::Timeout` - The busy line missed one of its levels
    /// * `Error::Bus` - SPI transfer failed
    /// * `Error::Pin` - GPIO access failed
    ///
    /// # Panics
    /// Panics when `frame` is longer than the largest information frame.
    pub fn send_frame(&mut self, frame: &[u8]) -> Result<(), Error> {
        assert!(frame.len() <= INFO_FRAME_MAX, "information frame too long");

        #[cfg(feature = "defmt")]
        defmt::trace!("send_frame({=[u8]:02x})", frame);

        let result = self.send_selected(frame);
        let released = self.deselect();
        result.and(released)
    }

    /// Receives one acknowledgement frame into `buffer`
    ///
    /// `buffer.len()` is the receive capacity. Returns the declared frame length.
    ///
    /// # Errors
    /// * `Error::Timeout` - No acknowledgement within `timeout_us`, or the chip
    ///   did not finish sending within the no-transmission budget
    /// * `Error::AckLength` - The declared length is zero or exceeds the capacity
    /// * `Error::Bus` - SPI transfer failed
    /// * `Error::Pin` - GPIO access failed
    ///
    /// # Panics
    /// Panics when `buffer` is empty or larger than the largest acknowledgement.
    pub fn receive_frame(&mut self, buffer: &mut [u8], timeout_us: u32) -> Result<usize, Error> {
        assert!(
            !buffer.is_empty() && buffer.len() <= ACK_FRAME_MAX,
            "invalid receive buffer"
        );
        debug_assert!(timeout_us <= timing::ACK_TIMEOUT_MAX_US);

        let result = self.receive_selected(buffer, timeout_us);
        let released = self.deselect();

        #[cfg(feature = "defmt")]
        {
            if let Ok(len) = result {
                defmt::trace!("receive_frame() -> {=[u8]:02x}", &buffer[..len]);
            }
        }

        let len = result?;
        released.map(|_| len)
    }

    /// Blocks for `ms` milliseconds
    pub fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    /// Polls the busy line until it reaches `level` or `timeout_us` elapses
    ///
    /// # Errors
    /// * `Error::Timeout` - The level was not reached in time
    /// * `Error::Pin` - Reading the busy line failed
    pub fn wait_busy(&mut self, level: PinState, timeout_us: u32) -> Result<(), Error> {
        let mut waited_us = 0;

        loop {
            if self.busy_is(level)? {
                return Ok(());
            }

            if waited_us >= timeout_us {
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "busy line stuck {} after {=u32} us",
                    level == PinState::Low,
                    waited_us
                );
                return Err(Error::Timeout);
            }

            self.delay.delay_us(timing::POLL_STEP_US);
            waited_us += timing::POLL_STEP_US;
        }
    }

    fn send_selected(&mut self, frame: &[u8]) -> Result<(), Error> {
        let timeout_us = TimeoutClass::NoTransmission.as_micros();
        let mut ignored = [0u8; INFO_FRAME_MAX];

        self.wait_busy(PinState::High, timeout_us)?;
        self.select()?;
        self.wait_busy(PinState::Low, timeout_us)?;

        self.spi
            .transfer(&mut ignored[..frame.len()], frame)
            .map_err(|_| Error::Bus)?;
        self.spi.flush().map_err(|_| Error::Bus)?;

        self.wait_busy(PinState::High, timeout_us)
    }

    fn receive_selected(&mut self, buffer: &mut [u8], timeout_us: u32) -> Result<usize, Error> {
        self.wait_busy(PinState::Low, timeout_us)?;
        self.select()?;

        self.spi
            .transfer(&mut buffer[..1], &DUMMY[..1])
            .map_err(|_| Error::Bus)?;

        let declared = usize::from(buffer[0]);
        if declared == 0 || declared > buffer.len() {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "acknowledgement length {=usize} exceeds capacity {=usize}",
                declared,
                buffer.len()
            );
            return Err(Error::AckLength);
        }

        if declared > 1 {
            self.spi
                .transfer(&mut buffer[1..declared], &DUMMY[1..declared])
                .map_err(|_| Error::Bus)?;
        }
        self.spi.flush().map_err(|_| Error::Bus)?;

        self.wait_busy(PinState::High, TimeoutClass::NoTransmission.as_micros())?;
        Ok(declared)
    }
}

impl<SPI, CS, BUSY, D> Handshake<SPI, CS, BUSY, D>
where
    SPI: embedded_hal_async::spi::SpiBus,
    CS: OutputPin,
    BUSY: InputPin,
    D: embedded_hal_async::delay::DelayNs,
{
    /// Asynchronously sends one information frame
    ///
    /// This is the async version of [`send_frame`](Handshake::send_frame).
    pub async fn send_frame_async(&mut self, frame: &[u8]) -> Result<(), Error> {
        assert!(frame.len() <= INFO_FRAME_MAX, "information frame too long");

        #[cfg(feature = "defmt")]
        defmt::trace!("send_frame_async({=[u8]:02x})", frame);

        let result = self.send_selected_async(frame).await;
        let released = self.deselect();
        result.and(released)
    }

    /// Asynchronously receives one acknowledgement frame into `buffer`
    ///
    /// This is the async version of [`receive_frame`](Handshake::receive_frame).
    pub async fn receive_frame_async(
        &mut self,
        buffer: &mut [u8],
        timeout_us: u32,
    ) -> Result<usize, Error> {
        assert!(
            !buffer.is_empty() && buffer.len() <= ACK_FRAME_MAX,
            "invalid receive buffer"
        );
        debug_assert!(timeout_us <= timing::ACK_TIMEOUT_MAX_US);

        let result = self.receive_selected_async(buffer, timeout_us).await;
        let released = self.deselect();

        let len = result?;
        released.map(|_| len)
    }

    /// Asynchronously waits `ms` milliseconds
    pub async fn delay_ms_async(&mut self, ms: u32) {
        self.delay.delay_ms(ms).await;
    }

    /// Asynchronously polls the busy line until it reaches `level`
    ///
    /// This is the async version of [`wait_busy`](Handshake::wait_busy).
    pub async fn wait_busy_async(&mut self, level: PinState, timeout_us: u32) -> Result<(), Error> {
        let mut waited_us = 0;

        loop {
            if self.busy_is(level)? {
                return Ok(());
            }

            if waited_us >= timeout_us {
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "busy line stuck {} after {=u32} us",
                    level == PinState::Low,
                    waited_us
                );
                return Err(Error::Timeout);
            }

            self.delay.delay_us(timing::POLL_STEP_US).await;
            waited_us += timing::POLL_STEP_US;
        }
    }

    async fn send_selected_async(&mut self, frame: &[u8]) -> Result<(), Error> {
        let timeout_us = TimeoutClass::NoTransmission.as_micros();
        let mut ignored = [0u8; INFO_FRAME_MAX];

        self.wait_busy_async(PinState::High, timeout_us).await?;
        self.select()?;
        self.wait_busy_async(PinState::Low, timeout_us).await?;

        self.spi
            .transfer(&mut ignored[..frame.len()], frame)
            .await
            .map_err(|_| Error::Bus)?;
        self.spi.flush().await.map_err(|_| Error::Bus)?;

        self.wait_busy_async(PinState::High, timeout_us).await
    }

    async fn receive_selected_async(
        &mut self,
        buffer: &mut [u8],
        timeout_us: u32,
    ) -> Result<usize, Error> {
        self.wait_busy_async(PinState::Low, timeout_us).await?;
        self.select()?;

        self.spi
            .transfer(&mut buffer[..1], &DUMMY[..1])
            .await
            .map_err(|_| Error::Bus)?;

        let declared = usize::from(buffer[0]);
        if declared == 0 || declared > buffer.len() {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "acknowledgement length {=usize} exceeds capacity {=usize}",
                declared,
                buffer.len()
            );
            return Err(Error::AckLength);
        }

        if declared > 1 {
            self.spi
                .transfer(&mut buffer[1..declared], &DUMMY[1..declared])
                .await
                .map_err(|_| Error::Bus)?;
        }
        self.spi.flush().await.map_err(|_| Error::Bus)?;

        self.wait_busy_async(PinState::High, TimeoutClass::NoTransmission.as_micros())
            .await?;
        Ok(declared)
    }
}
