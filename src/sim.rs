//! Behavioral model of the chip side of the handshake, for tests
//!
//! The model keeps a virtual clock that only advances through the delay
//! handle, so timeouts of a minute run instantly. The busy line level is
//! derived from the exchange phase each time it is read.

use core::convert::Infallible;
use std::cell::RefCell;
use std::rc::Rc;
use std::vec;
use std::vec::Vec;

use embedded_hal::digital::{ErrorType as PinErrorType, InputPin, OutputPin};
use embedded_hal::spi::ErrorType as SpiErrorType;

use crate::commands::CommandId;
use crate::config::Config;
use crate::Device;

const DEFAULT_ACK_LATENCY_US: u64 = 1_000;

const DEVICE_ID: [u8; 4] = [0x37, 0x13, 0x42, 0x00];
const PAC: &[u8; 8] = b"PAC12345";
const LIBRARY_VERSION: &[u8; 11] = b"UDL2.1.0   ";
const DEVICE_VERSION: &[u8; 15] = b"OL2385-FW-1.2.3";
const DOWNLINK: [u8; 8] = [0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x11, 0x22, 0x33];

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Idle,
    Receiving(Vec<u8>),
    Received(Vec<u8>),
    AckPending { reply: Vec<u8>, ready_at_ns: u64 },
    Replying { reply: Vec<u8>, pos: usize },
}

/// Chip state and fault knobs
pub struct Chip {
    phase: Phase,
    now_ns: u64,

    /// Device state reported in acknowledgements
    pub state: u8,
    /// Error code reported in every acknowledgement
    pub error_code: u8,
    /// Error code reported for one command id only
    pub fail_command: Option<(u8, u8)>,
    /// Replaces the next acknowledgement frame verbatim
    pub next_reply: Option<Vec<u8>>,
    /// Replaces the echo payload
    pub echo_reply: Option<Vec<u8>>,
    /// Forces the busy line to a fixed level
    pub busy_override: Option<bool>,
    /// Acknowledgements never become ready
    pub never_ready: bool,
    /// Delay between frame consumption and acknowledgement readiness
    pub ack_latency_us: u64,

    pub freqcon: [u8; 4],
    pub watchdog: u8,
    pub standard: Option<u8>,
    pub registers: [u16; 256],

    /// Every information frame the chip consumed
    pub frames: Vec<Vec<u8>>,
    pub selects: usize,
    pub releases: usize,
    /// Bytes other than 0xFF clocked in while the chip was replying
    pub dummy_violations: usize,
}

impl Chip {
    fn new() -> Self {
        Self {
            phase: Phase::Idle,
            now_ns: 0,
            state: 1,
            error_code: 0,
            fail_command: None,
            next_reply: None,
            echo_reply: None,
            busy_override: None,
            never_ready: false,
            ack_latency_us: DEFAULT_ACK_LATENCY_US,
            freqcon: [0x20, 0x05, 0x81, 0xDA],
            watchdog: 0x0C,
            standard: None,
            registers: [0; 256],
            frames: Vec::new(),
            selects: 0,
            releases: 0,
            dummy_violations: 0,
        }
    }

    /// Advances the virtual clock
    pub fn advance_us(&mut self, us: u64) {
        self.now_ns += us * 1_000;
    }

    /// Virtual time spent so far
    pub fn elapsed_us(&self) -> u64 {
        self.now_ns / 1_000
    }

    fn busy_high(&self) -> bool {
        if let Some(level) = self.busy_override {
            return level;
        }

        match &self.phase {
            Phase::Idle | Phase::Received(_) => true,
            Phase::Receiving(_) => false,
            Phase::AckPending { ready_at_ns, .. } => {
                self.never_ready || self.now_ns < *ready_at_ns
            }
            Phase::Replying { reply, pos } => *pos >= reply.len(),
        }
    }

    fn select(&mut self) {
        self.selects += 1;

        self.phase = match core::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::AckPending { reply, ready_at_ns }
                if !self.never_ready && self.now_ns >= ready_at_ns =>
            {
                Phase::Replying { reply, pos: 0 }
            }
            _ => Phase::Receiving(Vec::new()),
        };
    }

    fn release(&mut self) {
        self.releases += 1;

        match core::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Received(frame) => self.process(frame),
            pending @ Phase::AckPending { .. } => self.phase = pending,
            _ => {}
        }
    }

    fn clock(&mut self, out: u8) -> u8 {
        match &mut self.phase {
            Phase::Receiving(bytes) => {
                bytes.push(out);
                if usize::from(bytes[0]) <= bytes.len() {
                    let frame = core::mem::take(bytes);
                    self.phase = Phase::Received(frame);
                }
                0x00
            }
            Phase::Replying { reply, pos } => {
                let byte = reply.get(*pos).copied().unwrap_or(0xFF);
                *pos += 1;
                if out != 0xFF {
                    self.dummy_violations += 1;
                }
                byte
            }
            _ => 0x00,
        }
    }

    fn process(&mut self, frame: Vec<u8>) {
        let command = frame.get(1).copied().unwrap_or(0);
        let request = frame.get(2..).map(<[u8]>::to_vec).unwrap_or_default();
        self.frames.push(frame);

        let error = match self.fail_command {
            Some((id, code)) if id == command => code,
            _ => self.error_code,
        };

        let payload = if error == 0 {
            self.execute(command, &request)
        } else {
            Vec::new()
        };

        let acknowledged = CommandId::try_from(command)
            .map(|id| id.descriptor().is_acknowledged())
            .unwrap_or(false);

        if acknowledged {
            let reply = self.next_reply.take().unwrap_or_else(|| {
                let mut reply = vec![(payload.len() + 3) as u8, error, self.state];
                reply.extend_from_slice(&payload);
                reply
            });

            self.phase = Phase::AckPending {
                reply,
                ready_at_ns: self.now_ns + self.ack_latency_us * 1_000,
            };
        }
    }

    fn execute(&mut self, command: u8, request: &[u8]) -> Vec<u8> {
        match command {
            0x01 => {
                self.state = 2;
                Vec::new()
            }
            0x02 => self
                .echo_reply
                .clone()
                .unwrap_or_else(|| request.iter().map(|byte| !byte).collect()),
            0x03 => {
                self.state = 1;
                Vec::new()
            }
            0x07 => DOWNLINK.to_vec(),
            0x08 => {
                let mut info = DEVICE_ID.to_vec();
                info.extend_from_slice(PAC);
                info.extend_from_slice(LIBRARY_VERSION);
                info
            }
            0x09 => {
                self.freqcon.copy_from_slice(&request[..4]);
                Vec::new()
            }
            0x0A => self.freqcon.to_vec(),
            0x0C => vec![0x01],
            0x0D => DEVICE_VERSION.to_vec(),
            0x0E => {
                self.watchdog = request[0];
                Vec::new()
            }
            0x0F => vec![self.watchdog],
            0x10 => {
                self.registers[usize::from(request[0])] =
                    u16::from_be_bytes([request[1], request[2]]);
                Vec::new()
            }
            0x11 => self.registers[usize::from(request[0])].to_be_bytes().to_vec(),
            0x15..=0x18 => {
                self.standard = Some(command - 0x15);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }
}

/// Shared handle to a simulated chip
#[derive(Clone)]
pub struct SimChip {
    chip: Rc<RefCell<Chip>>,
}

impl SimChip {
    pub fn new() -> Self {
        Self {
            chip: Rc::new(RefCell::new(Chip::new())),
        }
    }

    /// Runs `f` with the chip state
    pub fn with<R>(&self, f: impl FnOnce(&mut Chip) -> R) -> R {
        f(&mut self.chip.borrow_mut())
    }

    pub fn parts(&self) -> (SimSpi, SimCs, SimBusy, SimDelay) {
        (
            SimSpi(self.chip.clone()),
            SimCs(self.chip.clone()),
            SimBusy(self.chip.clone()),
            SimDelay(self.chip.clone()),
        )
    }

    /// Creates a device wired to this chip
    pub fn device(&self, config: Config) -> Device<SimSpi, SimCs, SimBusy, SimDelay> {
        let (spi, cs, busy, delay) = self.parts();
        Device::new(spi, cs, busy, delay, config)
    }
}

pub struct SimSpi(Rc<RefCell<Chip>>);

impl SimSpi {
    fn exchange(&mut self, read: &mut [u8], write: &[u8]) {
        let mut chip = self.0.borrow_mut();
        for index in 0..read.len().max(write.len()) {
            let byte = chip.clock(write.get(index).copied().unwrap_or(0x00));
            if let Some(slot) = read.get_mut(index) {
                *slot = byte;
            }
        }
    }
}

impl SpiErrorType for SimSpi {
    type Error = Infallible;
}

impl embedded_hal::spi::SpiBus for SimSpi {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let dummy = vec![0xFF; words.len()];
        self.exchange(words, &dummy);
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        self.exchange(&mut [], words);
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.exchange(read, write);
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let write = words.to_vec();
        self.exchange(words, &write);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl embedded_hal_async::spi::SpiBus for SimSpi {
    async fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        embedded_hal::spi::SpiBus::read(self, words)
    }

    async fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        embedded_hal::spi::SpiBus::write(self, words)
    }

    async fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        embedded_hal::spi::SpiBus::transfer(self, read, write)
    }

    async fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        embedded_hal::spi::SpiBus::transfer_in_place(self, words)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub struct SimCs(Rc<RefCell<Chip>>);

impl PinErrorType for SimCs {
    type Error = Infallible;
}

impl OutputPin for SimCs {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().select();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().release();
        Ok(())
    }
}

pub struct SimBusy(Rc<RefCell<Chip>>);

impl PinErrorType for SimBusy {
    type Error = Infallible;
}

impl InputPin for SimBusy {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.borrow().busy_high())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.borrow().busy_high())
    }
}

pub struct SimDelay(Rc<RefCell<Chip>>);

impl embedded_hal::delay::DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().now_ns += u64::from(ns);
    }
}

impl embedded_hal_async::delay::DelayNs for SimDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().now_ns += u64::from(ns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::spi::SpiBus;

    #[test]
    fn frame_completes_on_declared_length() {
        let sim = SimChip::new();
        let (mut spi, mut cs, mut busy, _) = sim.parts();

        assert_eq!(busy.is_high(), Ok(true));
        cs.set_low().unwrap();
        assert_eq!(busy.is_low(), Ok(true));

        spi.write(&[0x03, 0x0E]).unwrap();
        assert_eq!(busy.is_low(), Ok(true));
        spi.write(&[0x06]).unwrap();
        assert_eq!(busy.is_high(), Ok(true));

        cs.set_high().unwrap();
        sim.with(|chip| {
            assert_eq!(chip.watchdog, 0x06);
            assert_eq!(chip.frames, [vec![0x03, 0x0E, 0x06]]);
        });
    }

    #[test]
    fn acknowledgement_after_latency() {
        let sim = SimChip::new();
        let (mut spi, mut cs, mut busy, _) = sim.parts();

        cs.set_low().unwrap();
        spi.write(&[0x02, 0x0F]).unwrap();
        cs.set_high().unwrap();

        assert_eq!(busy.is_low(), Ok(false));
        sim.with(|chip| chip.advance_us(DEFAULT_ACK_LATENCY_US));
        assert_eq!(busy.is_low(), Ok(true));

        let mut reply = [0u8; 4];
        cs.set_low().unwrap();
        spi.read(&mut reply).unwrap();
        assert_eq!(reply, [0x04, 0x00, 0x01, 0x0C]);
        assert_eq!(busy.is_high(), Ok(true));
        cs.set_high().unwrap();

        sim.with(|chip| assert_eq!(chip.dummy_violations, 0));
    }

    #[test]
    fn unacknowledged_command_returns_idle() {
        let sim = SimChip::new();
        let (mut spi, mut cs, mut busy, _) = sim.parts();

        cs.set_low().unwrap();
        spi.write(&[0x02, 0x01]).unwrap();
        cs.set_high().unwrap();

        assert_eq!(busy.is_high(), Ok(true));
        sim.with(|chip| assert_eq!(chip.state, 2));
    }
}
