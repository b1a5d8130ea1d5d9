//! Driver configuration
//!
//! [`Config`] selects the chip model (which decides the frequency register
//! layout) and the values applied by [`Device::init`](crate::Device::init).
//! Protocol timing lives in [`timing`].

use crate::commands::{NetworkStandard, WatchdogTime};
use crate::registers::ChipModel;

/// Protocol timing constants
pub mod timing {
    /// Acknowledgement wait for commands that stay local to the chip
    pub const ACK_NO_TRANSMISSION_US: u32 = 2_000_000;
    /// Acknowledgement wait for commands that transmit over the air
    pub const ACK_TRANSMISSION_US: u32 = 15_000_000;
    /// Acknowledgement wait for the receive frame command
    pub const ACK_TRANSMISSION_RECEIVE_US: u32 = 60_000_000;
    /// Readiness wait after power-up
    pub const ACK_INIT_US: u32 = 5_000_000;
    /// Largest timeout budget accepted by the transport
    pub const ACK_TIMEOUT_MAX_US: u32 = 100_000_000;
    /// Busy line polling granularity
    pub const POLL_STEP_US: u32 = 100;
    /// Settling delay after a wake-up command
    pub const WAKEUP_DELAY_MS: u32 = 100;
}

/// Driver configuration
///
/// # Defaults
/// - OL2385 register layout
/// - FCC USA network standard (RCZ2)
/// - Watchdog period 65.536 s (code 0x0C)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Chip model, decides the FREQCON register layout
    pub model: ChipModel,
    /// Network standard applied during init
    pub network_standard: NetworkStandard,
    /// Watchdog period applied during init
    pub watchdog: WatchdogTime,
}

impl Config {
    /// Sets the chip model
    pub fn with_model(mut self, model: ChipModel) -> Self {
        self.model = model;
        self
    }

    /// Sets the network standard applied during init
    pub fn with_network_standard(mut self, standard: NetworkStandard) -> Self {
        self.network_standard = standard;
        self
    }

    /// Sets the watchdog period applied during init
    pub fn with_watchdog(mut self, watchdog: WatchdogTime) -> Self {
        self.watchdog = watchdog;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ChipModel::Ol2385,
            network_standard: NetworkStandard::FccUsa,
            watchdog: WatchdogTime::S65_536,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.model, ChipModel::Ol2385);
        assert_eq!(config.network_standard, NetworkStandard::FccUsa);
        assert_eq!(u8::from(config.watchdog), 0x0C);
    }

    #[test]
    fn builder() {
        let config = Config::default()
            .with_model(ChipModel::Ol2361)
            .with_network_standard(NetworkStandard::Etsi)
            .with_watchdog(WatchdogTime::S1_024);

        assert_eq!(config.model, ChipModel::Ol2361);
        assert_eq!(config.network_standard, NetworkStandard::Etsi);
        assert_eq!(u8::from(config.watchdog), 0x06);
    }
}
