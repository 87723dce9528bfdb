//! Startup capability detection.

use serde::{Deserialize, Serialize};
use trimode_core::Mode;

use crate::Host;

/// What the host environment supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// The accelerated graphics API exists.
    pub accelerated: bool,
}

impl Capabilities {
    /// Whether constructing `mode` may be attempted at all.
    ///
    /// Rasterized and software support is only known once a context is
    /// requested, so they are always worth attempting.
    #[must_use]
    pub fn allows(&self, mode: Mode) -> bool {
        match mode {
            Mode::Accelerated => self.accelerated,
            Mode::Rasterized | Mode::Software => true,
        }
    }

    /// The mode to start in, given the preferred one.
    #[must_use]
    pub fn starting_mode(&self, preferred: Mode) -> Mode {
        if self.allows(preferred) {
            preferred
        } else {
            Mode::Rasterized
        }
    }
}

/// Probes a host once at engine startup.
#[derive(Debug, Default, Clone, Copy)]
pub struct CapabilityProber;

impl CapabilityProber {
    /// Query `host` for the accelerated API.
    pub fn probe<H: Host + ?Sized>(host: &H) -> Capabilities {
        let accelerated = host.accelerated_api_present();
        if accelerated {
            tracing::info!("Accelerated graphics API present");
        } else {
            tracing::warn!("Accelerated graphics API not present, using fallback");
        }
        Capabilities { accelerated }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessConfig, HeadlessHost};

    #[test]
    fn test_probe_reads_host() {
        let host = HeadlessHost::new(HeadlessConfig {
            accelerated_present: true,
            ..HeadlessConfig::default()
        });
        assert!(CapabilityProber::probe(&host).accelerated);

        let host = HeadlessHost::new(HeadlessConfig::default());
        assert!(!CapabilityProber::probe(&host).accelerated);
    }

    #[test]
    fn test_absent_accelerated_starts_rasterized() {
        let caps = Capabilities { accelerated: false };
        assert_eq!(caps.starting_mode(Mode::Accelerated), Mode::Rasterized);
        assert_eq!(caps.starting_mode(Mode::Software), Mode::Software);

        let caps = Capabilities { accelerated: true };
        assert_eq!(caps.starting_mode(Mode::Accelerated), Mode::Accelerated);
    }
}
