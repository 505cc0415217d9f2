//! Fallback provider for platforms without power counters.

use color_eyre::eyre::{bail, Result};

use crate::power::{PowerInfo, PowerProvider};

pub struct UnsupportedPower {
    info: PowerInfo,
}

impl PowerProvider for UnsupportedPower {
    fn new() -> Result<Self> {
        bail!(
            "power monitoring is not supported on {}",
            std::env::consts::OS
        )
    }

    fn refresh(&mut self) -> Result<()> {
        Ok(())
    }

    fn info(&self) -> &PowerInfo {
        &self.info
    }

    fn is_supported() -> bool {
        false
    }
}
