//! Power monitoring traits and types.

use color_eyre::eyre::Result;

/// Power information snapshot.
///
/// All power values are in watts and describe the interval between the two
/// most recent refreshes.
#[derive(Debug, Clone, Default)]
pub struct PowerInfo {
    /// CPU package power consumption in watts.
    pub cpu_power_watts: f32,

    /// GPU power consumption in watts.
    pub gpu_power_watts: f32,

    /// Estimated memory power consumption in watts.
    pub ram_power_watts: f32,

    /// Total power consumption in watts (sum of components).
    pub system_power_watts: f32,

    /// Whether at least one full interval has been measured.
    /// The reading taken at construction has no previous counter value.
    pub is_warmed_up: bool,
}

/// Trait for platform-specific power providers.
pub trait PowerProvider {
    /// Create a new power provider instance.
    fn new() -> Result<Self>
    where
        Self: Sized;

    /// Refresh power information from the system.
    fn refresh(&mut self) -> Result<()>;

    /// Get the current power information.
    fn info(&self) -> &PowerInfo;

    /// Check if power monitoring is supported on this system.
    ///
    /// Returns false if the required hardware/permissions are not available.
    fn is_supported() -> bool
    where
        Self: Sized,
    {
        true
    }
}
