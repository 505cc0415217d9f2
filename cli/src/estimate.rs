//! Fixed-formula emissions estimate used when no power tracker can run.

use carbon_protocol::EmissionsReport;

/// Assumed average draw while tracking, in kW (50 W).
pub const FALLBACK_POWER_KW: f64 = 0.05;

/// World average grid intensity in kg CO2eq per kWh.
pub const WORLD_CARBON_INTENSITY: f64 = 0.475;

const SECS_PER_HOUR: f64 = 3600.0;

/// Why a result had to be estimated.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    /// No power counters on this system.
    Unavailable,
    /// The tracker started but failed.
    Failed(String),
}

impl FallbackReason {
    pub fn note(&self) -> &'static str {
        match self {
            FallbackReason::Unavailable => "Estimated (power tracker unavailable)",
            FallbackReason::Failed(_) => "Estimated (power tracker error)",
        }
    }
}

pub fn estimated_energy_kwh(duration_secs: f64) -> f64 {
    (duration_secs / SECS_PER_HOUR) * FALLBACK_POWER_KW
}

pub fn estimate(duration_secs: f64, reason: FallbackReason) -> EmissionsReport {
    let energy_kwh = estimated_energy_kwh(duration_secs);
    let note = reason.note().to_string();
    let error = match reason {
        FallbackReason::Unavailable => None,
        FallbackReason::Failed(message) => Some(message),
    };

    EmissionsReport {
        emissions_kg: energy_kwh * WORLD_CARBON_INTENSITY,
        energy_consumed_kwh: energy_kwh,
        duration_seconds: duration_secs,
        error,
        note: Some(note),
        ..Default::default()
    }
}
