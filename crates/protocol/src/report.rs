use serde::{Deserialize, Serialize};

/// Emissions metrics for one tracked window, written to stdout.
///
/// The first three fields are always present. The rest are only serialized
/// when known: component power comes from a measured run, `error` and
/// `note` only appear on estimated results.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmissionsReport {
    /// Emissions in kg CO2eq.
    pub emissions_kg: f64,

    /// Energy consumed in kWh.
    pub energy_consumed_kwh: f64,

    /// Length of the tracked window in seconds.
    pub duration_seconds: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emissions_rate_kg_per_hour: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_power_watts: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_power_watts: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram_power_watts: Option<f64>,

    /// Grid carbon intensity in kg CO2eq per kWh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbon_intensity: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl EmissionsReport {
    /// Returns true when the values come from an estimate rather than a measurement.
    pub fn is_estimated(&self) -> bool {
        self.note.is_some()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
