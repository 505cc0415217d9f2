//! The `emissions.csv` log a tracker appends to when a session stops.

use std::fs::OpenOptions;
use std::path::Path;

use carbon_protocol::EmissionsReport;
use serde::{Deserialize, Serialize};

use super::EmissionsData;

pub const EMISSIONS_FILE: &str = "emissions.csv";

const SECS_PER_HOUR: f64 = 3600.0;

/// One CSV row. Numeric columns are optional so rows written by other
/// versions (or trimmed by hand) still load; unknown columns are ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionsRow {
    pub timestamp: String,
    pub project_name: String,
    pub experiment_id: String,
    /// Seconds.
    pub duration: Option<f64>,
    /// kg CO2eq.
    pub emissions: Option<f64>,
    /// kg CO2eq per second.
    pub emissions_rate: Option<f64>,
    pub cpu_power: Option<f64>,
    pub gpu_power: Option<f64>,
    pub ram_power: Option<f64>,
    pub cpu_energy: Option<f64>,
    pub gpu_energy: Option<f64>,
    pub ram_energy: Option<f64>,
    /// kWh.
    pub energy_consumed: Option<f64>,
    /// kg CO2eq per kWh.
    pub carbon_intensity: Option<f64>,
}

impl From<&EmissionsData> for EmissionsRow {
    fn from(data: &EmissionsData) -> Self {
        Self {
            timestamp: data.timestamp.to_rfc3339(),
            project_name: data.project_name.clone(),
            experiment_id: data.experiment_id.clone(),
            duration: Some(data.duration_secs),
            emissions: Some(data.emissions_kg),
            emissions_rate: Some(data.emissions_rate_kg_per_sec),
            cpu_power: Some(data.cpu_power_watts),
            gpu_power: Some(data.gpu_power_watts),
            ram_power: Some(data.ram_power_watts),
            cpu_energy: Some(data.cpu_energy_kwh),
            gpu_energy: Some(data.gpu_energy_kwh),
            ram_energy: Some(data.ram_energy_kwh),
            energy_consumed: Some(data.energy_consumed_kwh),
            carbon_intensity: Some(data.carbon_intensity),
        }
    }
}

impl EmissionsRow {
    /// Overwrites the report with this row's detailed metrics.
    ///
    /// Emissions and duration keep the report's values when the column is
    /// empty; every other metric defaults to zero.
    pub fn apply_to(&self, report: &mut EmissionsReport) {
        report.emissions_kg = self.emissions.unwrap_or(report.emissions_kg);
        report.energy_consumed_kwh = self.energy_consumed.unwrap_or(0.0);
        report.duration_seconds = self.duration.unwrap_or(report.duration_seconds);
        report.emissions_rate_kg_per_hour =
            Some(self.emissions_rate.unwrap_or(0.0) * SECS_PER_HOUR);
        report.cpu_power_watts = Some(self.cpu_power.unwrap_or(0.0));
        report.gpu_power_watts = Some(self.gpu_power.unwrap_or(0.0));
        report.ram_power_watts = Some(self.ram_power.unwrap_or(0.0));
        report.carbon_intensity = Some(self.carbon_intensity.unwrap_or(0.0));
    }
}

/// Appends a row, writing the header first when the file is new.
pub fn append(path: &Path, row: &EmissionsRow) -> Result<(), csv::Error> {
    let write_header = !path.exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(write_header)
        .from_writer(file);
    writer.serialize(row)?;
    writer.flush()?;
    Ok(())
}

/// Reads the most recent row, or `None` when the file is missing or empty.
pub fn read_last(path: &Path) -> Result<Option<EmissionsRow>, csv::Error> {
    if !path.exists() {
        return Ok(None);
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut last = None;
    for row in reader.deserialize() {
        last = Some(row?);
    }
    Ok(last)
}
