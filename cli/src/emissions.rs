use std::time::Duration;

use carbon_platform::PowerProvider;
use carbon_protocol::EmissionsReport;
use tracing::{debug, info, warn};

use crate::config::UserConfig;
use crate::estimate::{estimate, FallbackReason};
use crate::tracker::{csv_log, EmissionsTracker, PlatformPower, TrackerConfig, TrackerError};

/// Measures emissions over `duration_secs` with the platform power tracker,
/// falling back to a fixed-formula estimate when it can't run.
///
/// Never fails: tracker errors end up in the report's `error`/`note` fields.
pub fn track_emissions(duration_secs: f64, config: &UserConfig) -> EmissionsReport {
    track_emissions_with::<PlatformPower>(duration_secs, config)
}

pub fn track_emissions_with<P: PowerProvider>(
    duration_secs: f64,
    config: &UserConfig,
) -> EmissionsReport {
    match measure::<P>(duration_secs, config) {
        Ok(report) => report,
        Err(TrackerError::Unavailable) => {
            info!("Power tracker unavailable, estimating emissions");
            estimate(duration_secs, FallbackReason::Unavailable)
        }
        Err(e) => {
            warn!(error = %e, "Power tracker failed, estimating emissions");
            estimate(duration_secs, FallbackReason::Failed(e.to_string()))
        }
    }
}

fn measure<P: PowerProvider>(
    duration_secs: f64,
    config: &UserConfig,
) -> Result<EmissionsReport, TrackerError> {
    let duration = Duration::try_from_secs_f64(duration_secs)?;

    let output_dir = tempfile::Builder::new()
        .prefix("carbon-track-")
        .tempdir()?;

    let tracker_config = TrackerConfig::new(&config.project_name, output_dir.path())
        .with_interval(config.measure_power_interval())
        .with_carbon_intensity(config.carbon_intensity);

    let mut tracker = EmissionsTracker::<P>::start(tracker_config)?;
    let log_path = tracker.config().log_path();
    tracker.run_for(duration)?;
    debug!(samples = tracker.sample_count(), "Tracking window elapsed");
    let data = tracker.stop()?;

    let mut report = EmissionsReport {
        emissions_kg: data.emissions_kg,
        energy_consumed_kwh: 0.0,
        duration_seconds: duration_secs,
        ..Default::default()
    };

    match csv_log::read_last(&log_path) {
        Ok(Some(row)) => row.apply_to(&mut report),
        Ok(None) => debug!(path = %log_path.display(), "Emissions log is empty"),
        Err(e) => debug!(error = %e, "Failed to read emissions log"),
    }

    if let Err(e) = output_dir.close() {
        debug!(error = %e, "Failed to remove tracker output directory");
    }

    Ok(report)
}
