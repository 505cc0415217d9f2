//! Emissions tracker sessions.
//!
//! A session samples a [`PowerProvider`] at a fixed interval, integrates the
//! readings into per-component energy, and on stop converts the total to
//! emissions using the configured grid intensity. Each stopped session is
//! appended to an `emissions.csv` log in the output directory.
//!
//! Sampling is driven by the caller's thread: [`EmissionsTracker::run_for`]
//! sleeps in interval-sized steps and samples on every wake-up.

pub mod csv_log;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, TryFromFloatSecsError};

use carbon_platform::{PowerInfo, PowerProvider};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, trace};

use csv_log::{EmissionsRow, EMISSIONS_FILE};

#[cfg(target_os = "linux")]
pub type PlatformPower = carbon_platform::linux::LinuxPower;

#[cfg(not(target_os = "linux"))]
pub type PlatformPower = carbon_platform::unsupported::UnsupportedPower;

const JOULES_PER_KWH: f64 = 3_600_000.0;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("power tracking is not available on this system")]
    Unavailable,

    #[error("power provider failed: {0}")]
    Provider(String),

    #[error("invalid tracking duration: {0}")]
    Duration(#[from] TryFromFloatSecsError),

    #[error("tracking duration of {0:?} is too long to schedule")]
    DurationOverflow(Duration),

    #[error("emissions log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("emissions log write failed: {0}")]
    Csv(#[from] csv::Error),
}

fn provider_error(err: color_eyre::eyre::Report) -> TrackerError {
    TrackerError::Provider(format!("{:#}", err))
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub project_name: String,
    pub experiment_id: String,
    pub output_dir: PathBuf,
    pub measure_interval: Duration,
    /// kg CO2eq per kWh.
    pub carbon_intensity: f64,
}

impl TrackerConfig {
    pub fn new(project_name: impl Into<String>, output_dir: impl AsRef<Path>) -> Self {
        Self {
            project_name: project_name.into(),
            experiment_id: format!("clip_analysis_{}", Utc::now().timestamp()),
            output_dir: output_dir.as_ref().to_path_buf(),
            measure_interval: Duration::from_secs(1),
            carbon_intensity: crate::estimate::WORLD_CARBON_INTENSITY,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.measure_interval = interval;
        self
    }

    pub fn with_carbon_intensity(mut self, kg_per_kwh: f64) -> Self {
        self.carbon_intensity = kg_per_kwh;
        self
    }

    pub fn log_path(&self) -> PathBuf {
        self.output_dir.join(EMISSIONS_FILE)
    }
}

/// Accumulated energy per component, in kWh.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct EnergyTotals {
    cpu_kwh: f64,
    gpu_kwh: f64,
    ram_kwh: f64,
}

impl EnergyTotals {
    fn add(&mut self, info: &PowerInfo, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        self.cpu_kwh += info.cpu_power_watts as f64 * secs / JOULES_PER_KWH;
        self.gpu_kwh += info.gpu_power_watts as f64 * secs / JOULES_PER_KWH;
        self.ram_kwh += info.ram_power_watts as f64 * secs / JOULES_PER_KWH;
    }

    fn total_kwh(&self) -> f64 {
        self.cpu_kwh + self.gpu_kwh + self.ram_kwh
    }
}

/// Mean power in watts for `kwh` consumed over `secs`.
fn mean_watts(kwh: f64, secs: f64) -> f64 {
    if secs > 0.0 {
        kwh * JOULES_PER_KWH / secs
    } else {
        0.0
    }
}

/// Result of a stopped session.
#[derive(Debug, Clone)]
pub struct EmissionsData {
    pub timestamp: DateTime<Utc>,
    pub project_name: String,
    pub experiment_id: String,
    pub duration_secs: f64,
    pub emissions_kg: f64,
    pub emissions_rate_kg_per_sec: f64,
    pub cpu_power_watts: f64,
    pub gpu_power_watts: f64,
    pub ram_power_watts: f64,
    pub cpu_energy_kwh: f64,
    pub gpu_energy_kwh: f64,
    pub ram_energy_kwh: f64,
    pub energy_consumed_kwh: f64,
    pub carbon_intensity: f64,
}

pub struct EmissionsTracker<P: PowerProvider> {
    config: TrackerConfig,
    provider: P,
    started_at: Instant,
    last_sample: Instant,
    energy: EnergyTotals,
    sample_count: usize,
}

impl<P: PowerProvider> EmissionsTracker<P> {
    /// Starts a session. Fails with [`TrackerError::Unavailable`] when the
    /// platform has no power counters at all.
    pub fn start(config: TrackerConfig) -> Result<Self, TrackerError> {
        if !P::is_supported() {
            return Err(TrackerError::Unavailable);
        }

        let provider = P::new().map_err(provider_error)?;
        fs::create_dir_all(&config.output_dir)?;

        debug!(
            project = %config.project_name,
            experiment = %config.experiment_id,
            interval_ms = config.measure_interval.as_millis() as u64,
            "Emissions tracker started"
        );

        let now = Instant::now();
        Ok(Self {
            config,
            provider,
            started_at: now,
            last_sample: now,
            energy: EnergyTotals::default(),
            sample_count: 0,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Refreshes the provider and adds the energy used since the last sample.
    pub fn sample(&mut self) -> Result<(), TrackerError> {
        self.provider.refresh().map_err(provider_error)?;

        let now = Instant::now();
        let info = self.provider.info();
        self.energy.add(info, now.duration_since(self.last_sample));
        self.last_sample = now;
        self.sample_count += 1;

        trace!(
            cpu_w = info.cpu_power_watts,
            gpu_w = info.gpu_power_watts,
            ram_w = info.ram_power_watts,
            "Power sample"
        );
        Ok(())
    }

    /// Blocks for `duration`, sampling once per measurement interval.
    pub fn run_for(&mut self, duration: Duration) -> Result<(), TrackerError> {
        let deadline = Instant::now()
            .checked_add(duration)
            .ok_or(TrackerError::DurationOverflow(duration))?;

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep((deadline - now).min(self.config.measure_interval));
            self.sample()?;
        }

        Ok(())
    }

    /// Takes a final sample, appends the session to the emissions log and
    /// returns its totals.
    pub fn stop(mut self) -> Result<EmissionsData, TrackerError> {
        self.sample()?;

        let duration_secs = self.last_sample.duration_since(self.started_at).as_secs_f64();
        let energy_kwh = self.energy.total_kwh();
        let emissions_kg = energy_kwh * self.config.carbon_intensity;
        let emissions_rate_kg_per_sec = if duration_secs > 0.0 {
            emissions_kg / duration_secs
        } else {
            0.0
        };

        let data = EmissionsData {
            timestamp: Utc::now(),
            project_name: self.config.project_name.clone(),
            experiment_id: self.config.experiment_id.clone(),
            duration_secs,
            emissions_kg,
            emissions_rate_kg_per_sec,
            cpu_power_watts: mean_watts(self.energy.cpu_kwh, duration_secs),
            gpu_power_watts: mean_watts(self.energy.gpu_kwh, duration_secs),
            ram_power_watts: mean_watts(self.energy.ram_kwh, duration_secs),
            cpu_energy_kwh: self.energy.cpu_kwh,
            gpu_energy_kwh: self.energy.gpu_kwh,
            ram_energy_kwh: self.energy.ram_kwh,
            energy_consumed_kwh: energy_kwh,
            carbon_intensity: self.config.carbon_intensity,
        };

        csv_log::append(&self.config.log_path(), &EmissionsRow::from(&data))?;

        info!(
            experiment = %data.experiment_id,
            duration_s = data.duration_secs,
            energy_kwh = data.energy_consumed_kwh,
            emissions_kg = data.emissions_kg,
            samples = self.sample_count,
            "Emissions tracker stopped"
        );

        Ok(data)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use carbon_platform::{PowerInfo, PowerProvider};
    use color_eyre::eyre::{bail, Result};

    pub const CPU_WATTS: f32 = 10.0;
    pub const GPU_WATTS: f32 = 4.0;
    pub const RAM_WATTS: f32 = 2.0;

    /// Provider reporting the same draw on every refresh.
    pub struct ConstantPower {
        info: PowerInfo,
    }

    impl PowerProvider for ConstantPower {
        fn new() -> Result<Self> {
            Ok(Self {
                info: PowerInfo {
                    cpu_power_watts: CPU_WATTS,
                    gpu_power_watts: GPU_WATTS,
                    ram_power_watts: RAM_WATTS,
                    system_power_watts: CPU_WATTS + GPU_WATTS + RAM_WATTS,
                    is_warmed_up: true,
                },
            })
        }

        fn refresh(&mut self) -> Result<()> {
            Ok(())
        }

        fn info(&self) -> &PowerInfo {
            &self.info
        }
    }

    /// Provider whose counters can't be opened.
    pub struct BrokenPower {
        info: PowerInfo,
    }

    impl PowerProvider for BrokenPower {
        fn new() -> Result<Self> {
            bail!("energy_uj: permission denied")
        }

        fn refresh(&mut self) -> Result<()> {
            Ok(())
        }

        fn info(&self) -> &PowerInfo {
            &self.info
        }
    }

    /// Provider that opens but fails on the first refresh.
    pub struct FlakyPower {
        info: PowerInfo,
    }

    impl PowerProvider for FlakyPower {
        fn new() -> Result<Self> {
            Ok(Self {
                info: PowerInfo::default(),
            })
        }

        fn refresh(&mut self) -> Result<()> {
            bail!("counter vanished")
        }

        fn info(&self) -> &PowerInfo {
            &self.info
        }
    }

    pub struct AbsentPower {
        info: PowerInfo,
    }

    impl PowerProvider for AbsentPower {
        fn new() -> Result<Self> {
            Ok(Self {
                info: PowerInfo::default(),
            })
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
}
