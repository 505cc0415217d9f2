use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use color_eyre::eyre::{bail, Result};

use crate::memory::{installed_memory_bytes, ram_power_watts};
use crate::power::{PowerInfo, PowerProvider};

const RAPL_PATH: &str = "/sys/class/powercap/intel-rapl";
const HWMON_PATH: &str = "/sys/class/hwmon";

#[derive(Debug)]
struct RaplDomain {
    path: PathBuf,
    name: String,
    max_energy_range_uj: Option<u64>,
    last_energy_uj: u64,
    last_time: Instant,
}

/// Linux power provider backed by RAPL package counters and GPU hwmon.
pub struct LinuxPower {
    info: PowerInfo,
    rapl_domains: Vec<RaplDomain>,
    gpu_hwmon_path: Option<PathBuf>,
}

impl PowerProvider for LinuxPower {
    fn new() -> Result<Self> {
        let ram_watts = ram_power_watts(installed_memory_bytes());
        Self::with_roots(Path::new(RAPL_PATH), Path::new(HWMON_PATH), ram_watts)
    }

    fn refresh(&mut self) -> Result<()> {
        let cpu_power = self.refresh_rapl_power();
        let gpu_power = self.read_gpu_power();

        self.info.cpu_power_watts = cpu_power;
        self.info.gpu_power_watts = gpu_power;
        self.info.system_power_watts = cpu_power + gpu_power + self.info.ram_power_watts;
        self.info.is_warmed_up = true;
        Ok(())
    }

    fn info(&self) -> &PowerInfo {
        &self.info
    }

    fn is_supported() -> bool {
        Path::new(RAPL_PATH).exists()
    }
}

impl LinuxPower {
    /// Builds a provider from explicit sysfs roots.
    ///
    /// Fails when no readable RAPL package domain exists, which is the
    /// common case for unprivileged users on kernels that restrict
    /// `energy_uj`.
    pub fn with_roots(rapl_root: &Path, hwmon_root: &Path, ram_power_watts: f32) -> Result<Self> {
        let rapl_domains = discover_rapl_domains(rapl_root);
        if rapl_domains.is_empty() {
            bail!(
                "no readable RAPL package domains under {} (energy_uj may require root)",
                rapl_root.display()
            );
        }

        let info = PowerInfo {
            ram_power_watts,
            system_power_watts: ram_power_watts,
            ..Default::default()
        };

        Ok(Self {
            info,
            rapl_domains,
            gpu_hwmon_path: discover_gpu_hwmon(hwmon_root),
        })
    }

    /// Names of the RAPL domains being summed for CPU power.
    pub fn domain_names(&self) -> Vec<&str> {
        self.rapl_domains.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn has_gpu_sensor(&self) -> bool {
        self.gpu_hwmon_path.is_some()
    }

    fn refresh_rapl_power(&mut self) -> f32 {
        let mut total_cpu_power = 0.0f32;
        let now = Instant::now();

        for domain in &mut self.rapl_domains {
            let Some(energy_uj) = read_u64(&domain.path.join("energy_uj")) else {
                continue;
            };

            let elapsed_us = now.duration_since(domain.last_time).as_micros() as u64;
            if elapsed_us > 0 {
                let delta = energy_delta_uj(
                    domain.last_energy_uj,
                    energy_uj,
                    domain.max_energy_range_uj,
                );
                total_cpu_power += delta as f32 / elapsed_us as f32;
            }

            domain.last_energy_uj = energy_uj;
            domain.last_time = now;
        }

        total_cpu_power
    }

    fn read_gpu_power(&self) -> f32 {
        self.gpu_hwmon_path
            .as_deref()
            .and_then(read_u64)
            .map(|microwatts| microwatts as f32 / 1_000_000.0)
            .unwrap_or(0.0)
    }
}

/// Energy consumed between two counter readings, accounting for wrap-around.
///
/// Without a known range the counter is assumed to have restarted from zero.
fn energy_delta_uj(last: u64, current: u64, max_range: Option<u64>) -> u64 {
    if current >= last {
        return current - last;
    }
    match max_range {
        Some(max) if max >= last => (max - last) + current,
        _ => current,
    }
}

fn read_u64(path: &Path) -> Option<u64> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn discover_rapl_domains(rapl_root: &Path) -> Vec<RaplDomain> {
    let mut packages = Vec::new();
    let mut psys = Vec::new();

    let Ok(entries) = fs::read_dir(rapl_root) else {
        return packages;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let name = fs::read_to_string(path.join("name"))
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let Some(last_energy_uj) = read_u64(&path.join("energy_uj")) else {
            continue;
        };

        let domain = RaplDomain {
            max_energy_range_uj: read_u64(&path.join("max_energy_range_uj")),
            path,
            last_energy_uj,
            last_time: Instant::now(),
            name,
        };

        if domain.name.contains("package") {
            packages.push(domain);
        } else if domain.name.contains("psys") {
            psys.push(domain);
        }
    }

    // psys already includes the packages; only use it when they're missing
    if packages.is_empty() {
        psys
    } else {
        packages.sort_by(|a, b| a.name.cmp(&b.name));
        packages
    }
}

fn discover_gpu_hwmon(hwmon_root: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(hwmon_root).ok()?;

    for entry in entries.flatten() {
        let path = entry.path();

        if let Ok(name) = fs::read_to_string(path.join("name")) {
            let name = name.trim().to_lowercase();
            if name.contains("amdgpu") || name.contains("i915") || name.contains("nouveau") {
                let power_path = path.join("power1_input");
                if power_path.exists() {
                    return Some(power_path);
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn write_domain(root: &Path, dir: &str, name: &str, energy_uj: u64) {
        let path = root.join(dir);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("name"), format!("{}\n", name)).unwrap();
        fs::write(path.join("energy_uj"), format!("{}\n", energy_uj)).unwrap();
        fs::write(path.join("max_energy_range_uj"), "262143328850\n").unwrap();
    }

    #[test]
    fn test_energy_delta_wraps() {
        assert_eq!(energy_delta_uj(100, 250, Some(1000)), 150);
        assert_eq!(energy_delta_uj(900, 50, Some(1000)), 150);
        assert_eq!(energy_delta_uj(900, 50, None), 50);
    }

    #[test]
    fn test_discovery_prefers_packages() {
        let rapl = tempfile::tempdir().unwrap();
        write_domain(rapl.path(), "intel-rapl:1", "package-1", 10);
        write_domain(rapl.path(), "intel-rapl:0", "package-0", 10);
        write_domain(rapl.path(), "intel-rapl:2", "psys", 10);
        write_domain(rapl.path(), "intel-rapl:3", "dram", 10);

        let domains = discover_rapl_domains(rapl.path());
        let names: Vec<_> = domains.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["package-0", "package-1"]);
    }

    #[test]
    fn test_discovery_falls_back_to_psys() {
        let rapl = tempfile::tempdir().unwrap();
        write_domain(rapl.path(), "intel-rapl:0", "psys", 10);
        write_domain(rapl.path(), "intel-rapl:1", "dram", 10);

        let domains = discover_rapl_domains(rapl.path());
        assert_eq!(domains.len(), 1);
        assert_eq!(domains[0].name, "psys");
    }

    #[test]
    fn test_no_domains_is_an_error() {
        let rapl = tempfile::tempdir().unwrap();
        let hwmon = tempfile::tempdir().unwrap();
        assert!(LinuxPower::with_roots(rapl.path(), hwmon.path(), 3.0).is_err());
    }

    #[test]
    fn test_refresh_reads_counters() {
        let rapl = tempfile::tempdir().unwrap();
        let hwmon = tempfile::tempdir().unwrap();
        write_domain(rapl.path(), "intel-rapl:0", "package-0", 1_000_000);

        let gpu = hwmon.path().join("hwmon3");
        fs::create_dir_all(&gpu).unwrap();
        fs::write(gpu.join("name"), "amdgpu\n").unwrap();
        fs::write(gpu.join("power1_input"), "15000000\n").unwrap();

        let mut power = LinuxPower::with_roots(rapl.path(), hwmon.path(), 3.0).unwrap();
        assert!(power.has_gpu_sensor());
        assert_eq!(power.domain_names(), vec!["package-0"]);
        assert!(!power.info().is_warmed_up);

        std::thread::sleep(Duration::from_millis(10));
        fs::write(rapl.path().join("intel-rapl:0/energy_uj"), "3000000\n").unwrap();
        power.refresh().unwrap();

        let info = power.info();
        assert!(info.is_warmed_up);
        assert!(info.cpu_power_watts > 0.0);
        assert!((info.gpu_power_watts - 15.0).abs() < 1e-3);
        assert!((info.ram_power_watts - 3.0).abs() < 1e-6);
        assert!(
            (info.system_power_watts - (info.cpu_power_watts + 15.0 + 3.0)).abs() < 1e-3
        );
    }
}
