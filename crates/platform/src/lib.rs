//! Power draw sampling for carbon-track.
//!
//! This crate provides a platform-agnostic [`PowerProvider`] trait and the
//! [`PowerInfo`] snapshot it produces, with a Linux implementation backed by
//! RAPL energy counters and GPU hwmon sensors.
//!
//! # Example
//!
//! ```ignore
//! use carbon_platform::PowerProvider;
//! use carbon_platform::linux::LinuxPower;
//!
//! let mut power = LinuxPower::new()?;
//! std::thread::sleep(std::time::Duration::from_secs(1));
//! power.refresh()?;
//! println!("CPU: {:.2}W", power.info().cpu_power_watts);
//! ```

pub mod memory;
mod power;
pub mod unsupported;

pub use power::{PowerInfo, PowerProvider};

#[cfg(target_os = "linux")]
pub mod linux;
