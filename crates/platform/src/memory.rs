//! Memory power estimate.
//!
//! DRAM draw is not exposed on most machines, so it is approximated from the
//! amount of installed memory.

use sysinfo::System;

/// Watts drawn per GB of installed memory (3 W per 8 GB module).
pub const RAM_WATTS_PER_GB: f32 = 3.0 / 8.0;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Total installed memory in bytes.
pub fn installed_memory_bytes() -> u64 {
    let mut system = System::new();
    system.refresh_memory();
    system.total_memory()
}

/// Estimated power draw in watts for `total_bytes` of memory.
pub fn ram_power_watts(total_bytes: u64) -> f32 {
    let gigabytes = total_bytes as f64 / BYTES_PER_GB;
    (gigabytes * RAM_WATTS_PER_GB as f64) as f32
}
