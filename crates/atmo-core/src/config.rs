use serde::{Deserialize, Serialize};

/// Tunable parameters for the acquisition pipeline.
///
/// Bus wiring and device addresses are compile-time constants in the
/// driver and firmware crates, not runtime configuration.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct StationConfig {
    /// Sea-level reference pressure in hPa for altitude estimation.
    pub sea_level_hpa: f32,
    /// Number of acquisition rounds averaged into one report.
    pub sample_rounds: u32,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            sea_level_hpa: 1013.25,
            sample_rounds: 4,
        }
    }
}
