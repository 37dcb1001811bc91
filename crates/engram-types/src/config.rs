//! Store configuration.
//!
//! `StoreConfig` controls the index geometry and the query-executor and
//! sweeper tuning knobs. Loaded from TOML; all fields have defaults.

use serde::{Deserialize, Serialize};

/// Configuration for the vector memory store.
///
/// One geometry (fixed `dimension`) per deployment; mixed dimensionalities
/// are never intermixed in one index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Embedding vector dimension. Every stored and queried vector must
    /// have exactly this length.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Candidate pool multiplier for the oversample-then-filter strategy:
    /// the executor requests `max(k * oversample_factor, min_candidates)`
    /// candidates before applying attribute filters.
    #[serde(default = "default_oversample_factor")]
    pub oversample_factor: usize,

    /// Floor for the candidate pool size.
    #[serde(default = "default_min_candidates")]
    pub min_candidates: usize,

    /// How many vectors the underlying approximate index examines.
    /// Clamped at query time to at least the candidate pool size.
    #[serde(default = "default_num_candidates")]
    pub num_candidates: usize,

    /// Sweeper cadence in seconds. Tuning only: query-time filtering is
    /// the correctness backstop, the sweeper just reclaims space.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_dimension() -> usize {
    384
}

fn default_oversample_factor() -> usize {
    10
}

fn default_min_candidates() -> usize {
    100
}

fn default_num_candidates() -> usize {
    100
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            oversample_factor: default_oversample_factor(),
            min_candidates: default_min_candidates(),
            num_candidates: default_num_candidates(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}
