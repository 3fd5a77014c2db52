use serde::{Deserialize, Serialize};

use crate::cache::PROGRAM_IDLE_TICKS;

pub const DEFAULT_ITERATION_CAP: usize = 100_000;
pub const DEFAULT_MAX_CALL_DEPTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineOptions {
    /// Commands visited per scheduling slot across the whole call stack.
    pub iteration_cap: usize,
    /// Maximum number of nested execution states, root included.
    pub max_call_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            iteration_cap: DEFAULT_ITERATION_CAP,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheOptions {
    pub idle_ticks: u64,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            idle_ticks: PROGRAM_IDLE_TICKS,
        }
    }
}
