//! Engine configuration parameters
//!
//! All tunable parameters for the reconfiguration engine.
//! Values can be overridden at runtime through the host data model.

use serde::{Deserialize, Serialize};

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconfConfig {
    // --- Commit manager ---
    /// Master enable for the commit debounce scheduler
    pub commit_enabled: bool,
    /// Steady-state debounce delay between a commit notification and the
    /// FSM trigger (milliseconds)
    pub commit_delay_ms: u32,
    /// Minimum quiet period after process start before the first commit
    /// fires (milliseconds)
    pub boot_quiet_ms: u64,

    // --- FSM cadences ---
    /// WAIT-state lock acquisition retry interval (milliseconds)
    pub trylock_interval_ms: u32,
    /// Slower WAIT cadence while APs are still completing their own host
    /// FSM cycles (milliseconds)
    pub settle_interval_ms: u32,
    /// Fast-path tick interval for local work (milliseconds)
    pub fast_interval_ms: u32,
    /// Tick interval after commands the daemon answers asynchronously
    /// (milliseconds)
    pub cmd_wait_ms: u32,

    // --- Budgets ---
    /// Maximum WAIT-state lock acquisition attempts before giving up
    pub wait_retry_max: u32,

    // --- Stuck-FSM breaker ---
    /// Deferred commits tolerated on one radio before the breaker arms
    pub max_pending_commits: u32,
    /// Age of the oldest deferred commit before the breaker trips
    /// (milliseconds)
    pub max_pending_wait_ms: u64,
}

impl Default for ReconfConfig {
    fn default() -> Self {
        Self {
            // Commit manager
            commit_enabled: true,
            commit_delay_ms: 1_000,
            boot_quiet_ms: 30_000,

            // Cadences
            trylock_interval_ms: 1_000,
            settle_interval_ms: 3_000,
            fast_interval_ms: 100,
            cmd_wait_ms: 1_000,

            // Budgets: 30 attempts at the try-lock cadence = ~30 s
            wait_retry_max: 30,

            // Breaker
            max_pending_commits: 10,
            max_pending_wait_ms: 60_000,
        }
    }
}
