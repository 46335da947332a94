//! Runtime configuration for the coordination core.
//!
//! Mirrors the teacher crate's `SimConfig`: one `Default`-constructible
//! struct holding every tunable, validated once at construction and never
//! read from disk by this crate — loading a config file is the host's job.

use thiserror::Error;

/// Errors surfaced at the (small) API boundary where a `Result` is the
/// idiomatic shape. Nothing on the hot dispatch/delivery/claim path returns
/// `Result` — see `SPEC_FULL.md` §7.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("snapshot (de)serialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Every tunable enumerated in the specification's "Configuration" section.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfig {
    pub router_max_queue_size: usize,
    pub router_drop_oldest_on_overflow: bool,

    pub bus_max_queue_per_group: usize,
    pub bus_inactive_group_threshold_seconds: u64,

    pub resolver_claim_window_ms: u64,

    pub arena_switch_threshold: f32,
    pub arena_min_time_on_target_ms: u64,
    pub arena_burst_min_bursters: u32,
    pub arena_burst_max_duration_ms: u64,
    pub arena_cc_overlap_window_ms: u64,
    pub arena_peel_duration_ms: u64,
    pub arena_defensive_health_thresholds: (f32, f32, f32),

    pub dungeon_min_mana_for_pull: f32,
    pub dungeon_min_health_for_pull: f32,
    pub dungeon_update_interval_ms: u64,
    pub dungeon_ready_check_timeout_ms: u64,

    pub mythic_plus_death_penalty_ms: u64,
    pub mythic_plus_two_chest_time_mod: f32,
    pub mythic_plus_three_chest_time_mod: f32,

    pub corpse_expiry_minutes: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            router_max_queue_size: 10_000,
            router_drop_oldest_on_overflow: true,

            bus_max_queue_per_group: 1_000,
            bus_inactive_group_threshold_seconds: 300,

            resolver_claim_window_ms: 200,

            arena_switch_threshold: 1.5,
            arena_min_time_on_target_ms: 3_000,
            arena_burst_min_bursters: 2,
            arena_burst_max_duration_ms: 10_000,
            arena_cc_overlap_window_ms: 300,
            arena_peel_duration_ms: 5_000,
            arena_defensive_health_thresholds: (0.80, 0.50, 0.30),

            dungeon_min_mana_for_pull: 50.0,
            dungeon_min_health_for_pull: 70.0,
            dungeon_update_interval_ms: 500,
            dungeon_ready_check_timeout_ms: 30_000,

            mythic_plus_death_penalty_ms: 5_000,
            mythic_plus_two_chest_time_mod: 0.8,
            mythic_plus_three_chest_time_mod: 0.6,

            corpse_expiry_minutes: 30,
        }
    }
}

impl CoreConfig {
    /// Validate invariants that would otherwise silently misbehave (e.g. a
    /// zero queue size that drops everything). On failure the caller should
    /// log a warning and fall back to `CoreConfig::default()`, per §7.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.router_max_queue_size == 0 {
            return Err(CoreError::InvalidConfig("router_max_queue_size must be > 0".into()));
        }
        if self.bus_max_queue_per_group == 0 {
            return Err(CoreError::InvalidConfig("bus_max_queue_per_group must be > 0".into()));
        }
        let (hi, mid, lo) = self.arena_defensive_health_thresholds;
        if !(hi > mid && mid > lo && lo >= 0.0 && hi <= 1.0) {
            return Err(CoreError::InvalidConfig(
                "arena_defensive_health_thresholds must be strictly descending within [0,1]".into(),
            ));
        }
        Ok(())
    }

    /// Build a config, falling back to defaults (with a logged warning) for
    /// any invalid field rather than failing construction outright.
    pub fn validated_or_default(self) -> Self {
        match self.validate() {
            Ok(()) => self,
            Err(e) => {
                log::warn!("invalid CoreConfig ({e}), falling back to defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(CoreConfig::default().validate().is_ok());
    }

    #[test]
    fn bad_thresholds_fall_back() {
        let mut cfg = CoreConfig::default();
        cfg.arena_defensive_health_thresholds = (0.1, 0.5, 0.8);
        let fixed = cfg.validated_or_default();
        assert_eq!(fixed, CoreConfig::default());
    }
}
