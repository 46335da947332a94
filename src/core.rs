//! `CoordinationCore`: ties the router, bus, claim resolver, death-safety
//! tracker, and the three domain coordinators into one fixed-timestep loop.
//!
//! Mirrors the teacher's `SimWorld::step` — accumulate wall-clock `dt` and
//! run fixed updates until the accumulator drains below one tick.

use std::sync::Arc;

use crate::arena::{ArenaCoordinator, EnemyStatus};
use crate::battleground::BattlegroundCoordinator;
use crate::bus::MessageBus;
use crate::claim::ClaimResolver;
use crate::config::CoreConfig;
use crate::death::CorpseTracker;
use crate::dungeon::DungeonCoordinator;
#[cfg(any(test, feature = "profile"))]
use crate::profiler::Profiler;
use crate::router::{EventRouter, OverflowPolicy};

/// Fixed simulation rate; matches the teacher's default of 20 Hz used in its
/// own tests, favouring deterministic step counts over wall-clock smoothness.
pub const FIXED_TIMESTEP_SECS: f32 = 1.0 / 20.0;

pub struct CoordinationCore {
    pub config: CoreConfig,
    pub router: Arc<EventRouter>,
    pub bus: Arc<MessageBus>,
    pub resolver: Arc<ClaimResolver>,
    pub corpses: CorpseTracker,
    pub arena: ArenaCoordinator,
    pub battleground: BattlegroundCoordinator,
    pub dungeon: DungeonCoordinator,
    tick: u64,
    time_secs: f32,
    time_accumulator: f32,
    #[cfg(any(test, feature = "profile"))]
    profiler: Profiler,
}

impl CoordinationCore {
    pub fn new(config: CoreConfig) -> Self {
        let resolver = Arc::new(ClaimResolver::new(config.resolver_claim_window_ms));
        let router = Arc::new(EventRouter::new(config.router_max_queue_size, overflow_policy(&config)));
        let bus = Arc::new(MessageBus::new(config.bus_max_queue_per_group, resolver.clone()));
        let corpses = CorpseTracker::new(config.corpse_expiry_minutes);
        let arena = ArenaCoordinator::new(&config);
        let battleground = BattlegroundCoordinator::new();
        let dungeon = DungeonCoordinator::new(&config);

        Self {
            config,
            router,
            bus,
            resolver,
            corpses,
            arena,
            battleground,
            dungeon,
            tick: 0,
            time_secs: 0.0,
            time_accumulator: 0.0,
            #[cfg(any(test, feature = "profile"))]
            profiler: Profiler::new(),
        }
    }

    /// Per-section timing collected by `step_profiled` calls so far.
    #[cfg(any(test, feature = "profile"))]
    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn time_secs(&self) -> f32 {
        self.time_secs
    }

    /// Advance the core by `dt` wall-clock seconds, running as many fixed
    /// updates as have accumulated.
    pub fn step(&mut self, dt: f32, enemies: &[EnemyStatus]) {
        self.time_accumulator += dt;
        while self.time_accumulator >= FIXED_TIMESTEP_SECS {
            self.fixed_update(enemies);
            self.time_accumulator -= FIXED_TIMESTEP_SECS;
        }
    }

    /// One fixed tick: drain the router, step every coordinator, then
    /// process the bus — the ordering fixed by §2.
    fn fixed_update(&mut self, enemies: &[EnemyStatus]) {
        let now_ms = self.now_ms();
        let dt_ms = Self::dt_ms();

        self.router.drain();

        self.arena.update(now_ms, dt_ms, enemies);
        self.battleground.update(now_ms, dt_ms, 0, 0.5, u64::MAX);
        self.dungeon.update(now_ms, dt_ms, 1.0);

        self.resolver.process_pending(now_ms);
        self.resolver.cleanup_expired(now_ms);
        self.bus.process(64, now_ms);
        self.bus.cleanup_inactive(self.config.bus_inactive_group_threshold_seconds, now_ms / 1000);
        self.corpses.reap_expired(now_ms);

        self.tick += 1;
        self.time_secs += FIXED_TIMESTEP_SECS;
    }

    fn now_ms(&self) -> u64 {
        (self.time_secs * 1000.0) as u64
    }

    fn dt_ms() -> u64 {
        (FIXED_TIMESTEP_SECS * 1000.0) as u64
    }

    /// Profiled variant of `fixed_update`: the same steps, each timed into a
    /// named section of `self.profiler` instead of one opaque duration, so a
    /// stress test can tell a slow router dispatch from a slow bus sweep.
    #[cfg(any(test, feature = "profile"))]
    pub fn step_profiled(&mut self, dt: f32, enemies: &[EnemyStatus]) -> std::time::Duration {
        use std::time::Instant;
        self.time_accumulator += dt;
        let mut total = std::time::Duration::ZERO;
        while self.time_accumulator >= FIXED_TIMESTEP_SECS {
            let start = Instant::now();
            self.fixed_update_profiled(enemies);
            total += start.elapsed();
            self.time_accumulator -= FIXED_TIMESTEP_SECS;
        }
        self.profiler.tick();
        total
    }

    #[cfg(any(test, feature = "profile"))]
    fn fixed_update_profiled(&mut self, enemies: &[EnemyStatus]) {
        let now_ms = self.now_ms();
        let dt_ms = Self::dt_ms();

        let router = &self.router;
        self.profiler.time_section("router_drain", || router.drain());

        let arena = &mut self.arena;
        self.profiler.time_section("arena_update", || arena.update(now_ms, dt_ms, enemies));

        let battleground = &mut self.battleground;
        self.profiler.time_section("battleground_update", || battleground.update(now_ms, dt_ms, 0, 0.5, u64::MAX));

        let dungeon = &mut self.dungeon;
        self.profiler.time_section("dungeon_update", || dungeon.update(now_ms, dt_ms, 1.0));

        let resolver = &self.resolver;
        self.profiler.time_section("claim_resolve", || {
            resolver.process_pending(now_ms);
            resolver.cleanup_expired(now_ms);
        });

        let bus = &self.bus;
        let inactive_threshold = self.config.bus_inactive_group_threshold_seconds;
        self.profiler.time_section("bus_process", || {
            bus.process(64, now_ms);
            bus.cleanup_inactive(inactive_threshold, now_ms / 1000);
        });

        let corpses = &self.corpses;
        self.profiler.time_section("corpse_reap", || corpses.reap_expired(now_ms));

        self.tick += 1;
        self.time_secs += FIXED_TIMESTEP_SECS;
    }
}

fn overflow_policy(config: &CoreConfig) -> OverflowPolicy {
    if config.router_drop_oldest_on_overflow {
        OverflowPolicy::DropOldest
    } else {
        OverflowPolicy::DropNewest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_advances_tick_count_by_whole_fixed_steps() {
        let mut core = CoordinationCore::new(CoreConfig::default());
        core.step(FIXED_TIMESTEP_SECS * 2.5, &[]);
        assert_eq!(core.tick_count(), 2);
        assert!(core.time_accumulator < FIXED_TIMESTEP_SECS);
    }

    #[test]
    fn sub_tick_dt_accumulates_without_advancing() {
        let mut core = CoordinationCore::new(CoreConfig::default());
        core.step(FIXED_TIMESTEP_SECS * 0.5, &[]);
        assert_eq!(core.tick_count(), 0);
        core.step(FIXED_TIMESTEP_SECS * 0.6, &[]);
        assert_eq!(core.tick_count(), 1);
    }

    #[test]
    fn step_profiled_records_every_named_section_once_per_tick() {
        let mut core = CoordinationCore::new(CoreConfig::default());
        core.step_profiled(FIXED_TIMESTEP_SECS, &[]);

        for section in [
            "router_drain",
            "arena_update",
            "battleground_update",
            "dungeon_update",
            "claim_resolve",
            "bus_process",
            "corpse_reap",
        ] {
            let stats = core.profiler().get_section(section).unwrap_or_else(|| panic!("missing section {section}"));
            assert_eq!(stats.call_count, 1);
        }
        assert_eq!(core.profiler().tick_count(), 1);
    }
}
