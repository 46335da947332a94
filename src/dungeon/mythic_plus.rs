//! Keystone ("Mythic+") timer, affix advice, and pack routing (§4.6, §8).

use crate::ids::{EntityId, TimeMs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affix {
    Tyrannical,
    Fortified,
    Bolstering,
    Sanguine,
    Bursting,
    Quaking,
    Raging,
    Explosive,
    Volcanic,
    Necrotic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChestTier {
    None,
    One,
    Two,
    Three,
}

pub struct MythicPlusManager {
    pub keystone_level: u32,
    pub affixes: Vec<Affix>,
    pub time_limit_ms: u64,
    pub death_penalty_ms: u64,
    pub two_chest_time_mod: f32,
    pub three_chest_time_mod: f32,
    start_at: TimeMs,
    pub death_count: u32,
    route: Vec<EntityId>,
}

impl MythicPlusManager {
    pub fn new(
        keystone_level: u32,
        affixes: Vec<Affix>,
        time_limit_ms: u64,
        death_penalty_ms: u64,
        two_chest_time_mod: f32,
        three_chest_time_mod: f32,
    ) -> Self {
        Self {
            keystone_level,
            affixes,
            time_limit_ms,
            death_penalty_ms,
            two_chest_time_mod,
            three_chest_time_mod,
            start_at: 0,
            death_count: 0,
            route: Vec::new(),
        }
    }

    pub fn start(&mut self, now: TimeMs, route: Vec<EntityId>) {
        self.start_at = now;
        self.death_count = 0;
        self.route = route;
    }

    pub fn record_death(&mut self) {
        self.death_count += 1;
    }

    /// §8: `remaining_time = time_limit − elapsed − death_count × 5000`, clipped to 0.
    pub fn remaining_time(&self, now: TimeMs) -> u64 {
        let elapsed = now.saturating_sub(self.start_at);
        let penalty = self.death_count as u64 * self.death_penalty_ms;
        self.time_limit_ms.saturating_sub(elapsed).saturating_sub(penalty)
    }

    pub fn chest_tier(&self, now: TimeMs) -> ChestTier {
        let remaining = self.remaining_time(now);
        if remaining == 0 {
            return ChestTier::None;
        }
        let fraction_used = 1.0 - (remaining as f32 / self.time_limit_ms as f32);
        if fraction_used <= self.three_chest_time_mod {
            ChestTier::Three
        } else if fraction_used <= self.two_chest_time_mod {
            ChestTier::Two
        } else {
            ChestTier::One
        }
    }

    pub fn is_on_pace(&self, now: TimeMs) -> bool {
        self.remaining_time(now) > 0
    }

    pub fn enemy_forces_percent(&self, forces_killed: f32, forces_required: f32) -> f32 {
        if forces_required <= 0.0 {
            return 100.0;
        }
        (forces_killed / forces_required * 100.0).min(100.0)
    }

    pub fn affix_advice(&self, affix: Affix, context_health_fraction: f32) -> &'static str {
        match affix {
            Affix::Explosive => "prioritise or skip explosive orbs before they detonate",
            Affix::Sanguine => "avoid standing in the healing pool left by enemies",
            Affix::Bursting => "spread stacks or dispel to suppress bursting stacks",
            Affix::Quaking => "stop casting during quaking pulses",
            Affix::Raging if context_health_fraction <= 0.30 => "prioritise killing the raging target now",
            Affix::Raging => "watch for raging trigger near 30% health",
            Affix::Bolstering => "focus-fire low-health adds together to avoid bolstering buff stacking",
            Affix::Volcanic => "move off the cast location immediately",
            Affix::Necrotic => "rotate tanks to shed the necrotic healing-reduction stack",
            Affix::Tyrannical => "bosses hit harder, trash is lighter: pace cooldowns for boss pulls",
            Affix::Fortified => "trash hits harder, bosses are lighter: plan CC for pulls, not boss phases",
        }
    }

    pub fn route(&self) -> &[EntityId] {
        &self.route
    }

    /// Recomputes the route when a pack clears out of the planned order,
    /// dropping it from the front and leaving the rest untouched.
    pub fn recompute_route(&mut self, cleared_pack: EntityId) {
        self.route.retain(|&p| p != cleared_pack);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mgr() -> MythicPlusManager {
        MythicPlusManager::new(10, vec![Affix::Fortified, Affix::Sanguine], 1_800_000, 5_000, 0.8, 0.6)
    }

    #[test]
    fn remaining_time_subtracts_elapsed_and_death_penalty() {
        let mut m = mgr();
        m.start(0, vec![EntityId(1), EntityId(2)]);
        m.record_death();
        m.record_death();
        let remaining = m.remaining_time(100_000);
        assert_eq!(remaining, 1_800_000 - 100_000 - 2 * 5_000);
    }

    #[test]
    fn remaining_time_clips_to_zero_not_negative() {
        let mut m = mgr();
        m.start(0, vec![]);
        assert_eq!(m.remaining_time(2_000_000), 0);
        assert!(!m.is_on_pace(2_000_000));
    }

    #[test]
    fn chest_tier_follows_configured_time_fractions() {
        let mut m = mgr();
        m.start(0, vec![]);
        assert_eq!(m.chest_tier(0), ChestTier::Three);
        assert_eq!(m.chest_tier(1_300_000), ChestTier::Two); // ~72% used
        assert_eq!(m.chest_tier(1_700_000), ChestTier::One); // ~94% used
    }

    #[test]
    fn route_drops_cleared_pack_out_of_order() {
        let mut m = mgr();
        m.start(0, vec![EntityId(1), EntityId(2), EntityId(3)]);
        m.recompute_route(EntityId(2));
        assert_eq!(m.route(), &[EntityId(1), EntityId(3)]);
    }
}
