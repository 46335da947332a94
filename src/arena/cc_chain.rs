//! CC-chain planning (§4.4): sequences crowd-control links on a single
//! target to maximise covered time without overlap gaps, DR-aware.

use crate::dr::{CcCategory, DrTracker};
use crate::ids::{EntityId, TimeMs};

pub const MIN_EXPECTED_DURATION_MS: u32 = 500;

#[derive(Debug, Clone, Copy)]
pub struct CcLink {
    pub caster: EntityId,
    pub category: CcCategory,
    pub spell_id: u32,
    pub base_duration_ms: u32,
    pub expected_duration_ms: u32,
    pub start_at: TimeMs,
}

#[derive(Debug, Default)]
pub struct CcChain {
    pub target: EntityId,
    pub links: Vec<CcLink>,
    pub success_count: u32,
    pub attempt_count: u32,
}

pub struct CCChainManager {
    overlap_window_ms: u64,
    active: Option<CcChain>,
}

impl CCChainManager {
    pub fn new(overlap_window_ms: u64) -> Self {
        Self { overlap_window_ms, active: None }
    }

    pub fn start_chain(&mut self, target: EntityId) {
        self.active = Some(CcChain { target, ..Default::default() });
    }

    /// Consider `category`/`spell_id` as the next link. Rejects (without
    /// consuming a DR application) candidates that would be sub-500ms or
    /// fully immune. Accepted links are scheduled to start `overlap_window_ms`
    /// before the previous link's expected end, to mask latency gaps.
    pub fn plan_next(
        &mut self,
        dr: &mut DrTracker,
        caster: EntityId,
        category: CcCategory,
        spell_id: u32,
        base_duration_ms: u32,
        now: TimeMs,
    ) -> Option<CcLink> {
        let target = self.active.as_ref()?.target;
        if dr.is_immune(target, category, now) {
            return None;
        }
        let peeked = dr.multiplier(target, category, now);
        let expected = (base_duration_ms as f32 * peeked) as u32;
        if expected < MIN_EXPECTED_DURATION_MS {
            return None;
        }
        dr.apply(target, category, now);

        let chain = self.active.as_mut().unwrap();
        let start_at = chain
            .links
            .last()
            .map(|l| l.start_at + l.expected_duration_ms as u64 - self.overlap_window_ms.min(l.expected_duration_ms as u64))
            .unwrap_or(now);
        let link = CcLink { caster, category, spell_id, base_duration_ms, expected_duration_ms: expected, start_at };
        chain.links.push(link);
        chain.attempt_count += 1;
        Some(link)
    }

    pub fn record_result(&mut self, success: bool) {
        if let Some(chain) = &mut self.active {
            if success {
                chain.success_count += 1;
            }
        }
    }

    pub fn success_rate(&self) -> f32 {
        self.active
            .as_ref()
            .filter(|c| c.attempt_count > 0)
            .map(|c| c.success_count as f32 / c.attempt_count as f32)
            .unwrap_or(0.0)
    }

    pub fn total_covered_ms(&self) -> u64 {
        self.active.as_ref().map(|c| c.links.iter().map(|l| l.expected_duration_ms as u64).sum()).unwrap_or(0)
    }

    pub fn active_chain(&self) -> Option<&CcChain> {
        self.active.as_ref()
    }

    pub fn finish_chain(&mut self) -> Option<CcChain> {
        self.active.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_rejects_links_that_would_be_immune() {
        let mut mgr = CCChainManager::new(300);
        let mut dr = DrTracker::new();
        mgr.start_chain(EntityId(1));

        assert!(mgr.plan_next(&mut dr, EntityId(10), CcCategory::Stun, 100, 4_000, 0).is_some());
        assert!(mgr.plan_next(&mut dr, EntityId(11), CcCategory::Stun, 101, 4_000, 100).is_some()); // 0.5x
        assert!(mgr.plan_next(&mut dr, EntityId(12), CcCategory::Stun, 102, 4_000, 200).is_some()); // 0.25x
        // Fourth application would be immune (0x) — rejected.
        assert!(mgr.plan_next(&mut dr, EntityId(13), CcCategory::Stun, 103, 4_000, 300).is_none());
    }

    #[test]
    fn sub_500ms_expected_duration_is_skipped() {
        let mut mgr = CCChainManager::new(300);
        let mut dr = DrTracker::new();
        mgr.start_chain(EntityId(1));
        dr.apply(EntityId(1), CcCategory::Root, 0); // stack -> One (0.5x)
        dr.apply(EntityId(1), CcCategory::Root, 10); // stack -> Two (0.25x)
        // base 1000ms * 0.25 = 250ms < 500ms threshold.
        assert!(mgr.plan_next(&mut dr, EntityId(2), CcCategory::Root, 200, 1_000, 20).is_none());
    }

    #[test]
    fn consecutive_links_overlap_by_the_configured_window() {
        let mut mgr = CCChainManager::new(300);
        let mut dr = DrTracker::new();
        mgr.start_chain(EntityId(1));
        let first = mgr.plan_next(&mut dr, EntityId(10), CcCategory::Stun, 1, 4_000, 0).unwrap();
        let second = mgr.plan_next(&mut dr, EntityId(11), CcCategory::Fear, 2, 4_000, 100).unwrap();
        assert_eq!(second.start_at, first.start_at + first.expected_duration_ms as u64 - 300);
    }
}
