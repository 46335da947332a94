//! Bot-to-bot message envelope.
//!
//! Kinds fall into four disjoint families — claims, announcements, requests,
//! commands — and only claims participate in the resolver (`crate::claim`).

use crate::ids::{EntityId, Role, SubGroup, TimeMs};

/// Priority participating claims compete on. Lower numeric value wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClaimPriority(pub u8);

impl ClaimPriority {
    pub const CRITICAL: ClaimPriority = ClaimPriority(0);
    pub const HIGH: ClaimPriority = ClaimPriority(10);
    pub const MEDIUM: ClaimPriority = ClaimPriority(20);
    pub const LOW: ClaimPriority = ClaimPriority(30);
}

/// Delivery scope: selects the filter the bus applies at dequeue time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scope {
    GroupBroadcast,
    RoleBroadcast(Role),
    SubgroupBroadcast(SubGroup),
    Direct(EntityId),
    /// Distance-gated broadcast. `None` means ungated (delivers to all, same
    /// as `GroupBroadcast`) — the core has no positional data of its own, so
    /// the gate is supplied by the caller as a precomputed distance.
    NearbyBroadcast(Option<f32>),
}

/// The four message families. Only `Claim` participates in resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageKindClass {
    Command,
    Request,
    Announcement,
    Claim,
}

/// Specific message kinds. Each maps to exactly one `MessageKindClass` via
/// `class()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    // Claims
    ClaimInterrupt,
    ClaimDispel,
    ClaimExternalShield,
    ClaimCrowdControl,
    // Announcements
    AnnounceBurstWindow,
    AnnounceCooldownReady,
    AnnounceTargetSwitch,
    AnnounceObjectiveStatus,
    // Requests
    RequestExternalCooldown,
    RequestPeel,
    RequestDispel,
    RequestRezPriority,
    // Commands
    CommandFocusTarget,
    CommandSwitchTarget,
    CommandRegroup,
    CommandRetreat,
}

impl MessageKind {
    pub fn class(self) -> MessageKindClass {
        use MessageKind::*;
        match self {
            ClaimInterrupt | ClaimDispel | ClaimExternalShield | ClaimCrowdControl => {
                MessageKindClass::Claim
            }
            AnnounceBurstWindow | AnnounceCooldownReady | AnnounceTargetSwitch
            | AnnounceObjectiveStatus => MessageKindClass::Announcement,
            RequestExternalCooldown | RequestPeel | RequestDispel | RequestRezPriority => {
                MessageKindClass::Request
            }
            CommandFocusTarget | CommandSwitchTarget | CommandRegroup | CommandRetreat => {
                MessageKindClass::Command
            }
        }
    }

    pub fn is_claim(self) -> bool {
        self.class() == MessageKindClass::Claim
    }

    /// Kind-specific default expiry: 200ms for claims, 1-10s otherwise.
    pub fn default_expiry_ms(self) -> u64 {
        use MessageKind::*;
        match self {
            ClaimInterrupt | ClaimDispel | ClaimExternalShield | ClaimCrowdControl => 200,
            AnnounceBurstWindow => 10_000,
            AnnounceCooldownReady => 2_000,
            AnnounceTargetSwitch => 3_000,
            AnnounceObjectiveStatus => 5_000,
            RequestExternalCooldown => 2_000,
            RequestPeel => 5_000,
            RequestDispel => 1_000,
            RequestRezPriority => 10_000,
            CommandFocusTarget => 10_000,
            CommandSwitchTarget => 5_000,
            CommandRegroup => 10_000,
            CommandRetreat => 5_000,
        }
    }
}

/// A bot-to-bot message envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Message {
    pub id: u64,
    pub kind: MessageKind,
    pub scope: Scope,
    pub sender: EntityId,
    pub group: EntityId,
    pub created_at: TimeMs,
    pub expiry: TimeMs,
    pub claim_priority: ClaimPriority,
    pub target: EntityId,
    pub spell_id: u32,
    pub aura_id: u32,
    pub duration_ms: u32,
    pub value: f32,
    pub position: Option<(f32, f32)>,
    pub target_role: Option<Role>,
    pub target_subgroup: Option<SubGroup>,
}

impl Message {
    /// Validity check applied at `publish`/`submit`: no sender, unknown
    /// kind (not representable, so this only checks zero timestamp/sender),
    /// or zero timestamp is `InvalidMessage` per §7.
    pub fn is_valid(&self) -> bool {
        !self.sender.is_empty()
    }

    pub fn is_expired(&self, now: TimeMs) -> bool {
        now >= self.expiry
    }

    pub fn claim_key(&self) -> Option<crate::claim::ClaimKey> {
        self.kind.is_claim().then(|| {
            let id = if self.spell_id != 0 { self.spell_id } else { self.aura_id };
            crate::claim::ClaimKey { kind: self.kind, target: self.target, spell_or_aura_id: id }
        })
    }
}

/// Monotonic id generator for `Message::id`. One per `CoordinationCore`.
#[derive(Default)]
pub struct MessageIdGen(std::sync::atomic::AtomicU64);

impl MessageIdGen {
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
    }
}

/// Builder with kind-appropriate defaults, mirroring the spec's "factories
/// exist per-kind with reasonable defaults".
pub struct MessageBuilder {
    msg: Message,
}

impl MessageBuilder {
    pub fn new(ids: &MessageIdGen, kind: MessageKind, sender: EntityId, group: EntityId, now: TimeMs) -> Self {
        let expiry = now + kind.default_expiry_ms();
        Self {
            msg: Message {
                id: ids.next(),
                kind,
                scope: Scope::GroupBroadcast,
                sender,
                group,
                created_at: now,
                expiry,
                claim_priority: ClaimPriority::MEDIUM,
                target: EntityId::EMPTY,
                spell_id: 0,
                aura_id: 0,
                duration_ms: 0,
                value: 0.0,
                position: None,
                target_role: None,
                target_subgroup: None,
            },
        }
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.msg.scope = scope;
        self
    }
    pub fn target(mut self, target: EntityId) -> Self {
        self.msg.target = target;
        self
    }
    pub fn spell_id(mut self, id: u32) -> Self {
        self.msg.spell_id = id;
        self
    }
    pub fn aura_id(mut self, id: u32) -> Self {
        self.msg.aura_id = id;
        self
    }
    pub fn priority(mut self, priority: ClaimPriority) -> Self {
        self.msg.claim_priority = priority;
        self
    }
    pub fn value(mut self, value: f32) -> Self {
        self.msg.value = value;
        self
    }
    pub fn position(mut self, pos: (f32, f32)) -> Self {
        self.msg.position = Some(pos);
        self
    }
    pub fn expiry_ms(mut self, ms: u64) -> Self {
        self.msg.expiry = self.msg.created_at + ms;
        self
    }

    pub fn build(self) -> Message {
        self.msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_key_falls_back_to_aura_id() {
        let ids = MessageIdGen::default();
        let msg = MessageBuilder::new(&ids, MessageKind::ClaimDispel, EntityId(1), EntityId(2), 0)
            .target(EntityId(3))
            .aura_id(55)
            .build();
        let key = msg.claim_key().unwrap();
        assert_eq!(key.spell_or_aura_id, 55);
    }

    #[test]
    fn non_claim_has_no_claim_key() {
        let ids = MessageIdGen::default();
        let msg = MessageBuilder::new(&ids, MessageKind::CommandRegroup, EntityId(1), EntityId(2), 0).build();
        assert!(msg.claim_key().is_none());
    }

    #[test]
    fn invalid_message_has_no_sender() {
        let ids = MessageIdGen::default();
        let mut msg = MessageBuilder::new(&ids, MessageKind::CommandRegroup, EntityId(1), EntityId(2), 0).build();
        assert!(msg.is_valid());
        msg.sender = EntityId::EMPTY;
        assert!(!msg.is_valid());
    }

    #[test]
    fn expiry_is_kind_specific() {
        let ids = MessageIdGen::default();
        let claim = MessageBuilder::new(&ids, MessageKind::ClaimInterrupt, EntityId(1), EntityId(2), 1_000).build();
        assert_eq!(claim.expiry, 1_200);
    }
}
