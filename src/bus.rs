//! Group message bus: per-group priority queues with scoped delivery.
//!
//! One mutex guards the per-group map and each group's queue and subscriber
//! list (§4.2: "coarse but adequate at a few thousand messages/sec").

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use crate::claim::{ClaimCallback, ClaimResolver, ClaimStatus};
use crate::ids::{EntityId, GroupId, Role, SubGroup, TimeMs};
use crate::message::{Message, MessageKind, MessageKindClass, Scope};

/// Anything that wants to receive messages for a group it subscribed to.
pub trait MessageSubscriber: Send + Sync {
    fn agent_id(&self) -> EntityId;
    fn role(&self) -> Role;
    fn subgroup(&self) -> Option<SubGroup>;
    /// Empty mask subscribes to every kind, per §4.2 delivery filter #4.
    fn kinds(&self) -> &[MessageKind] {
        &[]
    }
    fn on_message(&self, message: &Message);
}

/// Composite priority key for the per-group max-heap: commands outrank
/// requests outrank announcements/claims of equal standing; within claims,
/// lower numeric claim-priority sorts first; ties break by older timestamp.
struct QueuedMessage {
    message: Message,
}

impl PartialEq for QueuedMessage {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
    }
}
impl Eq for QueuedMessage {}

impl QueuedMessage {
    fn sort_key(&self) -> (u8, i64, i64) {
        let class_rank = match self.message.kind.class() {
            MessageKindClass::Command => 3,
            MessageKindClass::Request => 2,
            MessageKindClass::Announcement => 1,
            MessageKindClass::Claim => 0,
        };
        // Heap is a max-heap: we want lower claim_priority values to compare
        // "greater" so they pop first, hence negate. Older timestamp should
        // also pop first among ties, hence negate timestamp too.
        (class_rank, -(self.message.claim_priority.0 as i64), -(self.message.created_at as i64))
    }
}

impl Ord for QueuedMessage {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.sort_key().cmp(&other.sort_key())
    }
}
impl PartialOrd for QueuedMessage {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

struct SubscriberEntry {
    subscriber: Arc<dyn MessageSubscriber>,
    role: Role,
    subgroup: Option<SubGroup>,
}

struct Group {
    queue: BinaryHeap<QueuedMessage>,
    subscribers: HashMap<EntityId, SubscriberEntry>,
    last_active: TimeMs,
}

impl Group {
    fn new(now: TimeMs) -> Self {
        Self { queue: BinaryHeap::new(), subscribers: HashMap::new(), last_active: now }
    }
}

pub struct MessageBus {
    max_queue_per_group: usize,
    groups: Mutex<HashMap<GroupId, Group>>,
    resolver: Arc<ClaimResolver>,
}

impl MessageBus {
    pub fn new(max_queue_per_group: usize, resolver: Arc<ClaimResolver>) -> Self {
        Self { max_queue_per_group, groups: Mutex::new(HashMap::new()), resolver }
    }

    pub fn subscribe(
        &self,
        subscriber: Arc<dyn MessageSubscriber>,
        group: GroupId,
        now: TimeMs,
    ) -> bool {
        let mut groups = self.groups.lock().unwrap();
        let role = subscriber.role();
        let subgroup = subscriber.subgroup();
        let id = subscriber.agent_id();
        let g = groups.entry(group).or_insert_with(|| Group::new(now));
        g.subscribers.insert(id, SubscriberEntry { subscriber, role, subgroup });
        g.last_active = now;
        true
    }

    pub fn unsubscribe(&self, agent: EntityId, group: Option<GroupId>) {
        let mut groups = self.groups.lock().unwrap();
        match group {
            Some(g) => {
                if let Some(group) = groups.get_mut(&g) {
                    group.subscribers.remove(&agent);
                }
            }
            None => {
                for group in groups.values_mut() {
                    group.subscribers.remove(&agent);
                }
            }
        }
        self.resolver.release_all(agent);
    }

    pub fn update_subscription(
        &self,
        agent: EntityId,
        group: GroupId,
        role: Role,
        subgroup: Option<SubGroup>,
    ) {
        let mut groups = self.groups.lock().unwrap();
        if let Some(g) = groups.get_mut(&group) {
            if let Some(entry) = g.subscribers.get_mut(&agent) {
                entry.role = role;
                entry.subgroup = subgroup;
            }
        }
    }

    /// Claims route through the resolver; every other kind enqueues
    /// directly on the named group's priority queue.
    pub fn publish(&self, message: Message, now: TimeMs) -> bool {
        if !message.is_valid() {
            log::warn!("dropping invalid message kind={:?}", message.kind);
            return false;
        }
        if message.kind.is_claim() {
            self.resolver.submit(&message, now, None);
            return true;
        }
        self.enqueue(message)
    }

    /// Delegates to the resolver with a continuation, per §4.2.
    pub fn publish_claim(
        &self,
        message: Message,
        now: TimeMs,
        callback: Arc<dyn ClaimCallback>,
    ) -> ClaimStatus {
        if !message.is_valid() {
            log::warn!("dropping invalid claim message");
            return ClaimStatus::Denied;
        }
        self.resolver.submit(&message, now, Some(callback))
    }

    pub fn send_direct(&self, mut message: Message, recipient: EntityId) -> bool {
        let mut groups = self.groups.lock().unwrap();
        let Some((_, group)) = groups.iter_mut().find(|(_, g)| g.subscribers.contains_key(&recipient)) else {
            log::warn!("send_direct: recipient {recipient} not found in any group");
            return false;
        };
        message.scope = Scope::Direct(recipient);
        if group.queue.len() >= self.max_queue_per_group {
            log::warn!("group queue full, dropping direct message to {recipient}");
            return false;
        }
        group.queue.push(QueuedMessage { message });
        true
    }

    fn enqueue(&self, message: Message) -> bool {
        let mut groups = self.groups.lock().unwrap();
        let Some(group) = groups.get_mut(&message.group) else {
            log::warn!("publish: group {} not found", message.group);
            return false;
        };
        if group.queue.len() >= self.max_queue_per_group {
            log::warn!("group {} queue full, dropping message", message.group);
            return false;
        }
        group.queue.push(QueuedMessage { message });
        true
    }

    /// Drains each group's priority queue up to `max_per_group`, delivering
    /// to subscribers per the scope filter. Returns the number of messages
    /// delivered (summed across all recipients, not messages popped).
    pub fn process(&self, max_per_group: usize, now: TimeMs) -> u32 {
        let mut groups = self.groups.lock().unwrap();
        let mut delivered = 0u32;

        for group in groups.values_mut() {
            for _ in 0..max_per_group {
                let Some(queued) = group.queue.pop() else { break };
                let message = queued.message;
                if message.is_expired(now) {
                    continue;
                }
                for entry in group.subscribers.values() {
                    if entry.subscriber.agent_id() == message.sender {
                        continue;
                    }
                    if !scope_matches(&message, entry) {
                        continue;
                    }
                    let kinds = entry.subscriber.kinds();
                    if !kinds.is_empty() && !kinds.contains(&message.kind) {
                        continue;
                    }
                    let subscriber = &entry.subscriber;
                    let result = catch_unwind(AssertUnwindSafe(|| subscriber.on_message(&message)));
                    if result.is_err() {
                        log::error!("message subscriber {} panicked", entry.subscriber.agent_id());
                    } else {
                        delivered += 1;
                    }
                }
            }
        }
        delivered
    }

    /// Drops groups with zero subscribers inactive past `threshold_seconds`.
    pub fn cleanup_inactive(&self, threshold_seconds: u64, now_seconds: u64) -> u32 {
        let mut groups = self.groups.lock().unwrap();
        let before = groups.len();
        groups.retain(|_, g| {
            !(g.subscribers.is_empty() && now_seconds.saturating_sub(g.last_active) > threshold_seconds)
        });
        (before - groups.len()) as u32
    }

    pub fn group_exists(&self, group: GroupId) -> bool {
        self.groups.lock().unwrap().contains_key(&group)
    }

    pub fn subscriber_count(&self, group: GroupId) -> usize {
        self.groups.lock().unwrap().get(&group).map(|g| g.subscribers.len()).unwrap_or(0)
    }
}

fn scope_matches(message: &Message, entry: &SubscriberEntry) -> bool {
    match message.scope {
        Scope::GroupBroadcast => true,
        Scope::RoleBroadcast(role) => entry.role == role,
        Scope::SubgroupBroadcast(sg) => entry.subgroup == Some(sg),
        Scope::Direct(id) => entry.subscriber.agent_id() == id,
        Scope::NearbyBroadcast(gate) => gate.is_none(),
    }
}
