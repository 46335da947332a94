use std::sync::Arc;

use botcoord_core::bus::{MessageBus, MessageSubscriber};
use botcoord_core::claim::ClaimResolver;
use botcoord_core::event::{CombatEvent, EventKindMask};
use botcoord_core::ids::{EntityId, GroupId, Role};
use botcoord_core::message::{Message, MessageBuilder, MessageIdGen, MessageKind};
use botcoord_core::router::{EventRouter, EventSubscriber, OverflowPolicy};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

struct NoopEventSubscriber(EntityId);

impl EventSubscriber for NoopEventSubscriber {
    fn subscriber_id(&self) -> EntityId {
        self.0
    }

    fn on_event(&self, event: &CombatEvent) {
        black_box(event);
    }
}

struct NoopMessageSubscriber(EntityId);

impl MessageSubscriber for NoopMessageSubscriber {
    fn agent_id(&self) -> EntityId {
        self.0
    }

    fn role(&self) -> Role {
        Role::Dps
    }

    fn subgroup(&self) -> Option<botcoord_core::ids::SubGroup> {
        None
    }

    fn on_message(&self, message: &Message) {
        black_box(message);
    }
}

/// This benchmark measures router fan-out cost with a realistic subscriber
/// count for a 40-player raid.
fn router_dispatch_benchmark(c: &mut Criterion) {
    let router = EventRouter::new(10_000, OverflowPolicy::DropOldest);
    for i in 0..40 {
        router.subscribe(Arc::new(NoopEventSubscriber(EntityId(i))), EventKindMask::all());
    }

    c.bench_function("router dispatch to 40 subscribers", |b| {
        b.iter(|| {
            router.dispatch(CombatEvent::damage(0, EntityId(1), EntityId(2), 100.0));
        })
    });
}

/// This benchmark measures message-bus publish+process cost for a single
/// group at five-man party scale.
fn bus_publish_and_process_benchmark(c: &mut Criterion) {
    let resolver = Arc::new(ClaimResolver::new(200));
    let bus = MessageBus::new(1_000, resolver);
    let group: GroupId = EntityId(1);
    let ids = MessageIdGen::default();

    for i in 0..5 {
        bus.subscribe(Arc::new(NoopMessageSubscriber(EntityId(i))), group, 0);
    }

    c.bench_function("bus publish+process for a 5-agent group", |b| {
        b.iter(|| {
            let msg: Message = MessageBuilder::new(&ids, MessageKind::AnnounceObjectiveStatus, EntityId(1), group, 0).build();
            bus.publish(msg, 0);
            bus.process(64, 0);
        })
    });
}

criterion_group!(benches, router_dispatch_benchmark, bus_publish_and_process_benchmark);
criterion_main!(benches);
