//! Damage notification channel.
//!
//! One bus instance is inserted as a resource and shared by every actor. Subscribers
//! are either scoped to a single actor (hit reactions owned by that actor) or global
//! (UI, audio). `publish` delivers synchronously in subscription order and isolates
//! failing subscribers from each other and from the publisher.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use bevy::prelude::*;
use parking_lot::Mutex;

use super::error::ObserverError;

/// An accepted hit, delivered once to every matching subscriber
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageEvent {
    /// Actor that took the damage
    pub actor: Entity,
    pub amount: f32,
    pub knockback: Vec2,
    /// Attacker, when known
    pub source: Option<Entity>,
    pub lethal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

/// Which events a subscriber receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberScope {
    /// Only hits on this actor
    Actor(Entity),
    /// Every hit on every actor
    Global,
}

impl SubscriberScope {
    pub fn accepts(&self, event: &DamageEvent) -> bool {
        match self {
            SubscriberScope::Actor(actor) => *actor == event.actor,
            SubscriberScope::Global => true,
        }
    }
}

/// Handed to a subscriber while it runs, so it can detach itself mid-publish
pub struct Delivery<'a> {
    bus: &'a DamageEventBus,
    handle: SubscriptionHandle,
}

impl Delivery<'_> {
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle
    }

    pub fn bus(&self) -> &DamageEventBus {
        self.bus
    }

    pub fn unsubscribe_self(&self) -> bool {
        self.bus.unsubscribe(self.handle)
    }
}

type Handler = Arc<dyn Fn(&DamageEvent, &Delivery) -> Result<(), ObserverError> + Send + Sync>;

struct Subscriber {
    handle: SubscriptionHandle,
    scope: SubscriberScope,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

/// Outcome of one publish pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub faults: usize,
}

#[derive(Resource, Clone, Default)]
pub struct DamageEventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl DamageEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, scope: SubscriberScope, handler: F) -> SubscriptionHandle
    where
        F: Fn(&DamageEvent, &Delivery) -> Result<(), ObserverError> + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let handle = SubscriptionHandle(inner.next_id);
        inner.subscribers.push(Subscriber {
            handle,
            scope,
            handler: Arc::new(handler),
        });
        debug!("damage bus: subscribed {:?} ({:?})", handle, scope);
        handle
    }

    pub fn subscribe_global<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(&DamageEvent, &Delivery) -> Result<(), ObserverError> + Send + Sync + 'static,
    {
        self.subscribe(SubscriberScope::Global, handler)
    }

    pub fn subscribe_actor<F>(&self, actor: Entity, handler: F) -> SubscriptionHandle
    where
        F: Fn(&DamageEvent, &Delivery) -> Result<(), ObserverError> + Send + Sync + 'static,
    {
        self.subscribe(SubscriberScope::Actor(actor), handler)
    }

    /// Subscribe and get a guard that unsubscribes when dropped
    pub fn subscribe_scoped<F>(&self, scope: SubscriberScope, handler: F) -> Subscription
    where
        F: Fn(&DamageEvent, &Delivery) -> Result<(), ObserverError> + Send + Sync + 'static,
    {
        let handle = self.subscribe(scope, handler);
        Subscription {
            bus: self.clone(),
            handle,
        }
    }

    /// Returns false if the handle was not (or no longer) subscribed
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|s| s.handle != handle);
        let removed = inner.subscribers.len() != before;
        if removed {
            debug!("damage bus: unsubscribed {:?}", handle);
        }
        removed
    }

    /// Drop every actor-scoped subscriber of `actor`, e.g. when it despawns
    pub fn unsubscribe_actor(&self, actor: Entity) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.subscribers.len();
        inner
            .subscribers
            .retain(|s| s.scope != SubscriberScope::Actor(actor));
        before - inner.subscribers.len()
    }

    pub fn is_subscribed(&self, handle: SubscriptionHandle) -> bool {
        self.inner.lock().subscribers.iter().any(|s| s.handle == handle)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Deliver `event` to every matching subscriber before returning.
    ///
    /// The subscriber list is snapshotted first and the lock released, so handlers may
    /// subscribe, unsubscribe or publish re-entrantly. A subscriber removed during the
    /// pass is skipped for the rest of it; one added during the pass is not visited.
    pub fn publish(&self, event: &DamageEvent) -> PublishReport {
        let snapshot: Vec<(SubscriptionHandle, Handler)> = {
            let inner = self.inner.lock();
            inner
                .subscribers
                .iter()
                .filter(|s| s.scope.accepts(event))
                .map(|s| (s.handle, Arc::clone(&s.handler)))
                .collect()
        };

        let mut report = PublishReport::default();
        for (handle, handler) in snapshot {
            if !self.is_subscribed(handle) {
                continue;
            }

            let delivery = Delivery { bus: self, handle };
            let result = catch_unwind(AssertUnwindSafe(|| handler(event, &delivery)));
            report.delivered += 1;

            match result {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    report.faults += 1;
                    error!("damage bus: subscriber {:?} failed: {}", handle, err);
                }
                Err(_) => {
                    report.faults += 1;
                    error!("damage bus: subscriber {:?} panicked", handle);
                }
            }
        }
        report
    }
}

/// Scoped subscription: acquired on activation, released on drop
pub struct Subscription {
    bus: DamageEventBus,
    handle: SubscriptionHandle,
}

impl Subscription {
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event_for(actor: Entity, amount: f32) -> DamageEvent {
        DamageEvent {
            actor,
            amount,
            knockback: Vec2::ZERO,
            source: None,
            lethal: false,
        }
    }

    fn recorder(
        log: &Arc<Mutex<Vec<(&'static str, f32)>>>,
        name: &'static str,
    ) -> impl Fn(&DamageEvent, &Delivery) -> Result<(), ObserverError> + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |event: &DamageEvent, _: &Delivery| {
            log.lock().push((name, event.amount));
            Ok(())
        }
    }

    // ==================== Delivery Tests ====================

    #[test]
    fn test_publish_reaches_all_global_subscribers_in_order() {
        let bus = DamageEventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe_global(recorder(&log, "a"));
        bus.subscribe_global(recorder(&log, "b"));
        bus.subscribe_global(recorder(&log, "c"));

        let report = bus.publish(&event_for(Entity::from_raw(1), 30.0));

        assert_eq!(report, PublishReport { delivered: 3, faults: 0 });
        assert_eq!(*log.lock(), vec![("a", 30.0), ("b", 30.0), ("c", 30.0)]);
    }

    #[test]
    fn test_actor_scope_filters_other_actors() {
        let bus = DamageEventBus::new();
        let player = Entity::from_raw(1);
        let enemy = Entity::from_raw(2);
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe_actor(player, recorder(&log, "player"));
        bus.subscribe_global(recorder(&log, "ui"));

        bus.publish(&event_for(enemy, 5.0));
        bus.publish(&event_for(player, 7.0));

        assert_eq!(*log.lock(), vec![("ui", 5.0), ("player", 7.0), ("ui", 7.0)]);
    }

    #[test]
    fn test_publish_with_no_subscribers() {
        let bus = DamageEventBus::new();
        let report = bus.publish(&event_for(Entity::from_raw(3), 1.0));
        assert_eq!(report, PublishReport::default());
    }

    // ==================== Fault Isolation Tests ====================

    #[test]
    fn test_failing_subscriber_does_not_block_others() {
        let bus = DamageEventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe_global(|_, _| Err(ObserverError::new("boom")));
        bus.subscribe_global(recorder(&log, "after"));

        let report = bus.publish(&event_for(Entity::from_raw(1), 10.0));

        assert_eq!(report, PublishReport { delivered: 2, faults: 1 });
        assert_eq!(*log.lock(), vec![("after", 10.0)]);
    }

    #[test]
    fn test_panicking_subscriber_is_isolated() {
        let bus = DamageEventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe_global(|_, _| panic!("observer bug"));
        let counter = Arc::clone(&count);
        bus.subscribe_global(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let report = bus.publish(&event_for(Entity::from_raw(1), 10.0));

        assert_eq!(report.faults, 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        // Bus is still usable afterwards
        assert_eq!(bus.subscriber_count(), 2);
    }

    // ==================== Subscription Lifecycle Tests ====================

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = DamageEventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handle = bus.subscribe_global(recorder(&log, "a"));

        assert!(bus.unsubscribe(handle));
        assert!(!bus.unsubscribe(handle));
        bus.publish(&event_for(Entity::from_raw(1), 10.0));

        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_scoped_subscription_released_on_drop() {
        let bus = DamageEventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let guard = bus.subscribe_scoped(SubscriberScope::Global, recorder(&log, "ui"));
            assert!(bus.is_subscribed(guard.handle()));
            bus.publish(&event_for(Entity::from_raw(1), 1.0));
        }
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(&event_for(Entity::from_raw(1), 2.0));

        assert_eq!(*log.lock(), vec![("ui", 1.0)]);
    }

    #[test]
    fn test_unsubscribe_actor_removes_only_that_actor() {
        let bus = DamageEventBus::new();
        let a = Entity::from_raw(1);
        let b = Entity::from_raw(2);
        bus.subscribe_actor(a, |_, _| Ok(()));
        bus.subscribe_actor(a, |_, _| Ok(()));
        bus.subscribe_actor(b, |_, _| Ok(()));
        bus.subscribe_global(|_, _| Ok(()));

        assert_eq!(bus.unsubscribe_actor(a), 2);
        assert_eq!(bus.subscriber_count(), 2);
    }

    // ==================== Re-entrancy Tests ====================

    #[test]
    fn test_self_unsubscribe_during_publish() {
        let bus = DamageEventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first_log = Arc::clone(&log);
        bus.subscribe_global(move |event, delivery| {
            first_log.lock().push(("once", event.amount));
            delivery.unsubscribe_self();
            Ok(())
        });
        bus.subscribe_global(recorder(&log, "steady"));

        let report = bus.publish(&event_for(Entity::from_raw(1), 1.0));
        bus.publish(&event_for(Entity::from_raw(1), 2.0));

        assert_eq!(report.faults, 0);
        assert_eq!(
            *log.lock(),
            vec![("once", 1.0), ("steady", 1.0), ("steady", 2.0)]
        );
    }

    #[test]
    fn test_subscriber_removed_mid_pass_is_skipped() {
        let bus = DamageEventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let victim = Arc::new(Mutex::new(None::<SubscriptionHandle>));

        let target = Arc::clone(&victim);
        bus.subscribe_global(move |_, delivery| {
            if let Some(handle) = *target.lock() {
                delivery.bus().unsubscribe(handle);
            }
            Ok(())
        });
        let handle = bus.subscribe_global(recorder(&log, "victim"));
        *victim.lock() = Some(handle);

        let report = bus.publish(&event_for(Entity::from_raw(1), 4.0));

        assert_eq!(report.delivered, 1);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_subscriber_added_mid_pass_waits_for_next_publish() {
        let bus = DamageEventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let late_log = Arc::clone(&log);
        bus.subscribe_global(move |_, delivery| {
            let log = Arc::clone(&late_log);
            delivery.bus().subscribe_global(move |event, _| {
                log.lock().push(("late", event.amount));
                Ok(())
            });
            delivery.unsubscribe_self();
            Ok(())
        });

        bus.publish(&event_for(Entity::from_raw(1), 1.0));
        assert!(log.lock().is_empty());

        bus.publish(&event_for(Entity::from_raw(1), 2.0));
        assert_eq!(*log.lock(), vec![("late", 2.0)]);
    }
}
