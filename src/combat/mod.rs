//! Combat: health state, damage notification bus and the ECS entry points
//! (`DamageRequest` / `HealRequest`) that route hits to actors.

use bevy::prelude::*;

use crate::actor::ActorCoordinator;
use crate::animation::Animator;
use crate::StepSet;

pub mod bus;
pub mod error;
pub mod health;

pub use bus::*;
pub use error::*;
pub use health::*;

pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DamageEventBus>()
            .add_event::<DamageRequest>()
            .add_event::<HealRequest>()
            .add_event::<Healed>()
            .add_event::<DeathEvent>()
            .add_systems(
                Update,
                (process_damage_requests, process_heal_requests)
                    .chain()
                    .in_set(StepSet::Combat),
            );
    }
}

/// Request to damage an actor, sent by attackers
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct DamageRequest {
    pub target: Entity,
    pub amount: f32,
    pub knockback: Vec2,
    pub source: Option<Entity>,
}

/// Request to heal an actor, sent by pickups and similar
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct HealRequest {
    pub target: Entity,
    pub amount: f32,
}

/// Fired after a heal actually restored health
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct Healed {
    pub target: Entity,
    pub amount: f32,
}

/// Fired when an actor dies
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeathEvent {
    pub entity: Entity,
    pub killer: Option<Entity>,
}

/// Route damage requests through each target's coordinator
pub fn process_damage_requests(
    mut requests: EventReader<DamageRequest>,
    mut deaths: EventWriter<DeathEvent>,
    mut actors: Query<(&mut ActorCoordinator, &mut Animator)>,
    bus: Res<DamageEventBus>,
) {
    for request in requests.read() {
        let Ok((mut actor, mut animator)) = actors.get_mut(request.target) else {
            warn!("damage request for unknown actor {:?}", request.target);
            continue;
        };

        match actor.receive_damage(request, &mut animator.params, &bus) {
            Ok(HitOutcome::Killed) => {
                deaths.write(DeathEvent {
                    entity: request.target,
                    killer: request.source,
                });
            }
            Ok(HitOutcome::Hit) => {}
            Err(err) if err.is_state_rejection() => {
                debug!("{:?} ignored hit: {}", request.target, err);
            }
            Err(err) => {
                warn!("rejected damage request for {:?}: {}", request.target, err);
            }
        }
    }
}

pub fn process_heal_requests(
    mut requests: EventReader<HealRequest>,
    mut healed: EventWriter<Healed>,
    mut actors: Query<&mut ActorCoordinator>,
) {
    for request in requests.read() {
        let Ok(mut actor) = actors.get_mut(request.target) else {
            warn!("heal request for unknown actor {:?}", request.target);
            continue;
        };

        match actor.heal(request.amount) {
            Ok(amount) => {
                healed.write(Healed {
                    target: request.target,
                    amount,
                });
            }
            Err(err) if err.is_state_rejection() => {
                debug!("{:?} ignored heal: {}", request.target, err);
            }
            Err(err) => {
                warn!("rejected heal request for {:?}: {}", request.target, err);
            }
        }
    }
}
