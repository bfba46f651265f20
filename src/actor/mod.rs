//! Actor simulation step: combat-gated locomotion feeding the physics velocity.

use bevy::prelude::*;

use crate::animation::Animator;
use crate::physics::{ContactSignals, Velocity};
use crate::StepSet;

pub mod coordinator;
pub mod locomotion;

pub use coordinator::*;
pub use locomotion::*;

pub struct ActorPlugin;

impl Plugin for ActorPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (step_actors, face_sprites).chain().in_set(StepSet::Step),
        );
    }
}

/// Run each actor's coordinator step against last step's contacts
pub fn step_actors(
    mut query: Query<(
        Entity,
        &mut ActorCoordinator,
        &mut Animator,
        &mut Velocity,
        &ContactSignals,
    )>,
    time: Res<Time>,
) {
    let dt = time.delta_secs();

    for (entity, mut actor, mut animator, mut velocity, contacts) in &mut query {
        let facing = actor
            .locomotion()
            .map(LocomotionIntent::facing)
            .unwrap_or_default();
        let signals = contacts.relative_to(facing);

        let output = actor.step(dt, signals, velocity.0, &mut animator.params);
        velocity.0 = output.velocity;

        if output.invincibility_ended {
            debug!("{entity:?} is no longer invincible");
        }
    }
}

/// Mirror the sprite to match facing
pub fn face_sprites(mut query: Query<(&ActorCoordinator, &mut Transform)>) {
    for (actor, mut transform) in &mut query {
        let Some(locomotion) = actor.locomotion() else {
            continue;
        };
        let sign = locomotion.facing().sign();
        if transform.scale.x.signum() != sign {
            transform.scale.x = transform.scale.x.abs() * sign;
        }
    }
}
