//! Minimal kinematic physics: gravity, friction, integration, box collision and the
//! ground/wall contact flags the actors read on their next step.

use bevy::prelude::*;

use crate::actor::{EnvironmentSignals, Facing};
use crate::animation::Animator;
use crate::config::GameConfig;
use crate::level::BoxCollider;
use crate::StepSet;

/// Contact tolerance for ground and wall probes
const SKIN: f32 = 0.05;
/// Overlap below this along the other axis does not count (resting corners)
const EDGE: f32 = 0.01;

pub struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                apply_gravity,
                apply_ground_friction,
                apply_velocity,
                resolve_level_collisions,
                detect_contacts,
            )
                .chain()
                .in_set(StepSet::Physics),
        );
    }
}

#[derive(Component, Default, Clone, Copy, Debug)]
pub struct Velocity(pub Vec2);

/// Axis-aligned collision box of a moving body
#[derive(Component, Clone, Copy, Debug)]
pub struct Body {
    pub half_extents: Vec2,
}

/// Raw contact flags, refreshed once per step after collision resolution
#[derive(Component, Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContactSignals {
    pub grounded: bool,
    pub wall_left: bool,
    pub wall_right: bool,
}

impl ContactSignals {
    /// Wall contact only counts in the direction the actor faces
    pub fn relative_to(&self, facing: Facing) -> EnvironmentSignals {
        let wall_contact = match facing {
            Facing::Left => self.wall_left,
            Facing::Right => self.wall_right,
        };
        EnvironmentSignals {
            ground_contact: self.grounded,
            wall_contact,
        }
    }
}

/// Ground friction on horizontal speed
pub fn apply_friction(velocity_x: f32, friction: f32, stop_speed: f32, dt: f32) -> f32 {
    let speed = velocity_x.abs();

    if speed < 0.1 {
        return 0.0;
    }

    let control = speed.max(stop_speed);
    let drop = control * friction * dt;
    let new_speed = (speed - drop).max(0.0);

    new_speed * velocity_x.signum()
}

/// Push a body out of a collider along the axis of least penetration.
/// Returns the corrected position and velocity, or None if they do not overlap.
pub fn resolve_overlap(
    position: Vec2,
    half_extents: Vec2,
    velocity: Vec2,
    collider_pos: Vec2,
    collider_half: Vec2,
) -> Option<(Vec2, Vec2)> {
    let diff = position - collider_pos;
    let combined = half_extents + collider_half;

    if diff.x.abs() >= combined.x || diff.y.abs() >= combined.y {
        return None;
    }

    let pen_x = combined.x - diff.x.abs();
    let pen_y = combined.y - diff.y.abs();

    let mut position = position;
    let mut velocity = velocity;

    if pen_y <= pen_x {
        if diff.y > 0.0 {
            // Landed on top
            position.y = collider_pos.y + combined.y;
            velocity.y = velocity.y.max(0.0);
        } else {
            // Head bump
            position.y = collider_pos.y - combined.y;
            velocity.y = velocity.y.min(0.0);
        }
    } else if diff.x > 0.0 {
        position.x = collider_pos.x + combined.x;
        velocity.x = velocity.x.max(0.0);
    } else {
        position.x = collider_pos.x - combined.x;
        velocity.x = velocity.x.min(0.0);
    }

    Some((position, velocity))
}

/// Probe ground and side walls around a body
pub fn probe_contacts(
    position: Vec2,
    half_extents: Vec2,
    velocity_y: f32,
    colliders: impl IntoIterator<Item = (Vec2, Vec2)>,
) -> ContactSignals {
    let mut contacts = ContactSignals::default();

    for (collider_pos, collider_half) in colliders {
        let diff = position - collider_pos;
        let combined = half_extents + collider_half;

        let horizontal_overlap = diff.x.abs() < combined.x - EDGE;
        let vertical_overlap = diff.y.abs() < combined.y - EDGE;

        let feet = position.y - half_extents.y;
        let top = collider_pos.y + collider_half.y;
        if horizontal_overlap && (feet - top).abs() <= SKIN && velocity_y <= 0.1 {
            contacts.grounded = true;
        }

        if vertical_overlap {
            let right_gap = (collider_pos.x - collider_half.x) - (position.x + half_extents.x);
            let left_gap = (position.x - half_extents.x) - (collider_pos.x + collider_half.x);
            if right_gap.abs() <= SKIN {
                contacts.wall_right = true;
            }
            if left_gap.abs() <= SKIN {
                contacts.wall_left = true;
            }
        }
    }

    contacts
}

pub fn apply_gravity(
    mut query: Query<(&mut Velocity, &ContactSignals)>,
    config: Res<GameConfig>,
    time: Res<Time>,
) {
    let dt = time.delta_secs();

    for (mut velocity, contacts) in &mut query {
        if !contacts.grounded {
            velocity.0.y -= config.locomotion.gravity * dt;
        }
    }
}

/// Friction only acts when locomotion is not driving velocity (knockback slides)
pub fn apply_ground_friction(
    mut query: Query<(&mut Velocity, &ContactSignals, Option<&Animator>)>,
    config: Res<GameConfig>,
    time: Res<Time>,
) {
    let dt = time.delta_secs();

    for (mut velocity, contacts, animator) in &mut query {
        let sliding = animator.is_none_or(|a| a.params.velocity_locked());
        if contacts.grounded && sliding {
            velocity.0.x = apply_friction(
                velocity.0.x,
                config.locomotion.friction,
                config.locomotion.stop_speed,
                dt,
            );
        }
    }
}

pub fn apply_velocity(mut query: Query<(&mut Transform, &Velocity)>, time: Res<Time>) {
    let dt = time.delta_secs();

    for (mut transform, velocity) in &mut query {
        transform.translation += velocity.0.extend(0.0) * dt;
    }
}

pub fn resolve_level_collisions(
    mut bodies: Query<(&mut Transform, &mut Velocity, &Body)>,
    level: Query<(&Transform, &BoxCollider), Without<Body>>,
) {
    for (mut transform, mut velocity, body) in &mut bodies {
        for (collider_transform, collider) in &level {
            let resolved = resolve_overlap(
                transform.translation.truncate(),
                body.half_extents,
                velocity.0,
                collider_transform.translation.truncate(),
                collider.half_extents,
            );

            if let Some((position, new_velocity)) = resolved {
                transform.translation.x = position.x;
                transform.translation.y = position.y;
                velocity.0 = new_velocity;
            }
        }
    }
}

pub fn detect_contacts(
    mut bodies: Query<(&Transform, &Velocity, &Body, &mut ContactSignals)>,
    level: Query<(&Transform, &BoxCollider), Without<Body>>,
) {
    for (transform, velocity, body, mut contacts) in &mut bodies {
        let probed = probe_contacts(
            transform.translation.truncate(),
            body.half_extents,
            velocity.0.y,
            level
                .iter()
                .map(|(t, c)| (t.translation.truncate(), c.half_extents)),
        );
        if *contacts != probed {
            *contacts = probed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{ActionStateMachine, BoolParam};
    use crate::config::AnimationTimings;
    use std::time::Duration;

    const EPSILON: f32 = 0.0001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn vec2_approx_eq(a: Vec2, b: Vec2) -> bool {
        approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
    }

    const BODY: Vec2 = Vec2::new(0.4, 0.9);
    const FLOOR_POS: Vec2 = Vec2::new(0.0, -0.5);
    const FLOOR_HALF: Vec2 = Vec2::new(20.0, 0.5);

    // ==================== Friction Tests ====================

    #[test]
    fn test_friction_reduces_speed_and_keeps_direction() {
        let result = apply_friction(-6.0, 5.0, 1.8, 0.016);

        assert!(result < 0.0);
        assert!(result.abs() < 6.0);
    }

    #[test]
    fn test_friction_stops_slow_movement() {
        assert!(approx_eq(apply_friction(0.05, 5.0, 1.8, 0.016), 0.0));
        assert!(approx_eq(apply_friction(0.0, 5.0, 1.8, 0.016), 0.0));
    }

    // ==================== Collision Tests ====================

    #[test]
    fn test_landing_pushes_up_and_stops_fall() {
        let position = Vec2::new(0.0, 0.85);
        let resolved = resolve_overlap(position, BODY, Vec2::new(2.0, -5.0), FLOOR_POS, FLOOR_HALF);

        let (position, velocity) = resolved.unwrap();
        assert!(vec2_approx_eq(position, Vec2::new(0.0, 0.9)));
        assert!(vec2_approx_eq(velocity, Vec2::new(2.0, 0.0)));
    }

    #[test]
    fn test_side_hit_pushes_out_horizontally() {
        let wall_pos = Vec2::new(5.0, 3.0);
        let wall_half = Vec2::new(0.5, 3.0);
        let position = Vec2::new(4.2, 1.0);

        let (position, velocity) =
            resolve_overlap(position, BODY, Vec2::new(4.0, 0.0), wall_pos, wall_half).unwrap();

        assert!(approx_eq(position.x, 4.1));
        assert!(approx_eq(velocity.x, 0.0));
    }

    #[test]
    fn test_separated_boxes_do_not_resolve() {
        let resolved =
            resolve_overlap(Vec2::new(0.0, 5.0), BODY, Vec2::ZERO, FLOOR_POS, FLOOR_HALF);
        assert!(resolved.is_none());
    }

    // ==================== Contact Probe Tests ====================

    #[test]
    fn test_resting_on_floor_is_grounded_without_walls() {
        let contacts = probe_contacts(Vec2::new(0.0, 0.9), BODY, 0.0, [(FLOOR_POS, FLOOR_HALF)]);

        assert_eq!(
            contacts,
            ContactSignals {
                grounded: true,
                wall_left: false,
                wall_right: false
            }
        );
    }

    #[test]
    fn test_rising_body_is_not_grounded() {
        let contacts = probe_contacts(Vec2::new(0.0, 0.9), BODY, 5.0, [(FLOOR_POS, FLOOR_HALF)]);
        assert!(!contacts.grounded);
    }

    #[test]
    fn test_wall_probe_is_per_side() {
        let wall_pos = Vec2::new(5.0, 3.0);
        let wall_half = Vec2::new(0.5, 3.0);
        let touching = Vec2::new(4.1, 0.9);

        let contacts = probe_contacts(
            touching,
            BODY,
            0.0,
            [(FLOOR_POS, FLOOR_HALF), (wall_pos, wall_half)],
        );

        assert!(contacts.grounded);
        assert!(contacts.wall_right);
        assert!(!contacts.wall_left);
    }

    #[test]
    fn test_relative_signals_follow_facing() {
        let contacts = ContactSignals {
            grounded: true,
            wall_left: false,
            wall_right: true,
        };

        assert!(contacts.relative_to(Facing::Right).wall_contact);
        assert!(!contacts.relative_to(Facing::Left).wall_contact);
        assert!(contacts.relative_to(Facing::Left).ground_contact);
    }

    // ==================== System Tests ====================

    fn spawn_sliding(app: &mut App, grounded: bool, velocity_locked: bool) -> Entity {
        let mut animator =
            Animator::new(ActionStateMachine::with_default_hooks(&AnimationTimings::default()));
        animator.params.set_bool(BoolParam::LockVelocity, velocity_locked);

        app.world_mut()
            .spawn((
                Velocity(Vec2::new(6.0, 0.0)),
                ContactSignals {
                    grounded,
                    ..default()
                },
                animator,
            ))
            .id()
    }

    #[test]
    fn test_friction_only_slows_locked_grounded_bodies() {
        let mut app = App::new();
        app.insert_resource(GameConfig::default())
            .init_resource::<Time>()
            .add_systems(Update, apply_ground_friction);
        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(0.1));

        let sliding = spawn_sliding(&mut app, true, true);
        let walking = spawn_sliding(&mut app, true, false);
        let airborne = spawn_sliding(&mut app, false, true);

        app.update();

        let expected = apply_friction(6.0, 5.0, 1.8, 0.1);
        assert!(expected < 6.0);
        let velocity_x = |entity: Entity| app.world().get::<Velocity>(entity).unwrap().0.x;
        assert!(approx_eq(velocity_x(sliding), expected));
        assert!(approx_eq(velocity_x(walking), 6.0));
        assert!(approx_eq(velocity_x(airborne), 6.0));
    }

    #[test]
    fn test_detect_contacts_system_updates_component() {
        let mut app = App::new();
        app.add_systems(Update, detect_contacts);
        app.world_mut().spawn((
            Transform::from_translation(FLOOR_POS.extend(0.0)),
            BoxCollider {
                half_extents: FLOOR_HALF,
            },
        ));
        let body = app
            .world_mut()
            .spawn((
                Transform::from_xyz(0.0, 0.9, 0.0),
                Velocity::default(),
                Body { half_extents: BODY },
                ContactSignals::default(),
            ))
            .id();

        app.update();

        let contacts = app.world().get::<ContactSignals>(body).unwrap();
        assert!(contacts.grounded);
    }
}
