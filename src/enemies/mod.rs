//! Enemy AI and spawning: wall-to-wall patrol, target detection and melee attacks

use std::collections::HashSet;

use bevy::prelude::*;

use crate::actor::{ActorCoordinator, LocomotionIntent};
use crate::animation::{ActionState, ActionStateMachine, Animator, BoolParam};
use crate::combat::{DamageEventBus, DamageRequest, DeathEvent, HealthState};
use crate::config::GameConfig;
use crate::physics::{Body, ContactSignals, Velocity};
use crate::player::Player;
use crate::{GameState, StepSet};

pub struct EnemyPlugin;

impl Plugin for EnemyPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_initial_enemies)
            .add_systems(OnEnter(GameState::Playing), restock_enemies)
            .add_systems(
                Update,
                (update_detection_zones, enemy_patrol)
                    .chain()
                    .in_set(StepSet::Input),
            )
            .add_systems(Update, enemy_melee_attack.in_set(StepSet::Step))
            .add_systems(
                Update,
                (handle_enemy_death, tick_despawn_timers)
                    .chain()
                    .in_set(StepSet::Feedback),
            );
    }
}

/// Enemy component with stats
#[derive(Component, Debug, Clone)]
pub struct Enemy {
    pub attack_damage: f32,
    /// Knockback dealt to a target on the enemy's right
    pub knockback: Vec2,
}

impl Enemy {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            attack_damage: config.enemy.attack_damage,
            knockback: Vec2::from(config.enemy.knockback),
        }
    }
}

/// Hostile entities currently inside the enemy's detection radius
#[derive(Component, Debug, Clone, Default)]
pub struct DetectionZone {
    pub radius: f32,
    detected: HashSet<Entity>,
}

impl DetectionZone {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            detected: HashSet::new(),
        }
    }

    /// Returns true if the entity was not already inside
    pub fn enter(&mut self, entity: Entity) -> bool {
        self.detected.insert(entity)
    }

    /// Returns true if the entity was inside
    pub fn exit(&mut self, entity: Entity) -> bool {
        self.detected.remove(&entity)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.detected.contains(&entity)
    }

    pub fn count(&self) -> usize {
        self.detected.len()
    }

    pub fn has_target(&self) -> bool {
        !self.detected.is_empty()
    }

    pub fn detected(&self) -> impl Iterator<Item = Entity> + '_ {
        self.detected.iter().copied()
    }
}

/// Timer for delayed despawn
#[derive(Component)]
pub struct DespawnTimer {
    pub remaining: f32,
}

pub const ENEMY_HALF_EXTENTS: Vec2 = Vec2::new(0.4, 0.8);

const ENEMY_POSITIONS: [Vec2; 2] = [Vec2::new(8.0, 1.0), Vec2::new(-4.0, 1.0)];

fn enemy_bundle(config: &GameConfig, position: Vec2) -> impl Bundle + use<> {
    let mut locomotion = LocomotionIntent::with_speeds(
        config.enemy.walk_speed,
        config.enemy.walk_speed,
        config.enemy.walk_speed,
    );
    locomotion.set_directional_input(Vec2::X);

    let actor = ActorCoordinator::new(
        HealthState::new(
            config.enemy.health.max_health,
            config.enemy.health.invincibility_window,
        ),
        Some(locomotion),
    )
    .with_brake(config.enemy.stop_rate);

    (
        Enemy::from_config(config),
        actor,
        Animator::new(
            ActionStateMachine::with_default_hooks(&config.animation).attack_on_target(true),
        ),
        DetectionZone::new(config.enemy.detection_radius),
        Velocity::default(),
        ContactSignals::default(),
        Body {
            half_extents: ENEMY_HALF_EXTENTS,
        },
        Sprite {
            color: Color::srgb(0.85, 0.25, 0.2),
            custom_size: Some(ENEMY_HALF_EXTENTS * 2.0),
            ..default()
        },
        Transform::from_translation(position.extend(0.5)),
    )
}

fn spawn_initial_enemies(mut commands: Commands, config: Res<GameConfig>) {
    for position in ENEMY_POSITIONS {
        commands.spawn(enemy_bundle(&config, position));
    }
}

/// A cleared arena gets a fresh wave
fn restock_enemies(
    mut commands: Commands,
    enemies: Query<(), With<Enemy>>,
    config: Res<GameConfig>,
) {
    if enemies.is_empty() {
        info!("Arena cleared, spawning a new wave");
        for position in ENEMY_POSITIONS {
            commands.spawn(enemy_bundle(&config, position));
        }
    }
}

/// Track players entering and leaving each zone, then publish `has_target`
fn update_detection_zones(
    mut enemy_query: Query<(Entity, &Transform, &mut DetectionZone, &mut Animator), With<Enemy>>,
    player_query: Query<(Entity, &Transform, &ActorCoordinator), (With<Player>, Without<Enemy>)>,
) {
    for (enemy, transform, mut zone, mut animator) in &mut enemy_query {
        let center = transform.translation.truncate();

        for (player, player_transform, actor) in &player_query {
            let distance = center.distance(player_transform.translation.truncate());
            let inside = distance <= zone.radius && !actor.is_dead();

            if inside && zone.enter(player) {
                debug!("{enemy:?} detected {player:?}");
            } else if !inside && zone.exit(player) {
                debug!("{enemy:?} lost {player:?}");
            }
        }

        // Targets that no longer exist leave the zone
        let stale: Vec<Entity> = zone
            .detected()
            .filter(|target| player_query.get(*target).is_err())
            .collect();
        for target in stale {
            zone.exit(target);
        }

        animator.params.set_bool(BoolParam::HasTarget, zone.has_target());
    }
}

/// Walk in the facing direction, turning around at walls
fn enemy_patrol(mut enemy_query: Query<(&mut ActorCoordinator, &ContactSignals), With<Enemy>>) {
    for (mut actor, contacts) in &mut enemy_query {
        let dead = actor.is_dead();
        let Some(locomotion) = actor.locomotion_mut() else {
            continue;
        };

        if dead {
            locomotion.clear_input();
            continue;
        }

        let signals = contacts.relative_to(locomotion.facing());
        if signals.wall_contact && signals.ground_contact {
            locomotion.flip();
        }

        let direction = locomotion.facing().sign();
        locomotion.set_directional_input(Vec2::new(direction, 0.0));
    }
}

/// Strike every detected target on the step the attack state is entered
fn enemy_melee_attack(
    enemy_query: Query<(Entity, &Enemy, &ActorCoordinator, &Animator, &DetectionZone)>,
    mut damage_events: EventWriter<DamageRequest>,
) {
    for (entity, enemy, actor, animator, zone) in &enemy_query {
        if !animator.just_entered(ActionState::Attack) {
            continue;
        }

        let facing = actor
            .locomotion()
            .map(LocomotionIntent::facing)
            .unwrap_or_default();
        let knockback = Vec2::new(enemy.knockback.x * facing.sign(), enemy.knockback.y);

        for target in zone.detected() {
            damage_events.write(DamageRequest {
                target,
                amount: enemy.attack_damage,
                knockback,
                source: Some(entity),
            });
        }
    }
}

/// Handle enemy death - despawn after delay
fn handle_enemy_death(
    mut commands: Commands,
    mut death_events: EventReader<DeathEvent>,
    enemy_query: Query<(), With<Enemy>>,
    bus: Res<DamageEventBus>,
) {
    for event in death_events.read() {
        if enemy_query.get(event.entity).is_ok() {
            let removed = bus.unsubscribe_actor(event.entity);
            info!(
                "{:?} killed by {:?} ({} subscriptions released)",
                event.entity, event.killer, removed
            );
            commands
                .entity(event.entity)
                .insert(DespawnTimer { remaining: 1.5 });
        }
    }
}

fn tick_despawn_timers(
    mut commands: Commands,
    mut query: Query<(Entity, &mut DespawnTimer)>,
    time: Res<Time>,
) {
    let dt = time.delta_secs();

    for (entity, mut timer) in &mut query {
        timer.remaining -= dt;
        if timer.remaining <= 0.0 {
            commands.entity(entity).despawn();
        }
    }
}
