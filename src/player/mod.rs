use bevy::prelude::*;

use crate::actor::{ActorCoordinator, Facing, LocomotionIntent};
use crate::animation::{ActionState, ActionStateMachine, AnimTrigger, Animator};
use crate::combat::{DamageEventBus, DamageRequest, DeathEvent, HealthState};
use crate::config::GameConfig;
use crate::enemies::Enemy;
use crate::physics::{Body, ContactSignals, Velocity};
use crate::{GameState, StepSet};

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_player)
            .add_systems(OnEnter(GameState::Playing), respawn_dead_player)
            .add_systems(Update, player_input.in_set(StepSet::Input))
            .add_systems(Update, player_melee.in_set(StepSet::Step))
            .add_systems(Update, check_player_death.in_set(StepSet::Feedback));
    }
}

#[derive(Component)]
pub struct Player;

pub const PLAYER_HALF_EXTENTS: Vec2 = Vec2::new(0.4, 0.9);
const PLAYER_SPAWN: Vec2 = Vec2::new(-10.0, 1.0);

fn player_bundle(config: &GameConfig) -> impl Bundle + use<> {
    let actor = ActorCoordinator::new(
        HealthState::new(config.player.max_health, config.player.invincibility_window),
        Some(LocomotionIntent::new(&config.locomotion)),
    );

    (
        Player,
        actor,
        Animator::new(ActionStateMachine::with_default_hooks(&config.animation)),
        Velocity::default(),
        ContactSignals::default(),
        Body {
            half_extents: PLAYER_HALF_EXTENTS,
        },
        Sprite {
            color: Color::srgb(0.3, 0.55, 1.0),
            custom_size: Some(PLAYER_HALF_EXTENTS * 2.0),
            ..default()
        },
        Transform::from_translation(PLAYER_SPAWN.extend(1.0)),
    )
}

fn spawn_player(mut commands: Commands, config: Res<GameConfig>) {
    commands.spawn(player_bundle(&config));
}

/// Back from the menu after dying: start over with a fresh player
fn respawn_dead_player(
    mut commands: Commands,
    players: Query<(Entity, &ActorCoordinator), With<Player>>,
    config: Res<GameConfig>,
    bus: Res<DamageEventBus>,
) {
    for (entity, actor) in &players {
        if actor.is_dead() {
            let removed = bus.unsubscribe_actor(entity);
            commands.entity(entity).despawn();
            commands.spawn(player_bundle(&config));
            info!("Player respawned ({} subscriptions released)", removed);
        }
    }
}

/// -1, 0 or 1 from A/D and the arrow keys
pub fn horizontal_axis(keyboard: &ButtonInput<KeyCode>) -> f32 {
    let mut axis = 0.0;
    if keyboard.any_pressed([KeyCode::KeyA, KeyCode::ArrowLeft]) {
        axis -= 1.0;
    }
    if keyboard.any_pressed([KeyCode::KeyD, KeyCode::ArrowRight]) {
        axis += 1.0;
    }
    axis
}

fn player_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    mouse: Res<ButtonInput<MouseButton>>,
    mut player_query: Query<
        (&mut ActorCoordinator, &mut Animator, &mut Velocity, &ContactSignals),
        With<Player>,
    >,
    config: Res<GameConfig>,
) {
    let Ok((mut actor, mut animator, mut velocity, contacts)) = player_query.single_mut() else {
        return;
    };

    let dead = actor.is_dead();
    let Some(locomotion) = actor.locomotion_mut() else {
        return;
    };

    // Dead actors record no input and keep their facing
    if dead {
        locomotion.clear_input();
        return;
    }

    locomotion.set_directional_input(Vec2::new(horizontal_axis(&keyboard), 0.0));

    if keyboard.any_just_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]) {
        locomotion.set_running(true);
    }
    if keyboard.any_just_released([KeyCode::ShiftLeft, KeyCode::ShiftRight]) {
        locomotion.set_running(false);
    }

    if keyboard.just_pressed(KeyCode::Space)
        && contacts.grounded
        && !animator.params.movement_locked()
    {
        velocity.0.y = config.locomotion.jump_force;
        animator.params.set_trigger(AnimTrigger::Jump);
    }

    let attack = keyboard.just_pressed(KeyCode::KeyJ) || mouse.just_pressed(MouseButton::Left);
    if attack && contacts.grounded {
        animator.params.set_trigger(AnimTrigger::Attack);
    }
}

/// True if a target box overlaps the strip `reach` wide in front of the attacker
pub fn in_melee_reach(
    attacker: Vec2,
    attacker_half: Vec2,
    facing: Facing,
    reach: f32,
    target: Vec2,
    target_half: Vec2,
) -> bool {
    let ahead = (target.x - attacker.x) * facing.sign();
    let vertical = (target.y - attacker.y).abs();

    ahead >= 0.0
        && ahead <= attacker_half.x + reach + target_half.x
        && vertical < attacker_half.y + target_half.y
}

/// The swing lands on the step the attack state is entered
fn player_melee(
    player_query: Query<(Entity, &ActorCoordinator, &Animator, &Transform, &Body), With<Player>>,
    enemy_query: Query<(Entity, &Transform, &Body), (With<Enemy>, Without<Player>)>,
    mut damage_events: EventWriter<DamageRequest>,
    config: Res<GameConfig>,
) {
    let Ok((player, actor, animator, transform, body)) = player_query.single() else {
        return;
    };

    if !animator.just_entered(ActionState::Attack) {
        return;
    }

    let facing = actor
        .locomotion()
        .map(LocomotionIntent::facing)
        .unwrap_or_default();
    let attack = &config.player_attack;
    let origin = transform.translation.truncate();

    for (enemy, enemy_transform, enemy_body) in &enemy_query {
        if in_melee_reach(
            origin,
            body.half_extents,
            facing,
            attack.reach,
            enemy_transform.translation.truncate(),
            enemy_body.half_extents,
        ) {
            damage_events.write(DamageRequest {
                target: enemy,
                amount: attack.damage,
                knockback: Vec2::new(attack.knockback[0] * facing.sign(), attack.knockback[1]),
                source: Some(player),
            });
        }
    }
}

// === Player Death ===

fn check_player_death(
    mut deaths: EventReader<DeathEvent>,
    player_query: Query<Entity, With<Player>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let Ok(player) = player_query.single() else {
        return;
    };

    if deaths.read().any(|death| death.entity == player) {
        info!("Player died, returning to menu");
        next_state.set(GameState::Menu);
    }
}
