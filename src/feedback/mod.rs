//! Hit feedback driven by the damage bus: floating numbers, screen flash, sprite tint and
//! the health HUD.
//!
//! Bus subscribers run inside `publish`, outside the ECS, so they only queue work into a
//! shared inbox. Systems in `StepSet::Feedback` drain it and touch the world.
//! Global subscribers live as long as `Playing`; each actor gets its own tint reaction,
//! released when the actor dies or is replaced.

use std::collections::HashSet;
use std::sync::Arc;

use bevy::prelude::*;
use parking_lot::Mutex;

use crate::actor::ActorCoordinator;
use crate::combat::{
    DamageEvent, DamageEventBus, Delivery, Healed, ObserverError, SubscriberScope, Subscription,
};
use crate::player::Player;
use crate::{GameState, StepSet};

pub struct FeedbackPlugin;

impl Plugin for FeedbackPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FeedbackInbox>()
            .init_resource::<DamageFlash>()
            .add_systems(Startup, (spawn_damage_flash_overlay, spawn_health_hud))
            .add_systems(OnEnter(GameState::Playing), acquire_subscriptions)
            .add_systems(OnExit(GameState::Playing), release_subscriptions)
            .add_systems(Update, subscribe_actor_reactions.before(StepSet::Input))
            .add_systems(
                Update,
                (
                    spawn_damage_texts,
                    spawn_heal_texts,
                    update_floating_texts,
                    trigger_damage_flash,
                    update_damage_flash,
                    apply_hit_tints,
                    update_hit_tints,
                    update_health_hud,
                )
                    .chain()
                    .in_set(StepSet::Feedback),
            );
    }
}

/// Pending texts beyond this are dropped and reported as observer faults
const MAX_PENDING_TEXTS: usize = 64;
/// Text is laid out in pixels, the world in metres
const TEXT_SCALE: f32 = 1.0 / 40.0;
const TEXT_LIFETIME: f32 = 0.8;
const TEXT_RISE_SPEED: f32 = 1.5;
/// Shortest tint, held longer while the actor stays invincible
const HIT_TINT_DURATION: f32 = 0.15;
const HIT_TINT_COLOR: Color = Color::srgb(1.0, 0.45, 0.45);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitNotice {
    pub actor: Entity,
    pub amount: f32,
    pub lethal: bool,
}

#[derive(Default)]
struct Inbox {
    texts: Vec<HitNotice>,
    flashes: Vec<HitNotice>,
    tints: Vec<Entity>,
}

/// Shared between bus subscribers and the feedback systems
#[derive(Resource, Clone, Default)]
pub struct FeedbackInbox {
    inner: Arc<Mutex<Inbox>>,
}

impl FeedbackInbox {
    pub fn push_text(&self, notice: HitNotice) -> Result<(), ObserverError> {
        let mut inbox = self.inner.lock();
        if inbox.texts.len() >= MAX_PENDING_TEXTS {
            return Err(ObserverError::new("floating text queue full"));
        }
        inbox.texts.push(notice);
        Ok(())
    }

    pub fn push_flash(&self, notice: HitNotice) {
        self.inner.lock().flashes.push(notice);
    }

    pub fn take_texts(&self) -> Vec<HitNotice> {
        std::mem::take(&mut self.inner.lock().texts)
    }

    pub fn take_flashes(&self) -> Vec<HitNotice> {
        std::mem::take(&mut self.inner.lock().flashes)
    }

    pub fn push_tint(&self, actor: Entity) {
        self.inner.lock().tints.push(actor);
    }

    pub fn take_tints(&self) -> Vec<Entity> {
        std::mem::take(&mut self.inner.lock().tints)
    }
}

impl From<&DamageEvent> for HitNotice {
    fn from(event: &DamageEvent) -> Self {
        Self {
            actor: event.actor,
            amount: event.amount,
            lethal: event.lethal,
        }
    }
}

/// Bus subscriptions held while the game is being played; dropping them unsubscribes
#[derive(Resource)]
pub struct FeedbackSubscriptions {
    _guards: Vec<Subscription>,
}

impl FeedbackSubscriptions {
    pub fn acquire(bus: &DamageEventBus, inbox: &FeedbackInbox) -> Self {
        let texts = inbox.clone();
        let flashes = inbox.clone();

        let guards = vec![
            bus.subscribe_scoped(SubscriberScope::Global, move |event: &DamageEvent, _: &Delivery| {
                texts.push_text(HitNotice::from(event))
            }),
            bus.subscribe_scoped(SubscriberScope::Global, move |event: &DamageEvent, _: &Delivery| {
                flashes.push_flash(HitNotice::from(event));
                Ok(())
            }),
        ];

        Self { _guards: guards }
    }
}

fn acquire_subscriptions(
    mut commands: Commands,
    bus: Res<DamageEventBus>,
    inbox: Res<FeedbackInbox>,
) {
    commands.insert_resource(FeedbackSubscriptions::acquire(&bus, &inbox));
    debug!("feedback observers subscribed");
}

fn release_subscriptions(mut commands: Commands) {
    commands.remove_resource::<FeedbackSubscriptions>();
    debug!("feedback observers released");
}

/// Give every new actor a hit reaction scoped to itself
fn subscribe_actor_reactions(
    actors: Query<Entity, Added<ActorCoordinator>>,
    bus: Res<DamageEventBus>,
    inbox: Res<FeedbackInbox>,
) {
    for actor in &actors {
        let tints = inbox.clone();
        bus.subscribe_actor(actor, move |event: &DamageEvent, _: &Delivery| {
            tints.push_tint(event.actor);
            Ok(())
        });
    }
}

// === Hit tint ===

/// Sprite tinted after a hit; the original colour comes back once it runs out
#[derive(Component, Debug, Clone, Copy)]
pub struct HitTint {
    pub remaining: f32,
    pub base: Color,
}

impl HitTint {
    /// Returns true once the minimum duration has passed
    pub fn tick(&mut self, dt: f32) -> bool {
        self.remaining = (self.remaining - dt).max(0.0);
        self.remaining <= 0.0
    }
}

fn apply_hit_tints(
    mut commands: Commands,
    inbox: Res<FeedbackInbox>,
    mut query: Query<(&mut Sprite, Option<&mut HitTint>)>,
) {
    let actors: HashSet<Entity> = inbox.take_tints().into_iter().collect();

    for actor in actors {
        let Ok((mut sprite, tint)) = query.get_mut(actor) else {
            continue;
        };

        match tint {
            Some(mut tint) => tint.remaining = HIT_TINT_DURATION,
            None => {
                commands.entity(actor).try_insert(HitTint {
                    remaining: HIT_TINT_DURATION,
                    base: sprite.color,
                });
            }
        }
        sprite.color = HIT_TINT_COLOR;
    }
}

fn update_hit_tints(
    mut commands: Commands,
    mut query: Query<(Entity, &mut Sprite, &mut HitTint, &ActorCoordinator)>,
    time: Res<Time>,
) {
    let dt = time.delta_secs();

    for (entity, mut sprite, mut tint, actor) in &mut query {
        if tint.tick(dt) && !actor.health().is_invincible() {
            sprite.color = tint.base;
            commands.entity(entity).remove::<HitTint>();
        }
    }
}

// === Floating text ===

#[derive(Component)]
pub struct FloatingText {
    pub lifetime: f32,
    pub max_lifetime: f32,
    pub color: Color,
}

fn spawn_floating_text(
    commands: &mut Commands,
    text: String,
    color: Color,
    font_size: f32,
    at: Vec3,
) {
    commands.spawn((
        Text2d::new(text),
        TextFont {
            font_size,
            ..default()
        },
        TextColor(color),
        Transform::from_translation(at.with_z(10.0)).with_scale(Vec3::splat(TEXT_SCALE)),
        FloatingText {
            lifetime: TEXT_LIFETIME,
            max_lifetime: TEXT_LIFETIME,
            color,
        },
    ));
}

fn spawn_damage_texts(
    mut commands: Commands,
    inbox: Res<FeedbackInbox>,
    actors: Query<&Transform, With<ActorCoordinator>>,
) {
    for notice in inbox.take_texts() {
        // Actor may be gone by the time the queue drains
        let Ok(transform) = actors.get(notice.actor) else {
            continue;
        };

        let (color, font_size) = if notice.lethal {
            (Color::srgb(1.0, 0.85, 0.2), 32.0)
        } else {
            (Color::srgb(1.0, 0.25, 0.25), 24.0)
        };
        spawn_floating_text(
            &mut commands,
            format!("{:.0}", notice.amount),
            color,
            font_size,
            transform.translation + Vec3::Y * 1.2,
        );
    }
}

fn spawn_heal_texts(
    mut commands: Commands,
    mut healed: EventReader<Healed>,
    actors: Query<&Transform, With<ActorCoordinator>>,
) {
    for event in healed.read() {
        let Ok(transform) = actors.get(event.target) else {
            continue;
        };
        spawn_floating_text(
            &mut commands,
            format!("+{:.0}", event.amount),
            Color::srgb(0.3, 1.0, 0.3),
            24.0,
            transform.translation + Vec3::Y * 1.2,
        );
    }
}

fn update_floating_texts(
    mut commands: Commands,
    mut query: Query<(Entity, &mut Transform, &mut TextColor, &mut FloatingText)>,
    time: Res<Time>,
) {
    let dt = time.delta_secs();

    for (entity, mut transform, mut color, mut text) in &mut query {
        text.lifetime -= dt;
        if text.lifetime <= 0.0 {
            commands.entity(entity).despawn();
            continue;
        }

        transform.translation.y += TEXT_RISE_SPEED * dt;
        let alpha = text.lifetime / text.max_lifetime;
        color.0 = text.color.with_alpha(alpha);
    }
}

// === Damage flash ===

/// Screen flash effect for damage feedback
#[derive(Resource)]
pub struct DamageFlash {
    pub intensity: f32,
    pub decay_rate: f32,
}

impl Default for DamageFlash {
    fn default() -> Self {
        Self {
            intensity: 0.0,
            decay_rate: 4.0, // Fades in 0.25 seconds
        }
    }
}

impl DamageFlash {
    /// Scale intensity by damage amount (capped)
    pub fn trigger(&mut self, amount: f32) {
        let boost = (amount / 25.0).min(1.0);
        self.intensity = (self.intensity + boost).min(1.0);
    }

    pub fn decay(&mut self, dt: f32) {
        self.intensity = (self.intensity - self.decay_rate * dt).max(0.0);
    }
}

/// Marker for the damage flash overlay UI element
#[derive(Component)]
pub struct DamageFlashOverlay;

fn spawn_damage_flash_overlay(mut commands: Commands) {
    commands.spawn((
        Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            position_type: PositionType::Absolute,
            ..default()
        },
        BackgroundColor(Color::srgba(1.0, 0.0, 0.0, 0.0)),
        GlobalZIndex(100),
        DamageFlashOverlay,
    ));
}

/// Only hits on the player flash the screen
fn trigger_damage_flash(
    inbox: Res<FeedbackInbox>,
    mut flash: ResMut<DamageFlash>,
    player_query: Query<Entity, With<Player>>,
) {
    let notices = inbox.take_flashes();
    let Ok(player) = player_query.single() else {
        return;
    };

    for notice in notices.iter().filter(|n| n.actor == player) {
        flash.trigger(notice.amount);
    }
}

fn update_damage_flash(
    mut flash: ResMut<DamageFlash>,
    mut overlay_query: Query<&mut BackgroundColor, With<DamageFlashOverlay>>,
    time: Res<Time>,
) {
    flash.decay(time.delta_secs());

    let Ok(mut bg_color) = overlay_query.single_mut() else {
        return;
    };
    bg_color.0 = Color::srgba(1.0, 0.0, 0.0, flash.intensity * 0.5);
}

// === Health HUD ===

#[derive(Component)]
pub struct HealthHud;

fn spawn_health_hud(mut commands: Commands) {
    commands.spawn((
        Text::new("HP: 100/100"),
        TextFont {
            font_size: 24.0,
            ..default()
        },
        TextColor(Color::srgb(0.3, 1.0, 0.3)),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(10.0),
            bottom: Val::Px(10.0),
            ..default()
        },
        HealthHud,
    ));
}

/// Green above 60%, yellow above 30%, red below
pub fn health_color(fraction: f32) -> Color {
    if fraction > 0.6 {
        Color::srgb(0.3, 1.0, 0.3)
    } else if fraction > 0.3 {
        Color::srgb(1.0, 1.0, 0.3)
    } else {
        Color::srgb(1.0, 0.3, 0.3)
    }
}

fn update_health_hud(
    player_query: Query<&ActorCoordinator, With<Player>>,
    mut hud_query: Query<(&mut Text, &mut TextColor), With<HealthHud>>,
) {
    let Ok(actor) = player_query.single() else {
        return;
    };

    let Ok((mut text, mut color)) = hud_query.single_mut() else {
        return;
    };

    let health = actor.health();
    **text = format!("HP: {:.0}/{:.0}", health.current(), health.max());
    color.0 = health_color(health.fraction());
}
