//! Side-scrolling brawler: health with an invincibility window, combat-gated
//! locomotion and a damage notification bus shared by every actor.

use bevy::prelude::*;

pub mod actor;
pub mod animation;
pub mod combat;
pub mod config;
pub mod enemies;
pub mod feedback;
pub mod level;
pub mod physics;
pub mod player;

/// Game states
#[derive(States, Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum GameState {
    #[default]
    Menu,
    Playing,
    Paused,
}

/// Order of one simulation step. Everything runs only while playing.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepSet {
    /// Player input and enemy AI write locomotion intent
    Input,
    /// Damage and heal requests reach actors
    Combat,
    /// Animator state machines consume triggers
    Animate,
    /// Coordinators turn intent and combat state into velocity
    Step,
    /// Integrate, collide and sample contacts for the next step
    Physics,
    Feedback,
}

/// World units per screen pixel
const CAMERA_SCALE: f32 = 1.0 / 40.0;

/// Everything but the window and the config resource
pub struct GamePlugin;

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<GameState>()
            .configure_sets(
                Update,
                (
                    StepSet::Input,
                    StepSet::Combat,
                    StepSet::Animate,
                    StepSet::Step,
                    StepSet::Physics,
                    StepSet::Feedback,
                )
                    .chain()
                    .run_if(in_state(GameState::Playing)),
            )
            .add_plugins((
                level::LevelPlugin,
                physics::PhysicsPlugin,
                combat::CombatPlugin,
                animation::AnimationPlugin,
                actor::ActorPlugin,
                player::PlayerPlugin,
                enemies::EnemyPlugin,
                feedback::FeedbackPlugin,
            ))
            .add_systems(Startup, spawn_camera)
            .add_systems(Update, handle_game_state_input);
    }
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn((
        Camera2d,
        Projection::Orthographic(OrthographicProjection {
            scale: CAMERA_SCALE,
            ..OrthographicProjection::default_2d()
        }),
        Transform::from_xyz(0.0, 4.0, 0.0),
    ));
}

fn handle_game_state_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    current_state: Res<State<GameState>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let next = match current_state.get() {
        GameState::Menu => {
            if keyboard.just_pressed(KeyCode::Space) || keyboard.just_pressed(KeyCode::Enter) {
                Some(GameState::Playing)
            } else {
                None
            }
        }
        GameState::Playing => {
            if keyboard.just_pressed(KeyCode::Escape) {
                Some(GameState::Paused)
            } else {
                None
            }
        }
        GameState::Paused => {
            if keyboard.just_pressed(KeyCode::Escape) {
                Some(GameState::Playing)
            } else if keyboard.just_pressed(KeyCode::KeyQ) {
                Some(GameState::Menu)
            } else {
                None
            }
        }
    };

    if let Some(state) = next {
        info!("{:?} -> {:?}", current_state.get(), state);
        next_state.set(state);
    }
}
