//! Tuning values supplied at actor creation.
//!
//! Defaults are hand-tuned; `assets/config/game.ron` overrides any subset of them.

use std::fs;
use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_PATH: &str = "assets/config/game.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub max_health: f32,
    /// Seconds of invincibility after a survived hit
    pub invincibility_window: f32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            invincibility_window: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    pub walk_speed: f32,
    pub run_speed: f32,
    pub air_speed: f32,
    pub jump_force: f32,
    pub gravity: f32,
    /// Ground friction applied while locomotion is not driving velocity
    pub friction: f32,
    /// Speed below which friction stops an actor outright
    pub stop_speed: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            walk_speed: 4.0,
            run_speed: 7.0,
            air_speed: 2.5,
            jump_force: 12.0,
            gravity: 30.0,
            friction: 5.0,
            stop_speed: 1.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    pub health: HealthConfig,
    pub walk_speed: f32,
    /// Fraction of horizontal speed shed per step while movement is locked
    pub stop_rate: f32,
    pub attack_damage: f32,
    /// Knockback for a target on the enemy's right; x is mirrored by facing
    pub knockback: [f32; 2],
    pub detection_radius: f32,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            health: HealthConfig {
                max_health: 100.0,
                invincibility_window: 0.5,
            },
            walk_speed: 4.0,
            stop_rate: 0.2,
            attack_damage: 10.0,
            knockback: [6.0, 2.0],
            detection_radius: 1.5,
        }
    }
}

/// Player melee swing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerAttackConfig {
    pub damage: f32,
    /// Knockback for a target on the player's right; x is mirrored by facing
    pub knockback: [f32; 2],
    /// Horizontal reach in front of the player's body
    pub reach: f32,
}

impl Default for PlayerAttackConfig {
    fn default() -> Self {
        Self {
            damage: 25.0,
            knockback: [5.0, 3.0],
            reach: 1.2,
        }
    }
}

/// Clip lengths of the timed action states, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationTimings {
    pub attack: f32,
    pub hit: f32,
}

impl Default for AnimationTimings {
    fn default() -> Self {
        Self {
            attack: 0.4,
            hit: 0.35,
        }
    }
}

#[derive(Resource, Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub player: HealthConfig,
    pub player_attack: PlayerAttackConfig,
    pub locomotion: LocomotionConfig,
    pub enemy: EnemyConfig,
    pub animation: AnimationTimings,
}

impl GameConfig {
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path)?;
        Self::from_ron_str(&source)
    }

    /// Load from `path`, falling back to defaults (with a warning) on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load(path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(err) => {
                warn!("{err}; using default config");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, health) in [("player", &self.player), ("enemy", &self.enemy.health)] {
            if !(health.max_health > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} max_health must be positive")));
            }
            if !(health.invincibility_window >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{name} invincibility_window must not be negative"
                )));
            }
        }

        let speeds = [
            ("walk_speed", self.locomotion.walk_speed),
            ("run_speed", self.locomotion.run_speed),
            ("air_speed", self.locomotion.air_speed),
            ("jump_force", self.locomotion.jump_force),
            ("gravity", self.locomotion.gravity),
            ("friction", self.locomotion.friction),
            ("stop_speed", self.locomotion.stop_speed),
            ("enemy walk_speed", self.enemy.walk_speed),
            ("attack timing", self.animation.attack),
            ("hit timing", self.animation.hit),
        ];
        if let Some((name, _)) = speeds.iter().find(|(_, v)| !(*v >= 0.0)) {
            return Err(ConfigError::Invalid(format!("{name} must not be negative")));
        }

        if !(0.0..=1.0).contains(&self.enemy.stop_rate) {
            return Err(ConfigError::Invalid("stop_rate must be within 0..=1".into()));
        }
        if !(self.enemy.attack_damage > 0.0) {
            return Err(ConfigError::Invalid("enemy attack_damage must be positive".into()));
        }
        if !(self.player_attack.damage > 0.0) || !(self.player_attack.reach >= 0.0) {
            return Err(ConfigError::Invalid(
                "player attack needs positive damage and non-negative reach".into(),
            ));
        }
        Ok(())
    }
}
