use bevy::prelude::*;

use crate::config::LocomotionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }

    /// Facing implied by a horizontal direction; None when there is no horizontal component
    pub fn from_direction(x: f32) -> Option<Self> {
        if x > 0.0 {
            Some(Facing::Right)
        } else if x < 0.0 {
            Some(Facing::Left)
        } else {
            None
        }
    }
}

/// Contact flags sampled once per step, relative to the actor's facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnvironmentSignals {
    pub ground_contact: bool,
    /// Wall directly ahead in the facing direction
    pub wall_contact: bool,
}

/// Movement intent from input or AI, turned into a target horizontal speed each step
#[derive(Debug, Clone)]
pub struct LocomotionIntent {
    facing: Facing,
    input: Vec2,
    running: bool,
    walk_speed: f32,
    run_speed: f32,
    air_speed: f32,
}

impl LocomotionIntent {
    pub fn new(config: &LocomotionConfig) -> Self {
        Self::with_speeds(config.walk_speed, config.run_speed, config.air_speed)
    }

    pub fn with_speeds(walk_speed: f32, run_speed: f32, air_speed: f32) -> Self {
        Self {
            facing: Facing::Right,
            input: Vec2::ZERO,
            running: false,
            walk_speed,
            run_speed,
            air_speed,
        }
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn input(&self) -> Vec2 {
        self.input
    }

    pub fn has_input(&self) -> bool {
        self.input != Vec2::ZERO
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Record directional input, turning to face it. Returns true if the actor flipped.
    pub fn set_directional_input(&mut self, input: Vec2) -> bool {
        self.input = input;
        match Facing::from_direction(input.x) {
            Some(facing) => self.set_facing(facing),
            None => false,
        }
    }

    /// Drop any held direction without turning (e.g. while dead)
    pub fn clear_input(&mut self) {
        self.input = Vec2::ZERO;
    }

    /// Driven by press/release edges of the run button
    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    /// Returns true only when the facing actually changed
    pub fn set_facing(&mut self, facing: Facing) -> bool {
        if self.facing == facing {
            return false;
        }
        self.facing = facing;
        true
    }

    /// Turn around. Any held horizontal input is mirrored so the actor walks the new way.
    pub fn flip(&mut self) {
        self.facing = self.facing.flipped();
        if self.input.x != 0.0 {
            self.input.x = self.input.x.abs() * self.facing.sign();
        }
    }

    /// Target horizontal speed for this step. Wall contact is checked before the
    /// ground/air split, so a wall ahead suppresses speed in both.
    pub fn compute_desired_speed(&self, signals: EnvironmentSignals, movement_locked: bool) -> f32 {
        if movement_locked {
            return 0.0;
        }

        if self.has_input() && !signals.wall_contact {
            if signals.ground_contact {
                if self.running {
                    self.run_speed
                } else {
                    self.walk_speed
                }
            } else {
                self.air_speed
            }
        } else {
            0.0
        }
    }

    /// Horizontal velocity: input magnitude scales the desired speed
    pub fn desired_velocity_x(&self, signals: EnvironmentSignals, movement_locked: bool) -> f32 {
        self.input.x * self.compute_desired_speed(signals, movement_locked)
    }
}
