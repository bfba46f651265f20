use bevy::prelude::*;

use super::locomotion::{EnvironmentSignals, LocomotionIntent};
use crate::animation::{AnimTrigger, AnimatorParams, BoolParam, FloatParam};
use crate::combat::{
    CombatError, DamageEvent, DamageEventBus, DamageRequest, HealthState, HitOutcome,
};

/// Result of one simulation step for an actor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutput {
    /// Velocity to hand to physics this step
    pub velocity: Vec2,
    pub knockback_applied: bool,
    pub invincibility_ended: bool,
}

/// Ties an actor's health to its locomotion.
///
/// Combat decides when locomotion is allowed to drive velocity: a fresh hit's knockback
/// overrides it for exactly one step, `LockVelocity` leaves physics velocity alone, and
/// `CannotMove` forces the desired speed to zero.
#[derive(Component, Debug, Clone)]
pub struct ActorCoordinator {
    health: HealthState,
    locomotion: Option<LocomotionIntent>,
    pending_knockback: Option<Vec2>,
    /// Fraction of horizontal speed shed per step while movement is locked.
    /// None snaps to the desired speed (zero) instead.
    brake: Option<f32>,
}

impl ActorCoordinator {
    pub fn new(health: HealthState, locomotion: Option<LocomotionIntent>) -> Self {
        Self {
            health,
            locomotion,
            pending_knockback: None,
            brake: None,
        }
    }

    pub fn with_brake(mut self, stop_rate: f32) -> Self {
        self.brake = Some(stop_rate.clamp(0.0, 1.0));
        self
    }

    pub fn health(&self) -> &HealthState {
        &self.health
    }

    pub fn is_dead(&self) -> bool {
        self.health.is_dead()
    }

    pub fn locomotion(&self) -> Option<&LocomotionIntent> {
        self.locomotion.as_ref()
    }

    pub fn locomotion_mut(&mut self) -> Option<&mut LocomotionIntent> {
        self.locomotion.as_mut()
    }

    pub fn pending_knockback(&self) -> Option<Vec2> {
        self.pending_knockback
    }

    /// Apply a hit: update health, drive the animator, queue knockback and broadcast.
    ///
    /// A lethal hit still succeeds and still broadcasts; it raises the death flag
    /// instead of starting the hit-react.
    pub fn receive_damage(
        &mut self,
        request: &DamageRequest,
        params: &mut AnimatorParams,
        bus: &DamageEventBus,
    ) -> Result<HitOutcome, CombatError> {
        let outcome = self.health.try_take_damage(request.amount)?;

        match outcome {
            HitOutcome::Hit => {
                params.set_trigger(AnimTrigger::Hit);
                params.set_bool(BoolParam::LockVelocity, true);
            }
            HitOutcome::Killed => {
                params.set_bool(BoolParam::IsDeath, true);
                info!("{:?} died", request.target);
            }
        }

        self.pending_knockback = Some(request.knockback);
        debug!(
            "{:?} took {} damage, health {}/{}",
            request.target,
            request.amount,
            self.health.current(),
            self.health.max()
        );

        bus.publish(&DamageEvent {
            actor: request.target,
            amount: request.amount,
            knockback: request.knockback,
            source: request.source,
            lethal: outcome == HitOutcome::Killed,
        });

        Ok(outcome)
    }

    /// Returns the amount actually restored
    pub fn heal(&mut self, amount: f32) -> Result<f32, CombatError> {
        let restored = self.health.try_heal(amount)?;
        debug!("healed {}, health {}/{}", restored, self.health.current(), self.health.max());
        Ok(restored)
    }

    /// Advance timers and produce this step's velocity from the physics velocity.
    pub fn step(
        &mut self,
        dt: f32,
        signals: EnvironmentSignals,
        current_velocity: Vec2,
        params: &mut AnimatorParams,
    ) -> StepOutput {
        let invincibility_ended = self.health.tick(dt);

        params.set_bool(BoolParam::IsGrounded, signals.ground_contact);
        params.set_bool(BoolParam::OnWall, signals.wall_contact);
        if let Some(locomotion) = &self.locomotion {
            params.set_bool(BoolParam::IsMoving, locomotion.has_input());
            params.set_bool(BoolParam::IsRunning, locomotion.is_running());
        }

        let knockback = self.pending_knockback.take();
        let velocity = if let Some(knockback) = knockback {
            Vec2::new(knockback.x, current_velocity.y + knockback.y)
        } else if params.velocity_locked() {
            current_velocity
        } else if let Some(locomotion) = &self.locomotion {
            let locked = params.movement_locked();
            match self.brake {
                Some(rate) if locked => {
                    Vec2::new(current_velocity.x * (1.0 - rate), current_velocity.y)
                }
                _ => Vec2::new(
                    locomotion.desired_velocity_x(signals, locked),
                    current_velocity.y,
                ),
            }
        } else {
            current_velocity
        };

        params.set_float(FloatParam::YVelocity, velocity.y);

        StepOutput {
            velocity,
            knockback_applied: knockback.is_some(),
            invincibility_ended,
        }
    }
}
