use bevy::prelude::*;

use super::error::{check_amount, CombatError};

/// Result of a hit that was accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Actor survived and is now invincible for the configured window
    Hit,
    /// Health reached zero. Terminal.
    Killed,
}

/// Per-actor health with a timed invincibility window after each survived hit.
///
/// All mutation goes through `try_take_damage` / `try_heal`, so health is always
/// clamped to `0..=max` and death is a one-way transition.
#[derive(Component, Debug, Clone)]
pub struct HealthState {
    current: f32,
    max: f32,
    dead: bool,
    invincible: bool,
    invincibility_elapsed: f32,
    invincibility_window: f32,
}

impl HealthState {
    pub fn new(max_health: f32, invincibility_window: f32) -> Self {
        debug_assert!(max_health > 0.0, "max health must be positive");
        Self {
            current: max_health,
            max: max_health,
            dead: false,
            invincible: false,
            invincibility_elapsed: 0.0,
            invincibility_window: invincibility_window.max(0.0),
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn fraction(&self) -> f32 {
        self.current / self.max
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn is_invincible(&self) -> bool {
        self.invincible
    }

    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }

    pub fn invincibility_window(&self) -> f32 {
        self.invincibility_window
    }

    /// Apply damage. Rejected without any mutation when the amount is invalid,
    /// the actor is dead, or the invincibility window is open.
    pub fn try_take_damage(&mut self, amount: f32) -> Result<HitOutcome, CombatError> {
        let amount = check_amount(amount)?;
        if self.dead {
            return Err(CombatError::Dead);
        }
        if self.invincible {
            return Err(CombatError::Invincible);
        }

        self.current = (self.current - amount).max(0.0);

        if self.current <= 0.0 {
            self.current = 0.0;
            self.dead = true;
            return Ok(HitOutcome::Killed);
        }

        self.invincible = true;
        self.invincibility_elapsed = 0.0;
        Ok(HitOutcome::Hit)
    }

    pub fn take_damage(&mut self, amount: f32) -> bool {
        self.try_take_damage(amount).is_ok()
    }

    /// Restore health up to max. Returns the amount actually restored.
    pub fn try_heal(&mut self, amount: f32) -> Result<f32, CombatError> {
        let amount = check_amount(amount)?;
        if self.dead {
            return Err(CombatError::Dead);
        }
        if self.is_full() {
            return Err(CombatError::HealthFull);
        }

        let before = self.current;
        self.current = (self.current + amount).min(self.max);
        Ok(self.current - before)
    }

    pub fn heal(&mut self, amount: f32) -> bool {
        self.try_heal(amount).is_ok()
    }

    /// Advance the invincibility timer. Returns true on the step the window closes.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.invincible {
            return false;
        }

        self.invincibility_elapsed += dt;
        if self.invincibility_elapsed >= self.invincibility_window {
            self.invincible = false;
            return true;
        }
        false
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new(100.0, 3.0)
    }
}
