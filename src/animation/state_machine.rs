//! Action state machine driving the hit-react / attack / death locks.
//!
//! Hook points are explicit per-state enter/exit callbacks rather than behaviours
//! attached to animation clips. The default hooks are the only writers of
//! `CannotMove` and the only place `LockVelocity` is released.

use std::collections::HashMap;

use super::params::{AnimTrigger, AnimatorParams, BoolParam};
use crate::config::AnimationTimings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActionState {
    #[default]
    Idle,
    Walk,
    Run,
    Airborne,
    Attack,
    Hit,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ActionState,
    pub to: ActionState,
}

pub type StateCallback = fn(&mut AnimatorParams);

#[derive(Debug, Clone)]
pub struct ActionStateMachine {
    state: ActionState,
    elapsed: f32,
    attack_duration: f32,
    hit_duration: f32,
    /// AI actors attack whenever `HasTarget` is set
    attack_on_target: bool,
    on_enter: HashMap<ActionState, Vec<StateCallback>>,
    on_exit: HashMap<ActionState, Vec<StateCallback>>,
}

fn lock_movement(params: &mut AnimatorParams) {
    params.set_bool(BoolParam::CannotMove, true);
}

fn unlock_movement(params: &mut AnimatorParams) {
    params.set_bool(BoolParam::CannotMove, false);
}

fn release_velocity(params: &mut AnimatorParams) {
    params.set_bool(BoolParam::LockVelocity, false);
}

impl ActionStateMachine {
    /// Bare machine without any hooks
    pub fn new(timings: &AnimationTimings) -> Self {
        Self {
            state: ActionState::Idle,
            elapsed: 0.0,
            attack_duration: timings.attack,
            hit_duration: timings.hit,
            attack_on_target: false,
            on_enter: HashMap::new(),
            on_exit: HashMap::new(),
        }
    }

    /// Machine with the standard movement-lock hooks registered
    pub fn with_default_hooks(timings: &AnimationTimings) -> Self {
        let mut machine = Self::new(timings);
        for state in [ActionState::Attack, ActionState::Hit, ActionState::Dead] {
            machine.on_enter(state, lock_movement);
        }
        machine.on_exit(ActionState::Attack, unlock_movement);
        machine.on_exit(ActionState::Hit, unlock_movement);
        machine.on_exit(ActionState::Hit, release_velocity);
        machine
    }

    pub fn attack_on_target(mut self, enabled: bool) -> Self {
        self.attack_on_target = enabled;
        self
    }

    pub fn on_enter(&mut self, state: ActionState, callback: StateCallback) {
        self.on_enter.entry(state).or_default().push(callback);
    }

    pub fn on_exit(&mut self, state: ActionState, callback: StateCallback) {
        self.on_exit.entry(state).or_default().push(callback);
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    /// Time spent in the current state
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    fn duration(&self, state: ActionState) -> Option<f32> {
        match state {
            ActionState::Attack => Some(self.attack_duration),
            ActionState::Hit => Some(self.hit_duration),
            _ => None,
        }
    }

    fn locomotion_state(params: &AnimatorParams) -> ActionState {
        if !params.get_bool(BoolParam::IsGrounded) {
            ActionState::Airborne
        } else if params.get_bool(BoolParam::IsMoving) && params.get_bool(BoolParam::IsRunning) {
            ActionState::Run
        } else if params.get_bool(BoolParam::IsMoving) {
            ActionState::Walk
        } else {
            ActionState::Idle
        }
    }

    /// Advance by `dt`, consume pending triggers and switch state if needed.
    /// A fresh hit re-enters `Hit` even when already in it.
    pub fn update(&mut self, params: &mut AnimatorParams, dt: f32) -> Option<Transition> {
        self.elapsed += dt;

        let hit = params.take_trigger(AnimTrigger::Hit);
        let attack = params.take_trigger(AnimTrigger::Attack);
        params.take_trigger(AnimTrigger::Jump);

        if self.state == ActionState::Dead {
            return None;
        }

        let next = if params.get_bool(BoolParam::IsDeath) {
            ActionState::Dead
        } else if hit {
            ActionState::Hit
        } else if self
            .duration(self.state)
            .is_some_and(|duration| self.elapsed < duration)
        {
            self.state
        } else if attack
            || (self.attack_on_target && params.get_bool(BoolParam::HasTarget))
        {
            ActionState::Attack
        } else {
            Self::locomotion_state(params)
        };

        let restart = hit && next == ActionState::Hit;
        let restart_attack = next == ActionState::Attack
            && self.state == ActionState::Attack
            && self.elapsed >= self.attack_duration;
        if next == self.state && !restart && !restart_attack {
            return None;
        }

        Some(self.transition(params, next))
    }

    /// A restart of the current state only rewinds its timer; hooks run on real changes
    fn transition(&mut self, params: &mut AnimatorParams, to: ActionState) -> Transition {
        let from = self.state;
        self.elapsed = 0.0;
        if from == to {
            return Transition { from, to };
        }

        if let Some(callbacks) = self.on_exit.get(&from) {
            for callback in callbacks {
                callback(params);
            }
        }

        self.state = to;

        if let Some(callbacks) = self.on_enter.get(&to) {
            for callback in callbacks {
                callback(params);
            }
        }
        Transition { from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timings() -> AnimationTimings {
        AnimationTimings {
            attack: 0.4,
            hit: 0.3,
        }
    }

    fn grounded_params() -> AnimatorParams {
        let mut params = AnimatorParams::default();
        params.set_bool(BoolParam::IsGrounded, true);
        params
    }

    // ==================== Locomotion State Tests ====================

    #[test]
    fn test_locomotion_states_follow_params() {
        let mut machine = ActionStateMachine::with_default_hooks(&timings());
        let mut params = grounded_params();

        assert_eq!(machine.update(&mut params, 0.016), None);
        assert_eq!(machine.state(), ActionState::Idle);

        params.set_bool(BoolParam::IsMoving, true);
        machine.update(&mut params, 0.016);
        assert_eq!(machine.state(), ActionState::Walk);

        params.set_bool(BoolParam::IsRunning, true);
        machine.update(&mut params, 0.016);
        assert_eq!(machine.state(), ActionState::Run);

        params.set_bool(BoolParam::IsGrounded, false);
        machine.update(&mut params, 0.016);
        assert_eq!(machine.state(), ActionState::Airborne);
    }

    // ==================== Action State Tests ====================

    #[test]
    fn test_hit_locks_movement_until_clip_ends() {
        let mut machine = ActionStateMachine::with_default_hooks(&timings());
        let mut params = grounded_params();
        params.set_bool(BoolParam::LockVelocity, true);
        params.set_trigger(AnimTrigger::Hit);

        let transition = machine.update(&mut params, 0.0);
        assert_eq!(
            transition,
            Some(Transition {
                from: ActionState::Idle,
                to: ActionState::Hit
            })
        );
        assert!(params.movement_locked());
        assert!(params.velocity_locked());

        machine.update(&mut params, 0.2);
        assert_eq!(machine.state(), ActionState::Hit);
        assert!(params.movement_locked());

        machine.update(&mut params, 0.2);
        assert_eq!(machine.state(), ActionState::Idle);
        assert!(!params.movement_locked());
        assert!(!params.velocity_locked());
    }

    #[test]
    fn test_fresh_hit_restarts_hit_state() {
        let mut machine = ActionStateMachine::with_default_hooks(&timings());
        let mut params = grounded_params();
        params.set_trigger(AnimTrigger::Hit);
        machine.update(&mut params, 0.0);
        machine.update(&mut params, 0.25);

        params.set_trigger(AnimTrigger::Hit);
        let transition = machine.update(&mut params, 0.0);
        assert_eq!(
            transition,
            Some(Transition {
                from: ActionState::Hit,
                to: ActionState::Hit
            })
        );
        assert!(machine.elapsed() < 0.001);
    }

    #[test]
    fn test_fresh_hit_keeps_velocity_lock_and_movement_lock() {
        let mut machine = ActionStateMachine::with_default_hooks(&timings());
        let mut params = grounded_params();
        params.set_bool(BoolParam::LockVelocity, true);
        params.set_trigger(AnimTrigger::Hit);
        machine.update(&mut params, 0.0);
        machine.update(&mut params, 0.1);

        // Second hit lands while the first hit-react still plays
        params.set_bool(BoolParam::LockVelocity, true);
        params.set_trigger(AnimTrigger::Hit);
        machine.update(&mut params, 0.0);

        assert_eq!(machine.state(), ActionState::Hit);
        assert!(params.velocity_locked());
        assert!(params.movement_locked());

        // The restarted clip runs its full length before releasing
        machine.update(&mut params, 0.25);
        assert!(params.velocity_locked());
        machine.update(&mut params, 0.1);
        assert_eq!(machine.state(), ActionState::Idle);
        assert!(!params.velocity_locked());
        assert!(!params.movement_locked());
    }

    #[test]
    fn test_attack_trigger_and_timeout() {
        let mut machine = ActionStateMachine::with_default_hooks(&timings());
        let mut params = grounded_params();
        params.set_trigger(AnimTrigger::Attack);

        machine.update(&mut params, 0.0);
        assert_eq!(machine.state(), ActionState::Attack);
        assert!(params.movement_locked());

        // Attack input while attacking is dropped
        params.set_trigger(AnimTrigger::Attack);
        machine.update(&mut params, 0.1);
        assert_eq!(machine.state(), ActionState::Attack);

        machine.update(&mut params, 0.4);
        assert_eq!(machine.state(), ActionState::Idle);
        assert!(!params.movement_locked());
    }

    #[test]
    fn test_ai_attacks_repeatedly_while_target_present() {
        let mut machine = ActionStateMachine::with_default_hooks(&timings()).attack_on_target(true);
        let mut params = grounded_params();
        params.set_bool(BoolParam::HasTarget, true);

        assert_eq!(machine.update(&mut params, 0.0).map(|t| t.to), Some(ActionState::Attack));
        assert_eq!(machine.update(&mut params, 0.2), None);
        assert_eq!(
            machine.update(&mut params, 0.3),
            Some(Transition {
                from: ActionState::Attack,
                to: ActionState::Attack
            })
        );

        params.set_bool(BoolParam::HasTarget, false);
        machine.update(&mut params, 0.5);
        assert_eq!(machine.state(), ActionState::Idle);
    }

    #[test]
    fn test_death_is_terminal_and_locks() {
        let mut machine = ActionStateMachine::with_default_hooks(&timings());
        let mut params = grounded_params();
        params.set_bool(BoolParam::IsDeath, true);

        machine.update(&mut params, 0.0);
        assert_eq!(machine.state(), ActionState::Dead);
        assert!(params.movement_locked());

        params.set_bool(BoolParam::IsDeath, false);
        params.set_trigger(AnimTrigger::Hit);
        assert_eq!(machine.update(&mut params, 5.0), None);
        assert_eq!(machine.state(), ActionState::Dead);
        assert!(!params.is_triggered(AnimTrigger::Hit));
    }

    // ==================== Hook Tests ====================

    #[test]
    fn test_custom_hooks_run_on_enter_and_exit() {
        fn mark_enter(params: &mut AnimatorParams) {
            params.set_bool(BoolParam::HasTarget, true);
        }
        fn mark_exit(params: &mut AnimatorParams) {
            params.set_bool(BoolParam::HasTarget, false);
        }

        let mut machine = ActionStateMachine::new(&timings());
        machine.on_enter(ActionState::Walk, mark_enter);
        machine.on_exit(ActionState::Walk, mark_exit);

        let mut params = grounded_params();
        params.set_bool(BoolParam::IsMoving, true);
        machine.update(&mut params, 0.016);
        assert!(params.get_bool(BoolParam::HasTarget));

        params.set_bool(BoolParam::IsMoving, false);
        machine.update(&mut params, 0.016);
        assert!(!params.get_bool(BoolParam::HasTarget));
    }

    #[test]
    fn test_bare_machine_has_no_locks() {
        let mut machine = ActionStateMachine::new(&timings());
        let mut params = grounded_params();
        params.set_trigger(AnimTrigger::Attack);

        machine.update(&mut params, 0.0);
        assert_eq!(machine.state(), ActionState::Attack);
        assert!(!params.movement_locked());
    }
}
