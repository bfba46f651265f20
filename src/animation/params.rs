use std::collections::{HashMap, HashSet};

/// Boolean animator parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolParam {
    IsMoving,
    IsRunning,
    IsGrounded,
    OnWall,
    HasTarget,
    IsDeath,
    /// Translation forbidden while an action plays; desired speed is forced to zero
    CannotMove,
    /// Locomotion may not overwrite the physics velocity (hit-react knockback keeps sliding)
    LockVelocity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatParam {
    YVelocity,
}

/// One-shot pulses, consumed by the next state machine update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimTrigger {
    Hit,
    Jump,
    Attack,
}

/// Parameter store shared between gameplay code and the action state machine.
/// Writes are fire-and-forget. Unset values read as false / 0.
#[derive(Debug, Clone, Default)]
pub struct AnimatorParams {
    bools: HashMap<BoolParam, bool>,
    floats: HashMap<FloatParam, f32>,
    triggers: HashSet<AnimTrigger>,
}

impl AnimatorParams {
    pub fn set_bool(&mut self, param: BoolParam, value: bool) {
        self.bools.insert(param, value);
    }

    pub fn get_bool(&self, param: BoolParam) -> bool {
        self.bools.get(&param).copied().unwrap_or(false)
    }

    pub fn set_float(&mut self, param: FloatParam, value: f32) {
        self.floats.insert(param, value);
    }

    pub fn get_float(&self, param: FloatParam) -> f32 {
        self.floats.get(&param).copied().unwrap_or(0.0)
    }

    pub fn set_trigger(&mut self, trigger: AnimTrigger) {
        self.triggers.insert(trigger);
    }

    pub fn is_triggered(&self, trigger: AnimTrigger) -> bool {
        self.triggers.contains(&trigger)
    }

    /// Returns whether the trigger was pending, clearing it
    pub fn take_trigger(&mut self, trigger: AnimTrigger) -> bool {
        self.triggers.remove(&trigger)
    }

    pub fn movement_locked(&self) -> bool {
        self.get_bool(BoolParam::CannotMove)
    }

    pub fn velocity_locked(&self) -> bool {
        self.get_bool(BoolParam::LockVelocity)
    }
}
