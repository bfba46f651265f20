//! Animation collaborator: parameter store plus the action state machine.
//! Clip playback and pose evaluation are not modelled; only the state that gates movement.

use bevy::prelude::*;

use crate::StepSet;

pub mod params;
pub mod state_machine;

pub use params::*;
pub use state_machine::*;

pub struct AnimationPlugin;

impl Plugin for AnimationPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, update_animators.in_set(StepSet::Animate));
    }
}

#[derive(Component, Debug, Clone)]
pub struct Animator {
    pub params: AnimatorParams,
    pub machine: ActionStateMachine,
    /// Transition taken by the most recent update, if any
    pub last_transition: Option<Transition>,
}

impl Animator {
    pub fn new(machine: ActionStateMachine) -> Self {
        Self {
            params: AnimatorParams::default(),
            machine,
            last_transition: None,
        }
    }

    pub fn state(&self) -> ActionState {
        self.machine.state()
    }

    pub fn just_entered(&self, state: ActionState) -> bool {
        self.last_transition.is_some_and(|t| t.to == state)
    }

    pub fn update(&mut self, dt: f32) -> Option<Transition> {
        self.last_transition = self.machine.update(&mut self.params, dt);
        if let Some(transition) = self.last_transition {
            debug!("animator: {:?} -> {:?}", transition.from, transition.to);
        }
        self.last_transition
    }
}

pub fn update_animators(mut query: Query<&mut Animator>, time: Res<Time>) {
    let dt = time.delta_secs();
    for mut animator in &mut query {
        animator.update(dt);
    }
}
