//! Logical input surface consumed by the simulation.
//!
//! Device polling (keyboard, gamepad, XR controllers) happens outside this
//! crate; adapters feed raw values in and the game reads actions back out.

use glam::{Quat, Vec2, Vec3};
use std::collections::{HashMap, HashSet};

/// Radial deadzone applied to analog move axes.
pub const DEFAULT_DEADZONE: f32 = 0.2;

/// Discrete buttons the game reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Jump,
    ToggleWeapon,
    Swing,
    ForcePull,
    Throw,
}

/// Analog movement axes, both in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    MoveForward,
    MoveSide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hand {
    Left,
    Right,
}

/// Tracked controller pose in play-space coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerPose {
    pub position: Vec3,
    pub rotation: Quat,
}

/// Clamp a raw axis to `[-1, 1]`, zeroing non-finite values and the deadzone.
pub fn sanitize_axis(raw: f32, deadzone: f32) -> f32 {
    if !raw.is_finite() {
        return 0.0;
    }
    let value = raw.clamp(-1.0, 1.0);
    if value.abs() < deadzone {
        0.0
    } else {
        value
    }
}

/// Action state for the current frame.
#[derive(Debug)]
pub struct ActionState {
    /// Actions currently held down.
    held: HashSet<Action>,
    /// Actions pressed this frame.
    pressed: HashSet<Action>,
    /// Actions released this frame.
    released: HashSet<Action>,
    /// Seconds each action has been held; kept through the release frame.
    hold_time: HashMap<Action, f32>,

    move_forward: f32,
    move_side: f32,
    deadzone: f32,

    /// Look delta for this frame.
    look_delta: Vec2,
    /// Accumulated look delta until the next frame starts.
    accumulated_look: Vec2,

    left_pose: Option<ControllerPose>,
    right_pose: Option<ControllerPose>,
}

impl Default for ActionState {
    fn default() -> Self {
        Self::with_deadzone(DEFAULT_DEADZONE)
    }
}

impl ActionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadzone(deadzone: f32) -> Self {
        Self {
            held: HashSet::new(),
            pressed: HashSet::new(),
            released: HashSet::new(),
            hold_time: HashMap::new(),
            move_forward: 0.0,
            move_side: 0.0,
            deadzone: sanitize_axis(deadzone, 0.0).abs(),
            look_delta: Vec2::ZERO,
            accumulated_look: Vec2::ZERO,
            left_pose: None,
            right_pose: None,
        }
    }

    /// Clear per-frame state. Call at the start of each frame.
    pub fn begin_frame(&mut self) {
        for action in self.released.drain() {
            self.hold_time.remove(&action);
        }
        self.pressed.clear();
        self.look_delta = self.accumulated_look;
        self.accumulated_look = Vec2::ZERO;
    }

    /// Process a button transition.
    pub fn process_action(&mut self, action: Action, state: ButtonState) {
        match state {
            ButtonState::Pressed => {
                if self.held.insert(action) {
                    self.pressed.insert(action);
                    self.hold_time.insert(action, 0.0);
                }
            }
            ButtonState::Released => {
                if self.held.remove(&action) {
                    self.released.insert(action);
                }
            }
        }
    }

    /// Accumulate hold durations of held actions.
    pub fn tick(&mut self, dt: f32) {
        if !(dt > 0.0) {
            return;
        }
        for action in &self.held {
            *self.hold_time.entry(*action).or_insert(0.0) += dt;
        }
    }

    /// Store a raw axis reading.
    pub fn set_axis(&mut self, axis: Axis, raw: f32) {
        let value = sanitize_axis(raw, self.deadzone);
        match axis {
            Axis::MoveForward => self.move_forward = value,
            Axis::MoveSide => self.move_side = value,
        }
    }

    /// Process pointer or thumbstick look movement.
    pub fn process_look(&mut self, delta: Vec2) {
        if delta.is_finite() {
            self.accumulated_look += delta;
        }
    }

    /// Update or clear a controller pose. Non-finite poses count as lost tracking.
    pub fn set_controller_pose(&mut self, hand: Hand, pose: Option<ControllerPose>) {
        let pose = pose.filter(|p| p.position.is_finite() && p.rotation.is_finite());
        if pose.is_none() && self.controller_pose(hand).is_some() {
            log::debug!("{:?} controller tracking lost", hand);
        }
        match hand {
            Hand::Left => self.left_pose = pose,
            Hand::Right => self.right_pose = pose,
        }
    }

    pub fn is_held(&self, action: Action) -> bool {
        self.held.contains(&action)
    }

    pub fn is_pressed(&self, action: Action) -> bool {
        self.pressed.contains(&action)
    }

    pub fn is_released(&self, action: Action) -> bool {
        self.released.contains(&action)
    }

    /// Seconds the action has been held, or 0 if it is not down.
    pub fn hold_time(&self, action: Action) -> f32 {
        self.hold_time.get(&action).copied().unwrap_or(0.0)
    }

    pub fn axis(&self, axis: Axis) -> f32 {
        match axis {
            Axis::MoveForward => self.move_forward,
            Axis::MoveSide => self.move_side,
        }
    }

    pub fn look_delta(&self) -> Vec2 {
        self.look_delta
    }

    pub fn controller_pose(&self, hand: Hand) -> Option<ControllerPose> {
        match hand {
            Hand::Left => self.left_pose,
            Hand::Right => self.right_pose,
        }
    }

    /// Whether any controller is being tracked.
    pub fn is_xr(&self) -> bool {
        self.left_pose.is_some() || self.right_pose.is_some()
    }
}
