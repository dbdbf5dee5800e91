//! Off hand: the force pull and its cosmetic finger animation.

use engine_core::{Transform, Vec3};
use physics::{ColliderTag, CollisionGroup, PhysicsWorld};

use crate::events::{AudioCue, EventQueue, GameEvent};
use crate::player::MountMode;

pub const FORCE_RANGE: f32 = 15.0;
/// Pull per unit of hit distance.
pub const PULL_STRENGTH: f32 = 0.001;
/// Targets this close are left alone.
pub const MIN_PULL_DISTANCE: f32 = 1.0;

const IDLE_ANIMATION_SPEED: f32 = 1.2;
const TRIGGERED_ANIMATION_SPEED: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FingerState {
    #[default]
    Opened,
    Closing,
    Closed,
    Opening,
}

/// A velocity change the hand wants applied to whatever it caught.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pull {
    pub target: ColliderTag,
    pub delta: Vec3,
    pub distance: f32,
}

/// Velocity change for a target `distance` away along `direction`.
pub fn pull_delta(direction: Vec3, distance: f32) -> Option<Vec3> {
    (distance > MIN_PULL_DISTANCE).then(|| direction * (-PULL_STRENGTH * distance))
}

#[derive(Debug)]
pub struct Hand {
    pub mount: Transform,
    pub local_position: Vec3,
    /// Euler angles (XYZ) relative to the mount.
    pub rotation: Vec3,
    pub force: bool,
    pub state: FingerState,
    pub progress: f32,
    pub speed: f32,
    /// 0 fully open, 1 fully closed.
    pub finger_curl: f32,
    rig_attached: bool,
}

impl Default for Hand {
    fn default() -> Self {
        Self::new()
    }
}

impl Hand {
    pub fn new() -> Self {
        let mut hand = Self {
            mount: Transform::default(),
            local_position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            force: false,
            state: FingerState::Opened,
            progress: 1.0,
            speed: IDLE_ANIMATION_SPEED,
            finger_curl: 0.0,
            rig_attached: false,
        };
        hand.set_mount_mode(MountMode::Desktop);
        hand
    }

    pub fn set_mount_mode(&mut self, mode: MountMode) {
        let (position, rotation) = match mode {
            MountMode::Desktop => (Vec3::new(-0.2, -0.4, -0.6), Vec3::new(-1.5, 0.0, 0.0)),
            MountMode::Xr => (
                Vec3::new(0.0, 0.0, 0.1),
                Vec3::new(-std::f32::consts::FRAC_PI_2, 0.0, 0.0),
            ),
        };
        self.local_position = position;
        self.rotation = rotation;
    }

    /// The finger skeleton is available; animation can run.
    pub fn attach_rig(&mut self) {
        self.rig_attached = true;
    }

    pub fn rig_attached(&self) -> bool {
        self.rig_attached
    }

    pub fn world_transform(&self) -> Transform {
        let local = Transform::from_position_euler(
            self.local_position,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        self.mount.mul_transform(&local)
    }

    pub fn force_pull(&mut self, events: &mut EventQueue) {
        self.force = true;
        events.push(GameEvent::Play {
            cue: AudioCue::ForcePull,
            position: self.world_transform().position,
        });
        self.close();
    }

    pub fn force_release(&mut self, events: &mut EventQueue) {
        self.force = false;
        events.push(GameEvent::Stop {
            cue: AudioCue::ForcePull,
        });
        self.open();
    }

    pub fn close(&mut self) {
        if !self.rig_attached || self.state == FingerState::Closed {
            return;
        }
        self.state = FingerState::Closing;
        self.progress = 1.0 - self.progress;
        self.speed = TRIGGERED_ANIMATION_SPEED;
    }

    pub fn open(&mut self) {
        if !self.rig_attached || self.state == FingerState::Opened {
            return;
        }
        self.state = FingerState::Opening;
        self.progress = 1.0 - self.progress;
        self.speed = TRIGGERED_ANIMATION_SPEED;
    }

    /// Advance the finger animation.
    pub fn update(&mut self, dt: f32, events: &mut EventQueue) {
        if !self.rig_attached {
            return;
        }
        let step = dt * self.speed;
        match self.state {
            FingerState::Closing => {
                self.finger_curl = (self.finger_curl + step).min(1.0);
                self.progress += step;
                if self.progress >= 1.0 {
                    self.progress = 1.0;
                    self.state = FingerState::Closed;
                    events.push(GameEvent::HandClosed);
                }
            }
            FingerState::Opening => {
                self.finger_curl = (self.finger_curl - step).max(0.0);
                self.progress += step;
                if self.progress >= 1.0 {
                    self.progress = 1.0;
                    self.state = FingerState::Opened;
                    events.push(GameEvent::HandOpened);
                }
            }
            FingerState::Opened | FingerState::Closed => {}
        }
    }

    /// Nearest trooper or prop along the hand while the force is active.
    pub fn find_pull(&self, physics: &PhysicsWorld) -> Option<Pull> {
        if !self.force {
            return None;
        }
        let world = self.world_transform();
        let direction = world.up();
        let hit = physics.raycast(world.position, direction, FORCE_RANGE, CollisionGroup::force_targets())?;
        let target = hit.tag?;
        let delta = pull_delta(direction, hit.distance)?;
        Some(Pull {
            target,
            delta,
            distance: hit.distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rigged() -> Hand {
        let mut hand = Hand::new();
        hand.attach_rig();
        hand
    }

    #[test]
    fn pull_is_proportional_to_distance() {
        let near = pull_delta(Vec3::Y, 2.0).unwrap();
        let far = pull_delta(Vec3::Y, 8.0).unwrap();
        assert!((far.length() / near.length() - 4.0).abs() < 1e-5);
        assert!((near - Vec3::new(0.0, -0.002, 0.0)).length() < 1e-7);
    }

    #[test]
    fn point_blank_targets_are_not_pulled() {
        assert!(pull_delta(Vec3::Y, 1.0).is_none());
        assert!(pull_delta(Vec3::Y, 0.3).is_none());
    }

    #[test]
    fn force_ray_finds_nearest_prop() {
        let mut physics = PhysicsWorld::new();
        physics.add_ball(ColliderTag::Prop(7), CollisionGroup::Prop, Vec3::new(0.0, 5.0, 0.0), 0.2);
        physics.add_ball(ColliderTag::Prop(9), CollisionGroup::Prop, Vec3::new(0.0, 9.0, 0.0), 0.2);
        physics.update_query_pipeline();

        let mut hand = rigged();
        hand.local_position = Vec3::ZERO;
        hand.rotation = Vec3::ZERO;
        assert!(hand.find_pull(&physics).is_none());

        let mut events = EventQueue::new();
        hand.force_pull(&mut events);
        let pull = hand.find_pull(&physics).unwrap();
        assert_eq!(pull.target, ColliderTag::Prop(7));
        assert!((pull.distance - 4.8).abs() < 1e-4);
        assert!((pull.delta.y + 0.0048).abs() < 1e-6);
    }

    #[test]
    fn fingers_close_then_reopen() {
        let mut hand = rigged();
        let mut events = EventQueue::new();
        hand.force_pull(&mut events);
        assert_eq!(hand.state, FingerState::Closing);
        assert_eq!(hand.progress, 0.0);
        assert_eq!(hand.speed, 3.0);

        for _ in 0..40 {
            hand.update(0.01, &mut events);
        }
        assert_eq!(hand.state, FingerState::Closed);
        assert_eq!(hand.finger_curl, 1.0);

        hand.force_release(&mut events);
        for _ in 0..40 {
            hand.update(0.01, &mut events);
        }
        assert_eq!(hand.state, FingerState::Opened);
        let notices: Vec<_> = events
            .drain()
            .filter(|e| matches!(e, GameEvent::HandClosed | GameEvent::HandOpened))
            .collect();
        assert_eq!(notices, vec![GameEvent::HandClosed, GameEvent::HandOpened]);
    }

    #[test]
    fn release_mid_close_reverses_progress() {
        let mut hand = rigged();
        let mut events = EventQueue::new();
        hand.close();
        hand.update(0.1, &mut events);
        assert!((hand.progress - 0.3).abs() < 1e-5);
        hand.open();
        assert_eq!(hand.state, FingerState::Opening);
        assert!((hand.progress - 0.7).abs() < 1e-5);
    }

    #[test]
    fn unrigged_hand_still_pulls_but_does_not_animate() {
        let mut hand = Hand::new();
        let mut events = EventQueue::new();
        hand.force_pull(&mut events);
        assert!(hand.force);
        assert_eq!(hand.state, FingerState::Opened);
        hand.update(1.0, &mut events);
        assert!(!events.iter().any(|e| *e == GameEvent::HandClosed));
    }
}
