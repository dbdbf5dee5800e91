//! Player controller: movement, camera rig, damage and weapon mounts.

use engine_core::{EulerRot, Health, Quat, Transform, Vec2, Vec3};
use input::ControllerPose;
use physics::{
    Capsule, ColliderHandle, ColliderTag, CollisionGroup, Intersection, KinematicBody,
    PhysicsWorld, QueryScratch, WorldIndex,
};

use crate::damage::{DamageOutcome, Damageable};
use crate::events::{EventQueue, GameEvent};

pub const PLAYER_CAPSULE_HEIGHT: f32 = 0.3;
pub const PLAYER_RADIUS: f32 = 0.8;
pub const PLAYER_DAMAGE_MULTIPLIER: f32 = 0.1;
pub const EYE_HEIGHT: f32 = 1.5;
pub const JUMP_SPEED: f32 = 15.0;
/// Speed gained per second of held input while grounded.
pub const GROUND_ACCELERATION: f32 = 25.0;
/// Reduced acceleration while airborne.
pub const AIR_ACCELERATION: f32 = 8.0;
pub const HIT_CUE_SECONDS: f32 = 0.2;
/// Radians of camera turn per unit of look delta.
pub const LOOK_SENSITIVITY: f32 = 1.0 / 500.0;
/// Yaw applied per substep while an XR thumbstick is pushed sideways.
pub const XR_TURN_STEP: f32 = 0.005;

const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Where the weapons hang: on the camera or on tracked controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountMode {
    Desktop,
    Xr,
}

/// First-person camera attached to the player at eye height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    pub yaw: f32,
    pub pitch: f32,
    pub eye_height: f32,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            eye_height: EYE_HEIGHT,
        }
    }
}

impl CameraRig {
    /// Yaw first, then pitch.
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    /// Unit vector the camera looks along.
    pub fn world_direction(&self) -> Vec3 {
        self.rotation() * Vec3::NEG_Z
    }

    pub fn apply_look(&mut self, delta: Vec2) {
        self.yaw -= delta.x * LOOK_SENSITIVITY;
        self.pitch = (self.pitch - delta.y * LOOK_SENSITIVITY).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// World transform of the camera for a player standing at `position`.
    pub fn transform(&self, position: Vec3) -> Transform {
        Transform::from_position_rotation(position + Vec3::Y * self.eye_height, self.rotation())
    }
}

pub struct Player {
    pub body: KinematicBody,
    pub health: Health,
    pub camera: CameraRig,
    pub collider: ColliderHandle,
    pub mount_mode: MountMode,
    hit_cue: f32,
}

impl Player {
    pub fn new(spawn: Vec3, gravity: f32, physics: &mut PhysicsWorld) -> Self {
        let capsule = Capsule::upright(spawn, PLAYER_CAPSULE_HEIGHT, PLAYER_RADIUS);
        let collider = physics.add_capsule(ColliderTag::Player, CollisionGroup::Player, &capsule);
        let mut body = KinematicBody::new(capsule, gravity);
        body.on_floor = true;
        Self {
            body,
            health: Health::new(100.0),
            camera: CameraRig::default(),
            collider,
            mount_mode: MountMode::Desktop,
            hit_cue: 0.0,
        }
    }

    /// Camera direction flattened onto the ground plane.
    pub fn forward_vector(&self) -> Vec3 {
        let mut direction = self.camera.world_direction();
        direction.y = 0.0;
        direction.normalize_or_zero()
    }

    pub fn side_vector(&self) -> Vec3 {
        self.forward_vector().cross(Vec3::Y)
    }

    /// Add movement from analog input in `[-1, 1]`; jump only takes effect on the floor.
    pub fn apply_input_velocity(&mut self, forward: f32, side: f32, jump: bool, dt: f32) {
        let speed_delta = dt
            * if self.body.on_floor {
                GROUND_ACCELERATION
            } else {
                AIR_ACCELERATION
            };
        let delta = self.forward_vector() * (forward * speed_delta)
            + self.side_vector() * (side * speed_delta);
        self.body.velocity += delta;

        if jump && self.body.on_floor {
            self.body.velocity.y = JUMP_SPEED;
        }
    }

    /// Integrate one substep against the world.
    pub fn update(
        &mut self,
        dt: f32,
        world: &WorldIndex,
        scratch: &mut QueryScratch,
    ) -> Option<Intersection> {
        self.body.step(dt, world, scratch)
    }

    pub fn position(&self) -> Vec3 {
        self.body.position()
    }

    pub fn camera_transform(&self) -> Transform {
        self.camera.transform(self.position())
    }

    /// Play-space origin: the player's feet, turned by the camera yaw.
    pub fn rig_transform(&self) -> Transform {
        Transform::from_position_rotation(self.position(), Quat::from_rotation_y(self.camera.yaw))
    }

    /// World transform a weapon hangs from: the camera on desktop, a controller in XR.
    pub fn mount_transform(&self, controller: Option<ControllerPose>) -> Transform {
        match (self.mount_mode, controller) {
            (MountMode::Xr, Some(pose)) => self
                .rig_transform()
                .mul_transform(&Transform::from_position_rotation(pose.position, pose.rotation)),
            _ => self.camera_transform(),
        }
    }

    /// Move the capsule so it starts at `position`, at rest and grounded.
    pub fn teleport(&mut self, position: Vec3) {
        self.body.place(position);
        log::debug!("Player teleported to {:?}", position);
    }

    /// Full health for a new round.
    pub fn reset(&mut self, spawn: Vec3) {
        self.health.restore();
        self.hit_cue = 0.0;
        self.teleport(spawn);
    }

    /// Apply weapon damage and report the result to the presentation layer.
    pub fn take_hit(&mut self, amount: f32, events: &mut EventQueue) -> DamageOutcome {
        let outcome = self.damage(amount);
        match outcome {
            DamageOutcome::Ignored => {}
            DamageOutcome::Wounded => events.push(GameEvent::PlayerHit {
                health: self.health.current,
            }),
            DamageOutcome::Killed => {
                log::info!("Player defeated");
                events.push(GameEvent::PlayerHit { health: 0.0 });
                events.push(GameEvent::PlayerDefeated);
            }
        }
        outcome
    }

    pub fn sync_collider(&self, physics: &mut PhysicsWorld) {
        physics.sync_capsule(self.collider, &self.body.capsule);
    }

    pub fn hit_cue_active(&self) -> bool {
        self.hit_cue > 0.0
    }

    /// Count down the hit flash. Returns true on the substep it ends.
    pub fn tick_hit_cue(&mut self, dt: f32) -> bool {
        if self.hit_cue <= 0.0 {
            return false;
        }
        self.hit_cue -= dt;
        self.hit_cue <= 0.0
    }
}

impl Damageable for Player {
    fn damage(&mut self, amount: f32) -> DamageOutcome {
        if self.health.is_dead() {
            return DamageOutcome::Ignored;
        }
        self.health.take_damage(amount * PLAYER_DAMAGE_MULTIPLIER);
        self.hit_cue = HIT_CUE_SECONDS;
        if self.health.is_dead() {
            DamageOutcome::Killed
        } else {
            DamageOutcome::Wounded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use physics::TriangleMesh;

    fn player() -> Player {
        let mut physics = PhysicsWorld::new();
        Player::new(Vec3::new(0.0, 0.8, 0.0), 34.3, &mut physics)
    }

    #[test]
    fn jump_only_from_floor() {
        let mut p = player();
        p.body.on_floor = false;
        p.body.velocity.y = -3.0;
        p.apply_input_velocity(0.0, 0.0, true, 0.01);
        assert_eq!(p.body.velocity.y, -3.0);

        p.body.on_floor = true;
        p.apply_input_velocity(0.0, 0.0, true, 0.01);
        assert_eq!(p.body.velocity.y, JUMP_SPEED);
    }

    #[test]
    fn air_control_is_weaker() {
        let mut p = player();
        p.apply_input_velocity(1.0, 0.0, false, 0.01);
        let grounded = p.body.velocity.length();

        let mut p = player();
        p.body.on_floor = false;
        p.apply_input_velocity(1.0, 0.0, false, 0.01);
        let airborne = p.body.velocity.length();

        assert!((grounded - 0.25).abs() < 1e-5);
        assert!((airborne - 0.08).abs() < 1e-5);
    }

    #[test]
    fn forward_ignores_pitch() {
        let mut p = player();
        p.camera.pitch = -0.8;
        p.camera.yaw = std::f32::consts::FRAC_PI_2;
        let forward = p.forward_vector();
        assert!(forward.y.abs() < 1e-6);
        assert!((forward - Vec3::NEG_X).length() < 1e-5);
        assert!((p.side_vector() - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn damage_is_scaled_clamped_and_terminal() {
        let mut p = player();
        assert_eq!(p.damage(10.0), DamageOutcome::Wounded);
        assert!((p.health.current - 99.0).abs() < 1e-5);
        assert!(p.hit_cue_active());

        assert_eq!(p.damage(5000.0), DamageOutcome::Killed);
        assert_eq!(p.health.current, 0.0);
        assert_eq!(p.damage(10.0), DamageOutcome::Ignored);
        assert_eq!(p.health.current, 0.0);
    }

    #[test]
    fn hit_cue_ends_after_its_duration() {
        let mut p = player();
        p.damage(1.0);
        let mut ended_at = None;
        for step in 0..100 {
            if p.tick_hit_cue(0.01) {
                ended_at = Some(step);
                break;
            }
        }
        let ended_at = ended_at.unwrap();
        assert!((19..=20).contains(&ended_at));
        assert!(!p.hit_cue_active());
    }

    #[test]
    fn teleport_grounds_and_stops() {
        let mut p = player();
        p.body.velocity = Vec3::new(3.0, -40.0, 1.0);
        p.body.on_floor = false;
        p.teleport(Vec3::new(2.0, 1.0, 3.0));
        assert_eq!(p.body.capsule.start, Vec3::new(2.0, 1.0, 3.0));
        assert!((p.body.capsule.end.y - 1.3).abs() < 1e-6);
        assert_eq!(p.body.velocity, Vec3::ZERO);
        assert!(p.body.on_floor);
    }

    #[test]
    fn reset_restores_health() {
        let mut p = player();
        p.damage(5000.0);
        p.reset(Vec3::new(0.0, 0.8, 0.0));
        assert_eq!(p.health.current, 100.0);
    }

    #[test]
    fn standing_on_floor_stays_put() {
        let floor = TriangleMesh::floor(Vec3::ZERO, 10.0, 10.0);
        let world = WorldIndex::build([(0, &floor)]);
        let mut scratch = QueryScratch::new();
        let mut p = player();
        for _ in 0..200 {
            p.update(0.01, &world, &mut scratch);
        }
        assert!((p.body.capsule.start.y - PLAYER_RADIUS).abs() < 0.05);
        assert!((p.position().y - (PLAYER_CAPSULE_HEIGHT)).abs() < 0.05);
    }
}
