//! The blade: ignition ramp, swing animation and continuous hit detection.

use engine_core::{Entity, Quat, Transform, Vec3};
use physics::{
    ColliderHandle, ColliderTag, CollisionGroup, PhysicsWorld, PieceId, QueryScratch, WorldIndex,
};

use crate::events::{AudioCue, EventQueue, GameEvent};
use crate::player::MountMode;

/// Blade length at full ignition. Hit rays reach `BLADE_HEIGHT * scale`.
pub const BLADE_HEIGHT: f32 = 1.2;
/// Blade scale while switched off. Anything above counts as on.
pub const MIN_SCALE: f32 = 0.001;
pub const IGNITION_STEP_SCALE: f32 = 0.1;
pub const IGNITION_STEP_SECONDS: f32 = 0.01;
pub const SWING_MAX_SPEED: f32 = 30.0;
pub const SWING_DAMAGE: f32 = 5.0;
pub const BLADE_SPIN_RATE: f32 = 0.5;

const BLADE_HALF_WIDTH: f32 = 0.02;
const PARKED: Vec3 = Vec3::new(0.0, -100.0, 0.0);

const IGNITION_STEPS: u32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwingState {
    #[default]
    No,
    Swing,
    SwingBack,
}

/// Something the blade ray passed through this substep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BladeTarget {
    Trooper(Entity),
    Piece(PieceId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BladeHit {
    pub target: BladeTarget,
    pub point: Vec3,
    pub distance: f32,
}

#[derive(Debug)]
pub struct Saber {
    /// Transform the saber hangs from (camera or controller), refreshed each substep.
    pub mount: Transform,
    pub local_position: Vec3,
    /// Euler angles (XYZ) relative to the mount.
    pub rotation: Vec3,
    pub initial_rotation: Vec3,
    pub scale: f32,
    pub light: f32,
    pub swing: SwingState,
    /// Cosmetic roll of the blade mesh.
    pub blade_spin: f32,
    pub collider: ColliderHandle,
    ignition: Option<Ignition>,
    in_contact: bool,
}

#[derive(Debug, Clone, Copy)]
struct Ignition {
    clock: f32,
    steps: u32,
}

impl Saber {
    pub fn new(physics: &mut PhysicsWorld) -> Self {
        let collider = physics.add_cuboid(
            ColliderTag::Saber,
            CollisionGroup::Saber,
            Vec3::new(BLADE_HALF_WIDTH, BLADE_HEIGHT * 0.5, BLADE_HALF_WIDTH),
            PARKED,
            Quat::IDENTITY,
        );
        let mut saber = Self {
            mount: Transform::default(),
            local_position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            initial_rotation: Vec3::ZERO,
            scale: MIN_SCALE,
            light: 0.0,
            swing: SwingState::No,
            blade_spin: 0.0,
            collider,
            ignition: None,
            in_contact: false,
        };
        saber.set_mount_mode(MountMode::Desktop);
        saber
    }

    /// Switch between the camera-held and controller-held placements.
    pub fn set_mount_mode(&mut self, mode: MountMode) {
        let (position, rotation) = match mode {
            MountMode::Desktop => (
                Vec3::new(0.2, -0.3, -0.6),
                Vec3::new(-std::f32::consts::FRAC_PI_4, 0.0, -0.7),
            ),
            MountMode::Xr => (Vec3::ZERO, Vec3::new(-std::f32::consts::FRAC_PI_4, 0.0, 0.0)),
        };
        self.local_position = position;
        self.set_initial_rotation(rotation);
    }

    /// New rest orientation. Takes effect immediately unless a swing is running.
    pub fn set_initial_rotation(&mut self, rotation: Vec3) {
        self.initial_rotation = rotation;
        if self.swing == SwingState::No {
            self.rotation = rotation;
        }
    }

    pub fn is_on(&self) -> bool {
        self.scale > MIN_SCALE
    }

    pub fn on(&mut self, events: &mut EventQueue) {
        if self.is_on() {
            return;
        }
        self.scale = IGNITION_STEP_SCALE;
        self.light = 2.0 * self.scale;
        self.ignition = Some(Ignition { clock: 0.0, steps: 0 });
        events.push(GameEvent::Play {
            cue: AudioCue::SaberIgnite,
            position: self.handle_position(),
        });
        log::debug!("Saber ignited");
    }

    pub fn off(&mut self, events: &mut EventQueue) {
        if !self.is_on() {
            return;
        }
        self.scale = MIN_SCALE;
        self.light = 0.0;
        self.ignition = None;
        events.push(GameEvent::Stop {
            cue: AudioCue::SaberIgnite,
        });
        events.push(GameEvent::Stop {
            cue: AudioCue::SaberHum,
        });
        if self.in_contact {
            self.in_contact = false;
            events.push(GameEvent::SaberContactCleared);
        }
        log::debug!("Saber off");
    }

    pub fn toggle(&mut self, events: &mut EventQueue) {
        if self.is_on() {
            self.off(events);
        } else {
            self.on(events);
        }
    }

    /// Start a swing. Ignored while one is already running.
    pub fn swing(&mut self, events: &mut EventQueue) {
        if self.swing != SwingState::No {
            return;
        }
        self.swing = SwingState::Swing;
        if self.is_on() {
            events.push(GameEvent::Play {
                cue: AudioCue::SaberSwing,
                position: self.handle_position(),
            });
        }
    }

    pub fn update(&mut self, dt: f32, events: &mut EventQueue) {
        if self.is_on() {
            self.blade_spin += dt * BLADE_SPIN_RATE;
        }
        self.advance_ignition(dt, events);
        self.advance_swing(dt, events);
    }

    fn advance_ignition(&mut self, dt: f32, events: &mut EventQueue) {
        let Some(ignition) = self.ignition.as_mut() else {
            return;
        };
        ignition.clock += dt;
        while ignition.clock >= IGNITION_STEP_SECONDS && ignition.steps < IGNITION_STEPS {
            ignition.clock -= IGNITION_STEP_SECONDS;
            ignition.steps += 1;
        }
        // Derived from the step count so the ramp lands exactly on 1.
        let steps = ignition.steps;
        self.scale = IGNITION_STEP_SCALE * (steps + 1) as f32;
        self.light = 2.0 * self.scale;
        if steps >= IGNITION_STEPS {
            self.scale = 1.0;
            self.light = 2.0;
            self.ignition = None;
            events.push(GameEvent::Play {
                cue: AudioCue::SaberHum,
                position: self.handle_position(),
            });
        }
    }

    fn advance_swing(&mut self, dt: f32, events: &mut EventQueue) {
        match self.swing {
            SwingState::No => {}
            SwingState::Swing => {
                let speed = SWING_MAX_SPEED * (self.rotation.z / 2.0).clamp(0.5, 1.0);
                self.rotation.z += dt * speed;
                self.rotation.x -= dt * speed * 0.5;
                if self.rotation.z >= 1.0 {
                    self.swing = SwingState::SwingBack;
                }
            }
            SwingState::SwingBack => {
                let speed = SWING_MAX_SPEED * (self.rotation.z / 2.0).clamp(0.1, 1.0);
                self.rotation.z -= dt * speed;
                self.rotation.x += dt * speed * 0.5;
                if self.rotation.z <= self.initial_rotation.z {
                    self.rotation.x = self.initial_rotation.x;
                    self.rotation.z = self.initial_rotation.z;
                    self.swing = SwingState::No;
                    events.push(GameEvent::Stop {
                        cue: AudioCue::SaberSwing,
                    });
                }
            }
        }
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

    pub fn handle_position(&self) -> Vec3 {
        self.world_transform().position
    }

    /// Unit vector from the handle towards the tip.
    pub fn blade_direction(&self) -> Vec3 {
        self.world_transform().up()
    }

    pub fn blade_length(&self) -> f32 {
        BLADE_HEIGHT * self.scale
    }

    pub fn tip_position(&self) -> Vec3 {
        self.handle_position() + self.blade_direction() * self.blade_length()
    }

    /// Pose the blade collider that blocks lasers; parked out of the way while off.
    pub fn sync_collider(&self, physics: &mut PhysicsWorld) {
        if !self.is_on() {
            physics.set_pose(self.collider, PARKED, Quat::IDENTITY);
            return;
        }
        let world = self.world_transform();
        let center = world.position + world.up() * (BLADE_HEIGHT * 0.5);
        physics.set_pose(self.collider, center, world.rotation);
    }

    /// Every trooper and level piece along the blade, nearest first.
    pub fn detect_hits(
        &self,
        physics: &PhysicsWorld,
        world: &WorldIndex,
        scratch: &mut QueryScratch,
    ) -> Vec<BladeHit> {
        if !self.is_on() {
            return Vec::new();
        }
        let origin = self.handle_position();
        let direction = self.blade_direction();
        let length = self.blade_length();

        let mut hits: Vec<BladeHit> = physics
            .raycast_all(origin, direction, length, CollisionGroup::saber_targets())
            .into_iter()
            .filter_map(|hit| match hit.tag {
                Some(ColliderTag::Enemy(bits)) => Entity::from_bits(bits).map(|entity| BladeHit {
                    target: BladeTarget::Trooper(entity),
                    point: hit.point,
                    distance: hit.distance,
                }),
                _ => None,
            })
            .collect();

        hits.extend(
            world
                .ray_intersect_pieces(origin, direction, length, scratch)
                .iter()
                .map(|hit| BladeHit {
                    target: BladeTarget::Piece(hit.piece),
                    point: hit.point,
                    distance: hit.distance,
                }),
        );
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Raise a contact flare per hit, or clear it when the blade touches nothing.
    pub fn report_contacts(&mut self, hits: &[BladeHit], events: &mut EventQueue) {
        if hits.is_empty() {
            if self.in_contact {
                self.in_contact = false;
                events.push(GameEvent::SaberContactCleared);
            }
            return;
        }
        self.in_contact = true;
        for hit in hits {
            events.push(GameEvent::SaberContact {
                point: hit.point,
                light_offset: hit.distance - 0.6 - 0.5,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use physics::TriangleMesh;

    fn saber() -> (Saber, PhysicsWorld) {
        let mut physics = PhysicsWorld::new();
        let saber = Saber::new(&mut physics);
        (saber, physics)
    }

    #[test]
    fn ignition_ramps_to_full_scale() {
        let (mut saber, _physics) = saber();
        let mut events = EventQueue::new();
        assert!(!saber.is_on());

        saber.on(&mut events);
        assert!(saber.is_on());
        assert!((saber.scale - 0.1).abs() < 1e-6);

        for _ in 0..4 {
            saber.update(IGNITION_STEP_SECONDS, &mut events);
        }
        assert!((saber.scale - 0.5).abs() < 1e-6);
        assert!((saber.light - 1.0).abs() < 1e-6);

        for _ in 0..10 {
            saber.update(IGNITION_STEP_SECONDS, &mut events);
        }
        assert_eq!(saber.scale, 1.0);
        assert_eq!(saber.light, 2.0);
        let hums = events
            .iter()
            .filter(|e| matches!(e, GameEvent::Play { cue: AudioCue::SaberHum, .. }))
            .count();
        assert_eq!(hums, 1);
    }

    #[test]
    fn off_resets_scale_and_light() {
        let (mut saber, _physics) = saber();
        let mut events = EventQueue::new();
        saber.toggle(&mut events);
        saber.update(0.2, &mut events);
        saber.toggle(&mut events);
        assert!(!saber.is_on());
        assert_eq!(saber.scale, MIN_SCALE);
        assert_eq!(saber.light, 0.0);
        assert!(events.iter().any(|e| *e == GameEvent::Stop { cue: AudioCue::SaberHum }));
    }

    #[test]
    fn swing_returns_exactly_to_rest() {
        let (mut saber, _physics) = saber();
        let mut events = EventQueue::new();
        for mode in [MountMode::Desktop, MountMode::Xr] {
            saber.set_mount_mode(mode);
            let rest = saber.rotation;
            saber.swing(&mut events);
            assert_eq!(saber.swing, SwingState::Swing);

            let mut saw_back = false;
            for _ in 0..10_000 {
                saber.update(0.002, &mut events);
                saw_back |= saber.swing == SwingState::SwingBack;
                if saber.swing == SwingState::No {
                    break;
                }
            }
            assert!(saw_back);
            assert_eq!(saber.swing, SwingState::No);
            assert_eq!(saber.rotation.x, rest.x);
            assert_eq!(saber.rotation.z, rest.z);
        }
    }

    #[test]
    fn swing_does_not_retrigger() {
        let (mut saber, _physics) = saber();
        let mut events = EventQueue::new();
        saber.swing(&mut events);
        saber.update(0.01, &mut events);
        let z = saber.rotation.z;
        saber.swing(&mut events);
        assert_eq!(saber.swing, SwingState::Swing);
        assert_eq!(saber.rotation.z, z);
        // Swing cue only plays with the blade lit.
        assert!(events.is_empty());
    }

    #[test]
    fn blade_hits_every_piece_along_its_length() {
        let (mut saber, _physics) = saber();
        let mut events = EventQueue::new();
        saber.mount = Transform::default();
        saber.local_position = Vec3::ZERO;
        saber.set_initial_rotation(Vec3::ZERO);
        saber.on(&mut events);
        saber.update(0.5, &mut events);

        // Two thin slabs stacked along +Y, both inside the blade.
        let low = TriangleMesh::cuboid(Vec3::new(0.0, 0.4, 0.0), Vec3::new(0.5, 0.05, 0.5));
        let high = TriangleMesh::cuboid(Vec3::new(0.0, 0.9, 0.0), Vec3::new(0.5, 0.05, 0.5));
        let far = TriangleMesh::cuboid(Vec3::new(0.0, 3.0, 0.0), Vec3::new(0.5, 0.05, 0.5));
        let world = WorldIndex::build([(1, &low), (2, &high), (3, &far)]);

        let mut physics = PhysicsWorld::new();
        physics.update_query_pipeline();
        let hits = saber.detect_hits(&physics, &world, &mut QueryScratch::new());
        let pieces: Vec<_> = hits.iter().map(|h| h.target).collect();
        assert_eq!(pieces, vec![BladeTarget::Piece(1), BladeTarget::Piece(2)]);
        assert!((hits[0].distance - 0.35).abs() < 1e-4);

        saber.report_contacts(&hits, &mut events);
        events.drain().count();
        saber.report_contacts(&[], &mut events);
        assert_eq!(events.drain().collect::<Vec<_>>(), vec![GameEvent::SaberContactCleared]);
    }

    #[test]
    fn half_ignited_blade_reaches_half_as_far() {
        let (mut saber, _physics) = saber();
        let mut events = EventQueue::new();
        saber.mount = Transform::default();
        saber.local_position = Vec3::ZERO;
        saber.set_initial_rotation(Vec3::ZERO);
        saber.on(&mut events);
        for _ in 0..4 {
            saber.update(IGNITION_STEP_SECONDS, &mut events);
        }
        assert!((saber.blade_length() - 0.6).abs() < 1e-5);

        let low = TriangleMesh::cuboid(Vec3::new(0.0, 0.4, 0.0), Vec3::new(0.5, 0.05, 0.5));
        let high = TriangleMesh::cuboid(Vec3::new(0.0, 0.9, 0.0), Vec3::new(0.5, 0.05, 0.5));
        let world = WorldIndex::build([(1, &low), (2, &high)]);
        let mut physics = PhysicsWorld::new();
        physics.update_query_pipeline();
        let hits = saber.detect_hits(&physics, &world, &mut QueryScratch::new());
        let pieces: Vec<_> = hits.iter().map(|h| h.target).collect();
        assert_eq!(pieces, vec![BladeTarget::Piece(1)]);
    }

    #[test]
    fn unlit_blade_hits_nothing() {
        let (saber, physics) = saber();
        let floor = TriangleMesh::floor(Vec3::ZERO, 5.0, 5.0);
        let world = WorldIndex::build([(0, &floor)]);
        assert!(saber.detect_hits(&physics, &world, &mut QueryScratch::new()).is_empty());
    }
}
