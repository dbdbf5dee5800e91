//! Capsule-driven character movement.

use crate::octree::{QueryScratch, WorldIndex};
use crate::shapes::{Capsule, Intersection};
use engine_core::Vec3;

/// Exponential velocity decay rate while touching the ground.
pub const GROUND_DAMPING_RATE: f32 = 4.0;
/// Fraction of the ground damping that applies in the air.
pub const AIR_DAMPING_SCALE: f32 = 0.1;

/// Velocity, grounded flag and collision capsule shared by every actor.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicBody {
    pub capsule: Capsule,
    pub velocity: Vec3,
    pub on_floor: bool,
    pub gravity: f32,
}

impl KinematicBody {
    pub fn new(capsule: Capsule, gravity: f32) -> Self {
        Self {
            capsule,
            velocity: Vec3::ZERO,
            on_floor: false,
            gravity,
        }
    }

    /// Advance one fixed substep: gravity, damping, translation, then collision.
    pub fn step(
        &mut self,
        dt: f32,
        world: &WorldIndex,
        scratch: &mut QueryScratch,
    ) -> Option<Intersection> {
        let mut damping = (-GROUND_DAMPING_RATE * dt).exp() - 1.0;
        if !self.on_floor {
            self.velocity.y -= self.gravity * dt;
            damping *= AIR_DAMPING_SCALE;
        }
        self.velocity += self.velocity * damping;
        self.capsule.translate(self.velocity * dt);
        self.resolve(world, scratch)
    }

    /// Push the capsule out of the world and classify the contact.
    pub fn resolve(&mut self, world: &WorldIndex, scratch: &mut QueryScratch) -> Option<Intersection> {
        let Some(hit) = world.capsule_intersect_with(&self.capsule, scratch) else {
            self.on_floor = false;
            return None;
        };

        self.on_floor = hit.normal.y > 0.0;
        let along = hit.normal.dot(self.velocity);
        if !self.on_floor {
            // Slide along walls and ceilings.
            self.velocity -= hit.normal * along;
        } else if along < 0.0 {
            // Landing: keep tangential motion, drop the part driving into the floor.
            self.velocity -= hit.normal * along;
        }
        self.capsule.translate(hit.normal * hit.depth);
        Some(hit)
    }

    /// Feet-anchored position: the top of the segment minus one radius.
    pub fn position(&self) -> Vec3 {
        self.capsule.end - Vec3::Y * self.capsule.radius
    }

    /// Move the capsule so its segment starts at `base`, keeping its height.
    pub fn place(&mut self, base: Vec3) {
        let height = self.capsule.end - self.capsule.start;
        self.capsule.start = base;
        self.capsule.end = base + height;
        self.velocity = Vec3::ZERO;
        self.on_floor = true;
    }

    pub fn horizontal_speed(&self) -> f32 {
        Vec3::new(self.velocity.x, 0.0, self.velocity.z).length()
    }
}
