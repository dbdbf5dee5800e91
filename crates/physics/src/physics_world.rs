//! Rapier3D collider world for the moving targets rays are cast against.
//!
//! Nothing here is simulated by rapier: actors move through their own
//! `KinematicBody`, and their colliders are re-posed every substep before
//! the weapon queries run.

use crate::collision::{CollisionGroup, ColliderTag};
use crate::shapes::Capsule;
use engine_core::{Quat, Vec3};
use rapier3d::na::{Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::*;

/// Parentless colliders plus the query pipeline over them.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub island_manager: IslandManager,
    pub query_pipeline: QueryPipeline,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

fn to_isometry(position: Vec3, rotation: Quat) -> Isometry<Real> {
    let rotation = UnitQuaternion::new_normalize(Quaternion::new(
        rotation.w, rotation.x, rotation.y, rotation.z,
    ));
    Isometry::from_parts(Translation3::new(position.x, position.y, position.z), rotation)
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            island_manager: IslandManager::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Update query pipeline after colliders moved.
    pub fn update_query_pipeline(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// Add an upright capsule collider matching `capsule`.
    pub fn add_capsule(
        &mut self,
        tag: ColliderTag,
        group: CollisionGroup,
        capsule: &Capsule,
    ) -> ColliderHandle {
        let half_height = (capsule.end.y - capsule.start.y).max(0.0) * 0.5;
        let collider = ColliderBuilder::capsule_y(half_height, capsule.radius)
            .translation(to_vector(capsule.center()))
            .collision_groups(group.membership())
            .user_data(tag.encode())
            .build();
        self.collider_set.insert(collider)
    }

    /// Add a sphere collider.
    pub fn add_ball(
        &mut self,
        tag: ColliderTag,
        group: CollisionGroup,
        center: Vec3,
        radius: f32,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::ball(radius)
            .translation(to_vector(center))
            .collision_groups(group.membership())
            .user_data(tag.encode())
            .build();
        self.collider_set.insert(collider)
    }

    /// Add a box collider with the given pose.
    pub fn add_cuboid(
        &mut self,
        tag: ColliderTag,
        group: CollisionGroup,
        half_extents: Vec3,
        position: Vec3,
        rotation: Quat,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .position(to_isometry(position, rotation))
            .collision_groups(group.membership())
            .user_data(tag.encode())
            .build();
        self.collider_set.insert(collider)
    }

    /// Re-centre a capsule collider on its body's capsule.
    pub fn sync_capsule(&mut self, handle: ColliderHandle, capsule: &Capsule) {
        self.set_translation(handle, capsule.center());
    }

    pub fn set_translation(&mut self, handle: ColliderHandle, position: Vec3) {
        if let Some(collider) = self.collider_set.get_mut(handle) {
            collider.set_translation(to_vector(position));
        }
    }

    pub fn set_pose(&mut self, handle: ColliderHandle, position: Vec3, rotation: Quat) {
        if let Some(collider) = self.collider_set.get_mut(handle) {
            collider.set_position(to_isometry(position, rotation));
        }
    }

    /// Tag stored on a collider, if it still exists.
    pub fn tag(&self, handle: ColliderHandle) -> Option<ColliderTag> {
        self.collider_set
            .get(handle)
            .and_then(|collider| ColliderTag::decode(collider.user_data))
    }

    /// Remove a collider by its handle.
    pub fn remove_collider(&mut self, handle: ColliderHandle) {
        self.collider_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.rigid_body_set,
            true,
        );
    }

    pub fn collider_count(&self) -> usize {
        self.collider_set.len()
    }
}
