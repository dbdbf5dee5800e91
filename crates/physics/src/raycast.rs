//! Ray queries against tagged target colliders.

use crate::collision::ColliderTag;
use crate::PhysicsWorld;
use engine_core::Vec3;
use rapier3d::prelude::*;

/// Result of a raycast query.
#[derive(Debug, Clone, Copy)]
pub struct RaycastHit {
    /// The collider that was hit.
    pub collider: ColliderHandle,
    /// What the collider belongs to.
    pub tag: Option<ColliderTag>,
    /// Distance along the ray to the hit point.
    pub distance: f32,
    /// World position of the hit.
    pub point: Vec3,
    /// Surface normal at the hit point.
    pub normal: Vec3,
}

/// Normalised ray, or `None` when the direction cannot define one.
fn make_ray(origin: Vec3, direction: Vec3, max_distance: f32) -> Option<Ray> {
    let dir = direction.try_normalize()?;
    if !origin.is_finite() || !(max_distance > 0.0) {
        return None;
    }
    Some(Ray::new(
        point![origin.x, origin.y, origin.z],
        vector![dir.x, dir.y, dir.z],
    ))
}

impl PhysicsWorld {
    fn to_hit(&self, ray: &Ray, collider: ColliderHandle, intersection: RayIntersection) -> RaycastHit {
        let point = ray.point_at(intersection.time_of_impact);
        RaycastHit {
            collider,
            tag: self.tag(collider),
            distance: intersection.time_of_impact,
            point: Vec3::new(point.x, point.y, point.z),
            normal: Vec3::new(
                intersection.normal.x,
                intersection.normal.y,
                intersection.normal.z,
            ),
        }
    }

    /// Cast a ray and return the first hit among colliders in `groups`.
    ///
    /// Degenerate directions return `None`.
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        groups: InteractionGroups,
    ) -> Option<RaycastHit> {
        let ray = make_ray(origin, direction, max_distance)?;
        let filter = QueryFilter::default().groups(groups);

        self.query_pipeline
            .cast_ray_and_get_normal(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                max_distance,
                true,
                filter,
            )
            .map(|(collider, intersection)| self.to_hit(&ray, collider, intersection))
    }

    /// Cast a ray and return all hits up to `max_distance`, nearest first.
    pub fn raycast_all(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        groups: InteractionGroups,
    ) -> Vec<RaycastHit> {
        let Some(ray) = make_ray(origin, direction, max_distance) else {
            return Vec::new();
        };
        let filter = QueryFilter::default().groups(groups);
        let mut hits = Vec::new();

        self.query_pipeline.intersections_with_ray(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            max_distance,
            true,
            filter,
            |collider, intersection: RayIntersection| {
                hits.push(self.to_hit(&ray, collider, intersection));
                true // Continue searching
            },
        );

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}
