//! Octree over the static level triangles.
//!
//! The index is built once from a set of mesh pieces and answers capsule,
//! sphere and ray queries. It is never updated in place: destroying a piece
//! means rebuilding from the remaining pieces.

use crate::mesh::TriangleMesh;
use crate::shapes::{Aabb, Capsule, Intersection, Sphere, Triangle};
use engine_core::Vec3;

const MAX_TRIANGLES_PER_LEAF: usize = 8;
const MAX_DEPTH: u32 = 16;

/// Identifies which mesh piece a triangle came from.
pub type PieceId = u32;

#[derive(Debug, Clone, Copy)]
struct IndexedTriangle {
    triangle: Triangle,
    piece: PieceId,
}

#[derive(Debug, Clone)]
struct Node {
    bounds: Aabb,
    triangles: Vec<u32>,
    /// Indices into `WorldIndex::nodes`.
    children: Vec<u32>,
}

/// Append the subtree for `triangles` to `nodes` and return its root index.
fn build_node(
    nodes: &mut Vec<Node>,
    bounds: Aabb,
    triangles: Vec<u32>,
    depth: u32,
    all: &[IndexedTriangle],
) -> u32 {
    let index = nodes.len() as u32;
    if triangles.len() <= MAX_TRIANGLES_PER_LEAF || depth >= MAX_DEPTH {
        nodes.push(Node::leaf(bounds, triangles));
        return index;
    }

    let split: Vec<(Aabb, Vec<u32>)> = bounds
        .octants()
        .iter()
        .map(|octant| {
            let inside = triangles
                .iter()
                .copied()
                .filter(|&i| all[i as usize].triangle.bounds().intersects(octant))
                .collect();
            (*octant, inside)
        })
        .collect();

    // Splitting made no progress (every octant sees every triangle).
    if split.iter().all(|(_, inside)| inside.len() == triangles.len()) {
        nodes.push(Node::leaf(bounds, triangles));
        return index;
    }

    nodes.push(Node::leaf(bounds, Vec::new()));
    let children = split
        .into_iter()
        .filter(|(_, inside)| !inside.is_empty())
        .map(|(octant, inside)| build_node(nodes, octant, inside, depth + 1, all))
        .collect();
    nodes[index as usize].children = children;
    index
}

impl Node {
    fn leaf(bounds: Aabb, triangles: Vec<u32>) -> Node {
        Node {
            bounds,
            triangles,
            children: Vec::new(),
        }
    }
}

/// Reusable buffers for hot-path queries: candidate triangles, the
/// traversal stack and per-piece ray hits.
#[derive(Debug, Default)]
pub struct QueryScratch {
    candidates: Vec<u32>,
    stack: Vec<u32>,
    hits: Vec<RayHit>,
}

impl QueryScratch {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A ray hit against the level geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub distance: f32,
    pub point: Vec3,
    /// Face normal turned towards the ray origin.
    pub normal: Vec3,
    pub piece: PieceId,
}

/// Static acceleration structure for world collision.
#[derive(Debug, Clone, Default)]
pub struct WorldIndex {
    triangles: Vec<IndexedTriangle>,
    /// Flattened tree; the root is at index 0 when non-empty.
    nodes: Vec<Node>,
}

impl WorldIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build<'a, I>(pieces: I) -> Self
    where
        I: IntoIterator<Item = (PieceId, &'a TriangleMesh)>,
    {
        let mut index = Self::new();
        index.rebuild(pieces);
        index
    }

    /// Discard the current tree and build a new one from `pieces`.
    pub fn rebuild<'a, I>(&mut self, pieces: I)
    where
        I: IntoIterator<Item = (PieceId, &'a TriangleMesh)>,
    {
        self.triangles.clear();
        self.nodes.clear();

        let mut degenerate = 0usize;
        let mut bounds = Aabb::empty();
        for (piece, mesh) in pieces {
            for triangle in mesh.triangles() {
                if triangle.is_degenerate() {
                    degenerate += 1;
                    continue;
                }
                bounds = bounds.union(&triangle.bounds());
                self.triangles.push(IndexedTriangle { triangle, piece });
            }
        }
        if degenerate > 0 {
            log::warn!("Skipped {} degenerate triangles while building world index", degenerate);
        }
        if self.triangles.is_empty() {
            log::debug!("World index built empty");
            return;
        }

        let pad = (bounds.size() * 0.01).max(Vec3::splat(0.01));
        let bounds = Aabb::new(bounds.min - pad, bounds.max + pad);
        let all: Vec<u32> = (0..self.triangles.len() as u32).collect();
        build_node(&mut self.nodes, bounds, all, 0, &self.triangles);
        log::debug!("World index built with {} triangles", self.triangles.len());
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Push-out vector for a capsule overlapping the world.
    pub fn capsule_intersect(&self, capsule: &Capsule) -> Option<Intersection> {
        self.capsule_intersect_with(capsule, &mut QueryScratch::new())
    }

    pub fn capsule_intersect_with(
        &self,
        capsule: &Capsule,
        scratch: &mut QueryScratch,
    ) -> Option<Intersection> {
        self.collect_overlapping(&capsule.bounds(), scratch);

        let mut working = *capsule;
        for &i in &scratch.candidates {
            if let Some(contact) = self.triangles[i as usize].triangle.capsule_contact(&working) {
                working.translate(contact.normal * contact.depth);
            }
        }
        displacement(working.center() - capsule.center())
    }

    /// Push-out vector for a sphere overlapping the world.
    pub fn sphere_intersect(&self, sphere: &Sphere) -> Option<Intersection> {
        self.sphere_intersect_with(sphere, &mut QueryScratch::new())
    }

    pub fn sphere_intersect_with(
        &self,
        sphere: &Sphere,
        scratch: &mut QueryScratch,
    ) -> Option<Intersection> {
        self.collect_overlapping(&sphere.bounds(), scratch);

        let mut working = *sphere;
        for &i in &scratch.candidates {
            if let Some(contact) = self.triangles[i as usize].triangle.sphere_contact(&working) {
                working.center += contact.normal * contact.depth;
            }
        }
        displacement(working.center - sphere.center)
    }

    /// Nearest triangle along the ray within `max_distance`.
    ///
    /// A zero-length or non-finite direction never hits anything.
    pub fn ray_intersect(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        self.ray_intersect_with(origin, direction, max_distance, &mut QueryScratch::new())
    }

    pub fn ray_intersect_with(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        scratch: &mut QueryScratch,
    ) -> Option<RayHit> {
        let dir = self.collect_along_ray(origin, direction, max_distance, scratch)?;
        scratch
            .candidates
            .iter()
            .filter_map(|&i| self.ray_hit(i, origin, dir, max_distance))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// Nearest hit per mesh piece along the ray, sorted by distance.
    /// The hits live in `scratch` until its next query.
    pub fn ray_intersect_pieces<'s>(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        scratch: &'s mut QueryScratch,
    ) -> &'s [RayHit] {
        scratch.hits.clear();
        let Some(dir) = self.collect_along_ray(origin, direction, max_distance, scratch) else {
            return &scratch.hits;
        };

        let QueryScratch {
            candidates, hits, ..
        } = &mut *scratch;
        for hit in candidates
            .iter()
            .filter_map(|&i| self.ray_hit(i, origin, dir, max_distance))
        {
            match hits.iter_mut().find(|h| h.piece == hit.piece) {
                Some(existing) if existing.distance > hit.distance => *existing = hit,
                Some(_) => {}
                None => hits.push(hit),
            }
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        &scratch.hits
    }

    fn ray_hit(&self, index: u32, origin: Vec3, dir: Vec3, max_distance: f32) -> Option<RayHit> {
        let entry = &self.triangles[index as usize];
        let distance = entry.triangle.ray_distance(origin, dir)?;
        if distance > max_distance {
            return None;
        }
        let normal = entry.triangle.normal();
        Some(RayHit {
            distance,
            point: origin + dir * distance,
            normal: if normal.dot(dir) > 0.0 { -normal } else { normal },
            piece: entry.piece,
        })
    }

    fn collect_overlapping(&self, bounds: &Aabb, scratch: &mut QueryScratch) {
        let QueryScratch {
            candidates, stack, ..
        } = &mut *scratch;
        candidates.clear();
        stack.clear();
        if self.nodes.is_empty() {
            return;
        }
        stack.push(0);
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if !node.bounds.intersects(bounds) {
                continue;
            }
            candidates.extend(
                node.triangles
                    .iter()
                    .copied()
                    .filter(|&i| self.triangles[i as usize].triangle.bounds().intersects(bounds)),
            );
            stack.extend_from_slice(&node.children);
        }
        candidates.sort_unstable();
        candidates.dedup();
    }

    /// Gathers candidates along a ray and returns the normalized direction,
    /// or `None` for a degenerate query.
    fn collect_along_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        scratch: &mut QueryScratch,
    ) -> Option<Vec3> {
        let QueryScratch {
            candidates, stack, ..
        } = &mut *scratch;
        candidates.clear();
        stack.clear();
        let dir = direction.try_normalize()?;
        if !origin.is_finite() || !(max_distance > 0.0) || self.nodes.is_empty() {
            return None;
        }
        stack.push(0);
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if !node.bounds.intersects_ray(origin, dir, max_distance) {
                continue;
            }
            candidates.extend_from_slice(&node.triangles);
            stack.extend_from_slice(&node.children);
        }
        candidates.sort_unstable();
        candidates.dedup();
        Some(dir)
    }
}

fn displacement(offset: Vec3) -> Option<Intersection> {
    let depth = offset.length();
    (depth > 1e-6).then(|| Intersection {
        normal: offset / depth,
        depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> (TriangleMesh, TriangleMesh) {
        let floor = TriangleMesh::floor(Vec3::ZERO, 20.0, 20.0);
        let wall = TriangleMesh::cuboid(Vec3::new(5.0, 2.0, 0.0), Vec3::new(0.5, 2.0, 5.0));
        (floor, wall)
    }

    fn index() -> WorldIndex {
        let (floor, wall) = arena();
        WorldIndex::build([(0, &floor), (1, &wall)])
    }

    #[test]
    fn capsule_sunk_into_floor_is_pushed_up() {
        let world = index();
        let capsule = Capsule::upright(Vec3::new(0.0, 0.3, 0.0), 1.0, 0.5);
        let hit = world.capsule_intersect(&capsule).unwrap();
        assert!((hit.normal - Vec3::Y).length() < 1e-4);
        assert!((hit.depth - 0.2).abs() < 1e-4);
    }

    #[test]
    fn capsule_against_wall_gets_horizontal_normal() {
        let world = index();
        let capsule = Capsule::upright(Vec3::new(4.2, 1.0, 0.0), 1.0, 0.5);
        let hit = world.capsule_intersect(&capsule).unwrap();
        assert!((hit.normal - Vec3::NEG_X).length() < 1e-4);
        assert!((hit.depth - 0.2).abs() < 1e-4);
    }

    #[test]
    fn resolved_capsule_no_longer_penetrates() {
        let world = index();
        let mut capsule = Capsule::upright(Vec3::new(4.3, 0.2, 0.0), 1.0, 0.5);
        let first = world.capsule_intersect(&capsule).unwrap();
        capsule.translate(first.normal * first.depth);
        let depth_after = world
            .capsule_intersect(&capsule)
            .map_or(0.0, |hit| hit.depth);
        assert!(depth_after <= first.depth);
        assert!(depth_after < 1e-3);
    }

    #[test]
    fn sphere_in_the_air_has_no_hit() {
        let world = index();
        assert!(world
            .sphere_intersect(&Sphere::new(Vec3::new(0.0, 3.0, 0.0), 0.2))
            .is_none());
    }

    #[test]
    fn sphere_on_floor_is_pushed_up() {
        let world = index();
        let hit = world
            .sphere_intersect(&Sphere::new(Vec3::new(-3.0, 0.1, 2.0), 0.2))
            .unwrap();
        assert!((hit.normal - Vec3::Y).length() < 1e-4);
        assert!((hit.depth - 0.1).abs() < 1e-4);
    }

    #[test]
    fn ray_reports_nearest_piece_first() {
        let world = index();
        let mut scratch = QueryScratch::new();
        let hits = world.ray_intersect_pieces(
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, -0.1, 0.0),
            50.0,
            &mut scratch,
        );
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].piece, 1);
        assert_eq!(hits[1].piece, 0);
        assert!(hits[0].distance < hits[1].distance);

        let nearest = world
            .ray_intersect(Vec3::new(0.0, 1.0, 0.0), Vec3::X, 50.0)
            .unwrap();
        assert_eq!(nearest.piece, 1);
        assert!((nearest.distance - 4.5).abs() < 1e-4);
        assert!((nearest.normal - Vec3::NEG_X).length() < 1e-4);
    }

    #[test]
    fn degenerate_ray_is_a_no_op() {
        let world = index();
        assert!(world.ray_intersect(Vec3::ZERO, Vec3::ZERO, 10.0).is_none());
        assert!(world
            .ray_intersect(Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 0.0), 10.0)
            .is_none());
        assert!(world
            .ray_intersect_pieces(Vec3::Y, Vec3::ZERO, 10.0, &mut QueryScratch::new())
            .is_empty());
    }

    #[test]
    fn rebuild_drops_removed_pieces() {
        let (floor, wall) = arena();
        let mut world = WorldIndex::build([(0, &floor), (1, &wall)]);
        assert_eq!(world.triangle_count(), 14);
        world.rebuild([(0, &floor)]);
        assert_eq!(world.triangle_count(), 2);
        assert!(world
            .ray_intersect(Vec3::new(0.0, 1.0, 0.0), Vec3::X, 50.0)
            .is_none());
    }

    #[test]
    fn many_small_boxes_split_into_leaves() {
        let boxes: Vec<TriangleMesh> = (0..40)
            .map(|i| TriangleMesh::cuboid(Vec3::new(i as f32 * 2.0, 0.5, 0.0), Vec3::splat(0.5)))
            .collect();
        let world = WorldIndex::build(boxes.iter().enumerate().map(|(i, m)| (i as u32, m)));
        assert_eq!(world.triangle_count(), 480);
        let hit = world
            .ray_intersect(Vec3::new(-5.0, 0.3, 0.1), Vec3::X, 100.0)
            .unwrap();
        assert_eq!(hit.piece, 0);
        assert!((hit.distance - 4.5).abs() < 1e-4);
    }

    #[test]
    fn scratch_buffers_are_reused_across_queries() {
        let world = index();
        let mut scratch = QueryScratch::new();
        let origin = Vec3::new(0.0, 1.0, 0.0);
        let direction = Vec3::new(1.0, -0.1, 0.0);

        assert_eq!(world.ray_intersect_pieces(origin, direction, 50.0, &mut scratch).len(), 2);
        assert!(scratch.stack.capacity() > 0);
        assert!(scratch.hits.capacity() >= 2);

        // Stale hits from the last query never leak into the next one.
        assert!(world
            .ray_intersect_pieces(origin, Vec3::Y, 50.0, &mut scratch)
            .is_empty());
        assert!(world
            .capsule_intersect_with(&Capsule::upright(Vec3::new(0.0, 0.3, 0.0), 1.0, 0.5), &mut scratch)
            .is_some());
        let again = world.ray_intersect_pieces(origin, direction, 50.0, &mut scratch);
        assert_eq!(again.len(), 2);
        assert_eq!(again[0].piece, 1);
    }
}
