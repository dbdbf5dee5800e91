//! Collision primitives: capsules, spheres, triangles and bounding boxes.

use engine_core::Vec3;

const EPSILON: f32 = 1e-8;

/// Result of pushing a shape out of penetrating geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// Unit direction pointing away from the surface.
    pub normal: Vec3,
    /// How far the shape has to move along `normal` to stop penetrating.
    pub depth: f32,
}

/// A contact against a single triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub normal: Vec3,
    pub point: Vec3,
    pub depth: f32,
}

/// A line segment swept by a sphere; the collision volume of every actor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    pub start: Vec3,
    pub end: Vec3,
    pub radius: f32,
}

impl Capsule {
    pub fn new(start: Vec3, end: Vec3, radius: f32) -> Self {
        Self { start, end, radius }
    }

    /// Upright capsule whose segment starts at `base` and rises by `height`.
    pub fn upright(base: Vec3, height: f32, radius: f32) -> Self {
        Self::new(base, base + Vec3::Y * height.max(0.0), radius)
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.start += delta;
        self.end += delta;
    }

    pub fn center(&self) -> Vec3 {
        (self.start + self.end) * 0.5
    }

    pub fn bounds(&self) -> Aabb {
        let r = Vec3::splat(self.radius);
        Aabb::new(self.start.min(self.end) - r, self.start.max(self.end) + r)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn bounds(&self) -> Aabb {
        let r = Vec3::splat(self.radius);
        Aabb::new(self.center - r, self.center + r)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// An inverted box that any point expands.
    pub fn empty() -> Self {
        Self::new(Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY))
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand_to(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        self.min.cmple(p).all() && self.max.cmpge(p).all()
    }

    /// Slab test for the segment `origin + dir * t`, `t` in `[0, max]`.
    pub fn intersects_ray(&self, origin: Vec3, dir: Vec3, max: f32) -> bool {
        let mut t_enter = 0.0f32;
        let mut t_exit = max;
        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis];
            if d.abs() < EPSILON {
                if o < self.min[axis] || o > self.max[axis] {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t0 = (self.min[axis] - o) * inv;
            let mut t1 = (self.max[axis] - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return false;
            }
        }
        true
    }

    /// Split into eight equal octants.
    pub fn octants(&self) -> [Aabb; 8] {
        let half = self.size() * 0.5;
        let mut out = [*self; 8];
        for (i, octant) in out.iter_mut().enumerate() {
            let offset = Vec3::new(
                if i & 1 == 0 { 0.0 } else { half.x },
                if i & 2 == 0 { 0.0 } else { half.y },
                if i & 4 == 0 { 0.0 } else { half.z },
            );
            octant.min = self.min + offset;
            octant.max = octant.min + half;
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    /// Unit face normal (counter-clockwise winding), or zero when degenerate.
    pub fn normal(&self) -> Vec3 {
        (self.b - self.a).cross(self.c - self.a).normalize_or_zero()
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(
            self.a.min(self.b).min(self.c),
            self.a.max(self.b).max(self.c),
        )
    }

    pub fn is_degenerate(&self) -> bool {
        self.normal() == Vec3::ZERO
    }

    fn edges(&self) -> [(Vec3, Vec3); 3] {
        [(self.a, self.b), (self.b, self.c), (self.c, self.a)]
    }

    /// Whether `p`, projected onto the triangle's plane, lies inside the triangle.
    pub fn contains_point(&self, p: Vec3) -> bool {
        let v0 = self.c - self.a;
        let v1 = self.b - self.a;
        let v2 = p - self.a;
        let dot00 = v0.dot(v0);
        let dot01 = v0.dot(v1);
        let dot02 = v0.dot(v2);
        let dot11 = v1.dot(v1);
        let dot12 = v1.dot(v2);
        let denom = dot00 * dot11 - dot01 * dot01;
        if denom.abs() < EPSILON {
            return false;
        }
        let inv = 1.0 / denom;
        let u = (dot11 * dot02 - dot01 * dot12) * inv;
        let v = (dot00 * dot12 - dot01 * dot02) * inv;
        u >= 0.0 && v >= 0.0 && u + v <= 1.0
    }

    /// Closest point on the triangle to `p` (Voronoi region walk).
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        let (a, b, c) = (self.a, self.b, self.c);
        let ab = b - a;
        let ac = c - a;
        let ap = p - a;
        let d1 = ab.dot(ap);
        let d2 = ac.dot(ap);
        if d1 <= 0.0 && d2 <= 0.0 {
            return a;
        }

        let bp = p - b;
        let d3 = ab.dot(bp);
        let d4 = ac.dot(bp);
        if d3 >= 0.0 && d4 <= d3 {
            return b;
        }

        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v = d1 / (d1 - d3);
            return a + ab * v;
        }

        let cp = p - c;
        let d5 = ab.dot(cp);
        let d6 = ac.dot(cp);
        if d6 >= 0.0 && d5 <= d6 {
            return c;
        }

        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return a + ac * w;
        }

        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return b + (c - b) * w;
        }

        let denom = 1.0 / (va + vb + vc);
        let v = vb * denom;
        let w = vc * denom;
        a + ab * v + ac * w
    }

    /// Two-sided ray test. Returns the distance along `dir` (unit length) to the hit.
    pub fn ray_distance(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        let edge1 = self.b - self.a;
        let edge2 = self.c - self.a;
        let h = dir.cross(edge2);
        let det = edge1.dot(h);
        if det.abs() < EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = origin - self.a;
        let u = inv_det * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(edge1);
        let v = inv_det * dir.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = inv_det * edge2.dot(q);
        (t >= 0.0).then_some(t)
    }

    /// Penetration of a capsule into this triangle, if any.
    pub fn capsule_contact(&self, capsule: &Capsule) -> Option<Contact> {
        let normal = self.normal();
        if normal == Vec3::ZERO {
            return None;
        }
        let (seg_point, tri_point) = self.closest_to_segment(capsule.start, capsule.end);
        let offset = seg_point - tri_point;
        let distance = offset.length();
        if distance >= capsule.radius {
            return None;
        }

        if distance > 1e-6 {
            return Some(Contact {
                normal: offset / distance,
                point: tri_point,
                depth: capsule.radius - distance,
            });
        }

        // The segment pierces the face: push out towards the side holding
        // most of the segment, far enough to clear the deeper endpoint.
        let d_start = normal.dot(capsule.start - self.a);
        let d_end = normal.dot(capsule.end - self.a);
        let (normal, behind) = if d_start + d_end >= 0.0 {
            (normal, d_start.min(d_end).min(0.0))
        } else {
            (-normal, (-d_start).min(-d_end).min(0.0))
        };
        Some(Contact {
            normal,
            point: tri_point,
            depth: capsule.radius - behind,
        })
    }

    /// Penetration of a sphere into this triangle, if any.
    pub fn sphere_contact(&self, sphere: &Sphere) -> Option<Contact> {
        let normal = self.normal();
        if normal == Vec3::ZERO {
            return None;
        }
        let closest = self.closest_point(sphere.center);
        let offset = sphere.center - closest;
        let distance = offset.length();
        if distance >= sphere.radius {
            return None;
        }
        let normal = if distance > 1e-6 {
            offset / distance
        } else {
            normal
        };
        Some(Contact {
            normal,
            point: closest,
            depth: sphere.radius - distance,
        })
    }

    /// Closest pair of points between the segment `p0..p1` and this triangle.
    /// Returns `(point_on_segment, point_on_triangle)`.
    pub fn closest_to_segment(&self, p0: Vec3, p1: Vec3) -> (Vec3, Vec3) {
        let normal = self.normal();
        let d0 = normal.dot(p0 - self.a);
        let d1 = normal.dot(p1 - self.a);
        if d0 * d1 <= 0.0 && (d0 - d1).abs() > EPSILON {
            let crossing = p0 + (p1 - p0) * (d0 / (d0 - d1));
            if self.contains_point(crossing) {
                return (crossing, crossing);
            }
        }

        let mut best = (p0, self.closest_point(p0));
        let mut best_d2 = best.0.distance_squared(best.1);
        let mut consider = |pair: (Vec3, Vec3)| {
            let d2 = pair.0.distance_squared(pair.1);
            if d2 < best_d2 {
                best_d2 = d2;
                best = pair;
            }
        };
        consider((p1, self.closest_point(p1)));
        for (e0, e1) in self.edges() {
            consider(closest_segment_segment(p0, p1, e0, e1));
        }
        best
    }
}

/// Closest points between segments `p1..q1` and `p2..q2`.
pub fn closest_segment_segment(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.dot(d1);
    let e = d2.dot(d2);
    let f = d2.dot(r);

    if a <= EPSILON && e <= EPSILON {
        return (p1, p2);
    }

    let (s, t) = if a <= EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e <= EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let mut s = if denom.abs() > EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    (p1 + d1 * s, p2 + d2 * t)
}
