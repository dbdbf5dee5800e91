//! Static triangle meshes handed to the world index.

use crate::shapes::{Aabb, Triangle};
use engine_core::{Transform, Vec3};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MeshError {
    #[error("index count {0} is not a multiple of three")]
    IncompleteTriangle(usize),
    #[error("index {index} out of range for mesh with {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("vertex {0} is not finite")]
    NonFiniteVertex(usize),
}

/// Indexed triangle list in world space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
}

impl TriangleMesh {
    pub fn new(vertices: Vec<Vec3>, indices: Vec<u32>) -> Result<Self, MeshError> {
        if indices.len() % 3 != 0 {
            return Err(MeshError::IncompleteTriangle(indices.len()));
        }
        if let Some(i) = vertices.iter().position(|v| !v.is_finite()) {
            return Err(MeshError::NonFiniteVertex(i));
        }
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count: vertices.len(),
            });
        }
        Ok(Self { vertices, indices })
    }

    /// Closed box with outward-facing triangles.
    pub fn cuboid(center: Vec3, half_extents: Vec3) -> Self {
        // (normal, u, v) with u x v == normal, so every face winds outwards.
        let faces = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];
        let extent = |axis: Vec3| half_extents.dot(axis.abs());

        let mut mesh = Self::default();
        for (normal, u, v) in faces {
            let face_center = center + normal * extent(normal);
            let (hu, hv) = (u * extent(u), v * extent(v));
            mesh.push_quad([
                face_center - hu - hv,
                face_center + hu - hv,
                face_center + hu + hv,
                face_center - hu + hv,
            ]);
        }
        mesh
    }

    /// Single upward-facing quad in the XZ plane.
    pub fn floor(center: Vec3, half_x: f32, half_z: f32) -> Self {
        let (hx, hz) = (Vec3::X * half_x, Vec3::Z * half_z);
        let mut mesh = Self::default();
        mesh.push_quad([
            center - hz - hx,
            center + hz - hx,
            center + hz + hx,
            center - hz + hx,
        ]);
        mesh
    }

    fn push_quad(&mut self, corners: [Vec3; 4]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&corners);
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Copy of this mesh with every vertex moved by `transform`.
    pub fn transformed(&self, transform: &Transform) -> Self {
        Self {
            vertices: self
                .vertices
                .iter()
                .map(|&v| transform.transform_point(v))
                .collect(),
            indices: self.indices.clone(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.indices.chunks_exact(3).map(move |tri| {
            Triangle::new(
                self.vertices[tri[0] as usize],
                self.vertices[tri[1] as usize],
                self.vertices[tri[2] as usize],
            )
        })
    }

    pub fn bounds(&self) -> Aabb {
        let mut bounds = Aabb::empty();
        for &v in &self.vertices {
            bounds.expand_to(v);
        }
        bounds
    }
}
