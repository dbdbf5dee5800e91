//! Collision and movement for Saberfall.
//!
//! Static level geometry lives in an octree [`WorldIndex`]; moving targets
//! (player, saber, troopers, props) are rapier colliders in a
//! [`PhysicsWorld`] used only for ray queries.

pub mod collision;
pub mod kinematic;
pub mod mesh;
pub mod octree;
pub mod physics_world;
pub mod raycast;
pub mod shapes;

pub use collision::*;
pub use kinematic::*;
pub use mesh::*;
pub use octree::*;
pub use physics_world::*;
pub use raycast::*;
pub use shapes::*;

// Re-export Rapier for downstream crates
pub use rapier3d;

// Re-export common Rapier types
pub use rapier3d::prelude::{ColliderHandle, InteractionGroups};
