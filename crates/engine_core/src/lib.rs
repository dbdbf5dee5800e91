//! Core engine types and utilities for Saberfall.
//!
//! This crate provides the foundational types used across all simulation systems:
//! - Transform and spatial helpers
//! - Frame timing and substep slicing
//! - Common gameplay components (health, AI cooldowns)
//! - Cancellable delayed timers

pub mod components;
pub mod time;
pub mod timer;
pub mod transform;

pub use components::*;
pub use time::*;
pub use timer::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{EulerRot, Mat4, Quat, Vec2, Vec3, Vec4};
pub use hecs::{Entity, World};
