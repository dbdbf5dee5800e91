//! Capabilities shared by things weapons can act on.

use engine_core::Vec3;

/// Result of applying damage to something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Already dead or not damageable right now.
    Ignored,
    Wounded,
    /// This hit brought health to zero.
    Killed,
}

pub trait Damageable {
    /// Apply `amount` raw damage; the implementor applies its own multiplier.
    fn damage(&mut self, amount: f32) -> DamageOutcome;
}

/// Anything the force pull can move.
pub trait Pullable {
    fn velocity_mut(&mut self) -> &mut Vec3;

    fn add_velocity(&mut self, delta: Vec3) {
        *self.velocity_mut() += delta;
    }
}
