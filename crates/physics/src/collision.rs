//! Collision groups and collider tagging for the ray world.

use rapier3d::prelude::*;

/// Collision groups for the dynamic targets rays can hit.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionGroup {
    /// The player's body capsule
    Player = 1 << 0,
    /// The player's blade
    Saber = 1 << 1,
    /// Trooper capsules
    Enemy = 1 << 2,
    /// Throwable prop spheres
    Prop = 1 << 3,
}

impl CollisionGroup {
    fn group(self) -> Group {
        Group::from_bits_retain(self as u32)
    }

    /// Membership groups for a collider of this kind. Colliders accept every query.
    pub fn membership(self) -> InteractionGroups {
        InteractionGroups::new(self.group(), Group::ALL)
    }

    /// Query groups selecting any collider in `targets`.
    pub fn query(targets: &[CollisionGroup]) -> InteractionGroups {
        let filter = targets
            .iter()
            .fold(Group::empty(), |acc, target| acc | target.group());
        InteractionGroups::new(Group::ALL, filter)
    }

    /// What a blade sweep can cut.
    pub fn saber_targets() -> InteractionGroups {
        Self::query(&[Self::Enemy])
    }

    /// What an enemy laser can strike.
    pub fn laser_targets() -> InteractionGroups {
        Self::query(&[Self::Saber, Self::Player])
    }

    /// What the force pull can grab.
    pub fn force_targets() -> InteractionGroups {
        Self::query(&[Self::Enemy, Self::Prop])
    }
}

/// Identity of a collider, stored in its `user_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColliderTag {
    Player,
    Saber,
    /// Bits of the owning ECS entity.
    Enemy(u64),
    /// Slot in the prop pool.
    Prop(u32),
}

impl ColliderTag {
    const KIND_BITS: u32 = 8;

    pub fn encode(self) -> u128 {
        let (kind, payload): (u128, u128) = match self {
            ColliderTag::Player => (1, 0),
            ColliderTag::Saber => (2, 0),
            ColliderTag::Enemy(bits) => (3, bits as u128),
            ColliderTag::Prop(slot) => (4, slot as u128),
        };
        kind | (payload << Self::KIND_BITS)
    }

    pub fn decode(data: u128) -> Option<Self> {
        let payload = data >> Self::KIND_BITS;
        match data & 0xff {
            1 => Some(ColliderTag::Player),
            2 => Some(ColliderTag::Saber),
            3 => u64::try_from(payload).ok().map(ColliderTag::Enemy),
            4 => u32::try_from(payload).ok().map(ColliderTag::Prop),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_survive_user_data() {
        for tag in [
            ColliderTag::Player,
            ColliderTag::Saber,
            ColliderTag::Enemy(u64::MAX - 7),
            ColliderTag::Prop(99),
        ] {
            assert_eq!(ColliderTag::decode(tag.encode()), Some(tag));
        }
        assert_eq!(ColliderTag::decode(0), None);
    }

    #[test]
    fn laser_query_ignores_enemies_and_props() {
        let query = CollisionGroup::laser_targets();
        assert!(CollisionGroup::Player.membership().test(query));
        assert!(CollisionGroup::Saber.membership().test(query));
        assert!(!CollisionGroup::Enemy.membership().test(query));
        assert!(!CollisionGroup::Prop.membership().test(query));
    }
}
