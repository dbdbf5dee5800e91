//! Trooper blaster bolts.

use engine_core::{Entity, Vec3, World};
use physics::{ColliderTag, CollisionGroup, PhysicsWorld, QueryScratch, WorldIndex};

use crate::events::{EventQueue, GameEvent, LaserImpact, NodeId};
use crate::player::Player;

pub const LASER_SPEED: f32 = 10.0;
pub const LASER_MAX_RANGE: f32 = 35.0;
/// Beam length, also the reach of the per-step hit ray.
pub const LASER_LENGTH: f32 = 1.0;
pub const LASER_DAMAGE: f32 = 1.0;

/// A bolt in flight. Direction is fixed at spawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Laser {
    pub position: Vec3,
    pub direction: Vec3,
    pub distance: f32,
    pub max_range: f32,
    pub speed: f32,
    pub length: f32,
}

impl Laser {
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        let direction = direction.try_normalize()?;
        Some(Self {
            position: origin,
            direction,
            distance: 0.0,
            max_range: LASER_MAX_RANGE,
            speed: LASER_SPEED,
            length: LASER_LENGTH,
        })
    }

    /// Move one step. Returns true once the bolt has used up its range.
    pub fn advance(&mut self, dt: f32) -> bool {
        let step = self.speed * dt;
        self.distance += step;
        self.position += self.direction * step;
        self.distance >= self.max_range
    }
}

/// Spawn a bolt. A degenerate direction spawns nothing.
pub fn spawn_laser(
    ecs: &mut World,
    events: &mut EventQueue,
    origin: Vec3,
    direction: Vec3,
) -> Option<Entity> {
    let laser = Laser::new(origin, direction)?;
    let entity = ecs.spawn((laser,));
    events.push(GameEvent::NodeAdded {
        node: NodeId::Laser(entity),
        position: origin,
    });
    Some(entity)
}

/// Advance every bolt, damage the player on contact and retire spent bolts.
pub fn update_lasers(
    ecs: &mut World,
    dt: f32,
    physics: &PhysicsWorld,
    world: &WorldIndex,
    player: &mut Player,
    events: &mut EventQueue,
    scratch: &mut QueryScratch,
) {
    let mut expired = Vec::new();

    for (entity, laser) in ecs.query_mut::<&mut Laser>() {
        if laser.advance(dt) {
            expired.push((entity, LaserImpact::Range));
            continue;
        }

        let target = physics
            .raycast(laser.position, laser.direction, laser.length, CollisionGroup::laser_targets())
            .map(|hit| {
                let impact = match hit.tag {
                    Some(ColliderTag::Player) => LaserImpact::Player,
                    _ => LaserImpact::Saber,
                };
                (hit.distance, impact)
            });
        let wall = world
            .ray_intersect_with(laser.position, laser.direction, laser.length, scratch)
            .map(|hit| (hit.distance, LaserImpact::World));

        let nearest = match (target, wall) {
            (Some(t), Some(w)) => Some(if w.0 < t.0 { w } else { t }),
            (t, w) => t.or(w),
        };
        if let Some((_, impact)) = nearest {
            expired.push((entity, impact));
        }
    }

    for (entity, impact) in expired {
        if impact == LaserImpact::Player {
            player.take_hit(LASER_DAMAGE, events);
        }
        ecs.despawn(entity).ok();
        events.push(GameEvent::LaserExpired { entity, impact });
        events.push(GameEvent::NodeRemoved {
            node: NodeId::Laser(entity),
        });
    }
}

pub fn laser_count(ecs: &World) -> usize {
    ecs.query::<&Laser>().iter().count()
}

/// Drop every bolt in flight.
pub fn clear_lasers(ecs: &mut World, events: &mut EventQueue) {
    let lasers: Vec<Entity> = ecs.query::<&Laser>().iter().map(|(e, _)| e).collect();
    for entity in lasers {
        ecs.despawn(entity).ok();
        events.push(GameEvent::NodeRemoved {
            node: NodeId::Laser(entity),
        });
    }
}
