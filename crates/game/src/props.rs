//! Throwable prop spheres, pooled and recycled round-robin.

use engine_core::Vec3;
use physics::{ColliderHandle, ColliderTag, CollisionGroup, PhysicsWorld, QueryScratch, Sphere, WorldIndex};

use crate::damage::Pullable;
use crate::events::{EventQueue, GameEvent, NodeId};
use crate::player::Player;

pub const PROP_RADIUS: f32 = 0.2;
pub const DEFAULT_PROP_COUNT: usize = 100;
pub const BASE_THROW_IMPULSE: f32 = 15.0;
/// Extra impulse approached as the throw button is held longer.
pub const CHARGED_THROW_IMPULSE: f32 = 30.0;
/// Fraction of the normal velocity reflected on bounce, on top of cancelling it.
const BOUNCE: f32 = 1.5;
const DAMPING_RATE: f32 = 1.5;
const PARKED: Vec3 = Vec3::new(0.0, -100.0, 0.0);

pub fn throw_impulse(hold_seconds: f32) -> f32 {
    BASE_THROW_IMPULSE + CHARGED_THROW_IMPULSE * (1.0 - (-hold_seconds.max(0.0)).exp())
}

#[derive(Debug, Clone)]
pub struct Prop {
    pub sphere: Sphere,
    pub velocity: Vec3,
    pub collider: ColliderHandle,
    /// Thrown at least once since the last reset.
    pub active: bool,
}

impl Pullable for Prop {
    fn velocity_mut(&mut self) -> &mut Vec3 {
        &mut self.velocity
    }
}

/// Exchange the velocity components along `normal`.
fn exchange_along(normal: Vec3, a: &mut Vec3, b: &mut Vec3) {
    let va = normal * normal.dot(*a);
    let vb = normal * normal.dot(*b);
    *a += vb - va;
    *b += va - vb;
}

pub struct PropPool {
    props: Vec<Prop>,
    next: usize,
    gravity: f32,
}

impl PropPool {
    pub fn new(count: usize, gravity: f32, physics: &mut PhysicsWorld) -> Self {
        let props = (0..count)
            .map(|slot| Prop {
                sphere: Sphere::new(PARKED, PROP_RADIUS),
                velocity: Vec3::ZERO,
                collider: physics.add_ball(
                    ColliderTag::Prop(slot as u32),
                    CollisionGroup::Prop,
                    PARKED,
                    PROP_RADIUS,
                ),
                active: false,
            })
            .collect();
        Self {
            props,
            next: 0,
            gravity,
        }
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn get(&self, slot: u32) -> Option<&Prop> {
        self.props.get(slot as usize)
    }

    pub fn get_mut(&mut self, slot: u32) -> Option<&mut Prop> {
        self.props.get_mut(slot as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Prop> {
        self.props.iter()
    }

    pub fn active_count(&self) -> usize {
        self.props.iter().filter(|p| p.active).count()
    }

    /// Launch the next prop in the pool from the top of the player's capsule.
    pub fn throw(
        &mut self,
        player: &Player,
        direction: Vec3,
        hold_seconds: f32,
        events: &mut EventQueue,
    ) -> Option<u32> {
        let direction = direction.try_normalize()?;
        if self.props.is_empty() {
            return None;
        }
        let slot = self.next;
        self.next = (slot + 1) % self.props.len();
        let prop = &mut self.props[slot];

        let capsule = &player.body.capsule;
        prop.sphere.center = capsule.end + direction * (capsule.radius * 1.5);
        prop.velocity = direction * throw_impulse(hold_seconds) + player.body.velocity * 2.0;
        if !prop.active {
            prop.active = true;
            events.push(GameEvent::NodeAdded {
                node: NodeId::Prop(slot as u32),
                position: prop.sphere.center,
            });
        }
        Some(slot as u32)
    }

    /// Integrate, bounce off the world, push against the player and each other.
    pub fn update(
        &mut self,
        dt: f32,
        world: &WorldIndex,
        scratch: &mut QueryScratch,
        player: &mut Player,
        physics: &mut PhysicsWorld,
    ) {
        let damping = (-DAMPING_RATE * dt).exp() - 1.0;
        let gravity = self.gravity;
        for prop in self.props.iter_mut().filter(|p| p.active) {
            prop.sphere.center += prop.velocity * dt;

            if let Some(hit) = world.sphere_intersect_with(&prop.sphere, scratch) {
                prop.velocity -= hit.normal * (hit.normal.dot(prop.velocity) * BOUNCE);
                prop.sphere.center += hit.normal * hit.depth;
            } else {
                prop.velocity.y -= gravity * dt;
            }
            prop.velocity += prop.velocity * damping;

            collide_with_player(prop, player);
        }

        self.collide_spheres();

        for prop in self.props.iter().filter(|p| p.active) {
            physics.set_translation(prop.collider, prop.sphere.center);
        }
    }

    fn collide_spheres(&mut self) {
        let count = self.props.len();
        for i in 0..count {
            let (head, tail) = self.props.split_at_mut(i + 1);
            let a = &mut head[i];
            if !a.active {
                continue;
            }
            for b in tail.iter_mut().filter(|p| p.active) {
                let r = a.sphere.radius + b.sphere.radius;
                let d2 = a.sphere.center.distance_squared(b.sphere.center);
                if d2 >= r * r {
                    continue;
                }
                let Some(normal) = (a.sphere.center - b.sphere.center).try_normalize() else {
                    continue;
                };
                exchange_along(normal, &mut a.velocity, &mut b.velocity);
                let d = (r - d2.sqrt()) / 2.0;
                a.sphere.center += normal * d;
                b.sphere.center -= normal * d;
            }
        }
    }

    /// Park every prop and start the round-robin over.
    pub fn reset(&mut self, physics: &mut PhysicsWorld, events: &mut EventQueue) {
        for (slot, prop) in self.props.iter_mut().enumerate() {
            if prop.active {
                events.push(GameEvent::NodeRemoved {
                    node: NodeId::Prop(slot as u32),
                });
            }
            prop.active = false;
            prop.velocity = Vec3::ZERO;
            prop.sphere.center = PARKED;
            physics.set_translation(prop.collider, PARKED);
        }
        self.next = 0;
    }
}

/// The player counts as three spheres: capsule start, end and midpoint.
fn collide_with_player(prop: &mut Prop, player: &mut Player) {
    let capsule = player.body.capsule;
    let r = capsule.radius + prop.sphere.radius;
    let r2 = r * r;

    for point in [capsule.start, capsule.end, capsule.center()] {
        let d2 = point.distance_squared(prop.sphere.center);
        if d2 >= r2 {
            continue;
        }
        let Some(normal) = (point - prop.sphere.center).try_normalize() else {
            continue;
        };
        exchange_along(normal, &mut player.body.velocity, &mut prop.velocity);
        let d = (r - d2.sqrt()) / 2.0;
        prop.sphere.center -= normal * d;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use physics::TriangleMesh;

    fn setup(count: usize) -> (PropPool, Player, PhysicsWorld) {
        let mut physics = PhysicsWorld::new();
        let player = Player::new(Vec3::new(0.0, 0.8, 0.0), 34.3, &mut physics);
        let pool = PropPool::new(count, 34.3, &mut physics);
        (pool, player, physics)
    }

    #[test]
    fn impulse_grows_with_hold_time() {
        assert_eq!(throw_impulse(0.0), 15.0);
        assert!(throw_impulse(0.5) > throw_impulse(0.1));
        assert!(throw_impulse(100.0) <= 45.0);
        assert!((throw_impulse(100.0) - 45.0).abs() < 1e-4);
    }

    #[test]
    fn throws_recycle_round_robin() {
        let (mut pool, mut player, _physics) = setup(3);
        let mut events = EventQueue::new();
        player.body.velocity = Vec3::new(1.0, 0.0, 0.0);
        let slots: Vec<_> = (0..4)
            .map(|_| pool.throw(&player, Vec3::NEG_Z, 0.0, &mut events).unwrap())
            .collect();
        assert_eq!(slots, vec![0, 1, 2, 0]);
        assert_eq!(pool.active_count(), 3);

        let prop = pool.get(0).unwrap();
        let expected_center = player.body.capsule.end + Vec3::NEG_Z * (player.body.capsule.radius * 1.5);
        assert!((prop.sphere.center - expected_center).length() < 1e-5);
        assert!((prop.velocity - Vec3::new(2.0, 0.0, -15.0)).length() < 1e-5);

        let added = events
            .iter()
            .filter(|e| matches!(e, GameEvent::NodeAdded { .. }))
            .count();
        assert_eq!(added, 3);
    }

    #[test]
    fn zero_direction_throws_nothing() {
        let (mut pool, player, _physics) = setup(2);
        let mut events = EventQueue::new();
        assert!(pool.throw(&player, Vec3::ZERO, 1.0, &mut events).is_none());
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn falling_prop_bounces_off_floor() {
        let (mut pool, mut player, mut physics) = setup(1);
        player.teleport(Vec3::new(50.0, 0.8, 50.0));
        let floor = TriangleMesh::floor(Vec3::ZERO, 10.0, 10.0);
        let world = WorldIndex::build([(0, &floor)]);
        let mut scratch = QueryScratch::new();

        let prop = pool.get_mut(0).unwrap();
        prop.active = true;
        prop.sphere.center = Vec3::new(0.0, 0.25, 0.0);
        prop.velocity = Vec3::new(0.0, -6.0, 0.0);

        pool.update(0.01, &world, &mut scratch, &mut player, &mut physics);
        let prop = pool.get(0).unwrap();
        assert!(prop.velocity.y > 0.0);
        assert!(prop.sphere.center.y >= PROP_RADIUS - 1e-4);
    }

    #[test]
    fn airborne_prop_falls_and_slows() {
        let (mut pool, mut player, mut physics) = setup(1);
        player.teleport(Vec3::new(50.0, 0.8, 50.0));
        let world = WorldIndex::new();
        let mut scratch = QueryScratch::new();
        let prop = pool.get_mut(0).unwrap();
        prop.active = true;
        prop.sphere.center = Vec3::new(0.0, 10.0, 0.0);
        prop.velocity = Vec3::new(4.0, 0.0, 0.0);

        pool.update(0.01, &world, &mut scratch, &mut player, &mut physics);
        let prop = pool.get(0).unwrap();
        assert!(prop.velocity.y < 0.0);
        assert!(prop.velocity.x < 4.0);
    }

    #[test]
    fn head_on_spheres_swap_velocities() {
        let (mut pool, mut player, mut physics) = setup(2);
        player.teleport(Vec3::new(50.0, 0.8, 50.0));
        let world = WorldIndex::new();
        let mut scratch = QueryScratch::new();
        for (slot, (x, vx)) in [(-0.15, 3.0), (0.15, -1.0)].into_iter().enumerate() {
            let prop = pool.get_mut(slot as u32).unwrap();
            prop.active = true;
            prop.sphere.center = Vec3::new(x, 10.0, 0.0);
            prop.velocity = Vec3::new(vx, 0.0, 0.0);
        }

        pool.update(0.0, &world, &mut scratch, &mut player, &mut physics);
        let a = pool.get(0).unwrap();
        let b = pool.get(1).unwrap();
        assert!((a.velocity.x + 1.0).abs() < 1e-5);
        assert!((b.velocity.x - 3.0).abs() < 1e-5);
        assert!((a.sphere.center.distance(b.sphere.center) - 2.0 * PROP_RADIUS).abs() < 1e-5);
    }

    #[test]
    fn prop_hitting_player_trades_momentum() {
        let (mut pool, mut player, mut physics) = setup(1);
        let world = WorldIndex::new();
        let mut scratch = QueryScratch::new();
        let end = player.body.capsule.end;
        let prop = pool.get_mut(0).unwrap();
        prop.active = true;
        prop.sphere.center = end + Vec3::new(0.0, 0.0, 0.9);
        prop.velocity = Vec3::new(0.0, 0.0, -10.0);

        pool.update(0.0, &world, &mut scratch, &mut player, &mut physics);
        assert!(player.body.velocity.z < 0.0);
        assert!(pool.get(0).unwrap().velocity.z > -10.0);
    }

    #[test]
    fn reset_parks_everything() {
        let (mut pool, player, mut physics) = setup(2);
        let mut events = EventQueue::new();
        pool.throw(&player, Vec3::X, 0.0, &mut events);
        pool.reset(&mut physics, &mut events);
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.throw(&player, Vec3::X, 0.0, &mut events), Some(0));
    }
}
