//! Troopers: ECS-backed enemies that walk, shoot and die.

use engine_core::{AIComponent, AIState, Entity, EulerRot, Health, Quat, Vec3, World};
use physics::{Capsule, ColliderHandle, ColliderTag, CollisionGroup, KinematicBody, PhysicsWorld, QueryScratch, WorldIndex};
use rand::prelude::*;

use crate::damage::{DamageOutcome, Damageable, Pullable};
use crate::events::{EventQueue, GameEvent, NodeId};
use crate::laser::spawn_laser;
use crate::timer::{GameTimers, ScheduledEvent, TROOPER_REMOVAL_DELAY};

pub const TROOPER_HEIGHT: f32 = 1.2;
pub const TROOPER_RADIUS: f32 = 0.3;
pub const TROOPER_HEALTH: f32 = 100.0;
pub const TROOPER_DAMAGE_MULTIPLIER: f32 = 0.25;
/// Spawn point used when a level names none.
pub const DEFAULT_ENEMY_SPAWN: Vec3 = Vec3::new(1.6, -1.6, -7.0);

/// Horizontal speed at which the run blend is fully in.
const RUN_SPEED: f32 = 4.0;
/// Max aim error per axis, in radians.
const AIM_SPREAD: f32 = 0.03;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lifecycle {
    Alive,
    /// Dead and lying down; despawned at `remove_at` simulated seconds.
    Dying { remove_at: f64 },
}

/// Blend weights of the trooper's animation clips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationWeights {
    pub idle: f32,
    pub walk: f32,
    pub run: f32,
    pub tpose: f32,
}

impl Default for AnimationWeights {
    fn default() -> Self {
        Self {
            idle: 1.0,
            walk: 0.0,
            run: 0.0,
            tpose: 0.0,
        }
    }
}

impl AnimationWeights {
    /// Idle, walk and run blended by horizontal speed; always sums to one.
    pub fn locomotion(speed: f32) -> Self {
        let t = (speed / RUN_SPEED).clamp(0.0, 1.0);
        let idle = (1.0 - 2.0 * t).max(0.0);
        let run = (2.0 * t - 1.0).max(0.0);
        Self {
            idle,
            walk: 1.0 - idle - run,
            run,
            tpose: 0.0,
        }
    }

    pub fn dead() -> Self {
        Self {
            idle: 0.0,
            walk: 0.0,
            run: 0.0,
            tpose: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Trooper {
    pub body: KinematicBody,
    pub health: Health,
    pub lifecycle: Lifecycle,
    pub spawn: Vec3,
    pub collider: ColliderHandle,
    pub yaw: f32,
    pub pitch: f32,
    pub weights: AnimationWeights,
}

impl Trooper {
    pub fn is_alive(&self) -> bool {
        self.lifecycle == Lifecycle::Alive
    }

    pub fn position(&self) -> Vec3 {
        self.body.position()
    }

    /// Enter the death pose and schedule removal.
    fn die(&mut self, remove_at: f64) {
        self.lifecycle = Lifecycle::Dying { remove_at };
        self.pitch = -std::f32::consts::FRAC_PI_2;
        self.weights = AnimationWeights::dead();
    }
}

impl Damageable for Trooper {
    fn damage(&mut self, amount: f32) -> DamageOutcome {
        if !self.is_alive() {
            return DamageOutcome::Ignored;
        }
        self.health.take_damage(amount * TROOPER_DAMAGE_MULTIPLIER);
        if self.health.is_dead() {
            DamageOutcome::Killed
        } else {
            DamageOutcome::Wounded
        }
    }
}

impl Pullable for Trooper {
    fn velocity_mut(&mut self) -> &mut Vec3 {
        &mut self.body.velocity
    }
}

/// Spawn a trooper standing on `spawn`, facing back towards -Z.
pub fn spawn_trooper(
    ecs: &mut World,
    physics: &mut PhysicsWorld,
    events: &mut EventQueue,
    spawn: Vec3,
    gravity: f32,
    fire_range: f32,
    fire_cooldown: f32,
) -> Entity {
    let entity = ecs.reserve_entity();
    let capsule = Capsule::upright(spawn, TROOPER_HEIGHT, TROOPER_RADIUS);
    let collider = physics.add_capsule(
        ColliderTag::Enemy(entity.to_bits().get()),
        CollisionGroup::Enemy,
        &capsule,
    );
    let trooper = Trooper {
        body: KinematicBody::new(capsule, gravity),
        health: Health::new(TROOPER_HEALTH),
        lifecycle: Lifecycle::Alive,
        spawn,
        collider,
        yaw: std::f32::consts::PI,
        pitch: 0.0,
        weights: AnimationWeights::default(),
    };
    ecs.spawn_at(entity, (trooper, AIComponent::new(fire_range, fire_cooldown)));
    events.push(GameEvent::NodeAdded {
        node: NodeId::Trooper(entity),
        position: spawn,
    });
    log::debug!("Spawned trooper {:?} at {:?}", entity, spawn);
    entity
}

/// Apply raw damage; a killing blow schedules the trooper's removal.
pub fn damage_trooper(
    ecs: &mut World,
    entity: Entity,
    amount: f32,
    now: f64,
    timers: &mut GameTimers,
    events: &mut EventQueue,
) -> DamageOutcome {
    let Ok((trooper, ai)) = ecs.query_one_mut::<(&mut Trooper, &mut AIComponent)>(entity) else {
        return DamageOutcome::Ignored;
    };
    let outcome = trooper.damage(amount);
    if outcome == DamageOutcome::Killed {
        let remove_at = now + TROOPER_REMOVAL_DELAY;
        trooper.die(remove_at);
        ai.state = AIState::Dead;
        timers.schedule(now, TROOPER_REMOVAL_DELAY, ScheduledEvent::RemoveTrooper(entity));
        events.push(GameEvent::TrooperDied {
            entity,
            position: trooper.position(),
        });
        log::info!("Trooper {:?} down", entity);
    }
    outcome
}

/// Despawn a dead trooper. With `respawn` a fresh one takes its place at the same spawn.
pub fn remove_trooper(
    ecs: &mut World,
    physics: &mut PhysicsWorld,
    events: &mut EventQueue,
    entity: Entity,
    respawn: bool,
    gravity: f32,
) -> Option<Entity> {
    let (trooper, ai) = ecs.remove::<(Trooper, AIComponent)>(entity).ok()?;
    ecs.despawn(entity).ok();
    physics.remove_collider(trooper.collider);
    events.push(GameEvent::NodeRemoved {
        node: NodeId::Trooper(entity),
    });
    events.push(GameEvent::TrooperRemoved { entity });

    if !respawn {
        return None;
    }
    let fresh = spawn_trooper(
        ecs,
        physics,
        events,
        trooper.spawn,
        gravity,
        ai.attack_range,
        ai.attack_cooldown,
    );
    events.push(GameEvent::TrooperRespawned {
        entity: fresh,
        spawn: trooper.spawn,
    });
    Some(fresh)
}

/// Troopers still standing or lying down.
pub fn trooper_count(ecs: &World) -> usize {
    ecs.query::<&Trooper>().iter().count()
}

pub fn alive_trooper_count(ecs: &World) -> usize {
    ecs.query::<&Trooper>().iter().filter(|(_, t)| t.is_alive()).count()
}

/// Despawn every trooper and its collider.
pub fn clear_troopers(ecs: &mut World, physics: &mut PhysicsWorld, events: &mut EventQueue) {
    let troopers: Vec<(Entity, ColliderHandle)> = ecs
        .query::<&Trooper>()
        .iter()
        .map(|(e, t)| (e, t.collider))
        .collect();
    for (entity, collider) in troopers {
        ecs.despawn(entity).ok();
        physics.remove_collider(collider);
        events.push(GameEvent::NodeRemoved {
            node: NodeId::Trooper(entity),
        });
    }
}

/// Move every trooper, drive its animation and let the living ones shoot at `target`.
#[allow(clippy::too_many_arguments)]
pub fn update_troopers(
    ecs: &mut World,
    dt: f32,
    world: &WorldIndex,
    scratch: &mut QueryScratch,
    physics: &mut PhysicsWorld,
    target: Vec3,
    rng: &mut StdRng,
    events: &mut EventQueue,
) {
    let mut shots: Vec<(Entity, Vec3, Vec3)> = Vec::new();

    for (entity, (trooper, ai)) in ecs.query_mut::<(&mut Trooper, &mut AIComponent)>() {
        trooper.body.step(dt, world, scratch);
        physics.sync_capsule(trooper.collider, &trooper.body.capsule);

        if !trooper.is_alive() {
            continue;
        }
        trooper.weights = AnimationWeights::locomotion(trooper.body.horizontal_speed());

        let chest = trooper.position();
        let to_target = target - chest;
        let distance = to_target.length();
        trooper.yaw = to_target.x.atan2(to_target.z);

        ai.update_cooldown(dt);
        if distance > ai.attack_range {
            ai.state = AIState::Idle;
            continue;
        }
        ai.state = AIState::Attacking;
        if !ai.can_attack() {
            continue;
        }
        // Line of sight: the level must not block the shot.
        if world.ray_intersect_with(chest, to_target, distance, scratch).is_some() {
            continue;
        }
        ai.trigger_attack();

        let spread = Quat::from_euler(
            EulerRot::XYZ,
            rng.gen_range(-AIM_SPREAD..AIM_SPREAD),
            rng.gen_range(-AIM_SPREAD..AIM_SPREAD),
            0.0,
        );
        shots.push((entity, chest, spread * to_target));
    }

    for (entity, origin, direction) in shots {
        if let Some(laser) = spawn_laser(ecs, events, origin, direction) {
            events.push(GameEvent::TrooperFired { entity, laser });
        }
    }
}
