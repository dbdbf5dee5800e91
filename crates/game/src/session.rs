//! One running match: owns every simulation system and drives the substep loop.

use engine_core::{Entity, Time, Vec3, World};
use input::{Action, ActionState, Axis, Hand as ControllerHand};
use physics::{ColliderTag, PhysicsWorld, QueryScratch, WorldIndex};
use rand::prelude::*;

use crate::config::GameConfig;
use crate::damage::{DamageOutcome, Pullable};
use crate::events::{AudioCue, EventQueue, GameEvent, MatchOutcome, Presentation};
use crate::hand::Hand;
use crate::laser::{clear_lasers, laser_count, update_lasers};
use crate::level::Level;
use crate::player::{MountMode, Player, XR_TURN_STEP};
use crate::props::PropPool;
use crate::saber::{BladeTarget, Saber, SWING_DAMAGE};
use crate::timer::{GameTimers, MatchTimer, ScheduledEvent};
use crate::trooper::{
    alive_trooper_count, clear_troopers, damage_trooper, remove_trooper, spawn_trooper,
    trooper_count, update_troopers, Trooper,
};

pub struct Session {
    pub config: GameConfig,
    pub level: Level,
    pub player: Player,
    pub saber: Saber,
    pub hand: Hand,
    pub props: PropPool,
    time: Time,
    world: WorldIndex,
    physics: PhysicsWorld,
    ecs: World,
    timers: GameTimers,
    match_timer: MatchTimer,
    events: EventQueue,
    scratch: QueryScratch,
    rng: StdRng,
    outcome: Option<MatchOutcome>,
}

impl Session {
    pub fn new(config: GameConfig, level: Level) -> Self {
        Self::with_rng(config, level, StdRng::from_entropy())
    }

    /// Deterministic session for replays and tests.
    pub fn with_rng(config: GameConfig, level: Level, rng: StdRng) -> Self {
        let mut physics = PhysicsWorld::new();
        let world = level.build_index();
        let player = Player::new(level.player_spawn, config.gravity, &mut physics);
        let saber = Saber::new(&mut physics);
        let props = PropPool::new(config.prop_count, config.gravity, &mut physics);

        let mut session = Self {
            time: Time::new(config.steps_per_frame, config.max_frame_delta),
            match_timer: MatchTimer::new(config.match_seconds),
            config,
            level,
            player,
            saber,
            hand: Hand::new(),
            props,
            world,
            physics,
            ecs: World::new(),
            timers: GameTimers::new(),
            events: EventQueue::new(),
            scratch: QueryScratch::new(),
            rng,
            outcome: None,
        };
        session.start_round();
        log::info!(
            "Session started: {} triangles, {} troopers",
            session.world.triangle_count(),
            session.trooper_count()
        );
        session
    }

    fn start_round(&mut self) {
        for spawn in self.level.enemy_spawns.clone() {
            spawn_trooper(
                &mut self.ecs,
                &mut self.physics,
                &mut self.events,
                spawn,
                self.config.gravity,
                self.config.trooper_fire_range,
                self.config.trooper_fire_cooldown,
            );
        }
        self.match_timer.start(self.time.now(), &mut self.timers);
        self.physics.update_query_pipeline();
    }

    /// Start a new round: fresh troopers, full health, intact level.
    pub fn reset(&mut self) {
        clear_troopers(&mut self.ecs, &mut self.physics, &mut self.events);
        clear_lasers(&mut self.ecs, &mut self.events);
        self.props.reset(&mut self.physics, &mut self.events);
        self.match_timer.stop(&mut self.timers);
        self.timers.clear();

        self.level.restore(&mut self.events);
        self.level.flush_rebuild(&mut self.world, &mut self.events);

        self.saber.off(&mut self.events);
        if self.hand.force {
            self.hand.force_release(&mut self.events);
        }
        self.player.reset(self.level.player_spawn);
        self.player.sync_collider(&mut self.physics);
        self.outcome = None;

        self.start_round();
        log::info!("Session reset");
    }

    /// The finger skeleton finished loading.
    pub fn attach_hand_rig(&mut self) {
        self.hand.attach_rig();
    }

    /// Simulate one rendered frame that took `elapsed` seconds.
    pub fn frame(&mut self, elapsed: f32, input: &mut ActionState) {
        let steps = self.time.begin_frame(elapsed);
        input.tick(steps.total());
        self.update_mount_mode(input);

        for step in 0..steps.count {
            let dt = steps.dt;
            self.controls(dt, input, step == 0);

            self.player.update(dt, &self.world, &mut self.scratch);
            if self.player.tick_hit_cue(dt) {
                self.events.push(GameEvent::PlayerHitCueEnded);
            }

            self.weapons(dt, input);

            update_troopers(
                &mut self.ecs,
                dt,
                &self.world,
                &mut self.scratch,
                &mut self.physics,
                self.player.body.capsule.center(),
                &mut self.rng,
                &mut self.events,
            );
            self.props.update(dt, &self.world, &mut self.scratch, &mut self.player, &mut self.physics);

            self.time.advance(dt);
            self.run_timers();

            self.check_bounds();
        }

        // Destroyed pieces leave the index only between frames.
        self.level.flush_rebuild(&mut self.world, &mut self.events);
    }

    fn update_mount_mode(&mut self, input: &ActionState) {
        let mode = if input.is_xr() {
            MountMode::Xr
        } else {
            MountMode::Desktop
        };
        if mode == self.player.mount_mode {
            return;
        }
        log::info!("Switching weapon mounts to {:?}", mode);
        self.player.mount_mode = mode;
        self.saber.set_mount_mode(mode);
        self.hand.set_mount_mode(mode);
    }

    fn controls(&mut self, dt: f32, input: &ActionState, first_step: bool) {
        let forward = input.axis(Axis::MoveForward);
        let side = input.axis(Axis::MoveSide);
        let jump = input.is_held(Action::Jump);

        match self.player.mount_mode {
            MountMode::Desktop => self.player.apply_input_velocity(forward, side, jump, dt),
            MountMode::Xr => {
                // Sideways stick turns the play space instead of strafing.
                self.player.apply_input_velocity(forward, 0.0, jump, dt);
                if side != 0.0 {
                    self.player.camera.yaw -= XR_TURN_STEP * side.signum();
                }
            }
        }

        // Button edges and look are consumed once per frame.
        if !first_step {
            return;
        }
        if self.player.mount_mode == MountMode::Desktop {
            self.player.camera.apply_look(input.look_delta());
        }
        if input.is_pressed(Action::ToggleWeapon) {
            self.saber.toggle(&mut self.events);
        }
        if input.is_pressed(Action::Swing) {
            self.saber.swing(&mut self.events);
        }
        if input.is_pressed(Action::ForcePull) {
            self.hand.force_pull(&mut self.events);
        }
        if input.is_released(Action::ForcePull) {
            self.hand.force_release(&mut self.events);
        }
        if input.is_released(Action::Throw) {
            let direction = self.player.camera.world_direction();
            self.props
                .throw(&self.player, direction, input.hold_time(Action::Throw), &mut self.events);
        }
    }

    fn weapons(&mut self, dt: f32, input: &ActionState) {
        self.saber.mount = self.player.mount_transform(input.controller_pose(ControllerHand::Right));
        self.hand.mount = self.player.mount_transform(input.controller_pose(ControllerHand::Left));
        self.player.sync_collider(&mut self.physics);
        self.saber.sync_collider(&mut self.physics);
        self.physics.update_query_pipeline();

        self.saber.update(dt, &mut self.events);
        let hits = self.saber
            .detect_hits(&self.physics, &self.world, &mut self.scratch);
        let now = self.time.now();
        for hit in &hits {
            match hit.target {
                BladeTarget::Trooper(entity) => {
                    damage_trooper(
                        &mut self.ecs,
                        entity,
                        SWING_DAMAGE,
                        now,
                        &mut self.timers,
                        &mut self.events,
                    );
                }
                BladeTarget::Piece(piece) => {
                    self.level.damage_piece(piece, SWING_DAMAGE, &mut self.events);
                }
            }
        }
        self.saber.report_contacts(&hits, &mut self.events);

        self.hand.update(dt, &mut self.events);
        if let Some(pull) = self.hand.find_pull(&self.physics) {
            self.apply_pull(pull.target, pull.delta);
        }

        update_lasers(
            &mut self.ecs,
            dt,
            &self.physics,
            &self.world,
            &mut self.player,
            &mut self.events,
            &mut self.scratch,
        );
        if self.player.health.is_dead() {
            self.finish(MatchOutcome::Defeat);
        }
    }

    fn apply_pull(&mut self, target: ColliderTag, delta: Vec3) {
        match target {
            ColliderTag::Enemy(bits) => {
                let Some(entity) = Entity::from_bits(bits) else {
                    return;
                };
                if let Ok(mut trooper) = self.ecs.get::<&mut Trooper>(entity) {
                    trooper.add_velocity(delta);
                }
            }
            ColliderTag::Prop(slot) => {
                if let Some(prop) = self.props.get_mut(slot) {
                    prop.add_velocity(delta);
                }
            }
            ColliderTag::Player | ColliderTag::Saber => {}
        }
    }

    fn run_timers(&mut self) {
        let now = self.time.now();
        for due in self.timers.drain_due(now) {
            match due {
                ScheduledEvent::RemoveTrooper(entity) => {
                    remove_trooper(
                        &mut self.ecs,
                        &mut self.physics,
                        &mut self.events,
                        entity,
                        self.config.respawn_enemies,
                        self.config.gravity,
                    );
                    if !self.config.respawn_enemies && self.trooper_count() == 0 {
                        self.finish(MatchOutcome::Victory);
                    }
                }
                ScheduledEvent::MatchSecond => {
                    if self.match_timer.on_second(now, &mut self.timers, &mut self.events) {
                        self.events.push(GameEvent::Play {
                            cue: AudioCue::MatchAlarm,
                            position: self.player.position(),
                        });
                        self.finish(MatchOutcome::Defeat);
                    }
                }
            }
        }
    }

    fn check_bounds(&mut self) {
        if self.player.position().y > self.config.out_of_bounds_y {
            return;
        }
        let spawn = self.level.player_spawn;
        log::debug!("Player fell out of the level");
        self.player.teleport(spawn);
        self.player.sync_collider(&mut self.physics);
        self.events.push(GameEvent::PlayerTeleported { position: spawn });
    }

    fn finish(&mut self, outcome: MatchOutcome) {
        if self.outcome.is_some() {
            return;
        }
        self.outcome = Some(outcome);
        self.match_timer.stop(&mut self.timers);
        log::info!("Match over: {:?}", outcome);
        self.events.push(GameEvent::MatchOver(outcome));
    }

    /// Hand every queued event to the host.
    pub fn dispatch_events<P: Presentation + ?Sized>(&mut self, presentation: &mut P) {
        self.events.dispatch(presentation);
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    pub fn now(&self) -> f64 {
        self.time.now()
    }

    pub fn trooper_count(&self) -> usize {
        trooper_count(&self.ecs)
    }

    /// Troopers not yet killed.
    pub fn alive_trooper_count(&self) -> usize {
        alive_trooper_count(&self.ecs)
    }

    pub fn laser_count(&self) -> usize {
        laser_count(&self.ecs)
    }

    pub fn match_remaining(&self) -> u32 {
        self.match_timer.remaining()
    }

    pub fn world_index(&self) -> &WorldIndex {
        &self.world
    }

    /// Entity handles of every trooper, alive or dying.
    pub fn troopers(&self) -> Vec<Entity> {
        self.ecs.query::<&Trooper>().iter().map(|(e, _)| e).collect()
    }

    pub fn trooper(&self, entity: Entity) -> Option<Trooper> {
        self.ecs.get::<&Trooper>(entity).ok().map(|t| (*t).clone())
    }

    /// Apply raw damage to a trooper outside the weapon pass.
    pub fn damage_trooper(&mut self, entity: Entity, amount: f32) -> DamageOutcome {
        damage_trooper(
            &mut self.ecs,
            entity,
            amount,
            self.time.now(),
            &mut self.timers,
            &mut self.events,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::SceneNode;
    use input::ButtonState;
    use physics::TriangleMesh;

    const FRAME: f32 = 1.0 / 60.0;

    fn quiet_config() -> GameConfig {
        GameConfig {
            prop_count: 4,
            trooper_fire_range: 0.0,
            ..GameConfig::default()
        }
    }

    fn single_trooper_level() -> Level {
        Level::from_nodes([
            SceneNode::geometry("Floor", TriangleMesh::floor(Vec3::ZERO, 30.0, 30.0)),
            SceneNode::marker("Player", Vec3::new(0.0, 0.8, 0.0)),
            SceneNode::marker("Enemy", Vec3::new(0.0, 0.3, -10.0)),
        ])
    }

    fn session(config: GameConfig) -> Session {
        Session::with_rng(config, single_trooper_level(), StdRng::seed_from_u64(1))
    }

    fn run(session: &mut Session, input: &mut ActionState, seconds: f32) {
        let frames = (seconds / FRAME).ceil() as usize;
        for _ in 0..frames {
            session.frame(FRAME, input);
            input.begin_frame();
        }
    }

    fn seen(session: &Session, pred: impl Fn(&GameEvent) -> bool) -> bool {
        session.events().iter().any(pred)
    }

    #[test]
    fn player_stands_on_the_floor() {
        let mut s = session(quiet_config());
        let mut input = ActionState::new();
        run(&mut s, &mut input, 1.0);
        assert!(s.player.body.on_floor);
        assert!((s.player.body.capsule.start.y - 0.8).abs() < 0.05);
    }

    #[test]
    fn toggle_button_ignites_saber_once_per_press() {
        let mut s = session(quiet_config());
        let mut input = ActionState::new();
        input.process_action(Action::ToggleWeapon, ButtonState::Pressed);
        s.frame(FRAME, &mut input);
        assert!(s.saber.is_on());

        input.begin_frame();
        input.process_action(Action::ToggleWeapon, ButtonState::Released);
        run(&mut s, &mut input, 0.2);
        assert!(s.saber.is_on());
        assert_eq!(s.saber.scale, 1.0);
        assert!(seen(&s, |e| matches!(e, GameEvent::Play { cue: AudioCue::SaberHum, .. })));
    }

    #[test]
    fn falling_out_of_the_level_teleports_to_spawn() {
        let mut s = session(quiet_config());
        let mut input = ActionState::new();
        s.player.teleport(Vec3::new(100.0, -24.0, 100.0));
        run(&mut s, &mut input, 1.0);
        assert!(seen(&s, |e| matches!(e, GameEvent::PlayerTeleported { .. })));
        assert!(s.player.position().distance(Vec3::new(0.0, 0.3, 0.0)) < 0.5);
    }

    #[test]
    fn last_trooper_removed_wins_the_match() {
        let mut s = session(quiet_config());
        let mut input = ActionState::new();
        let trooper = s.troopers()[0];
        assert_eq!(s.alive_trooper_count(), 1);
        assert_eq!(s.damage_trooper(trooper, 1000.0), DamageOutcome::Killed);
        assert_eq!(s.alive_trooper_count(), 0);

        run(&mut s, &mut input, 2.5);
        assert_eq!(s.trooper_count(), 1);
        assert_eq!(s.outcome(), None);

        run(&mut s, &mut input, 1.0);
        assert_eq!(s.trooper_count(), 0);
        assert_eq!(s.outcome(), Some(MatchOutcome::Victory));
        assert!(seen(&s, |e| *e == GameEvent::MatchOver(MatchOutcome::Victory)));
    }

    #[test]
    fn respawn_policy_replaces_the_trooper() {
        let mut s = session(GameConfig {
            respawn_enemies: true,
            ..quiet_config()
        });
        let mut input = ActionState::new();
        let trooper = s.troopers()[0];
        let spawn = s.trooper(trooper).unwrap().spawn;
        s.damage_trooper(trooper, 1000.0);

        run(&mut s, &mut input, 3.5);
        let fresh = s.troopers();
        assert_eq!(fresh.len(), 1);
        assert_ne!(fresh[0], trooper);
        let fresh = s.trooper(fresh[0]).unwrap();
        assert_eq!(fresh.spawn, spawn);
        assert_eq!(fresh.health.current, 100.0);
        assert_eq!(s.outcome(), None);
    }

    #[test]
    fn match_clock_runs_out_into_defeat() {
        let mut s = session(GameConfig {
            match_seconds: 2,
            ..quiet_config()
        });
        let mut input = ActionState::new();
        run(&mut s, &mut input, 1.5);
        assert_eq!(s.match_remaining(), 1);
        assert!(seen(&s, |e| *e == GameEvent::MatchTick { remaining: 1 }));

        run(&mut s, &mut input, 1.0);
        assert_eq!(s.outcome(), Some(MatchOutcome::Defeat));
        assert!(seen(&s, |e| *e == GameEvent::MatchExpired));
    }

    #[test]
    fn lit_blade_cuts_a_trooper_in_reach() {
        let mut s = session(quiet_config());
        let mut input = ActionState::new();
        input.process_action(Action::ToggleWeapon, ButtonState::Pressed);
        run(&mut s, &mut input, 0.2);
        assert_eq!(s.saber.scale, 1.0);

        // Stand the trooper on the middle of the blade and pin it there.
        let handle = s.saber.handle_position();
        let middle = handle + s.saber.blade_direction() * 0.6;
        let entity = s.troopers()[0];
        {
            let mut trooper = s.ecs.get::<&mut Trooper>(entity).unwrap();
            let offset = middle - trooper.body.capsule.center();
            trooper.body.capsule.translate(offset);
            trooper.body.gravity = 0.0;
            trooper.body.velocity = Vec3::ZERO;
        }
        run(&mut s, &mut input, 0.05);

        let health = s.trooper(entity).unwrap().health.current;
        assert!(health < 100.0);
        assert!(seen(&s, |e| matches!(e, GameEvent::SaberContact { .. })));
    }

    #[test]
    fn pull_reaches_troopers_and_props_only() {
        let mut s = session(quiet_config());
        let entity = s.troopers()[0];
        let delta = Vec3::new(0.0, 0.0, 0.5);

        let before = s.trooper(entity).unwrap().body.velocity;
        s.apply_pull(ColliderTag::Enemy(entity.to_bits().get()), delta);
        let after = s.trooper(entity).unwrap().body.velocity;
        assert!((after - before - delta).length() < 1e-6);

        s.apply_pull(ColliderTag::Prop(0), delta);
        assert!((s.props.get(0).unwrap().velocity - delta).length() < 1e-6);

        let player_velocity = s.player.body.velocity;
        s.apply_pull(ColliderTag::Player, delta);
        assert_eq!(s.player.body.velocity, player_velocity);
        // Stale handles are ignored.
        s.apply_pull(ColliderTag::Prop(999), delta);
    }

    #[test]
    fn held_throw_launches_a_prop_on_release() {
        let mut s = session(quiet_config());
        let mut input = ActionState::new();
        input.process_action(Action::Throw, ButtonState::Pressed);
        run(&mut s, &mut input, 0.5);
        assert_eq!(s.props.active_count(), 0);

        input.process_action(Action::Throw, ButtonState::Released);
        s.frame(FRAME, &mut input);
        assert_eq!(s.props.active_count(), 1);
    }

    #[test]
    fn reset_restores_the_round() {
        let mut s = session(quiet_config());
        let mut input = ActionState::new();
        let trooper = s.troopers()[0];
        s.damage_trooper(trooper, 1000.0);
        run(&mut s, &mut input, 3.5);
        assert_eq!(s.outcome(), Some(MatchOutcome::Victory));

        s.reset();
        assert_eq!(s.outcome(), None);
        assert_eq!(s.trooper_count(), 1);
        assert_eq!(s.match_remaining(), s.config.match_seconds);
        assert_eq!(s.player.health.current, 100.0);
    }
}
