//! Saberfall headless runner: plays a scripted round in the demo arena and logs
//! everything the presentation layer would receive.

use anyhow::{Context, Result};
use engine_core::Vec3;
use game::{AudioCue, GameConfig, GameEvent, Level, NodeId, Presentation, Session};
use input::{Action, ActionState, Axis, ButtonState};

const FRAME_SECONDS: f32 = 1.0 / 60.0;
const DEFAULT_RUN_SECONDS: f32 = 20.0;

/// Presentation that writes scene and audio traffic to the log.
#[derive(Default)]
struct LogPresentation {
    nodes: usize,
    playing: Vec<AudioCue>,
}

impl Presentation for LogPresentation {
    fn add_node(&mut self, node: NodeId, position: Vec3) {
        self.nodes += 1;
        log::debug!("+ {:?} at {:.2?}", node, position);
    }

    fn remove_node(&mut self, node: NodeId) {
        self.nodes = self.nodes.saturating_sub(1);
        log::debug!("- {:?}", node);
    }

    fn play(&mut self, cue: AudioCue, _position: Vec3) {
        if !self.playing.contains(&cue) {
            self.playing.push(cue);
        }
        log::debug!("play {:?}", cue);
    }

    fn stop(&mut self, cue: AudioCue) {
        self.playing.retain(|c| *c != cue);
    }

    fn notify(&mut self, event: &GameEvent) {
        match event {
            GameEvent::SaberContact { .. } | GameEvent::SaberContactCleared => {
                log::trace!("{:?}", event)
            }
            GameEvent::MatchTick { remaining } if remaining % 10 != 0 => {}
            _ => log::info!("{:?}", event),
        }
    }
}

/// Scripted inputs keyed by frame number.
fn scripted_input(frame: u32, input: &mut ActionState) {
    let at = |seconds: f32| (seconds / FRAME_SECONDS) as u32;

    if frame == at(0.5) {
        input.process_action(Action::ToggleWeapon, ButtonState::Pressed);
    } else if frame == at(0.6) {
        input.process_action(Action::ToggleWeapon, ButtonState::Released);
    }

    // Walk towards the troopers, swinging now and then.
    let walking = frame >= at(1.0) && frame < at(6.0);
    input.set_axis(Axis::MoveForward, if walking { 1.0 } else { 0.0 });
    if walking && frame % at(0.75) == 0 {
        input.process_action(Action::Swing, ButtonState::Pressed);
    } else if input.is_held(Action::Swing) {
        input.process_action(Action::Swing, ButtonState::Released);
    }

    if frame == at(6.5) {
        input.process_action(Action::ForcePull, ButtonState::Pressed);
    } else if frame == at(8.0) {
        input.process_action(Action::ForcePull, ButtonState::Released);
    }

    if frame == at(9.0) {
        input.process_action(Action::Throw, ButtonState::Pressed);
    } else if frame == at(9.8) {
        input.process_action(Action::Throw, ButtonState::Released);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let seconds = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<f32>()
            .with_context(|| format!("invalid run length '{}'", arg))?,
        None => DEFAULT_RUN_SECONDS,
    };

    let config = GameConfig::load();
    log::info!("Starting Saberfall headless run ({:.1}s)", seconds);

    let mut session = Session::new(config, Level::demo_arena());
    session.attach_hand_rig();
    let mut presentation = LogPresentation::default();
    let mut input = ActionState::new();

    let frames = (seconds / FRAME_SECONDS).ceil() as u32;
    for frame in 0..frames {
        input.begin_frame();
        scripted_input(frame, &mut input);
        session.frame(FRAME_SECONDS, &mut input);
        session.dispatch_events(&mut presentation);

        if let Some(outcome) = session.outcome() {
            log::info!("Round finished after {:.2}s: {:?}", session.now(), outcome);
            break;
        }
    }

    log::info!(
        "Final state: health {:.1}, troopers {} ({} alive), lasers {}, props {}, scene nodes {}, cues {:?}",
        session.player.health.current,
        session.trooper_count(),
        session.alive_trooper_count(),
        session.laser_count(),
        session.props.active_count(),
        presentation.nodes,
        presentation.playing,
    );
    Ok(())
}
