//! Outbound game events and the presentation layer that consumes them.
//!
//! Simulation code never touches the scene graph or audio directly. It pushes
//! [`GameEvent`]s into an [`EventQueue`]; the frame loop drains the queue into
//! whatever [`Presentation`] the host provides.

use engine_core::{Entity, Vec3};
use physics::PieceId;
use std::collections::VecDeque;

/// Scene node handles the presentation layer may be asked to attach or detach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Trooper(Entity),
    Laser(Entity),
    Piece(PieceId),
    Prop(u32),
}

/// Fire-and-forget audio triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioCue {
    SaberIgnite,
    SaberHum,
    SaberSwing,
    ForcePull,
    MatchAlarm,
}

/// What a laser ended on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaserImpact {
    /// Reached its maximum range.
    Range,
    Player,
    Saber,
    World,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Victory,
    Defeat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    NodeAdded { node: NodeId, position: Vec3 },
    NodeRemoved { node: NodeId },
    Play { cue: AudioCue, position: Vec3 },
    Stop { cue: AudioCue },

    /// Blade contact flare at `point`; `light_offset` places the blade light.
    SaberContact { point: Vec3, light_offset: f32 },
    SaberContactCleared,

    PlayerHit { health: f32 },
    PlayerHitCueEnded,
    PlayerDefeated,
    PlayerTeleported { position: Vec3 },

    TrooperDied { entity: Entity, position: Vec3 },
    TrooperRemoved { entity: Entity },
    TrooperRespawned { entity: Entity, spawn: Vec3 },
    TrooperFired { entity: Entity, laser: Entity },

    LaserExpired { entity: Entity, impact: LaserImpact },

    PieceDestroyed { piece: PieceId },
    WorldRebuilt { triangles: usize },

    HandClosed,
    HandOpened,

    MatchTick { remaining: u32 },
    MatchExpired,
    MatchOver(MatchOutcome),
}

/// Host-side sink for simulation output.
pub trait Presentation {
    fn add_node(&mut self, node: NodeId, position: Vec3);
    fn remove_node(&mut self, node: NodeId);
    fn play(&mut self, cue: AudioCue, position: Vec3);
    fn stop(&mut self, cue: AudioCue);
    /// Every other event (HUD, cue visibility, lifecycle notices).
    fn notify(&mut self, event: &GameEvent);
}

/// FIFO of events raised during a frame.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<GameEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: GameEvent) {
        log::trace!("event: {:?}", event);
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.events.iter()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = GameEvent> + '_ {
        self.events.drain(..)
    }

    /// Hand every queued event to `presentation`, oldest first.
    pub fn dispatch<P: Presentation + ?Sized>(&mut self, presentation: &mut P) {
        for event in self.events.drain(..) {
            match event {
                GameEvent::NodeAdded { node, position } => presentation.add_node(node, position),
                GameEvent::NodeRemoved { node } => presentation.remove_node(node),
                GameEvent::Play { cue, position } => presentation.play(cue, position),
                GameEvent::Stop { cue } => presentation.stop(cue),
                other => presentation.notify(&other),
            }
        }
    }
}
