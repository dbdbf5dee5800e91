//! Saberfall simulation core.
//!
//! Everything the game does between reading input and drawing a frame:
//! player and trooper movement, the saber, the force-pull hand, blaster bolts,
//! throwable props and the match rules. Rendering and audio live with the
//! host, which receives [`events::GameEvent`]s through a [`events::Presentation`].

pub mod config;
pub mod damage;
pub mod events;
pub mod hand;
pub mod laser;
pub mod level;
pub mod player;
pub mod props;
pub mod saber;
pub mod session;
pub mod timer;
pub mod trooper;

pub use config::GameConfig;
pub use events::{AudioCue, EventQueue, GameEvent, MatchOutcome, NodeId, Presentation};
pub use level::{Level, SceneNode};
pub use session::Session;
