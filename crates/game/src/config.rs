//! Simulation tuning. Loaded from saberfall.ron at startup.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persistent simulation settings. Loaded from `saberfall.ron` in the current directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Downward acceleration applied to airborne actors and props.
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    /// Fixed substeps each frame is split into.
    #[serde(default = "default_steps_per_frame")]
    pub steps_per_frame: u32,
    /// Cap on one frame's elapsed time, in seconds.
    #[serde(default = "default_max_frame_delta")]
    pub max_frame_delta: f32,
    /// Spawn a fresh trooper at the same point after one is removed.
    #[serde(default)]
    pub respawn_enemies: bool,
    /// Match countdown length.
    #[serde(default = "default_match_seconds")]
    pub match_seconds: u32,
    /// Size of the throwable sphere pool.
    #[serde(default = "default_prop_count")]
    pub prop_count: usize,
    /// Player is teleported back to spawn at or below this height.
    #[serde(default = "default_out_of_bounds_y")]
    pub out_of_bounds_y: f32,
    /// Troopers open fire when the player is closer than this.
    #[serde(default = "default_trooper_fire_range")]
    pub trooper_fire_range: f32,
    /// Seconds between two shots of one trooper.
    #[serde(default = "default_trooper_fire_cooldown")]
    pub trooper_fire_cooldown: f32,
}

fn default_gravity() -> f32 {
    9.8 * 3.5
}
fn default_steps_per_frame() -> u32 {
    engine_core::DEFAULT_STEPS_PER_FRAME
}
fn default_max_frame_delta() -> f32 {
    engine_core::DEFAULT_MAX_FRAME_DELTA
}
fn default_match_seconds() -> u32 {
    120
}
fn default_prop_count() -> usize {
    100
}
fn default_out_of_bounds_y() -> f32 {
    -25.0
}
fn default_trooper_fire_range() -> f32 {
    15.0
}
fn default_trooper_fire_cooldown() -> f32 {
    2.0
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            gravity: default_gravity(),
            steps_per_frame: default_steps_per_frame(),
            max_frame_delta: default_max_frame_delta(),
            respawn_enemies: false,
            match_seconds: default_match_seconds(),
            prop_count: default_prop_count(),
            out_of_bounds_y: default_out_of_bounds_y(),
            trooper_fire_range: default_trooper_fire_range(),
            trooper_fire_cooldown: default_trooper_fire_cooldown(),
        }
    }
}

impl GameConfig {
    /// Load config from `saberfall.ron`. If the file is missing or invalid, returns default config.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if let Ok(data) = std::fs::read_to_string(path) {
            match Self::parse(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {:#}, using defaults", path, e),
            }
        }
        Self::default()
    }

    /// Parse RON text into a config.
    pub fn parse(data: &str) -> anyhow::Result<Self> {
        let config: Self = ron::from_str(data).context("malformed RON")?;
        Ok(config.sanitized())
    }

    /// Save current config to `saberfall.ron`.
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        let s = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        std::fs::write(path, s).with_context(|| format!("could not write config to {:?}", path))?;
        Ok(())
    }

    /// Replace values the loop cannot run with.
    fn sanitized(mut self) -> Self {
        if self.steps_per_frame == 0 {
            log::warn!("steps_per_frame must be at least 1, using {}", default_steps_per_frame());
            self.steps_per_frame = default_steps_per_frame();
        }
        if !(self.max_frame_delta.is_finite() && self.max_frame_delta > 0.0) {
            log::warn!("max_frame_delta must be positive, using {}", default_max_frame_delta());
            self.max_frame_delta = default_max_frame_delta();
        }
        if !self.gravity.is_finite() {
            self.gravity = default_gravity();
        }
        self
    }
}

fn config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("saberfall.ron")
}
