//! Level geometry, spawn points and destructible pieces.

use engine_core::{Health, Transform, Vec3};
use physics::{PieceId, TriangleMesh, WorldIndex};

use crate::damage::{DamageOutcome, Damageable};
use crate::events::{EventQueue, GameEvent, NodeId};
use crate::trooper::DEFAULT_ENEMY_SPAWN;

const ENEMY_PREFIX: &str = "Enemy";
const PLAYER_NODE: &str = "Player";

/// A node of a loaded scene, as handed over by the asset layer.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    /// Collision geometry in node-local space.
    pub mesh: Option<TriangleMesh>,
    /// Present on pieces the saber can destroy.
    pub health: Option<f32>,
}

impl SceneNode {
    pub fn marker(name: impl Into<String>, position: Vec3) -> Self {
        Self {
            name: name.into(),
            transform: Transform::from_position(position),
            mesh: None,
            health: None,
        }
    }

    pub fn geometry(name: impl Into<String>, mesh: TriangleMesh) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            mesh: Some(mesh),
            health: None,
        }
    }

    pub fn with_health(mut self, health: f32) -> Self {
        self.health = Some(health);
        self
    }
}

#[derive(Debug, Clone)]
pub struct LevelPiece {
    pub id: PieceId,
    pub name: String,
    /// World-space collision mesh.
    pub mesh: TriangleMesh,
    /// `None` for static scenery.
    pub health: Option<Health>,
    pub destroyed: bool,
}

impl Damageable for LevelPiece {
    fn damage(&mut self, amount: f32) -> DamageOutcome {
        let Some(health) = self.health.as_mut() else {
            return DamageOutcome::Ignored;
        };
        if self.destroyed || health.is_dead() {
            return DamageOutcome::Ignored;
        }
        health.take_damage(amount);
        if health.is_dead() {
            DamageOutcome::Killed
        } else {
            DamageOutcome::Wounded
        }
    }
}

#[derive(Debug, Clone)]
pub struct Level {
    pub pieces: Vec<LevelPiece>,
    pub player_spawn: Vec3,
    pub enemy_spawns: Vec<Vec3>,
    rebuild_pending: bool,
}

impl Level {
    /// Collect geometry and spawn markers from a flat list of scene nodes.
    pub fn from_nodes(nodes: impl IntoIterator<Item = SceneNode>) -> Self {
        let mut pieces = Vec::new();
        let mut player_spawn = None;
        let mut enemy_spawns = Vec::new();

        for node in nodes {
            if node.name.starts_with(ENEMY_PREFIX) {
                enemy_spawns.push(node.transform.position);
            } else if node.name == PLAYER_NODE {
                player_spawn = Some(node.transform.position);
            }

            if let Some(mesh) = node.mesh {
                pieces.push(LevelPiece {
                    id: pieces.len() as PieceId,
                    name: node.name,
                    mesh: mesh.transformed(&node.transform),
                    health: node.health.map(Health::new),
                    destroyed: false,
                });
            }
        }

        if enemy_spawns.is_empty() {
            log::debug!("Level names no enemy spawns, using default");
            enemy_spawns.push(DEFAULT_ENEMY_SPAWN);
        }
        let player_spawn = player_spawn.unwrap_or_else(|| {
            log::warn!("Level has no Player node, spawning at origin");
            Vec3::ZERO
        });

        log::info!(
            "Level loaded: {} pieces, {} enemy spawns",
            pieces.len(),
            enemy_spawns.len()
        );
        Self {
            pieces,
            player_spawn,
            enemy_spawns,
            rebuild_pending: false,
        }
    }

    /// Walled floor with a few crates, two of them breakable.
    pub fn demo_arena() -> Self {
        let mut nodes = vec![
            SceneNode::geometry("Floor", TriangleMesh::floor(Vec3::ZERO, 20.0, 20.0)),
            SceneNode::marker(PLAYER_NODE, Vec3::new(0.0, 0.8, 6.0)),
            SceneNode::marker("Enemy.001", Vec3::new(-3.0, 0.3, -8.0)),
            SceneNode::marker("Enemy.002", Vec3::new(3.0, 0.3, -8.0)),
            SceneNode::marker("Enemy.003", Vec3::new(0.0, 0.3, -12.0)),
        ];
        for (name, center, half) in [
            ("WallNorth", Vec3::new(0.0, 2.0, -20.0), Vec3::new(20.0, 2.0, 0.5)),
            ("WallSouth", Vec3::new(0.0, 2.0, 20.0), Vec3::new(20.0, 2.0, 0.5)),
            ("WallEast", Vec3::new(20.0, 2.0, 0.0), Vec3::new(0.5, 2.0, 20.0)),
            ("WallWest", Vec3::new(-20.0, 2.0, 0.0), Vec3::new(0.5, 2.0, 20.0)),
            ("Crate", Vec3::new(-5.0, 0.5, -2.0), Vec3::splat(0.5)),
        ] {
            nodes.push(SceneNode::geometry(name, TriangleMesh::cuboid(center, half)));
        }
        for (name, center) in [
            ("BreakableCrate.001", Vec3::new(1.5, 0.5, 2.0)),
            ("BreakableCrate.002", Vec3::new(-1.5, 0.5, -4.0)),
        ] {
            nodes.push(
                SceneNode::geometry(name, TriangleMesh::cuboid(center, Vec3::splat(0.5)))
                    .with_health(20.0),
            );
        }
        Self::from_nodes(nodes)
    }

    fn live_pieces(&self) -> impl Iterator<Item = (PieceId, &TriangleMesh)> {
        self.pieces
            .iter()
            .filter(|p| !p.destroyed)
            .map(|p| (p.id, &p.mesh))
    }

    pub fn build_index(&self) -> WorldIndex {
        WorldIndex::build(self.live_pieces())
    }

    pub fn piece(&self, id: PieceId) -> Option<&LevelPiece> {
        self.pieces.get(id as usize)
    }

    /// Raw damage to a piece. Destroying one removes it and schedules an index rebuild.
    pub fn damage_piece(&mut self, id: PieceId, amount: f32, events: &mut EventQueue) -> DamageOutcome {
        let Some(piece) = self.pieces.get_mut(id as usize) else {
            return DamageOutcome::Ignored;
        };
        let outcome = piece.damage(amount);
        if outcome == DamageOutcome::Killed {
            piece.destroyed = true;
            self.rebuild_pending = true;
            log::info!("Destroyed level piece {} ({})", piece.id, piece.name);
            events.push(GameEvent::PieceDestroyed { piece: id });
            events.push(GameEvent::NodeRemoved {
                node: NodeId::Piece(id),
            });
        }
        outcome
    }

    pub fn rebuild_pending(&self) -> bool {
        self.rebuild_pending
    }

    /// Rebuild `index` from the surviving pieces if anything was destroyed.
    pub fn flush_rebuild(&mut self, index: &mut WorldIndex, events: &mut EventQueue) -> bool {
        if !self.rebuild_pending {
            return false;
        }
        self.rebuild_pending = false;
        index.rebuild(self.live_pieces());
        events.push(GameEvent::WorldRebuilt {
            triangles: index.triangle_count(),
        });
        true
    }

    /// Bring every destroyed piece back for a new round.
    pub fn restore(&mut self, events: &mut EventQueue) {
        for piece in &mut self.pieces {
            if let Some(health) = piece.health.as_mut() {
                health.restore();
            }
            if piece.destroyed {
                piece.destroyed = false;
                self.rebuild_pending = true;
                events.push(GameEvent::NodeAdded {
                    node: NodeId::Piece(piece.id),
                    position: piece.mesh.bounds().center(),
                });
            }
        }
    }
}
