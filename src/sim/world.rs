/// WorldState: the level session of a running game.
///
/// ## Lifecycle
///
///   Loading ──load_level──▶ Active ──portal used──▶ Transitioning
///      ▲                                                 │
///      └────────────── delay elapsed ◀───────────────────┘
///
/// Everything level-scoped (grid, colliders, keys, portal, counters) is
/// rebuilt wholesale by `sim::level::load_level`; nothing is patched in place.
///
/// ## Transition guard
///
/// `load_serial` increases on every successful load. A pending transition
/// remembers the serial it was scheduled under and only fires if the world is
/// still Transitioning on that same level.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{GameConfig, GenerationConfig, MovementConfig, TimingConfig};
use crate::domain::entity::{Key, Player, Portal};
use crate::domain::geometry::Aabb;
use crate::domain::grid::{Grid, LevelData, WallPlacement};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Loading,
    Active,
    Transitioning,
}

/// A scheduled level change after the portal was used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingTransition {
    pub target: usize,
    pub remaining_ms: u32,
    pub scheduled_serial: u64,
}

pub struct WorldState {
    // ── Level list ──
    pub levels: Vec<LevelData>,
    pub current_level: usize,
    pub level_name: String,
    pub load_serial: u64,

    // ── Grid ──
    pub grid: Grid,
    pub walls: Vec<WallPlacement>,
    pub colliders: Vec<Aabb>,

    // ── Entities ──
    pub player: Player,
    pub keys: Vec<Key>,
    pub portal: Option<Portal>,
    pub keys_collected: usize,

    // ── Flow ──
    pub phase: Phase,
    pub transition: Option<PendingTransition>,
    pub paused: bool,

    // ── Tuning ──
    pub movement: MovementConfig,
    pub timing: TimingConfig,
    pub generation: GenerationConfig,

    pub rng: StdRng,
}

// ── Construction ──

impl WorldState {
    pub fn new(config: &GameConfig) -> Self {
        let rng = match config.generation.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        WorldState {
            levels: vec![],
            current_level: 0,
            level_name: String::new(),
            load_serial: 0,
            grid: Grid::default(),
            walls: vec![],
            colliders: vec![],
            player: Player::new(Vec3::ZERO, config.movement.half_extents()),
            keys: vec![],
            portal: None,
            keys_collected: 0,
            phase: Phase::Loading,
            transition: None,
            paused: false,
            movement: config.movement.clone(),
            timing: config.timing.clone(),
            generation: config.generation.clone(),
            rng,
        }
    }
}

// ── Queries ──

impl WorldState {
    pub fn key_total(&self) -> usize {
        self.keys.len()
    }

    /// Keys still in the level (drawn and collidable).
    pub fn remaining_keys(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter().filter(|k| !k.collected)
    }

    pub fn player_box(&self) -> Aabb {
        self.player.bounding_box()
    }

    /// Level the portal leads to. Past the last level, wrap to the first.
    pub fn next_level_index(&self) -> usize {
        if self.levels.is_empty() {
            0
        } else {
            (self.current_level + 1) % self.levels.len()
        }
    }

    pub fn is_transitioning(&self) -> bool {
        self.phase == Phase::Transitioning
    }
}
