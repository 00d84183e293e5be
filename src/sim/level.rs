/// Level loader and session navigation.
///
/// ## Sources (in list order):
///   1. Built-in embedded levels ("Tutorial", "Maze")
///   2. `levels/` directory (`*.json` files, sorted by filename)
///   3. Procedural levels, appended when generated during a session
///
/// ## Load contract
///
/// `load_level` validates and resolves everything first (grid, key cells,
/// portal cell) and only then touches the world. A failed load leaves the
/// world exactly as it was.
///
/// Authored levels without `keys`/`portal` get them placed with the session
/// RNG on first load; the result is written back to the level list so
/// revisiting a level shows the same layout.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::domain::entity::{Key, Portal};
use crate::domain::generate::{generate_procedural, place_keys, place_portal};
use crate::domain::grid::{CellPos, Grid, LevelData, LevelError};
use crate::sim::event::GameEvent;
use crate::sim::hud::HudSink;
use crate::sim::world::{Phase, WorldState};

#[derive(Debug, thiserror::Error)]
pub enum LevelFileError {
    #[error("could not read level file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed level file: {0}")]
    Json(#[from] serde_json::Error),
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Replace the world's level-scoped state with level `index`.
pub fn load_level(
    world: &mut WorldState,
    index: usize,
    hud: &mut dyn HudSink,
) -> Result<Vec<GameEvent>, LevelError> {
    let count = world.levels.len();
    let Some(data) = world.levels.get(index) else {
        return Err(LevelError::InvalidIndex { index: index as isize, count });
    };

    let grid = Grid::from_level(data)?;
    let (key_cells, portal_cell) = resolve_markers(world, &grid, index)?;

    // ── Commit ──
    let data = &mut world.levels[index];
    data.keys = Some(key_cells.clone());
    data.portal = portal_cell;
    world.level_name = data.name.clone();

    world.phase = Phase::Loading;
    world.current_level = index;
    world.load_serial += 1;
    world.transition = None;

    world.walls = grid.wall_placements();
    world.colliders = world.walls.iter().map(|w| w.collider()).collect();
    world.player.set_position(grid.start_position(world.movement.eye_height));
    world.player.yaw = 0.0;
    world.player.pitch = 0.0;
    world.grid = grid;

    world.keys = key_cells.into_iter().map(Key::new).collect();
    world.portal = portal_cell.map(Portal::new);
    world.keys_collected = 0;

    let mut events = vec![GameEvent::LevelLoaded { index }];

    if world.keys.is_empty() {
        if let Some(portal) = world.portal.as_mut() {
            if portal.activate() {
                events.push(GameEvent::PortalActivated);
            }
        }
    }

    hud.update_level_info(index, &world.level_name);
    hud.update_key_info(0, world.key_total());

    world.phase = Phase::Active;
    info!(
        index,
        name = %world.level_name,
        keys = world.keys.len(),
        walls = world.walls.len(),
        "level loaded"
    );
    Ok(events)
}

/// Manual "next level". Errors past the last level instead of wrapping.
pub fn load_next(world: &mut WorldState, hud: &mut dyn HudSink) -> Result<Vec<GameEvent>, LevelError> {
    load_level(world, world.current_level + 1, hud)
}

pub fn load_previous(world: &mut WorldState, hud: &mut dyn HudSink) -> Result<Vec<GameEvent>, LevelError> {
    if world.current_level == 0 {
        return Err(LevelError::InvalidIndex { index: -1, count: world.levels.len() });
    }
    load_level(world, world.current_level - 1, hud)
}

/// Generate a fresh level, append it to the list and load it.
/// On generation failure the current level keeps running.
pub fn load_procedural(world: &mut WorldState, hud: &mut dyn HudSink) -> Result<Vec<GameEvent>, LevelError> {
    let params = world.generation.params();
    let data = match generate_procedural(&params, &mut world.rng) {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "procedural generation failed");
            hud.show_message("Could not generate a level", world.timing.message_ms);
            return Err(e.into());
        }
    };

    world.levels.push(data);
    let index = world.levels.len() - 1;
    match load_level(world, index, hud) {
        Ok(events) => {
            hud.show_message("Generated procedural level", world.timing.message_ms);
            Ok(events)
        }
        Err(e) => {
            // Never leave an unloadable level in the list
            world.levels.pop();
            Err(e)
        }
    }
}

/// Built-in levels followed by any level files found in `dir`.
pub fn level_catalog(dir: &Path) -> Vec<LevelData> {
    let mut levels = embedded_levels();
    if dir.is_dir() {
        let mut found = load_from_directory(dir);
        found.sort_by(|a, b| a.0.cmp(&b.0));
        debug!(count = found.len(), dir = %dir.display(), "level files found");
        levels.extend(found.into_iter().map(|(_, data)| data));
    }
    levels
}

/// Parse one level file.
pub fn read_level_file(path: &Path) -> Result<LevelData, LevelFileError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

// ══════════════════════════════════════════════════════════════
// Internal
// ══════════════════════════════════════════════════════════════

/// Key and portal cells for a level, authored or freshly placed.
/// Authored cells were already checked by `Grid::from_level`.
///
/// A level with no room for a portal still loads, just without one.
fn resolve_markers(
    world: &mut WorldState,
    grid: &Grid,
    index: usize,
) -> Result<(Vec<CellPos>, Option<CellPos>), LevelError> {
    let data = &world.levels[index];
    let max_attempts = world.generation.max_attempts;
    let authored_portal = data.portal;

    let keys = match &data.keys {
        Some(k) => k.clone(),
        None => {
            let count = world.generation.key_count;
            let keys = place_keys(grid, count, max_attempts, &mut world.rng)?;
            debug!(index, keys = count, "placed missing keys");
            keys
        }
    };
    let portal = match authored_portal {
        Some(p) => Some(p),
        None => match place_portal(grid, &keys, max_attempts, &mut world.rng) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(index, error = %e, "no room for a portal, level has none");
                None
            }
        },
    };
    Ok((keys, portal))
}

/// Load all `*.json` levels from a directory, keyed by filename.
/// Unreadable files are skipped with a warning.
fn load_from_directory(dir: &Path) -> Vec<(String, LevelData)> {
    let mut results = vec![];

    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "could not list levels directory");
            return results;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map_or(false, |e| e == "json") {
            match read_level_file(&path) {
                Ok(data) => {
                    let filename = path.file_name()
                        .unwrap_or_default()
                        .to_string_lossy()
                        .to_string();
                    results.push((filename, data));
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping level file"),
            }
        }
    }

    results
}

// ══════════════════════════════════════════════════════════════
// Embedded levels
// ══════════════════════════════════════════════════════════════

pub fn embedded_levels() -> Vec<LevelData> {
    vec![
        make_embedded(
            "Tutorial",
            &[
                "1111111",
                "1000001",
                "1010101",
                "1010101",
                "1000101",
                "1010001",
                "1111111",
            ],
            &[(5, 1), (1, 4), (3, 3)],
            (5, 5),
        ),
        make_embedded(
            "Maze",
            &[
                "111111111",
                "100100001",
                "110101101",
                "100001001",
                "101101011",
                "100100001",
                "110111011",
                "100000001",
                "111111111",
            ],
            &[(7, 1), (1, 5), (6, 3)],
            (7, 7),
        ),
    ]
}

fn make_embedded(name: &str, rows: &[&str], keys: &[(usize, usize)], portal: (usize, usize)) -> LevelData {
    let grid: Vec<Vec<u8>> = rows
        .iter()
        .map(|r| r.bytes().map(|b| b - b'0').collect())
        .collect();
    LevelData {
        name: name.to_string(),
        width: grid.first().map_or(0, |r| r.len()),
        height: grid.len(),
        start: CellPos::new(1, 1),
        grid,
        keys: Some(keys.iter().map(|&(x, z)| CellPos::new(x, z)).collect()),
        portal: Some(CellPos::new(portal.0, portal.1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::entity::PortalState;
    use crate::sim::hud::tests::RecordingHud;

    fn room(name: &str, keys: Option<Vec<CellPos>>, portal: Option<CellPos>) -> LevelData {
        let mut grid = vec![vec![0u8; 7]; 7];
        for i in 0..7 {
            grid[0][i] = 1;
            grid[6][i] = 1;
            grid[i][0] = 1;
            grid[i][6] = 1;
        }
        LevelData {
            name: name.into(),
            width: 7,
            height: 7,
            start: CellPos::new(1, 1),
            grid,
            keys,
            portal,
        }
    }

    fn world_with(levels: Vec<LevelData>) -> WorldState {
        let mut cfg = GameConfig::default();
        cfg.generation.seed = Some(7);
        let mut w = WorldState::new(&cfg);
        w.levels = levels;
        w
    }

    #[test]
    fn embedded_levels_are_valid() {
        for data in embedded_levels() {
            let grid = Grid::from_level(&data).unwrap();
            let reachable = grid.reachable_from_start();
            for k in data.keys.as_ref().unwrap() {
                assert!(grid.is_floor(k.x, k.z), "{}: key {k:?} on wall", data.name);
                assert!(reachable[k.z][k.x], "{}: key {k:?} unreachable", data.name);
            }
            let p = data.portal.unwrap();
            assert!(reachable[p.z][p.x], "{}: portal unreachable", data.name);
        }
    }

    #[test]
    fn shipped_level_files_load() {
        let files = [
            include_str!("../../levels/03-courtyard.json"),
            include_str!("../../levels/04-open-hall.json"),
        ];
        let levels: Vec<LevelData> = files.iter().map(|t| serde_json::from_str(t).unwrap()).collect();
        let mut w = world_with(levels);
        let mut hud = RecordingHud::default();
        for i in 0..2 {
            load_level(&mut w, i, &mut hud).unwrap();
            assert!(!w.keys.is_empty());
            assert!(w.portal.is_some());
        }
    }

    #[test]
    fn load_resets_level_state_and_notifies_hud() {
        let mut w = world_with(embedded_levels());
        let mut hud = RecordingHud::default();
        let events = load_level(&mut w, 1, &mut hud).unwrap();

        assert_eq!(events, vec![GameEvent::LevelLoaded { index: 1 }]);
        assert_eq!(w.phase, Phase::Active);
        assert_eq!(w.current_level, 1);
        assert_eq!(w.level_name, "Maze");
        assert_eq!(w.keys.len(), 3);
        assert_eq!(w.keys_collected, 0);
        assert_eq!(w.portal.as_ref().unwrap().state(), PortalState::Inactive);
        assert_eq!(w.player.position, glam::Vec3::new(1.5, 1.6, 1.5));
        assert_eq!(w.colliders.len(), w.walls.len());
        assert_eq!(hud.levels, vec![(1, "Maze".to_string())]);
        assert_eq!(hud.keys, vec![(0, 3)]);
    }

    #[test]
    fn zero_key_level_opens_portal_on_load() {
        let mut w = world_with(vec![room("empty", Some(vec![]), Some(CellPos::new(5, 5)))]);
        let mut hud = RecordingHud::default();
        let events = load_level(&mut w, 0, &mut hud).unwrap();
        assert!(events.contains(&GameEvent::PortalActivated));
        assert!(w.portal.as_ref().unwrap().is_active());
        assert_eq!(hud.keys, vec![(0, 0)]);
    }

    #[test]
    fn level_without_room_for_portal_loads_without_one() {
        // Farthest floor cell from the start is 4 steps away
        let mut grid = vec![vec![0u8; 5]; 5];
        for i in 0..5 {
            grid[0][i] = 1;
            grid[4][i] = 1;
            grid[i][0] = 1;
            grid[i][4] = 1;
        }
        let small = LevelData {
            name: "small".into(),
            width: 5,
            height: 5,
            start: CellPos::new(1, 1),
            grid,
            keys: Some(vec![]),
            portal: None,
        };
        let mut w = world_with(vec![small]);
        let mut hud = RecordingHud::default();
        let events = load_level(&mut w, 0, &mut hud).unwrap();

        assert_eq!(events, vec![GameEvent::LevelLoaded { index: 0 }]);
        assert!(w.portal.is_none());
        assert_eq!(w.phase, Phase::Active);
        assert_eq!(w.levels[0].portal, None);
        assert_eq!(hud.levels, vec![(0, "small".to_string())]);
    }

    #[test]
    fn invalid_index_changes_nothing() {
        let mut w = world_with(embedded_levels());
        let mut hud = RecordingHud::default();
        load_level(&mut w, 0, &mut hud).unwrap();
        w.keys[0].collect();
        w.keys_collected = 1;
        let serial = w.load_serial;

        let err = load_level(&mut w, 2, &mut hud).unwrap_err();
        assert!(matches!(err, LevelError::InvalidIndex { index: 2, count: 2 }));
        assert_eq!(w.current_level, 0);
        assert_eq!(w.keys_collected, 1);
        assert!(w.keys[0].collected);
        assert_eq!(w.load_serial, serial);
        assert_eq!(hud.levels.len(), 1);
    }

    #[test]
    fn bad_level_data_changes_nothing() {
        let bad = room("bad", Some(vec![CellPos::new(0, 0)]), Some(CellPos::new(5, 5)));
        let mut w = world_with(vec![embedded_levels().remove(0), bad]);
        let mut hud = RecordingHud::default();
        load_level(&mut w, 0, &mut hud).unwrap();

        let err = load_level(&mut w, 1, &mut hud).unwrap_err();
        assert!(matches!(err, LevelError::MarkerNotOnFloor { what: "key", x: 0, z: 0 }));
        assert_eq!(w.current_level, 0);
        assert_eq!(w.level_name, "Tutorial");
    }

    #[test]
    fn previous_from_first_level_is_invalid() {
        let mut w = world_with(embedded_levels());
        let mut hud = RecordingHud::default();
        load_level(&mut w, 0, &mut hud).unwrap();
        let err = load_previous(&mut w, &mut hud).unwrap_err();
        assert!(matches!(err, LevelError::InvalidIndex { index: -1, .. }));
        assert_eq!(w.current_level, 0);
    }

    #[test]
    fn next_and_previous_walk_the_list() {
        let mut w = world_with(embedded_levels());
        let mut hud = RecordingHud::default();
        load_level(&mut w, 0, &mut hud).unwrap();
        load_next(&mut w, &mut hud).unwrap();
        assert_eq!(w.current_level, 1);
        assert!(load_next(&mut w, &mut hud).is_err());
        assert_eq!(w.current_level, 1);
        load_previous(&mut w, &mut hud).unwrap();
        assert_eq!(w.current_level, 0);
    }

    #[test]
    fn missing_markers_are_placed_and_kept() {
        let mut w = world_with(vec![room("open", None, None)]);
        w.generation.key_count = 2;
        let mut hud = RecordingHud::default();
        load_level(&mut w, 0, &mut hud).unwrap();

        assert_eq!(w.keys.len(), 2);
        let first: Vec<CellPos> = w.keys.iter().map(|k| k.cell).collect();
        let portal = w.portal.as_ref().unwrap().cell;
        assert!(!first.contains(&portal));
        assert_eq!(w.levels[0].keys.as_deref(), Some(first.as_slice()));

        // Reload gives the same layout
        load_level(&mut w, 0, &mut hud).unwrap();
        let again: Vec<CellPos> = w.keys.iter().map(|k| k.cell).collect();
        assert_eq!(again, first);
        assert_eq!(w.portal.as_ref().unwrap().cell, portal);
    }

    #[test]
    fn procedural_level_is_appended_and_loaded() {
        let mut w = world_with(embedded_levels());
        // Open room: marker placement cannot fail
        w.generation.complexity = 0.0;
        let mut hud = RecordingHud::default();
        load_level(&mut w, 0, &mut hud).unwrap();
        load_procedural(&mut w, &mut hud).unwrap();

        assert_eq!(w.levels.len(), 3);
        assert_eq!(w.current_level, 2);
        assert_eq!(w.level_name, "Procedural Level");
        assert_eq!(w.keys.len(), 3);
        assert_eq!(hud.messages.last().unwrap().0, "Generated procedural level");
    }

    #[test]
    fn procedural_failure_keeps_current_level() {
        let mut w = world_with(embedded_levels());
        w.generation.width = 2;
        let mut hud = RecordingHud::default();
        load_level(&mut w, 1, &mut hud).unwrap();

        let err = load_procedural(&mut w, &mut hud).unwrap_err();
        assert!(matches!(err, LevelError::Generation(_)));
        assert_eq!(w.levels.len(), 2);
        assert_eq!(w.current_level, 1);
        assert_eq!(w.phase, Phase::Active);
        assert_eq!(hud.messages.last().unwrap().0, "Could not generate a level");
    }

    #[test]
    fn level_file_parses_without_markers() {
        let json = r#"{"name":"File","width":3,"height":3,"start":{"x":1,"z":1},
                       "grid":[[1,1,1],[1,0,1],[1,1,1]]}"#;
        let data: LevelData = serde_json::from_str(json).unwrap();
        assert_eq!(data.keys, None);
        assert_eq!(data.portal, None);
    }

    #[test]
    fn catalog_appends_directory_levels_by_filename() {
        let dir = std::env::temp_dir().join(format!("mazegate-levels-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let write = |file: &str, name: &str| {
            let data = room(name, Some(vec![]), Some(CellPos::new(5, 5)));
            std::fs::write(dir.join(file), serde_json::to_string(&data).unwrap()).unwrap();
        };
        write("b.json", "Second");
        write("a.json", "First");
        std::fs::write(dir.join("broken.json"), "{ not json").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let names: Vec<String> = level_catalog(&dir).into_iter().map(|l| l.name).collect();
        std::fs::remove_dir_all(&dir).unwrap();
        assert_eq!(names, vec!["Tutorial", "Maze", "First", "Second"]);
    }

    #[test]
    fn missing_level_file_is_io_error() {
        let err = read_level_file(Path::new("/nonexistent/level.json")).unwrap_err();
        assert!(matches!(err, LevelFileError::Io(_)));
    }
}
