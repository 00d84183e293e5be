/// Procedural level generation and marker placement.
///
/// ## Grid fill
///   - Border cells are always walls.
///   - Interior cells are walls with probability `complexity`.
///   - The start cell (1, 1) is forced to floor.
///
/// ## Marker placement (rejection sampling)
///   - Keys: floor cells at Manhattan distance >= 3 from start.
///   - Portal: a floor cell at Manhattan distance >= 5 from start,
///     distinct from every key.
///   - Candidates must also be reachable from start (4-connected),
///     so every placed marker can actually be walked to.
///
/// Sampling gives up after `max_attempts` draws per marker.
///
/// ## Recovery
///
/// A dense fill often seals the start into a small pocket. The generator
/// then refills the grid, up to `MAX_FILLS` times. If every fill fails, the
/// markers are chosen on an open grid of the same size and corridors are
/// carved from the start to each of them. Only sizes where no marker layout
/// exists at all end in `LevelGenerationError`.

use rand::Rng;

use super::cell::Cell;
use super::grid::{CellPos, Grid, LevelData};

pub const START: CellPos = CellPos::new(1, 1);
pub const KEY_MIN_DISTANCE: usize = 3;
pub const PORTAL_MIN_DISTANCE: usize = 5;
pub const MIN_SIZE: usize = 3;

/// Random fills tried before falling back to carved corridors.
pub const MAX_FILLS: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LevelGenerationError {
    #[error("grid {width}x{height} is too small (minimum 3x3)")]
    TooSmall { width: usize, height: usize },

    #[error("no valid cell for key {index} after {attempts} attempts")]
    NoKeyCell { index: usize, attempts: u32 },

    #[error("no valid portal cell after {attempts} attempts")]
    NoPortalCell { attempts: u32 },
}

/// Parameters for `generate_procedural`.
#[derive(Clone, Debug)]
pub struct GenParams {
    pub width: usize,
    pub height: usize,
    pub complexity: f32,
    pub key_count: usize,
    pub max_attempts: u32,
}

impl Default for GenParams {
    fn default() -> Self {
        GenParams { width: 15, height: 15, complexity: 0.3, key_count: 3, max_attempts: 1000 }
    }
}

/// Key and portal cells chosen for a grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Markers {
    pub keys: Vec<CellPos>,
    pub portal: CellPos,
}

// ══════════════════════════════════════════════════════════════
// Generation
// ══════════════════════════════════════════════════════════════

/// Build a random level with keys and a portal.
pub fn generate_procedural<R: Rng + ?Sized>(
    params: &GenParams,
    rng: &mut R,
) -> Result<LevelData, LevelGenerationError> {
    let (w, h) = (params.width, params.height);
    if w < MIN_SIZE || h < MIN_SIZE {
        return Err(LevelGenerationError::TooSmall { width: w, height: h });
    }

    // NaN or out-of-range complexity would make gen_bool panic
    let p = if params.complexity.is_nan() { 0.0 } else { params.complexity.clamp(0.0, 1.0) as f64 };

    for _ in 0..MAX_FILLS {
        let grid = random_fill(w, h, p, rng);
        if let Ok(markers) = place_markers(&grid, params.key_count, params.max_attempts, rng) {
            return Ok(level_data(&grid, markers));
        }
    }

    // Choose the layout on an open grid, then connect it to the start
    let open = random_fill(w, h, 0.0, rng);
    let markers = place_markers(&open, params.key_count, params.max_attempts, rng)?;
    let mut grid = random_fill(w, h, p, rng);
    for target in markers.keys.iter().chain(std::iter::once(&markers.portal)) {
        carve_corridor(&mut grid, *target, rng);
    }
    Ok(level_data(&grid, markers))
}

fn random_fill<R: Rng + ?Sized>(w: usize, h: usize, p: f64, rng: &mut R) -> Grid {
    let mut cells = vec![vec![Cell::Wall; w]; h];
    for (z, row) in cells.iter_mut().enumerate() {
        for (x, cell) in row.iter_mut().enumerate() {
            let border = x == 0 || z == 0 || x == w - 1 || z == h - 1;
            if !border && !rng.gen_bool(p) {
                *cell = Cell::Floor;
            }
        }
    }
    cells[START.z][START.x] = Cell::Floor;
    Grid { width: w, height: h, cells, start: START }
}

/// Open an L-shaped floor path from the start to `target`.
/// Both ends are interior cells, so the border is never touched.
fn carve_corridor<R: Rng + ?Sized>(grid: &mut Grid, target: CellPos, rng: &mut R) {
    let start = grid.start;
    let corner = if rng.gen_bool(0.5) {
        CellPos::new(target.x, start.z)
    } else {
        CellPos::new(start.x, target.z)
    };
    for (a, b) in [(start, corner), (corner, target)] {
        for x in a.x.min(b.x)..=a.x.max(b.x) {
            for z in a.z.min(b.z)..=a.z.max(b.z) {
                grid.cells[z][x] = Cell::Floor;
            }
        }
    }
}

fn level_data(grid: &Grid, markers: Markers) -> LevelData {
    LevelData {
        name: "Procedural Level".to_string(),
        width: grid.width,
        height: grid.height,
        start: grid.start,
        grid: grid.to_rows(),
        keys: Some(markers.keys),
        portal: Some(markers.portal),
    }
}

// ══════════════════════════════════════════════════════════════
// Marker placement
// ══════════════════════════════════════════════════════════════

/// Place `key_count` keys and one portal on an existing grid.
pub fn place_markers<R: Rng + ?Sized>(
    grid: &Grid,
    key_count: usize,
    max_attempts: u32,
    rng: &mut R,
) -> Result<Markers, LevelGenerationError> {
    let reachable = grid.reachable_from_start();
    let keys = place_keys_with(grid, &reachable, key_count, max_attempts, rng)?;
    let portal = place_portal_with(grid, &reachable, &keys, max_attempts, rng)?;
    Ok(Markers { keys, portal })
}

/// Place only keys.
pub fn place_keys<R: Rng + ?Sized>(
    grid: &Grid,
    key_count: usize,
    max_attempts: u32,
    rng: &mut R,
) -> Result<Vec<CellPos>, LevelGenerationError> {
    let reachable = grid.reachable_from_start();
    place_keys_with(grid, &reachable, key_count, max_attempts, rng)
}

/// Place only a portal, avoiding the given key cells.
pub fn place_portal<R: Rng + ?Sized>(
    grid: &Grid,
    keys: &[CellPos],
    max_attempts: u32,
    rng: &mut R,
) -> Result<CellPos, LevelGenerationError> {
    let reachable = grid.reachable_from_start();
    place_portal_with(grid, &reachable, keys, max_attempts, rng)
}

fn place_keys_with<R: Rng + ?Sized>(
    grid: &Grid,
    reachable: &[Vec<bool>],
    key_count: usize,
    max_attempts: u32,
    rng: &mut R,
) -> Result<Vec<CellPos>, LevelGenerationError> {
    let mut keys: Vec<CellPos> = Vec::with_capacity(key_count);
    for index in 0..key_count {
        let cell = sample_cell(grid, reachable, KEY_MIN_DISTANCE, &keys, max_attempts, rng)
            .ok_or(LevelGenerationError::NoKeyCell { index, attempts: max_attempts })?;
        keys.push(cell);
    }
    Ok(keys)
}

fn place_portal_with<R: Rng + ?Sized>(
    grid: &Grid,
    reachable: &[Vec<bool>],
    keys: &[CellPos],
    max_attempts: u32,
    rng: &mut R,
) -> Result<CellPos, LevelGenerationError> {
    sample_cell(grid, reachable, PORTAL_MIN_DISTANCE, keys, max_attempts, rng)
        .ok_or(LevelGenerationError::NoPortalCell { attempts: max_attempts })
}

/// Draw random cells until one satisfies every placement rule.
fn sample_cell<R: Rng + ?Sized>(
    grid: &Grid,
    reachable: &[Vec<bool>],
    min_distance: usize,
    taken: &[CellPos],
    max_attempts: u32,
    rng: &mut R,
) -> Option<CellPos> {
    if grid.width == 0 || grid.height == 0 {
        return None;
    }
    for _ in 0..max_attempts {
        let c = CellPos::new(rng.gen_range(0..grid.width), rng.gen_range(0..grid.height));
        if grid.is_floor(c.x, c.z)
            && reachable[c.z][c.x]
            && c.manhattan(grid.start) >= min_distance
            && !taken.contains(&c)
        {
            return Some(c);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params(w: usize, h: usize, complexity: f32) -> GenParams {
        GenParams { width: w, height: h, complexity, ..GenParams::default() }
    }

    fn assert_valid(level: &LevelData, key_count: usize) {
        let grid = Grid::from_level(level).expect("generated level must validate");
        assert!(grid.is_floor(START.x, START.z));
        for x in 0..grid.width {
            assert!(!grid.is_floor(x, 0));
            assert!(!grid.is_floor(x, grid.height - 1));
        }
        for z in 0..grid.height {
            assert!(!grid.is_floor(0, z));
            assert!(!grid.is_floor(grid.width - 1, z));
        }

        let reachable = grid.reachable_from_start();
        let keys = level.keys.as_ref().unwrap();
        let portal = level.portal.unwrap();
        assert_eq!(keys.len(), key_count);
        for (i, k) in keys.iter().enumerate() {
            assert!(grid.is_floor(k.x, k.z));
            assert!(reachable[k.z][k.x], "key {k:?} cannot be reached");
            assert_ne!(*k, START);
            assert!(k.manhattan(START) >= KEY_MIN_DISTANCE);
            assert!(!keys[i + 1..].contains(k), "duplicate key cell {k:?}");
        }
        assert!(grid.is_floor(portal.x, portal.z));
        assert!(reachable[portal.z][portal.x], "portal cannot be reached");
        assert!(portal.manhattan(START) >= PORTAL_MIN_DISTANCE);
        assert!(!keys.contains(&portal));
    }

    #[test]
    fn open_room_always_generates() {
        let mut rng = StdRng::seed_from_u64(7);
        let level = generate_procedural(&params(15, 15, 0.0), &mut rng).unwrap();
        assert_valid(&level, 3);
        // Interior of an open room is all floor
        assert!(level.grid[1..14].iter().all(|row| row[1..14].iter().all(|&c| c == 0)));
    }

    #[test]
    fn generated_levels_are_valid_across_seeds_and_complexities() {
        for seed in 0..40u64 {
            for &complexity in &[0.0f32, 0.2, 0.3, 0.4, 0.6, 0.8] {
                for &(w, h) in &[(7usize, 9usize), (15, 15)] {
                    let mut rng = StdRng::seed_from_u64(seed);
                    match generate_procedural(&params(w, h, complexity), &mut rng) {
                        Ok(level) => assert_valid(&level, 3),
                        Err(e) => panic!("{w}x{h} at {complexity} (seed {seed}) failed: {e}"),
                    }
                }
            }
        }
    }

    #[test]
    fn five_by_five_only_fails_on_the_portal() {
        for seed in 0..10u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            // Exactly three cells qualify for keys; the portal never fits
            let p = params(5, 5, 0.3);
            assert_eq!(
                generate_procedural(&p, &mut rng).unwrap_err(),
                LevelGenerationError::NoPortalCell { attempts: 1000 }
            );
        }
    }

    #[test]
    fn solid_fill_is_carved_open() {
        let mut rng = StdRng::seed_from_u64(1);
        let level = generate_procedural(&params(9, 9, 1.0), &mut rng).unwrap();
        assert_valid(&level, 3);
    }

    #[test]
    fn grid_without_room_for_keys_fails() {
        // A 3x3 grid has a single interior cell: the start
        let mut rng = StdRng::seed_from_u64(1);
        let mut p = params(3, 3, 0.0);
        p.max_attempts = 50;
        let err = generate_procedural(&p, &mut rng).unwrap_err();
        assert_eq!(err, LevelGenerationError::NoKeyCell { index: 0, attempts: 50 });
    }

    #[test]
    fn five_by_five_cannot_host_portal() {
        // Farthest interior cell from (1,1) is (3,3): distance 4 < 5
        let mut rng = StdRng::seed_from_u64(3);
        let mut p = params(5, 5, 0.0);
        p.key_count = 0;
        p.max_attempts = 200;
        assert_eq!(
            generate_procedural(&p, &mut rng).unwrap_err(),
            LevelGenerationError::NoPortalCell { attempts: 200 }
        );
    }

    #[test]
    fn too_small_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            generate_procedural(&params(2, 9, 0.0), &mut rng).unwrap_err(),
            LevelGenerationError::TooSmall { width: 2, height: 9 }
        );
    }

    #[test]
    fn zero_keys_still_places_portal() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut p = params(11, 11, 0.1);
        p.key_count = 0;
        let level = generate_procedural(&p, &mut rng).unwrap();
        assert!(level.keys.as_ref().unwrap().is_empty());
        assert!(level.portal.is_some());
    }

    #[test]
    fn same_seed_same_level() {
        let p = params(13, 13, 0.35);
        let a = generate_procedural(&p, &mut StdRng::seed_from_u64(99));
        let b = generate_procedural(&p, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn carved_corridor_connects_target() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut grid = random_fill(9, 9, 1.0, &mut rng);
        let target = CellPos::new(6, 5);
        carve_corridor(&mut grid, target, &mut rng);
        assert!(grid.reachable_from_start()[target.z][target.x]);
        // Border untouched
        assert!(grid.cells[0].iter().all(|c| c.is_solid()));
        assert!(grid.cells[8].iter().all(|c| c.is_solid()));
    }

    #[test]
    fn markers_only_in_reachable_cells() {
        // Right half is sealed off from the start
        let rows: Vec<Vec<u8>> = vec![
            vec![1, 1, 1, 1, 1, 1, 1, 1, 1],
            vec![1, 0, 0, 0, 1, 0, 0, 0, 1],
            vec![1, 0, 0, 0, 1, 0, 0, 0, 1],
            vec![1, 0, 0, 0, 1, 0, 0, 0, 1],
            vec![1, 0, 0, 0, 1, 0, 0, 0, 1],
            vec![1, 0, 0, 0, 1, 0, 0, 0, 1],
            vec![1, 1, 1, 1, 1, 1, 1, 1, 1],
        ];
        let data = LevelData {
            name: "split".into(),
            width: 9,
            height: 7,
            start: START,
            grid: rows,
            keys: None,
            portal: None,
        };
        let grid = Grid::from_level(&data).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let markers = place_markers(&grid, 2, 1000, &mut rng).unwrap();
        for k in &markers.keys {
            assert!(k.x < 4);
        }
        assert!(markers.portal.x < 4);
    }
}
