/// Collision & movement: axis-separated sliding against static boxes.
///
/// ## Algorithm (`move_player`)
///
///   1. Clamp the horizontal delta (x, z) to `max_step` by uniform scaling.
///      Vertical movement is never applied.
///   2. Try X alone; revert X if the trial box hits anything.
///      Then try Z from the X-resolved position; revert Z on hit.
///      Moving diagonally into a wall therefore slides along it.
///   3. If neither axis moved but the clamped delta was non-zero, probe
///      8 directions (0°, 45°, …, 315°) at `max_step / 2` and take the first
///      free one. This unsticks the player from corners.
///   4. "Hit" = closed-interval AABB overlap on all three axes.
///
/// ## Guarantees
///
///   - Never returns a position whose box overlaps a collider, unless the
///     starting position already overlapped one (not corrected here).
///   - Deterministic: fixed probe order, no randomness.

use std::f32::consts::FRAC_PI_4;

use glam::Vec3;

use super::geometry::Aabb;

/// Default per-step displacement cap (world units).
pub const MAX_STEP: f32 = 0.1;

/// Number of unstick probe directions.
pub const PROBE_DIRECTIONS: usize = 8;

// ══════════════════════════════════════════════════════════════
// Queries
// ══════════════════════════════════════════════════════════════

/// Player box centered on `pos`.
#[inline]
pub fn player_box(pos: Vec3, half_extents: Vec3) -> Aabb {
    Aabb::from_center_half_extents(pos, half_extents)
}

/// Would a player at `pos` overlap any collider?
#[inline]
pub fn blocked(pos: Vec3, half_extents: Vec3, colliders: &[Aabb]) -> bool {
    player_box(pos, half_extents).intersects_any(colliders)
}

/// Horizontal part of `delta`, scaled down to at most `max_step` long.
pub fn clamp_step(delta: Vec3, max_step: f32) -> Vec3 {
    let flat = Vec3::new(delta.x, 0.0, delta.z);
    let len_sq = flat.length_squared();
    if len_sq > max_step * max_step {
        flat * (max_step / len_sq.sqrt())
    } else {
        flat
    }
}

// ══════════════════════════════════════════════════════════════
// Movement resolution
// ══════════════════════════════════════════════════════════════

/// Resolve one movement step. See module docs for the exact order.
pub fn move_player(
    current: Vec3,
    desired_delta: Vec3,
    half_extents: Vec3,
    colliders: &[Aabb],
    max_step: f32,
) -> Vec3 {
    let step = clamp_step(desired_delta, max_step);
    let mut next = current;

    next.x += step.x;
    if blocked(next, half_extents, colliders) {
        next.x = current.x;
    }

    next.z += step.z;
    if blocked(next, half_extents, colliders) {
        next.z = current.z;
    }

    if next == current && step.length_squared() > 0.0 {
        if let Some(free) = probe_unstick(current, half_extents, colliders, max_step) {
            return free;
        }
    }

    next
}

/// First free position among the 8 probe directions, if any.
fn probe_unstick(current: Vec3, half_extents: Vec3, colliders: &[Aabb], max_step: f32) -> Option<Vec3> {
    let reach = max_step * 0.5;
    (0..PROBE_DIRECTIONS)
        .map(|i| {
            let angle = i as f32 * FRAC_PI_4;
            current + Vec3::new(angle.cos() * reach, 0.0, angle.sin() * reach)
        })
        .find(|p| !blocked(*p, half_extents, colliders))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::{CellPos, Grid, LevelData};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const HALF: Vec3 = Vec3::new(0.25, 0.9, 0.25);

    fn wall(x: usize, z: usize) -> Aabb {
        Aabb::from_center_size(CellPos::new(x, z).center(1.0), Vec3::new(1.0, 2.0, 1.0))
    }

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn free_move_is_clamped_to_max_step() {
        let start = Vec3::new(1.5, 1.6, 1.5);
        let out = move_player(start, Vec3::new(5.0, 0.0, 5.0), HALF, &[], MAX_STEP);
        let moved = out - start;
        assert!((moved.length() - MAX_STEP).abs() < 1e-6);
        // Same direction as the request
        assert!((moved.x - moved.z).abs() < 1e-6);
        assert!(moved.x > 0.0);
        assert_eq!(moved.y, 0.0);
    }

    #[test]
    fn small_move_is_not_scaled() {
        let start = Vec3::new(1.5, 1.6, 1.5);
        let out = move_player(start, Vec3::new(0.03, 0.0, -0.04), HALF, &[], MAX_STEP);
        assert!(approx(out, Vec3::new(1.53, 1.6, 1.46)));
    }

    #[test]
    fn clamp_ignores_vertical_component() {
        let c = clamp_step(Vec3::new(0.0, 9.0, 0.0), MAX_STEP);
        assert_eq!(c, Vec3::ZERO);
        let c = clamp_step(Vec3::new(3.0, 9.0, 4.0), 1.0);
        assert!(approx(c, Vec3::new(0.6, 0.0, 0.8)));
    }

    #[test]
    fn diagonal_into_wall_slides() {
        let start = Vec3::new(1.74, 1.6, 1.5);
        let out = move_player(start, Vec3::new(0.05, 0.0, 0.05), HALF, &[wall(2, 1)], MAX_STEP);
        assert!(approx(out, Vec3::new(1.74, 1.6, 1.55)));
    }

    #[test]
    fn corner_probe_unsticks() {
        let start = Vec3::new(1.74, 1.6, 1.74);
        let walls = [wall(2, 1), wall(1, 2)];
        let out = move_player(start, Vec3::new(0.1, 0.0, 0.1), HALF, &walls, MAX_STEP);
        // 0°, 45°, 90° and 135° probes hit a wall; 180° is the first free one
        assert!(approx(out, Vec3::new(1.69, 1.6, 1.74)));
        assert!(!blocked(out, HALF, &walls));
    }

    #[test]
    fn fully_boxed_in_stays_put() {
        let start = Vec3::new(1.5, 1.6, 1.5);
        // Boxes hugging the player on every side, closer than a probe
        let tight = [
            Aabb::new(Vec3::new(1.76, 0.0, 0.0), Vec3::new(3.0, 3.0, 3.0)),
            Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.24, 3.0, 3.0)),
            Aabb::new(Vec3::new(0.0, 0.0, 1.76), Vec3::new(3.0, 3.0, 3.0)),
            Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(3.0, 3.0, 1.24)),
        ];
        let out = move_player(start, Vec3::new(0.1, 0.0, 0.0), HALF, &tight, MAX_STEP);
        assert_eq!(out, start);
    }

    #[test]
    fn zero_delta_does_not_probe() {
        let start = Vec3::new(1.74, 1.6, 1.74);
        let walls = [wall(2, 1), wall(1, 2)];
        assert_eq!(move_player(start, Vec3::ZERO, HALF, &walls, MAX_STEP), start);
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let walls = [wall(2, 1), wall(1, 2), wall(0, 1)];
        let start = Vec3::new(1.7, 1.6, 1.7);
        let d = Vec3::new(0.2, 0.0, 0.3);
        let a = move_player(start, d, HALF, &walls, MAX_STEP);
        let b = move_player(start, d, HALF, &walls, MAX_STEP);
        assert_eq!(a, b);
    }

    #[test]
    fn random_walk_never_penetrates_maze_walls() {
        let rows: Vec<Vec<u8>> = vec![
            vec![1, 1, 1, 1, 1, 1, 1, 1, 1],
            vec![1, 0, 0, 1, 0, 0, 0, 0, 1],
            vec![1, 1, 0, 1, 0, 1, 1, 0, 1],
            vec![1, 0, 0, 0, 0, 1, 0, 0, 1],
            vec![1, 0, 1, 1, 0, 1, 0, 1, 1],
            vec![1, 0, 0, 1, 0, 0, 0, 0, 1],
            vec![1, 1, 0, 1, 1, 1, 0, 1, 1],
            vec![1, 0, 0, 0, 0, 0, 0, 0, 1],
            vec![1, 1, 1, 1, 1, 1, 1, 1, 1],
        ];
        let data = LevelData {
            name: "maze".into(),
            width: 9,
            height: 9,
            start: CellPos::new(1, 1),
            grid: rows,
            keys: None,
            portal: None,
        };
        let grid = Grid::from_level(&data).unwrap();
        let colliders = grid.wall_colliders();

        for seed in 0..8u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut pos = grid.start_position(1.6);
            assert!(!blocked(pos, HALF, &colliders));
            for _ in 0..3000 {
                let d = Vec3::new(rng.gen_range(-0.4..0.4), 0.0, rng.gen_range(-0.4..0.4));
                let next = move_player(pos, d, HALF, &colliders, MAX_STEP);
                assert!(!blocked(next, HALF, &colliders), "penetrated at {next:?} from {pos:?}");
                assert!((next - pos).length() <= MAX_STEP + 1e-5);
                pos = next;
            }
        }
    }

    #[test]
    fn starting_inside_wall_is_not_teleported() {
        let start = Vec3::new(2.5, 1.6, 1.5);
        let out = move_player(start, Vec3::new(0.1, 0.0, 0.0), HALF, &[wall(2, 1)], MAX_STEP);
        assert!((out - start).length() <= MAX_STEP + 1e-6);
    }
}
