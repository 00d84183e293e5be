/// Entities: Player, Key, Portal.
/// State machines are one-way: keys only ever become collected,
/// portals only ever move Inactive → Active → Used.
///
/// Animations advance from the `dt` passed to `update`, never from a
/// wall clock, so identical frame sequences give identical poses.

use std::f32::consts::FRAC_PI_2;

use glam::{Quat, Vec3};

use super::geometry::Aabb;
use super::grid::CellPos;

// ── Player ──

/// Logical controls queried from the input boundary.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Action {
    Forward,
    Back,
    StrafeLeft,
    StrafeRight,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub half_extents: Vec3,
}

impl Player {
    pub fn new(position: Vec3, half_extents: Vec3) -> Self {
        Player { position, yaw: 0.0, pitch: 0.0, half_extents }
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_center_half_extents(self.position, self.half_extents)
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Apply a look delta in input units (pixels). Pitch is clamped to ±90°.
    pub fn apply_look(&mut self, dx: f32, dy: f32, sensitivity: f32) {
        self.yaw -= dx * sensitivity;
        self.pitch = (self.pitch - dy * sensitivity).clamp(-FRAC_PI_2, FRAC_PI_2);
    }

    /// World-space displacement for a local move intent.
    ///
    /// `strafe` is +1 right / -1 left, `advance` is -1 forward / +1 back
    /// (camera looks down -Z at yaw 0). Diagonals are normalized.
    pub fn desired_delta(&self, strafe: f32, advance: f32, speed: f32, dt: f32) -> Vec3 {
        let local = Vec3::new(strafe, 0.0, advance);
        if local == Vec3::ZERO {
            return Vec3::ZERO;
        }
        Quat::from_rotation_y(self.yaw) * local.normalize() * speed * dt
    }

    /// Unit vector the player faces on the floor plane.
    pub fn forward(&self) -> Vec3 {
        Quat::from_rotation_y(self.yaw) * Vec3::NEG_Z
    }
}

// ── Key ──

pub const KEY_SIZE: f32 = 0.3;
pub const KEY_HEIGHT: f32 = 1.0;
const KEY_SPIN: f32 = 1.0;       // rad/s
const KEY_BOB_RATE: f32 = 2.0;   // rad/s of the bob sine
const BOB_AMPLITUDE: f32 = 0.05;

#[derive(Clone, Debug)]
pub struct Key {
    pub cell: CellPos,
    pub position: Vec3,
    pub rotation: f32,
    pub collected: bool,
    base_y: f32,
    age: f32,
    bounds: Aabb,
}

impl Key {
    pub fn new(cell: CellPos) -> Self {
        let position = cell.center(KEY_HEIGHT);
        Key {
            cell,
            position,
            rotation: 0.0,
            collected: false,
            base_y: KEY_HEIGHT,
            age: 0.0,
            bounds: Aabb::from_center_size(position, Vec3::splat(KEY_SIZE)),
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bounds
    }

    /// Returns true only on the first call: the pickup happened now.
    pub fn collect(&mut self) -> bool {
        if self.collected {
            return false;
        }
        self.collected = true;
        true
    }

    /// Spin and bob. Frozen once collected.
    pub fn update(&mut self, dt: f32) {
        if self.collected {
            return;
        }
        self.age += dt;
        self.rotation += KEY_SPIN * dt;
        self.position.y = self.base_y + (self.age * KEY_BOB_RATE).sin() * BOB_AMPLITUDE;
        self.bounds = Aabb::from_center_size(self.position, Vec3::splat(KEY_SIZE));
    }
}

// ── Portal ──

pub const PORTAL_SIZE: Vec3 = Vec3::new(0.8, 1.0, 0.5);
pub const PORTAL_HEIGHT: f32 = 1.0;
const PORTAL_SPIN: f32 = 0.5;          // rad/s
const PORTAL_HOVER_RATE: f32 = 1.25;   // rad/s of the hover sine

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PortalState {
    Inactive,
    Active,
    Used,
}

#[derive(Clone, Debug)]
pub struct Portal {
    pub cell: CellPos,
    pub position: Vec3,
    pub rotation: f32,
    state: PortalState,
    base_y: f32,
    age: f32,
    bounds: Aabb,
}

impl Portal {
    pub fn new(cell: CellPos) -> Self {
        let position = cell.center(PORTAL_HEIGHT);
        Portal {
            cell,
            position,
            rotation: 0.0,
            state: PortalState::Inactive,
            base_y: PORTAL_HEIGHT,
            age: 0.0,
            bounds: Aabb::from_center_size(position, PORTAL_SIZE),
        }
    }

    pub fn state(&self) -> PortalState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != PortalState::Inactive
    }

    pub fn is_used(&self) -> bool {
        self.state == PortalState::Used
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bounds
    }

    /// Inactive → Active. Returns true if this call changed the state.
    pub fn activate(&mut self) -> bool {
        if self.state != PortalState::Inactive {
            return false;
        }
        self.state = PortalState::Active;
        true
    }

    /// Active → Used. True exactly once, and only after activation.
    pub fn use_portal(&mut self) -> bool {
        if self.state != PortalState::Active {
            return false;
        }
        self.state = PortalState::Used;
        true
    }

    /// Spin and hover. Never changes the activation state.
    pub fn update(&mut self, dt: f32) {
        self.age += dt;
        self.rotation += PORTAL_SPIN * dt;
        self.position.y = self.base_y + (self.age * PORTAL_HOVER_RATE).sin() * BOB_AMPLITUDE;
        self.bounds = Aabb::from_center_size(self.position, PORTAL_SIZE);
    }
}
