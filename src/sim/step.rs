/// The step function: advances the world by one frame of `dt` seconds.
///
/// Processing order (Active phase):
///   1. Look (only while the pointer is locked)
///   2. Movement resolution (collision::move_player)
///   3. Entity animation (keys spin/bob, portal spins/hovers)
///   4. Key pickup → portal activation when the last key is taken
///   5. Portal use → Transitioning
///
/// While Transitioning the player is frozen, animations keep running and the
/// pending transition counts down. It only fires if the world is still on the
/// level that scheduled it (see `WorldState::load_serial`).

use glam::Vec3;
use tracing::{debug, info, warn};

use crate::domain::collision;
use crate::domain::entity::Action;
use crate::sim::event::GameEvent;
use crate::sim::hud::HudSink;
use crate::sim::level;
use crate::sim::world::{PendingTransition, Phase, WorldState};

/// Input boundary queried once per frame.
pub trait InputSource {
    fn is_pressed(&self, action: Action) -> bool;
    /// Accumulated look delta since the last call; resets it.
    fn take_look_delta(&mut self) -> (f32, f32);
    fn pointer_locked(&self) -> bool;
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(
    world: &mut WorldState,
    input: &mut dyn InputSource,
    hud: &mut dyn HudSink,
    dt: f32,
) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = Vec::new();
    if world.paused || world.phase == Phase::Loading {
        return events;
    }

    match world.phase {
        Phase::Active => {
            resolve_look(world, input);
            resolve_movement(world, input, dt);
            animate(world, dt);
            resolve_key_pickup(world, hud, &mut events);
            resolve_portal(world, hud, &mut events);
        }
        Phase::Transitioning => {
            animate(world, dt);
            resolve_transition(world, hud, dt, &mut events);
        }
        Phase::Loading => {}
    }

    events
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

fn resolve_look(world: &mut WorldState, input: &mut dyn InputSource) {
    if !input.pointer_locked() {
        return;
    }
    let (dx, dy) = input.take_look_delta();
    if dx != 0.0 || dy != 0.0 {
        world.player.apply_look(dx, dy, world.movement.look_sensitivity);
    }
}

fn resolve_movement(world: &mut WorldState, input: &dyn InputSource, dt: f32) {
    let axis = |pos: Action, neg: Action| -> f32 {
        (input.is_pressed(pos) as i8 - input.is_pressed(neg) as i8) as f32
    };
    let strafe = axis(Action::StrafeRight, Action::StrafeLeft);
    let advance = axis(Action::Back, Action::Forward);

    let delta = world.player.desired_delta(strafe, advance, world.movement.speed, dt);
    if delta == Vec3::ZERO {
        return;
    }
    let next = collision::move_player(
        world.player.position,
        delta,
        world.player.half_extents,
        &world.colliders,
        world.movement.max_step,
    );
    world.player.set_position(next);
}

fn animate(world: &mut WorldState, dt: f32) {
    for key in &mut world.keys {
        key.update(dt);
    }
    if let Some(portal) = world.portal.as_mut() {
        portal.update(dt);
    }
}

// ══════════════════════════════════════════════════════════════
// Keys & portal
// ══════════════════════════════════════════════════════════════

fn resolve_key_pickup(world: &mut WorldState, hud: &mut dyn HudSink, events: &mut Vec<GameEvent>) {
    let player_box = world.player_box();
    let total = world.key_total();

    for (index, key) in world.keys.iter_mut().enumerate() {
        if key.collected || !player_box.intersects(&key.bounding_box()) {
            continue;
        }
        if !key.collect() {
            continue;
        }
        world.keys_collected += 1;
        let collected = world.keys_collected;
        debug!(index, collected, total, "key collected");
        hud.update_key_info(collected, total);
        events.push(GameEvent::KeyCollected { index, collected, total });

        if collected == total {
            events.push(GameEvent::AllKeysCollected);
            if let Some(portal) = world.portal.as_mut() {
                if portal.activate() {
                    info!("all keys collected, portal active");
                    hud.show_message("All keys collected! The portal is open.", world.timing.message_ms);
                    events.push(GameEvent::PortalActivated);
                }
            }
        }
    }
}

fn resolve_portal(world: &mut WorldState, hud: &mut dyn HudSink, events: &mut Vec<GameEvent>) {
    let player_box = world.player_box();
    let Some(portal) = world.portal.as_mut() else { return };
    if !portal.is_active() || !player_box.intersects(&portal.bounding_box()) {
        return;
    }
    if !portal.use_portal() {
        return;
    }

    let next = world.next_level_index();
    world.phase = Phase::Transitioning;
    world.transition = Some(PendingTransition {
        target: next,
        remaining_ms: world.timing.transition_delay_ms,
        scheduled_serial: world.load_serial,
    });
    info!(from = world.current_level, to = next, "portal used");
    hud.show_message("Level complete!", world.timing.transition_delay_ms);
    events.push(GameEvent::PortalUsed);
    events.push(GameEvent::TransitionScheduled { next });
}

// ══════════════════════════════════════════════════════════════
// Level transition
// ══════════════════════════════════════════════════════════════

fn resolve_transition(world: &mut WorldState, hud: &mut dyn HudSink, dt: f32, events: &mut Vec<GameEvent>) {
    let Some(pending) = world.transition.as_mut() else {
        // Transitioning with nothing scheduled: resume play
        world.phase = Phase::Active;
        return;
    };
    let dt_ms = (dt * 1000.0).round() as u32;
    pending.remaining_ms = pending.remaining_ms.saturating_sub(dt_ms);
    if pending.remaining_ms > 0 {
        return;
    }

    let pending = *pending;
    world.transition = None;
    if pending.scheduled_serial != world.load_serial {
        debug!(level = pending.target, "stale transition dropped");
        world.phase = Phase::Active;
        return;
    }

    match level::load_level(world, pending.target, hud) {
        Ok(loaded) => events.extend(loaded),
        Err(e) => {
            warn!(level = pending.target, error = %e, "level transition failed");
            hud.show_message("Could not load the next level", world.timing.message_ms);
            world.phase = Phase::Active;
        }
    }
}
