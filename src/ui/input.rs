/// Terminal input: crossterm key events → `InputSource`.
///
/// Tracks which keys are currently held down:
///   - WASD held → continuous movement
///   - Arrow keys held → look delta, `keyboard_look_pixels` per frame
///   - PgUp / PgDn / P / F1 / Esc → one-shot session commands
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.
///
/// The terminal has no pointer to lock; "locked" means the game is not
/// paused, so looking is ignored while paused.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::Action;
use crate::sim::step::InputSource;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// Session-level requests, handled by the main loop rather than `step`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    NextLevel,
    PreviousLevel,
    ProceduralLevel,
    TogglePause,
    Quit,
}

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from released to held during the last drain.
    fresh_presses: Vec<KeyCode>,
    raw_events: Vec<KeyEvent>,
    look: (f32, f32),
    look_step: f32,
    locked: bool,
    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new(look_step: f32) -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            look: (0.0, 0.0),
            look_step,
            locked: true,
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call once per frame, before `step`.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record_key(key, Instant::now());
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    /// Commands pressed this frame, in a fixed order.
    pub fn commands(&self) -> Vec<Command> {
        let mut out = vec![];
        if self.ctrl_c_pressed() || self.any_pressed(&[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')]) {
            out.push(Command::Quit);
        }
        if self.was_pressed(KeyCode::F(1)) {
            out.push(Command::TogglePause);
        }
        if self.was_pressed(KeyCode::PageUp) {
            out.push(Command::NextLevel);
        }
        if self.was_pressed(KeyCode::PageDown) {
            out.push(Command::PreviousLevel);
        }
        if self.any_pressed(&[KeyCode::Char('p'), KeyCode::Char('P')]) {
            out.push(Command::ProceduralLevel);
        }
        out
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
        if !locked {
            self.look = (0.0, 0.0);
        }
    }

    /// Add one frame's worth of arrow-key look. Call once per simulation tick.
    pub fn accumulate_look(&mut self) {
        if !self.locked {
            return;
        }
        let axis = |s: &Self, neg: KeyCode, pos: KeyCode| -> f32 {
            (s.is_held(pos) as i8 - s.is_held(neg) as i8) as f32
        };
        self.look.0 += axis(self, KeyCode::Left, KeyCode::Right) * self.look_step;
        self.look.1 += axis(self, KeyCode::Up, KeyCode::Down) * self.look_step;
    }

    // ── Internal ──

    fn record_key(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            // Without enhancement, rely on the timeout instead
            KeyEventKind::Release => {}
            _ => {
                if !self.is_held(key.code) {
                    self.fresh_presses.push(key.code);
                }
                self.last_active.insert(key.code, now);
            }
        }
    }

    fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
        })
    }
}

fn bindings(action: Action) -> &'static [KeyCode] {
    match action {
        Action::Forward => &[KeyCode::Char('w'), KeyCode::Char('W')],
        Action::Back => &[KeyCode::Char('s'), KeyCode::Char('S')],
        Action::StrafeLeft => &[KeyCode::Char('a'), KeyCode::Char('A')],
        Action::StrafeRight => &[KeyCode::Char('d'), KeyCode::Char('D')],
    }
}

impl InputSource for InputState {
    fn is_pressed(&self, action: Action) -> bool {
        self.any_held(bindings(action))
    }

    fn take_look_delta(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.look)
    }

    fn pointer_locked(&self) -> bool {
        self.locked
    }
}
