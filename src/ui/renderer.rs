/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// Draws the level top-down: one grid cell = two terminal columns, +Z
/// pointing down the screen. The scene comes straight from `WorldState`
/// (wall placements, key/portal poses and visibility, player pose); HUD
/// text comes from `HudState`.
///
/// How it works:
///   1. Compose the next frame into `front`
///   2. Emit terminal commands only for cells that differ from `back`
///   3. Batch everything with `queue!`, flush once, swap buffers
///
/// This eliminates flicker caused by full-screen redraws.

use std::f32::consts::{FRAC_PI_4, TAU};
use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::PortalState;
use crate::domain::grid::CellPos;
use crate::sim::hud::HudState;
use crate::sim::world::{Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    const BASE_BG: Color = Color::Rgb { r: 18, g: 18, b: 28 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Never produced by composition, so every position diffs after a reset.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Layout ──

/// Terminal columns per grid cell.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const OBJECTIVE_ROW: usize = 1;
const MAP_ROW: usize = 3;
/// Rows below the map: gap, message, gap, help.
const FOOTER_ROWS: usize = 4;

const HUD_BG: Color = Color::Rgb { r: 24, g: 30, b: 64 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 170, b: 60 };
const WALL_FG: Color = Color::Rgb { r: 110, g: 110, b: 130 };
const FLOOR_FG: Color = Color::Rgb { r: 50, g: 50, b: 64 };
const KEY_FG: Color = Color::Rgb { r: 255, g: 215, b: 0 };
const PLAYER_FG: Color = Color::Rgb { r: 120, g: 230, b: 255 };

/// Heading arrows, clockwise from "up the screen" (-Z).
const HEADINGS: [char; 8] = ['↑', '↗', '→', '↘', '↓', '↙', '←', '↖'];

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    key_release: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            key_release: false,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok(())
    }

    /// Ask the terminal to report key releases. Returns whether it agreed.
    pub fn enable_key_release(&mut self) -> bool {
        if !matches!(terminal::supports_keyboard_enhancement(), Ok(true)) {
            return false;
        }
        self.key_release = execute!(
            self.writer,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )
        .is_ok();
        self.key_release
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.key_release {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &WorldState, hud: &HudState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Phase change: repaint everything
        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            self.last_phase = Some(world.phase);
        }

        self.front.clear();
        self.compose(world, hud);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        self.back.cells.fill(Cell::INVALID);
    }

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose(&mut self, w: &WorldState, hud: &HudState) {
        let view_w = (self.term_w / CELL_W).min(w.grid.width);
        let view_h = self.term_h.saturating_sub(MAP_ROW + FOOTER_ROWS).max(1).min(w.grid.height);
        let player_cell = cell_under(w.player.position.x, w.player.position.z);
        let origin = (
            viewport_origin(player_cell.0, w.grid.width, view_w),
            viewport_origin(player_cell.1, w.grid.height, view_h),
        );

        self.compose_hud(hud);
        self.compose_map(w, origin, view_w, view_h);

        let msg_row = MAP_ROW + view_h + 1;
        if let Some(msg) = hud.message() {
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(1, msg_row, msg, Color::Black, MSG_BG);
        }

        let help = " WASD:Move  Arrows:Look  PgUp/PgDn:Level  P:Generate  F1:Pause  Esc:Quit";
        self.front.put_str(0, msg_row + 2, help, Color::DarkGrey, Cell::BASE_BG);

        if w.paused {
            self.compose_banner(view_w, view_h, "PAUSED  (F1 to resume)");
        } else if w.is_transitioning() {
            self.compose_banner(view_w, view_h, "Entering the portal...");
        }
    }

    fn compose_hud(&mut self, hud: &HudState) {
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(1, HUD_ROW, &hud.level_line, Color::White, HUD_BG);
        let keys_x = self.term_w.saturating_sub(hud.key_line.chars().count() + 2);
        self.front.put_str(keys_x, HUD_ROW, &hud.key_line, KEY_FG, HUD_BG);
        self.front.put_str(1, OBJECTIVE_ROW, &hud.objective, Color::Grey, Cell::BASE_BG);
    }

    fn compose_map(&mut self, w: &WorldState, origin: (usize, usize), view_w: usize, view_h: usize) {
        let on_screen = |c: CellPos| -> Option<(usize, usize)> {
            let (vx, vz) = (c.x.checked_sub(origin.0)?, c.z.checked_sub(origin.1)?);
            (vx < view_w && vz < view_h).then_some((vx * CELL_W, MAP_ROW + vz))
        };

        // Floor everywhere, then walls from their placements
        for vz in 0..view_h {
            for vx in 0..view_w {
                let (col, row) = (vx * CELL_W, MAP_ROW + vz);
                self.front.set(col, row, Cell::new('·', FLOOR_FG, Cell::BASE_BG));
                self.front.set(col + 1, row, Cell::new(' ', FLOOR_FG, Cell::BASE_BG));
            }
        }
        for wall in &w.walls {
            if let Some((col, row)) = on_screen(wall.cell) {
                self.front.set(col, row, Cell::new('█', WALL_FG, Cell::BASE_BG));
                self.front.set(col + 1, row, Cell::new('█', WALL_FG, Cell::BASE_BG));
            }
        }

        if let Some(portal) = &w.portal {
            if let Some((col, row)) = on_screen(portal.cell) {
                let (glyph, fg) = portal_glyph(portal.state(), portal.rotation);
                self.front.set(col, row, Cell::new(glyph, fg, Cell::BASE_BG));
            }
        }

        for key in w.remaining_keys() {
            if let Some((col, row)) = on_screen(key.cell) {
                // Alternate glyphs as the key spins
                let glyph = if (key.rotation / FRAC_PI_4) as i64 % 2 == 0 { '♦' } else { '◊' };
                self.front.set(col, row, Cell::new(glyph, KEY_FG, Cell::BASE_BG));
            }
        }

        // Player: left or right half of its cell by sub-cell x
        let (px, pz) = cell_under(w.player.position.x, w.player.position.z);
        if let Some((col, row)) = on_screen(CellPos::new(px, pz)) {
            let half = usize::from(w.player.position.x.fract() >= 0.5);
            let glyph = heading_glyph(w.player.forward().x, w.player.forward().z);
            self.front.set(col + half, row, Cell::new(glyph, PLAYER_FG, Cell::BASE_BG));
        }
    }

    fn compose_banner(&mut self, view_w: usize, view_h: usize, text: &str) {
        let width = text.chars().count() + 4;
        let x = (view_w * CELL_W).saturating_sub(width) / 2;
        let y = MAP_ROW + view_h / 2;
        let bg = Color::Rgb { r: 40, g: 40, b: 48 };
        for dx in 0..width {
            self.front.set(x + dx, y, Cell::new(' ', Color::White, bg));
        }
        self.front.put_str(x + 2, y, text, Color::Rgb { r: 255, g: 220, b: 50 }, bg);
    }
}

// ── Helpers ──

/// Grid cell containing a world (x, z); negatives clamp to 0.
fn cell_under(x: f32, z: f32) -> (usize, usize) {
    (x.max(0.0) as usize, z.max(0.0) as usize)
}

/// First visible cell along one axis, keeping `focus` centered when the
/// map is larger than the view.
fn viewport_origin(focus: usize, map_len: usize, view_len: usize) -> usize {
    if map_len <= view_len {
        return 0;
    }
    focus.saturating_sub(view_len / 2).min(map_len - view_len)
}

/// Arrow for a floor-plane direction; screen up is -Z.
fn heading_glyph(dx: f32, dz: f32) -> char {
    let angle = dx.atan2(-dz).rem_euclid(TAU);
    let sector = (angle / FRAC_PI_4).round() as usize % HEADINGS.len();
    HEADINGS[sector]
}

fn portal_glyph(state: PortalState, rotation: f32) -> (char, Color) {
    match state {
        PortalState::Inactive => ('○', Color::DarkGrey),
        PortalState::Active => {
            // Pulse between two shades as it spins
            let bright = (rotation * 4.0).sin() > 0.0;
            let fg = if bright {
                Color::Rgb { r: 230, g: 110, b: 255 }
            } else {
                Color::Rgb { r: 160, g: 70, b: 220 }
            };
            ('◉', fg)
        }
        PortalState::Used => ('◎', Color::White),
    }
}
