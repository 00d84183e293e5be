/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
///
/// Problems found while loading are collected in `warnings` and logged by
/// `main` once the log subscriber is up.

use glam::Vec3;
use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::generate::GenParams;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub movement: MovementConfig,
    pub timing: TimingConfig,
    pub generation: GenerationConfig,
    pub levels_dir: PathBuf,
    pub log_file: PathBuf,
    pub log_level: String,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct MovementConfig {
    pub speed: f32,                // world units per second
    pub max_step: f32,             // per-frame displacement cap
    pub look_sensitivity: f32,     // radians per look pixel
    pub keyboard_look_pixels: f32, // look pixels per frame while an arrow key is held
    pub eye_height: f32,
    pub player_width: f32,
    pub player_height: f32,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub tick_rate_ms: u64,
    pub transition_delay_ms: u32,
    pub message_ms: u32,
}

#[derive(Clone, Debug)]
pub struct GenerationConfig {
    pub width: usize,
    pub height: usize,
    pub complexity: f32,
    pub key_count: usize,
    pub max_attempts: u32,
    pub seed: Option<u64>,
}

impl MovementConfig {
    /// Half extents of the player's collision box.
    pub fn half_extents(&self) -> Vec3 {
        Vec3::new(self.player_width, self.player_height, self.player_width) * 0.5
    }
}

impl GenerationConfig {
    pub fn params(&self) -> GenParams {
        GenParams {
            width: self.width,
            height: self.height,
            complexity: self.complexity,
            key_count: self.key_count,
            max_attempts: self.max_attempts,
        }
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    movement: TomlMovement,
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    generation: TomlGeneration,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlMovement {
    #[serde(default = "default_speed")]
    speed: f32,
    #[serde(default = "default_max_step")]
    max_step: f32,
    #[serde(default = "default_look_sensitivity")]
    look_sensitivity: f32,
    #[serde(default = "default_keyboard_look")]
    keyboard_look_pixels: f32,
    #[serde(default = "default_eye_height")]
    eye_height: f32,
    #[serde(default = "default_player_width")]
    player_width: f32,
    #[serde(default = "default_player_height")]
    player_height: f32,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_transition_delay")]
    transition_delay_ms: u32,
    #[serde(default = "default_message_ms")]
    message_ms: u32,
}

#[derive(Deserialize, Debug)]
struct TomlGeneration {
    #[serde(default = "default_gen_size")]
    width: usize,
    #[serde(default = "default_gen_size")]
    height: usize,
    #[serde(default = "default_complexity")]
    complexity: f32,
    #[serde(default = "default_key_count")]
    key_count: usize,
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

// ── Defaults ──

fn default_speed() -> f32 { 4.0 }
fn default_max_step() -> f32 { 0.1 }
fn default_look_sensitivity() -> f32 { 0.002 }
fn default_keyboard_look() -> f32 { 12.0 }   // ≈1.4°/frame at default sensitivity
fn default_eye_height() -> f32 { 1.6 }
fn default_player_width() -> f32 { 0.5 }
fn default_player_height() -> f32 { 1.8 }

fn default_tick_rate() -> u64 { 16 }
fn default_transition_delay() -> u32 { 1500 }
fn default_message_ms() -> u32 { 3000 }

fn default_gen_size() -> usize { 15 }
fn default_complexity() -> f32 { 0.3 }
fn default_key_count() -> usize { 3 }
fn default_max_attempts() -> u32 { 1000 }

fn default_levels_dir() -> String { "levels".into() }
fn default_log_file() -> String { "mazegate.log".into() }
fn default_log_level() -> String { "info".into() }

impl Default for TomlMovement {
    fn default() -> Self {
        TomlMovement {
            speed: default_speed(),
            max_step: default_max_step(),
            look_sensitivity: default_look_sensitivity(),
            keyboard_look_pixels: default_keyboard_look(),
            eye_height: default_eye_height(),
            player_width: default_player_width(),
            player_height: default_player_height(),
        }
    }
}

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            tick_rate_ms: default_tick_rate(),
            transition_delay_ms: default_transition_delay(),
            message_ms: default_message_ms(),
        }
    }
}

impl Default for TomlGeneration {
    fn default() -> Self {
        TomlGeneration {
            width: default_gen_size(),
            height: default_gen_size(),
            complexity: default_complexity(),
            key_count: default_key_count(),
            max_attempts: default_max_attempts(),
            seed: None,
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            log_file: default_log_file(),
            log_level: default_log_level(),
        }
    }
}

// ── Loading ──

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), PathBuf::from(default_levels_dir()), vec![])
    }
}

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let mut warnings = vec![];

        let toml_cfg = load_toml(&search_dirs, &mut warnings);

        // Resolve levels directory
        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if PathBuf::from(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        GameConfig::from_toml(toml_cfg, levels_dir, warnings)
    }

    /// Parse a config from TOML text (no filesystem lookups).
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let cfg = toml::from_str::<TomlConfig>(text)?;
        let levels_dir = PathBuf::from(&cfg.general.levels_dir);
        Ok(GameConfig::from_toml(cfg, levels_dir, vec![]))
    }

    fn from_toml(cfg: TomlConfig, levels_dir: PathBuf, mut warnings: Vec<String>) -> Self {
        let mut movement = MovementConfig {
            speed: cfg.movement.speed,
            max_step: cfg.movement.max_step,
            look_sensitivity: cfg.movement.look_sensitivity,
            keyboard_look_pixels: cfg.movement.keyboard_look_pixels,
            eye_height: cfg.movement.eye_height,
            player_width: cfg.movement.player_width,
            player_height: cfg.movement.player_height,
        };
        if !(movement.max_step > 0.0) {
            warnings.push(format!("movement.max_step must be positive (got {}), using default", movement.max_step));
            movement.max_step = default_max_step();
        }

        let mut generation = GenerationConfig {
            width: cfg.generation.width,
            height: cfg.generation.height,
            complexity: cfg.generation.complexity,
            key_count: cfg.generation.key_count,
            max_attempts: cfg.generation.max_attempts,
            seed: cfg.generation.seed,
        };
        if !(0.0..=1.0).contains(&generation.complexity) {
            warnings.push(format!("generation.complexity {} outside [0, 1], clamping", generation.complexity));
            generation.complexity = if generation.complexity.is_nan() {
                default_complexity()
            } else {
                generation.complexity.clamp(0.0, 1.0)
            };
        }

        GameConfig {
            movement,
            timing: TimingConfig {
                tick_rate_ms: cfg.timing.tick_rate_ms.max(1),
                transition_delay_ms: cfg.timing.transition_delay_ms,
                message_ms: cfg.timing.message_ms,
            },
            generation,
            levels_dir,
            log_file: PathBuf::from(cfg.general.log_file),
            log_level: cfg.general.log_level,
            warnings,
        }
    }
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
pub fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/mazegate)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/mazegate");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory (/usr/share/mazegate)
    let sys = PathBuf::from("/usr/share/mazegate");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        warnings.push(format!("config.toml parse error: {e}; using default settings"));
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warnings.push(format!("could not read {}: {e}", path.display()));
                }
            }
        }
    }
    TomlConfig::default()
}
