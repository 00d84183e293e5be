/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use sim::hud::{HudSink, HudState};
use sim::level::{level_catalog, load_level, load_next, load_previous, load_procedural};
use sim::step;
use sim::world::WorldState;
use ui::input::{Command, InputState};
use ui::renderer::Renderer;
use ui::sound::{self, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const WELCOME_MS: u32 = 5000;

fn main() {
    let config = GameConfig::load();

    if let Err(e) = init_logging(&config) {
        eprintln!("Logging disabled ({}): {e}", config.log_file.display());
    }
    for w in &config.warnings {
        warn!("{w}");
    }

    let mut world = WorldState::new(&config);
    world.levels = level_catalog(&config.levels_dir);
    info!(levels = world.levels.len(), "session starting");

    let mut hud = HudState::new();
    let start_events = match load_level(&mut world, 0, &mut hud) {
        Ok(events) => events,
        Err(e) => {
            eprintln!("Could not load the first level: {e}");
            return;
        }
    };
    hud.show_message("Game started! WASD to move, arrows to look", WELCOME_MS);

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let mut input = InputState::new(config.movement.keyboard_look_pixels);
    input.honor_release = renderer.enable_key_release();

    let sound = SoundEngine::new();
    if sound.is_none() {
        warn!("no audio output, running silent");
    }
    sound::play_events(sound.as_ref(), &start_events);

    let result = game_loop(&mut world, &mut hud, &mut input, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    info!(level = world.current_level, "session ended");
    println!();
    println!("Thanks for playing Mazegate!");
}

/// Plain-text log file; the terminal itself belongs to the renderer.
fn init_logging(config: &GameConfig) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(&config.log_file)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

fn game_loop(
    world: &mut WorldState,
    hud: &mut HudState,
    input: &mut InputState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let tick_rate = Duration::from_millis(config.timing.tick_rate_ms);
    let dt = tick_rate.as_secs_f32();
    let dt_ms = config.timing.tick_rate_ms as u32;
    let mut last_tick = Instant::now();

    loop {
        input.drain_events();

        if handle_commands(world, hud, input, sound, config) {
            break;
        }

        if last_tick.elapsed() >= tick_rate {
            input.accumulate_look();
            let events = step::step(world, input, hud, dt);
            sound::play_events(sound, &events);
            hud.tick(dt_ms);
            last_tick = Instant::now();
        }

        renderer.render(world, hud)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Apply this frame's session commands. Returns true to quit.
fn handle_commands(
    world: &mut WorldState,
    hud: &mut HudState,
    input: &mut InputState,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> bool {
    for cmd in input.commands() {
        let result = match cmd {
            Command::Quit => return true,
            Command::TogglePause => {
                world.paused = !world.paused;
                input.set_locked(!world.paused);
                debug!(paused = world.paused, "pause toggled");
                continue;
            }
            // Level switching waits until the game is resumed
            _ if world.paused => continue,
            Command::NextLevel => load_next(world, hud),
            Command::PreviousLevel => load_previous(world, hud),
            Command::ProceduralLevel => load_procedural(world, hud),
        };

        match result {
            Ok(events) => sound::play_events(sound, &events),
            Err(e) => {
                debug!(command = ?cmd, error = %e, "level switch refused");
                if matches!(cmd, Command::NextLevel | Command::PreviousLevel) {
                    hud.show_message("No level in that direction", config.timing.message_ms);
                }
            }
        }
    }
    false
}
