pub mod event;
pub mod hud;
pub mod level;
pub mod step;
pub mod world;
