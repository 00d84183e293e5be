/// Events emitted during a simulation step or a level load.
/// The presentation layer consumes these for sound and logging.

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    LevelLoaded { index: usize },
    KeyCollected { index: usize, collected: usize, total: usize },
    AllKeysCollected,
    PortalActivated,
    PortalUsed,
    TransitionScheduled { next: usize },
}
