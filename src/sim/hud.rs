/// HUD boundary.
///
/// The session pushes fire-and-forget notifications through `HudSink`;
/// it never reads HUD state back. `HudState` is the in-process sink the
/// terminal renderer draws from.
///
/// Messages are timed in simulated milliseconds. A new message replaces
/// the current one and restarts its countdown (the old hide is cancelled).

pub trait HudSink {
    fn update_level_info(&mut self, index: usize, name: &str);
    fn update_key_info(&mut self, collected: usize, total: usize);
    fn show_message(&mut self, text: &str, duration_ms: u32);
}

#[derive(Clone, Debug, Default)]
pub struct HudState {
    pub level_line: String,
    pub key_line: String,
    pub objective: String,
    message: Option<String>,
    message_remaining_ms: u32,
}

impl HudState {
    pub fn new() -> Self {
        HudState {
            key_line: "Keys: 0/0".to_string(),
            objective: "Objective: Collect all keys to open the portal".to_string(),
            ..HudState::default()
        }
    }

    /// Current message, if one is still showing.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Advance message timers by `dt_ms` simulated milliseconds.
    pub fn tick(&mut self, dt_ms: u32) {
        if self.message.is_none() {
            return;
        }
        self.message_remaining_ms = self.message_remaining_ms.saturating_sub(dt_ms);
        if self.message_remaining_ms == 0 {
            self.message = None;
        }
    }

    fn set_objective(&mut self, text: &str) {
        self.objective = format!("Objective: {text}");
    }
}

impl HudSink for HudState {
    fn update_level_info(&mut self, index: usize, name: &str) {
        self.level_line = format!("Level {}: {}", index + 1, name);
    }

    fn update_key_info(&mut self, collected: usize, total: usize) {
        self.key_line = format!("Keys: {collected}/{total}");
        if collected == total {
            self.set_objective("Find the portal to exit the level");
        } else {
            self.set_objective(&format!("Collect all keys to open the portal ({collected}/{total})"));
        }
    }

    fn show_message(&mut self, text: &str, duration_ms: u32) {
        if duration_ms == 0 {
            self.message = None;
            return;
        }
        self.message = Some(text.to_string());
        self.message_remaining_ms = duration_ms;
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Records every notification, for session tests.
    #[derive(Default, Debug)]
    pub struct RecordingHud {
        pub levels: Vec<(usize, String)>,
        pub keys: Vec<(usize, usize)>,
        pub messages: Vec<(String, u32)>,
    }

    impl HudSink for RecordingHud {
        fn update_level_info(&mut self, index: usize, name: &str) {
            self.levels.push((index, name.to_string()));
        }
        fn update_key_info(&mut self, collected: usize, total: usize) {
            self.keys.push((collected, total));
        }
        fn show_message(&mut self, text: &str, duration_ms: u32) {
            self.messages.push((text.to_string(), duration_ms));
        }
    }

    #[test]
    fn level_line_is_one_based() {
        let mut hud = HudState::new();
        hud.update_level_info(0, "Tutorial");
        assert_eq!(hud.level_line, "Level 1: Tutorial");
    }

    #[test]
    fn objective_follows_key_count() {
        let mut hud = HudState::new();
        hud.update_key_info(1, 3);
        assert_eq!(hud.key_line, "Keys: 1/3");
        assert_eq!(hud.objective, "Objective: Collect all keys to open the portal (1/3)");
        hud.update_key_info(3, 3);
        assert_eq!(hud.objective, "Objective: Find the portal to exit the level");
    }

    #[test]
    fn zero_key_level_points_at_portal() {
        let mut hud = HudState::new();
        hud.update_key_info(0, 0);
        assert_eq!(hud.objective, "Objective: Find the portal to exit the level");
    }

    #[test]
    fn message_expires() {
        let mut hud = HudState::new();
        hud.show_message("hello", 100);
        hud.tick(60);
        assert_eq!(hud.message(), Some("hello"));
        hud.tick(40);
        assert_eq!(hud.message(), None);
    }

    #[test]
    fn new_message_cancels_pending_hide() {
        let mut hud = HudState::new();
        hud.show_message("first", 100);
        hud.tick(90);
        hud.show_message("second", 100);
        hud.tick(50);
        // The first message's hide would have fired by now
        assert_eq!(hud.message(), Some("second"));
        hud.tick(50);
        assert_eq!(hud.message(), None);
    }
}
