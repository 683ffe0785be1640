//! Viewer controls: orbit camera, time of day, light distance, pause.

use corelib::camera::OrbitController;
use winit::keyboard::{Key, NamedKey};

/// Seconds for `time_of_day` to wrap once while unpaused.
pub const DAY_LENGTH_SECS: f32 = 60.0;
/// One key press moves the clock by half an hour.
pub const TIME_STEP: f32 = 1.0 / 48.0;
pub const LIGHT_STEP: f32 = 1.0;
pub const MIN_LIGHT_DISTANCE: f32 = 2.0;
pub const MAX_LIGHT_DISTANCE: f32 = 40.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    TimeBackward,
    TimeForward,
    LightCloser,
    LightFarther,
    TogglePause,
}

impl Command {
    pub fn from_key(key: Key<&str>) -> Option<Self> {
        match key {
            Key::Character("[") => Some(Command::TimeBackward),
            Key::Character("]") => Some(Command::TimeForward),
            Key::Character("-") => Some(Command::LightCloser),
            Key::Character("=") | Key::Character("+") => Some(Command::LightFarther),
            Key::Named(NamedKey::Space) => Some(Command::TogglePause),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SceneControls {
    pub orbit: OrbitController,
    /// Fraction of a day in [0, 1).
    pub time_of_day: f32,
    pub light_distance: f32,
    pub paused: bool,
    dragging: bool,
    last_cursor: Option<(f64, f64)>,
}

impl Default for SceneControls {
    fn default() -> Self {
        Self {
            orbit: OrbitController::default(),
            time_of_day: 0.35,
            light_distance: 10.0,
            paused: false,
            dragging: false,
            last_cursor: None,
        }
    }
}

impl SceneControls {
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::TimeBackward => self.shift_time(-TIME_STEP),
            Command::TimeForward => self.shift_time(TIME_STEP),
            Command::LightCloser => self.shift_light(-LIGHT_STEP),
            Command::LightFarther => self.shift_light(LIGHT_STEP),
            Command::TogglePause => {
                self.paused = !self.paused;
                log::info!("animation {}", if self.paused { "paused" } else { "resumed" });
            }
        }
    }

    fn shift_time(&mut self, delta: f32) {
        self.time_of_day = (self.time_of_day + delta).rem_euclid(1.0);
        log::debug!("time of day {:.3}", self.time_of_day);
    }

    fn shift_light(&mut self, delta: f32) {
        self.light_distance =
            (self.light_distance + delta).clamp(MIN_LIGHT_DISTANCE, MAX_LIGHT_DISTANCE);
        log::debug!("light distance {:.1}", self.light_distance);
    }

    pub fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
    }

    /// Feed the latest cursor position; rotates the orbit while dragging.
    pub fn cursor_moved(&mut self, x: f64, y: f64) {
        if let (true, Some((px, py))) = (self.dragging, self.last_cursor) {
            self.orbit.drag((x - px) as f32, (y - py) as f32);
        }
        self.last_cursor = Some((x, y));
    }

    pub fn scroll(&mut self, lines: f32) {
        self.orbit.zoom(lines);
    }

    /// Advance the clock by `dt` seconds unless paused.
    pub fn advance(&mut self, dt: f32) {
        if !self.paused {
            self.time_of_day = (self.time_of_day + dt / DAY_LENGTH_SECS).rem_euclid(1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_commands() {
        assert_eq!(Command::from_key(Key::Character("[")), Some(Command::TimeBackward));
        assert_eq!(Command::from_key(Key::Character("=")), Some(Command::LightFarther));
        assert_eq!(
            Command::from_key(Key::Named(NamedKey::Space)),
            Some(Command::TogglePause)
        );
        assert_eq!(Command::from_key(Key::Character("q")), None);
    }

    #[test]
    fn time_wraps_around_midnight() {
        let mut c = SceneControls {
            time_of_day: 0.0,
            ..Default::default()
        };
        c.apply(Command::TimeBackward);
        assert!((c.time_of_day - (1.0 - TIME_STEP)).abs() < 1e-6);
        c.apply(Command::TimeForward);
        c.apply(Command::TimeForward);
        assert!((c.time_of_day - TIME_STEP).abs() < 1e-6);
    }

    #[test]
    fn light_distance_is_clamped() {
        let mut c = SceneControls::default();
        for _ in 0..100 {
            c.apply(Command::LightCloser);
        }
        assert_eq!(c.light_distance, MIN_LIGHT_DISTANCE);
        for _ in 0..100 {
            c.apply(Command::LightFarther);
        }
        assert_eq!(c.light_distance, MAX_LIGHT_DISTANCE);
    }

    #[test]
    fn drag_only_rotates_while_button_held() {
        let mut c = SceneControls::default();
        c.cursor_moved(100.0, 100.0);
        c.cursor_moved(150.0, 100.0);
        assert_eq!(c.orbit.yaw_deg, 30.0);

        c.set_dragging(true);
        c.cursor_moved(160.0, 105.0);
        assert!((c.orbit.yaw_deg - 32.0).abs() < 1e-4);
        assert!((c.orbit.pitch_deg - 16.0).abs() < 1e-4);
    }

    #[test]
    fn pause_freezes_the_clock() {
        let mut c = SceneControls::default();
        let start = c.time_of_day;
        c.apply(Command::TogglePause);
        c.advance(10.0);
        assert_eq!(c.time_of_day, start);
        c.apply(Command::TogglePause);
        c.advance(DAY_LENGTH_SECS / 10.0);
        assert!((c.time_of_day - (start + 0.1)).abs() < 1e-5);
    }
}
