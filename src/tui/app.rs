//! TUI application state

use crate::driver::LiveFrame;
use crate::keyboard::EvdevKeyboard;
use crate::profile::{ProfileError, ProfileStore};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use wheelmode_engine::curve::curve_points;
use wheelmode_engine::settings::{
    CAP_RANGE, LINEARITY_RANGE, MAX_LOCK_RANGE, SENSITIVITY_RANGE,
};
use wheelmode_engine::{normalize_key_name, KeyState, PressedKeys, Settings, MAX_ACTION_KEYS};

/// Points in the plotted curve
const CURVE_RESOLUTION: usize = 101;
/// Upper bound offered by the UI for the float multipliers
const MULTIPLIER_MAX: f64 = 10.0;

/// Current tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    /// Axis position and response curve
    Live,
    /// Tunables and bindings
    Settings,
    /// Action key list
    ActionKeys,
}

/// Rows of the settings tab, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Linearity,
    Sensitivity,
    ReleaseSensitivity,
    SensitivityWhenPaused,
    CountersteerMultiplier,
    SnapMultiplier,
    PermanentMaxLock,
    SnapToCenter,
    SteerLeft,
    SteerRight,
    FullsteerLeft,
    FullsteerRight,
    PauseSteeringReset,
}

impl Field {
    pub const ALL: &'static [Field] = &[
        Field::Linearity,
        Field::Sensitivity,
        Field::ReleaseSensitivity,
        Field::SensitivityWhenPaused,
        Field::CountersteerMultiplier,
        Field::SnapMultiplier,
        Field::PermanentMaxLock,
        Field::SnapToCenter,
        Field::SteerLeft,
        Field::SteerRight,
        Field::FullsteerLeft,
        Field::FullsteerRight,
        Field::PauseSteeringReset,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Field::Linearity => "Linearity",
            Field::Sensitivity => "Sensitivity",
            Field::ReleaseSensitivity => "Sensitivity on release",
            Field::SensitivityWhenPaused => "Sensitivity when paused",
            Field::CountersteerMultiplier => "Countersteer multiplier",
            Field::SnapMultiplier => "Snap to action key multiplier",
            Field::PermanentMaxLock => "Permanent max lock (%)",
            Field::SnapToCenter => "Snap to center on fullsteer release",
            Field::SteerLeft => "Steer left",
            Field::SteerRight => "Steer right",
            Field::FullsteerLeft => "Fullsteer left",
            Field::FullsteerRight => "Fullsteer right",
            Field::PauseSteeringReset => "Pause steering reset",
        }
    }

    pub fn is_binding(&self) -> bool {
        matches!(
            self,
            Field::SteerLeft
                | Field::SteerRight
                | Field::FullsteerLeft
                | Field::FullsteerRight
                | Field::PauseSteeringReset
        )
    }

    /// Display value of this field in `settings`
    pub fn value(&self, settings: &Settings) -> String {
        let binding = |b: &str| {
            if normalize_key_name(b).is_some() {
                b.to_string()
            } else {
                "Not Set".to_string()
            }
        };
        match self {
            Field::Linearity => settings.linearity.to_string(),
            Field::Sensitivity => settings.sensitivity.to_string(),
            Field::ReleaseSensitivity => settings.release_sensitivity.to_string(),
            Field::SensitivityWhenPaused => settings.sensitivity_when_paused.to_string(),
            Field::CountersteerMultiplier => format!("{:.1}", settings.countersteer_multiplier),
            Field::SnapMultiplier => format!("{:.1}", settings.snap_to_action_key_multiplier),
            Field::PermanentMaxLock => settings.permanent_max_lock.to_string(),
            Field::SnapToCenter => (if settings.snap_to_center { "on" } else { "off" }).to_string(),
            Field::SteerLeft => binding(&settings.bindings.steer_left),
            Field::SteerRight => binding(&settings.bindings.steer_right),
            Field::FullsteerLeft => binding(&settings.bindings.fullsteer_left),
            Field::FullsteerRight => binding(&settings.bindings.fullsteer_right),
            Field::PauseSteeringReset => binding(&settings.bindings.pause_steering_reset),
        }
    }

    fn binding_mut<'a>(&self, settings: &'a mut Settings) -> Option<&'a mut String> {
        let b = &mut settings.bindings;
        match self {
            Field::SteerLeft => Some(&mut b.steer_left),
            Field::SteerRight => Some(&mut b.steer_right),
            Field::FullsteerLeft => Some(&mut b.fullsteer_left),
            Field::FullsteerRight => Some(&mut b.fullsteer_right),
            Field::PauseSteeringReset => Some(&mut b.pause_steering_reset),
            _ => None,
        }
    }
}

/// What a captured key will be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTarget {
    Field(Field),
    ActionKey(usize),
}

/// Waiting for the next key press
#[derive(Debug, Clone)]
pub struct Capture {
    pub target: CaptureTarget,
    /// Keys already held when capture started (e.g. the Enter that started it)
    baseline: PressedKeys,
}

/// Which one-line prompt is open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    NewProfile,
    RenameProfile,
}

#[derive(Debug, Clone)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
}

/// Cached plot points, rebuilt only when linearity changes
#[derive(Debug, Clone)]
pub struct CurveCache {
    linearity: u32,
    points: Vec<(f64, f64)>,
}

impl CurveCache {
    pub fn new(linearity: u32) -> Self {
        Self {
            linearity,
            points: curve_points(linearity, CURVE_RESOLUTION),
        }
    }

    /// Rebuild if `linearity` differs; returns whether it did
    pub fn update(&mut self, linearity: u32) -> bool {
        if linearity == self.linearity {
            return false;
        }
        *self = Self::new(linearity);
        true
    }

    pub fn linearity(&self) -> u32 {
        self.linearity
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }
}

/// Main application state
pub struct App {
    pub tab: Tab,
    pub store: ProfileStore,
    /// Name of the profile being edited
    pub profile: String,
    pub profiles: Vec<String>,
    /// Working copy; every edit is persisted and published
    pub settings: Settings,
    settings_tx: watch::Sender<Arc<Settings>>,
    pub live: watch::Receiver<LiveFrame>,
    pub curve: CurveCache,
    /// Selected row in the settings tab
    pub field_index: usize,
    /// Selected row in the action keys tab
    pub action_index: usize,
    pub capture: Option<Capture>,
    pub prompt: Option<Prompt>,
    /// Keyboard used for binding capture; `None` falls back to terminal keys
    capture_keyboard: Option<EvdevKeyboard>,
    /// Event node of the virtual joystick, if known
    pub device_path: Option<String>,
    pub status_message: Option<String>,
    pub show_help: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        store: ProfileStore,
        profile: String,
        settings: Settings,
        settings_tx: watch::Sender<Arc<Settings>>,
        live: watch::Receiver<LiveFrame>,
        capture_keyboard: Option<EvdevKeyboard>,
        device_path: Option<String>,
    ) -> Self {
        let curve = CurveCache::new(settings.effective_linearity());
        let mut app = Self {
            tab: Tab::Live,
            store,
            profile,
            profiles: Vec::new(),
            settings,
            settings_tx,
            live,
            curve,
            field_index: 0,
            action_index: 0,
            capture: None,
            prompt: None,
            capture_keyboard,
            device_path,
            status_message: None,
            show_help: false,
            should_quit: false,
        };
        app.refresh_profiles();
        app
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
        self.capture = None;
    }

    /// Latest frame from the steering loop; refreshes the curve if needed
    pub fn frame(&mut self) -> LiveFrame {
        let frame = *self.live.borrow();
        self.curve.update(frame.linearity);
        frame
    }

    pub fn has_capture_keyboard(&self) -> bool {
        self.capture_keyboard.is_some()
    }

    pub fn selected_field(&self) -> Field {
        Field::ALL[self.field_index.min(Field::ALL.len() - 1)]
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Apply an edit, persist it and hand the new snapshot to the engine
    fn edit(&mut self, f: impl FnOnce(&mut Settings)) {
        f(&mut self.settings);
        self.publish();
        if let Err(e) = self.store.save(&self.profile, &self.settings) {
            warn!("Failed to save profile {}: {}", self.profile, e);
            self.status_message = Some(format!("Save failed: {}", e));
        }
    }

    fn publish(&self) {
        self.settings_tx.send_replace(Arc::new(self.settings.clone()));
    }

    pub fn select_prev(&mut self) {
        match self.tab {
            Tab::Settings => self.field_index = self.field_index.saturating_sub(1),
            Tab::ActionKeys => self.action_index = self.action_index.saturating_sub(1),
            Tab::Live => {}
        }
    }

    pub fn select_next(&mut self) {
        match self.tab {
            Tab::Settings => {
                if self.field_index + 1 < Field::ALL.len() {
                    self.field_index += 1;
                }
            }
            Tab::ActionKeys => {
                if self.action_index + 1 < self.settings.action_keys.len() {
                    self.action_index += 1;
                }
            }
            Tab::Live => {}
        }
    }

    /// Adjust the selected numeric value by `steps` increments
    pub fn adjust_current(&mut self, steps: i64) {
        match self.tab {
            Tab::Settings => self.adjust_field(self.selected_field(), steps),
            Tab::ActionKeys => {
                let idx = self.action_index;
                if idx < self.settings.action_keys.len() {
                    self.edit(|s| {
                        let cap = &mut s.action_keys[idx].cap_percentage;
                        *cap = (*cap + steps).clamp(*CAP_RANGE.start(), *CAP_RANGE.end());
                    });
                }
            }
            Tab::Live => {}
        }
    }

    fn adjust_field(&mut self, field: Field, steps: i64) {
        let step_int = |v: i64, lo: i64, hi: i64| (v + steps).clamp(lo, hi);
        let step_float = |v: f64| ((v + steps as f64 * 0.1) * 10.0).round() / 10.0;
        match field {
            Field::Linearity => self.edit(|s| {
                s.linearity = step_int(
                    s.linearity,
                    *LINEARITY_RANGE.start(),
                    *LINEARITY_RANGE.end(),
                )
            }),
            Field::Sensitivity => self.edit(|s| {
                s.sensitivity = step_int(
                    s.sensitivity,
                    *SENSITIVITY_RANGE.start(),
                    *SENSITIVITY_RANGE.end(),
                )
            }),
            Field::ReleaseSensitivity => self.edit(|s| {
                s.release_sensitivity = step_int(
                    s.release_sensitivity,
                    *SENSITIVITY_RANGE.start(),
                    *SENSITIVITY_RANGE.end(),
                )
            }),
            Field::SensitivityWhenPaused => self.edit(|s| {
                s.sensitivity_when_paused = step_int(
                    s.sensitivity_when_paused,
                    *SENSITIVITY_RANGE.start(),
                    *SENSITIVITY_RANGE.end(),
                )
            }),
            Field::CountersteerMultiplier => self.edit(|s| {
                s.countersteer_multiplier =
                    step_float(s.countersteer_multiplier).clamp(0.0, MULTIPLIER_MAX)
            }),
            Field::SnapMultiplier => self.edit(|s| {
                s.snap_to_action_key_multiplier =
                    step_float(s.snap_to_action_key_multiplier).clamp(0.0, MULTIPLIER_MAX)
            }),
            Field::PermanentMaxLock => self.edit(|s| {
                s.permanent_max_lock = step_int(
                    s.permanent_max_lock,
                    *MAX_LOCK_RANGE.start(),
                    *MAX_LOCK_RANGE.end(),
                )
            }),
            Field::SnapToCenter => self.toggle_current(),
            _ => {}
        }
    }

    pub fn toggle_current(&mut self) {
        if self.tab == Tab::Settings && self.selected_field() == Field::SnapToCenter {
            self.edit(|s| s.snap_to_center = !s.snap_to_center);
        }
    }

    /// Enter on a binding row or action key starts capture
    pub fn select_enter(&mut self) {
        let target = match self.tab {
            Tab::Settings if self.selected_field().is_binding() => {
                CaptureTarget::Field(self.selected_field())
            }
            Tab::ActionKeys if self.action_index < self.settings.action_keys.len() => {
                CaptureTarget::ActionKey(self.action_index)
            }
            _ => return,
        };
        self.begin_capture(target);
    }

    pub fn begin_capture(&mut self, target: CaptureTarget) {
        let baseline = match self.capture_keyboard.as_mut() {
            Some(kb) => kb.poll().clone(),
            None => PressedKeys::new(),
        };
        self.capture = Some(Capture { target, baseline });
        self.status_message = Some("Press a key to bind (Esc cancels)".to_string());
    }

    pub fn cancel_capture(&mut self) {
        if self.capture.take().is_some() {
            self.status_message = Some("Binding unchanged".to_string());
        }
    }

    /// Check the capture keyboard for a newly pressed key
    pub fn poll_capture(&mut self) {
        let Some(capture) = self.capture.as_mut() else {
            return;
        };
        let Some(kb) = self.capture_keyboard.as_mut() else {
            return;
        };

        let held = kb.poll();
        let fresh = held.newly_pressed(&capture.baseline).next().map(str::to_string);
        // Forget baseline keys once released so pressing them again counts
        capture.baseline = PressedKeys::from_names(
            capture.baseline.iter().filter(|k| held.is_pressed(k)),
        );

        if let Some(key) = fresh {
            self.finish_capture(&key);
        }
    }

    /// Terminal fallback when no capture keyboard is available
    pub fn capture_typed(&mut self, c: char) {
        if self.capture.is_some() && self.capture_keyboard.is_none() {
            let name = if c == ' ' { "space".to_string() } else { c.to_string() };
            self.finish_capture(&name);
        }
    }

    fn finish_capture(&mut self, raw: &str) {
        let Some(capture) = self.capture.take() else {
            return;
        };
        let Some(key) = normalize_key_name(raw) else {
            return;
        };
        if key == "esc" {
            self.status_message = Some("Binding unchanged".to_string());
            return;
        }
        self.assign_binding(capture.target, key);
    }

    /// Store `key` in the binding named by `target`
    pub fn assign_binding(&mut self, target: CaptureTarget, key: String) {
        let label = match target {
            CaptureTarget::Field(field) => {
                if !field.is_binding() {
                    return;
                }
                let shown = key.clone();
                self.edit(|s| {
                    if let Some(slot) = field.binding_mut(s) {
                        *slot = key;
                    }
                });
                format!("{} bound to {}", field.label(), shown)
            }
            CaptureTarget::ActionKey(idx) => {
                if idx >= self.settings.action_keys.len() {
                    return;
                }
                let shown = key.clone();
                self.edit(|s| s.action_keys[idx].binding = key);
                format!("Action key {} bound to {}", idx + 1, shown)
            }
        };
        info!("{}", label);
        self.status_message = Some(label);
    }

    /// Clear the selected binding
    pub fn unbind_current(&mut self) {
        match self.tab {
            Tab::Settings => {
                let field = self.selected_field();
                if field.is_binding() {
                    self.edit(|s| {
                        if let Some(slot) = field.binding_mut(s) {
                            slot.clear();
                        }
                    });
                }
            }
            Tab::ActionKeys => {
                let idx = self.action_index;
                if idx < self.settings.action_keys.len() {
                    self.edit(|s| s.action_keys[idx].binding.clear());
                }
            }
            Tab::Live => {}
        }
    }

    // -----------------------------------------------------------------------
    // Action keys
    // -----------------------------------------------------------------------

    /// Add an action key and immediately wait for its binding
    pub fn add_action_key(&mut self) {
        if self.settings.action_keys.len() >= MAX_ACTION_KEYS {
            self.status_message = Some(format!("At most {} action keys", MAX_ACTION_KEYS));
            return;
        }
        let mut added = None;
        self.edit(|s| added = s.add_action_key());
        if let Some(idx) = added {
            self.action_index = idx;
            self.begin_capture(CaptureTarget::ActionKey(idx));
        }
    }

    pub fn delete_action_key(&mut self) {
        let idx = self.action_index;
        if idx >= self.settings.action_keys.len() {
            return;
        }
        self.edit(|s| {
            s.action_keys.remove(idx);
        });
        self.action_index = idx.min(self.settings.action_keys.len().saturating_sub(1));
    }

    /// Move the selected action key one slot up or down
    pub fn move_action_key(&mut self, up: bool) {
        let idx = self.action_index;
        let len = self.settings.action_keys.len();
        let other = if up { idx.checked_sub(1) } else { Some(idx + 1) };
        let Some(other) = other.filter(|&o| o < len && idx < len) else {
            return;
        };
        self.edit(|s| s.action_keys.swap(idx, other));
        self.action_index = other;
    }

    // -----------------------------------------------------------------------
    // Profiles
    // -----------------------------------------------------------------------

    fn refresh_profiles(&mut self) {
        let mut profiles = self.store.list().unwrap_or_default();
        if !profiles.contains(&self.profile) {
            profiles.push(self.profile.clone());
            profiles.sort();
        }
        self.profiles = profiles;
    }

    /// Switch to the next (`forward`) or previous profile
    pub fn cycle_profile(&mut self, forward: bool) {
        self.refresh_profiles();
        let len = self.profiles.len();
        if len < 2 {
            return;
        }
        let current = self
            .profiles
            .iter()
            .position(|p| *p == self.profile)
            .unwrap_or(0);
        let next = if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };
        let name = self.profiles[next].clone();
        self.switch_profile(&name);
    }

    /// Load and activate `name`; a broken file keeps the current settings
    pub fn switch_profile(&mut self, name: &str) {
        if name != self.profile {
            // Keep the outgoing profile reachable from the cycle
            if let Err(e) = self.ensure_saved() {
                self.report_profile_error(e);
                return;
            }
        }
        match self.store.load(name) {
            Ok(settings) => {
                self.profile = name.to_string();
                self.settings = settings;
                self.action_index = 0;
                self.publish();
                if let Err(e) = self.store.select(name) {
                    warn!("Failed to remember profile selection: {}", e);
                }
                info!("Switched to profile \"{}\"", name);
                self.status_message = Some(format!("Profile: {}", name));
            }
            Err(e) => self.report_profile_error(e),
        }
    }

    /// Re-read the current profile from disk
    pub fn reload_profile(&mut self) {
        let name = self.profile.clone();
        self.switch_profile(&name);
    }

    pub fn open_prompt(&mut self, kind: PromptKind) {
        self.prompt = Some(Prompt {
            kind,
            input: String::new(),
        });
    }

    pub fn prompt_input(&mut self, c: char) {
        if let Some(prompt) = self.prompt.as_mut() {
            prompt.input.push(c);
        }
    }

    pub fn prompt_backspace(&mut self) {
        if let Some(prompt) = self.prompt.as_mut() {
            prompt.input.pop();
        }
    }

    pub fn cancel_prompt(&mut self) {
        self.prompt = None;
    }

    pub fn submit_prompt(&mut self) {
        let Some(prompt) = self.prompt.take() else {
            return;
        };
        let name = prompt.input.trim().to_string();
        let result = match prompt.kind {
            PromptKind::NewProfile => self.store.create(&name, &self.settings).map(|_| {
                self.refresh_profiles();
                self.switch_profile(&name);
            }),
            PromptKind::RenameProfile => {
                self.ensure_saved()
                    .and_then(|_| self.store.rename(&self.profile, &name))
                    .map(|_| {
                        self.profile = name.clone();
                        if let Err(e) = self.store.select(&name) {
                            warn!("Failed to remember profile selection: {}", e);
                        }
                        self.refresh_profiles();
                        self.status_message = Some(format!("Renamed to {}", name));
                    })
            }
        };
        if let Err(e) = result {
            self.report_profile_error(e);
        }
    }

    /// Write the current profile if it has never been saved
    fn ensure_saved(&self) -> Result<(), ProfileError> {
        if self.store.exists(&self.profile) {
            Ok(())
        } else {
            self.store.save(&self.profile, &self.settings)
        }
    }

    fn report_profile_error(&mut self, e: ProfileError) {
        warn!("{}", e);
        self.status_message = Some(e.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wheelmode_engine::ActionKey;

    fn app() -> (TempDir, App, watch::Receiver<Arc<Settings>>) {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new(dir.path());
        let (tx, rx) = watch::channel(Arc::new(Settings::default()));
        let (_feed, live) = crate::driver::LiveFeed::new();
        let app = App::new(
            store,
            "default".to_string(),
            Settings::default(),
            tx,
            live,
            None,
            None,
        );
        (dir, app, rx)
    }

    #[test]
    fn test_adjust_clamps_and_publishes() {
        let (_dir, mut app, rx) = app();
        app.set_tab(Tab::Settings);
        app.field_index = 0; // Linearity
        app.adjust_current(500);
        assert_eq!(app.settings.linearity, 200);
        assert_eq!(rx.borrow().linearity, 200);
        assert_eq!(app.store.load("default").unwrap().linearity, 200);
    }

    #[test]
    fn test_multiplier_steps() {
        let (_dir, mut app, _rx) = app();
        app.set_tab(Tab::Settings);
        app.field_index = Field::ALL
            .iter()
            .position(|f| *f == Field::CountersteerMultiplier)
            .unwrap();
        app.adjust_current(3);
        assert!((app.settings.countersteer_multiplier - 2.3).abs() < 1e-9);
        app.adjust_current(-100);
        assert_eq!(app.settings.countersteer_multiplier, 0.0);
    }

    #[test]
    fn test_capture_with_terminal_fallback() {
        let (_dir, mut app, rx) = app();
        app.set_tab(Tab::Settings);
        app.field_index = Field::ALL
            .iter()
            .position(|f| *f == Field::FullsteerRight)
            .unwrap();
        app.select_enter();
        assert!(app.capture.is_some());
        app.capture_typed('E');
        assert!(app.capture.is_none());
        assert_eq!(app.settings.bindings.fullsteer_right, "e");
        assert_eq!(rx.borrow().bindings.fullsteer_right, "e");
    }

    #[test]
    fn test_unbind() {
        let (_dir, mut app, _rx) = app();
        app.set_tab(Tab::Settings);
        app.field_index = Field::ALL.iter().position(|f| *f == Field::SteerLeft).unwrap();
        app.unbind_current();
        assert_eq!(app.settings.bindings.steer_left, "");
        assert_eq!(Field::SteerLeft.value(&app.settings), "Not Set");
    }

    #[test]
    fn test_action_key_lifecycle() {
        let (_dir, mut app, _rx) = app();
        app.set_tab(Tab::ActionKeys);
        app.add_action_key();
        app.capture_typed('x');
        app.add_action_key();
        app.capture_typed('y');
        assert_eq!(
            app.settings.action_keys,
            vec![
                ActionKey {
                    binding: "x".into(),
                    cap_percentage: 50
                },
                ActionKey {
                    binding: "y".into(),
                    cap_percentage: 50
                },
            ]
        );

        assert_eq!(app.action_index, 1);
        app.adjust_current(-20);
        app.move_action_key(true);
        assert_eq!(app.action_index, 0);
        assert_eq!(app.settings.action_keys[0].binding, "y");
        assert_eq!(app.settings.action_keys[0].cap_percentage, 30);

        app.delete_action_key();
        assert_eq!(app.settings.action_keys.len(), 1);
        assert_eq!(app.settings.action_keys[0].binding, "x");
    }

    #[test]
    fn test_action_key_limit() {
        let (_dir, mut app, _rx) = app();
        app.set_tab(Tab::ActionKeys);
        for _ in 0..MAX_ACTION_KEYS + 2 {
            app.add_action_key();
            app.cancel_capture();
        }
        assert_eq!(app.settings.action_keys.len(), MAX_ACTION_KEYS);
    }

    #[test]
    fn test_new_and_rename_profile() {
        let (_dir, mut app, _rx) = app();
        app.open_prompt(PromptKind::NewProfile);
        for c in "wet".chars() {
            app.prompt_input(c);
        }
        app.submit_prompt();
        assert_eq!(app.profile, "wet");
        assert!(app.store.exists("wet"));

        // Creating it again is refused
        app.open_prompt(PromptKind::NewProfile);
        app.prompt_input('w');
        app.prompt_input('e');
        app.prompt_input('t');
        app.submit_prompt();
        assert!(app.status_message.as_deref().unwrap().contains("already exists"));

        app.open_prompt(PromptKind::RenameProfile);
        for c in "rain".chars() {
            app.prompt_input(c);
        }
        app.submit_prompt();
        assert_eq!(app.profile, "rain");
        assert!(!app.store.exists("wet"));
        assert_eq!(app.store.selected().unwrap(), "rain");
    }

    #[test]
    fn test_broken_profile_keeps_last_good() {
        let (_dir, mut app, rx) = app();
        app.set_tab(Tab::Settings);
        app.adjust_current(20); // linearity 120, saved
        std::fs::write(app.store.path_of("default"), "linearity = [").unwrap();
        app.reload_profile();
        assert_eq!(app.settings.linearity, 120);
        assert_eq!(rx.borrow().linearity, 120);
        assert!(app.status_message.is_some());
    }

    #[test]
    fn test_cycle_profiles() {
        let (_dir, mut app, rx) = app();
        app.store
            .save(
                "gravel",
                &Settings {
                    sensitivity: 42,
                    ..Settings::default()
                },
            )
            .unwrap();
        app.cycle_profile(true);
        assert_eq!(app.profile, "gravel");
        assert_eq!(rx.borrow().sensitivity, 42);
        assert_eq!(app.store.selected().unwrap(), "gravel");
        app.cycle_profile(true);
        assert_eq!(app.profile, "default");
    }

    #[test]
    fn test_create_then_cycle_back_to_unsaved_default() {
        let (_dir, mut app, rx) = app();
        assert!(!app.store.exists("default"));

        app.open_prompt(PromptKind::NewProfile);
        for c in "wet".chars() {
            app.prompt_input(c);
        }
        app.submit_prompt();
        assert_eq!(app.profile, "wet");
        assert!(app.store.exists("default"));

        app.cycle_profile(true);
        assert_eq!(app.profile, "default");
        assert_eq!(app.profiles, vec!["default".to_string(), "wet".to_string()]);
        assert_eq!(rx.borrow().linearity, 100);
    }

    #[test]
    fn test_curve_cache_rebuilds_on_change() {
        let mut cache = CurveCache::new(100);
        assert!(!cache.update(100));
        assert!(cache.update(150));
        assert_eq!(cache.linearity(), 150);
        assert_eq!(cache.points().len(), CURVE_RESOLUTION);
    }
}
