//! Settings snapshot for the steering engine
//!
//! [`Settings`] is the persisted, human-editable record: it is what a profile
//! file deserializes into and what the configuration surface edits. Numbers
//! are stored wide and unchecked so that a hand-edited profile with an
//! out-of-range value still loads.
//!
//! Every tick the engine calls [`Settings::resolve`], which clamps each field
//! into its declared range and normalizes the bindings. Only values that make
//! no sense at all (NaN, infinities) fail resolution.

use crate::error::SettingsError;
use crate::keys::normalize_key_name;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Maximum number of action keys in a profile
pub const MAX_ACTION_KEYS: usize = 10;

pub const LINEARITY_RANGE: RangeInclusive<i64> = 50..=200;
pub const SENSITIVITY_RANGE: RangeInclusive<i64> = 1..=100;
pub const MAX_LOCK_RANGE: RangeInclusive<i64> = 1..=100;
pub const CAP_RANGE: RangeInclusive<i64> = 1..=100;

/// Cap given to a freshly added action key
pub const DEFAULT_ACTION_KEY_CAP: i64 = 50;

/// Named key bindings
///
/// An empty string means unbound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bindings {
    pub steer_left: String,
    pub steer_right: String,
    pub fullsteer_left: String,
    pub fullsteer_right: String,
    /// Persisted but not read by the engine
    pub pause_steering_reset: String,
}

impl Default for Bindings {
    fn default() -> Self {
        Self {
            steer_left: "a".to_string(),
            steer_right: "d".to_string(),
            fullsteer_left: String::new(),
            fullsteer_right: String::new(),
            pause_steering_reset: String::new(),
        }
    }
}

/// A held key that temporarily limits the steering lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionKey {
    #[serde(default)]
    pub binding: String,
    #[serde(default = "default_cap")]
    pub cap_percentage: i64,
}

fn default_cap() -> i64 {
    DEFAULT_ACTION_KEY_CAP
}

impl Default for ActionKey {
    fn default() -> Self {
        Self {
            binding: String::new(),
            cap_percentage: DEFAULT_ACTION_KEY_CAP,
        }
    }
}

/// Complete tunable state of one profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Response curve parameter (50-200, 100 = linear)
    pub linearity: i64,
    /// Steering rate while a steer key is held (1-100)
    pub sensitivity: i64,
    /// Centering rate with no steer key held (1-100)
    pub release_sensitivity: i64,
    /// Persisted but not read by the engine
    pub sensitivity_when_paused: i64,
    /// Rate multiplier when steering back through center
    pub countersteer_multiplier: f64,
    /// Rate multiplier while an action key is active or the axis is over its cap
    pub snap_to_action_key_multiplier: f64,
    /// Cap on |value| in percent when no action key is held (1-100)
    pub permanent_max_lock: i64,
    /// Return to center instantly when a fullsteer key is released
    pub snap_to_center: bool,
    pub bindings: Bindings,
    /// First held entry wins
    pub action_keys: Vec<ActionKey>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            linearity: 100,
            sensitivity: 10,
            release_sensitivity: 15,
            sensitivity_when_paused: 3,
            countersteer_multiplier: 2.0,
            snap_to_action_key_multiplier: 1.0,
            permanent_max_lock: 100,
            snap_to_center: false,
            bindings: Bindings::default(),
            action_keys: Vec::new(),
        }
    }
}

/// An action key after normalization and clamping
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedActionKey {
    pub key: Option<String>,
    pub cap: f64,
}

/// The values the engine actually uses for one tick
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSettings {
    pub linearity: u32,
    pub sensitivity: u32,
    pub release_sensitivity: u32,
    pub countersteer_multiplier: f64,
    pub snap_to_action_key_multiplier: f64,
    /// Permanent max lock as a fraction (0.01-1.0)
    pub permanent_cap: f64,
    pub snap_to_center: bool,
    pub steer_left: Option<String>,
    pub steer_right: Option<String>,
    pub fullsteer_left: Option<String>,
    pub fullsteer_right: Option<String>,
    pub action_keys: Vec<ResolvedActionKey>,
}

fn clamp_int(value: i64, range: &RangeInclusive<i64>) -> u32 {
    // All ranges are small and positive
    value.clamp(*range.start(), *range.end()) as u32
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, SettingsError> {
    if !value.is_finite() {
        return Err(SettingsError::NonFinite { field, value });
    }
    Ok(value.max(0.0))
}

impl Settings {
    /// Clamp every field into range and normalize bindings
    pub fn resolve(&self) -> Result<ResolvedSettings, SettingsError> {
        let countersteer_multiplier =
            non_negative("countersteer_multiplier", self.countersteer_multiplier)?;
        let snap_to_action_key_multiplier = non_negative(
            "snap_to_action_key_multiplier",
            self.snap_to_action_key_multiplier,
        )?;

        let action_keys = self
            .action_keys
            .iter()
            .take(MAX_ACTION_KEYS)
            .map(|ak| ResolvedActionKey {
                key: normalize_key_name(&ak.binding),
                cap: f64::from(clamp_int(ak.cap_percentage, &CAP_RANGE)) / 100.0,
            })
            .collect();

        Ok(ResolvedSettings {
            linearity: clamp_int(self.linearity, &LINEARITY_RANGE),
            sensitivity: clamp_int(self.sensitivity, &SENSITIVITY_RANGE),
            release_sensitivity: clamp_int(self.release_sensitivity, &SENSITIVITY_RANGE),
            countersteer_multiplier,
            snap_to_action_key_multiplier,
            permanent_cap: f64::from(clamp_int(self.permanent_max_lock, &MAX_LOCK_RANGE)) / 100.0,
            snap_to_center: self.snap_to_center,
            steer_left: normalize_key_name(&self.bindings.steer_left),
            steer_right: normalize_key_name(&self.bindings.steer_right),
            fullsteer_left: normalize_key_name(&self.bindings.fullsteer_left),
            fullsteer_right: normalize_key_name(&self.bindings.fullsteer_right),
            action_keys,
        })
    }

    /// Linearity as the engine will use it
    pub fn effective_linearity(&self) -> u32 {
        clamp_int(self.linearity, &LINEARITY_RANGE)
    }

    /// Append an unbound action key; returns its index, or `None` when full
    pub fn add_action_key(&mut self) -> Option<usize> {
        if self.action_keys.len() >= MAX_ACTION_KEYS {
            return None;
        }
        self.action_keys.push(ActionKey::default());
        Some(self.action_keys.len() - 1)
    }
}
