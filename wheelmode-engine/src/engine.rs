//! Per-tick steering simulation
//!
//! The engine owns the only mutable steering state: the pre-curve axis value
//! in `[-1, 1]` and whether a fullsteer key was held on the previous tick.
//! Each call to [`SteeringEngine::tick`] applies, in order:
//!
//! 1. binding normalization (done by [`Settings::resolve`])
//! 2. effective cap from the first held action key, else the permanent lock
//! 3. fullsteer override (right wins if both are held)
//! 4. fullsteer release: snap or decay toward center
//! 5. normal steering, or idle centering when no steer key is held (skipped
//!    on the fullsteer release tick)
//! 6. post-cap correction while an action key is active
//! 7. response curve and device sample
//! 8. commit
//!
//! All rates are fixed increments per tick, so a late tick changes perceived
//! speed but never the value ranges.

use crate::curve::{apply_curve, to_sample};
use crate::error::SettingsError;
use crate::keys::KeyState;
use crate::settings::{ResolvedSettings, Settings};
use tracing::debug;

/// Per-tick rate unit: a sensitivity of 1 moves the axis by 1% per tick
const RATE_UNIT: f64 = 0.01;

/// Receives device samples
///
/// Implemented by the virtual joystick. A write error is fatal to the
/// driver loop.
pub trait AxisSink {
    type Error;

    fn set_axis(&mut self, sample: u16) -> Result<(), Self::Error>;
}

/// Receives the pre-curve value after every tick
///
/// Fire-and-forget; implementations may drop frames.
pub trait VisualizationSink {
    fn on_sample(&mut self, value: f64, linearity: u32);
}

impl VisualizationSink for () {
    fn on_sample(&mut self, _value: f64, _linearity: u32) {}
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutput {
    /// Pre-curve axis value, the committed state
    pub value: f64,
    /// Post-curve value
    pub output: f64,
    /// Device sample for `output`
    pub sample: u16,
    /// Effective cap this tick (fraction of full lock)
    pub cap: f64,
    pub action_active: bool,
    pub fullsteer_active: bool,
    pub linearity: u32,
}

/// Steering state machine
#[derive(Debug, Clone, Default)]
pub struct SteeringEngine {
    value: f64,
    fullsteer_was_active: bool,
}

impl SteeringEngine {
    /// Engine with a centered axis
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine starting from a given axis value (clamped to `[-1, 1]`)
    pub fn starting_at(value: f64) -> Self {
        Self {
            value: if value.is_finite() {
                value.clamp(-1.0, 1.0)
            } else {
                0.0
            },
            fullsteer_was_active: false,
        }
    }

    /// Current pre-curve axis value
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Resolve `settings` and advance one tick
    ///
    /// On a resolution error the state is left untouched.
    pub fn tick<K: KeyState + ?Sized>(
        &mut self,
        settings: &Settings,
        keys: &K,
    ) -> Result<TickOutput, SettingsError> {
        let resolved = settings.resolve()?;
        Ok(self.advance(&resolved, keys))
    }

    /// Advance one tick with already resolved settings
    pub fn advance<K: KeyState + ?Sized>(
        &mut self,
        settings: &ResolvedSettings,
        keys: &K,
    ) -> TickOutput {
        let (cap, action_active) = effective_cap(settings, keys);

        let sensitivity = RATE_UNIT * f64::from(settings.sensitivity);
        let release = RATE_UNIT * f64::from(settings.release_sensitivity);
        let snap = settings.snap_to_action_key_multiplier;
        let action_mult = if action_active { snap } else { 1.0 };

        let mut value = self.value;

        let mut fullsteer_active = false;
        if is_held(keys, settings.fullsteer_left.as_deref()) {
            value = -1.0;
            fullsteer_active = true;
        }
        if is_held(keys, settings.fullsteer_right.as_deref()) {
            value = 1.0;
            fullsteer_active = true;
        }

        // The release tick belongs to the release transition alone
        let released = self.fullsteer_was_active && !fullsteer_active;
        if released {
            value = if settings.snap_to_center {
                0.0
            } else {
                decay_toward(value, 0.0, release)
            };
        } else if !fullsteer_active {
            if is_held(keys, settings.steer_left.as_deref()) {
                let rate = if value > 0.0 {
                    sensitivity * settings.countersteer_multiplier
                } else {
                    sensitivity * action_mult
                };
                value = (value - rate).max(-cap);
            } else if is_held(keys, settings.steer_right.as_deref()) {
                let rate = if value < 0.0 {
                    sensitivity * settings.countersteer_multiplier
                } else {
                    sensitivity * action_mult
                };
                value = (value + rate).min(cap);
            } else {
                value = idle_centering(value, cap, release, snap, action_active);
            }
        }

        if action_active {
            value = correct_over_cap(value, cap, release * snap);
        }

        let output = apply_curve(value, settings.linearity);
        let sample = to_sample(output);

        self.value = value;
        self.fullsteer_was_active = fullsteer_active;

        TickOutput {
            value,
            output,
            sample,
            cap,
            action_active,
            fullsteer_active,
            linearity: settings.linearity,
        }
    }

    /// Tick, write the sample to `device` and notify `viz`
    ///
    /// A settings snapshot that fails to resolve skips the tick entirely and
    /// returns `Ok(None)`. Device errors are returned to the caller.
    pub fn step<K, D, V>(
        &mut self,
        settings: &Settings,
        keys: &K,
        device: &mut D,
        viz: &mut V,
    ) -> Result<Option<TickOutput>, D::Error>
    where
        K: KeyState + ?Sized,
        D: AxisSink + ?Sized,
        V: VisualizationSink + ?Sized,
    {
        let out = match self.tick(settings, keys) {
            Ok(out) => out,
            Err(e) => {
                debug!("Skipping tick: {}", e);
                return Ok(None);
            }
        };

        device.set_axis(out.sample)?;
        viz.on_sample(out.value, out.linearity);
        Ok(Some(out))
    }
}

fn is_held<K: KeyState + ?Sized>(keys: &K, binding: Option<&str>) -> bool {
    binding.is_some_and(|key| keys.is_pressed(key))
}

/// Cap for this tick and whether an action key set it
///
/// The first action key in list order that is bound and held wins.
pub fn effective_cap<K: KeyState + ?Sized>(settings: &ResolvedSettings, keys: &K) -> (f64, bool) {
    settings
        .action_keys
        .iter()
        .find(|ak| is_held(keys, ak.key.as_deref()))
        .map_or((settings.permanent_cap, false), |ak| (ak.cap, true))
}

/// Move `value` toward `target` by `step` without passing it
fn decay_toward(value: f64, target: f64, step: f64) -> f64 {
    if value > target {
        (value - step).max(target)
    } else if value < target {
        (value + step).min(target)
    } else {
        value
    }
}

/// Centering with no steer key held
///
/// Above the cap the axis falls back to the cap at the snap rate; inside it
/// it returns to center at the release rate (scaled by the snap multiplier
/// while an action key is active).
pub fn idle_centering(value: f64, cap: f64, release: f64, snap: f64, action_active: bool) -> f64 {
    if value > cap {
        decay_toward(value, cap, release * snap)
    } else if value < -cap {
        decay_toward(value, -cap, release * snap)
    } else {
        let rate = if action_active { release * snap } else { release };
        decay_toward(value, 0.0, rate)
    }
}

/// Pull an over-cap value back toward `±cap` by `step`
///
/// Applied every tick an action key is active, whatever steering did.
pub fn correct_over_cap(value: f64, cap: f64, step: f64) -> f64 {
    if value > cap {
        decay_toward(value, cap, step)
    } else if value < -cap {
        decay_toward(value, -cap, step)
    } else {
        value
    }
}
