//! Wheelmode steering engine
//!
//! Turns digital key presses into a spring-centered analog steering axis.
//! The engine is a deterministic per-tick state update: given the current
//! axis value, the keys held right now and a settings snapshot, it produces
//! the next axis value and a device-ready sample.
//!
//! Devices, key polling and persistence live outside this crate and are
//! reached through the [`KeyState`], [`AxisSink`] and [`VisualizationSink`]
//! traits.

pub mod curve;
pub mod engine;
pub mod error;
pub mod keys;
pub mod settings;

pub use curve::{apply_curve, to_sample, DEVICE_RANGE, SAMPLE_CENTER, SAMPLE_MAX};
pub use engine::{AxisSink, SteeringEngine, TickOutput, VisualizationSink};
pub use error::SettingsError;
pub use keys::{normalize_key_name, KeyState, PressedKeys};
pub use settings::{ActionKey, Bindings, ResolvedSettings, Settings, MAX_ACTION_KEYS};
