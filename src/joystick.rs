//! Virtual steering device using evdev/uinput
//!
//! Creates a virtual gamepad with a single absolute axis that games see as
//! the steering wheel. The axis is unsigned, `0..=0x8000` with center at
//! `0x4000`, matching the samples the engine produces.

use clap::ValueEnum;
use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AbsInfo, AbsoluteAxisType, AttributeSet, InputEvent, Key, UinputAbsSetup,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wheelmode_engine::{AxisSink, SAMPLE_CENTER, SAMPLE_MAX};

/// Axis value range reported to the kernel
pub const AXIS_MIN: i32 = 0;
pub const AXIS_MAX: i32 = SAMPLE_MAX as i32;

/// Errors from virtual joystick operations
#[derive(Debug, Error)]
pub enum JoystickError {
    /// uinput missing, not permitted, or the device could not be registered
    #[error("Failed to acquire virtual device: {0} (is /dev/uinput present and writable?)")]
    Acquire(#[source] std::io::Error),
    #[error("Failed to emit axis event: {0}")]
    Emit(#[source] std::io::Error),
}

/// Which absolute axis carries the steering value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AxisId {
    X,
    Y,
    Z,
    RX,
    RY,
    RZ,
}

impl AxisId {
    /// Get display name for the axis
    pub fn display_name(&self) -> &'static str {
        match self {
            AxisId::X => "X",
            AxisId::Y => "Y",
            AxisId::Z => "Z",
            AxisId::RX => "RX",
            AxisId::RY => "RY",
            AxisId::RZ => "RZ",
        }
    }

    fn code(self) -> AbsoluteAxisType {
        match self {
            AxisId::X => AbsoluteAxisType::ABS_X,
            AxisId::Y => AbsoluteAxisType::ABS_Y,
            AxisId::Z => AbsoluteAxisType::ABS_Z,
            AxisId::RX => AbsoluteAxisType::ABS_RX,
            AxisId::RY => AbsoluteAxisType::ABS_RY,
            AxisId::RZ => AbsoluteAxisType::ABS_RZ,
        }
    }
}

/// Virtual steering device
pub struct VirtualJoystick {
    device: VirtualDevice,
    axis: AxisId,
    /// Last emitted sample (for change detection)
    last_sample: Option<u16>,
}

impl VirtualJoystick {
    /// Create the virtual device
    ///
    /// # Arguments
    /// * `name` - Device name (shown in `evtest` and game controller settings)
    /// * `axis` - Absolute axis that carries steering
    pub fn new(name: &str, axis: AxisId) -> Result<Self, JoystickError> {
        let mut builder = VirtualDeviceBuilder::new()
            .map_err(JoystickError::Acquire)?
            .name(name);

        // Games and Steam Input only list devices that also have buttons
        let mut keys = AttributeSet::<Key>::new();
        keys.insert(Key::BTN_SOUTH);
        keys.insert(Key::BTN_EAST);
        builder = builder.with_keys(&keys).map_err(JoystickError::Acquire)?;

        let abs_setup = UinputAbsSetup::new(
            axis.code(),
            AbsInfo::new(i32::from(SAMPLE_CENTER), AXIS_MIN, AXIS_MAX, 0, 0, 1),
        );
        builder = builder
            .with_absolute_axis(&abs_setup)
            .map_err(JoystickError::Acquire)?;

        let device = builder.build().map_err(JoystickError::Acquire)?;

        Ok(Self {
            device,
            axis,
            last_sample: None,
        })
    }

    /// Get the device path (e.g., /dev/input/eventX)
    pub fn device_path(&mut self) -> Option<std::path::PathBuf> {
        self.device
            .enumerate_dev_nodes_blocking()
            .ok()?
            .next()?
            .ok()
    }

    pub fn axis(&self) -> AxisId {
        self.axis
    }
}

impl AxisSink for VirtualJoystick {
    type Error = JoystickError;

    /// Emit a sample; unchanged samples are not re-sent
    fn set_axis(&mut self, sample: u16) -> Result<(), JoystickError> {
        let clamped = sample.min(SAMPLE_MAX);
        if self.last_sample == Some(clamped) {
            return Ok(());
        }

        let event = InputEvent::new_now(
            evdev::EventType::ABSOLUTE,
            self.axis.code().0,
            i32::from(clamped),
        );
        self.device.emit(&[event]).map_err(JoystickError::Emit)?;
        self.last_sample = Some(clamped);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_codes_distinct() {
        let axes = [AxisId::X, AxisId::Y, AxisId::Z, AxisId::RX, AxisId::RY, AxisId::RZ];
        let mut codes: Vec<u16> = axes.iter().map(|a| a.code().0).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), axes.len());
    }

    #[test]
    fn test_axis_range_matches_engine() {
        assert_eq!(AXIS_MAX, 0x8000);
        assert_eq!(i32::from(SAMPLE_CENTER) * 2, AXIS_MAX);
    }

    #[test]
    #[ignore] // Requires uinput access (run with: cargo test -- --ignored)
    fn test_create_joystick() {
        let mut joystick = VirtualJoystick::new("Wheelmode Test", AxisId::X).unwrap();
        joystick.set_axis(SAMPLE_CENTER).unwrap();
        joystick.set_axis(SAMPLE_MAX).unwrap();
    }
}
