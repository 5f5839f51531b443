//! Wheelmode: keyboard steering for racing games
//!
//! Turns held keyboard keys into a smoothly moving steering axis on a
//! virtual uinput joystick, with a TUI for live visualization and profile
//! editing. The steering math lives in the `wheelmode-engine` crate.

pub mod driver;
pub mod joystick;
pub mod keyboard;
pub mod profile;
pub mod tui;

pub use driver::{Driver, KeyPoller, LiveFeed, LiveFrame, DEFAULT_TICK};
pub use joystick::{AxisId, JoystickError, VirtualJoystick, AXIS_MAX, AXIS_MIN};
pub use keyboard::{EvdevKeyboard, KeyboardError};
pub use profile::{ProfileError, ProfileStore, DEFAULT_PROFILE};
