//! Physical keyboard state via evdev
//!
//! Reads the current key state of one or more keyboards with the
//! `EVIOCGKEY` ioctl. That query reports what is held right now without
//! consuming the event queue, so the driver and the binding-capture surface
//! can both poll the same keyboard without stealing events from the desktop.

use evdev::{Device, Key};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use wheelmode_engine::{KeyState, PressedKeys};

/// Errors from opening keyboards
#[derive(Debug, Error)]
pub enum KeyboardError {
    #[error("Failed to open input device {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No readable keyboard found under /dev/input (is the user in the 'input' group?)")]
    NoKeyboard,
}

/// Polled key state across every opened keyboard
pub struct EvdevKeyboard {
    devices: Vec<(PathBuf, Device)>,
    held: PressedKeys,
}

impl EvdevKeyboard {
    /// Open a specific device, or every device that has letter keys
    pub fn open(path: Option<&Path>) -> Result<Self, KeyboardError> {
        let devices = match path {
            Some(path) => {
                let device = Device::open(path).map_err(|source| KeyboardError::Open {
                    path: path.to_path_buf(),
                    source,
                })?;
                vec![(path.to_path_buf(), device)]
            }
            None => evdev::enumerate()
                .filter(|(_, device)| is_keyboard(device))
                .collect(),
        };

        if devices.is_empty() {
            return Err(KeyboardError::NoKeyboard);
        }

        for (path, device) in &devices {
            info!(
                "Reading keys from {} ({})",
                path.display(),
                device.name().unwrap_or("unnamed")
            );
        }

        Ok(Self {
            devices,
            held: PressedKeys::new(),
        })
    }

    /// Refresh the held-key snapshot
    ///
    /// A device that stops answering (unplugged) is dropped with a warning;
    /// its keys read as released from then on.
    pub fn poll(&mut self) -> &PressedKeys {
        self.held.clear();
        let held = &mut self.held;
        self.devices.retain(|(path, device)| match device.get_key_state() {
            Ok(state) => {
                for key in state.iter() {
                    if let Some(name) = canonical_name(key) {
                        held.insert(name);
                    }
                }
                true
            }
            Err(e) => {
                warn!("Dropping keyboard {}: {}", path.display(), e);
                false
            }
        });
        &self.held
    }

    /// Snapshot from the last [`poll`](Self::poll)
    pub fn held(&self) -> &PressedKeys {
        &self.held
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}

impl KeyState for EvdevKeyboard {
    fn is_pressed(&self, canonical: &str) -> bool {
        self.held.is_pressed(canonical)
    }
}

/// Keyboards are devices that can type letters
fn is_keyboard(device: &Device) -> bool {
    let keyboard = device
        .supported_keys()
        .is_some_and(|keys| keys.contains(Key::KEY_A) && keys.contains(Key::KEY_SPACE));
    if !keyboard {
        debug!("Skipping non-keyboard {:?}", device.name());
    }
    keyboard
}

/// Canonical binding name for an evdev key
///
/// Names match what `wheelmode_engine::normalize_key_name` produces, so a
/// captured key can be stored as-is.
pub fn canonical_name(key: Key) -> Option<&'static str> {
    let name = match key {
        Key::KEY_A => "a",
        Key::KEY_B => "b",
        Key::KEY_C => "c",
        Key::KEY_D => "d",
        Key::KEY_E => "e",
        Key::KEY_F => "f",
        Key::KEY_G => "g",
        Key::KEY_H => "h",
        Key::KEY_I => "i",
        Key::KEY_J => "j",
        Key::KEY_K => "k",
        Key::KEY_L => "l",
        Key::KEY_M => "m",
        Key::KEY_N => "n",
        Key::KEY_O => "o",
        Key::KEY_P => "p",
        Key::KEY_Q => "q",
        Key::KEY_R => "r",
        Key::KEY_S => "s",
        Key::KEY_T => "t",
        Key::KEY_U => "u",
        Key::KEY_V => "v",
        Key::KEY_W => "w",
        Key::KEY_X => "x",
        Key::KEY_Y => "y",
        Key::KEY_Z => "z",
        Key::KEY_1 => "1",
        Key::KEY_2 => "2",
        Key::KEY_3 => "3",
        Key::KEY_4 => "4",
        Key::KEY_5 => "5",
        Key::KEY_6 => "6",
        Key::KEY_7 => "7",
        Key::KEY_8 => "8",
        Key::KEY_9 => "9",
        Key::KEY_0 => "0",
        Key::KEY_F1 => "f1",
        Key::KEY_F2 => "f2",
        Key::KEY_F3 => "f3",
        Key::KEY_F4 => "f4",
        Key::KEY_F5 => "f5",
        Key::KEY_F6 => "f6",
        Key::KEY_F7 => "f7",
        Key::KEY_F8 => "f8",
        Key::KEY_F9 => "f9",
        Key::KEY_F10 => "f10",
        Key::KEY_F11 => "f11",
        Key::KEY_F12 => "f12",
        // Modifiers: both sides share one name
        Key::KEY_LEFTCTRL | Key::KEY_RIGHTCTRL => "ctrl",
        Key::KEY_LEFTSHIFT | Key::KEY_RIGHTSHIFT => "shift",
        Key::KEY_LEFTALT | Key::KEY_RIGHTALT => "alt",
        Key::KEY_LEFTMETA | Key::KEY_RIGHTMETA => "super",
        Key::KEY_SPACE => "space",
        Key::KEY_ENTER => "enter",
        Key::KEY_TAB => "tab",
        Key::KEY_ESC => "esc",
        Key::KEY_BACKSPACE => "backspace",
        Key::KEY_CAPSLOCK => "caps lock",
        Key::KEY_LEFT => "left",
        Key::KEY_RIGHT => "right",
        Key::KEY_UP => "up",
        Key::KEY_DOWN => "down",
        Key::KEY_HOME => "home",
        Key::KEY_END => "end",
        Key::KEY_PAGEUP => "page up",
        Key::KEY_PAGEDOWN => "page down",
        Key::KEY_INSERT => "insert",
        Key::KEY_DELETE => "delete",
        Key::KEY_COMMA => ",",
        Key::KEY_DOT => ".",
        Key::KEY_SLASH => "/",
        Key::KEY_SEMICOLON => ";",
        Key::KEY_APOSTROPHE => "'",
        Key::KEY_LEFTBRACE => "[",
        Key::KEY_RIGHTBRACE => "]",
        Key::KEY_MINUS => "-",
        Key::KEY_EQUAL => "=",
        Key::KEY_GRAVE => "`",
        Key::KEY_BACKSLASH => "\\",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wheelmode_engine::normalize_key_name;

    #[test]
    fn test_modifier_sides_share_name() {
        assert_eq!(canonical_name(Key::KEY_LEFTCTRL), Some("ctrl"));
        assert_eq!(canonical_name(Key::KEY_RIGHTCTRL), Some("ctrl"));
        assert_eq!(canonical_name(Key::KEY_RIGHTALT), Some("alt"));
    }

    #[test]
    fn test_names_are_already_canonical() {
        for code in 0..=Key::KEY_MICMUTE.code() {
            if let Some(name) = canonical_name(Key::new(code)) {
                assert_eq!(
                    normalize_key_name(name).as_deref(),
                    Some(name),
                    "{name} is not canonical"
                );
            }
        }
    }

    #[test]
    fn test_unmapped_key() {
        assert_eq!(canonical_name(Key::BTN_SOUTH), None);
    }

    #[test]
    #[ignore] // Requires read access to /dev/input
    fn test_open_keyboards() {
        let mut keyboard = EvdevKeyboard::open(None).unwrap();
        assert!(keyboard.device_count() > 0);
        keyboard.poll();
    }
}
