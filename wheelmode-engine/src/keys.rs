//! Canonical key names and the key-state query interface
//!
//! Bindings are stored as free-form key names (whatever the capture surface
//! or a hand-edited profile wrote). Before a binding is looked up it goes
//! through [`normalize_key_name`], which collapses left/right modifier
//! variants and a handful of common aliases into one canonical name. The
//! capture surface must run captured names through the same function so
//! both sides agree.
//!
//! Canonical names are lowercase: single characters for letters, digits and
//! punctuation (`"a"`, `"7"`, `","`), `"f1"`..`"f12"`, the modifiers `"ctrl"`,
//! `"shift"`, `"alt"`, `"super"`, and named keys such as `"space"`,
//! `"enter"`, `"esc"`, `"left"`, `"page up"`.

use std::collections::BTreeSet;

/// Binding values that mean "nothing bound"
const UNSET_MARKERS: &[&str] = &["", "not set", "none", "unbound"];

/// Fixed synonym table, matched case-insensitively
const SYNONYMS: &[(&str, &str)] = &[
    // Control
    ("control_l", "ctrl"),
    ("control_r", "ctrl"),
    ("control", "ctrl"),
    ("lctrl", "ctrl"),
    ("rctrl", "ctrl"),
    ("left ctrl", "ctrl"),
    ("right ctrl", "ctrl"),
    ("key_leftctrl", "ctrl"),
    ("key_rightctrl", "ctrl"),
    // Shift
    ("shift_l", "shift"),
    ("shift_r", "shift"),
    ("lshift", "shift"),
    ("rshift", "shift"),
    ("left shift", "shift"),
    ("right shift", "shift"),
    ("key_leftshift", "shift"),
    ("key_rightshift", "shift"),
    // Alt
    ("alt_l", "alt"),
    ("alt_r", "alt"),
    ("lalt", "alt"),
    ("ralt", "alt"),
    ("left alt", "alt"),
    ("right alt", "alt"),
    ("alt gr", "alt"),
    ("key_leftalt", "alt"),
    ("key_rightalt", "alt"),
    // Super
    ("super_l", "super"),
    ("super_r", "super"),
    ("win", "super"),
    ("meta", "super"),
    ("key_leftmeta", "super"),
    ("key_rightmeta", "super"),
    // Named keys
    ("return", "enter"),
    ("escape", "esc"),
    ("back", "backspace"),
    ("prior", "page up"),
    ("next", "page down"),
    ("pgup", "page up"),
    ("pgdn", "page down"),
    ("caps_lock", "caps lock"),
    ("comma", ","),
    ("period", "."),
    ("slash", "/"),
    ("minus", "-"),
    ("equal", "="),
    ("semicolon", ";"),
    ("apostrophe", "'"),
    ("grave", "`"),
    ("backslash", "\\"),
    ("bracketleft", "["),
    ("bracketright", "]"),
];

/// Map a binding name to its canonical form
///
/// Returns `None` for unset bindings, which can never be pressed.
pub fn normalize_key_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    let lower = trimmed.to_ascii_lowercase();
    if UNSET_MARKERS.contains(&lower.as_str()) {
        return None;
    }

    if let Some((_, canonical)) = SYNONYMS.iter().find(|(alias, _)| *alias == lower) {
        return Some((*canonical).to_string());
    }

    // evdev-style names ("KEY_A", "KEY_SPACE")
    if let Some(rest) = lower.strip_prefix("key_") {
        if !rest.is_empty() {
            return Some(rest.to_string());
        }
    }

    Some(lower)
}

/// Answers "is this canonical key held right now?"
///
/// Implementations must not consume events: the engine asks about several
/// keys per tick and expects consistent answers within that tick.
pub trait KeyState {
    fn is_pressed(&self, canonical: &str) -> bool;
}

impl<F: Fn(&str) -> bool> KeyState for F {
    fn is_pressed(&self, canonical: &str) -> bool {
        self(canonical)
    }
}

/// A set of canonical key names that are currently held
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PressedKeys(BTreeSet<String>);

impl PressedKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from raw names, normalizing each one
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            names
                .into_iter()
                .filter_map(|n| normalize_key_name(n.as_ref()))
                .collect(),
        )
    }

    pub fn insert(&mut self, name: &str) {
        if let Some(canonical) = normalize_key_name(name) {
            self.0.insert(canonical);
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Keys held in `self` that were not held in `earlier`
    pub fn newly_pressed<'a>(&'a self, earlier: &'a PressedKeys) -> impl Iterator<Item = &'a str> {
        self.0
            .iter()
            .filter(move |k| !earlier.0.contains(*k))
            .map(String::as_str)
    }
}

impl KeyState for PressedKeys {
    fn is_pressed(&self, canonical: &str) -> bool {
        self.0.contains(canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_variants_collapse() {
        for name in ["Control_L", "Control_R", "ctrl", "KEY_RIGHTCTRL"] {
            assert_eq!(normalize_key_name(name).as_deref(), Some("ctrl"), "{name}");
        }
        assert_eq!(normalize_key_name("Shift_R").as_deref(), Some("shift"));
        assert_eq!(normalize_key_name("Alt_L").as_deref(), Some("alt"));
    }

    #[test]
    fn test_unset_bindings() {
        assert_eq!(normalize_key_name(""), None);
        assert_eq!(normalize_key_name("   "), None);
        assert_eq!(normalize_key_name("Not Set"), None);
    }

    #[test]
    fn test_plain_keys_lowercase() {
        assert_eq!(normalize_key_name("A").as_deref(), Some("a"));
        assert_eq!(normalize_key_name("KEY_D").as_deref(), Some("d"));
        assert_eq!(normalize_key_name("Return").as_deref(), Some("enter"));
        assert_eq!(normalize_key_name("comma").as_deref(), Some(","));
    }

    #[test]
    fn test_pressed_keys_normalizes() {
        let keys = PressedKeys::from_names(["Shift_L", "A", ""]);
        assert!(keys.is_pressed("shift"));
        assert!(keys.is_pressed("a"));
        assert!(!keys.is_pressed(""));
        assert_eq!(keys.iter().count(), 2);
    }

    #[test]
    fn test_newly_pressed() {
        let before = PressedKeys::from_names(["enter"]);
        let now = PressedKeys::from_names(["enter", "q"]);
        let fresh: Vec<_> = now.newly_pressed(&before).collect();
        assert_eq!(fresh, vec!["q"]);
    }

    #[test]
    fn test_closure_key_state() {
        let only_d = |k: &str| k == "d";
        assert!(only_d.is_pressed("d"));
        assert!(!only_d.is_pressed("a"));
    }
}
