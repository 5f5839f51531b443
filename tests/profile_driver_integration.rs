//! Integration tests for profiles feeding the steering loop.
//!
//! A profile written to disk is loaded, published on the settings channel
//! and stepped by the driver against scripted keys and an in-memory axis,
//! without touching /dev/uinput or real keyboards.

use std::collections::VecDeque;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::watch;
use wheelmode::driver::{Driver, KeyPoller, LiveFeed, DEFAULT_TICK};
use wheelmode::profile::{ProfileError, ProfileStore};
use wheelmode_engine::{ActionKey, AxisSink, KeyState, PressedKeys, Settings, SAMPLE_CENTER};

/// One key set per tick
struct Keys(VecDeque<PressedKeys>, PressedKeys);

impl Keys {
    fn script(ticks: &[&[&str]]) -> Self {
        Keys(
            ticks.iter().map(|t| PressedKeys::from_names(*t)).collect(),
            PressedKeys::new(),
        )
    }
}

impl KeyState for Keys {
    fn is_pressed(&self, canonical: &str) -> bool {
        self.1.is_pressed(canonical)
    }
}

impl KeyPoller for Keys {
    fn poll(&mut self) {
        self.1 = self.0.pop_front().unwrap_or_default();
    }
}

#[derive(Default)]
struct Axis(Vec<u16>);

impl AxisSink for Axis {
    type Error = std::convert::Infallible;

    fn set_axis(&mut self, sample: u16) -> Result<(), Self::Error> {
        self.0.push(sample);
        Ok(())
    }
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ── profile → driver ──

#[test]
fn saved_profile_drives_the_axis() {
    let dir = TempDir::new().unwrap();
    let store = ProfileStore::new(dir.path());

    // Arrow keys, written with synonyms the way a hand-edited file might be
    let mut settings = Settings {
        sensitivity: 25,
        ..Settings::default()
    };
    settings.bindings.steer_left = "Left".into();
    settings.bindings.steer_right = "Right".into();
    store.save("arrows", &settings).unwrap();
    store.select("arrows").unwrap();

    let loaded = store.load(&store.selected().unwrap()).unwrap();
    let (_tx, rx) = watch::channel(Arc::new(loaded));
    let (feed, live) = LiveFeed::new();
    let keys = Keys::script(&[&["right"], &["right"], &[]]);
    let mut driver = Driver::new(keys, Axis::default(), rx, feed, DEFAULT_TICK);

    driver.tick_once().unwrap();
    driver.tick_once().unwrap();
    assert!(approx(driver.value(), 0.5));

    // Idle: decays by release sensitivity
    driver.tick_once().unwrap();
    assert!(approx(driver.value(), 0.35));
    assert!(approx(live.borrow().value, 0.35));
}

#[test]
fn hand_written_profile_with_action_keys() {
    let dir = TempDir::new().unwrap();
    let store = ProfileStore::new(dir.path());
    std::fs::create_dir_all(dir.path().join("profiles")).unwrap();
    std::fs::write(
        store.path_of("drift"),
        r#"
sensitivity = 50
permanent_max_lock = 80

[[action_keys]]
binding = "Shift_L"
cap_percentage = 30
"#,
    )
    .unwrap();

    let settings = store.load("drift").unwrap();
    assert_eq!(
        settings.action_keys,
        vec![ActionKey {
            binding: "Shift_L".into(),
            cap_percentage: 30
        }]
    );

    let (_tx, rx) = watch::channel(Arc::new(settings));
    let (feed, _live) = LiveFeed::new();
    let keys = Keys::script(&[&["d"], &["d"], &["d", "shift"]]);
    let mut driver = Driver::new(keys, Axis::default(), rx, feed, DEFAULT_TICK);

    driver.tick_once().unwrap();
    assert!(approx(driver.value(), 0.5));
    driver.tick_once().unwrap();
    assert!(approx(driver.value(), 0.8));

    // Holding shift pulls the lock down to 30%
    let out = driver.tick_once().unwrap().unwrap();
    assert!(out.action_active);
    assert!(approx(out.cap, 0.3));
    assert!(approx(out.value, 0.3));
}

#[test]
fn broken_reload_keeps_running_settings() {
    let dir = TempDir::new().unwrap();
    let store = ProfileStore::new(dir.path());
    store.save("default", &Settings::default()).unwrap();

    let (tx, rx) = watch::channel(Arc::new(store.load("default").unwrap()));
    let (feed, _live) = LiveFeed::new();
    let keys = Keys::script(&[&["d"], &["d"]]);
    let mut driver = Driver::new(keys, Axis::default(), rx, feed, DEFAULT_TICK);
    driver.tick_once().unwrap();

    std::fs::write(store.path_of("default"), "sensitivity = ").unwrap();
    // A failed reload publishes nothing, so the last good snapshot stays
    let reload = store.load("default");
    assert!(matches!(reload, Err(ProfileError::Parse { .. })));
    if let Ok(settings) = reload {
        tx.send_replace(Arc::new(settings));
    }

    driver.tick_once().unwrap();
    assert!(approx(driver.value(), 0.2));
}

#[test]
fn idle_start_emits_center() {
    let (_tx, rx) = watch::channel(Arc::new(Settings::default()));
    let (feed, _live) = LiveFeed::new();
    let mut driver = Driver::new(Keys::script(&[]), Axis::default(), rx, feed, DEFAULT_TICK);
    let out = driver.tick_once().unwrap().unwrap();
    assert_eq!(out.sample, SAMPLE_CENTER);
}
