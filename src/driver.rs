//! Fixed-period steering driver
//!
//! Runs the engine once per tick on its own task. The driver is the only
//! owner of the [`SteeringEngine`]; everything else talks to it through two
//! channels:
//!
//! - settings arrive as whole `Arc<Settings>` records on a `watch` channel,
//!   so a tick always sees one complete snapshot, old or new
//! - live state leaves through a [`LiveFeed`], also a `watch` channel, which
//!   keeps only the newest frame

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::info;
use wheelmode_engine::{AxisSink, KeyState, Settings, SteeringEngine, TickOutput, VisualizationSink};

use crate::keyboard::EvdevKeyboard;

/// Default tick period (100 Hz)
pub const DEFAULT_TICK: Duration = Duration::from_millis(10);

/// Key state that must be refreshed before each tick
pub trait KeyPoller: KeyState {
    fn poll(&mut self);
}

impl KeyPoller for EvdevKeyboard {
    fn poll(&mut self) {
        EvdevKeyboard::poll(self);
    }
}

/// What the visualization sees after a tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LiveFrame {
    /// Pre-curve axis value
    pub value: f64,
    pub linearity: u32,
    /// Full tick result, if a tick has completed
    pub tick: Option<TickOutput>,
}

/// Publishing side of the live view channel
#[derive(Debug)]
pub struct LiveFeed {
    tx: watch::Sender<LiveFrame>,
}

impl LiveFeed {
    pub fn new() -> (Self, watch::Receiver<LiveFrame>) {
        let (tx, rx) = watch::channel(LiveFrame {
            linearity: 100,
            ..LiveFrame::default()
        });
        (Self { tx }, rx)
    }

    /// Attach the full tick result to the latest frame
    pub fn record(&self, out: &TickOutput) {
        self.tx.send_modify(|frame| frame.tick = Some(*out));
    }
}

impl VisualizationSink for LiveFeed {
    fn on_sample(&mut self, value: f64, linearity: u32) {
        // No receivers is fine; the frame is simply dropped
        self.tx.send_modify(|frame| {
            frame.value = value;
            frame.linearity = linearity;
        });
    }
}

/// The tick loop
pub struct Driver<K, D> {
    engine: SteeringEngine,
    keys: K,
    device: D,
    settings: watch::Receiver<Arc<Settings>>,
    feed: LiveFeed,
    period: Duration,
}

impl<K, D> Driver<K, D>
where
    K: KeyPoller,
    D: AxisSink,
{
    pub fn new(
        keys: K,
        device: D,
        settings: watch::Receiver<Arc<Settings>>,
        feed: LiveFeed,
        period: Duration,
    ) -> Self {
        Self {
            engine: SteeringEngine::new(),
            keys,
            device,
            settings,
            feed,
            period,
        }
    }

    /// Run one tick: poll keys, take the current snapshot, step the engine
    pub fn tick_once(&mut self) -> Result<Option<TickOutput>, D::Error> {
        self.keys.poll();
        let settings = Arc::clone(&self.settings.borrow());
        let out = self
            .engine
            .step(&settings, &self.keys, &mut self.device, &mut self.feed)?;
        if let Some(out) = &out {
            self.feed.record(out);
        }
        Ok(out)
    }

    /// Tick forever at the configured period
    ///
    /// Returns only when the device rejects a write.
    pub async fn run(mut self) -> Result<(), D::Error> {
        info!("Steering loop running every {:?}", self.period);
        let mut interval = tokio::time::interval(self.period);
        // A late tick is not made up for; the axis moves per tick, not per ms
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            self.tick_once()?;
        }
    }

    pub fn value(&self) -> f64 {
        self.engine.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use wheelmode_engine::PressedKeys;

    /// Replays one key set per poll
    struct Script {
        ticks: VecDeque<PressedKeys>,
        current: PressedKeys,
    }

    impl Script {
        fn new(ticks: &[&[&str]]) -> Self {
            Self {
                ticks: ticks.iter().map(|t| PressedKeys::from_names(*t)).collect(),
                current: PressedKeys::new(),
            }
        }
    }

    impl KeyState for Script {
        fn is_pressed(&self, canonical: &str) -> bool {
            self.current.is_pressed(canonical)
        }
    }

    impl KeyPoller for Script {
        fn poll(&mut self) {
            self.current = self.ticks.pop_front().unwrap_or_default();
        }
    }

    #[derive(Default)]
    struct Samples(Vec<u16>);

    impl AxisSink for Samples {
        type Error = std::convert::Infallible;

        fn set_axis(&mut self, sample: u16) -> Result<(), Self::Error> {
            self.0.push(sample);
            Ok(())
        }
    }

    fn driver(
        script: Script,
        settings: Settings,
    ) -> (
        Driver<Script, Samples>,
        watch::Sender<Arc<Settings>>,
        watch::Receiver<LiveFrame>,
    ) {
        let (tx, rx) = watch::channel(Arc::new(settings));
        let (feed, live) = LiveFeed::new();
        let driver = Driver::new(script, Samples::default(), rx, feed, DEFAULT_TICK);
        (driver, tx, live)
    }

    #[test]
    fn test_ticks_publish_live_frames() {
        let (mut driver, _tx, live) = driver(Script::new(&[&["d"], &["d"]]), Settings::default());
        driver.tick_once().unwrap();
        driver.tick_once().unwrap();

        let frame = *live.borrow();
        assert!((frame.value - 0.2).abs() < 1e-9);
        assert_eq!(frame.linearity, 100);
        assert_eq!(frame.tick.map(|t| t.value), Some(frame.value));
        assert_eq!(driver.device.0.len(), 2);
    }

    #[test]
    fn test_new_snapshot_applies_next_tick() {
        let (mut driver, tx, _live) = driver(Script::new(&[&["d"], &["d"]]), Settings::default());
        driver.tick_once().unwrap();
        tx.send(Arc::new(Settings {
            sensitivity: 30,
            ..Settings::default()
        }))
        .unwrap();
        driver.tick_once().unwrap();
        assert!((driver.value() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_bad_snapshot_skips_tick() {
        let (mut driver, tx, _live) =
            driver(Script::new(&[&["d"], &["d"], &["d"]]), Settings::default());
        driver.tick_once().unwrap();
        tx.send(Arc::new(Settings {
            countersteer_multiplier: f64::NAN,
            ..Settings::default()
        }))
        .unwrap();
        assert_eq!(driver.tick_once().unwrap(), None);
        assert!((driver.value() - 0.1).abs() < 1e-9);
        assert_eq!(driver.device.0.len(), 1);

        tx.send(Arc::new(Settings::default())).unwrap();
        driver.tick_once().unwrap();
        assert!((driver.value() - 0.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_run_ticks_on_interval() {
        let (driver, _tx, mut live) = driver(
            Script::new(&[&["d"], &["d"], &["d"], &["d"], &["d"]]),
            Settings::default(),
        );
        let handle = tokio::spawn(driver.run());
        live.changed().await.unwrap();
        let first = live.borrow_and_update().tick.expect("tick recorded");
        assert!(first.value > 0.0);
        live.changed().await.unwrap();
        handle.abort();
    }
}
