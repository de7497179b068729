/*!
Doubles des périphériques pour tests sans matériel

- `RecordingRelay` : écrit chaque bascule dans le journal
- `ScriptedSensor` : rejoue une suite de mesures (ou d'échecs) poussées par le test
- `ScriptedCamera` : caméra qui fonctionne, échoue ou reste bloquée ; compte les prises
- `RecordingDisplay` : garde chaque texte affiché
*/

use crate::journal::{Journal, Record};
use async_trait::async_trait;
use parking_lot::Mutex;
use serverroom_gateway::drivers::{Camera, ClimateSensor, Display, DriverError, Relay};
use serverroom_gateway::models::Measurement;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub struct RecordingRelay {
    name: &'static str,
    on: bool,
    journal: Journal,
}

impl RecordingRelay {
    pub fn new(name: &'static str, journal: &Journal) -> Self {
        Self { name, on: false, journal: journal.clone() }
    }
}

impl Relay for RecordingRelay {
    fn set(&mut self, on: bool) -> Result<(), DriverError> {
        self.on = on;
        self.journal.push(Record::Relay { name: self.name, on });
        Ok(())
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

/// Côté test du capteur scripté : `Some` = mesure, `None` = lecture ratée
#[derive(Clone, Default)]
pub struct SensorFeed {
    queue: Arc<Mutex<VecDeque<Option<Measurement>>>>,
    reads: Arc<AtomicUsize>,
}

impl SensorFeed {
    pub fn push(&self, temperature: f32, humidity: f32) {
        self.queue.lock().push_back(Some(Measurement { temperature, humidity }));
    }

    pub fn push_failure(&self) {
        self.queue.lock().push_back(None);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

/// File vide = échec de lecture, comme un DHT qui ne répond pas
pub struct ScriptedSensor {
    feed: SensorFeed,
}

impl ScriptedSensor {
    pub fn new() -> (Self, SensorFeed) {
        let feed = SensorFeed::default();
        (Self::with_feed(feed.clone()), feed)
    }

    /// Plusieurs capteurs peuvent lire la même file (un par scheduler créé)
    pub fn with_feed(feed: SensorFeed) -> Self {
        Self { feed }
    }
}

#[async_trait]
impl ClimateSensor for ScriptedSensor {
    async fn read(&mut self) -> Result<Measurement, DriverError> {
        self.feed.reads.fetch_add(1, Ordering::SeqCst);
        self.feed.queue.lock().pop_front().flatten().ok_or(DriverError::NoData)
    }
}

#[derive(Clone, Default)]
pub struct CameraCounters {
    grabs: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
}

impl CameraCounters {
    pub fn grabs(&self) -> usize {
        self.grabs.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

enum Shot {
    Frame(Vec<u8>),
    Broken,
    Hangs,
}

pub struct ScriptedCamera {
    shot: Shot,
    counters: CameraCounters,
}

impl ScriptedCamera {
    pub fn working(frame: &[u8]) -> (Self, CameraCounters) {
        let counters = CameraCounters::default();
        (Self { shot: Shot::Frame(frame.to_vec()), counters: counters.clone() }, counters)
    }

    pub fn broken() -> (Self, CameraCounters) {
        let counters = CameraCounters::default();
        (Self { shot: Shot::Broken, counters: counters.clone() }, counters)
    }

    /// Prise qui ne se termine jamais, comme une webcam USB figée
    pub fn hanging() -> (Self, CameraCounters) {
        let counters = CameraCounters::default();
        (Self { shot: Shot::Hangs, counters: counters.clone() }, counters)
    }
}

#[async_trait]
impl Camera for ScriptedCamera {
    async fn grab_frame(&mut self) -> Result<Vec<u8>, DriverError> {
        self.counters.grabs.fetch_add(1, Ordering::SeqCst);
        if self.counters.released() {
            return Err(DriverError::Released);
        }
        match &self.shot {
            Shot::Frame(frame) => Ok(frame.clone()),
            Shot::Broken => Err(DriverError::NoFrame),
            Shot::Hangs => std::future::pending().await,
        }
    }

    fn release(&mut self) {
        self.counters.released.store(true, Ordering::SeqCst);
    }
}

pub struct RecordingDisplay {
    journal: Journal,
}

impl RecordingDisplay {
    pub fn new(journal: &Journal) -> Self {
        Self { journal: journal.clone() }
    }
}

#[async_trait]
impl Display for RecordingDisplay {
    async fn show(&mut self, text: &str) -> Result<(), DriverError> {
        self.journal.push(Record::Display(text.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[tokio::test]
    async fn test_scripted_sensor_replays_then_fails() {
        let (mut sensor, feed) = ScriptedSensor::new();
        feed.push(24.0, 40.0);
        feed.push_failure();

        assert_eq!(sensor.read().await.unwrap().temperature, 24.0);
        assert!(matches!(sensor.read().await, Err(DriverError::NoData)));
        assert!(matches!(sensor.read().await, Err(DriverError::NoData)));
        assert_eq!(feed.reads(), 3);
    }

    #[tokio::test]
    async fn test_scripted_camera_refuses_after_release() {
        let (mut camera, counters) = ScriptedCamera::working(&[1, 2, 3]);
        assert_eq!(camera.grab_frame().await.unwrap(), vec![1, 2, 3]);
        camera.release();
        assert!(counters.released());
        assert!(matches!(camera.grab_frame().await, Err(DriverError::Released)));
        assert_eq!(counters.grabs(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_camera_never_returns() {
        let (mut camera, counters) = ScriptedCamera::hanging();
        let grab = tokio::time::timeout(Duration::from_secs(60), camera.grab_frame()).await;
        assert!(grab.is_err());
        assert_eq!(counters.grabs(), 1);
    }

    #[test]
    fn test_recording_relay_tracks_state() {
        let journal = Journal::new();
        let mut relay = RecordingRelay::new("fan", &journal);
        relay.set(true).unwrap();
        assert!(relay.is_on());
        assert_eq!(journal.records(), vec![Record::Relay { name: "fan", on: true }]);
    }
}
