//! Documents échangés avec le store distant (`system_status`, `sensor_history`, `event_logs`).

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Horodatage epoch en secondes, format attendu par le store
pub fn epoch_now() -> i64 {
    Utc::now().timestamp()
}

/// Mesure brute renvoyée par le capteur DHT
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub temperature: f32,
    pub humidity: f32,
}

/// Lecture réussie du capteur, jamais persistée telle quelle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub timestamp: i64,
    pub temperature: f32,
    pub humidity: f32,
}

impl SensorReading {
    pub fn new(measurement: Measurement, timestamp: i64) -> Self {
        Self {
            timestamp,
            temperature: measurement.temperature,
            humidity: measurement.humidity,
        }
    }
}

/// Slot unique `system_status`, écrasé à chaque lecture réussie
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub timestamp: i64,
    pub temperature: f32,
    pub humidity: f32,
    pub fan_on: bool,
}

/// Échantillon ajouté à `sensor_history` (au plus un par fenêtre)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub timestamp: i64,
    pub temperature: f32,
    pub humidity: f32,
}

impl HistorySample {
    pub fn from_reading(reading: &SensorReading, timestamp: i64) -> Self {
        Self {
            timestamp,
            temperature: reading.temperature,
            humidity: reading.humidity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    FanControl,
    DoorAlert,
    LockControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventLevel {
    Info,
    Critical,
}

/// Entrée append-only de `event_logs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub level: EventLevel,
    pub message: String,
    /// Présent uniquement sur DOOR_ALERT quand la capture a réussi
    #[serde(rename = "imageFile", default, skip_serializing_if = "Option::is_none")]
    pub image_file: Option<String>,
}

impl EventLogEntry {
    fn new(kind: EventType, level: EventLevel, message: &str) -> Self {
        Self {
            timestamp: epoch_now(),
            kind,
            level,
            message: message.to_string(),
            image_file: None,
        }
    }

    pub fn fan(on: bool) -> Self {
        let message = if on { "Fan turned ON" } else { "Fan turned OFF" };
        Self::new(EventType::FanControl, EventLevel::Info, message)
    }

    pub fn door_alert(image_file: Option<String>) -> Self {
        Self {
            image_file,
            ..Self::new(EventType::DoorAlert, EventLevel::Critical, "Door has been opened!")
        }
    }

    pub fn unlock_requested() -> Self {
        Self::new(EventType::LockControl, EventLevel::Info, "Unlock command received.")
    }
}
