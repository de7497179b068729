//! Textes envoyés à l'afficheur LCD 2 lignes.

use crate::drivers::Display;
use crate::models::SensorReading;
use crate::state::{new_state, Shared};
use tracing::warn;

pub const BOOTING: &str = "System Booting...";
pub const SENSOR_ERROR: &str = "Sensor Error...";
pub const CLEAR: &str = "";

/// Afficheur partagé par la boucle de scrutation, le boot et l'arrêt
#[derive(Clone)]
pub struct DisplayHandle {
    inner: Shared<Box<dyn Display>>,
}

impl DisplayHandle {
    pub fn new(display: Box<dyn Display>) -> Self {
        Self { inner: new_state(display) }
    }

    /// Un afficheur en panne ou lent n'arrête jamais la passerelle
    pub async fn show(&self, text: &str) {
        let mut display = self.inner.lock().await;
        if let Err(e) = display.show(text).await {
            warn!("display update failed: {e}");
        }
    }
}

pub fn render_reading(reading: &SensorReading) -> String {
    format!("Temp: {:.1}\u{b0}C\nHumi: {:.1}%", reading.temperature, reading.humidity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_reading() {
        let reading = SensorReading { timestamp: 0, temperature: 23.44, humidity: 45.0 };
        assert_eq!(render_reading(&reading), "Temp: 23.4°C\nHumi: 45.0%");
    }
}
