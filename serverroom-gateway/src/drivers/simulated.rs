//! Périphériques simulés : `hardware.backend: simulated`.

use super::{Camera, ClimateSensor, Display, DriverError, Relay};
use crate::models::Measurement;
use async_trait::async_trait;
use tracing::info;

pub struct SimulatedRelay {
    name: &'static str,
    on: bool,
}

impl SimulatedRelay {
    pub fn new(name: &'static str) -> Self {
        Self { name, on: false }
    }
}

impl Relay for SimulatedRelay {
    fn set(&mut self, on: bool) -> Result<(), DriverError> {
        if self.on != on {
            info!(relay = self.name, on, "simulated relay");
        }
        self.on = on;
        Ok(())
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

/// Dérive en dents de scie de ±2 °C autour du seuil, pour voir le ventilateur basculer
pub struct SimulatedSensor {
    base: f32,
    step: u32,
}

impl SimulatedSensor {
    pub fn new(threshold: f32) -> Self {
        Self { base: threshold, step: 0 }
    }
}

#[async_trait]
impl ClimateSensor for SimulatedSensor {
    async fn read(&mut self) -> Result<Measurement, DriverError> {
        self.step = (self.step + 1) % 16;
        let offset = if self.step < 8 { self.step as f32 } else { (16 - self.step) as f32 };
        Ok(Measurement { temperature: self.base - 2.0 + offset * 0.5, humidity: 45.0 })
    }
}

#[derive(Default)]
pub struct SimulatedCamera {
    released: bool,
}

#[async_trait]
impl Camera for SimulatedCamera {
    async fn grab_frame(&mut self) -> Result<Vec<u8>, DriverError> {
        if self.released {
            return Err(DriverError::Released);
        }
        // en-tête/fin JPEG seulement : suffisant pour tracer le chemin du fichier
        Ok(vec![0xFF, 0xD8, 0xFF, 0xD9])
    }

    fn release(&mut self) {
        self.released = true;
    }
}

pub struct LogDisplay;

#[async_trait]
impl Display for LogDisplay {
    async fn show(&mut self, text: &str) -> Result<(), DriverError> {
        info!(display = %text.replace('\n', " | "), "display");
        Ok(())
    }
}
