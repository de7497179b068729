/**
 * DRIVERS - Frontière entre la logique de contrôle et le matériel
 *
 * RÔLE :
 * Définit les interfaces minimales (relais, capteur, caméra, afficheur) que
 * le reste de la passerelle consomme. Aucun autre module ne touche un GPIO.
 *
 * ADAPTATEURS :
 * - sysfs : relais via /sys/class/gpio
 * - command : capteur, caméra et afficheur via des helpers externes
 * - simulated : banc de test sans matériel
 *
 * Les relais sont synchrones (une écriture sysfs). Capteur, caméra et afficheur
 * sont asynchrones : ils lancent des processus dont la durée est bornée.
 */

pub mod command;
pub mod simulated;
pub mod sysfs;

use crate::config::{Backend, GatewayConfig};
use async_trait::async_trait;
use crate::models::Measurement;

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("GPIO {pin}: {source}")]
    Gpio {
        pin: u32,
        #[source]
        source: std::io::Error,
    },
    #[error("helper '{program}' failed: {reason}")]
    Command { program: String, reason: String },
    #[error("helper '{program}' killed after {after_ms} ms")]
    Timeout { program: String, after_ms: u64 },
    #[error("no data from sensor")]
    NoData,
    #[error("no frame from camera")]
    NoFrame,
    #[error("camera released")]
    Released,
}

/// Sortie tout-ou-rien (ventilateur, buzzer, serrure)
pub trait Relay: Send {
    fn set(&mut self, on: bool) -> Result<(), DriverError>;
    /// Niveau réellement appliqué par la dernière écriture réussie
    fn is_on(&self) -> bool;
}

#[async_trait]
pub trait ClimateSensor: Send {
    async fn read(&mut self) -> Result<Measurement, DriverError>;
}

#[async_trait]
pub trait Camera: Send {
    /// Une image encodée, ou `NoFrame`
    async fn grab_frame(&mut self) -> Result<Vec<u8>, DriverError>;
    fn release(&mut self);
}

#[async_trait]
pub trait Display: Send {
    async fn show(&mut self, text: &str) -> Result<(), DriverError>;
}

/// Ensemble des périphériques d'une salle
pub struct Hardware {
    pub fan: Box<dyn Relay>,
    pub buzzer: Box<dyn Relay>,
    pub lock: Box<dyn Relay>,
    pub sensor: Box<dyn ClimateSensor>,
    pub camera: Box<dyn Camera>,
    pub display: Box<dyn Display>,
}

impl Hardware {
    pub fn open(cfg: &GatewayConfig) -> Result<Self, DriverError> {
        let hw = &cfg.hardware;
        let pins = &cfg.pins;
        let limit = hw.helper_timeout();
        let display: Box<dyn Display> = match &hw.display_command {
            Some(template) => Box::new(command::CommandDisplay::new(template, limit)),
            None => Box::new(simulated::LogDisplay),
        };

        match hw.backend {
            Backend::Sysfs => Ok(Self {
                fan: Box::new(sysfs::SysfsRelay::open_in(&hw.gpio_root, pins.fan_relay)?),
                buzzer: Box::new(sysfs::SysfsRelay::open_in(&hw.gpio_root, pins.buzzer)?),
                lock: Box::new(sysfs::SysfsRelay::open_in(&hw.gpio_root, pins.lock_relay)?),
                sensor: Box::new(command::CommandSensor::new(&hw.sensor_command, pins.dht, limit)),
                camera: Box::new(command::CommandCamera::new(&hw.camera_command, limit)),
                display,
            }),
            Backend::Simulated => Ok(Self {
                fan: Box::new(simulated::SimulatedRelay::new("fan")),
                buzzer: Box::new(simulated::SimulatedRelay::new("buzzer")),
                lock: Box::new(simulated::SimulatedRelay::new("lock")),
                sensor: Box::new(simulated::SimulatedSensor::new(cfg.climate.threshold_c)),
                camera: Box::new(simulated::SimulatedCamera::default()),
                display,
            }),
        }
    }
}
