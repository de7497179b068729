/**
 * SCHEDULER - Boucle de scrutation principale
 *
 * RÔLE :
 * Tâche unique cadencée (100 ms par défaut) qui vérifie deux minuteries
 * indépendantes : lecture capteur (5 s) et historique (60 s).
 *
 * FONCTIONNEMENT :
 * - Lecture réussie -> afficheur, régulation ventilateur, statut distant
 * - Lecture ratée -> "Sensor Error..." à l'écran uniquement ; la minuterie
 *   n'est pas réarmée, la lecture est retentée au tick suivant
 * - Historique : au plus un échantillon par fenêtre, issu d'une lecture prise
 *   depuis le début de la fenêtre ; sinon le tick est simplement sauté
 */

use crate::actuators::ActuatorState;
use crate::climate::ClimateController;
use crate::config::TimingConf;
use crate::display::{render_reading, DisplayHandle, SENSOR_ERROR};
use crate::drivers::ClimateSensor;
use crate::models::{epoch_now, HistorySample, SensorReading, SystemStatus};
use crate::telemetry::Telemetry;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Minuteries de la boucle, sans aucune I/O
#[derive(Debug, Clone)]
pub struct PollTimers {
    sensor_interval: Duration,
    history_interval: Duration,
    last_sensor: Option<Instant>,
    history_window: Option<Instant>,
    latest: Option<(Instant, SensorReading)>,
}

impl PollTimers {
    pub fn new(sensor_interval: Duration, history_interval: Duration) -> Self {
        Self {
            sensor_interval,
            history_interval,
            last_sensor: None,
            history_window: None,
            latest: None,
        }
    }

    /// Première lecture immédiate, puis toutes les `sensor_interval` après une réussite
    pub fn sensor_due(&self, now: Instant) -> bool {
        self.last_sensor
            .map_or(true, |last| now.saturating_duration_since(last) >= self.sensor_interval)
    }

    pub fn record_reading(&mut self, now: Instant, reading: SensorReading) {
        self.last_sensor = Some(now);
        self.latest = Some((now, reading));
    }

    /// Lecture à historiser si la fenêtre courante est échue ; ouvre alors la suivante
    pub fn take_history(&mut self, now: Instant) -> Option<SensorReading> {
        if let Some(start) = self.history_window {
            if now.saturating_duration_since(start) < self.history_interval {
                return None;
            }
        }
        let (taken_at, reading) = self.latest?;
        if self.history_window.is_some_and(|start| taken_at <= start) {
            // lecture déjà historisée ou antérieure à la fenêtre : on attend une mesure fraîche
            return None;
        }
        self.history_window = Some(now);
        Some(reading)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorPoll {
    Idle,
    Read(SensorReading),
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub sensor: SensorPoll,
    pub history: Option<HistorySample>,
}

pub struct Scheduler {
    timers: PollTimers,
    tick: Duration,
    sensor: Box<dyn ClimateSensor>,
    display: DisplayHandle,
    climate: ClimateController,
    actuators: Arc<ActuatorState>,
    telemetry: Arc<dyn Telemetry>,
}

impl Scheduler {
    pub fn new(
        timing: &TimingConf,
        sensor: Box<dyn ClimateSensor>,
        display: DisplayHandle,
        climate: ClimateController,
        actuators: Arc<ActuatorState>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self {
            timers: PollTimers::new(timing.sensor_interval(), timing.history_interval()),
            tick: timing.tick(),
            sensor,
            display,
            climate,
            actuators,
            telemetry,
        }
    }

    /// Ne rend jamais la main : la tâche est arrêtée de l'extérieur
    pub async fn run(mut self) {
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("System is running.");

        loop {
            let now = ticker.tick().await;
            self.tick(now).await;
        }
    }

    pub async fn tick(&mut self, now: Instant) -> TickReport {
        let sensor = if self.timers.sensor_due(now) {
            self.poll_sensor(now).await
        } else {
            SensorPoll::Idle
        };

        let history = self.timers.take_history(now).map(|reading| {
            let sample = HistorySample::from_reading(&reading, epoch_now());
            self.telemetry.append_history(sample);
            debug!(temperature = sample.temperature, "history sample queued");
            sample
        });

        TickReport { sensor, history }
    }

    async fn poll_sensor(&mut self, now: Instant) -> SensorPoll {
        match self.sensor.read().await {
            Ok(measurement) => {
                let reading = SensorReading::new(measurement, epoch_now());
                self.timers.record_reading(now, reading);
                self.display.show(&render_reading(&reading)).await;

                self.climate.evaluate(reading.temperature);
                // relu après la régulation : jamais une valeur en cache
                let status = SystemStatus {
                    timestamp: reading.timestamp,
                    temperature: reading.temperature,
                    humidity: reading.humidity,
                    fan_on: self.actuators.fan_on(),
                };
                self.telemetry.set_status(status);
                SensorPoll::Read(reading)
            }
            Err(e) => {
                warn!("sensor read failed: {e}");
                self.display.show(SENSOR_ERROR).await;
                SensorPoll::Failed
            }
        }
    }
}
