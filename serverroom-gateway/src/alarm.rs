//! Réaction à l'ouverture de porte : buzzer, photo, alerte critique.

use crate::actuators::{ActuatorState, Output};
use crate::evidence::EvidenceCapture;
use crate::models::EventLogEntry;
use crate::telemetry::Telemetry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

pub struct AlarmController {
    actuators: Arc<ActuatorState>,
    evidence: Arc<EvidenceCapture>,
    telemetry: Arc<dyn Telemetry>,
    duration: Duration,
}

impl AlarmController {
    pub fn new(
        actuators: Arc<ActuatorState>,
        evidence: Arc<EvidenceCapture>,
        telemetry: Arc<dyn Telemetry>,
        duration: Duration,
    ) -> Self {
        Self { actuators, evidence, telemetry, duration }
    }

    /// Bloque l'appelant pendant toute la durée du buzzer puis de la capture.
    /// L'alerte est toujours émise, avec l'image seulement si la capture a réussi.
    pub async fn handle_door_open(&self) -> EventLogEntry {
        warn!(duration_ms = self.duration.as_millis() as u64, "door opened, sounding alarm");
        if let Err(e) = self.actuators.pulse(Output::Buzzer, self.duration).await {
            error!("buzzer failed: {e}");
        }

        let image_file = self.evidence.capture().await.map(|evidence| evidence.filename);
        let entry = EventLogEntry::door_alert(image_file);
        self.telemetry.append_event(entry.clone());
        entry
    }
}
