//! Commande de déverrouillage : journalisation puis impulsion sur la gâche.

use crate::actuators::{ActuatorState, Output};
use crate::models::EventLogEntry;
use crate::telemetry::Telemetry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub struct LockController {
    actuators: Arc<ActuatorState>,
    telemetry: Arc<dyn Telemetry>,
    pulse: Duration,
}

impl LockController {
    pub fn new(actuators: Arc<ActuatorState>, telemetry: Arc<dyn Telemetry>, pulse: Duration) -> Self {
        Self { actuators, telemetry, pulse }
    }

    /// L'événement part AVANT l'activation du relais : il existe même si
    /// l'alimentation tombe pendant l'impulsion.
    pub async fn handle_unlock(&self) {
        self.telemetry.append_event(EventLogEntry::unlock_requested());

        info!(pulse_ms = self.pulse.as_millis() as u64, "pulsing lock");
        if let Err(e) = self.actuators.pulse(Output::Lock, self.pulse).await {
            error!("lock relay failed: {e}");
        }
    }
}
