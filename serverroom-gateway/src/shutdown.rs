//! Arrêt ordonné : exécuté sur tous les chemins de sortie une fois le matériel ouvert.
//!
//! Ordre : arrêt du contexte MQTT (une impulsion ou une capture en cours est
//! annulée), libération de la caméra, tous les relais à OFF, afficheur effacé.
//! La coupure forcée l'emporte toujours sur une action en cours.
//!
//! Le garde est créé juste après l'ouverture des relais ; caméra et abonné MQTT
//! y sont rattachés au fur et à mesure du démarrage. Sur `Drop` (sortie par
//! erreur), seule la partie synchrone est rejouée : l'afficheur n'est pas effacé.

use crate::actuators::ActuatorState;
use crate::display::{DisplayHandle, CLEAR};
use crate::evidence::EvidenceCapture;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

pub struct Teardown {
    actuators: Arc<ActuatorState>,
    display: DisplayHandle,
    evidence: Option<Arc<EvidenceCapture>>,
    subscriber: Option<JoinHandle<()>>,
    done: bool,
}

impl Teardown {
    pub fn new(actuators: Arc<ActuatorState>, display: DisplayHandle) -> Self {
        Self { actuators, display, evidence: None, subscriber: None, done: false }
    }

    pub fn attach_evidence(&mut self, evidence: Arc<EvidenceCapture>) {
        self.evidence = Some(evidence);
    }

    pub fn attach_subscriber(&mut self, subscriber: JoinHandle<()>) {
        self.subscriber = Some(subscriber);
    }

    /// Attend l'annulation effective du contexte MQTT avant de couper les relais
    pub async fn shutdown(mut self) {
        if let Some(subscriber) = self.subscriber.take() {
            subscriber.abort();
            let _ = subscriber.await;
        }
        self.release_hardware();
        self.display.show(CLEAR).await;
        info!("Cleanup complete.");
    }

    fn release_hardware(&mut self) {
        if self.done {
            return;
        }
        self.done = true;

        info!("Releasing camera and cleaning up resources...");
        if let Some(subscriber) = self.subscriber.take() {
            subscriber.abort();
        }
        if let Some(evidence) = &self.evidence {
            evidence.release();
        }
        self.actuators.all_off();
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        self.release_hardware();
    }
}
