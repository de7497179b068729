/**
 * APP - Assemblage et cycle de vie de la passerelle
 *
 * RÔLE :
 * Ouvre le matériel, démarre la télémétrie et le contexte MQTT, exécute la
 * séquence de boot puis la boucle de scrutation jusqu'à Ctrl+C, SIGTERM ou
 * erreur fatale. L'arrêt ordonné est garanti dès que le matériel est ouvert.
 */

use crate::actuators::ActuatorState;
use crate::alarm::AlarmController;
use crate::climate::ClimateController;
use crate::config::GatewayConfig;
use crate::display::{DisplayHandle, BOOTING};
use crate::drivers::Hardware;
use crate::evidence::EvidenceCapture;
use crate::health::LinkHealth;
use crate::lock::LockController;
use crate::mqtt::{mqtt_options, run_subscriber, Backoff, DispatchTable, Dispatcher};
use crate::scheduler::Scheduler;
use crate::shutdown::Teardown;
use crate::telemetry::{FirebaseStore, QueuedTelemetry, Telemetry};
use anyhow::Context;
use rumqttc::AsyncClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

pub async fn run(cfg: GatewayConfig) -> anyhow::Result<()> {
    info!("Initializing hardware peripherals...");
    let Hardware { fan, buzzer, lock, sensor, camera, display } =
        Hardware::open(&cfg).context("failed to open hardware")?;
    let actuators = Arc::new(ActuatorState::new(fan, buzzer, lock));
    let display = DisplayHandle::new(display);
    // à partir d'ici, toute sortie (même par `?`) coupe les relais
    let mut teardown = Teardown::new(actuators.clone(), display.clone());

    info!("Initializing camera...");
    let evidence = Arc::new(
        EvidenceCapture::new(camera, &cfg.capture.dir, &cfg.capture.extension)
            .with_context(|| format!("cannot create {}", cfg.capture.dir.display()))?,
    );
    teardown.attach_evidence(evidence.clone());
    // la webcam renvoie des images noires juste après ouverture
    tokio::time::sleep(Duration::from_millis(cfg.hardware.camera_warmup_ms)).await;

    let store = FirebaseStore::new(&cfg.store).context("failed to build store client")?;
    let (telemetry, writer) = QueuedTelemetry::spawn(store, cfg.store.queue_capacity);
    let shared_telemetry: Arc<dyn Telemetry> = Arc::new(telemetry.clone());

    let timing = &cfg.timing;
    let dispatcher = Dispatcher::new(
        DispatchTable::new(&cfg.topics()),
        AlarmController::new(
            actuators.clone(),
            evidence.clone(),
            shared_telemetry.clone(),
            timing.alarm_duration(),
        ),
        LockController::new(actuators.clone(), shared_telemetry.clone(), timing.lock_pulse()),
    );

    let (client, eventloop) = AsyncClient::new(mqtt_options(&cfg.mqtt_client_id(), &cfg.mqtt), 10);
    let link = LinkHealth::new();
    let backoff = Backoff::new(
        Duration::from_millis(cfg.mqtt.reconnect_initial_ms),
        Duration::from_secs(cfg.mqtt.reconnect_max_secs),
    );
    teardown.attach_subscriber(tokio::spawn(run_subscriber(
        client,
        eventloop,
        dispatcher,
        link.clone(),
        backoff,
    )));

    display.show(BOOTING).await;
    tokio::time::sleep(Duration::from_millis(timing.boot_delay_ms)).await;
    actuators.all_off();

    let scheduler = Scheduler::new(
        timing,
        sensor,
        display.clone(),
        ClimateController::new(cfg.climate.threshold_c, actuators.clone(), shared_telemetry.clone()),
        actuators.clone(),
        shared_telemetry,
    );

    let mut sigterm = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    let outcome = tokio::select! {
        () = scheduler.run() => Err(anyhow::anyhow!("control loop stopped")),
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected. Shutting down.");
            Ok(())
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Shutting down.");
            Ok(())
        }
    };

    teardown.shutdown().await;
    let report = link.report();
    info!(
        uptime_s = report.uptime_seconds,
        reconnects = report.mqtt_reconnects,
        last_status = ?report.mqtt_status,
        "MQTT link closed"
    );

    if !telemetry.drain(Duration::from_secs(timing.telemetry_drain_secs)).await {
        warn!("pending telemetry writes abandoned at shutdown");
    }
    drop(telemetry);
    writer.abort();

    outcome
}
