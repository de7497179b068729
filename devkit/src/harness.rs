/*!
Banc de test de la passerelle

Assemble les vrais contrôleurs (climat, alarme, serrure, scheduler) sur des
périphériques enregistreurs et une télémétrie en mémoire. Tout ce qui sort de
la passerelle finit dans un seul `Journal`, horodaté sur l'horloge tokio.
*/

use crate::hardware::{CameraCounters, RecordingDisplay, RecordingRelay, ScriptedCamera, ScriptedSensor, SensorFeed};
use crate::journal::Journal;
use crate::telemetry::RecordingTelemetry;
use serverroom_gateway::actuators::ActuatorState;
use serverroom_gateway::alarm::AlarmController;
use serverroom_gateway::climate::ClimateController;
use serverroom_gateway::config::GatewayConfig;
use serverroom_gateway::display::DisplayHandle;
use serverroom_gateway::drivers::Camera;
use serverroom_gateway::evidence::EvidenceCapture;
use serverroom_gateway::lock::LockController;
use serverroom_gateway::mqtt::{DispatchTable, Dispatcher};
use serverroom_gateway::scheduler::Scheduler;
use serverroom_gateway::telemetry::Telemetry;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Image JPEG minimale renvoyée par la caméra de test
pub const TEST_FRAME: &[u8] = &[0xFF, 0xD8, 0xFF, 0xD9];

pub struct TestRig {
    pub config: GatewayConfig,
    pub journal: Journal,
    pub actuators: Arc<ActuatorState>,
    pub telemetry: Arc<RecordingTelemetry>,
    pub evidence: Arc<EvidenceCapture>,
    pub camera: CameraCounters,
    pub sensor: SensorFeed,
    pub display: DisplayHandle,
    capture_dir: TempDir,
}

impl TestRig {
    /// Configuration par défaut (seuil 28 °C, buzzer 1,5 s, serrure 2 s), caméra fonctionnelle
    pub fn new() -> std::io::Result<Self> {
        let (camera, counters) = ScriptedCamera::working(TEST_FRAME);
        Self::build(Box::new(camera), counters)
    }

    pub fn with_broken_camera() -> std::io::Result<Self> {
        let (camera, counters) = ScriptedCamera::broken();
        Self::build(Box::new(camera), counters)
    }

    /// Chaque prise reste bloquée jusqu'à annulation de la tâche
    pub fn with_hanging_camera() -> std::io::Result<Self> {
        let (camera, counters) = ScriptedCamera::hanging();
        Self::build(Box::new(camera), counters)
    }

    fn build(camera: Box<dyn Camera>, counters: CameraCounters) -> std::io::Result<Self> {
        init_test_logging();

        let capture_dir = tempfile::tempdir()?;
        let mut config = GatewayConfig::default();
        config.capture.dir = capture_dir.path().to_path_buf();

        let journal = Journal::new();
        let actuators = Arc::new(ActuatorState::new(
            Box::new(RecordingRelay::new("fan", &journal)),
            Box::new(RecordingRelay::new("buzzer", &journal)),
            Box::new(RecordingRelay::new("lock", &journal)),
        ));
        let evidence = Arc::new(EvidenceCapture::new(camera, capture_dir.path(), &config.capture.extension)?);
        let display = DisplayHandle::new(Box::new(RecordingDisplay::new(&journal)));

        Ok(Self {
            telemetry: Arc::new(RecordingTelemetry::new(&journal)),
            sensor: SensorFeed::default(),
            camera: counters,
            config,
            journal,
            actuators,
            evidence,
            display,
            capture_dir,
        })
    }

    pub fn capture_dir(&self) -> &Path {
        self.capture_dir.path()
    }

    fn telemetry_dyn(&self) -> Arc<dyn Telemetry> {
        self.telemetry.clone()
    }

    pub fn alarm(&self) -> AlarmController {
        AlarmController::new(
            self.actuators.clone(),
            self.evidence.clone(),
            self.telemetry_dyn(),
            self.config.timing.alarm_duration(),
        )
    }

    pub fn lock(&self) -> LockController {
        LockController::new(self.actuators.clone(), self.telemetry_dyn(), self.config.timing.lock_pulse())
    }

    pub fn climate(&self) -> ClimateController {
        ClimateController::new(self.config.climate.threshold_c, self.actuators.clone(), self.telemetry_dyn())
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(DispatchTable::new(&self.config.topics()), self.alarm(), self.lock())
    }

    /// Le scheduler lit la file `self.sensor` alimentée par le test
    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(
            &self.config.timing,
            Box::new(ScriptedSensor::with_feed(self.sensor.clone())),
            self.display.clone(),
            self.climate(),
            self.actuators.clone(),
            self.telemetry_dyn(),
        )
    }
}

/// Logs visibles avec `RUST_LOG=debug cargo test -- --nocapture`
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
