/*!
# ServerRoom DevKit - Doubles de test pour la passerelle

Bibliothèque facilitant les tests de la passerelle sans matériel ni réseau :
- Relais, capteur, caméra et afficheur enregistreurs
- Télémétrie en mémoire
- Journal unique horodaté (ordre des effets, durées d'impulsion)
- Banc de test assemblant les contrôleurs réels
*/

pub mod hardware;
pub mod harness;
pub mod journal;
pub mod telemetry;

pub use hardware::{CameraCounters, RecordingDisplay, RecordingRelay, ScriptedCamera, ScriptedSensor, SensorFeed};
pub use harness::{init_test_logging, TestRig, TEST_FRAME};
pub use journal::{Journal, JournalEntry, Record};
pub use telemetry::RecordingTelemetry;
