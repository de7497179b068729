/**
 * CONFIGURATION - Paramètres de démarrage de la passerelle
 *
 * RÔLE :
 * Externalise tout ce qui était figé dans le script d'origine : broches GPIO,
 * seuil de température, durées d'impulsion, broker MQTT, topics, store distant.
 *
 * FONCTIONNEMENT :
 * - Fichier YAML ($SERVERROOM_CONFIG, sinon ./gateway.yaml), optionnel
 * - Surcharges par variables d'environnement (.env chargé via dotenvy)
 * - Validation avant usage : une config incohérente est fatale au démarrage
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Identifiant de salle utilisé dans les topics (`server-room/<id>/...`)
    pub room_id: String,
    pub pins: PinsConf,
    pub climate: ClimateConf,
    pub timing: TimingConf,
    pub mqtt: MqttConf,
    pub topics: TopicsConf,
    pub store: StoreConf,
    pub capture: CaptureConf,
    pub hardware: HardwareConf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PinsConf {
    pub dht: u32,
    pub buzzer: u32,
    pub fan_relay: u32,
    pub lock_relay: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateConf {
    /// Au-dessus : ventilateur ON ; en dessous ou égal : OFF
    pub threshold_c: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConf {
    pub tick_ms: u64,
    pub sensor_interval_secs: u64,
    pub history_interval_secs: u64,
    pub alarm_duration_ms: u64,
    pub lock_pulse_ms: u64,
    pub boot_delay_ms: u64,
    pub telemetry_drain_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConf {
    pub host: String,
    pub port: u16,
    pub client_id: Option<String>,
    pub keep_alive_secs: u64,
    pub reconnect_initial_ms: u64,
    pub reconnect_max_secs: u64,
}

/// Topics explicites ; sinon dérivés de `room_id`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicsConf {
    pub door: Option<String>,
    pub lock: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConf {
    /// Base de la realtime database (ex: https://<projet>.firebasedatabase.app)
    pub database_url: String,
    /// Jeton passé en `?auth=`, jamais écrit dans le YAML versionné
    #[serde(skip_serializing)]
    pub auth: Option<String>,
    pub request_timeout_secs: u64,
    /// Écritures en attente au-delà desquelles les nouvelles sont abandonnées
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConf {
    pub dir: PathBuf,
    pub extension: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// GPIO via /sys/class/gpio + helpers externes pour capteur/caméra
    Sysfs,
    /// Aucun accès matériel, pour un banc de test
    Simulated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConf {
    pub backend: Backend,
    pub gpio_root: PathBuf,
    /// Doit imprimer `<température> <humidité>` ; `{pin}` est substitué
    pub sensor_command: String,
    /// Doit écrire une image JPEG sur stdout
    pub camera_command: String,
    pub camera_warmup_ms: u64,
    /// Au-delà, le helper est tué et l'appel compte comme un échec
    pub helper_timeout_ms: u64,
    /// `{text}` est substitué ; absent = affichage dans les logs
    pub display_command: Option<String>,
}

/// Topics effectifs après résolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub door: String,
    pub lock: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            room_id: "01".into(),
            pins: PinsConf::default(),
            climate: ClimateConf::default(),
            timing: TimingConf::default(),
            mqtt: MqttConf::default(),
            topics: TopicsConf::default(),
            store: StoreConf::default(),
            capture: CaptureConf::default(),
            hardware: HardwareConf::default(),
        }
    }
}

impl Default for PinsConf {
    fn default() -> Self {
        Self { dht: 22, buzzer: 5, fan_relay: 16, lock_relay: 18 }
    }
}

impl Default for ClimateConf {
    fn default() -> Self {
        Self { threshold_c: 28.0 }
    }
}

impl Default for TimingConf {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            sensor_interval_secs: 5,
            history_interval_secs: 60,
            alarm_duration_ms: 1500,
            lock_pulse_ms: 2000,
            boot_delay_ms: 2000,
            telemetry_drain_secs: 3,
        }
    }
}

impl Default for MqttConf {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
            client_id: None,
            keep_alive_secs: 60,
            reconnect_initial_ms: 1000,
            reconnect_max_secs: 30,
        }
    }
}

impl Default for StoreConf {
    fn default() -> Self {
        // port par défaut de l'émulateur realtime database
        Self {
            database_url: "http://localhost:9000".into(),
            auth: None,
            request_timeout_secs: 10,
            queue_capacity: 32,
        }
    }
}

impl Default for CaptureConf {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self { dir: home.join("captures"), extension: "jpg".into() }
    }
}

impl Default for HardwareConf {
    fn default() -> Self {
        Self {
            backend: Backend::Sysfs,
            gpio_root: PathBuf::from("/sys/class/gpio"),
            sensor_command: "dht-read --model 11 --pin {pin}".into(),
            camera_command: "fswebcam --device /dev/video0 --no-banner --jpeg 90 -".into(),
            camera_warmup_ms: 1000,
            helper_timeout_ms: 5000,
            display_command: None,
        }
    }
}

impl TimingConf {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
    pub fn sensor_interval(&self) -> Duration {
        Duration::from_secs(self.sensor_interval_secs)
    }
    pub fn history_interval(&self) -> Duration {
        Duration::from_secs(self.history_interval_secs)
    }
    pub fn alarm_duration(&self) -> Duration {
        Duration::from_millis(self.alarm_duration_ms)
    }
    pub fn lock_pulse(&self) -> Duration {
        Duration::from_millis(self.lock_pulse_ms)
    }
}

impl HardwareConf {
    pub fn helper_timeout(&self) -> Duration {
        Duration::from_millis(self.helper_timeout_ms)
    }
}

impl GatewayConfig {
    /// Charge la config depuis $SERVERROOM_CONFIG (ou ./gateway.yaml) + environnement
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("SERVERROOM_CONFIG").unwrap_or_else(|_| "gateway.yaml".into());
        Self::load_from(Path::new(&path), |key| std::env::var(key).ok())
    }

    /// Variante testable : chemin explicite et source d'environnement injectée
    pub fn load_from<F>(path: &Path, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = if path.exists() {
            let txt = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            if txt.trim().is_empty() {
                GatewayConfig::default()
            } else {
                serde_yaml::from_str(&txt)?
            }
        } else {
            warn!(path = %path.display(), "no config file, using defaults");
            GatewayConfig::default()
        };

        cfg.apply_env(env)?;
        cfg.validate()?;
        info!(room = %cfg.room_id, broker = %cfg.mqtt.host, "configuration loaded");
        Ok(cfg)
    }

    fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = env("MQTT_HOST") {
            self.mqtt.host = host;
        }
        if let Some(port) = env("MQTT_PORT") {
            self.mqtt.port = port.parse().map_err(|_| ConfigError::Invalid {
                key: "MQTT_PORT",
                reason: format!("'{port}' is not a port number"),
            })?;
        }
        if let Some(url) = env("FIREBASE_URL") {
            self.store.database_url = url;
        }
        if let Some(auth) = env("FIREBASE_AUTH") {
            self.store.auth = Some(auth).filter(|a| !a.is_empty());
        }
        if let Some(dir) = env("CAPTURE_DIR") {
            self.capture.dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key, reason: &str| ConfigError::Invalid { key, reason: reason.to_string() };

        if !self.climate.threshold_c.is_finite() {
            return Err(invalid("climate.threshold_c", "must be a finite number"));
        }
        let t = &self.timing;
        for (key, value) in [
            ("timing.tick_ms", t.tick_ms),
            ("timing.sensor_interval_secs", t.sensor_interval_secs),
            ("timing.history_interval_secs", t.history_interval_secs),
            ("timing.alarm_duration_ms", t.alarm_duration_ms),
            ("timing.lock_pulse_ms", t.lock_pulse_ms),
            ("mqtt.keep_alive_secs", self.mqtt.keep_alive_secs),
            ("mqtt.reconnect_initial_ms", self.mqtt.reconnect_initial_ms),
            ("hardware.helper_timeout_ms", self.hardware.helper_timeout_ms),
            ("store.queue_capacity", self.store.queue_capacity as u64),
        ] {
            if value == 0 {
                return Err(invalid(key, "must be greater than zero"));
            }
        }
        if t.tick() >= t.sensor_interval() {
            return Err(invalid("timing.tick_ms", "must be shorter than the sensor interval"));
        }
        if Duration::from_millis(self.mqtt.reconnect_initial_ms)
            > Duration::from_secs(self.mqtt.reconnect_max_secs)
        {
            return Err(invalid("mqtt.reconnect_max_secs", "must be >= reconnect_initial_ms"));
        }
        if self.store.database_url.trim().is_empty() {
            return Err(invalid("store.database_url", "must not be empty"));
        }
        if self.capture.extension.is_empty() || self.capture.extension.contains(['/', '.']) {
            return Err(invalid("capture.extension", "must be a bare extension like 'jpg'"));
        }

        let topics = self.topics();
        if topics.door.is_empty() || topics.lock.is_empty() {
            return Err(invalid("topics", "topics must not be empty"));
        }
        if topics.door == topics.lock {
            return Err(invalid("topics", "door and lock topics must differ"));
        }
        Ok(())
    }

    pub fn topics(&self) -> Topics {
        let room = &self.room_id;
        Topics {
            door: self
                .topics
                .door
                .clone()
                .unwrap_or_else(|| format!("server-room/{room}/status/door")),
            lock: self
                .topics
                .lock
                .clone()
                .unwrap_or_else(|| format!("server-room/{room}/commands/lock")),
        }
    }

    pub fn mqtt_client_id(&self) -> String {
        self.mqtt
            .client_id
            .clone()
            .unwrap_or_else(|| format!("serverroom-gateway-{}", self.room_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_match_original_wiring() {
        let cfg = GatewayConfig::default();
        assert_eq!(cfg.pins.fan_relay, 16);
        assert_eq!(cfg.pins.lock_relay, 18);
        assert_eq!(cfg.pins.buzzer, 5);
        assert_eq!(cfg.climate.threshold_c, 28.0);
        assert_eq!(cfg.timing.lock_pulse(), Duration::from_secs(2));
        assert_eq!(cfg.timing.alarm_duration(), Duration::from_millis(1500));
        assert_eq!(cfg.mqtt.port, 1883);
        assert_eq!(cfg.hardware.helper_timeout(), Duration::from_secs(5));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_topics_derived_from_room() {
        let mut cfg = GatewayConfig::default();
        cfg.room_id = "07".into();
        let topics = cfg.topics();
        assert_eq!(topics.door, "server-room/07/status/door");
        assert_eq!(topics.lock, "server-room/07/commands/lock");
        assert_eq!(cfg.mqtt_client_id(), "serverroom-gateway-07");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = GatewayConfig::load_from(&dir.path().join("absent.yaml"), no_env).unwrap();
        assert_eq!(cfg.room_id, "01");
    }

    #[test]
    fn test_yaml_partial_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.yaml");
        std::fs::write(
            &path,
            "room_id: \"02\"\nclimate:\n  threshold_c: 26.5\ntiming:\n  lock_pulse_ms: 3000\n",
        )
        .unwrap();

        let cfg = GatewayConfig::load_from(&path, no_env).unwrap();
        assert_eq!(cfg.room_id, "02");
        assert_eq!(cfg.climate.threshold_c, 26.5);
        assert_eq!(cfg.timing.lock_pulse(), Duration::from_secs(3));
        // champs absents conservent leur valeur par défaut
        assert_eq!(cfg.timing.alarm_duration_ms, 1500);
    }

    #[test]
    fn test_env_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("MQTT_HOST", "broker.lan"),
            ("MQTT_PORT", "8883"),
            ("FIREBASE_AUTH", "secret"),
            ("CAPTURE_DIR", "/var/lib/captures"),
        ]);
        let cfg = GatewayConfig::load_from(&dir.path().join("none.yaml"), |k| {
            env.get(k).map(|v| v.to_string())
        })
        .unwrap();
        assert_eq!(cfg.mqtt.host, "broker.lan");
        assert_eq!(cfg.mqtt.port, 8883);
        assert_eq!(cfg.store.auth.as_deref(), Some("secret"));
        assert_eq!(cfg.capture.dir, PathBuf::from("/var/lib/captures"));
    }

    #[test]
    fn test_bad_port_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = GatewayConfig::load_from(&dir.path().join("none.yaml"), |k| {
            (k == "MQTT_PORT").then(|| "not-a-port".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "MQTT_PORT", .. }));
    }

    #[test]
    fn test_validation_rejects_inconsistent_values() {
        let mut cfg = GatewayConfig::default();
        cfg.timing.lock_pulse_ms = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = GatewayConfig::default();
        cfg.climate.threshold_c = f32::NAN;
        assert!(cfg.validate().is_err());

        let mut cfg = GatewayConfig::default();
        cfg.timing.tick_ms = 5000;
        assert!(cfg.validate().is_err());

        let mut cfg = GatewayConfig::default();
        cfg.topics.lock = Some("server-room/01/status/door".into());
        assert!(cfg.validate().is_err());

        let mut cfg = GatewayConfig::default();
        cfg.hardware.helper_timeout_ms = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { key: "hardware.helper_timeout_ms", .. })
        ));

        let mut cfg = GatewayConfig::default();
        cfg.store.queue_capacity = 0;
        assert!(cfg.validate().is_err());
    }
}
