/**
 * TELEMETRY - Miroir de l'état et des événements vers le store distant
 *
 * RÔLE :
 * Trois écritures indépendantes : statut (écrasé), historique (ajout),
 * journal d'événements (ajout). Toutes en "fire-and-forget".
 *
 * FONCTIONNEMENT :
 * - Les appelants déposent l'écriture dans une file, sans jamais attendre le réseau
 * - Une tâche unique vide la file et parle au store : un seul client HTTP partagé,
 *   ordre d'arrivée conservé
 * - Chaque écriture est tentée UNE fois ; un échec est loggé puis abandonné
 *   (pas de file de rejeu, perte acceptée)
 * - File bornée : store lent ou injoignable -> les nouvelles écritures sont
 *   abandonnées plutôt que d'accumuler un retard croissant
 */

use crate::config::StoreConf;
use crate::models::{EventLogEntry, HistorySample, SystemStatus};
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Ce que la boucle de contrôle et les handlers voient du store
pub trait Telemetry: Send + Sync {
    fn set_status(&self, status: SystemStatus);
    fn append_history(&self, sample: HistorySample);
    fn append_event(&self, entry: EventLogEntry);
}

#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryWrite {
    Status(SystemStatus),
    History(HistorySample),
    Event(EventLogEntry),
}

impl TelemetryWrite {
    /// Chemin dans le store
    pub fn path(&self) -> &'static str {
        match self {
            TelemetryWrite::Status(_) => "system_status",
            TelemetryWrite::History(_) => "sensor_history",
            TelemetryWrite::Event(_) => "event_logs",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store rejected write to {path}: status {status}")]
    Rejected { path: &'static str, status: u16 },
}

pub trait RemoteStore: Send + Sync + 'static {
    fn write(&self, write: &TelemetryWrite) -> impl Future<Output = Result<(), StoreError>> + Send;
}

enum Job {
    Write(TelemetryWrite),
    Drain(oneshot::Sender<()>),
}

/// Implémentation de production : file + tâche d'écriture
#[derive(Clone)]
pub struct QueuedTelemetry {
    tx: mpsc::Sender<Job>,
}

impl QueuedTelemetry {
    /// Démarre la tâche d'écriture ; elle s'arrête quand toutes les copies sont droppées.
    /// Au plus `capacity` écritures attendent le store (minimum 1).
    pub fn spawn<S: RemoteStore>(store: S, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Job>(capacity.max(1));
        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match job {
                    Job::Write(write) => match store.write(&write).await {
                        Ok(()) => {
                            if let TelemetryWrite::Event(entry) = &write {
                                info!(kind = ?entry.kind, "event logged: {}", entry.message);
                            } else {
                                debug!(path = write.path(), "telemetry written");
                            }
                        }
                        Err(e) => error!(path = write.path(), "telemetry write dropped: {e}"),
                    },
                    Job::Drain(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!("telemetry writer stopped");
        });
        (Self { tx }, handle)
    }

    fn enqueue(&self, write: TelemetryWrite) {
        match self.tx.try_send(Job::Write(write)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(Job::Write(write))) => {
                warn!(path = write.path(), "telemetry queue full, write dropped");
            }
            Err(_) => warn!("telemetry writer gone, write dropped"),
        }
    }

    /// Attend que les écritures déjà en file soient tentées, au plus `limit`
    pub async fn drain(&self, limit: Duration) -> bool {
        let (done, wait) = oneshot::channel();
        let drained = async {
            self.tx.send(Job::Drain(done)).await.ok()?;
            wait.await.ok()
        };
        matches!(tokio::time::timeout(limit, drained).await, Ok(Some(())))
    }
}

impl Telemetry for QueuedTelemetry {
    fn set_status(&self, status: SystemStatus) {
        self.enqueue(TelemetryWrite::Status(status));
    }

    fn append_history(&self, sample: HistorySample) {
        self.enqueue(TelemetryWrite::History(sample));
    }

    fn append_event(&self, entry: EventLogEntry) {
        self.enqueue(TelemetryWrite::Event(entry));
    }
}

/// Realtime database exposée en REST : `PUT` pour écraser, `POST` pour ajouter
pub struct FirebaseStore {
    client: reqwest::Client,
    base_url: String,
    auth: Option<String>,
}

impl FirebaseStore {
    pub fn new(cfg: &StoreConf) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.database_url.trim_end_matches('/').to_string(),
            auth: cfg.auth.clone(),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path)
    }
}

impl RemoteStore for FirebaseStore {
    async fn write(&self, write: &TelemetryWrite) -> Result<(), StoreError> {
        let url = self.endpoint(write.path());
        let request = match write {
            TelemetryWrite::Status(status) => self.client.put(&url).json(status),
            TelemetryWrite::History(sample) => self.client.post(&url).json(sample),
            TelemetryWrite::Event(entry) => self.client.post(&url).json(entry),
        };
        let request = match &self.auth {
            Some(token) => request.query(&[("auth", token)]),
            None => request,
        };

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(StoreError::Rejected {
                path: write.path(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct FlakyStore {
        attempts: Arc<Mutex<Vec<TelemetryWrite>>>,
    }

    impl RemoteStore for FlakyStore {
        async fn write(&self, write: &TelemetryWrite) -> Result<(), StoreError> {
            self.attempts.lock().push(write.clone());
            match write {
                // l'historique échoue systématiquement
                TelemetryWrite::History(_) => {
                    Err(StoreError::Rejected { path: write.path(), status: 503 })
                }
                _ => Ok(()),
            }
        }
    }

    fn status(fan_on: bool) -> SystemStatus {
        SystemStatus { timestamp: 1, temperature: 25.0, humidity: 40.0, fan_on }
    }

    #[tokio::test]
    async fn test_writes_attempted_once_in_order() {
        let store = FlakyStore::default();
        let (telemetry, _writer) = QueuedTelemetry::spawn(store.clone(), 8);

        telemetry.set_status(status(false));
        telemetry.append_history(HistorySample { timestamp: 1, temperature: 25.0, humidity: 40.0 });
        telemetry.append_event(EventLogEntry::fan(true));
        assert!(telemetry.drain(Duration::from_secs(1)).await);

        let attempts = store.attempts.lock().clone();
        let paths: Vec<_> = attempts.iter().map(TelemetryWrite::path).collect();
        // l'échec de l'historique n'est ni rejoué ni bloquant pour la suite
        assert_eq!(paths, vec!["system_status", "sensor_history", "event_logs"]);
    }

    /// Store qui met 10 s par écriture, comme un serveur qui ne répond plus
    #[derive(Clone, Default)]
    struct SlowStore {
        attempts: Arc<Mutex<Vec<TelemetryWrite>>>,
    }

    impl RemoteStore for SlowStore {
        async fn write(&self, write: &TelemetryWrite) -> Result<(), StoreError> {
            self.attempts.lock().push(write.clone());
            tokio::time::sleep(Duration::from_secs(10)).await;
            Err(StoreError::Rejected { path: write.path(), status: 504 })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_backlog_stays_bounded() {
        let store = SlowStore::default();
        let (telemetry, _writer) = QueuedTelemetry::spawn(store.clone(), 4);

        // un statut toutes les 5 s pendant 10 min, le store en absorbe un toutes les 10 s
        for i in 0..120 {
            telemetry.set_status(SystemStatus { timestamp: i, ..status(false) });
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        let attempted = store.attempts.lock().len();
        assert!((55..=61).contains(&attempted), "attempted {attempted}");

        // sans borne, le writer serait encore vers le statut 60 ; ici le retard
        // ne dépasse pas la profondeur de la file
        let newest = store
            .attempts
            .lock()
            .iter()
            .filter_map(|w| match w {
                TelemetryWrite::Status(s) => Some(s.timestamp),
                _ => None,
            })
            .max()
            .unwrap();
        assert!(newest >= 100, "newest attempted status is {newest}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_queue_drops_new_writes() {
        let store = SlowStore::default();
        let (telemetry, _writer) = QueuedTelemetry::spawn(store.clone(), 2);

        // aucun point de suspension : le writer n'a encore rien consommé
        for _ in 0..10 {
            telemetry.append_event(EventLogEntry::fan(true));
        }
        assert_eq!(telemetry.tx.capacity(), 0);

        assert!(telemetry.drain(Duration::from_secs(60)).await);
        assert_eq!(store.attempts.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_writer_stops_with_last_sender() {
        let (telemetry, writer) = QueuedTelemetry::spawn(FlakyStore::default(), 8);
        drop(telemetry);
        writer.await.unwrap();
    }

    #[test]
    fn test_endpoint_layout() {
        let store = FirebaseStore::new(&StoreConf {
            database_url: "https://room.example.firebasedatabase.app/".into(),
            auth: None,
            request_timeout_secs: 5,
            queue_capacity: 8,
        })
        .unwrap();
        assert_eq!(
            store.endpoint("event_logs"),
            "https://room.example.firebasedatabase.app/event_logs.json"
        );
    }
}
