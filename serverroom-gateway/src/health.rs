use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Connecting,
    Connected,
    Disconnected,
}

#[derive(Debug)]
pub struct LinkReport {
    pub uptime_seconds: u64,
    pub mqtt_status: LinkStatus,
    pub mqtt_reconnects: u32,
}

/// État du lien MQTT, partagé entre la tâche d'abonnement et l'arrêt
#[derive(Clone)]
pub struct LinkHealth {
    start_time: Instant,
    reconnects: Arc<AtomicU32>,
    status: Arc<parking_lot::Mutex<LinkStatus>>,
}

impl LinkHealth {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            reconnects: Arc::new(AtomicU32::new(0)),
            status: Arc::new(parking_lot::Mutex::new(LinkStatus::Connecting)),
        }
    }

    pub fn mark_connected(&self) {
        *self.status.lock() = LinkStatus::Connected;
    }

    pub fn mark_disconnected(&self) {
        *self.status.lock() = LinkStatus::Disconnected;
    }

    pub fn increment_reconnects(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
        *self.status.lock() = LinkStatus::Connecting;
    }

    pub fn status(&self) -> LinkStatus {
        *self.status.lock()
    }

    pub fn report(&self) -> LinkReport {
        LinkReport {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            mqtt_status: self.status(),
            mqtt_reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}

impl Default for LinkHealth {
    fn default() -> Self {
        Self::new()
    }
}
