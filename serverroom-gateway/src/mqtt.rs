/**
 * MQTT SUBSCRIBER - Contexte de livraison des commandes porte/serrure
 *
 * RÔLE :
 * Écoute deux topics (état de porte, commande de serrure) et déclenche
 * l'alarme ou l'impulsion de serrure. Tourne dans sa propre tâche,
 * concurrente de la boucle de scrutation.
 *
 * FONCTIONNEMENT :
 * - Table de dispatch explicite (topic, payload) -> action ; le reste est ignoré et loggé
 * - Un handler va jusqu'au bout avant que le message suivant soit traité
 *   (une alarme de 1,5 s retarde d'autant un UNLOCK qui la suit)
 * - QoS 0 : pas d'acquittement, pas de rejeu
 * - Ré-abonnement à chaque ConnAck ; reconnexion avec backoff exponentiel
 */

use crate::alarm::AlarmController;
use crate::config::{MqttConf, Topics};
use crate::health::LinkHealth;
use crate::lock::LockController;
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS};
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    DoorOpen,
    Unlock,
}

#[derive(Debug, Clone)]
struct Route {
    topic: String,
    payload: &'static str,
    action: Action,
}

/// Couples (topic, payload) reconnus ; égalité stricte sur les deux
#[derive(Debug, Clone)]
pub struct DispatchTable {
    routes: Vec<Route>,
}

impl DispatchTable {
    pub fn new(topics: &Topics) -> Self {
        Self {
            routes: vec![
                Route { topic: topics.door.clone(), payload: "OPEN", action: Action::DoorOpen },
                Route { topic: topics.lock.clone(), payload: "UNLOCK", action: Action::Unlock },
            ],
        }
    }

    pub fn resolve(&self, topic: &str, payload: &[u8]) -> Option<Action> {
        self.routes
            .iter()
            .find(|route| route.topic == topic && route.payload.as_bytes() == payload)
            .map(|route| route.action)
    }

    /// Topics à souscrire, sans doublon
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = Vec::new();
        for route in &self.routes {
            if !topics.contains(&route.topic.as_str()) {
                topics.push(&route.topic);
            }
        }
        topics
    }
}

pub struct Dispatcher {
    table: DispatchTable,
    alarm: AlarmController,
    lock: LockController,
}

impl Dispatcher {
    pub fn new(table: DispatchTable, alarm: AlarmController, lock: LockController) -> Self {
        Self { table, alarm, lock }
    }

    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    /// Exécute l'action jusqu'au bout ; renvoie ce qui a été déclenché
    pub async fn dispatch(&self, topic: &str, payload: &[u8]) -> Option<Action> {
        let action = self.table.resolve(topic, payload);
        match action {
            Some(Action::DoorOpen) => {
                self.alarm.handle_door_open().await;
            }
            Some(Action::Unlock) => self.lock.handle_unlock().await,
            None => {
                info!(topic, payload = %String::from_utf8_lossy(payload), "message ignored");
            }
        }
        action
    }
}

/// Délai de reconnexion : double à chaque échec, plafonné, remis à zéro au ConnAck
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    next: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max, next: initial }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.next = self.initial;
    }
}

pub fn mqtt_options(client_id: &str, cfg: &MqttConf) -> MqttOptions {
    let mut opts = MqttOptions::new(client_id, &cfg.host, cfg.port);
    opts.set_keep_alive(Duration::from_secs(cfg.keep_alive_secs));
    opts.set_clean_session(true);
    opts
}

/// Boucle du contexte de livraison. Ne rend la main que si la tâche est annulée.
pub async fn run_subscriber(
    client: AsyncClient,
    mut eventloop: EventLoop,
    dispatcher: Dispatcher,
    link: LinkHealth,
    mut backoff: Backoff,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                link.mark_connected();
                backoff.reset();
                info!("connected to MQTT broker");
                for topic in dispatcher.table().topics() {
                    match client.subscribe(topic, QoS::AtMostOnce).await {
                        Ok(()) => info!(topic, "subscribed"),
                        Err(e) => error!(topic, "subscribe failed: {e}"),
                    }
                }
            }
            Ok(Event::Incoming(Incoming::Publish(publish))) => {
                debug!(
                    topic = %publish.topic,
                    payload = %String::from_utf8_lossy(&publish.payload),
                    "MQTT rx"
                );
                dispatcher.dispatch(&publish.topic, &publish.payload).await;
            }
            Ok(_) => {}
            Err(e) => {
                link.mark_disconnected();
                let delay = backoff.next_delay();
                warn!(retry_in_ms = delay.as_millis() as u64, "MQTT connection error: {e}");
                tokio::time::sleep(delay).await;
                link.increment_reconnects();
            }
        }
    }
}
