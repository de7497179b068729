//! État partagé entre la boucle de scrutation et le contexte MQTT.
//!
//! Les handles de périphériques asynchrones (caméra, afficheur) sont enveloppés
//! dans `Shared<T>` : une seule tâche y accède à la fois, et le verrou peut être
//! tenu pendant l'appel au helper (qui a son propre délai).

use std::sync::Arc;
use tokio::sync::Mutex;

pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}
