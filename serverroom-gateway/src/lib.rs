//! ServerRoom Gateway - contrôleur climat + sécurité d'une salle serveur
//!
//! Deux contextes concurrents partagent les actionneurs :
//! - la boucle de scrutation (capteur -> ventilateur -> télémétrie)
//! - le contexte MQTT (porte ouverte -> alarme + photo, UNLOCK -> gâche)

pub mod actuators;
pub mod alarm;
pub mod app;
pub mod climate;
pub mod config;
pub mod display;
pub mod drivers;
pub mod evidence;
pub mod health;
pub mod lock;
pub mod models;
pub mod mqtt;
pub mod scheduler;
pub mod shutdown;
pub mod state;
pub mod telemetry;
