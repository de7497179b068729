/**
 * ACTUATORS - Point unique de mutation des relais
 *
 * RÔLE :
 * Possède les trois sorties (ventilateur, buzzer, serrure). La boucle de
 * scrutation et le contexte MQTT n'y accèdent que par des opérations
 * d'intention : basculer le ventilateur, impulsion buzzer/serrure, tout couper.
 *
 * CONCURRENCE :
 * - Un seul mutex autour du banc de relais, tenu le temps d'UNE écriture GPIO
 * - Une impulsion relâche le verrou pendant le maintien : le ventilateur reste
 *   pilotable pendant une alarme
 * - Lecture-modification-écriture du ventilateur faite sous le verrou
 */

use crate::drivers::{DriverError, Relay};
use parking_lot::Mutex;
use std::time::Duration;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Fan,
    Buzzer,
    Lock,
}

impl Output {
    pub fn name(self) -> &'static str {
        match self {
            Output::Fan => "fan",
            Output::Buzzer => "buzzer",
            Output::Lock => "lock",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorSnapshot {
    pub fan: bool,
    pub buzzer: bool,
    pub lock: bool,
}

struct RelayBank {
    fan: Box<dyn Relay>,
    buzzer: Box<dyn Relay>,
    lock: Box<dyn Relay>,
}

impl RelayBank {
    fn relay(&mut self, output: Output) -> &mut dyn Relay {
        match output {
            Output::Fan => self.fan.as_mut(),
            Output::Buzzer => self.buzzer.as_mut(),
            Output::Lock => self.lock.as_mut(),
        }
    }
}

pub struct ActuatorState {
    bank: Mutex<RelayBank>,
}

impl ActuatorState {
    pub fn new(fan: Box<dyn Relay>, buzzer: Box<dyn Relay>, lock: Box<dyn Relay>) -> Self {
        Self { bank: Mutex::new(RelayBank { fan, buzzer, lock }) }
    }

    pub fn fan_on(&self) -> bool {
        self.bank.lock().fan.is_on()
    }

    pub fn snapshot(&self) -> ActuatorSnapshot {
        let bank = self.bank.lock();
        ActuatorSnapshot {
            fan: bank.fan.is_on(),
            buzzer: bank.buzzer.is_on(),
            lock: bank.lock.is_on(),
        }
    }

    /// `decide` reçoit l'état courant et renvoie l'état voulu (None = rien à faire).
    /// Renvoie le nouvel état si le relais a effectivement basculé.
    pub fn update_fan<F>(&self, decide: F) -> Result<Option<bool>, DriverError>
    where
        F: FnOnce(bool) -> Option<bool>,
    {
        let mut bank = self.bank.lock();
        let current = bank.fan.is_on();
        match decide(current) {
            Some(target) if target != current => {
                bank.fan.set(target)?;
                debug!(on = target, "fan switched");
                Ok(Some(target))
            }
            _ => Ok(None),
        }
    }

    fn write(&self, output: Output, on: bool) -> Result<(), DriverError> {
        self.bank.lock().relay(output).set(on)
    }

    /// Active la sortie, maintient `hold`, puis la relâche. Bloque l'appelant
    /// pendant toute la durée ; si la tâche est annulée en cours de maintien,
    /// la sortie est tout de même relâchée.
    pub async fn pulse(&self, output: Output, hold: Duration) -> Result<(), DriverError> {
        self.write(output, true)?;
        let guard = PulseGuard { state: self, output };
        tokio::time::sleep(hold).await;
        drop(guard);
        Ok(())
    }

    /// Coupe tout, sans condition : utilisé au démarrage et à l'arrêt
    pub fn all_off(&self) {
        let mut bank = self.bank.lock();
        for output in [Output::Fan, Output::Buzzer, Output::Lock] {
            if let Err(e) = bank.relay(output).set(false) {
                error!(relay = output.name(), "failed to force relay off: {e}");
            }
        }
    }
}

struct PulseGuard<'a> {
    state: &'a ActuatorState,
    output: Output,
}

impl Drop for PulseGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.state.write(self.output, false) {
            warn!(relay = self.output.name(), "failed to release relay after pulse: {e}");
        }
    }
}
