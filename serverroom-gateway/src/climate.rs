//! Régulation du ventilateur par seuil simple.
//!
//! Pas de bande d'hystérésis : une température qui oscille autour du seuil
//! entre deux lectures fait basculer le ventilateur à chaque lecture.

use crate::actuators::ActuatorState;
use crate::models::EventLogEntry;
use crate::telemetry::Telemetry;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanCommand {
    TurnOn,
    TurnOff,
}

/// ON ssi temp > seuil et ventilateur éteint ; OFF ssi temp <= seuil et allumé
pub fn decide(temperature: f32, fan_on: bool, threshold: f32) -> Option<FanCommand> {
    if temperature > threshold && !fan_on {
        Some(FanCommand::TurnOn)
    } else if temperature <= threshold && fan_on {
        Some(FanCommand::TurnOff)
    } else {
        None
    }
}

pub struct ClimateController {
    threshold: f32,
    actuators: Arc<ActuatorState>,
    telemetry: Arc<dyn Telemetry>,
}

impl ClimateController {
    pub fn new(threshold: f32, actuators: Arc<ActuatorState>, telemetry: Arc<dyn Telemetry>) -> Self {
        Self { threshold, actuators, telemetry }
    }

    /// Applique la décision sur le relais et émet un FAN_CONTROL par bascule
    pub fn evaluate(&self, temperature: f32) -> Option<FanCommand> {
        let threshold = self.threshold;
        let switched = self.actuators.update_fan(|fan_on| {
            decide(temperature, fan_on, threshold).map(|cmd| cmd == FanCommand::TurnOn)
        });

        match switched {
            Ok(Some(on)) => {
                info!(temperature, threshold, on, "fan switched");
                self.telemetry.append_event(EventLogEntry::fan(on));
                Some(if on { FanCommand::TurnOn } else { FanCommand::TurnOff })
            }
            Ok(None) => None,
            Err(e) => {
                error!(temperature, "fan relay write failed: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_truth_table() {
        assert_eq!(decide(30.0, false, 28.0), Some(FanCommand::TurnOn));
        assert_eq!(decide(30.0, true, 28.0), None);
        assert_eq!(decide(25.0, true, 28.0), Some(FanCommand::TurnOff));
        assert_eq!(decide(25.0, false, 28.0), None);
    }

    #[test]
    fn test_threshold_itself_counts_as_cool() {
        assert_eq!(decide(28.0, true, 28.0), Some(FanCommand::TurnOff));
        assert_eq!(decide(28.0, false, 28.0), None);
        assert_eq!(decide(28.01, false, 28.0), Some(FanCommand::TurnOn));
    }
}
