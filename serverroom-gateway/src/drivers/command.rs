//! Périphériques pilotés par des helpers externes (lecture DHT, webcam, LCD).
//!
//! Chaque helper est une ligne de commande découpée avec `shell-words` ; les
//! marqueurs `{pin}` / `{text}` sont remplacés argument par argument, sans
//! passer par un shell. Un helper qui dépasse son délai est tué.

use super::{Camera, ClimateSensor, Display, DriverError};
use crate::models::Measurement;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::warn;

/// Lance le helper et renvoie son stdout ; le processus ne survit jamais à l'appel
async fn run_helper(
    template: &str,
    vars: &[(&str, &str)],
    limit: Duration,
) -> Result<Vec<u8>, DriverError> {
    let words = shell_words::split(template).map_err(|e| DriverError::Command {
        program: template.to_string(),
        reason: e.to_string(),
    })?;
    let Some((program, args)) = words.split_first() else {
        return Err(DriverError::Command { program: String::new(), reason: "empty command".into() });
    };

    let args: Vec<String> = args
        .iter()
        .map(|arg| {
            vars.iter()
                .fold(arg.clone(), |acc, (key, value)| acc.replace(&format!("{{{key}}}"), value))
        })
        .collect();

    let running = Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(limit, running).await {
        Ok(result) => result
            .map_err(|e| DriverError::Command { program: program.clone(), reason: e.to_string() })?,
        Err(_) => {
            let after_ms = limit.as_millis() as u64;
            warn!(program = %program, after_ms, "helper timed out, killed");
            return Err(DriverError::Timeout { program: program.clone(), after_ms });
        }
    };

    if !output.status.success() {
        return Err(DriverError::Command {
            program: program.clone(),
            reason: format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    Ok(output.stdout)
}

/// Accepte `<température> <humidité>` ; tout le reste est une absence de mesure
pub fn parse_measurement(stdout: &str) -> Option<Measurement> {
    let mut fields = stdout.split_whitespace();
    let temperature: f32 = fields.next()?.parse().ok()?;
    let humidity: f32 = fields.next()?.parse().ok()?;
    if fields.next().is_some() || !temperature.is_finite() || !humidity.is_finite() {
        return None;
    }
    Some(Measurement { temperature, humidity })
}

pub struct CommandSensor {
    template: String,
    pin: String,
    limit: Duration,
}

impl CommandSensor {
    pub fn new(template: &str, pin: u32, limit: Duration) -> Self {
        Self { template: template.to_string(), pin: pin.to_string(), limit }
    }
}

#[async_trait]
impl ClimateSensor for CommandSensor {
    async fn read(&mut self) -> Result<Measurement, DriverError> {
        let stdout = run_helper(&self.template, &[("pin", &self.pin)], self.limit).await?;
        parse_measurement(&String::from_utf8_lossy(&stdout)).ok_or(DriverError::NoData)
    }
}

pub struct CommandCamera {
    template: String,
    limit: Duration,
    released: bool,
}

impl CommandCamera {
    pub fn new(template: &str, limit: Duration) -> Self {
        Self { template: template.to_string(), limit, released: false }
    }
}

#[async_trait]
impl Camera for CommandCamera {
    async fn grab_frame(&mut self) -> Result<Vec<u8>, DriverError> {
        if self.released {
            return Err(DriverError::Released);
        }
        let frame = run_helper(&self.template, &[], self.limit).await?;
        if frame.is_empty() {
            return Err(DriverError::NoFrame);
        }
        Ok(frame)
    }

    fn release(&mut self) {
        self.released = true;
    }
}

pub struct CommandDisplay {
    template: String,
    limit: Duration,
}

impl CommandDisplay {
    pub fn new(template: &str, limit: Duration) -> Self {
        Self { template: template.to_string(), limit }
    }
}

#[async_trait]
impl Display for CommandDisplay {
    async fn show(&mut self, text: &str) -> Result<(), DriverError> {
        run_helper(&self.template, &[("text", text)], self.limit).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    const LIMIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_parse_measurement() {
        let m = parse_measurement("23.4 45.0\n").unwrap();
        assert_eq!(m.temperature, 23.4);
        assert_eq!(m.humidity, 45.0);

        assert!(parse_measurement("").is_none());
        assert!(parse_measurement("error").is_none());
        assert!(parse_measurement("23.4").is_none());
        assert!(parse_measurement("23.4 45.0 12").is_none());
        assert!(parse_measurement("NaN 45.0").is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_sensor_substitutes_pin() {
        let mut sensor = CommandSensor::new("echo 2{pin}.5 40", 7, LIMIT);
        let m = sensor.read().await.unwrap();
        assert_eq!(m.temperature, 27.5);
        assert_eq!(m.humidity, 40.0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_helper_is_reported() {
        let mut sensor = CommandSensor::new("false", 22, LIMIT);
        assert!(matches!(sensor.read().await, Err(DriverError::Command { .. })));

        let mut sensor = CommandSensor::new("echo checksum-error", 22, LIMIT);
        assert!(matches!(sensor.read().await, Err(DriverError::NoData)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_camera_empty_output_is_no_frame() {
        let mut camera = CommandCamera::new("true", LIMIT);
        assert!(matches!(camera.grab_frame().await, Err(DriverError::NoFrame)));

        let mut camera = CommandCamera::new("printf jpeg", LIMIT);
        assert_eq!(camera.grab_frame().await.unwrap(), b"jpeg");
        camera.release();
        assert!(matches!(camera.grab_frame().await, Err(DriverError::Released)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hanging_helpers_are_cut_short() {
        let limit = Duration::from_millis(200);
        let started = Instant::now();

        let mut camera = CommandCamera::new("sleep 30", limit);
        assert!(matches!(camera.grab_frame().await, Err(DriverError::Timeout { after_ms: 200, .. })));

        let mut sensor = CommandSensor::new("sleep 30", 22, limit);
        assert!(matches!(sensor.read().await, Err(DriverError::Timeout { .. })));

        let mut display = CommandDisplay::new("sleep 30 {text}", limit);
        assert!(matches!(display.show("hi").await, Err(DriverError::Timeout { .. })));

        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_unbalanced_quotes_rejected() {
        let mut display = CommandDisplay::new("lcd-print \"{text}", LIMIT);
        assert!(matches!(display.show("hi").await, Err(DriverError::Command { .. })));
    }
}
