//! Relais pilotés par l'interface GPIO sysfs de Linux.

use super::{DriverError, Relay};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct SysfsRelay {
    pin: u32,
    value_path: PathBuf,
    on: bool,
}

impl SysfsRelay {
    /// Exporte la broche si besoin, la passe en sortie et la force à 0
    pub fn open_in(root: &Path, pin: u32) -> Result<Self, DriverError> {
        let gpio = |source| DriverError::Gpio { pin, source };
        let pin_dir = root.join(format!("gpio{pin}"));

        if !pin_dir.exists() {
            fs::write(root.join("export"), pin.to_string()).map_err(gpio)?;
        }
        fs::write(pin_dir.join("direction"), "out").map_err(gpio)?;

        let mut relay = Self { pin, value_path: pin_dir.join("value"), on: true };
        relay.set(false)?;
        debug!(pin, "sysfs relay ready");
        Ok(relay)
    }
}

impl Relay for SysfsRelay {
    fn set(&mut self, on: bool) -> Result<(), DriverError> {
        let level = if on { "1" } else { "0" };
        fs::write(&self.value_path, level)
            .map_err(|source| DriverError::Gpio { pin: self.pin, source })?;
        self.on = on;
        Ok(())
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_gpio_root(pin: u32) -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join(format!("gpio{pin}"))).unwrap();
        root
    }

    #[test]
    fn test_open_configures_output_low() {
        let root = fake_gpio_root(16);
        let relay = SysfsRelay::open_in(root.path(), 16).unwrap();
        assert!(!relay.is_on());
        let dir = root.path().join("gpio16");
        assert_eq!(fs::read_to_string(dir.join("direction")).unwrap(), "out");
        assert_eq!(fs::read_to_string(dir.join("value")).unwrap(), "0");
    }

    #[test]
    fn test_set_writes_level() {
        let root = fake_gpio_root(18);
        let mut relay = SysfsRelay::open_in(root.path(), 18).unwrap();
        relay.set(true).unwrap();
        assert!(relay.is_on());
        assert_eq!(fs::read_to_string(root.path().join("gpio18/value")).unwrap(), "1");
    }

    #[test]
    fn test_unexported_pin_is_exported() {
        let root = tempfile::tempdir().unwrap();
        // sans noyau derrière, l'export ne crée pas gpio5/ : l'ouverture échoue après l'export
        let err = SysfsRelay::open_in(root.path(), 5);
        assert!(matches!(err, Err(DriverError::Gpio { pin: 5, .. })));
        assert_eq!(fs::read_to_string(root.path().join("export")).unwrap(), "5");
    }
}
