//! Capture de preuve : une image de la caméra, horodatée, dans le dossier des captures.
//!
//! Le fichier appartient ensuite au serveur d'images ; il n'est jamais supprimé ici.

use crate::drivers::{Camera, DriverError};
use crate::models::epoch_now;
use crate::state::{new_state, Shared};
use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    pub filename: String,
    pub filepath: PathBuf,
    pub timestamp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("camera: {0}")]
    Camera(#[from] DriverError),
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct EvidenceCapture {
    camera: Shared<Box<dyn Camera>>,
    dir: PathBuf,
    extension: String,
}

impl EvidenceCapture {
    /// Crée le dossier de captures s'il n'existe pas
    pub fn new(camera: Box<dyn Camera>, dir: &Path, extension: &str) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            camera: new_state(camera),
            dir: dir.to_path_buf(),
            extension: extension.to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `None` si la caméra n'a rien donné ou si l'écriture a échoué
    pub async fn capture(&self) -> Option<Evidence> {
        match self.try_capture().await {
            Ok(evidence) => {
                info!(path = %evidence.filepath.display(), "evidence captured");
                Some(evidence)
            }
            Err(e) => {
                error!("CRITICAL FAILURE: could not capture evidence: {e}");
                None
            }
        }
    }

    async fn try_capture(&self) -> Result<Evidence, CaptureError> {
        // verrou tenu jusqu'à l'écriture : deux captures ne peuvent pas choisir le même nom
        let mut camera = self.camera.lock().await;
        let frame = camera.grab_frame().await?;

        let base = evidence_basename(Local::now().naive_local());
        let (filename, filepath) = unique_path(&self.dir, &base, &self.extension).await;
        tokio::fs::write(&filepath, &frame)
            .await
            .map_err(|source| CaptureError::Write { path: filepath.clone(), source })?;

        Ok(Evidence { filename, filepath, timestamp: epoch_now() })
    }

    /// N'attend jamais : si une capture tient encore la caméra, renvoie `false`
    pub fn release(&self) -> bool {
        match self.camera.try_lock() {
            Ok(mut camera) => {
                camera.release();
                true
            }
            Err(_) => {
                warn!("camera busy, release skipped");
                false
            }
        }
    }
}

/// `2024-05-01_10-42-07`, résolution à la seconde
pub fn evidence_basename(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// Suffixe `-1`, `-2`… si une capture existe déjà pour la même seconde
async fn unique_path(dir: &Path, base: &str, extension: &str) -> (String, PathBuf) {
    let mut filename = format!("{base}.{extension}");
    let mut n = 1;
    while tokio::fs::try_exists(dir.join(&filename)).await.unwrap_or(false) {
        filename = format!("{base}-{n}.{extension}");
        n += 1;
    }
    let path = dir.join(&filename);
    (filename, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[test]
    fn test_basename_second_resolution() {
        let at = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_milli_opt(9, 3, 7, 850)
            .unwrap();
        assert_eq!(evidence_basename(at), "2024-05-01_09-03-07");
    }

    #[tokio::test]
    async fn test_same_second_gets_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let (first, path) = unique_path(dir.path(), "2024-05-01_09-03-07", "jpg").await;
        assert_eq!(first, "2024-05-01_09-03-07.jpg");
        std::fs::write(&path, b"x").unwrap();

        let (second, path) = unique_path(dir.path(), "2024-05-01_09-03-07", "jpg").await;
        assert_eq!(second, "2024-05-01_09-03-07-1.jpg");
        std::fs::write(&path, b"x").unwrap();

        let (third, _) = unique_path(dir.path(), "2024-05-01_09-03-07", "jpg").await;
        assert_eq!(third, "2024-05-01_09-03-07-2.jpg");
    }

    #[test]
    fn test_new_creates_capture_dir() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("captures");
        let capture = EvidenceCapture::new(
            Box::new(crate::drivers::simulated::SimulatedCamera::default()),
            &dir,
            "jpg",
        )
        .unwrap();
        assert!(dir.is_dir());
        assert_eq!(capture.dir(), dir.as_path());
    }

    #[tokio::test]
    async fn test_capture_writes_frame() {
        let dir = tempfile::tempdir().unwrap();
        let capture = EvidenceCapture::new(
            Box::new(crate::drivers::simulated::SimulatedCamera::default()),
            dir.path(),
            "jpg",
        )
        .unwrap();

        let evidence = capture.capture().await.unwrap();
        assert!(evidence.filename.ends_with(".jpg"));
        assert_eq!(std::fs::read(&evidence.filepath).unwrap(), vec![0xFF, 0xD8, 0xFF, 0xD9]);

        assert!(capture.release());
        assert!(capture.capture().await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_release_does_not_wait_for_running_capture() {
        let dir = tempfile::tempdir().unwrap();
        let camera = crate::drivers::command::CommandCamera::new("sleep 30", Duration::from_secs(60));
        let capture = Arc::new(EvidenceCapture::new(Box::new(camera), dir.path(), "jpg").unwrap());

        let running = tokio::spawn({
            let capture = capture.clone();
            async move { capture.capture().await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;

        let started = Instant::now();
        assert!(!capture.release());
        assert!(started.elapsed() < Duration::from_secs(1));

        // une fois la capture abandonnée, la caméra se libère normalement
        running.abort();
        assert!(running.await.is_err());
        assert!(capture.release());
    }
}
