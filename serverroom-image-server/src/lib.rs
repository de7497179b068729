/**
 * SERVEUR D'IMAGES - Diffusion des photos de preuve
 *
 * RÔLE :
 * Expose en lecture seule le dossier où la passerelle écrit ses captures,
 * pour que le tableau de bord puisse afficher l'image liée à une alerte
 * (champ `imageFile` de l'événement DOOR_ALERT).
 *
 * FONCTIONNEMENT :
 * - GET /captures/{filename} : contenu brut du fichier, type déduit de l'extension
 * - Nom vide, `..` ou séparateur de chemin : 400, rien n'est lu hors du dossier
 * - Fichier absent : 404
 */

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
struct CaptureRoot(Arc<PathBuf>);

pub fn router(dir: PathBuf) -> Router {
    Router::new()
        .route("/captures/{filename}", get(serve_capture))
        .with_state(CaptureRoot(Arc::new(dir)))
}

/// Un seul composant de chemin, sans remontée
fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

fn content_type(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

async fn serve_capture(State(root): State<CaptureRoot>, Path(filename): Path<String>) -> Response {
    if !is_safe_name(&filename) {
        warn!(filename = %filename, "rejected capture path");
        return StatusCode::BAD_REQUEST.into_response();
    }

    let path = root.0.join(&filename);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            debug!(filename = %filename, size = bytes.len(), "capture served");
            ([(header::CONTENT_TYPE, content_type(&filename))], bytes).into_response()
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!(path = %path.display(), "cannot read capture: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
