//! Download folder maintenance.

use axum::{Json, Router, extract::State, routing::post};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{CleanupResponse, FolderCleanup};
use crate::api::server::AppState;
use crate::utils::fs;

pub fn router() -> Router<AppState> {
    Router::new().route("/cleanup-downloads", post(cleanup_downloads))
}

/// `POST /cleanup-downloads`: empty every configured download folder.
///
/// Refused while any job is running. Only relative folders that stay inside
/// the working directory are touched.
async fn cleanup_downloads(State(state): State<AppState>) -> ApiResult<Json<CleanupResponse>> {
    if state.registry.any_running() {
        return Err(ApiError::conflict(
            "tasks are still running, download folders cannot be cleaned",
        ));
    }

    let mut response = CleanupResponse {
        deleted_files: 0,
        deleted_dirs: 0,
        folders: Vec::new(),
    };

    for folder in state.storage.download_folders() {
        let name = folder.display().to_string();
        if !fs::is_contained_relative(&folder) {
            warn!(folder = %name, "Refusing to clean folder outside the working directory");
            response.folders.push(FolderCleanup::Failed {
                folder: name,
                error: "unsafe path, skipped".to_string(),
            });
            continue;
        }

        let dir = state.base_dir.join(&folder);
        let outcome = match tokio::fs::metadata(&dir).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FolderCleanup::Skipped {
                folder: name,
                skipped: true,
                reason: "does not exist".to_string(),
            },
            Err(e) => FolderCleanup::Failed {
                folder: name,
                error: e.to_string(),
            },
            Ok(meta) if !meta.is_dir() => FolderCleanup::Failed {
                folder: name,
                error: "not a directory".to_string(),
            },
            Ok(_) => match fs::empty_dir(&dir).await {
                Ok(removed) => {
                    response.deleted_files += removed.files;
                    response.deleted_dirs += removed.dirs;
                    FolderCleanup::Cleaned {
                        folder: name,
                        deleted_files: removed.files,
                        deleted_dirs: removed.dirs,
                    }
                }
                Err(e) => FolderCleanup::Failed {
                    folder: name,
                    error: e.to_string(),
                },
            },
        };
        response.folders.push(outcome);
    }

    info!(
        files = response.deleted_files,
        dirs = response.deleted_dirs,
        "Cleaned download folders"
    );
    Ok(Json(response))
}
