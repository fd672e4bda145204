use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use crate::autosave::AutosaveScheduler;
use crate::document::MindDocument;
use crate::gateway::{ImageFormat, Outcome, PersistencePort};
use crate::session::DocumentSession;

/// Shared state behind the command surface: the one live session, its
/// autosave timer, and the persistence gateway.
pub struct AppState {
    pub session: Arc<Mutex<DocumentSession>>,
    pub scheduler: AutosaveScheduler,
    pub gateway: Arc<dyn PersistencePort>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn PersistencePort>) -> Self {
        AppState {
            session: Arc::new(Mutex::new(DocumentSession::new())),
            scheduler: AutosaveScheduler::new(),
            gateway,
        }
    }

    pub fn with_debounce(gateway: Arc<dyn PersistencePort>, delay: Duration) -> Self {
        AppState {
            session: Arc::new(Mutex::new(DocumentSession::new())),
            scheduler: AutosaveScheduler::with_delay(delay),
            gateway,
        }
    }

    /// All edits funnel through here: record the snapshot, then re-arm the
    /// debounce timer.
    pub fn update_data(&self, document: MindDocument) {
        self.session.lock().update_data(document);
        self.arm_autosave();
    }

    /// Returns false when there is nothing to undo.
    pub fn undo(&self) -> bool {
        let stepped = self.session.lock().undo();
        if stepped {
            // the visible document changed, so the quiet period restarts
            self.arm_autosave();
        }
        stepped
    }

    pub fn redo(&self) -> bool {
        let stepped = self.session.lock().redo();
        if stepped {
            self.arm_autosave();
        }
        stepped
    }

    pub fn can_undo(&self) -> bool {
        self.session.lock().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.session.lock().can_redo()
    }

    pub fn has_data(&self) -> bool {
        self.session.lock().has_data()
    }

    /// Cancel any pending autosave. Must run when the document closes.
    pub fn teardown(&self) {
        self.scheduler.cancel();
    }

    fn arm_autosave(&self) {
        self.scheduler.arm(self.session.clone(), self.gateway.clone());
    }
}

/// Wire shape for path-producing operations:
/// `{success, path?, canceled?, error?}`. A canceled dialog is not an error.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canceled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileResponse {
    fn ok(path: &std::path::Path) -> Self {
        FileResponse {
            success: true,
            path: Some(path.to_string_lossy().to_string()),
            canceled: None,
            error: None,
        }
    }

    fn canceled() -> Self {
        FileResponse { success: false, path: None, canceled: Some(true), error: None }
    }

    fn failed(error: String) -> Self {
        FileResponse { success: false, path: None, canceled: None, error: Some(error) }
    }
}

impl From<Outcome<PathBuf>> for FileResponse {
    fn from(outcome: Outcome<PathBuf>) -> Self {
        match outcome {
            Outcome::Success(path) => FileResponse::ok(&path),
            Outcome::Canceled => FileResponse::canceled(),
            Outcome::Failure(e) => FileResponse::failed(e),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResponse {
    pub success: bool,
    pub data: MindDocument,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPayload {
    pub path: String,
    pub content: MindDocument,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<OpenPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canceled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// file.new — reset the session to the canonical empty document. No I/O.
pub async fn file_new(state: &AppState) -> NewResponse {
    state.scheduler.cancel();
    let doc = state.session.lock().create_new();
    NewResponse { success: true, data: doc }
}

/// file.open — prompt for a path, read and parse it, install as current.
pub async fn file_open(state: &AppState) -> OpenResponse {
    match state.gateway.prompt_open() {
        Outcome::Success(opened) => {
            state.scheduler.cancel();
            state
                .session
                .lock()
                .load_data(opened.document.clone(), Some(opened.path.clone()));
            tracing::info!("opened {}", opened.path.display());
            OpenResponse {
                success: true,
                data: Some(OpenPayload {
                    path: opened.path.to_string_lossy().to_string(),
                    content: opened.document,
                }),
                canceled: None,
                error: None,
            }
        }
        Outcome::Canceled => {
            OpenResponse { success: false, data: None, canceled: Some(true), error: None }
        }
        Outcome::Failure(e) => {
            tracing::error!("open failed: {}", e);
            OpenResponse { success: false, data: None, canceled: None, error: Some(e) }
        }
    }
}

/// file.save — write to the given path, or prompt when none is known.
pub async fn file_save(
    state: &AppState,
    path: Option<PathBuf>,
    document: MindDocument,
) -> FileResponse {
    let outcome = state.gateway.save(path.as_deref(), &document);
    if let Outcome::Success(ref saved) = outcome {
        state.session.lock().mark_as_saved(Some(saved.clone()));
        tracing::info!("saved {}", saved.display());
    }
    outcome.into()
}

/// file.saveAs — always prompt for a destination.
pub async fn file_save_as(state: &AppState, document: MindDocument) -> FileResponse {
    let outcome = state.gateway.save_as(&document);
    if let Outcome::Success(ref saved) = outcome {
        state.session.lock().mark_as_saved(Some(saved.clone()));
        tracing::info!("saved as {}", saved.display());
    }
    outcome.into()
}

/// file.exportImage — decode the data URI and write raw bytes.
pub async fn file_export_image(
    state: &AppState,
    image_data: String,
    format: Option<ImageFormat>,
) -> FileResponse {
    state
        .gateway
        .export_image(&image_data, format.unwrap_or(ImageFormat::Png))
        .into()
}

/// file.autoSave — deterministic location, never prompts, never cancels.
/// Failure is reported but leaves session state alone.
pub async fn file_auto_save(state: &AppState, document: MindDocument) -> FileResponse {
    match state.gateway.auto_save(&document) {
        Ok(path) => FileResponse::ok(&path),
        Err(e) => {
            tracing::warn!("autosave failed: {}", e);
            FileResponse::failed(e)
        }
    }
}

/// app.getUserDataPath — resolve (and create) the writable storage root.
pub async fn app_get_user_data_path(state: &AppState) -> FileResponse {
    match state.gateway.user_storage_root() {
        Ok(path) => FileResponse::ok(&path),
        Err(e) => FileResponse::failed(e),
    }
}
