pub mod autosave;
pub mod commands;
pub mod document;
pub mod gateway;
pub mod history;
pub mod logging;
pub mod session;

pub use autosave::{AutosaveScheduler, AUTOSAVE_DEBOUNCE};
pub use commands::{AppState, FileResponse, NewResponse, OpenResponse};
pub use document::{Direction, MindDocument, MindNode, DOCUMENT_VERSION};
pub use gateway::{
    DialogPort, FileGateway, ImageFormat, OpenedFile, Outcome, PersistencePort, AUTOSAVE_KEEP,
};
pub use history::{HistoryLedger, HISTORY_CAPACITY};
pub use session::DocumentSession;
