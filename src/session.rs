use std::path::PathBuf;

use crate::document::MindDocument;
use crate::history::HistoryLedger;

/// Process-local editing state: the single live document, its persistence
/// identity, the dirty flag, and the undo ledger.
///
/// None of these operations fail with an error value. "Nothing to undo" and
/// "no document loaded" are ordinary boolean outcomes, not faults. All
/// mutation funnels through `update_data`; callers that change the visible
/// document are responsible for (re)arming autosave afterwards.
pub struct DocumentSession {
    current: Option<MindDocument>,
    path: Option<PathBuf>,
    modified: bool,
    ledger: HistoryLedger,
    // bumped on every create_new/load_data; pending autosave timers from a
    // previous generation must not fire into the new one
    generation: u64,
}

impl DocumentSession {
    pub fn new() -> Self {
        DocumentSession {
            current: None,
            path: None,
            modified: false,
            ledger: HistoryLedger::new(),
            generation: 0,
        }
    }

    /// Install the canonical empty document. No I/O.
    pub fn create_new(&mut self) -> MindDocument {
        let doc = MindDocument::new_empty();
        self.current = Some(doc.clone());
        self.path = None;
        self.modified = false;
        self.ledger.reset(&doc);
        self.generation += 1;
        doc
    }

    /// Install an already-parsed document as current. The caller has read and
    /// parsed it; no validation happens here.
    pub fn load_data(&mut self, document: MindDocument, path: Option<PathBuf>) {
        self.ledger.reset(&document);
        self.current = Some(document);
        if path.is_some() {
            self.path = path;
        }
        self.modified = false;
        self.generation += 1;
    }

    /// The single mutation entry point for edits.
    pub fn update_data(&mut self, document: MindDocument) {
        self.ledger.record(&document);
        self.current = Some(document);
        self.modified = true;
    }

    /// Called after a successful explicit save. Does not touch the ledger.
    pub fn mark_as_saved(&mut self, path: Option<PathBuf>) {
        self.modified = false;
        if path.is_some() {
            self.path = path;
        }
    }

    /// Step back one snapshot. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.ledger.undo() {
            Some(snapshot) => {
                self.current = Some(snapshot);
                // the visible document no longer matches what is on disk
                self.modified = true;
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.ledger.redo() {
            Some(snapshot) => {
                self.current = Some(snapshot);
                self.modified = true;
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.ledger.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.ledger.can_redo()
    }

    pub fn has_data(&self) -> bool {
        self.current.is_some()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn current_document(&self) -> Option<&MindDocument> {
        self.current.as_ref()
    }

    pub fn current_path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Default for DocumentSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(topic: &str) -> MindDocument {
        let mut d = MindDocument::new_empty();
        d.root.topic = topic.into();
        d
    }

    #[test]
    fn starts_empty() {
        let session = DocumentSession::new();
        assert!(!session.has_data());
        assert!(!session.is_modified());
        assert!(!session.can_undo());
        assert!(!session.can_redo());
    }

    #[test]
    fn create_new_resets_everything() {
        let mut session = DocumentSession::new();
        session.load_data(doc("old"), Some(PathBuf::from("/tmp/old.json")));
        session.update_data(doc("edited"));

        session.create_new();
        assert!(session.has_data());
        assert!(!session.is_modified());
        assert!(session.current_path().is_none());
        assert!(!session.can_undo());
        assert!(!session.can_redo());
    }

    #[test]
    fn load_data_keeps_previous_path_when_none_given() {
        let mut session = DocumentSession::new();
        session.load_data(doc("a"), Some(PathBuf::from("/tmp/a.json")));
        session.load_data(doc("b"), None);
        assert_eq!(session.current_path().unwrap(), &PathBuf::from("/tmp/a.json"));
    }

    #[test]
    fn update_then_undo_restores_prior_state() {
        let mut session = DocumentSession::new();
        session.create_new();
        session.update_data(doc("A"));
        session.update_data(doc("B"));

        assert!(session.undo());
        assert_eq!(session.current_document().unwrap().root.topic, "A");
        assert!(session.undo());
        // back at the initial empty document now
        assert!(!session.undo());
    }

    #[test]
    fn redo_after_undo_restores_undone_state() {
        let mut session = DocumentSession::new();
        session.create_new();
        session.update_data(doc("A"));
        session.undo();
        assert!(session.redo());
        assert_eq!(session.current_document().unwrap().root.topic, "A");
        assert!(!session.redo());
    }

    #[test]
    fn modified_lifecycle() {
        let mut session = DocumentSession::new();
        session.create_new();
        assert!(!session.is_modified());

        session.update_data(doc("A"));
        assert!(session.is_modified());

        session.mark_as_saved(Some(PathBuf::from("/tmp/a.json")));
        assert!(!session.is_modified());
        assert_eq!(session.current_path().unwrap(), &PathBuf::from("/tmp/a.json"));

        // navigating history diverges from what is on disk again
        assert!(session.undo());
        assert!(session.is_modified());
    }

    #[test]
    fn generation_bumps_on_reset_only() {
        let mut session = DocumentSession::new();
        let g0 = session.generation();
        session.create_new();
        let g1 = session.generation();
        assert_ne!(g0, g1);

        session.update_data(doc("A"));
        session.undo();
        assert_eq!(session.generation(), g1);

        session.load_data(doc("B"), None);
        assert_ne!(session.generation(), g1);
    }
}
