use crate::document::MindDocument;

/// Bounded undo history. When full, the oldest snapshot is evicted.
pub const HISTORY_CAPACITY: usize = 50;

/// Append-only snapshot sequence with a single cursor. Entries before the
/// cursor are undo candidates, entries after it are redo candidates.
/// Recording after an undo truncates the abandoned redo branch.
///
/// The ledger owns independent clones of every document it stores, so
/// mutating the live document never alters a snapshot retroactively.
pub struct HistoryLedger {
    entries: Vec<MindDocument>,
    cursor: usize,
}

impl HistoryLedger {
    pub fn new() -> Self {
        HistoryLedger { entries: Vec::new(), cursor: 0 }
    }

    /// Discard all entries; the given snapshot becomes entry 0.
    pub fn reset(&mut self, snapshot: &MindDocument) {
        self.entries.clear();
        self.entries.push(snapshot.clone());
        self.cursor = 0;
    }

    /// Truncate any redo branch past the cursor, append a snapshot, and move
    /// the cursor onto it. Evicts the oldest entry once over capacity.
    pub fn record(&mut self, snapshot: &MindDocument) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(snapshot.clone());
        self.cursor = self.entries.len() - 1;

        if self.entries.len() > HISTORY_CAPACITY {
            self.entries.remove(0);
            self.cursor -= 1;
        }
    }

    pub fn undo(&mut self) -> Option<MindDocument> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.entries[self.cursor].clone())
    }

    pub fn redo(&mut self) -> Option<MindDocument> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.entries[self.cursor].clone())
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for HistoryLedger {
    fn default() -> Self {
        Self::new()
    }
}
