//! Leaderboard data model: board identity, entries, sinks, result buffers.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Identity of one ranked table. Scopes results and pending requests;
/// at most one in-flight result buffer exists per board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoardId {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BoardId::Beginner => "Beginner",
            BoardId::Intermediate => "Intermediate",
            BoardId::Advanced => "Advanced",
            BoardId::Expert => "Expert",
        };
        f.write_str(s)
    }
}

/// How the server should order entries before slicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortMethod {
    HighScoreFirst,
    LowScoreFirst,
}

/// One ranked entry. Immutable once constructed; ownership ends up
/// with the board that displays it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub player: String,
    pub score: i32,
    /// Unix seconds at submission, recorded by the submitting client.
    pub timestamp: u64,
}

impl ScoreEntry {
    pub fn new(player: impl Into<String>, score: i32, timestamp: u64) -> Self {
        Self {
            player: player.into(),
            score,
            timestamp,
        }
    }
}

/// Cloneable sink owned by whatever displays a board. Reconciliation
/// pushes resolved entries in; the display side drains them.
#[derive(Debug, Clone, Default)]
pub struct BoardHandle {
    entries: Arc<Mutex<Vec<ScoreEntry>>>,
}

impl BoardHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append resolved entries.
    pub fn push_entries(&self, entries: Vec<ScoreEntry>) {
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        guard.extend(entries);
    }

    /// Snapshot of the current contents.
    pub fn entries(&self) -> Vec<ScoreEntry> {
        let guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    /// Take everything, leaving the sink empty.
    pub fn take_entries(&self) -> Vec<ScoreEntry> {
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *guard)
    }

    pub fn is_empty(&self) -> bool {
        let guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        guard.is_empty()
    }
}

/// Arrived-but-not-yet-delivered results, one buffer per board.
/// A second query for the same board reuses the buffer rather than
/// creating a duplicate.
#[derive(Debug, Default)]
pub struct ResultStore {
    buffers: HashMap<BoardId, Vec<ScoreEntry>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a server response, replacing any stale buffer for the board.
    pub fn insert(&mut self, board: BoardId, entries: Vec<ScoreEntry>) {
        self.buffers.insert(board, entries);
    }

    /// Non-empty buffer for the board, if one has arrived.
    pub fn get(&self, board: BoardId) -> Option<&[ScoreEntry]> {
        match self.buffers.get(&board) {
            Some(v) if !v.is_empty() => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Drop the buffer once its entries have been delivered.
    pub fn clear(&mut self, board: BoardId) {
        self.buffers.remove(&board);
    }
}
