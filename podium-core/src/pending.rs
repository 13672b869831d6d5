//! Pending leaderboard queries: retry a result lookup once per tick,
//! evict after the protocol timeout.

use std::time::Duration;

use crate::board::{BoardHandle, BoardId, ResultStore};
use crate::events::EventQueue;
use crate::protocol::PENDING_TIMEOUT;

/// One unresolved leaderboard query. Created when a query could not
/// be satisfied immediately; removed on delivery or timeout.
#[derive(Debug)]
struct PendingRequest {
    board: BoardId,
    /// Wall-clock wait so far. Unscaled: reconciliation keeps running
    /// while gameplay is paused.
    waited: Duration,
    sink: BoardHandle,
}

/// The ordered set of pending requests. Owns request lifecycles
/// outright; sinks never poll the set directly.
#[derive(Debug)]
pub struct PendingSet {
    requests: Vec<PendingRequest>,
    timeout: Duration,
}

impl Default for PendingSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingSet {
    pub fn new() -> Self {
        Self {
            requests: Vec::new(),
            timeout: PENDING_TIMEOUT,
        }
    }

    /// Override the eviction timeout (tests).
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            requests: Vec::new(),
            timeout,
        }
    }

    /// Register a query awaiting a result. Returns false without
    /// registering if the board already has a request in flight; the
    /// existing record (and its sink) is reused.
    pub fn register(&mut self, board: BoardId, sink: BoardHandle) -> bool {
        if self.contains(board) {
            return false;
        }
        self.requests.push(PendingRequest {
            board,
            waited: Duration::ZERO,
            sink,
        });
        true
    }

    /// Drop every record for a board. True if anything was removed.
    pub fn remove(&mut self, board: BoardId) -> bool {
        let before = self.requests.len();
        self.requests.retain(|r| r.board != board);
        self.requests.len() != before
    }

    pub fn contains(&self, board: BoardId) -> bool {
        self.requests.iter().any(|r| r.board == board)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// One reconciliation pass. For every request: advance its wait by
    /// `dt`, deliver if a non-empty result buffer has arrived, evict
    /// with an error event once the wait exceeds the timeout.
    ///
    /// Requests sharing a board (one-per-board invariant violated
    /// upstream) all read the same buffer in the same pass and are
    /// satisfied uniformly; the buffer is cleared afterwards.
    pub fn reconcile(&mut self, dt: Duration, results: &mut ResultStore, events: &mut EventQueue) {
        let timeout = self.timeout;
        let mut delivered: Vec<BoardId> = Vec::new();
        self.requests.retain_mut(|req| {
            req.waited += dt;
            if let Some(entries) = results.get(req.board) {
                req.sink.push_entries(entries.to_vec());
                if !delivered.contains(&req.board) {
                    delivered.push(req.board);
                }
                return false;
            }
            if req.waited > timeout {
                events.push_error(format!("leaderboard request for {} timed out", req.board));
                return false;
            }
            true
        });
        for board in delivered {
            results.clear(board);
        }
    }
}
