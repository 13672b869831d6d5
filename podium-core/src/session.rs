//! Host-driven session state: no I/O. The host feeds inbound commands
//! and tick deltas in; outbound frame bytes and events come back out.

use std::time::Duration;

use crate::board::{BoardHandle, BoardId, ResultStore, ScoreEntry, SortMethod};
use crate::events::{EventQueue, NetEvent};
use crate::pending::PendingSet;
use crate::protocol::Command;
use crate::wire;

/// Client-side leaderboard session. Owned by whatever drives the game
/// loop and handed to the transport; never a process-wide singleton.
pub struct LeaderboardSession {
    results: ResultStore,
    pending: PendingSet,
    events: EventQueue,
    connected: bool,
}

impl Default for LeaderboardSession {
    fn default() -> Self {
        Self::new()
    }
}

impl LeaderboardSession {
    pub fn new() -> Self {
        Self {
            results: ResultStore::new(),
            pending: PendingSet::new(),
            events: EventQueue::new(),
            connected: false,
        }
    }

    /// Session with a custom pending-request timeout (tests).
    pub fn with_pending_timeout(timeout: Duration) -> Self {
        Self {
            pending: PendingSet::with_timeout(timeout),
            ..Self::new()
        }
    }

    /// Encode a score submission. Fire and forget: no acknowledgement
    /// is tracked. Encode failure becomes an error event.
    pub fn submit_score(&mut self, board: BoardId, entry: ScoreEntry) -> Option<Vec<u8>> {
        let cmd = Command::WriteToLeaderboard { board, entry };
        self.encode_or_report(&cmd)
    }

    /// Encode a leaderboard query. Delivers immediately if a result
    /// buffer is already present; otherwise registers a pending
    /// request against `sink`. At most one request per board is kept;
    /// a repeat query before resolution reuses the existing record.
    pub fn request_leaderboard(
        &mut self,
        board: BoardId,
        count: u32,
        start_index: u32,
        sort: SortMethod,
        sink: BoardHandle,
    ) -> Option<Vec<u8>> {
        let cmd = Command::SendLeaderboard {
            board,
            count,
            start_index,
            sort,
        };
        let frame = self.encode_or_report(&cmd)?;
        if let Some(entries) = self.results.get(board) {
            sink.push_entries(entries.to_vec());
            self.results.clear(board);
        } else if !self.pending.register(board, sink) {
            log::debug!("query for {board} already in flight, reusing pending record");
        }
        Some(frame)
    }

    /// Dispatch one inbound command. Called by the receive loop for
    /// every decoded frame, including the synthetic terminator.
    pub fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::LeaderboardContents { board, entries } => {
                log::debug!("received {} entries for {board}", entries.len());
                self.results.insert(board, entries);
            }
            Command::UserDisconnected => {
                self.events.push_message("disconnected from leaderboard server");
                self.set_connected(false);
            }
            Command::WriteToLeaderboard { board, .. } | Command::SendLeaderboard { board, .. } => {
                log::warn!("ignoring server-bound command for {board}");
                self.events
                    .push_log(format!("ignoring server-bound command for {board}"));
            }
        }
    }

    /// One tick: reconcile every pending request in a single pass,
    /// then drain the event queue. `dt` is unscaled wall-clock time.
    pub fn tick(&mut self, dt: Duration) -> Vec<NetEvent> {
        self.pending
            .reconcile(dt, &mut self.results, &mut self.events);
        self.events.drain()
    }

    /// Record liveness as observed by the transport. Emits a status
    /// event only when the recorded value actually changes.
    pub fn set_connected(&mut self, connected: bool) {
        if self.connected != connected {
            self.connected = connected;
            self.events.push(NetEvent::ConnectionStatus(connected));
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Buffer an event for the next drain.
    pub fn push_event(&mut self, event: NetEvent) {
        self.events.push(event);
    }

    /// Drop the pending record for a board, if any. Used when a query
    /// frame could not be handed to the transport: the request can
    /// never be satisfied, so it must not sit until eviction.
    pub fn cancel_pending(&mut self, board: BoardId) -> bool {
        self.pending.remove(board)
    }

    /// Number of unresolved leaderboard queries.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn encode_or_report(&mut self, cmd: &Command) -> Option<Vec<u8>> {
        match wire::encode_frame(cmd) {
            Ok(frame) => Some(frame),
            Err(e) => {
                log::warn!("failed to encode {}: {e}", cmd.name());
                self.events.push_error(format!("failed to encode {}: {e}", cmd.name()));
                None
            }
        }
    }
}
