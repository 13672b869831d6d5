//! Game-loop facing API: one handle wrapping the session and the
//! connection lifecycle manager.

use std::sync::Arc;
use std::time::Duration;

use podium_core::{BoardHandle, BoardId, LeaderboardSession, NetEvent, ScoreEntry, SortMethod};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::transport::{ConnectError, Connection, SharedSession};

/// Leaderboard client. Cheap to clone; all clones share one session
/// and one connection. Constructed and owned explicitly by the caller
/// rather than living in a process-wide singleton.
#[derive(Clone)]
pub struct LeaderboardClient {
    session: SharedSession,
    conn: Connection,
    config: Arc<Config>,
}

impl LeaderboardClient {
    pub fn new(config: Config) -> Self {
        Self {
            session: Arc::new(Mutex::new(LeaderboardSession::new())),
            conn: Connection::new(),
            config: Arc::new(config),
        }
    }

    /// Client sharing an existing session (tests use this to shorten
    /// the pending-request timeout).
    pub fn with_session(config: Config, session: LeaderboardSession) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            conn: Connection::new(),
            config: Arc::new(config),
        }
    }

    /// Connect to the configured server, bounded by the configured
    /// timeout. Awaitable; failures also surface as events on the
    /// next tick. Rejected while connecting or connected.
    pub async fn connect(&self) -> Result<(), ConnectError> {
        self.conn
            .connect(
                &self.config.server_addr,
                self.config.connect_timeout(),
                self.config.read_timeout(),
                self.session.clone(),
            )
            .await
    }

    /// Close the connection if open. Idempotent.
    pub async fn disconnect(&self) {
        self.conn.disconnect(&self.session).await;
    }

    pub async fn is_connected(&self) -> bool {
        self.conn.is_connected().await
    }

    /// Submit one score. Fire and forget: no acknowledgement is
    /// tracked, and failure to send surfaces as an error event.
    pub async fn submit_score(&self, board: BoardId, entry: ScoreEntry) {
        let frame = self.session.lock().await.submit_score(board, entry);
        if let Some(frame) = frame {
            if !self.conn.send(frame).await {
                self.session
                    .lock()
                    .await
                    .push_event(NetEvent::Error(format!(
                        "cannot submit score for {board}: not connected"
                    )));
            }
        }
    }

    /// Query a slice of one board. The result lands in `sink`, either
    /// immediately (buffered response) or on a later tick; an
    /// unanswered query is evicted with an error event after the
    /// protocol timeout. At most one query per board is in flight.
    pub async fn request_leaderboard(
        &self,
        board: BoardId,
        count: u32,
        start_index: u32,
        sort: SortMethod,
        sink: BoardHandle,
    ) {
        if !self.conn.is_connected().await {
            // Registering while disconnected would only park a request
            // until the eviction timeout.
            self.session
                .lock()
                .await
                .push_event(NetEvent::Error(format!(
                    "cannot request leaderboard {board}: not connected"
                )));
            return;
        }
        let frame = self
            .session
            .lock()
            .await
            .request_leaderboard(board, count, start_index, sort, sink);
        if let Some(frame) = frame {
            if !self.conn.send(frame).await {
                // The connection dropped between the check above and
                // the send; the registered request can never resolve.
                self.cancel_query(board).await;
            }
        }
    }

    async fn cancel_query(&self, board: BoardId) {
        let mut s = self.session.lock().await;
        s.cancel_pending(board);
        s.push_event(NetEvent::Error(format!(
            "cannot request leaderboard {board}: not connected"
        )));
    }

    /// One game tick: reconcile pending queries, then drain buffered
    /// events for the caller to re-broadcast. `dt` is unscaled
    /// wall-clock time since the previous tick.
    pub async fn tick(&self, dt: Duration) -> Vec<NetEvent> {
        self.session.lock().await.tick(dt)
    }

    /// Number of unresolved leaderboard queries.
    pub async fn pending_len(&self) -> usize {
        self.session.lock().await.pending_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_submit_reports_error_event() {
        let client = LeaderboardClient::new(Config::default());
        client
            .submit_score(BoardId::Beginner, ScoreEntry::new("A", 100, 0))
            .await;
        let events = client.tick(Duration::ZERO).await;
        assert!(events
            .iter()
            .any(|e| matches!(e, NetEvent::Error(m) if m.contains("not connected"))));
    }

    #[tokio::test]
    async fn failed_frame_handoff_deregisters_query() {
        // A query registered just before the connection dropped must
        // be cancelled when the send fails, not left to sit until the
        // eviction timeout.
        let client = LeaderboardClient::new(Config::default());
        let sink = BoardHandle::new();
        let frame = client.session.lock().await.request_leaderboard(
            BoardId::Beginner,
            10,
            0,
            SortMethod::HighScoreFirst,
            sink,
        );
        assert!(frame.is_some());
        assert_eq!(client.pending_len().await, 1);

        assert!(!client.conn.send(frame.unwrap()).await);
        client.cancel_query(BoardId::Beginner).await;
        assert_eq!(client.pending_len().await, 0);
        let events = client.tick(Duration::ZERO).await;
        assert!(events
            .iter()
            .any(|e| matches!(e, NetEvent::Error(m) if m.contains("not connected"))));
    }

    #[tokio::test]
    async fn offline_request_registers_nothing() {
        let client = LeaderboardClient::new(Config::default());
        let sink = BoardHandle::new();
        client
            .request_leaderboard(BoardId::Beginner, 10, 0, SortMethod::HighScoreFirst, sink)
            .await;
        assert_eq!(client.pending_len().await, 0);
        let events = client.tick(Duration::ZERO).await;
        assert!(events
            .iter()
            .any(|e| matches!(e, NetEvent::Error(m) if m.contains("not connected"))));
    }
}
