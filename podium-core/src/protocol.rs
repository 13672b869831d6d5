//! Podium wire protocol: command set, shared constants.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::board::{BoardId, ScoreEntry, SortMethod};

/// Current protocol version. Bumped on any wire-incompatible change.
pub const PROTOCOL_VERSION: u8 = 1;

/// Shared secret expected at the front of every frame. Compile-time
/// constant on both ends; a mismatch terminates the session.
pub const SHARED_SECRET: &str = "podium-vr-2024";

/// Fixed size of the argument block in every frame. Both ends must
/// agree; arguments are zero-padded up to this size.
pub const ARG_PACKET_SIZE: usize = 512;

/// How long a leaderboard query may stay unanswered before it is
/// evicted and reported as an error.
pub const PENDING_TIMEOUT: Duration = Duration::from_secs(60);

/// Default per-frame read timeout on the receive loop.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on a connect attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// All commands that cross the wire. Decoded once at the frame
/// boundary and matched exhaustively; there is no string dispatch
/// past that point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Client -> server: record one score. Fire and forget.
    WriteToLeaderboard { board: BoardId, entry: ScoreEntry },
    /// Client -> server: ask for a slice of one board. The reply
    /// arrives later as `LeaderboardContents` for the same board.
    SendLeaderboard {
        board: BoardId,
        count: u32,
        start_index: u32,
        sort: SortMethod,
    },
    /// Server -> client: the requested slice, keyed by board.
    LeaderboardContents {
        board: BoardId,
        entries: Vec<ScoreEntry>,
    },
    /// Either direction: terminates the receive loop. Also used as
    /// the synthetic terminator on transport failure.
    UserDisconnected,
}

impl Command {
    /// Wire name written into the frame header.
    pub fn name(&self) -> &'static str {
        match self {
            Command::WriteToLeaderboard { .. } => names::WRITE_TO_LEADERBOARD,
            Command::SendLeaderboard { .. } => names::SEND_LEADERBOARD,
            Command::LeaderboardContents { .. } => names::LEADERBOARD_CONTENTS,
            Command::UserDisconnected => names::USER_DISCONNECTED,
        }
    }

    /// Whether this command ends a receive loop.
    pub fn is_terminator(&self) -> bool {
        matches!(self, Command::UserDisconnected)
    }
}

/// Command name strings as they appear on the wire.
pub mod names {
    pub const WRITE_TO_LEADERBOARD: &str = "WriteToLeaderboard";
    pub const SEND_LEADERBOARD: &str = "SendLeaderboard";
    pub const LEADERBOARD_CONTENTS: &str = "LeaderboardContents";
    pub const USER_DISCONNECTED: &str = "UserDisconnected";
}
