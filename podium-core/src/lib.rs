//! Podium leaderboard protocol reference implementation.
//! Host-driven: no I/O; the host feeds frames and ticks, and gets
//! outbound frames and events back.

pub mod board;
pub mod events;
pub mod pending;
pub mod protocol;
pub mod session;
pub mod wire;

pub use board::{BoardHandle, BoardId, ResultStore, ScoreEntry, SortMethod};
pub use events::{EventQueue, NetEvent};
pub use pending::PendingSet;
pub use protocol::{
    Command, ARG_PACKET_SIZE, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT, PENDING_TIMEOUT,
    PROTOCOL_VERSION, SHARED_SECRET,
};
pub use session::LeaderboardSession;
pub use wire::{decode_frame, encode_frame, FrameDecodeError, FrameEncodeError};
