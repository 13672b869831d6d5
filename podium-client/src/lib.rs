//! Podium leaderboard client for tokio hosts: connection lifecycle,
//! frame receive loop, and file/env configuration. The protocol and
//! session state live in `podium-core`.

pub mod client;
pub mod config;
pub mod transport;

pub use client::LeaderboardClient;
pub use config::Config;
pub use transport::{ConnectError, Connection, SharedSession};
