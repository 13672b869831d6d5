//! Event fan-out: buffer notifications from the network layer, drain
//! once per tick on the game loop side. No replay; a drain clears.

use std::fmt;

/// Notification surfaced to the game loop. All failures in detached
/// code (connect task, receive loop) arrive here rather than as
/// return values, so gameplay only ever sees "a message appeared".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetEvent {
    /// Diagnostic text, not user-facing.
    Log(String),
    /// User-facing informational text.
    Message(String),
    /// User-facing failure text.
    Error(String),
    /// Liveness changed; true when the transport opened.
    ConnectionStatus(bool),
    /// A connect attempt was requested (not a success guarantee).
    ConnectRequested,
    /// A disconnect was requested.
    DisconnectRequested,
}

impl fmt::Display for NetEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetEvent::Log(s) => write!(f, "log: {s}"),
            NetEvent::Message(s) => write!(f, "message: {s}"),
            NetEvent::Error(s) => write!(f, "error: {s}"),
            NetEvent::ConnectionStatus(up) => write!(f, "connection status: {up}"),
            NetEvent::ConnectRequested => f.write_str("connect requested"),
            NetEvent::DisconnectRequested => f.write_str("disconnect requested"),
        }
    }
}

/// Single-writer, single-reader buffer between network timing and the
/// tick. Push from the network side; drain exactly once per tick.
#[derive(Debug, Default)]
pub struct EventQueue {
    buffered: Vec<NetEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: NetEvent) {
        self.buffered.push(event);
    }

    pub fn push_log(&mut self, text: impl Into<String>) {
        self.push(NetEvent::Log(text.into()));
    }

    pub fn push_message(&mut self, text: impl Into<String>) {
        self.push(NetEvent::Message(text.into()));
    }

    pub fn push_error(&mut self, text: impl Into<String>) {
        self.push(NetEvent::Error(text.into()));
    }

    /// Take everything buffered since the last drain. The queue is
    /// cleared unconditionally; events are delivered at most once.
    pub fn drain(&mut self) -> Vec<NetEvent> {
        std::mem::take(&mut self.buffered)
    }

    pub fn is_empty(&self) -> bool {
        self.buffered.is_empty()
    }
}
