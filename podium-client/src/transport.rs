//! Transport: bounded connect, writer task, frame receive loop.
//!
//! The session itself is sans-I/O; this module owns the socket. The
//! receive loop runs on its own task so blocking reads never share the
//! game tick, and feeds decoded commands into the shared session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use podium_core::wire::FrameDecodeError;
use podium_core::{decode_frame, encode_frame, Command, LeaderboardSession, NetEvent};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Session shared between the game loop and the receive loop task.
pub type SharedSession = Arc<Mutex<LeaderboardSession>>;

const READ_CHUNK: usize = 4096;

enum ConnState {
    Disconnected,
    Connecting,
    Connected {
        outbound: mpsc::UnboundedSender<Vec<u8>>,
        reader: JoinHandle<()>,
    },
}

/// Connection lifecycle manager. Owns the socket exclusively; at most
/// one connect attempt is in flight at a time.
#[derive(Clone)]
pub struct Connection {
    state: Arc<Mutex<ConnState>>,
    /// Bumped on every successful connect and every disconnect so a
    /// stale receive loop cannot clobber a newer connection's state.
    epoch: Arc<AtomicU64>,
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("already connecting")]
    AlreadyConnecting,
    #[error("already connected")]
    AlreadyConnected,
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Connection {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ConnState::Disconnected)),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Open a connection, bounded by `connect_timeout`, and start the
    /// writer and receive-loop tasks. Awaitable: the returned result
    /// is the real outcome of the attempt. Rejected synchronously if
    /// an attempt is in flight or the transport is already open; the
    /// rejection also surfaces as a user-visible event.
    pub async fn connect(
        &self,
        addr: &str,
        connect_timeout: Duration,
        read_timeout: Duration,
        session: SharedSession,
    ) -> Result<(), ConnectError> {
        {
            let mut st = self.state.lock().await;
            match &*st {
                ConnState::Connecting => {
                    session
                        .lock()
                        .await
                        .push_event(NetEvent::Error("already connecting".into()));
                    return Err(ConnectError::AlreadyConnecting);
                }
                ConnState::Connected { .. } => {
                    session
                        .lock()
                        .await
                        .push_event(NetEvent::Error("already connected".into()));
                    return Err(ConnectError::AlreadyConnected);
                }
                ConnState::Disconnected => *st = ConnState::Connecting,
            }
        }
        session.lock().await.push_event(NetEvent::ConnectRequested);

        let stream = match tokio::time::timeout(connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                self.abandon(&session, format!("connect to {addr} failed: {e}"))
                    .await;
                return Err(ConnectError::Io(e));
            }
            Err(_) => {
                self.abandon(&session, format!("connect to {addr} timed out"))
                    .await;
                return Err(ConnectError::Timeout(connect_timeout));
            }
        };

        log::debug!("connected to {addr}");
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let (reader, writer) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel::<Vec<u8>>();
        // Hold the state lock across the spawn so an instantly-dying
        // receive loop cannot reset the state before it is recorded.
        let mut st = self.state.lock().await;
        tokio::spawn(write_loop(writer, rx));
        let reader_task = tokio::spawn(receive_loop(
            reader,
            session.clone(),
            self.state.clone(),
            self.epoch.clone(),
            epoch,
            read_timeout,
        ));
        *st = ConnState::Connected {
            outbound: tx,
            reader: reader_task,
        };
        session.lock().await.set_connected(true);
        drop(st);
        Ok(())
    }

    async fn abandon(&self, session: &SharedSession, text: String) {
        log::warn!("{text}");
        *self.state.lock().await = ConnState::Disconnected;
        session.lock().await.push_event(NetEvent::Error(text));
    }

    /// Close the connection if open. Idempotent; never fails from the
    /// caller's point of view. Sends the graceful terminator first so
    /// the server can end its own receive loop.
    pub async fn disconnect(&self, session: &SharedSession) {
        let mut st = self.state.lock().await;
        if let ConnState::Connected { outbound, reader } = &*st {
            if let Ok(frame) = encode_frame(&Command::UserDisconnected) {
                let _ = outbound.send(frame);
            }
            // Stop the receive loop now: a parked read would otherwise
            // hold the socket until its timeout and keep feeding
            // old-server frames into the session.
            reader.abort();
            self.epoch.fetch_add(1, Ordering::SeqCst);
            *st = ConnState::Disconnected;
            let mut s = session.lock().await;
            s.push_event(NetEvent::DisconnectRequested);
            s.set_connected(false);
        }
    }

    /// Recorded liveness: true only while the transport is open. This
    /// is the single liveness definition; there is no secondary
    /// socket poll.
    pub async fn is_connected(&self) -> bool {
        matches!(&*self.state.lock().await, ConnState::Connected { .. })
    }

    /// Queue a frame for the writer task. False if disconnected.
    pub async fn send(&self, frame: Vec<u8>) -> bool {
        match &*self.state.lock().await {
            ConnState::Connected { outbound, .. } => outbound.send(frame).is_ok(),
            _ => false,
        }
    }
}

async fn write_loop(mut writer: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(frame) = rx.recv().await {
        if writer.write_all(&frame).await.is_err() {
            break;
        }
        let _ = writer.flush().await;
    }
    // Dropping the write half sends FIN; the channel closing is the
    // disconnect signal.
}

/// Decode frames until a terminator, a read timeout, a transport
/// error, or a protocol violation. Whatever the exit path, the
/// terminating command is dispatched into the session exactly once,
/// after the loop — and only while this loop's connection is still
/// the current one. A loop whose connection was superseded by a
/// disconnect or reconnect must not touch the shared session at all.
async fn receive_loop(
    mut reader: OwnedReadHalf,
    session: SharedSession,
    state: Arc<Mutex<ConnState>>,
    epoch: Arc<AtomicU64>,
    my_epoch: u64,
    read_timeout: Duration,
) {
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    let exit_event: Option<NetEvent> = 'session: loop {
        // Drain every complete frame already buffered.
        loop {
            match decode_frame(&buf) {
                Ok((cmd, n)) => {
                    buf.drain(..n);
                    if cmd.is_terminator() {
                        break 'session None;
                    }
                    if epoch.load(Ordering::SeqCst) != my_epoch {
                        return;
                    }
                    session.lock().await.handle_command(cmd);
                }
                Err(FrameDecodeError::NeedMore) => break,
                Err(e) => {
                    // Secret mismatch and malformed frames are hard
                    // rejects, not retries.
                    log::warn!("protocol violation, terminating session: {e}");
                    break 'session Some(NetEvent::Error(format!("protocol violation: {e}")));
                }
            }
        }
        match tokio::time::timeout(read_timeout, reader.read(&mut chunk)).await {
            Ok(Ok(0)) => break Some(NetEvent::Log("server closed the connection".into())),
            Ok(Ok(n)) => buf.extend_from_slice(&chunk[..n]),
            Ok(Err(e)) => break Some(NetEvent::Error(format!("read failed: {e}"))),
            Err(_) => break Some(NetEvent::Error("read timed out".into())),
        }
    };
    // State lock first, then the epoch check: disconnect bumps the
    // epoch under the same lock, so a stale loop reliably goes silent.
    let mut st = state.lock().await;
    if epoch.load(Ordering::SeqCst) != my_epoch {
        return;
    }
    let mut s = session.lock().await;
    if let Some(event) = exit_event {
        s.push_event(event);
    }
    s.handle_command(Command::UserDisconnected);
    drop(s);
    *st = ConnState::Disconnected;
}
