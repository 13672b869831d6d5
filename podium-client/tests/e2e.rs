//! End-to-end scenarios against an in-process fake leaderboard server.

use std::time::Duration;

use podium_client::{Config, LeaderboardClient};
use podium_core::wire::FrameDecodeError;
use podium_core::{
    decode_frame, encode_frame, BoardHandle, BoardId, Command, LeaderboardSession, NetEvent,
    ScoreEntry, SortMethod,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

const TICK: Duration = Duration::from_millis(50);

fn config_for(addr: &str) -> Config {
    Config {
        server_addr: addr.to_owned(),
        connect_timeout_ms: 5_000,
        read_timeout_ms: 5_000,
    }
}

/// Read one complete frame from the stream, accumulating until the
/// codec stops asking for more.
async fn read_command(stream: &mut TcpStream, buf: &mut Vec<u8>) -> Option<Command> {
    loop {
        match decode_frame(buf) {
            Ok((cmd, n)) => {
                buf.drain(..n);
                return Some(cmd);
            }
            Err(FrameDecodeError::NeedMore) => {}
            Err(_) => return None,
        }
        let mut chunk = [0u8; 4096];
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

/// Fake server: stores submitted entries, answers queries after
/// `response_delay`, stops on the terminator. Reports every decoded
/// command on the returned channel.
async fn run_fake_server(
    listener: TcpListener,
    response_delay: Duration,
    answer_queries: bool,
    seen: mpsc::UnboundedSender<Command>,
) {
    let (mut stream, _) = listener.accept().await.unwrap();
    let mut buf = Vec::new();
    let mut stored: Vec<ScoreEntry> = Vec::new();
    while let Some(cmd) = read_command(&mut stream, &mut buf).await {
        let _ = seen.send(cmd.clone());
        match cmd {
            Command::WriteToLeaderboard { entry, .. } => stored.push(entry),
            Command::SendLeaderboard { board, count, .. } => {
                if answer_queries {
                    let entries: Vec<ScoreEntry> =
                        stored.iter().take(count as usize).cloned().collect();
                    let frame = encode_frame(&Command::LeaderboardContents { board, entries })
                        .unwrap();
                    tokio::time::sleep(response_delay).await;
                    stream.write_all(&frame).await.unwrap();
                }
            }
            Command::UserDisconnected => break,
            Command::LeaderboardContents { .. } => {}
        }
    }
}

#[tokio::test]
async fn submit_then_query_resolves_after_server_responds() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (seen_tx, _seen_rx) = mpsc::unbounded_channel();
    // Respond after roughly two ticks.
    tokio::spawn(run_fake_server(listener, TICK * 2, true, seen_tx));

    let client = LeaderboardClient::new(config_for(&addr));
    client.connect().await.unwrap();
    assert!(client.is_connected().await);

    client
        .submit_score(BoardId::Beginner, ScoreEntry::new("A", 100, 1_700_000_000))
        .await;
    let sink = BoardHandle::new();
    client
        .request_leaderboard(
            BoardId::Beginner,
            10,
            0,
            SortMethod::HighScoreFirst,
            sink.clone(),
        )
        .await;
    assert_eq!(client.pending_len().await, 1);

    let mut resolved = false;
    for _ in 0..100 {
        tokio::time::sleep(TICK).await;
        let events = client.tick(TICK).await;
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, NetEvent::Error(_))),
            "no errors expected: {events:?}"
        );
        if client.pending_len().await == 0 {
            resolved = true;
            break;
        }
    }
    assert!(resolved, "query never resolved");
    let entries = sink.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].player, "A");
    assert_eq!(entries[0].score, 100);

    client.disconnect().await;
}

#[tokio::test]
async fn unanswered_query_evicts_with_one_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (seen_tx, _seen_rx) = mpsc::unbounded_channel();
    // Server accepts everything but never answers queries.
    tokio::spawn(run_fake_server(listener, Duration::ZERO, false, seen_tx));

    let session = LeaderboardSession::with_pending_timeout(Duration::from_millis(200));
    let client = LeaderboardClient::with_session(config_for(&addr), session);
    client.connect().await.unwrap();

    let sink = BoardHandle::new();
    client
        .request_leaderboard(
            BoardId::Beginner,
            10,
            0,
            SortMethod::HighScoreFirst,
            sink.clone(),
        )
        .await;

    let mut eviction_errors = 0;
    for _ in 0..20 {
        tokio::time::sleep(TICK).await;
        for ev in client.tick(TICK).await {
            if let NetEvent::Error(text) = ev {
                assert!(text.contains("Beginner"), "unexpected error: {text}");
                eviction_errors += 1;
            }
        }
    }
    assert_eq!(eviction_errors, 1);
    assert!(sink.is_empty());
    assert_eq!(client.pending_len().await, 0);
    // The connection itself is unaffected.
    assert!(client.is_connected().await);
}

#[tokio::test]
async fn duplicate_query_keeps_single_pending_request() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (seen_tx, _seen_rx) = mpsc::unbounded_channel();
    tokio::spawn(run_fake_server(listener, TICK * 4, true, seen_tx));

    let client = LeaderboardClient::new(config_for(&addr));
    client.connect().await.unwrap();
    client
        .submit_score(BoardId::Expert, ScoreEntry::new("B", 55, 0))
        .await;

    let sink = BoardHandle::new();
    for _ in 0..3 {
        client
            .request_leaderboard(
                BoardId::Expert,
                5,
                0,
                SortMethod::HighScoreFirst,
                sink.clone(),
            )
            .await;
    }
    assert_eq!(client.pending_len().await, 1);
}

#[tokio::test]
async fn graceful_disconnect_reaches_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    tokio::spawn(run_fake_server(listener, Duration::ZERO, true, seen_tx));

    let client = LeaderboardClient::new(config_for(&addr));
    client.connect().await.unwrap();
    client
        .submit_score(BoardId::Advanced, ScoreEntry::new("C", 7, 0))
        .await;
    client.disconnect().await;
    assert!(!client.is_connected().await);

    let first = seen_rx.recv().await.unwrap();
    assert!(matches!(first, Command::WriteToLeaderboard { .. }));
    let second = seen_rx.recv().await.unwrap();
    assert!(second.is_terminator());
}
