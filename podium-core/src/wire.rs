//! Framing: length-prefixed secret + command name, fixed-size argument block.
//!
//! Layout (both directions):
//! `[u32 LE len][secret][u32 LE len][command name][ARG_PACKET_SIZE arg bytes]`
//!
//! Arguments are bincode, zero-padded to [`ARG_PACKET_SIZE`]. Both ends
//! must agree on the layout byte-for-byte; a short read is an error,
//! not a partial frame.

use crate::protocol::{names, Command, ARG_PACKET_SIZE, SHARED_SECRET};

const LEN_SIZE: usize = 4;
/// Bound on the secret / command-name fields. Anything longer is a
/// malformed or hostile frame.
const MAX_HEADER_STRING: usize = 64;

/// Encode a command into a single frame.
pub fn encode_frame(cmd: &Command) -> Result<Vec<u8>, FrameEncodeError> {
    let args = encode_args(cmd)?;
    if args.len() > ARG_PACKET_SIZE {
        return Err(FrameEncodeError::ArgsTooLarge {
            len: args.len(),
            max: ARG_PACKET_SIZE,
        });
    }
    let name = cmd.name();
    let mut out = Vec::with_capacity(
        LEN_SIZE + SHARED_SECRET.len() + LEN_SIZE + name.len() + ARG_PACKET_SIZE,
    );
    write_str(&mut out, SHARED_SECRET);
    write_str(&mut out, name);
    out.extend_from_slice(&args);
    out.resize(out.len() + (ARG_PACKET_SIZE - args.len()), 0);
    Ok(out)
}

fn write_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn encode_args(cmd: &Command) -> Result<Vec<u8>, FrameEncodeError> {
    let bytes = match cmd {
        Command::WriteToLeaderboard { board, entry } => bincode::serialize(&(board, entry))?,
        Command::SendLeaderboard {
            board,
            count,
            start_index,
            sort,
        } => bincode::serialize(&(board, count, start_index, sort))?,
        Command::LeaderboardContents { board, entries } => bincode::serialize(&(board, entries))?,
        // The terminator carries no arguments; the block stays zeroed.
        Command::UserDisconnected => Vec::new(),
    };
    Ok(bytes)
}

/// Error encoding a command into a frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameEncodeError {
    #[error("encode error: {0}")]
    Encode(#[from] bincode::Error),
    #[error("arguments too large: {len} bytes exceeds the {max}-byte packet")]
    ArgsTooLarge { len: usize, max: usize },
}

/// Decode one frame from the front of `bytes`. Returns the command and
/// the number of bytes consumed. Call with a partial buffer; `NeedMore`
/// means the caller should read more data and try again.
pub fn decode_frame(bytes: &[u8]) -> Result<(Command, usize), FrameDecodeError> {
    let mut pos = 0usize;
    let secret = read_str(bytes, &mut pos)?;
    if secret != SHARED_SECRET {
        return Err(FrameDecodeError::SecretMismatch);
    }
    let name = read_str(bytes, &mut pos)?;
    if bytes.len() < pos + ARG_PACKET_SIZE {
        return Err(FrameDecodeError::NeedMore);
    }
    let args = &bytes[pos..pos + ARG_PACKET_SIZE];
    pos += ARG_PACKET_SIZE;
    let cmd = decode_args(&name, args)?;
    Ok((cmd, pos))
}

fn read_str(bytes: &[u8], pos: &mut usize) -> Result<String, FrameDecodeError> {
    if bytes.len() < *pos + LEN_SIZE {
        return Err(FrameDecodeError::NeedMore);
    }
    let len = u32::from_le_bytes([
        bytes[*pos],
        bytes[*pos + 1],
        bytes[*pos + 2],
        bytes[*pos + 3],
    ]) as usize;
    if len > MAX_HEADER_STRING {
        return Err(FrameDecodeError::TooLarge);
    }
    if bytes.len() < *pos + LEN_SIZE + len {
        return Err(FrameDecodeError::NeedMore);
    }
    let s = std::str::from_utf8(&bytes[*pos + LEN_SIZE..*pos + LEN_SIZE + len])
        .map_err(|_| FrameDecodeError::BadUtf8)?
        .to_owned();
    *pos += LEN_SIZE + len;
    Ok(s)
}

fn decode_args(name: &str, args: &[u8]) -> Result<Command, FrameDecodeError> {
    // bincode ignores the zero padding past the encoded value.
    let cmd = match name {
        names::WRITE_TO_LEADERBOARD => {
            let (board, entry) = bincode::deserialize(args)?;
            Command::WriteToLeaderboard { board, entry }
        }
        names::SEND_LEADERBOARD => {
            let (board, count, start_index, sort) = bincode::deserialize(args)?;
            Command::SendLeaderboard {
                board,
                count,
                start_index,
                sort,
            }
        }
        names::LEADERBOARD_CONTENTS => {
            let (board, entries) = bincode::deserialize(args)?;
            Command::LeaderboardContents { board, entries }
        }
        names::USER_DISCONNECTED => Command::UserDisconnected,
        other => return Err(FrameDecodeError::UnknownCommand(other.to_owned())),
    };
    Ok(cmd)
}

/// Error decoding a frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameDecodeError {
    #[error("need more bytes")]
    NeedMore,
    #[error("header field too large")]
    TooLarge,
    #[error("shared secret mismatch")]
    SecretMismatch,
    #[error("header field is not valid UTF-8")]
    BadUtf8,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("decode error: {0}")]
    Decode(#[from] bincode::Error),
}

impl FrameDecodeError {
    /// Whether the session must terminate: the peer either does not
    /// share our secret or speaks a different command set. Short reads
    /// are not violations, only incomplete input.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            FrameDecodeError::SecretMismatch
                | FrameDecodeError::UnknownCommand(_)
                | FrameDecodeError::BadUtf8
                | FrameDecodeError::TooLarge
                | FrameDecodeError::Decode(_)
        )
    }
}
