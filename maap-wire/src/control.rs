//! The local control protocol: text commands in, one text line per notification out.
//!
//! ```text
//! init [<range_base> <range_size>]
//! reserve <addr_size> [<preferred_base>]
//! release <id>
//! status <id>
//! yield <id>
//! exit
//! ```

use std::{fmt, str::FromStr};

use bytes::{BufMut, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

use maap_common::{constants, MacAddr};

/// Longest command line accepted from a client.
const MAX_LINE_LENGTH: usize = 1024;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0:?}")]
    Io(#[from] std::io::Error),
    #[error("Command line longer than {MAX_LINE_LENGTH} bytes")]
    LineTooLong,
}

impl From<LinesCodecError> for Error {
    fn from(e: LinesCodecError) -> Self {
        match e {
            LinesCodecError::Io(e) => Self::Io(e),
            LinesCodecError::MaxLineLengthExceeded => Self::LineTooLong,
        }
    }
}

/// A command line that could not be understood.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid command type")]
    UnknownCommand,
    #[error("Wrong number of arguments for {0}")]
    Arity(&'static str),
    #[error("Invalid argument {0:?}")]
    Argument(String),
}

/// Result codes carried by every [`Notification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorCode {
    #[default]
    None,
    RequiresInitialization,
    AlreadyInitialized,
    ReserveNotAvailable,
    ReleaseInvalidId,
    OutOfMemory,
    Internal,
}

impl ErrorCode {
    fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::RequiresInitialization => "requires_initialization",
            Self::AlreadyInitialized => "already_initialized",
            Self::ReserveNotAvailable => "reserve_not_available",
            Self::ReleaseInvalidId => "release_invalid_id",
            Self::OutOfMemory => "out_of_memory",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyKind {
    Initialized,
    Acquiring,
    Acquired,
    Released,
    Status,
    Yielded,
}

impl fmt::Display for NotifyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initialized => "Initialized",
            Self::Acquiring => "Acquiring",
            Self::Acquired => "Acquired",
            Self::Released => "Released",
            Self::Status => "Status",
            Self::Yielded => "Yielded",
        };
        f.write_str(s)
    }
}

/// An asynchronous result, delivered to whoever should hear about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotifyKind,
    /// The reservation id, or -1 when the notification is not about a reservation.
    pub id: i32,
    /// First address of the range.
    pub start: u64,
    /// Number of addresses in the range.
    pub count: u32,
    pub result: ErrorCode,
}

impl Notification {
    pub fn new(kind: NotifyKind, id: i32, start: u64, count: u32) -> Self {
        Self { kind, id, start, count, result: ErrorCode::None }
    }

    pub fn with_result(mut self, result: ErrorCode) -> Self {
        self.result = result;
        self
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} id={} start={} count={} result={}",
            self.kind,
            self.id,
            MacAddr::new(self.start),
            self.count,
            self.result
        )
    }
}

/// A request from a local client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Init { start: u64, count: u32 },
    Reserve { count: u32, preferred: Option<u64> },
    Release { id: i32 },
    Status { id: i32 },
    Yield { id: i32 },
    Help,
    Exit,
}

impl Command {
    /// The usage text shown to clients that sent something we could not parse.
    pub fn usage() -> String {
        format!(
            "input usage:\n\
             \x20   init [<range_base> <range_size>] - Initialize the MAAP daemon to recognize the specified range of addresses\n\
             \x20       If not specified, range_base=0x{:012x}, range_size=0x{:04x}\n\
             \x20   reserve <addr_size> [<preferred_base>] - Reserve a range of addresses of size <addr_size> in the initialized range\n\
             \x20   release <id> - Release the range of addresses with identifier ID\n\
             \x20   status <id> - Get the range of addresses associated with identifier ID\n\
             \x20   yield <id> - Yield the range of addresses associated with identifier ID\n\
             \x20   exit - Shutdown the MAAP daemon",
            constants::DYNAMIC_POOL_BASE,
            constants::DYNAMIC_POOL_SIZE
        )
    }
}

/// Parses an integer the way `strtoul(s, NULL, 0)` would: `0x` prefixed hex or decimal.
fn parse_int<T: TryFrom<u64>>(s: &str) -> Result<T, ParseError> {
    let err = || ParseError::Argument(s.to_string());
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    }
    .map_err(|_| err())?;

    T::try_from(value).map_err(|_| err())
}

fn parse_id(s: &str) -> Result<i32, ParseError> {
    s.parse::<i32>().map_err(|_| ParseError::Argument(s.to_string()))
}

fn parse_address(s: &str) -> Result<u64, ParseError> {
    s.parse::<MacAddr>().map(|mac| mac.as_u64()).map_err(|_| ParseError::Argument(s.to_string()))
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let args: Vec<&str> = s.split_whitespace().collect();
        let Some((&cmd, args)) = args.split_first() else {
            return Err(ParseError::UnknownCommand);
        };

        match (cmd, args) {
            ("init", []) => Ok(Self::Init {
                start: constants::DYNAMIC_POOL_BASE,
                count: constants::DYNAMIC_POOL_SIZE,
            }),
            ("init", [start, count]) => {
                Ok(Self::Init { start: parse_address(start)?, count: parse_int(count)? })
            }
            ("init", _) => Err(ParseError::Arity("init")),
            ("reserve", [count]) => Ok(Self::Reserve { count: parse_int(count)?, preferred: None }),
            ("reserve", [count, base]) => {
                Ok(Self::Reserve { count: parse_int(count)?, preferred: Some(parse_address(base)?) })
            }
            ("reserve", _) => Err(ParseError::Arity("reserve")),
            ("release", [id]) => Ok(Self::Release { id: parse_id(id)? }),
            ("release", _) => Err(ParseError::Arity("release")),
            ("status", [id]) => Ok(Self::Status { id: parse_id(id)? }),
            ("status", _) => Err(ParseError::Arity("status")),
            ("yield", [id]) => Ok(Self::Yield { id: parse_id(id)? }),
            ("yield", _) => Err(ParseError::Arity("yield")),
            ("help", []) => Ok(Self::Help),
            ("exit", []) => Ok(Self::Exit),
            _ => Err(ParseError::UnknownCommand),
        }
    }
}

/// A line sent back to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Notify(Notification),
    Text(String),
}

impl From<Notification> for Response {
    fn from(n: Notification) -> Self {
        Self::Notify(n)
    }
}

/// Line-based codec for the control connection.
///
/// Decodes one [`Command`] per line. Lines that fail to parse are handed to the caller as
/// `Err(ParseError)` instead of failing the stream, so a typo doesn't close the connection.
#[derive(Debug)]
pub struct Codec {
    lines: LinesCodec,
}

impl Codec {
    pub fn new() -> Self {
        Self { lines: LinesCodec::new_with_max_length(MAX_LINE_LENGTH) }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for Codec {
    type Item = Result<Command, ParseError>;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(line) = self.lines.decode(src)? else {
                return Ok(None);
            };

            // Blank lines are not commands
            if line.trim().is_empty() {
                continue;
            }

            return Ok(Some(line.parse()));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.lines.decode_eof(src)? {
            Some(line) if !line.trim().is_empty() => Ok(Some(line.parse())),
            _ => Ok(None),
        }
    }
}

impl Encoder<Response> for Codec {
    type Error = Error;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = match item {
            Response::Notify(n) => n.to_string(),
            Response::Text(text) => text,
        };

        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');

        Ok(())
    }
}
