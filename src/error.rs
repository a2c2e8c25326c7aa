use std::io;

use thiserror::Error;

/// Everything that can go wrong while driving the debugger.
///
/// Parse failures never terminate a session; only pipe-level I/O does.
#[derive(Debug, Error)]
pub enum MiError {
    #[error("cannot start debugger: {0}")]
    Spawn(#[source] io::Error),

    #[error("debugger pipe failed: {0}")]
    Io(#[from] io::Error),

    #[error("malformed value at offset {offset}: {reason}")]
    MalformedValue { offset: usize, reason: &'static str },

    /// The debugger answered `^error,msg="..."`. The session stays up.
    #[error("debugger reported an error: {0}")]
    Protocol(String),

    #[error("unknown result class '{0}'")]
    UnknownResultClass(String),

    #[error("unknown stop reason '{0}'")]
    UnknownStopReason(String),

    #[error("unknown breakpoint type '{0}'")]
    UnknownBreakpointType(String),

    #[error("result payload is missing '{0}'")]
    MissingPayload(&'static str),

    /// The operation outlived the session.
    #[error("session closed")]
    SessionClosed,
}

pub type Result<T> = std::result::Result<T, MiError>;
