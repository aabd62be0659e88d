//! Crate-wide error type
use crate::ipc::protocol::ParseError;
use std::num::ParseIntError;

/// Result type for fallible operations across `mywm`.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while running the window manager.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The X11 connection was lost. Per spec.md this is the only fatal error kind:
    /// it triggers an orderly shutdown rather than being handled locally.
    #[error("X11 connection lost: {0}")]
    ConnectionLost(String),

    /// A single X request failed for a specific window (the window may already be
    /// gone). Callers drop the offending window from state rather than propagating.
    #[error("X request failed for window {id}: {source}")]
    WindowRequest {
        /// The window the failing request targeted
        id: u32,
        /// The underlying connection error
        #[source]
        source: Box<Error>,
    },

    /// Wrapper around `x11rb` connection errors
    #[cfg(feature = "x11rb")]
    #[error(transparent)]
    X11rbConnect(#[from] x11rb::errors::ConnectError),

    /// Wrapper around `x11rb` connection errors raised mid-session
    #[cfg(feature = "x11rb")]
    #[error(transparent)]
    X11rbConnection(#[from] x11rb::errors::ConnectionError),

    /// Wrapper around `x11rb` reply errors
    #[cfg(feature = "x11rb")]
    #[error(transparent)]
    X11rbReply(#[from] x11rb::errors::ReplyError),

    /// Wrapper around `x11rb` reply-or-id errors
    #[cfg(feature = "x11rb")]
    #[error(transparent)]
    X11rbReplyOrId(#[from] x11rb::errors::ReplyOrIdError),

    /// `view ws n` / `send ws n` / `move-ws n monitor m` referenced a workspace
    /// index that does not exist
    #[error("unknown-workspace")]
    UnknownWorkspace,

    /// A rule or `move-ws` command referenced a monitor id that does not exist
    #[error("unknown-monitor")]
    UnknownMonitor,

    /// A `scratch toggle <name>` referenced a name that was never registered
    #[error("unknown-scratchpad: {0}")]
    UnknownScratchpad(String),

    /// A `bind` keycombo or `resize` axis token did not match the grammar
    #[error("parse error: {0}")]
    Protocol(#[from] ParseError),

    /// A hex color string was not `#rrggbb`
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// The config source process exited non-zero. The exit code is retained so
    /// the interactive `reload-config` reply can report `ERR config <code>`.
    #[error("config {0}")]
    ConfigExited(i32),

    /// I/O failure talking to the IPC socket, the config source, or the
    /// filesystem watcher
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    ParseInt(#[from] ParseIntError),
}

impl Error {
    /// Wrap this error as having occurred while handling a specific window, per
    /// spec.md §7(b): "X transient failure for a specific window ... drop the
    /// window from state".
    pub fn for_window(self, id: u32) -> Error {
        Error::WindowRequest {
            id,
            source: Box::new(self),
        }
    }

    /// Whether this error kind is fatal to the whole manager (spec.md §7(e)) as
    /// opposed to local to one window or one IPC client.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ConnectionLost(_))
    }
}
