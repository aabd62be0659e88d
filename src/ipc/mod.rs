//! The IPC control plane: the request grammar and the Unix-socket server
//! that exposes it (spec.md §4.6, §6).
pub mod protocol;
pub mod server;

pub use protocol::{parse_line, ParseError, QueryTarget, Request};
pub use server::{ClientId, IpcServer, Inbound};
