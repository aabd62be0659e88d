//! A dynamic tiling window manager for X11 with a socket-based control plane.
//!
//! The crate is organised the way the reactor actually uses it: [x] is the
//! display gateway boundary, [state] owns the authoritative window/workspace
//! state, [ipc] is the control socket, [config] drives both from an external
//! source, and [reactor] is the single thread that ties them together
//! (spec.md §2, §5).
pub mod backend;
pub mod bar;
pub mod bindings;
pub mod color;
pub mod config;
pub mod dispatch;
mod error;
pub mod frame;
pub mod geometry;
pub mod ipc;
pub mod keysyms;
pub mod layout;
pub mod reactor;
pub mod rules;
pub mod state;
pub mod x;

pub use error::{Error, Result};
pub use x::Xid;
