//! The window-state engine: the authoritative owner of the window, workspace
//! and monitor maps (spec.md §4.5).
pub mod engine;
mod monitor;
mod window;
mod workspace;

pub use engine::Engine;
pub use monitor::Monitor;
pub use window::Window;
pub use workspace::Workspace;

use crate::x::Xid;
use serde::Serialize;
use std::str::FromStr;

/// A direction for `focus`/`move` commands (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `left`
    Left,
    /// `right`
    Right,
    /// `up`
    Up,
    /// `down`
    Down,
}

impl FromStr for Direction {
    type Err = crate::ipc::protocol::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(crate::ipc::protocol::ParseError::BadArgument {
                verb: "direction".to_string(),
                text: other.to_string(),
            }),
        }
    }
}

/// One of the border bands a frame draws, named in `set-border`/`set-color`
/// (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderBand {
    /// `inner`
    Inner,
    /// `outer`
    Outer,
}

/// A state change broadcast to every IPC subscriber (spec.md §4.6 "Event
/// lines"). `#[serde(tag = "event", content = "payload")]` reproduces the wire
/// shape `{"event":"<name>","payload":{...}}` directly from the enum.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum StateEvent {
    /// Workspace occupancy changed
    Workspace {
        /// The currently visible workspace's index, from the subscriber's monitor
        active: usize,
        /// Every workspace index with at least one window
        occupied: Vec<usize>,
    },
    /// The focused window changed
    Focus {
        /// The newly focused window's id
        win: u32,
        /// Its title, for bars that display it directly
        title: String,
    },
    /// Bar visibility was toggled
    BarToggle {
        /// The bar's new visibility
        visible: bool,
    },
}

/// A registered scratchpad: the spawn command used the first time it is
/// toggled, and the window id once it has actually appeared (spec.md §4.5
/// "Scratchpad").
#[derive(Debug, Clone, Default)]
pub struct Scratchpad {
    pub(crate) spawn_command: String,
    pub(crate) window: Option<Xid>,
    pub(crate) visible: bool,
}
