//! A single managed client (spec.md §3 "Window").
use crate::frame::Frame;
use crate::geometry::Rect;
use crate::x::Xid;

/// A window under management: identity is its X id (held by [Frame::client]
/// here); everything else is the bookkeeping spec.md §3 names.
#[derive(Debug, Clone)]
pub struct Window {
    /// The decoration window reparenting this client; destroyed as a pair
    /// with the client (spec.md §3 "Frame" invariant).
    pub frame: Frame,
    /// `WM_CLASS`'s class string, if known
    pub class: Option<String>,
    /// The window's title
    pub title: Option<String>,
    /// The workspace index currently hosting this window
    pub workspace: usize,
    /// Whether the window floats instead of being tiled by the BSP tree
    pub floating: bool,
    /// Geometry remembered across float toggles (spec.md §3 "floating
    /// geometry (remembered across float toggles)")
    pub floating_geometry: Option<Rect>,
    /// Whether this window is fullscreen
    pub fullscreen: bool,
    /// The scratchpad name this window was spawned for, if any. Scratchpad
    /// clients are excluded from layout and workspace occupancy (spec.md
    /// §4.5 "Scratchpad").
    pub scratch: Option<String>,
    /// Whether the frame is currently mapped
    pub mapped: bool,
}

impl Window {
    /// The client's X id.
    pub fn id(&self) -> Xid {
        self.frame.client
    }
}
