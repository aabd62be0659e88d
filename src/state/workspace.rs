//! A named, ordered set of tiled windows plus an unordered floating set
//! (spec.md §3 "Workspace").
use crate::layout::Bsp;
use crate::x::Xid;

/// One workspace. `tiled` is the BSP tree over the ordered tiled sequence;
/// `floating` holds windows that opted out of tiling.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Stable integer index, as named in `set-workspaces` (spec.md §6)
    pub index: usize,
    /// Human label, e.g. `dev`
    pub label: String,
    /// The BSP tree over this workspace's tiled windows
    pub tiled: Bsp,
    /// Windows floating on this workspace
    pub floating: Vec<Xid>,
    /// The monitor id currently hosting this workspace
    pub monitor: usize,
    /// Whether this workspace is the one currently displayed on its monitor
    pub visible: bool,
}

impl Workspace {
    /// A new, empty workspace hosted by `monitor`.
    pub fn new(index: usize, label: String, monitor: usize) -> Self {
        Self {
            index,
            label,
            tiled: Bsp::new(),
            floating: Vec::new(),
            monitor,
            visible: false,
        }
    }

    /// Whether any window, tiled or floating, currently lives here.
    pub fn is_occupied(&self) -> bool {
        !self.tiled.is_empty() || !self.floating.is_empty()
    }

    /// Remove `window` from whichever set holds it. A no-op if it is in
    /// neither.
    pub fn remove(&mut self, window: Xid) {
        self.tiled.remove(window);
        self.floating.retain(|&w| w != window);
    }
}
