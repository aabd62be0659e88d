//! A managed client's decoration window (spec.md §3 "Frame", §4.2).
use crate::color::Color;
use crate::geometry::Rect;
use crate::x::{Xid, XConn};
use crate::Result;

/// Border appearance shared by every frame, mutated at runtime by `set-border`
/// and `set-color` (spec.md §6) and reset to defaults on `reload-config`
/// (spec.md §4.8).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderStyle {
    /// Inner border width in pixels
    pub inner_width: u32,
    /// Outer border width in pixels
    pub outer_width: u32,
    /// Inner border color
    pub inner_color: Color,
    /// Outer border color
    pub outer_color: Color,
}

impl Default for BorderStyle {
    fn default() -> Self {
        Self {
            inner_width: 1,
            outer_width: 2,
            inner_color: Color::rgb(0x44, 0x44, 0x44),
            outer_color: Color::rgb(0x88, 0x88, 0x88),
        }
    }
}

impl BorderStyle {
    /// Total border band width on a single side, used to compute the client
    /// inset (spec.md §4.2: `(outer+inner, outer+inner, ...)`).
    pub fn total_width(&self) -> u32 {
        self.inner_width + self.outer_width
    }
}

/// A manager-owned window that reparents exactly one client (spec.md §3, §4.2).
/// A frame and its client are created and destroyed as a pair; `Frame` itself
/// only tracks the bookkeeping the state engine needs, the X calls live behind
/// [XConn].
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    /// The manager-owned decoration window id
    pub id: Xid,
    /// The reparented client window id
    pub client: Xid,
    /// Current frame geometry (the outer rectangle, not the inset client rect)
    pub geometry: Rect,
    /// Whether the client is currently drawn border-free as fullscreen
    pub fullscreen: bool,
}

impl Frame {
    /// Create a frame window sized to `geometry`, reparent `client` into it at
    /// the border inset offset, and apply the initial border draw (spec.md
    /// §4.2 `create`).
    pub fn create(
        conn: &impl XConn,
        client: Xid,
        geometry: Rect,
        style: &BorderStyle,
    ) -> Result<Frame> {
        let id = conn.create_frame(geometry)?;
        let offset = style.total_width() as i32;
        conn.reparent(client, id, offset, offset)?;
        let frame = Frame {
            id,
            client,
            geometry,
            fullscreen: false,
        };
        frame.draw(conn, style)?;
        Ok(frame)
    }

    /// Reparent the client back to the root and destroy the frame window
    /// (spec.md §4.2 `destroy`).
    pub fn destroy(&self, conn: &impl XConn) -> Result<()> {
        let root = conn.root();
        conn.reparent(self.client, root, self.geometry.x, self.geometry.y)?;
        conn.destroy_window(self.id)
    }

    /// Configure the frame to `geometry` and the client to the inset rect
    /// inside it, then redraw borders (spec.md §4.2 `move_resize`).
    pub fn move_resize(&mut self, conn: &impl XConn, geometry: Rect, style: &BorderStyle) -> Result<()> {
        self.geometry = geometry;
        conn.configure(self.id, geometry)?;

        let inset = if self.fullscreen {
            geometry
        } else {
            geometry.inset(style.total_width())
        };
        conn.configure(self.client, inset)?;
        self.draw(conn, style)
    }

    /// Fill the outer border band with the outer color and the inner band
    /// with the inner color (spec.md §4.2 `draw`). A fullscreen frame draws
    /// with zero-width borders.
    pub fn draw(&self, conn: &impl XConn, style: &BorderStyle) -> Result<()> {
        if self.fullscreen {
            conn.set_border(self.client, 0, style.outer_color.pixel())?;
            return Ok(());
        }
        conn.set_border(self.id, style.outer_width, style.outer_color.pixel())?;
        conn.set_border(self.client, style.inner_width, style.inner_color.pixel())
    }
}
