//! The display gateway: the abstraction boundary between the window manager and the
//! X server (spec.md §4.1). `XConn` is implemented once against `x11rb` (see
//! [crate::backend::x11rb]) and once as an in-memory mock for tests
//! (see [mock]).
use crate::bindings::{KeyCombo, MouseCombo};
use crate::geometry::Rect;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

pub mod event;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use event::XEvent;

/// An opaque X11 window id. Newtype over the wire-level `u32` so window,
/// frame and monitor ids can never be confused at a type level (spec.md §9,
/// "cross-references ... by id").
#[derive(Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct Xid(pub u32);

impl fmt::Display for Xid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Deref for Xid {
    type Target = u32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<u32> for Xid {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// The class/title pair read back from a freshly mapped client, consumed by the
/// rule matcher (spec.md §4.4).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WindowClass {
    /// `WM_CLASS`'s second (class) string, if set
    pub class: Option<String>,
    /// `_NET_WM_NAME` falling back to `WM_NAME`, if set
    pub title: Option<String>,
}

/// Screen-edge space reserved by an external component (the bar), read from
/// `_NET_WM_STRUT_PARTIAL`/`_NET_WM_STRUT` (spec.md §11.1).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Struts {
    /// Pixels reserved on the top edge
    pub top: u32,
    /// Pixels reserved on the bottom edge
    pub bottom: u32,
    /// Pixels reserved on the left edge
    pub left: u32,
    /// Pixels reserved on the right edge
    pub right: u32,
}

/// A handle on a running X11 connection used to issue X requests.
///
/// `XConn` is the full surface the rest of the manager needs from the display:
/// grabs, reparenting, geometry calls and the blocking event pump (spec.md §4.1).
/// Implementations never hold window-state-engine locks; all state mutation happens
/// in the reactor after an `XConn` call returns.
pub trait XConn {
    /// The window manager's root window.
    fn root(&self) -> Xid;

    /// The position and size of every currently connected monitor (RandR CRTCs).
    fn screen_details(&self) -> Result<Vec<Rect>>;

    /// Grab a key combination on the root window so future presses are delivered
    /// to us instead of the currently focused client.
    fn grab_key(&self, combo: &KeyCombo) -> Result<()>;

    /// Grab a mouse button combination on the root window.
    fn grab_button(&self, combo: &MouseCombo) -> Result<()>;

    /// Release every key/button grab previously installed, used before a
    /// binding-map reset on config reload (spec.md §4.8).
    fn ungrab_all(&self) -> Result<()>;

    /// Block until the next X event is ready and return it.
    fn next_event(&self) -> Result<XEvent>;

    /// Flush any requests queued locally to the X server.
    fn flush(&self);

    /// Re-parent `child` under `parent` at the given offset within the parent.
    fn reparent(&self, child: Xid, parent: Xid, x: i32, y: i32) -> Result<()>;

    /// Create a new manager-owned window with the given geometry, used by
    /// [crate::frame::Frame::create].
    fn create_frame(&self, geometry: Rect) -> Result<Xid>;

    /// Destroy a manager-owned window (a frame, once its client has been
    /// reparented back out).
    fn destroy_window(&self, id: Xid) -> Result<()>;

    /// Configure (move/resize) a window to the given geometry.
    fn configure(&self, id: Xid, geometry: Rect) -> Result<()>;

    /// Set a window's border color and width in a single call (used for the
    /// inner/outer border bands of a [crate::frame::Frame]).
    fn set_border(&self, id: Xid, width: u32, color_pixel: u32) -> Result<()>;

    /// Map (show) a window.
    fn map(&self, id: Xid) -> Result<()>;

    /// Unmap (hide) a window.
    fn unmap(&self, id: Xid) -> Result<()>;

    /// Politely ask a client to close (`WM_DELETE_WINDOW` if supported, otherwise
    /// `kill_client`), per spec.md §11.3.
    fn close(&self, id: Xid) -> Result<()>;

    /// Give X input focus to `id`.
    fn focus(&self, id: Xid) -> Result<()>;

    /// Read `WM_CLASS`/`_NET_WM_NAME` for a client, used on adoption.
    fn query_class_and_title(&self, id: Xid) -> Result<WindowClass>;

    /// Read reserved strut space from a window's EWMH strut properties.
    fn read_struts(&self, id: Xid) -> Result<Option<Struts>>;

    /// The ids of every top-level window that exists at connection time, for
    /// adopting pre-existing clients at startup (spec.md §11.4).
    fn existing_clients(&self) -> Result<Vec<Xid>>;

    /// Publish `_NET_WM_NAME` on the root window.
    fn set_ewmh_name(&self, name: &str) -> Result<()>;

    /// Publish the current `_NET_NUMBER_OF_DESKTOPS`/`_NET_DESKTOP_NAMES`/
    /// `_NET_CURRENT_DESKTOP`/`_NET_CLIENT_LIST`/`_NET_ACTIVE_WINDOW` hints
    /// (spec.md §11.2).
    fn set_ewmh_desktop_hints(
        &self,
        names: &[String],
        current: usize,
        clients: &[Xid],
        active: Option<Xid>,
    ) -> Result<()>;
}

/// Every `XConn` method takes `&self`, so an `Arc<T>` is a connection in its
/// own right. This is what lets the reactor own one `Arc<X11rbConn>` while an
/// auxiliary thread holds a clone of the same `Arc` to pump `next_event`
/// (spec.md §5: the display connection's blocking read can't itself join the
/// reactor's `Select`, so it has to live on its own thread).
impl<T: XConn> XConn for Arc<T> {
    fn root(&self) -> Xid {
        (**self).root()
    }

    fn screen_details(&self) -> Result<Vec<Rect>> {
        (**self).screen_details()
    }

    fn grab_key(&self, combo: &KeyCombo) -> Result<()> {
        (**self).grab_key(combo)
    }

    fn grab_button(&self, combo: &MouseCombo) -> Result<()> {
        (**self).grab_button(combo)
    }

    fn ungrab_all(&self) -> Result<()> {
        (**self).ungrab_all()
    }

    fn next_event(&self) -> Result<XEvent> {
        (**self).next_event()
    }

    fn flush(&self) {
        (**self).flush()
    }

    fn reparent(&self, child: Xid, parent: Xid, x: i32, y: i32) -> Result<()> {
        (**self).reparent(child, parent, x, y)
    }

    fn create_frame(&self, geometry: Rect) -> Result<Xid> {
        (**self).create_frame(geometry)
    }

    fn destroy_window(&self, id: Xid) -> Result<()> {
        (**self).destroy_window(id)
    }

    fn configure(&self, id: Xid, geometry: Rect) -> Result<()> {
        (**self).configure(id, geometry)
    }

    fn set_border(&self, id: Xid, width: u32, color_pixel: u32) -> Result<()> {
        (**self).set_border(id, width, color_pixel)
    }

    fn map(&self, id: Xid) -> Result<()> {
        (**self).map(id)
    }

    fn unmap(&self, id: Xid) -> Result<()> {
        (**self).unmap(id)
    }

    fn close(&self, id: Xid) -> Result<()> {
        (**self).close(id)
    }

    fn focus(&self, id: Xid) -> Result<()> {
        (**self).focus(id)
    }

    fn query_class_and_title(&self, id: Xid) -> Result<WindowClass> {
        (**self).query_class_and_title(id)
    }

    fn read_struts(&self, id: Xid) -> Result<Option<Struts>> {
        (**self).read_struts(id)
    }

    fn existing_clients(&self) -> Result<Vec<Xid>> {
        (**self).existing_clients()
    }

    fn set_ewmh_name(&self, name: &str) -> Result<()> {
        (**self).set_ewmh_name(name)
    }

    fn set_ewmh_desktop_hints(
        &self,
        names: &[String],
        current: usize,
        clients: &[Xid],
        active: Option<Xid>,
    ) -> Result<()> {
        (**self).set_ewmh_desktop_hints(names, current, clients, active)
    }
}
