//! Event types yielded by [crate::x::XConn::next_event].
use crate::bindings::{KeyCombo, MouseCombo};
use crate::geometry::Point;
use crate::x::Xid;
use std::fmt;

/// A tagged event pulled from the X connection. Variant names follow the X11 wire
/// events they correspond to, grouped the way `XConn` implementations need to
/// dispatch them in the reactor (spec.md §4.1, §5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XEvent {
    /// A client requested to be mapped (spec.md §4.5, "Adoption")
    MapRequest(Xid),
    /// A previously mapped client has been unmapped
    UnmapNotify(Xid),
    /// A client window has been destroyed
    DestroyNotify(Xid),
    /// A client asked to be reconfigured (resized/moved) outside of our control;
    /// only honored for unmanaged/override-redirect windows
    ConfigureRequest(Xid),
    /// A grabbed key combination was pressed
    KeyPress(KeyCombo),
    /// A grabbed mouse combination was pressed, at the given root-relative point
    ButtonPress(MouseCombo, Point),
    /// A property the gateway cares about changed on the named window (used to
    /// detect strut changes on the bar's window, spec.md §11.1)
    PropertyNotify(Xid),
    /// The root window's geometry or monitor layout changed (RandR)
    ScreenChange,
}

impl fmt::Display for XEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XEvent::MapRequest(id) => write!(f, "MapRequest({id})"),
            XEvent::UnmapNotify(id) => write!(f, "UnmapNotify({id})"),
            XEvent::DestroyNotify(id) => write!(f, "DestroyNotify({id})"),
            XEvent::ConfigureRequest(id) => write!(f, "ConfigureRequest({id})"),
            XEvent::KeyPress(c) => write!(f, "KeyPress({c})"),
            XEvent::ButtonPress(c, _) => write!(f, "ButtonPress({c})"),
            XEvent::PropertyNotify(id) => write!(f, "PropertyNotify({id})"),
            XEvent::ScreenChange => write!(f, "ScreenChange"),
        }
    }
}
