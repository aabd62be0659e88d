//! An in-memory [XConn] used by unit and integration tests so the
//! window-state engine, reactor and IPC protocol can be exercised without a
//! live X server (spec.md §10.5 of SPEC_FULL.md).
use crate::bindings::{KeyCombo, MouseCombo};
use crate::geometry::Rect;
use crate::x::{Struts, WindowClass, XConn, XEvent, Xid};
use crate::Result;
use std::cell::RefCell;
use std::collections::VecDeque;

/// A scripted, single-threaded stand-in for a real X connection.
///
/// Tests push events onto the queue with [MockXConn::push_event] and then
/// drive the reactor/engine against them; every mutating call
/// (`map`/`unmap`/`configure`/...) is recorded into `calls` so a test can
/// assert on exactly what the code under test issued.
#[derive(Debug, Default)]
pub struct MockXConn {
    events: RefCell<VecDeque<XEvent>>,
    /// Every X call made through this connection, in order, formatted as a
    /// short description (`"map(5)"`, `"configure(5, 0,0 100x100)"`, ...).
    pub calls: RefCell<Vec<String>>,
    screens: Vec<Rect>,
    classes: std::collections::HashMap<Xid, WindowClass>,
    struts: std::collections::HashMap<Xid, Struts>,
    existing: Vec<Xid>,
    next_frame_id: RefCell<u32>,
}

impl MockXConn {
    /// A mock with a single 1000x800 monitor and no queued events.
    pub fn new() -> Self {
        Self {
            screens: vec![Rect::new(0, 0, 1000, 800)],
            next_frame_id: RefCell::new(1000),
            ..Default::default()
        }
    }

    /// Override the monitor layout this mock reports.
    pub fn with_screens(mut self, screens: Vec<Rect>) -> Self {
        self.screens = screens;
        self
    }

    /// Preload the class/title a subsequent [XConn::query_class_and_title]
    /// call should return for `id`.
    pub fn set_class(&mut self, id: Xid, class: WindowClass) {
        self.classes.insert(id, class);
    }

    /// Preload the struts a subsequent [XConn::read_struts] call should
    /// return for `id`.
    pub fn set_struts(&mut self, id: Xid, struts: Struts) {
        self.struts.insert(id, struts);
    }

    /// Windows [XConn::existing_clients] should report, simulating a restart
    /// with clients already mapped (spec.md §11.4).
    pub fn set_existing_clients(&mut self, ids: Vec<Xid>) {
        self.existing = ids;
    }

    /// Queue an event to be returned by a future [XConn::next_event] call.
    pub fn push_event(&self, event: XEvent) {
        self.events.borrow_mut().push_back(event);
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl XConn for MockXConn {
    fn root(&self) -> Xid {
        Xid(0)
    }

    fn screen_details(&self) -> Result<Vec<Rect>> {
        Ok(self.screens.clone())
    }

    fn grab_key(&self, combo: &KeyCombo) -> Result<()> {
        self.record(format!("grab_key({combo})"));
        Ok(())
    }

    fn grab_button(&self, combo: &MouseCombo) -> Result<()> {
        self.record(format!("grab_button({combo})"));
        Ok(())
    }

    fn ungrab_all(&self) -> Result<()> {
        self.record("ungrab_all".into());
        Ok(())
    }

    fn next_event(&self) -> Result<XEvent> {
        self.events
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| crate::Error::ConnectionLost("no more mock events".into()))
    }

    fn flush(&self) {
        self.record("flush".into());
    }

    fn reparent(&self, child: Xid, parent: Xid, x: i32, y: i32) -> Result<()> {
        self.record(format!("reparent({child}, {parent}, {x}, {y})"));
        Ok(())
    }

    fn create_frame(&self, geometry: Rect) -> Result<Xid> {
        let mut next = self.next_frame_id.borrow_mut();
        let id = Xid(*next);
        *next += 1;
        self.record(format!(
            "create_frame({}x{} at {},{}) -> {id}",
            geometry.w, geometry.h, geometry.x, geometry.y
        ));
        Ok(id)
    }

    fn destroy_window(&self, id: Xid) -> Result<()> {
        self.record(format!("destroy_window({id})"));
        Ok(())
    }

    fn configure(&self, id: Xid, geometry: Rect) -> Result<()> {
        self.record(format!(
            "configure({id}, {},{} {}x{})",
            geometry.x, geometry.y, geometry.w, geometry.h
        ));
        Ok(())
    }

    fn set_border(&self, id: Xid, width: u32, color_pixel: u32) -> Result<()> {
        self.record(format!("set_border({id}, {width}, {color_pixel:#08x})"));
        Ok(())
    }

    fn map(&self, id: Xid) -> Result<()> {
        self.record(format!("map({id})"));
        Ok(())
    }

    fn unmap(&self, id: Xid) -> Result<()> {
        self.record(format!("unmap({id})"));
        Ok(())
    }

    fn close(&self, id: Xid) -> Result<()> {
        self.record(format!("close({id})"));
        Ok(())
    }

    fn focus(&self, id: Xid) -> Result<()> {
        self.record(format!("focus({id})"));
        Ok(())
    }

    fn query_class_and_title(&self, id: Xid) -> Result<WindowClass> {
        Ok(self.classes.get(&id).cloned().unwrap_or_default())
    }

    fn read_struts(&self, id: Xid) -> Result<Option<Struts>> {
        Ok(self.struts.get(&id).copied())
    }

    fn existing_clients(&self) -> Result<Vec<Xid>> {
        Ok(self.existing.clone())
    }

    fn set_ewmh_name(&self, name: &str) -> Result<()> {
        self.record(format!("set_ewmh_name({name})"));
        Ok(())
    }

    fn set_ewmh_desktop_hints(
        &self,
        names: &[String],
        current: usize,
        clients: &[Xid],
        active: Option<Xid>,
    ) -> Result<()> {
        self.record(format!(
            "set_ewmh_desktop_hints({names:?}, {current}, {clients:?}, {active:?})"
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let conn = MockXConn::new();
        conn.map(Xid(1)).unwrap();
        conn.unmap(Xid(1)).unwrap();
        assert_eq!(conn.calls.borrow().as_slice(), &["map(1)", "unmap(1)"]);
    }

    #[test]
    fn events_drain_fifo() {
        let conn = MockXConn::new();
        conn.push_event(XEvent::MapRequest(Xid(1)));
        conn.push_event(XEvent::MapRequest(Xid(2)));
        assert_eq!(conn.next_event().unwrap(), XEvent::MapRequest(Xid(1)));
        assert_eq!(conn.next_event().unwrap(), XEvent::MapRequest(Xid(2)));
        assert!(conn.next_event().is_err());
    }
}
