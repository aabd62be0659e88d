//! The authoritative window/workspace/monitor state and every mutating
//! operation named in spec.md §4.5.
use std::collections::{HashMap, VecDeque};

use crate::bindings::{Bindings, KeyCombo, MouseCombo};
use crate::color::Color;
use crate::frame::{BorderStyle, Frame};
use crate::geometry::Rect;
use crate::rules::{Placement, Rule, RuleSet};
use crate::state::{BorderBand, Direction, Monitor, Scratchpad, StateEvent, Window, Workspace};
use crate::x::{XConn, Xid};
use crate::{Error, Result};

/// The window/workspace/monitor state engine (spec.md §4.5).
pub struct Engine {
    windows: HashMap<Xid, Window>,
    workspaces: HashMap<usize, Workspace>,
    monitors: Vec<Monitor>,
    focused: Option<Xid>,
    /// The ordered rule list consulted on adoption
    pub rules: RuleSet,
    /// The key/mouse binding maps
    pub bindings: Bindings,
    gap: u32,
    border: BorderStyle,
    bar_visible: bool,
    bar_show_occupied_only: bool,
    scratchpads: HashMap<String, Scratchpad>,
    /// Set right after spawning a scratchpad's command; the next adopted
    /// window is attributed to it rather than tiled normally. Spec.md §4.5
    /// says adoption skips focus "if the rule marks the window as a scratch
    /// pad" without specifying how that attribution happens; this is the
    /// resolution (see DESIGN.md).
    pending_scratch: Option<String>,
    /// Placement hints from a `spawn ... key=value` request, consumed by the
    /// next [Engine::adopt] ahead of rule matching (spec.md §6 `spawn`: the
    /// grammar gives hints for the window about to appear, not a persistent
    /// rule, so they queue rather than get pushed onto `rules`).
    pending_spawn_placements: VecDeque<Placement>,
}

impl Engine {
    /// A fresh engine for the given monitor layout, with a single default
    /// workspace `1:main` on monitor 0.
    pub fn new(screens: Vec<Rect>) -> Self {
        let monitors = screens
            .into_iter()
            .enumerate()
            .map(|(i, r)| Monitor::new(i, r))
            .collect();

        let mut engine = Self {
            windows: HashMap::new(),
            workspaces: HashMap::new(),
            monitors,
            focused: None,
            rules: RuleSet::new(),
            bindings: Bindings::new(),
            gap: 0,
            border: BorderStyle::default(),
            bar_visible: false,
            bar_show_occupied_only: false,
            scratchpads: HashMap::new(),
            pending_scratch: None,
            pending_spawn_placements: VecDeque::new(),
        };
        engine.set_workspaces(vec![(1, "main".to_string())]);
        engine
    }

    /// The currently focused window, if any.
    pub fn focused(&self) -> Option<Xid> {
        self.focused
    }

    /// Current bar visibility flag.
    pub fn bar_visible(&self) -> bool {
        self.bar_visible
    }

    /// `bar show-occupied-only` flag.
    pub fn bar_show_occupied_only(&self) -> bool {
        self.bar_show_occupied_only
    }

    /// Set `bar show-occupied-only` (spec.md §6 `bar`).
    pub fn set_bar_show_occupied_only(&mut self, value: bool) {
        self.bar_show_occupied_only = value;
    }

    /// `set-workspaces`: replace the workspace set, distributing new
    /// workspaces round-robin across monitors and making the first one
    /// assigned to each monitor visible.
    pub fn set_workspaces(&mut self, specs: Vec<(usize, String)>) {
        let n_monitors = self.monitors.len().max(1);
        let mut workspaces = HashMap::new();
        let mut first_per_monitor: HashMap<usize, usize> = HashMap::new();

        for (i, (idx, label)) in specs.into_iter().enumerate() {
            let monitor = i % n_monitors;
            first_per_monitor.entry(monitor).or_insert(idx);
            workspaces.insert(idx, Workspace::new(idx, label, monitor));
        }

        for m in &mut self.monitors {
            let mut assigned: Vec<usize> = workspaces
                .values()
                .filter(|w| w.monitor == m.id)
                .map(|w| w.index)
                .collect();
            assigned.sort_unstable();
            m.workspaces = assigned;
        }

        for idx in first_per_monitor.into_values() {
            if let Some(ws) = workspaces.get_mut(&idx) {
                ws.visible = true;
            }
        }

        self.windows.clear();
        self.focused = None;
        self.workspaces = workspaces;
    }

    /// Install a key binding and grab it on the display gateway.
    pub fn bind_key(&mut self, conn: &impl XConn, combo: KeyCombo, command: String) -> Result<()> {
        conn.grab_key(&combo)?;
        self.bindings.bind_key(combo, command);
        Ok(())
    }

    /// Install a mouse binding and grab it on the display gateway.
    pub fn bind_button(
        &mut self,
        conn: &impl XConn,
        combo: MouseCombo,
        command: String,
    ) -> Result<()> {
        conn.grab_button(&combo)?;
        self.bindings.bind_button(combo, command);
        Ok(())
    }

    /// Append a placement rule (spec.md §6 `rule`).
    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Queue a placement hint from `spawn ... key=value`, applied to the next
    /// window adopted in place of rule matching (spec.md §6 `spawn`).
    pub fn push_spawn_placement(&mut self, placement: Placement) {
        self.pending_spawn_placements.push_back(placement);
    }

    /// Register a named scratchpad's spawn command (spec.md §6 `scratch`).
    pub fn register_scratchpad(&mut self, name: String, spawn_command: String) {
        self.scratchpads.insert(
            name,
            Scratchpad {
                spawn_command,
                window: None,
                visible: false,
            },
        );
    }

    /// `set-gap`: reapply the layout of every currently visible workspace.
    pub fn set_gap(&mut self, conn: &impl XConn, px: u32) -> Result<()> {
        self.gap = px;
        self.relayout_all_visible(conn)
    }

    /// `set-border`: update a border band's width and redraw every frame.
    pub fn set_border_width(&mut self, conn: &impl XConn, band: BorderBand, px: u32) -> Result<()> {
        match band {
            BorderBand::Inner => self.border.inner_width = px,
            BorderBand::Outer => self.border.outer_width = px,
        }
        self.redraw_all(conn)
    }

    /// `set-color`: update a border band's color and redraw every frame.
    pub fn set_border_color(&mut self, conn: &impl XConn, band: BorderBand, color: Color) -> Result<()> {
        match band {
            BorderBand::Inner => self.border.inner_color = color,
            BorderBand::Outer => self.border.outer_color = color,
        }
        self.redraw_all(conn)
    }

    /// `reload-config`'s reset step: clear bindings/rules, reset appearance
    /// to defaults, ungrab everything. Runtime state (windows, focus,
    /// workspaces) is untouched (spec.md §4.8 "Reset policy").
    pub fn reset_config(&mut self, conn: &impl XConn) -> Result<()> {
        conn.ungrab_all()?;
        self.bindings.clear();
        self.rules.clear();
        self.border = BorderStyle::default();
        self.gap = 0;
        Ok(())
    }

    /// Adopt pre-existing top-level windows at startup (spec.md §11.4).
    pub fn adopt_existing(&mut self, conn: &impl XConn) -> Result<Vec<StateEvent>> {
        let mut events = Vec::new();
        for id in conn.existing_clients()? {
            events.extend(self.adopt(conn, id)?);
        }
        Ok(events)
    }

    /// Adopt a freshly mapped client (spec.md §4.5 "Adoption").
    pub fn adopt(&mut self, conn: &impl XConn, id: Xid) -> Result<Vec<StateEvent>> {
        if self.windows.contains_key(&id) {
            return Ok(Vec::new());
        }

        let class_info = conn.query_class_and_title(id).unwrap_or_default();
        let placement = self
            .pending_spawn_placements
            .pop_front()
            .unwrap_or_else(|| self.rules.matching(&class_info).cloned().unwrap_or_default());

        if let Some(name) = self.pending_scratch.take() {
            let geometry = self.focused_monitor_rect().centered_scaled(0.8, 0.6);
            let frame = Frame::create(conn, id, geometry, &self.border)?;
            let frame_id = frame.id;
            self.windows.insert(
                id,
                Window {
                    frame,
                    class: class_info.class,
                    title: class_info.title,
                    workspace: 0,
                    floating: true,
                    floating_geometry: Some(geometry),
                    fullscreen: false,
                    scratch: Some(name.clone()),
                    mapped: false,
                },
            );
            // The toggle that caused this spawn is itself a "show" (spec.md
            // §4.5 "maps it ... and takes focus"), mirroring the `now_visible`
            // branch of `scratch_toggle`.
            conn.map(frame_id)?;
            conn.focus(id)?;
            if let Some(w) = self.windows.get_mut(&id) {
                w.mapped = true;
            }
            self.focused = Some(id);
            if let Some(sp) = self.scratchpads.get_mut(&name) {
                sp.window = Some(id);
                sp.visible = true;
            }
            return Ok(vec![self.focus_event(id)]);
        }

        let target_ws = placement
            .workspace
            .filter(|w| self.workspaces.contains_key(w))
            .unwrap_or_else(|| self.current_workspace_index());

        if let Some(monitor) = placement.monitor {
            if monitor < self.monitors.len() {
                self.relocate_workspace(target_ws, monitor)?;
            }
        }

        let ws_monitor = self.workspaces.get(&target_ws).map(|w| w.monitor).unwrap_or(0);
        let monitor_rect = self.monitors.get(ws_monitor).map(|m| m.rect).unwrap_or_default();
        let floating = placement.float;

        let geometry = if floating {
            monitor_rect.centered_scaled(1.0 / 3.0, 1.0 / 3.0)
        } else {
            monitor_rect
        };

        let frame = Frame::create(conn, id, geometry, &self.border)?;
        let window = Window {
            frame,
            class: class_info.class,
            title: class_info.title,
            workspace: target_ws,
            floating,
            floating_geometry: if floating { Some(geometry) } else { None },
            fullscreen: false,
            scratch: None,
            mapped: false,
        };

        let was_occupied = self
            .workspaces
            .get(&target_ws)
            .map(|w| w.is_occupied())
            .unwrap_or(false);

        if floating {
            if let Some(ws) = self.workspaces.get_mut(&target_ws) {
                ws.floating.push(id);
            }
        } else if let Some(ws) = self.workspaces.get_mut(&target_ws) {
            let usable = self
                .monitors
                .get(ws.monitor)
                .map(|m| m.usable_rect(self.gap))
                .unwrap_or_default();
            ws.tiled.insert(id, usable, self.focused);
        }

        let visible = self.workspaces.get(&target_ws).map(|w| w.visible).unwrap_or(false);
        self.windows.insert(id, window);

        let mut events = Vec::new();
        if !was_occupied {
            events.push(self.workspace_event(ws_monitor));
        }

        if visible {
            if let Some(w) = self.windows.get_mut(&id) {
                w.mapped = true;
            }
            self.apply_layout(conn, target_ws)?;
            conn.map(self.windows[&id].frame.id)?;
            self.focus_window(conn, id)?;
            events.push(self.focus_event(id));
        }

        Ok(events)
    }

    /// A client was unmapped or destroyed: drop it from state (spec.md §7(b),
    /// §3 "Window" lifecycle).
    pub fn unmanage(&mut self, conn: &impl XConn, id: Xid) -> Result<Vec<StateEvent>> {
        let Some(window) = self.windows.remove(&id) else {
            return Ok(Vec::new());
        };
        let _ = window.frame.destroy(conn);

        if self.focused == Some(id) {
            self.focused = None;
        }

        if let Some(name) = &window.scratch {
            if let Some(sp) = self.scratchpads.get_mut(name) {
                sp.window = None;
                sp.visible = false;
            }
            return Ok(Vec::new());
        }

        let ws_idx = window.workspace;
        let monitor = self.workspaces.get(&ws_idx).map(|w| w.monitor);
        let was_occupied = self.workspaces.get(&ws_idx).map(|w| w.is_occupied()).unwrap_or(false);
        if let Some(ws) = self.workspaces.get_mut(&ws_idx) {
            ws.remove(id);
        }
        let now_occupied = self.workspaces.get(&ws_idx).map(|w| w.is_occupied()).unwrap_or(false);
        let visible = self.workspaces.get(&ws_idx).map(|w| w.visible).unwrap_or(false);

        if visible {
            self.apply_layout(conn, ws_idx)?;
        }

        let mut events = Vec::new();
        if let Some(m) = monitor {
            if was_occupied != now_occupied {
                events.push(self.workspace_event(m));
            }
        }
        Ok(events)
    }

    /// `close`: politely close the focused window (spec.md §6 `close`,
    /// §11.3). State is updated later when the resulting unmap/destroy
    /// notify arrives.
    pub fn close_focused(&mut self, conn: &impl XConn) -> Result<()> {
        let Some(focused) = self.focused else {
            return Ok(());
        };
        conn.close(focused)
    }

    /// `focus <dir>`: move focus to the directional neighbor, if any
    /// (spec.md §4.5 "Focus movement").
    pub fn focus_dir(&mut self, conn: &impl XConn, dir: Direction) -> Result<Vec<StateEvent>> {
        let Some(focused) = self.focused else {
            return Ok(Vec::new());
        };
        let ws_idx = self.windows.get(&focused).map(|w| w.workspace).unwrap_or(0);
        let Some(target) = self.neighbor_in_direction(ws_idx, focused, dir) else {
            return Ok(Vec::new());
        };
        self.focus_window(conn, target)?;
        Ok(vec![self.focus_event(target)])
    }

    /// `move <dir>`: swap the focused tiled window with its directional
    /// neighbor, or translate a floating window by a fixed step (spec.md
    /// §4.5 "Window movement").
    pub fn move_dir(&mut self, conn: &impl XConn, dir: Direction) -> Result<Vec<StateEvent>> {
        let Some(focused) = self.focused else {
            return Ok(Vec::new());
        };
        let floating = self.windows.get(&focused).map(|w| w.floating).unwrap_or(false);

        if floating {
            let ws_idx = self.windows[&focused].workspace;
            let monitor_rect = self
                .workspaces
                .get(&ws_idx)
                .and_then(|w| self.monitors.get(w.monitor))
                .map(|m| m.rect)
                .unwrap_or_default();
            let (dx, dy) = match dir {
                Direction::Left => (-0.05, 0.0),
                Direction::Right => (0.05, 0.0),
                Direction::Up => (0.0, -0.05),
                Direction::Down => (0.0, 0.05),
            };
            let window = self.windows.get_mut(&focused).unwrap();
            let new_geom = window.frame.geometry.translated_by_fraction(&monitor_rect, dx, dy);
            window.floating_geometry = Some(new_geom);
            window.frame.move_resize(conn, new_geom, &self.border)?;
            return Ok(Vec::new());
        }

        let ws_idx = self.windows[&focused].workspace;
        let Some(target) = self.neighbor_in_direction(ws_idx, focused, dir) else {
            return Ok(Vec::new());
        };
        if let Some(ws) = self.workspaces.get_mut(&ws_idx) {
            ws.tiled.swap(focused, target);
        }
        self.apply_layout(conn, ws_idx)?;
        Ok(Vec::new())
    }

    /// `resize ±dx ±dy` (spec.md §4.5 "Resize").
    pub fn resize(&mut self, conn: &impl XConn, dx: i32, dy: i32) -> Result<Vec<StateEvent>> {
        let Some(focused) = self.focused else {
            return Ok(Vec::new());
        };
        let floating = self.windows.get(&focused).map(|w| w.floating).unwrap_or(false);

        if floating {
            let window = self.windows.get_mut(&focused).unwrap();
            let mut g = window.frame.geometry;
            g.w = (g.w as i32 + dx).max(1) as u32;
            g.h = (g.h as i32 + dy).max(1) as u32;
            window.floating_geometry = Some(g);
            window.frame.move_resize(conn, g, &self.border)?;
            return Ok(Vec::new());
        }

        let ws_idx = self.windows[&focused].workspace;
        let monitor_rect = self
            .workspaces
            .get(&ws_idx)
            .and_then(|w| self.monitors.get(w.monitor))
            .map(|m| m.rect)
            .unwrap_or(Rect::new(0, 0, 1, 1));
        let fdx = dx as f32 / monitor_rect.w.max(1) as f32;
        let fdy = dy as f32 / monitor_rect.h.max(1) as f32;

        if let Some(ws) = self.workspaces.get_mut(&ws_idx) {
            ws.tiled.resize(focused, fdx, fdy);
        }
        self.apply_layout(conn, ws_idx)?;
        Ok(Vec::new())
    }

    /// `float toggle` (spec.md §4.5 "Floating toggle").
    pub fn float_toggle(&mut self, conn: &impl XConn) -> Result<Vec<StateEvent>> {
        let Some(focused) = self.focused else {
            return Ok(Vec::new());
        };
        let ws_idx = self.windows[&focused].workspace;
        let currently_floating = self.windows[&focused].floating;

        if currently_floating {
            if let Some(ws) = self.workspaces.get_mut(&ws_idx) {
                ws.floating.retain(|&w| w != focused);
                let usable = self.monitors[ws.monitor].usable_rect(self.gap);
                ws.tiled.insert(focused, usable, None);
            }
            if let Some(w) = self.windows.get_mut(&focused) {
                w.floating = false;
            }
        } else {
            if let Some(ws) = self.workspaces.get_mut(&ws_idx) {
                ws.tiled.remove(focused);
                ws.floating.push(focused);
            }
            let monitor_rect = self
                .workspaces
                .get(&ws_idx)
                .and_then(|w| self.monitors.get(w.monitor))
                .map(|m| m.rect)
                .unwrap_or_default();
            let window = self.windows.get_mut(&focused).unwrap();
            let geom = window
                .floating_geometry
                .unwrap_or_else(|| monitor_rect.centered_scaled(1.0 / 3.0, 1.0 / 3.0));
            window.floating = true;
            window.floating_geometry = Some(geom);
            window.frame.move_resize(conn, geom, &self.border)?;
        }

        if self.workspaces.get(&ws_idx).map(|w| w.visible).unwrap_or(false) {
            self.apply_layout(conn, ws_idx)?;
        }
        Ok(Vec::new())
    }

    /// `view ws n` (spec.md §4.5 "Workspace view / send").
    pub fn view_ws(&mut self, conn: &impl XConn, n: usize) -> Result<Vec<StateEvent>> {
        let ws = self.workspaces.get(&n).ok_or(Error::UnknownWorkspace)?;
        let monitor = ws.monitor;

        if !ws.visible {
            if let Some(prev_idx) = self.visible_workspace_on(monitor) {
                if prev_idx != n {
                    if let Some(prev) = self.workspaces.get_mut(&prev_idx) {
                        prev.visible = false;
                    }
                    self.unmap_workspace(conn, prev_idx)?;
                }
            }
            if let Some(ws) = self.workspaces.get_mut(&n) {
                ws.visible = true;
            }
            self.map_workspace(conn, n)?;
            self.apply_layout(conn, n)?;
        }

        // §8 round-trip: applying `view ws n` twice is a no-op beyond a second
        // occupancy event with an identical payload, so the event always fires.
        Ok(vec![self.workspace_event(monitor)])
    }

    /// `send ws n` (spec.md §4.5 "Workspace view / send").
    pub fn send_ws(&mut self, conn: &impl XConn, n: usize) -> Result<Vec<StateEvent>> {
        let Some(focused) = self.focused else {
            return Ok(Vec::new());
        };
        if !self.workspaces.contains_key(&n) {
            return Err(Error::UnknownWorkspace);
        }

        let old_ws = self.windows[&focused].workspace;
        if old_ws == n {
            return Ok(Vec::new());
        }

        let floating = self.windows[&focused].floating;
        let old_monitor = self.workspaces.get(&old_ws).map(|w| w.monitor);
        if let Some(ws) = self.workspaces.get_mut(&old_ws) {
            ws.remove(focused);
        }

        let new_monitor = self.workspaces[&n].monitor;
        if floating {
            if let Some(ws) = self.workspaces.get_mut(&n) {
                ws.floating.push(focused);
            }
        } else {
            let usable = self.monitors[new_monitor].usable_rect(self.gap);
            if let Some(ws) = self.workspaces.get_mut(&n) {
                ws.tiled.insert(focused, usable, None);
            }
        }
        if let Some(w) = self.windows.get_mut(&focused) {
            w.workspace = n;
        }

        let new_visible = self.workspaces[&n].visible;
        if let Some(w) = self.windows.get_mut(&focused) {
            w.mapped = new_visible;
        }
        if new_visible {
            conn.map(self.windows[&focused].frame.id)?;
            self.apply_layout(conn, n)?;
        } else {
            conn.unmap(self.windows[&focused].frame.id)?;
        }

        if let Some(m) = old_monitor {
            if self.workspaces.get(&old_ws).map(|w| w.visible).unwrap_or(false) {
                self.apply_layout(conn, old_ws)?;
            }
        }

        let mut events = Vec::new();
        if let Some(m) = old_monitor {
            events.push(self.workspace_event(m));
        }
        if Some(new_monitor) != old_monitor {
            events.push(self.workspace_event(new_monitor));
        }
        Ok(events)
    }

    /// `move-ws n monitor m` (spec.md §4.5 "Workspace view / send").
    pub fn move_ws(&mut self, conn: &impl XConn, n: usize, monitor: usize) -> Result<Vec<StateEvent>> {
        if monitor >= self.monitors.len() {
            return Err(Error::UnknownMonitor);
        }
        self.relocate_workspace(n, monitor)?;
        self.apply_layout(conn, n)?;
        Ok(vec![self.workspace_event(monitor)])
    }

    fn relocate_workspace(&mut self, n: usize, monitor: usize) -> Result<()> {
        let old_monitor = self.workspaces.get(&n).ok_or(Error::UnknownWorkspace)?.monitor;
        if old_monitor == monitor {
            return Ok(());
        }

        if let Some(old) = self.monitors.get_mut(old_monitor) {
            old.workspaces.retain(|&w| w != n);
        }
        if let Some(newm) = self.monitors.get_mut(monitor) {
            newm.workspaces.push(n);
        }

        let monitor_has_visible = self.workspaces.values().any(|w| w.monitor == monitor && w.visible);

        if let Some(ws) = self.workspaces.get_mut(&n) {
            ws.monitor = monitor;
            ws.visible = !monitor_has_visible;
        }
        Ok(())
    }

    /// `scratch toggle <name>`. Returns the events to broadcast plus, the
    /// first time a given scratchpad is toggled, the spawn command the
    /// caller should execute (spec.md §4.5 "Scratchpad").
    pub fn scratch_toggle(
        &mut self,
        conn: &impl XConn,
        name: &str,
    ) -> Result<(Vec<StateEvent>, Option<String>)> {
        let sp = self
            .scratchpads
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownScratchpad(name.to_string()))?;

        let Some(id) = sp.window else {
            self.pending_scratch = Some(name.to_string());
            return Ok((Vec::new(), Some(sp.spawn_command)));
        };

        let now_visible = !sp.visible;
        let mut events = Vec::new();
        let geom = self.focused_monitor_rect().centered_scaled(0.8, 0.6);
        if let Some(w) = self.windows.get_mut(&id) {
            if now_visible {
                w.floating_geometry = Some(geom);
                w.frame.move_resize(conn, geom, &self.border)?;
                conn.map(w.frame.id)?;
                conn.focus(id)?;
                w.mapped = true;
                self.focused = Some(id);
                events.push(self.focus_event(id));
            } else {
                conn.unmap(w.frame.id)?;
                w.mapped = false;
            }
        }
        if let Some(sp) = self.scratchpads.get_mut(name) {
            sp.visible = now_visible;
        }
        Ok((events, None))
    }

    /// `fullscreen toggle` (spec.md §4.5 "Fullscreen").
    pub fn fullscreen_toggle(&mut self, conn: &impl XConn) -> Result<Vec<StateEvent>> {
        let Some(focused) = self.focused else {
            return Ok(Vec::new());
        };
        let ws_idx = self.windows[&focused].workspace;
        let monitor_rect = self
            .workspaces
            .get(&ws_idx)
            .and_then(|w| self.monitors.get(w.monitor))
            .map(|m| m.rect)
            .unwrap_or_default();

        let window = self.windows.get_mut(&focused).unwrap();
        window.fullscreen = !window.fullscreen;
        window.frame.fullscreen = window.fullscreen;
        let now_fullscreen = window.fullscreen;
        if now_fullscreen {
            window.frame.move_resize(conn, monitor_rect, &self.border)?;
        }

        if !now_fullscreen {
            self.apply_layout(conn, ws_idx)?;
        }
        Ok(Vec::new())
    }

    /// `togglebar` (spec.md §4.5 "Bar toggle"; §9 open question (a): a true
    /// toggle).
    pub fn bar_toggle(&mut self) -> Vec<StateEvent> {
        self.bar_visible = !self.bar_visible;
        vec![StateEvent::BarToggle {
            visible: self.bar_visible,
        }]
    }

    /// Record freshly read struts for the bar's window and relayout whatever
    /// workspace is currently visible there, used on `PropertyNotify` (spec.md
    /// §11.1).
    pub fn set_monitor_struts(
        &mut self,
        conn: &impl XConn,
        monitor: usize,
        struts: Option<crate::x::Struts>,
    ) -> Result<()> {
        if let Some(m) = self.monitors.get_mut(monitor) {
            m.struts = struts;
        }
        if let Some(ws) = self.visible_workspace_on(monitor) {
            self.apply_layout(conn, ws)?;
        }
        Ok(())
    }

    /// `query windows` (spec.md §11.5).
    pub fn query_windows(&self) -> serde_json::Value {
        let windows: Vec<_> = self
            .windows
            .iter()
            .map(|(id, w)| {
                serde_json::json!({
                    "id": id.0,
                    "class": w.class,
                    "title": w.title,
                    "workspace": w.workspace,
                    "floating": w.floating,
                    "fullscreen": w.fullscreen,
                    "mapped": w.mapped,
                })
            })
            .collect();
        serde_json::json!({ "windows": windows })
    }

    /// `query workspaces` (spec.md §11.5).
    pub fn query_workspaces(&self) -> serde_json::Value {
        let mut list: Vec<&Workspace> = self.workspaces.values().collect();
        list.sort_by_key(|w| w.index);
        let workspaces: Vec<_> = list
            .iter()
            .map(|w| {
                serde_json::json!({
                    "index": w.index,
                    "label": w.label,
                    "monitor": w.monitor,
                    "visible": w.visible,
                    "occupied": w.is_occupied(),
                })
            })
            .collect();
        serde_json::json!({ "workspaces": workspaces })
    }

    /// Desktop names in index order, the currently visible index on the
    /// primary monitor, every managed client id, and the focused client, for
    /// publishing `_NET_DESKTOP_NAMES`/`_NET_CURRENT_DESKTOP`/
    /// `_NET_CLIENT_LIST`/`_NET_ACTIVE_WINDOW` (spec.md §11.2).
    pub fn ewmh_hints(&self) -> (Vec<String>, usize, Vec<Xid>, Option<Xid>) {
        let mut ordered: Vec<&Workspace> = self.workspaces.values().collect();
        ordered.sort_by_key(|w| w.index);
        let names = ordered.iter().map(|w| w.label.clone()).collect();
        let current = self.visible_workspace_on(0).unwrap_or(0);
        let clients = self.windows.keys().copied().collect();
        (names, current, clients, self.focused)
    }

    /// Orderly shutdown: reparent every managed client back to the root and
    /// destroy its frame (spec.md §5 "Cancellation and shutdown").
    pub fn shutdown(&mut self, conn: &impl XConn) -> Result<()> {
        for window in self.windows.values() {
            let _ = window.frame.destroy(conn);
        }
        self.windows.clear();
        self.focused = None;
        Ok(())
    }

    /// `query monitors` (spec.md §11.5).
    pub fn query_monitors(&self) -> serde_json::Value {
        let monitors: Vec<_> = self
            .monitors
            .iter()
            .map(|m| {
                serde_json::json!({
                    "id": m.id,
                    "x": m.rect.x,
                    "y": m.rect.y,
                    "w": m.rect.w,
                    "h": m.rect.h,
                    "workspaces": m.workspaces,
                })
            })
            .collect();
        serde_json::json!({ "monitors": monitors })
    }

    fn current_workspace_index(&self) -> usize {
        self.focused
            .and_then(|id| self.windows.get(&id))
            .map(|w| w.workspace)
            .or_else(|| self.workspaces.values().find(|w| w.visible).map(|w| w.index))
            .unwrap_or(0)
    }

    fn visible_workspace_on(&self, monitor: usize) -> Option<usize> {
        self.workspaces
            .values()
            .find(|w| w.monitor == monitor && w.visible)
            .map(|w| w.index)
    }

    fn workspace_window_ids(&self, ws_idx: usize) -> Vec<Xid> {
        self.windows
            .iter()
            .filter(|(_, w)| w.workspace == ws_idx && w.scratch.is_none())
            .map(|(id, _)| *id)
            .collect()
    }

    fn focused_monitor_rect(&self) -> Rect {
        self.focused
            .and_then(|id| self.windows.get(&id))
            .and_then(|w| self.workspaces.get(&w.workspace))
            .and_then(|ws| self.monitors.get(ws.monitor))
            .map(|m| m.rect)
            .or_else(|| self.monitors.first().map(|m| m.rect))
            .unwrap_or_default()
    }

    fn neighbor_in_direction(&self, ws_idx: usize, from: Xid, dir: Direction) -> Option<Xid> {
        let from_center = self.windows.get(&from)?.frame.geometry.center();

        self.workspace_window_ids(ws_idx)
            .into_iter()
            .filter(|id| *id != from)
            .filter_map(|id| {
                let c = self.windows.get(&id)?.frame.geometry.center();
                let (dx, dy) = (c.x - from_center.x, c.y - from_center.y);
                let in_direction = match dir {
                    Direction::Left => dx < 0,
                    Direction::Right => dx > 0,
                    Direction::Up => dy < 0,
                    Direction::Down => dy > 0,
                };
                if !in_direction {
                    return None;
                }
                let distance = from_center.manhattan_distance(&c);
                let perpendicular = match dir {
                    Direction::Left | Direction::Right => dy.unsigned_abs() as i64,
                    Direction::Up | Direction::Down => dx.unsigned_abs() as i64,
                };
                Some((id, distance, perpendicular))
            })
            .min_by_key(|&(_, distance, perpendicular)| (distance, perpendicular))
            .map(|(id, _, _)| id)
    }

    fn focus_window(&mut self, conn: &impl XConn, id: Xid) -> Result<()> {
        conn.focus(id)?;
        self.focused = Some(id);
        Ok(())
    }

    fn focus_event(&self, id: Xid) -> StateEvent {
        StateEvent::Focus {
            win: id.0,
            title: self
                .windows
                .get(&id)
                .and_then(|w| w.title.clone())
                .unwrap_or_default(),
        }
    }

    // `bar_show_occupied_only` governs how a bar client renders the `occupied`
    // list it already gets (spec.md §6 `bar`); per spec.md §8 scenario 1 the
    // field itself always reports actual occupancy regardless of the flag.
    fn workspace_event(&self, monitor: usize) -> StateEvent {
        let active = self.visible_workspace_on(monitor).unwrap_or(0);
        let mut occupied: Vec<usize> = self
            .workspaces
            .values()
            .filter(|w| w.is_occupied())
            .map(|w| w.index)
            .collect();
        occupied.sort_unstable();
        StateEvent::Workspace { active, occupied }
    }

    fn apply_layout(&mut self, conn: &impl XConn, ws_idx: usize) -> Result<()> {
        let geoms = {
            let Some(ws) = self.workspaces.get(&ws_idx) else {
                return Ok(());
            };
            let usable = self.monitors[ws.monitor].usable_rect(self.gap);
            ws.tiled.geometries(usable)
        };

        for (id, rect) in geoms {
            let gapped = rect.shrink(self.gap / 2);
            if let Some(w) = self.windows.get_mut(&id) {
                if !w.fullscreen {
                    w.frame.move_resize(conn, gapped, &self.border)?;
                }
            }
        }
        Ok(())
    }

    fn relayout_all_visible(&mut self, conn: &impl XConn) -> Result<()> {
        let visible: Vec<usize> = self.workspaces.values().filter(|w| w.visible).map(|w| w.index).collect();
        for idx in visible {
            self.apply_layout(conn, idx)?;
        }
        Ok(())
    }

    fn map_workspace(&mut self, conn: &impl XConn, idx: usize) -> Result<()> {
        for id in self.workspace_window_ids(idx) {
            if let Some(w) = self.windows.get_mut(&id) {
                conn.map(w.frame.id)?;
                w.mapped = true;
            }
        }
        Ok(())
    }

    fn unmap_workspace(&mut self, conn: &impl XConn, idx: usize) -> Result<()> {
        for id in self.workspace_window_ids(idx) {
            if let Some(w) = self.windows.get_mut(&id) {
                conn.unmap(w.frame.id)?;
                w.mapped = false;
            }
        }
        Ok(())
    }

    fn redraw_all(&mut self, conn: &impl XConn) -> Result<()> {
        let ids: Vec<Xid> = self.windows.keys().copied().collect();
        let style = self.border;
        for id in ids {
            if let Some(w) = self.windows.get(&id) {
                w.frame.draw(conn, &style)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::rules::Placement;
    use crate::x::mock::MockXConn;
    use crate::x::Xid;

    fn engine_with_one_monitor() -> Engine {
        Engine::new(vec![Rect::new(0, 0, 1000, 800)])
    }

    #[test]
    fn adopting_two_windows_tiles_them_side_by_side() {
        let mut engine = engine_with_one_monitor();
        let conn = MockXConn::new();

        engine.adopt(&conn, Xid(1)).unwrap();
        engine.adopt(&conn, Xid(2)).unwrap();

        assert!(conn
            .calls
            .borrow()
            .iter()
            .any(|c| c.starts_with("configure(1000")));
    }

    #[test]
    fn view_unknown_workspace_errors() {
        let mut engine = engine_with_one_monitor();
        let conn = MockXConn::new();
        assert!(matches!(engine.view_ws(&conn, 99), Err(Error::UnknownWorkspace)));
    }

    #[test]
    fn view_same_workspace_twice_emits_event_both_times() {
        let mut engine = engine_with_one_monitor();
        let conn = MockXConn::new();
        let a = engine.view_ws(&conn, 1).unwrap();
        let b = engine.view_ws(&conn, 1).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn resize_lone_window_is_noop() {
        let mut engine = engine_with_one_monitor();
        let conn = MockXConn::new();
        engine.adopt(&conn, Xid(1)).unwrap();
        conn.calls.borrow_mut().clear();

        engine.resize(&conn, 50, 0).unwrap();
        assert!(conn.calls.borrow().iter().any(|c| c.contains("1000x800")));
    }

    #[test]
    fn focus_dir_moves_focus_to_neighbor() {
        let mut engine = engine_with_one_monitor();
        let conn = MockXConn::new();
        engine.adopt(&conn, Xid(1)).unwrap();
        engine.adopt(&conn, Xid(2)).unwrap();

        assert_eq!(engine.focused(), Some(Xid(2)));
        let events = engine.focus_dir(&conn, Direction::Left).unwrap();
        assert_eq!(engine.focused(), Some(Xid(1)));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn float_toggle_round_trips_two_window_layout() {
        let mut engine = engine_with_one_monitor();
        let conn = MockXConn::new();
        engine.adopt(&conn, Xid(1)).unwrap();
        engine.adopt(&conn, Xid(2)).unwrap();
        engine.focus_dir(&conn, Direction::Left).unwrap();

        engine.float_toggle(&conn).unwrap();
        engine.float_toggle(&conn).unwrap();

        assert!(!engine.windows.get(&Xid(1)).unwrap().floating);
    }

    #[test]
    fn rule_places_window_on_target_workspace() {
        let mut engine = engine_with_one_monitor();
        engine.set_workspaces(vec![(1, "dev".into()), (2, "web".into())]);
        engine.add_rule(Rule::new(
            Some("Firefox".into()),
            None,
            Placement {
                workspace: Some(2),
                ..Default::default()
            },
        ));

        let mut conn = MockXConn::new();
        conn.set_class(
            Xid(1),
            crate::x::WindowClass {
                class: Some("Firefox".into()),
                title: None,
            },
        );
        engine.adopt(&conn, Xid(1)).unwrap();

        assert_eq!(engine.windows.get(&Xid(1)).unwrap().workspace, 2);
    }

    #[test]
    fn move_ws_makes_newly_hosted_workspace_visible_if_monitor_was_empty() {
        let mut engine = Engine::new(vec![Rect::new(0, 0, 1000, 800), Rect::new(1000, 0, 1000, 800)]);
        engine.set_workspaces(vec![(1, "a".into()), (2, "b".into())]);
        let conn = MockXConn::new();

        engine.move_ws(&conn, 2, 1).unwrap();
        let workspaces = engine.query_workspaces();
        let ws2 = workspaces["workspaces"]
            .as_array()
            .unwrap()
            .iter()
            .find(|w| w["index"] == 2)
            .unwrap();
        assert_eq!(ws2["visible"], true);
        assert_eq!(ws2["monitor"], 1);
    }

    #[test]
    fn scratch_toggle_unknown_name_errors() {
        let mut engine = engine_with_one_monitor();
        let conn = MockXConn::new();
        assert!(engine.scratch_toggle(&conn, "nope").is_err());
    }

    #[test]
    fn scratch_toggle_first_call_returns_spawn_command() {
        let mut engine = engine_with_one_monitor();
        engine.register_scratchpad("term".into(), "spawn-terminal".into());
        let conn = MockXConn::new();

        let (events, spawn) = engine.scratch_toggle(&conn, "term").unwrap();
        assert!(events.is_empty());
        assert_eq!(spawn.as_deref(), Some("spawn-terminal"));
    }

    #[test]
    fn the_spawning_toggle_maps_and_focuses_the_scratchpad_window() {
        let mut engine = engine_with_one_monitor();
        engine.register_scratchpad("term".into(), "spawn-terminal".into());
        let conn = MockXConn::new();

        engine.scratch_toggle(&conn, "term").unwrap();
        let events = engine.adopt(&conn, Xid(1)).unwrap();

        assert!(conn.calls.borrow().iter().any(|c| c == "map(1000)"));
        assert!(conn.calls.borrow().iter().any(|c| c == "focus(1)"));
        assert_eq!(engine.focused(), Some(Xid(1)));
        assert!(matches!(&events[..], [StateEvent::Focus { win: 1, .. }]));
    }
}
