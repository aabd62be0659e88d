//! The single-threaded reactor: the one thread that mutates window-state-engine
//! state, multiplexing X events, IPC command lines, and config-reload
//! notifications on a `crossbeam_channel::Select` (spec.md §5).
use std::path::PathBuf;

use crossbeam_channel::{Receiver, Select};
use tracing::{debug, error, span, warn, Level};

use crate::config;
use crate::dispatch::{self, Effect};
use crate::ipc::{IpcServer, Inbound};
use crate::state::{Engine, StateEvent};
use crate::x::{XConn, XEvent, Xid};
use crate::{bar, Result};

/// Owns the display gateway, the state engine and the control socket, and
/// runs the event loop that ties them together. Generic over `XConn` so the
/// same reactor logic drives both the real `x11rb` backend and
/// [crate::x::mock::MockXConn] in tests.
pub struct Reactor<C: XConn> {
    conn: C,
    engine: Engine,
    ipc: IpcServer,
    config_path: Option<PathBuf>,
    running: bool,
}

impl<C: XConn> Reactor<C> {
    /// Build a reactor from an already-connected display gateway, a
    /// pre-configured engine (workspaces, bindings, rules from the initial
    /// config run), and a bound control socket.
    pub fn new(conn: C, engine: Engine, ipc: IpcServer, config_path: Option<PathBuf>) -> Self {
        Self {
            conn,
            engine,
            ipc,
            config_path,
            running: false,
        }
    }

    /// Adopt every pre-existing top-level window before entering the loop
    /// (spec.md §11.4).
    pub fn adopt_existing(&mut self) -> Result<()> {
        let events = self.engine.adopt_existing(&self.conn)?;
        bar::publish(&self.ipc, &events);
        self.publish_ewmh_hints();
        Ok(())
    }

    /// Run until `quit` (or a fatal connection error) sets `running` false.
    /// `x_events` is produced by an auxiliary thread pumping
    /// `conn.next_event()` (the display connection's blocking read can't
    /// itself join a `Select`); `reloads` comes from an optional
    /// [config::ConfigWatcher].
    pub fn run(&mut self, x_events: &Receiver<XEvent>, reloads: Option<&Receiver<()>>) -> Result<()> {
        self.running = true;
        let commands = self.ipc.commands().clone();

        while self.running {
            let mut sel = Select::new();
            let x_idx = sel.recv(x_events);
            let cmd_idx = sel.recv(&commands);
            let reload_idx = reloads.map(|r| sel.recv(r));

            let oper = sel.select();
            let index = oper.index();

            if index == x_idx {
                match oper.recv(x_events) {
                    Ok(event) => self.handle_x_event(event),
                    Err(_) => {
                        error!("display connection pump disconnected");
                        self.running = false;
                        continue;
                    }
                }
            } else if index == cmd_idx {
                match oper.recv(&commands) {
                    Ok(inbound) => self.handle_command(inbound),
                    Err(_) => continue,
                }
            } else if Some(index) == reload_idx {
                if let Some(r) = reloads {
                    if oper.recv(r).is_ok() {
                        let _ = self.reload();
                    }
                }
            }
        }

        self.shutdown()
    }

    fn handle_x_event(&mut self, event: XEvent) {
        let _span = span!(Level::DEBUG, "x_event", %event).entered();
        let result = match event {
            XEvent::MapRequest(id) => self.engine.adopt(&self.conn, id),
            XEvent::UnmapNotify(id) => self.engine.unmanage(&self.conn, id),
            XEvent::DestroyNotify(id) => self.engine.unmanage(&self.conn, id),
            XEvent::ConfigureRequest(_) => Ok(Vec::new()),
            XEvent::KeyPress(combo) => {
                let Some(command) = self.engine.bindings.command_for_key(&combo).map(str::to_string) else {
                    return;
                };
                self.run_bound_command(&command);
                return;
            }
            XEvent::ButtonPress(combo, _point) => {
                let Some(command) = self.engine.bindings.command_for_button(&combo).map(str::to_string) else {
                    return;
                };
                self.run_bound_command(&command);
                return;
            }
            XEvent::PropertyNotify(id) => {
                self.refresh_struts(id);
                return;
            }
            XEvent::ScreenChange => Ok(Vec::new()),
        };

        match result {
            Ok(events) => {
                bar::publish(&self.ipc, &events);
                if !events.is_empty() {
                    self.publish_ewmh_hints();
                }
            }
            Err(e) if e.is_fatal() => {
                error!(error = %e, "fatal display connection error");
                self.running = false;
            }
            Err(e) => warn!(error = %e, "x event handling failed for one window"),
        }
    }

    fn run_bound_command(&mut self, command: &str) {
        let outcome = dispatch::dispatch_line(&mut self.engine, &self.conn, command);
        self.apply_outcome(outcome);
    }

    // Struts are read from the bar's own window and applied to monitor 0, the
    // bar's conventional home (spec.md §11.1); a multi-bar setup is out of
    // scope for the grammar as given.
    fn refresh_struts(&mut self, id: Xid) {
        let Ok(struts) = self.conn.read_struts(id) else {
            return;
        };
        if let Err(e) = self.engine.set_monitor_struts(&self.conn, 0, struts) {
            warn!(error = %e, "failed to apply updated struts");
        }
    }

    fn handle_command(&mut self, inbound: Inbound) {
        let outcome = dispatch::dispatch_line(&mut self.engine, &self.conn, &inbound.line);
        // `reload-config`'s reply has to wait on the reload actually running
        // (spec.md §7(f) "ERR config <exit-code>") rather than the generic
        // `Ok(Effect::ReloadConfig) -> "OK"` every other verb gets.
        if matches!(outcome, Ok(Effect::ReloadConfig)) {
            let reply = match self.reload() {
                Ok(()) => "OK".to_string(),
                Err(e) => format!("ERR {e}"),
            };
            self.ipc.reply(inbound.client, &reply);
            return;
        }
        let reply = dispatch::reply_line(&outcome);
        self.ipc.reply(inbound.client, &reply);
        self.apply_outcome(outcome);
    }

    fn apply_outcome(&mut self, outcome: Result<Effect>) {
        match outcome {
            Ok(Effect::Events(events)) => {
                bar::publish(&self.ipc, &events);
                if !events.is_empty() {
                    self.publish_ewmh_hints();
                }
            }
            Ok(Effect::Spawn(command)) => {
                if let Err(e) = dispatch::spawn_child(&command) {
                    warn!(command = %command, error = %e, "spawn failed");
                }
            }
            Ok(Effect::Reply(_)) => {}
            Ok(Effect::ReloadConfig) => {
                let _ = self.reload();
            }
            Ok(Effect::Quit) => self.running = false,
            Err(e) => debug!(error = %e, "command rejected"),
        }
    }

    fn reload(&mut self) -> Result<()> {
        let Some(path) = self.config_path.clone() else {
            return Ok(());
        };
        match config::reload(&self.conn, &mut self.engine, &path) {
            Ok(events) => {
                bar::publish(&self.ipc, &events);
                self.publish_ewmh_hints();
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "config reload failed");
                Err(e)
            }
        }
    }

    fn publish_ewmh_hints(&self) {
        let (names, current, clients, active) = self.engine.ewmh_hints();
        if let Err(e) = self.conn.set_ewmh_desktop_hints(&names, current, &clients, active) {
            debug!(error = %e, "failed to publish EWMH desktop hints");
        }
    }

    /// `quit`: reparent every managed client back to the root, close all IPC
    /// subscribers, and stop (spec.md §5 "Cancellation and shutdown").
    fn shutdown(&mut self) -> Result<()> {
        self.engine.shutdown(&self.conn)?;
        self.ipc.shutdown();
        self.conn.flush();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::x::mock::MockXConn;
    use crossbeam_channel::unbounded;

    fn reactor() -> (Reactor<MockXConn>, PathBuf) {
        let path = std::env::temp_dir().join(format!("mywm-reactor-test-{}.sock", std::process::id()));
        let conn = MockXConn::new();
        let engine = Engine::new(vec![Rect::new(0, 0, 1000, 800)]);
        let ipc = IpcServer::bind_at(path.clone()).unwrap();
        (Reactor::new(conn, engine, ipc, None), path)
    }

    #[test]
    fn map_request_adopts_and_broadcasts_workspace_event() {
        let (mut r, path) = reactor();
        r.handle_x_event(XEvent::MapRequest(Xid(1)));
        assert_eq!(r.engine.focused(), Some(Xid(1)));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn quit_command_stops_the_running_flag() {
        let (mut r, path) = reactor();
        r.running = true;
        r.handle_command(Inbound {
            client: crate::ipc::server::test_client_id(),
            line: "quit".into(),
        });
        assert!(!r.running);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn key_press_with_no_binding_is_silently_ignored() {
        let (mut r, path) = reactor();
        r.handle_x_event(XEvent::KeyPress(crate::bindings::KeyCombo {
            modifiers: vec![],
            key: "q".into(),
        }));
        assert_eq!(r.engine.focused(), None);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn bound_key_press_runs_its_command() {
        let (mut r, path) = reactor();
        let combo = crate::bindings::KeyCombo {
            modifiers: vec![],
            key: "q".into(),
        };
        r.engine.bindings.bind_key(combo.clone(), "togglebar".into());
        r.handle_x_event(XEvent::KeyPress(combo));
        assert!(r.engine.bar_visible());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn _unused() {
        let (_r, _) = reactor();
        let (_tx, _rx): (_, Receiver<()>) = unbounded();
    }

    fn executable_script(name: &str, body: &str) -> PathBuf {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let path = std::env::temp_dir().join(format!("mywm-reactor-reload-test-{name}-{}", std::process::id()));
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "#!/bin/sh\n{body}").unwrap();
        let mut perms = f.metadata().unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn reload_config_reply_waits_for_the_reload_and_reports_ok() {
        let script = executable_script("ok", "echo 'togglebar'");
        let conn = MockXConn::new();
        let engine = Engine::new(vec![Rect::new(0, 0, 1000, 800)]);
        let sock = std::env::temp_dir().join(format!("mywm-reactor-reload-ok-{}.sock", std::process::id()));
        let ipc = IpcServer::bind_at(sock.clone()).unwrap();
        let mut r = Reactor::new(conn, engine, ipc, Some(script.clone()));

        r.handle_command(Inbound {
            client: crate::ipc::server::test_client_id(),
            line: "reload-config".into(),
        });
        // The config source's own line ran as part of the reload this
        // triggered, proving the reply really did wait on it.
        assert!(r.engine.bar_visible());

        std::fs::remove_file(&script).ok();
        std::fs::remove_file(&sock).ok();
    }

    #[test]
    fn reload_config_reports_err_config_with_the_exit_code_on_failure() {
        let script = executable_script("fails", "exit 7");
        let conn = MockXConn::new();
        let engine = Engine::new(vec![Rect::new(0, 0, 1000, 800)]);
        let sock = std::env::temp_dir().join(format!("mywm-reactor-reload-fail-{}.sock", std::process::id()));
        let ipc = IpcServer::bind_at(sock.clone()).unwrap();
        let mut r = Reactor::new(conn, engine, ipc, Some(script.clone()));

        let result = r.reload();
        assert!(matches!(&result, Err(crate::Error::ConfigExited(7))));
        assert_eq!(dispatch::reply_line(&result.map(|_| Effect::Events(Vec::new()))), "ERR config 7");

        std::fs::remove_file(&script).ok();
        std::fs::remove_file(&sock).ok();
    }
}
