//! The configuration pipeline: running a config source's protocol lines
//! through the command dispatcher, and re-running it on filesystem change
//! (spec.md §4.8).
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crossbeam_channel::{unbounded, Receiver};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::dispatch::{self, Effect};
use crate::state::{Engine, StateEvent};
use crate::x::XConn;
use crate::{Error, Result};

/// Execute `source`, feeding each stdout line through the dispatcher in order
/// (spec.md §4.8 `run_once`). A line that fails to parse or dispatch is
/// logged and skipped rather than aborting the rest of the source's output.
pub fn run_once(conn: &impl XConn, engine: &mut Engine, source: &Path) -> Result<Vec<StateEvent>> {
    let mut child = Command::new(source)
        .stdout(Stdio::piped())
        .spawn()
        .map_err(Error::from)?;
    let stdout = child.stdout.take().expect("stdout is piped above");
    let reader = BufReader::new(stdout);

    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        match dispatch::dispatch_line(engine, conn, &line) {
            Ok(Effect::Events(evs)) => events.extend(evs),
            Ok(Effect::Spawn(cmd)) => {
                if let Err(e) = dispatch::spawn_child(&cmd) {
                    warn!(command = %cmd, error = %e, "config source's spawn failed");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(line = %line, error = %e, "config source line rejected"),
        }
    }

    let status = child.wait()?;
    if !status.success() {
        return Err(Error::ConfigExited(status.code().unwrap_or(-1)));
    }
    Ok(events)
}

/// Reset mutable configuration (bindings, rules, appearance) and replay the
/// source, preserving runtime state (spec.md §4.8 reset policy).
pub fn reload(conn: &impl XConn, engine: &mut Engine, source: &Path) -> Result<Vec<StateEvent>> {
    engine.reset_config(conn)?;
    run_once(conn, engine, source)
}

/// A standing filesystem watch on a config source, feeding a "something
/// changed" signal into the reactor's select loop (spec.md §5 "the
/// configuration watcher may run a thread that simply enqueues a reload
/// command"). The `notify` watcher callback itself runs on `notify`'s own
/// background thread; this struct just owns it and exposes the channel.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    reloads: Receiver<()>,
}

impl ConfigWatcher {
    /// Begin watching `path` for changes.
    pub fn watch(path: &Path) -> Result<Self> {
        let (tx, rx) = unbounded();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res
        {
            Ok(event) if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) => {
                let _ = tx.send(());
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "config watcher error"),
        })
        .map_err(watch_error)?;
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(watch_error)?;
        Ok(Self {
            _watcher: watcher,
            reloads: rx,
        })
    }

    /// The channel the reactor's `Select` waits on alongside X events and IPC
    /// commands.
    pub fn reloads(&self) -> &Receiver<()> {
        &self.reloads
    }
}

fn watch_error(e: notify::Error) -> Error {
    Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
}

/// `$MYWM_CONFIG`, falling back to a conventional XDG path, mirroring
/// [crate::ipc::server::default_socket_path]'s own fallback shape.
pub fn default_source_path() -> PathBuf {
    if let Some(path) = std::env::var_os("MYWM_CONFIG") {
        return PathBuf::from(path);
    }
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("mywm").join("init")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::x::mock::MockXConn;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    fn executable_script(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("mywm-config-test-{name}-{}", std::process::id()));
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "#!/bin/sh\n{body}").unwrap();
        let mut perms = f.metadata().unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn run_once_dispatches_every_line() {
        let script = executable_script("basic", "echo 'set-gap 10'\necho 'togglebar'");
        let mut engine = Engine::new(vec![Rect::new(0, 0, 1000, 800)]);
        let conn = MockXConn::new();

        let events = run_once(&conn, &mut engine, &script).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], StateEvent::BarToggle { visible: true }));

        std::fs::remove_file(&script).ok();
    }

    #[test]
    fn nonzero_exit_is_config_exited_error() {
        let script = executable_script("fails", "exit 3");
        let mut engine = Engine::new(vec![Rect::new(0, 0, 1000, 800)]);
        let conn = MockXConn::new();

        let err = run_once(&conn, &mut engine, &script).unwrap_err();
        assert!(matches!(err, Error::ConfigExited(3)));

        std::fs::remove_file(&script).ok();
    }

    #[test]
    fn bad_line_is_skipped_not_fatal() {
        let script = executable_script("bad-line", "echo 'frobnicate'\necho 'set-gap 4'");
        let mut engine = Engine::new(vec![Rect::new(0, 0, 1000, 800)]);
        let conn = MockXConn::new();

        let events = run_once(&conn, &mut engine, &script).unwrap();
        assert!(events.is_empty());

        std::fs::remove_file(&script).ok();
    }
}
