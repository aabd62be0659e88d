//! Thin entry point: wire up logging, connect to the display, run the
//! config source once, bind the control socket, adopt whatever is already on
//! screen and enter the reactor loop (spec.md §5).
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Sender};
use nix::sys::signal::{signal, SigHandler, Signal};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mywm::backend::x11rb::X11rbConn;
use mywm::config::{self, ConfigWatcher};
use mywm::ipc::IpcServer;
use mywm::reactor::Reactor;
use mywm::state::Engine;
use mywm::x::{XConn, XEvent};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run() {
        error!(error = %e, "mywm exited with an error");
        std::process::exit(1);
    }
}

fn run() -> mywm::Result<()> {
    // Spawned children are not tracked (spec.md §5); ignoring SIGCHLD lets the
    // kernel reap them without us waiting on every one.
    unsafe { signal(Signal::SIGCHLD, SigHandler::SigIgn) }
        .map_err(|e| mywm::Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?;

    let conn = Arc::new(X11rbConn::connect()?);
    let mut engine = Engine::new(conn.screen_details()?);

    let config_path = config::default_source_path();
    match config::run_once(&conn, &mut engine, &config_path) {
        Ok(_) => info!(path = %config_path.display(), "initial config run complete"),
        Err(e) => warn!(path = %config_path.display(), error = %e, "initial config run failed, starting with defaults"),
    }

    let ipc = IpcServer::bind()?;
    let watcher = match ConfigWatcher::watch(&config_path) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!(error = %e, "config file watch unavailable, reload-config must be triggered manually");
            None
        }
    };

    let x_events = spawn_event_pump(Arc::clone(&conn));

    let mut reactor = Reactor::new(conn, engine, ipc, Some(config_path));
    reactor.adopt_existing()?;
    reactor.run(&x_events, watcher.as_ref().map(ConfigWatcher::reloads))
}

/// Pump `conn.next_event()` on its own thread and forward each event into a
/// channel the reactor's `Select` can wait on alongside IPC commands and
/// config reloads (spec.md §5: the display connection's blocking read can't
/// itself join that select).
fn spawn_event_pump(conn: Arc<X11rbConn>) -> crossbeam_channel::Receiver<XEvent> {
    let (tx, rx) = unbounded();
    thread::spawn(move || pump(&conn, &tx));
    rx
}

fn pump(conn: &Arc<X11rbConn>, tx: &Sender<XEvent>) {
    loop {
        match conn.next_event() {
            Ok(event) => {
                if tx.send(event).is_err() {
                    return;
                }
            }
            Err(e) => {
                error!(error = %e, "display connection pump stopping");
                return;
            }
        }
    }
}
