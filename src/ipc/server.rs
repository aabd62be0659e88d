//! The control-socket listener (spec.md §4.6). Accept and per-client read
//! loops run on auxiliary threads; state is only ever touched from the
//! reactor thread that drains [IpcServer::commands] (spec.md §5).
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::state::StateEvent;
use crate::Result;

/// Identifies one connected IPC client for the lifetime of its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

/// A command line read from a client, tagged with the connection it arrived
/// on so the reply can be routed back to the right socket (spec.md §4.6).
pub struct Inbound {
    /// The client the line came from
    pub client: ClientId,
    /// The raw, UTF-8, not-yet-parsed request line
    pub line: String,
}

const COMMAND_QUEUE_CAPACITY: usize = 256;
// Plain std sockets have no portable non-blocking write API split from
// blocking reads on the same fd, so a short write timeout stands in for the
// "drop on EAGAIN/short write" back-pressure policy (spec.md §4.6).
const WRITE_TIMEOUT: Duration = Duration::from_millis(50);

/// The control socket the reactor selects on alongside X events and
/// filesystem-watch notifications.
pub struct IpcServer {
    socket_path: PathBuf,
    commands_rx: Receiver<Inbound>,
    subscribers: Arc<Mutex<HashMap<ClientId, UnixStream>>>,
}

impl IpcServer {
    /// Bind the control socket at `$MYWM_SOCKET` if set, otherwise
    /// `$XDG_RUNTIME_DIR/mywm.sock`, falling back to `/tmp/mywm.sock`
    /// (spec.md §4.6, §6).
    pub fn bind() -> Result<Self> {
        Self::bind_at(default_socket_path())
    }

    /// Bind at an explicit path, used by tests to avoid colliding on a real
    /// runtime directory.
    pub fn bind_at(path: PathBuf) -> Result<Self> {
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        let listener = UnixListener::bind(&path)?;

        let (tx, rx) = bounded(COMMAND_QUEUE_CAPACITY);
        let subscribers: Arc<Mutex<HashMap<ClientId, UnixStream>>> = Arc::new(Mutex::new(HashMap::new()));
        let next_id = Arc::new(AtomicU64::new(1));

        let accept_subscribers = Arc::clone(&subscribers);
        thread::spawn(move || accept_loop(listener, tx, accept_subscribers, next_id));

        Ok(Self {
            socket_path: path,
            commands_rx: rx,
            subscribers,
        })
    }

    /// The channel the reactor's `crossbeam_channel::Select` waits on for
    /// incoming command lines.
    pub fn commands(&self) -> &Receiver<Inbound> {
        &self.commands_rx
    }

    /// Send a single reply line (`OK` or `ERR <reason>`) back to `client`.
    pub fn reply(&self, client: ClientId, line: &str) {
        let mut subs = self.subscribers.lock().unwrap();
        if let Some(stream) = subs.get_mut(&client) {
            if write_line(stream, line).is_err() {
                subs.remove(&client);
            }
        }
    }

    /// Broadcast an event to every subscriber, dropping any whose send buffer
    /// is full or who have otherwise gone away (spec.md §4.6 "Back-pressure").
    pub fn broadcast(&self, event: &StateEvent) {
        let line = match serde_json::to_string(event) {
            Ok(l) => l,
            Err(e) => {
                warn!(error = %e, "failed to serialize event for broadcast");
                return;
            }
        };
        let mut subs = self.subscribers.lock().unwrap();
        subs.retain(|_, stream| write_line(stream, &line).is_ok());
    }

    /// Close every subscriber connection, used during orderly shutdown
    /// (spec.md §5 "Cancellation and shutdown").
    pub fn shutdown(&self) {
        self.subscribers.lock().unwrap().clear();
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// A [ClientId] with no backing connection, for tests that only care about
/// dispatch behavior and never expect a reply to actually arrive anywhere.
#[cfg(test)]
pub(crate) fn test_client_id() -> ClientId {
    ClientId(0)
}

fn default_socket_path() -> PathBuf {
    if let Some(path) = std::env::var_os("MYWM_SOCKET") {
        return PathBuf::from(path);
    }
    match std::env::var_os("XDG_RUNTIME_DIR") {
        Some(dir) => Path::new(&dir).join("mywm.sock"),
        None => PathBuf::from("/tmp/mywm.sock"),
    }
}

fn write_line(stream: &mut UnixStream, line: &str) -> std::io::Result<()> {
    stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
    stream.write_all(line.as_bytes())?;
    stream.write_all(b"\n")
}

fn accept_loop(
    listener: UnixListener,
    commands_tx: Sender<Inbound>,
    subscribers: Arc<Mutex<HashMap<ClientId, UnixStream>>>,
    next_id: Arc<AtomicU64>,
) {
    for incoming in listener.incoming() {
        let Ok(stream) = incoming else { continue };
        let id = ClientId(next_id.fetch_add(1, Ordering::Relaxed));

        let Ok(write_half) = stream.try_clone() else { continue };
        subscribers.lock().unwrap().insert(id, write_half);

        let reader_tx = commands_tx.clone();
        let reader_subscribers = Arc::clone(&subscribers);
        thread::spawn(move || read_loop(id, stream, reader_tx, reader_subscribers));
    }
}

fn read_loop(
    id: ClientId,
    stream: UnixStream,
    commands_tx: Sender<Inbound>,
    subscribers: Arc<Mutex<HashMap<ClientId, UnixStream>>>,
) {
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        match line {
            Ok(line) if !line.is_empty() => {
                if commands_tx.send(Inbound { client: id, line }).is_err() {
                    break;
                }
            }
            Ok(_) => continue,
            Err(_) => break,
        }
    }
    debug!(client = ?id, "ipc client disconnected");
    subscribers.lock().unwrap().remove(&id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::time::{Duration, Instant};

    fn temp_socket_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mywm-test-{name}-{}.sock", std::process::id()))
    }

    #[test]
    fn command_line_reaches_the_reactor_queue() {
        let path = temp_socket_path("commands");
        let server = IpcServer::bind_at(path.clone()).unwrap();

        let mut client = UnixStream::connect(&path).unwrap();
        client.write_all(b"quit\n").unwrap();

        let inbound = server.commands().recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(inbound.line, "quit");
    }

    #[test]
    fn reply_is_written_back_to_the_sending_client() {
        let path = temp_socket_path("reply");
        let server = IpcServer::bind_at(path.clone()).unwrap();

        let mut client = UnixStream::connect(&path).unwrap();
        client.write_all(b"togglebar\n").unwrap();
        let inbound = server.commands().recv_timeout(Duration::from_secs(1)).unwrap();

        server.reply(inbound.client, "OK");

        let mut buf = [0u8; 16];
        let n = client.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"OK\n");
    }

    #[test]
    fn broadcast_reaches_a_pure_subscriber() {
        let path = temp_socket_path("broadcast");
        let server = IpcServer::bind_at(path.clone()).unwrap();
        let mut client = UnixStream::connect(&path).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        server.broadcast(&StateEvent::BarToggle { visible: true });

        let mut buf = [0u8; 128];
        let n = client.read(&mut buf).unwrap();
        let text = std::str::from_utf8(&buf[..n]).unwrap();
        assert!(text.contains("\"event\":\"bar-toggle\""));
    }

    #[test]
    fn a_subscriber_that_never_reads_is_dropped_without_stalling_others() {
        let path = temp_socket_path("backpressure");
        let server = IpcServer::bind_at(path.clone()).unwrap();

        let fast = UnixStream::connect(&path).unwrap();
        let _slow = UnixStream::connect(&path).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        // Enough broadcasts to overflow the never-reading subscriber's kernel
        // receive buffer and trip its write timeout. The broadcaster must keep
        // delivering to `fast` the whole time rather than ever blocking on `_slow`.
        let total: u32 = 20_000;
        let start = Instant::now();
        for win in 0..total {
            server.broadcast(&StateEvent::Focus { win, title: String::new() });
        }
        assert!(
            start.elapsed() < Duration::from_secs(10),
            "broadcast must not block on a subscriber that never reads"
        );

        let mut reader = BufReader::new(fast);
        let mut expected = 0u32;
        for _ in 0..total {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let event: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
            assert_eq!(event["win"], expected, "events must reach the live subscriber in order");
            expected += 1;
        }
    }
}
