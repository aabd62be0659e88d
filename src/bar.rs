//! The bar publisher: the thin layer between the state engine's events and
//! the IPC broadcast path an external status bar subscribes to (spec.md §2
//! "window-state engine -> (display gateway | bar publisher)"). The wire
//! shape itself lives on [crate::state::StateEvent]; this module is the
//! single place the reactor calls to fan a batch of events out, so the
//! broadcast point is named the way the data-flow diagram names it.
use tracing::trace;

use crate::ipc::IpcServer;
use crate::state::StateEvent;

/// Publish every event in `events` to current IPC subscribers, in order
/// (spec.md §5 "Ordering guarantees": events from one command appear in the
/// order that command produced them).
pub fn publish(ipc: &IpcServer, events: &[StateEvent]) {
    for event in events {
        trace!(?event, "publishing state event");
        ipc.broadcast(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::IpcServer;
    use std::io::Read;
    use std::os::unix::net::UnixStream;

    #[test]
    fn publish_writes_events_in_order() {
        let path = std::env::temp_dir().join(format!("mywm-bar-test-{}.sock", std::process::id()));
        let server = IpcServer::bind_at(path.clone()).unwrap();
        let mut client = UnixStream::connect(&path).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(50));

        publish(
            &server,
            &[
                StateEvent::BarToggle { visible: true },
                StateEvent::BarToggle { visible: false },
            ],
        );

        let mut buf = [0u8; 256];
        let n = client.read(&mut buf).unwrap();
        let text = std::str::from_utf8(&buf[..n]).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"visible\":true"));
        assert!(lines[1].contains("\"visible\":false"));
    }
}
