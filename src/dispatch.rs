//! The single command dispatcher shared by the IPC socket, key/mouse
//! bindings, and the configuration pipeline (spec.md §2 "data flow": every
//! source of commands funnels through one dispatcher before touching state).
use crate::ipc::{QueryTarget, Request};
use crate::state::{Engine, StateEvent};
use crate::x::XConn;
use crate::{Error, Result};

/// What running a [Request] against the engine produced, beyond the plain
/// `OK`/`ERR <reason>` reply every caller writes back to its source.
pub enum Effect {
    /// State changed; broadcast these events to IPC subscribers.
    Events(Vec<StateEvent>),
    /// A child process needs spawning (`spawn`, or a scratchpad's first
    /// `scratch toggle`). The caller owns process creation; the dispatcher
    /// only decides that it should happen.
    Spawn(String),
    /// `query ...`: the reply line itself is the answer, not a plain `OK`.
    Reply(String),
    /// `reload-config`: the caller re-runs the configuration pipeline.
    ReloadConfig,
    /// `quit`: the caller begins orderly shutdown.
    Quit,
}

/// Run a parsed request against `engine`, returning the effect to apply or
/// the text of an `ERR <reason>` reply (spec.md §7(a), §7(c) "reply OK/ERR").
pub fn dispatch(engine: &mut Engine, conn: &impl XConn, request: Request) -> Result<Effect> {
    use Request::*;
    match request {
        SetWorkspaces(specs) => {
            engine.set_workspaces(specs);
            Ok(Effect::Events(Vec::new()))
        }
        BindKey(combo, command) => {
            engine.bind_key(conn, combo, command)?;
            Ok(Effect::Events(Vec::new()))
        }
        BindButton(combo, command) => {
            engine.bind_button(conn, combo, command)?;
            Ok(Effect::Events(Vec::new()))
        }
        Rule(rule) => {
            engine.add_rule(rule);
            Ok(Effect::Events(Vec::new()))
        }
        ScratchRegister(name, spawn_command) => {
            engine.register_scratchpad(name, spawn_command);
            Ok(Effect::Events(Vec::new()))
        }
        ScratchToggle(name) => {
            let (events, spawn) = engine.scratch_toggle(conn, &name)?;
            match spawn {
                Some(command) => Ok(Effect::Spawn(command)),
                None => Ok(Effect::Events(events)),
            }
        }
        SetGap(px) => {
            engine.set_gap(conn, px)?;
            Ok(Effect::Events(Vec::new()))
        }
        SetBorderWidth(band, px) => {
            engine.set_border_width(conn, band, px)?;
            Ok(Effect::Events(Vec::new()))
        }
        SetBorderColor(band, color) => {
            engine.set_border_color(conn, band, color)?;
            Ok(Effect::Events(Vec::new()))
        }
        SetBarShowOccupiedOnly(value) => {
            engine.set_bar_show_occupied_only(value);
            Ok(Effect::Events(Vec::new()))
        }
        Spawn(command, placement) => {
            // Hints are for the window about to appear, not a standing rule
            // (spec.md §6 `spawn`), so they queue rather than join `rules`.
            if placement != Default::default() {
                engine.push_spawn_placement(placement);
            }
            Ok(Effect::Spawn(command))
        }
        Focus(dir) => Ok(Effect::Events(engine.focus_dir(conn, dir)?)),
        Move(dir) => Ok(Effect::Events(engine.move_dir(conn, dir)?)),
        Resize(dx, dy) => Ok(Effect::Events(engine.resize(conn, dx, dy)?)),
        FloatToggle => Ok(Effect::Events(engine.float_toggle(conn)?)),
        Close => {
            engine.close_focused(conn)?;
            Ok(Effect::Events(Vec::new()))
        }
        View(n) => Ok(Effect::Events(engine.view_ws(conn, n)?)),
        Send(n) => Ok(Effect::Events(engine.send_ws(conn, n)?)),
        MoveWs(n, monitor) => Ok(Effect::Events(engine.move_ws(conn, n, monitor)?)),
        ToggleBar => Ok(Effect::Events(engine.bar_toggle())),
        FullscreenToggle => Ok(Effect::Events(engine.fullscreen_toggle(conn)?)),
        ReloadConfig => Ok(Effect::ReloadConfig),
        Quit => Ok(Effect::Quit),
        Query(target) => {
            let value = match target {
                QueryTarget::Windows => engine.query_windows(),
                QueryTarget::Workspaces => engine.query_workspaces(),
                QueryTarget::Monitors => engine.query_monitors(),
            };
            Ok(Effect::Reply(format!("OK {value}")))
        }
    }
}

/// Parse and dispatch one protocol line, the shape every caller (IPC server,
/// bindings, config pipeline) actually uses.
pub fn dispatch_line(engine: &mut Engine, conn: &impl XConn, line: &str) -> Result<Effect> {
    let request = crate::ipc::parse_line(line).map_err(Error::from)?;
    dispatch(engine, conn, request)
}

/// Run a `spawn`-style command string as a detached child process (spec.md §6
/// `spawn`; §5 "Child processes spawned via `spawn` are not tracked").
pub fn spawn_child(command: &str) -> Result<()> {
    let tokens = shell_words::split(command)
        .map_err(|_| Error::Protocol(crate::ipc::ParseError::Quoting(command.to_string())))?;
    let Some((program, args)) = tokens.split_first() else {
        return Ok(());
    };
    std::process::Command::new(program).args(args).spawn()?;
    Ok(())
}

/// Render a dispatch outcome down to the single reply line a requester gets
/// back (spec.md §4.6 "every line gets exactly one reply").
pub fn reply_line(outcome: &Result<Effect>) -> String {
    match outcome {
        Ok(Effect::Reply(text)) => text.clone(),
        Ok(_) => "OK".to_string(),
        Err(e) => format!("ERR {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::x::mock::MockXConn;

    fn engine() -> Engine {
        Engine::new(vec![Rect::new(0, 0, 1000, 800)])
    }

    #[test]
    fn quit_is_recognised_without_touching_state() {
        let mut e = engine();
        let conn = MockXConn::new();
        let outcome = dispatch_line(&mut e, &conn, "quit");
        assert!(matches!(outcome, Ok(Effect::Quit)));
    }

    #[test]
    fn unknown_verb_becomes_err_reply() {
        let mut e = engine();
        let conn = MockXConn::new();
        let outcome = dispatch_line(&mut e, &conn, "frobnicate");
        assert!(reply_line(&outcome).starts_with("ERR"));
    }

    #[test]
    fn query_reply_is_the_json_payload_not_ok() {
        let mut e = engine();
        let conn = MockXConn::new();
        let outcome = dispatch_line(&mut e, &conn, "query workspaces");
        let line = reply_line(&outcome);
        assert!(line.contains("\"workspaces\""));
    }

    #[test]
    fn spawn_with_placement_queues_a_hint_consumed_on_adopt() {
        let mut e = engine();
        let conn = MockXConn::new();
        let outcome = dispatch_line(&mut e, &conn, "spawn alacritty workspace=1 float=true").unwrap();
        assert!(matches!(outcome, Effect::Spawn(cmd) if cmd == "alacritty"));

        e.adopt(&conn, crate::x::Xid(1)).unwrap();
        let windows = e.query_windows();
        let w = &windows["windows"].as_array().unwrap()[0];
        assert_eq!(w["floating"], true);
    }

    #[test]
    fn view_unknown_workspace_reports_err() {
        let mut e = engine();
        let conn = MockXConn::new();
        let outcome = dispatch_line(&mut e, &conn, "view ws 99");
        assert_eq!(reply_line(&outcome), "ERR unknown-workspace");
    }
}
