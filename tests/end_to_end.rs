//! End-to-end scenarios driven entirely against [MockXConn], exercising the
//! window-state engine and the shared command dispatcher the way a real IPC
//! client or key binding would (spec.md §8 "End-to-end scenarios").
use mywm::dispatch::{dispatch_line, Effect};
use mywm::geometry::Rect;
use mywm::state::{Engine, StateEvent};
use mywm::x::mock::MockXConn;
use mywm::x::{WindowClass, Xid};

fn engine_with_workspaces(specs: &[(usize, &str)]) -> Engine {
    let mut engine = Engine::new(vec![Rect::new(0, 0, 1000, 800)]);
    engine.set_workspaces(specs.iter().map(|(i, l)| (*i, l.to_string())).collect());
    engine
}

fn dispatch(engine: &mut Engine, conn: &MockXConn, line: &str) -> Effect {
    dispatch_line(engine, conn, line).unwrap()
}

#[test]
fn adoption_and_tiling_on_two_xterms() {
    let mut engine = engine_with_workspaces(&[(1, "dev"), (2, "web")]);
    let mut conn = MockXConn::new();
    conn.set_class(Xid(1), WindowClass { class: Some("Xterm".into()), title: None });
    conn.set_class(Xid(2), WindowClass { class: Some("Xterm".into()), title: None });

    let a_events = engine.adopt(&conn, Xid(1)).unwrap();
    let ws_events: Vec<_> = a_events
        .iter()
        .filter(|e| matches!(e, StateEvent::Workspace { .. }))
        .collect();
    assert_eq!(ws_events.len(), 1);
    assert_eq!(
        ws_events[0],
        &StateEvent::Workspace { active: 1, occupied: vec![1] }
    );

    let b_events = engine.adopt(&conn, Xid(2)).unwrap();
    assert!(
        !b_events.iter().any(|e| matches!(e, StateEvent::Workspace { .. })),
        "a second window on an already-occupied workspace must not re-emit the workspace event"
    );

    let windows = engine.query_windows();
    let arr = windows["windows"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
}

#[test]
fn rule_based_placement_defers_until_view() {
    let mut engine = engine_with_workspaces(&[(1, "dev"), (2, "web")]);
    let mut conn = MockXConn::new();
    dispatch(&mut engine, &conn, "rule class=Firefox workspace=2");

    conn.set_class(Xid(10), WindowClass { class: Some("Firefox".into()), title: None });
    let events = engine.adopt(&conn, Xid(10)).unwrap();

    // Workspace 2 is not the visible one yet, so adoption only announces
    // occupancy, it never maps or focuses the window.
    assert!(events.iter().any(|e| matches!(
        e,
        StateEvent::Workspace { occupied, .. } if occupied == &vec![2]
    )));
    assert!(!conn.calls.borrow().iter().any(|c| c.starts_with("map(")));

    let view_events = engine.view_ws(&conn, 2).unwrap();
    assert!(conn.calls.borrow().iter().any(|c| c.starts_with("map(")));
    assert!(!view_events.is_empty());
}

#[test]
fn directional_focus_moves_and_then_is_a_no_op() {
    let mut engine = engine_with_workspaces(&[(1, "dev")]);
    let mut conn = MockXConn::new();
    conn.set_class(Xid(1), WindowClass { class: Some("Xterm".into()), title: None });
    conn.set_class(Xid(2), WindowClass { class: Some("Xterm".into()), title: None });
    engine.adopt(&conn, Xid(1)).unwrap();
    engine.adopt(&conn, Xid(2)).unwrap();

    assert_eq!(engine.focused(), Some(Xid(2)));

    let events = engine.focus_dir(&conn, mywm::state::Direction::Left).unwrap();
    assert_eq!(engine.focused(), Some(Xid(1)));
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], StateEvent::Focus { win, .. } if *win == 1));

    // B is to the right of A; "left" from A has no neighbor.
    let events = engine.focus_dir(&conn, mywm::state::Direction::Left).unwrap();
    assert!(events.is_empty());
    assert_eq!(engine.focused(), Some(Xid(1)));
}

#[test]
fn float_toggle_round_trips_through_bsp_placement() {
    let mut engine = engine_with_workspaces(&[(1, "dev")]);
    let mut conn = MockXConn::new();
    conn.set_class(Xid(1), WindowClass { class: Some("Xterm".into()), title: None });
    conn.set_class(Xid(2), WindowClass { class: Some("Xterm".into()), title: None });
    engine.adopt(&conn, Xid(1)).unwrap();
    engine.adopt(&conn, Xid(2)).unwrap();
    // Xid(2) is focused after adoption; focus A to match the scenario.
    engine.focus_dir(&conn, mywm::state::Direction::Left).unwrap();
    assert_eq!(engine.focused(), Some(Xid(1)));

    let before = engine.query_windows();

    engine.float_toggle(&conn).unwrap();
    let mid = engine.query_windows();
    assert_ne!(before, mid, "floating A should change both windows' reported geometry");

    engine.float_toggle(&conn).unwrap();
    let after = engine.query_windows();
    assert_eq!(before, after, "toggling float twice restores the original tiled layout");
}

#[test]
fn reload_drops_the_previous_binding() {
    let mut engine = engine_with_workspaces(&[(1, "dev")]);
    let conn = MockXConn::new();
    dispatch(&mut engine, &conn, "bind Mod4-q close");
    assert_eq!(engine.bindings.command_for_key(&"Mod4-q".parse().unwrap()), Some("close"));

    engine.reset_config(&conn).unwrap();
    assert_eq!(engine.bindings.command_for_key(&"Mod4-q".parse().unwrap()), None);

    dispatch(&mut engine, &conn, "bind Mod4-q \"spawn foo\"");
    assert_eq!(
        engine.bindings.command_for_key(&"Mod4-q".parse().unwrap()),
        Some("spawn foo")
    );
}

#[test]
fn unknown_workspace_is_reported_as_err_not_a_state_change() {
    let mut engine = engine_with_workspaces(&[(1, "dev")]);
    let conn = MockXConn::new();
    let before = engine.query_workspaces();

    let outcome = dispatch_line(&mut engine, &conn, "view ws 99");
    assert!(outcome.is_err());
    assert_eq!(engine.query_workspaces(), before);
}

#[test]
fn adopting_a_window_with_no_class_or_title_does_not_crash() {
    let mut engine = engine_with_workspaces(&[(1, "dev")]);
    let conn = MockXConn::new();
    let events = engine.adopt(&conn, Xid(1)).unwrap();
    assert!(!events.is_empty());
}

#[test]
fn spawn_placement_hint_is_consumed_by_the_very_next_adoption() {
    let mut engine = engine_with_workspaces(&[(1, "dev"), (2, "web")]);
    let conn = MockXConn::new();
    dispatch(&mut engine, &conn, "spawn foo workspace=2");
    engine.adopt(&conn, Xid(1)).unwrap();
    let windows = engine.query_windows();
    let first = windows["windows"]
        .as_array()
        .unwrap()
        .iter()
        .find(|w| w["id"] == 1)
        .unwrap();
    assert_eq!(first["workspace"], 2);

    // A second window without its own hint falls back to ordinary placement.
    engine.adopt(&conn, Xid(2)).unwrap();
    let windows = engine.query_windows();
    let second = windows["windows"]
        .as_array()
        .unwrap()
        .iter()
        .find(|w| w["id"] == 2)
        .unwrap();
    assert_eq!(second["workspace"], 1);
}

#[test]
fn pre_existing_clients_are_adopted_at_startup() {
    let mut engine = engine_with_workspaces(&[(1, "dev")]);
    let mut conn = MockXConn::new();
    conn.set_existing_clients(vec![Xid(1), Xid(2)]);
    let events = engine.adopt_existing(&conn).unwrap();
    assert!(!events.is_empty());
    assert_eq!(engine.query_windows()["windows"].as_array().unwrap().len(), 2);
}

#[test]
fn shutdown_destroys_every_frame_and_clears_state() {
    let mut engine = engine_with_workspaces(&[(1, "dev")]);
    let conn = MockXConn::new();
    engine.adopt(&conn, Xid(1)).unwrap();
    engine.adopt(&conn, Xid(2)).unwrap();

    engine.shutdown(&conn).unwrap();

    assert_eq!(engine.focused(), None);
    assert_eq!(engine.query_windows()["windows"].as_array().unwrap().len(), 0);
    assert!(conn.calls.borrow().iter().any(|c| c.starts_with("destroy_window(")));
}
