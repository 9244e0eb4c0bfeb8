//! Link and session supervision: retries, idempotence, loss handling.

use crate::mock_hw::{
    FakeClock, MockLink, MockSession, RecordingIndicator, RecordingSink, World, booted,
    controller, test_config,
};

use dooropener::Error;
use dooropener::app::events::AppEvent;
use dooropener::app::link::{LinkState, LinkSupervisor};
use dooropener::app::ports::{SessionError, SessionOptions};
use dooropener::app::session::{SessionState, SessionSupervisor};
use dooropener::drivers::status_led::StatusLed;

fn options() -> SessionOptions {
    SessionOptions {
        broker_url: "mqtt://broker:1883".to_owned(),
        client_id: "door-test".to_owned(),
        username: None,
        password: None,
        last_will: None,
        keep_alive_secs: 30,
    }
}

// ── Idempotent ensure_up ──────────────────────────────────────

#[test]
fn ensure_up_when_already_up_makes_no_new_attempt() {
    let (mut ctl, world) = booted();
    assert_eq!(world.borrow().connects, 1);

    for _ in 0..5 {
        let report = ctl.tick();
        assert!(report.session_up);
    }
    let w = world.borrow();
    assert_eq!(w.connects, 1);
    assert_eq!(w.link_begins, 1);
    // Only the tick sleeps: no blink, no retry.
    assert!(w.delays.iter().all(|&d| d == ctl.config().tick_interval_ms));
}

#[test]
fn supervisors_return_at_once_when_up() {
    let world = World::shared();
    world.borrow_mut().link_up_at = Some(0);
    let mut clock = FakeClock(world.clone());
    let mut sink = RecordingSink(world.clone());

    let led = StatusLed::new(RecordingIndicator(world.clone()), false);
    let mut link = LinkSupervisor::new(MockLink(world.clone()), led, 200);
    link.ensure_up(&mut clock, &mut sink);
    link.ensure_up(&mut clock, &mut sink);
    assert_eq!(link.state(), LinkState::Connected);

    let mut session = SessionSupervisor::new(
        MockSession(world.clone()),
        options(),
        "door/open".to_owned(),
        None,
        5_000,
    );
    session.ensure_up(|| true, &mut clock, &mut sink).unwrap();
    session.ensure_up(|| true, &mut clock, &mut sink).unwrap();

    let w = world.borrow();
    assert_eq!(w.connects, 1);
    assert!(w.delays.is_empty());
    assert_eq!(
        w.count_events(|e| matches!(e, AppEvent::LinkUp { .. })),
        1
    );
}

// ── Session retry policy ──────────────────────────────────────

#[test]
fn refused_connects_retry_with_fixed_delay() {
    let world = World::shared();
    {
        let mut w = world.borrow_mut();
        w.link_up_at = Some(0);
        w.refuse_connects = 2;
    }
    let mut ctl = controller(test_config(), &world);
    ctl.boot();

    let w = world.borrow();
    assert_eq!(w.delays, vec![5_000, 5_000]);
    assert_eq!(w.connects, 1);
    assert_eq!(
        w.count_events(|e| matches!(
            e,
            AppEvent::SessionConnectFailed {
                error: SessionError::Refused,
                retry_in_ms: 5_000
            }
        )),
        2
    );
    assert_eq!(
        w.count_events(|e| matches!(e, AppEvent::SessionUp { attempts: 3 })),
        1
    );
    assert_eq!(ctl.session().state(), SessionState::Subscribed);
}

#[test]
fn link_drop_during_session_retry_hands_back_to_the_loop() {
    let world = World::shared();
    {
        let mut w = world.borrow_mut();
        w.link_up_at = Some(0);
        w.link_down_at = Some(6_000);
        w.refuse_connects = u32::MAX;
    }
    let mut ctl = controller(test_config(), &world);
    ctl.boot();

    let w = world.borrow();
    // Two refused attempts, then the link is gone at t=10000.
    assert_eq!(w.delays, vec![5_000, 5_000]);
    assert_eq!(ctl.session().state(), SessionState::Disconnected);
    assert_eq!(ctl.session().attempts(), 2);
    assert_eq!(
        w.count_events(|e| matches!(e, AppEvent::Booted { .. })),
        1
    );
}

#[test]
fn session_ensure_up_reports_link_down() {
    let world = World::shared();
    let mut clock = FakeClock(world.clone());
    let mut sink = RecordingSink(world.clone());
    let mut session = SessionSupervisor::new(
        MockSession(world.clone()),
        options(),
        "door/open".to_owned(),
        None,
        5_000,
    );

    let result = session.ensure_up(|| false, &mut clock, &mut sink);
    assert_eq!(result, Err(Error::LinkDown));
    assert_eq!(session.attempts(), 0);
    assert_eq!(world.borrow().connects, 0);
}

// ── Link loss collapses the session ───────────────────────────

#[test]
fn link_loss_is_seen_as_session_loss_on_next_check() {
    let world = World::shared();
    world.borrow_mut().link_up_at = Some(0);
    let mut clock = FakeClock(world.clone());
    let mut sink = RecordingSink(world.clone());
    let mut session = SessionSupervisor::new(
        MockSession(world.clone()),
        options(),
        "door/open".to_owned(),
        None,
        5_000,
    );
    session.ensure_up(|| true, &mut clock, &mut sink).unwrap();
    assert_eq!(session.state(), SessionState::Subscribed);

    world.borrow_mut().link_down_at = Some(0);
    assert!(!session.is_up(false, &mut sink));
    assert_eq!(session.state(), SessionState::Disconnected);

    let w = world.borrow();
    assert_eq!(w.disconnects, 1);
    assert_eq!(w.count_events(|e| *e == AppEvent::SessionLost), 1);
}

#[test]
fn controller_reconnects_after_an_outage() {
    let (mut ctl, world) = booted();
    {
        let mut w = world.borrow_mut();
        let back = w.now_ms + 1_000;
        w.drop_link_until(back);
    }
    let report = ctl.tick();
    assert!(report.session_up);

    let w = world.borrow();
    assert_eq!(w.connects, 2);
    assert_eq!(ctl.link().outages(), 1);
    assert_eq!(ctl.session().established(), 2);
    assert_eq!(w.count_events(|e| *e == AppEvent::SessionLost), 1);
    // The indicator blinked through the outage and is steady again.
    assert!(ctl.link().indicator_on());
    assert_eq!(ctl.link().indicator_toggles(), 5);
}

#[test]
fn session_is_rebuilt_when_the_transport_misses_an_outage() {
    let (mut ctl, world) = booted();
    {
        let mut w = world.borrow_mut();
        let back = w.now_ms + 600;
        w.drop_link_silently_until(back);
    }
    let report = ctl.tick();
    assert!(report.session_up);
    assert_eq!(ctl.session().state(), SessionState::Subscribed);

    let w = world.borrow();
    assert_eq!(ctl.link().outages(), 1);
    assert_eq!(w.disconnects, 1);
    assert_eq!(w.connects, 2);
    assert_eq!(ctl.session().established(), 2);
    assert_eq!(w.count_events(|e| *e == AppEvent::SessionLost), 1);
}

#[test]
fn broker_drop_alone_triggers_reconnect() {
    let (mut ctl, world) = booted();
    world.borrow_mut().broker_connected = false;
    let report = ctl.tick();
    assert!(report.session_up);
    assert_eq!(world.borrow().connects, 2);
    assert_eq!(ctl.link().outages(), 0);
}

#[test]
fn inbound_is_not_read_while_disconnected() {
    let world = World::shared();
    world.borrow_mut().deliver("door/open", b"x");
    let mut session = SessionSupervisor::new(
        MockSession(world.clone()),
        options(),
        "door/open".to_owned(),
        None,
        5_000,
    );
    assert!(session.next_message().is_none());
    assert_eq!(world.borrow().inbox.len(), 1);
}
