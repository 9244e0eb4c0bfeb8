//! The controller wired to the crate's own simulation adapters.
//!
//! Uses the real (host) clock, so timings are shrunk to keep runs short.

use dooropener::adapters::SimPlatform;
use dooropener::adapters::gpio::{GpioOutput, SimPin};
use dooropener::adapters::http::HttpAdapter;
use dooropener::adapters::log_sink::LogEventSink;
use dooropener::adapters::mdns::MdnsAdapter;
use dooropener::adapters::mqtt::MqttAdapter;
use dooropener::adapters::time::MonotonicClock;
use dooropener::adapters::wifi::WifiAdapter;
use dooropener::app::ports::DiscoveryPort;
use dooropener::app::router::{RESPONSE_NOT_FOUND, RESPONSE_OPEN};
use dooropener::app::service::{Controller, PlatformParts};
use dooropener::app::session::SessionState;
use dooropener::drivers::relay::RelayLine;

use crate::mock_hw::{IDENTITY, test_config};

fn sim_controller() -> Controller<SimPlatform> {
    let mut config = test_config();
    config.actuation_dwell_ms = 20;
    config.tick_interval_ms = 1;
    config.link_blink_ms = 1;
    config.session_retry_delay_ms = 1;

    let parts = PlatformParts::<SimPlatform> {
        link: WifiAdapter::new(),
        session: MqttAdapter::new(),
        http: HttpAdapter::new(),
        discovery: MdnsAdapter::new(IDENTITY),
        relay: GpioOutput::new(SimPin::default(), "relay"),
        indicator: GpioOutput::new(SimPin::default(), "status_led"),
        clock: MonotonicClock::new(),
        sink: LogEventSink::new(),
    };
    let mut ctl = Controller::new(config, IDENTITY, parts);
    ctl.boot();
    ctl
}

#[test]
fn boots_and_serves_http() {
    let mut ctl = sim_controller();
    assert_eq!(ctl.session().state(), SessionState::Subscribed);
    assert!(ctl.discovery().is_active());
    assert_eq!(ctl.http().port(), Some(9292));

    let open = ctl.http().sim_request("/open").unwrap();
    let missing = ctl.http().sim_request("/missing").unwrap();
    let report = ctl.tick();

    assert_eq!(report.http_requests, 2);
    assert_eq!(open.try_take(), Some(RESPONSE_OPEN));
    assert_eq!(missing.try_take(), Some(RESPONSE_NOT_FOUND));
    assert_eq!(ctl.guard().cycles(), 1);
    assert_eq!(ctl.guard().line(), RelayLine::DeEnergized);
    assert!(ctl.guard().last_cycle().unwrap().held_ms() >= 20);
}

#[test]
fn mqtt_command_opens_and_result_is_published() {
    let mut ctl = sim_controller();
    ctl.session().port().sim_deliver("door/open", b"open");
    ctl.tick();

    assert_eq!(ctl.guard().cycles(), 1);
    let published: Vec<_> = ctl
        .session()
        .port()
        .sim()
        .published
        .iter()
        .map(|(_, p, _)| String::from_utf8_lossy(p).into_owned())
        .collect();
    assert_eq!(published, vec!["online".to_owned(), "opened".to_owned()]);
}

#[test]
fn dropped_broker_connection_is_restored() {
    let mut ctl = sim_controller();
    ctl.session().port().sim_drop_connection();
    let report = ctl.tick();
    assert!(report.session_up);
    assert_eq!(ctl.session().port().sim().connects, 2);
    assert_eq!(ctl.session().established(), 2);
}
