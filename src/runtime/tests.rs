use core::{cell::RefCell, net::Ipv4Addr};

use embassy_time::Instant;

use crate::{
    config::{WifiPolicy, CHUNK_SIZE, NET_EVENT_QUEUE_DEPTH},
    sim::{SimNet, SimRadio, SimStack},
    types::{CredentialOptions, IpAddressing, Security, StaticIpConfig, WifiError, WifiState},
};

use super::{CallbackToken, NetEvent, NetReply, NetworkDriver, NetworkRuntime};

const SSID: &str = "duo-lab";
const PASSWORD: &str = "secret-pass";

type Runtime<'a> = NetworkRuntime<SimStack<'a>, SimRadio>;

fn at(ms: u64) -> Instant {
    Instant::from_millis(ms)
}

fn with_credential(net: &RefCell<SimNet>) -> Runtime<'_> {
    let mut radio = SimRadio::new();
    radio.add_access_point(SSID, PASSWORD, Security::Wpa2);
    let mut runtime = NetworkRuntime::new(SimStack::new(net), radio, WifiPolicy::defaults());
    runtime
        .set_credential(
            &CredentialOptions {
                ssid: Some(SSID),
                password: Some(PASSWORD),
                ..CredentialOptions::default()
            },
            None,
        )
        .expect("credential");
    runtime
}

fn connected_runtime(net: &RefCell<SimNet>) -> Runtime<'_> {
    let mut runtime = with_credential(net);
    runtime.connect(at(0), None).expect("connect");
    assert!(!runtime.idle(at(10)));
    runtime
}

#[test]
fn connect_callback_fires_once_linked() {
    let net = RefCell::new(SimNet::new());
    let mut runtime = with_credential(&net);

    runtime
        .connect(at(0), Some(CallbackToken(7)))
        .expect("connect");
    assert_eq!(runtime.poll_event(), None);

    assert!(!runtime.idle(at(10)));
    assert_eq!(
        runtime.poll_event(),
        Some(NetEvent {
            token: CallbackToken(7),
            reply: NetReply::Connected,
        })
    );
    assert_eq!(runtime.poll_event(), None);

    runtime
        .connect(at(20), Some(CallbackToken(8)))
        .expect("already connected");
    assert!(matches!(
        runtime.poll_event(),
        Some(NetEvent {
            token: CallbackToken(8),
            reply: NetReply::Connected
        })
    ));
}

#[test]
fn connect_callback_reports_failure_after_retries() {
    let net = RefCell::new(SimNet::new());
    let mut runtime = with_credential(&net);
    runtime.wifi_mut().radio_mut().access_points.clear();
    runtime.wifi_mut().radio_mut().passwords.clear();

    runtime
        .connect(at(0), Some(CallbackToken(1)))
        .expect("connect");
    for tick in 1..20u64 {
        let _ = runtime.idle(at(tick * 100));
    }

    assert_eq!(
        runtime.poll_event().map(|event| event.reply),
        Some(NetReply::ConnectFailed)
    );
    let details = runtime.details(None);
    assert!(details.connect_failed);
    assert!(!details.auto_connect);
    // One user attempt plus three automatic ones.
    assert_eq!(runtime.wifi().radio().calls.associate, 4);
}

#[test]
fn link_drop_closes_sockets_and_flags_error_once() {
    let net = RefCell::new(SimNet::new());
    net.borrow_mut().add_reachable(Ipv4Addr::new(10, 0, 0, 2), 80);
    let mut runtime = connected_runtime(&net);

    let server = runtime.create_socket(None, 8888).expect("server");
    let client = runtime
        .create_socket(Some(Ipv4Addr::new(10, 0, 0, 2)), 80)
        .expect("client");
    assert!(runtime.check_error());

    runtime.wifi_mut().radio_mut().drop_link();
    assert!(runtime.idle(at(100)));
    assert!(!runtime.is_connected(server));
    assert!(!runtime.is_connected(client));
    assert!(runtime.sockets().is_empty());
    assert_eq!(net.borrow().live_servers(), 0);
    assert_eq!(net.borrow().live_clients(), 0);

    assert!(!runtime.check_error());
    assert!(runtime.check_error());

    // Reconnects on its own: On -> Connecting -> Connected.
    assert!(runtime.idle(at(200)));
    assert!(!runtime.idle(at(300)));
    assert_eq!(runtime.wifi().state(), WifiState::Connected);
}

#[test]
fn off_drops_sockets_and_cancels_pending_connect() {
    let net = RefCell::new(SimNet::new());
    let mut runtime = connected_runtime(&net);
    let _server = runtime.create_socket(None, 8888).expect("server");

    runtime.off(Some(CallbackToken(3)));
    assert!(runtime.sockets().is_empty());
    assert_eq!(runtime.wifi().state(), WifiState::Off);
    // User teardown is not a link error.
    assert!(runtime.check_error());
    assert_eq!(
        runtime.poll_event().map(|event| event.reply),
        Some(NetReply::Done)
    );

    let mut radio_stalled = with_credential(&net);
    radio_stalled.wifi_mut().radio_mut().associate_stalls = true;
    radio_stalled
        .connect(at(0), Some(CallbackToken(4)))
        .expect("connect");
    radio_stalled.disconnect(None);
    assert_eq!(
        radio_stalled.poll_event(),
        Some(NetEvent {
            token: CallbackToken(4),
            reply: NetReply::ConnectFailed,
        })
    );
}

#[test]
fn socket_traffic_through_the_driver_surface() {
    let net = RefCell::new(SimNet::new());
    let mut runtime = connected_runtime(&net);
    assert_eq!(runtime.chunk_size(), CHUNK_SIZE);
    assert_eq!(runtime.chunk_size(), 268);

    let server = runtime.create_socket(None, 8888).expect("server");
    assert_eq!(server.get(), 1);
    assert_eq!(runtime.accept(server), Ok(None));

    let peer = net.borrow_mut().peer_connect(8888).expect("peer");
    let client = runtime.accept(server).expect("accept").expect("client");
    assert_eq!(client.get(), 2);

    let _ = net.borrow_mut().peer_send(peer, b"ping");
    let mut buf = [0u8; 64];
    assert_eq!(runtime.recv(client, &mut buf), 4);
    assert_eq!(runtime.send(client, b"pong"), Ok(4));

    runtime.close_socket(client);
    runtime.close_socket(server);
    assert!(runtime.sockets().is_empty());
}

#[test]
fn host_lookup_goes_through_the_radio() {
    let net = RefCell::new(SimNet::new());
    let mut runtime = with_credential(&net);
    runtime
        .wifi_mut()
        .radio_mut()
        .add_host("duo.local", Ipv4Addr::new(192, 168, 1, 9));
    assert_eq!(runtime.get_host_by_name("duo.local"), None);

    runtime.connect(at(0), None).expect("connect");
    let _ = runtime.idle(at(10));
    assert_eq!(
        runtime.get_host_by_name("duo.local"),
        Some(Ipv4Addr::new(192, 168, 1, 9))
    );
    assert_eq!(
        runtime.resolve("duo.local", Some(CallbackToken(2))),
        Ok(Some(Ipv4Addr::new(192, 168, 1, 9)))
    );
    assert_eq!(
        runtime.poll_event().map(|event| event.reply),
        Some(NetReply::Resolved(Some(Ipv4Addr::new(192, 168, 1, 9))))
    );
}

#[test]
fn precondition_errors_post_nothing() {
    let net = RefCell::new(SimNet::new());
    let mut runtime = NetworkRuntime::new(
        SimStack::new(&net),
        SimRadio::new(),
        WifiPolicy::defaults(),
    );
    assert_eq!(
        runtime.connect(at(0), Some(CallbackToken(1))),
        Err(WifiError::NoCredentials)
    );
    assert_eq!(
        runtime.scan(Some(CallbackToken(2))),
        Err(WifiError::NotReady)
    );
    assert_eq!(
        runtime.ping(Ipv4Addr::new(8, 8, 8, 8), 4, Some(CallbackToken(3))),
        Err(WifiError::NotReady)
    );
    assert_eq!(
        runtime.set_credential(
            &CredentialOptions {
                ssid: Some("home"),
                sec: Some("BOGUS"),
                ..CredentialOptions::default()
            },
            Some(CallbackToken(4)),
        ),
        Err(WifiError::InvalidArgument)
    );
    assert_eq!(runtime.pending_events(), 0);
}

#[test]
fn scan_and_details_replies_are_queued_in_order() {
    let net = RefCell::new(SimNet::new());
    let mut runtime = with_credential(&net);
    runtime.on(None).expect("on");

    assert_eq!(runtime.scan(Some(CallbackToken(10))), Ok(1));
    let details = runtime.details(Some(CallbackToken(11)));
    assert_eq!(details.state, WifiState::On);

    match runtime.poll_event() {
        Some(NetEvent {
            token: CallbackToken(10),
            reply: NetReply::Scan(results),
        }) => assert_eq!(results[0].ssid.as_str(), SSID),
        other => panic!("unexpected event {:?}", other),
    }
    assert!(matches!(
        runtime.poll_event(),
        Some(NetEvent {
            token: CallbackToken(11),
            reply: NetReply::Details(_)
        })
    ));
}

#[test]
fn full_event_queue_drops_new_replies() {
    let net = RefCell::new(SimNet::new());
    let mut runtime = with_credential(&net);
    for token in 0..(NET_EVENT_QUEUE_DEPTH as u32 + 2) {
        let _ = runtime.details(Some(CallbackToken(token)));
    }
    assert_eq!(runtime.pending_events(), NET_EVENT_QUEUE_DEPTH);
    assert_eq!(
        runtime.poll_event().map(|event| event.token),
        Some(CallbackToken(0))
    );
}

#[test]
fn latched_failure_refuses_power_on() {
    let net = RefCell::new(SimNet::new());
    let mut runtime = with_credential(&net);
    runtime.wifi_mut().radio_mut().associate_stalls = true;
    runtime.connect(at(0), None).expect("connect");
    let _ = runtime.idle(at(60_000));
    assert!(runtime.wifi().flags().connect_failed);

    runtime.set_auto_connect(false).expect("disarm");
    assert_eq!(runtime.on(Some(CallbackToken(5))), Err(WifiError::NotReady));
    assert_eq!(runtime.pending_events(), 0);
}

#[test]
fn spent_retries_refuse_auto_connect() {
    let net = RefCell::new(SimNet::new());
    let mut runtime = with_credential(&net);
    runtime.wifi_mut().radio_mut().access_points.clear();
    runtime.wifi_mut().radio_mut().passwords.clear();
    runtime.set_auto_connect(true).expect("arm");
    for tick in 0..10u64 {
        let _ = runtime.idle(at(tick * 100));
    }
    assert_eq!(runtime.wifi().radio().calls.associate, 3);

    assert_eq!(runtime.set_auto_connect(true), Err(WifiError::NotReady));
    assert!(runtime.idle(at(2_000)));
    assert_eq!(runtime.wifi().radio().calls.associate, 3);
    assert_eq!(runtime.details(None).retry_count, 3);
}

#[test]
fn stored_credentials_reply_carries_no_password() {
    let net = RefCell::new(SimNet::new());
    let mut runtime = with_credential(&net);

    let stored = runtime.credentials(Some(CallbackToken(21)));
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].ssid.as_str(), SSID);
    match runtime.poll_event() {
        Some(NetEvent {
            token: CallbackToken(21),
            reply: NetReply::Credentials(listed),
        }) => assert_eq!(listed, stored),
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn listening_and_addressing_controls_reply_done() {
    let net = RefCell::new(SimNet::new());
    let mut runtime = with_credential(&net);
    assert_eq!(
        runtime.start_listen(Some(CallbackToken(30))),
        Err(WifiError::NotReady)
    );
    assert_eq!(
        runtime.use_static_ip(Some(CallbackToken(31))),
        Err(WifiError::InvalidArgument)
    );
    assert_eq!(runtime.pending_events(), 0);

    runtime.on(None).expect("on");
    runtime.start_listen(Some(CallbackToken(32))).expect("listen");
    assert!(runtime.is_listening());
    runtime.stop_listen(None);
    assert!(!runtime.is_listening());

    let config = StaticIpConfig::new(
        Ipv4Addr::new(192, 168, 1, 60),
        Ipv4Addr::new(255, 255, 255, 0),
        Ipv4Addr::new(192, 168, 1, 1),
        Ipv4Addr::new(192, 168, 1, 1),
    )
    .expect("static config");
    runtime.set_static_ip(&config, None);
    runtime.use_static_ip(Some(CallbackToken(33))).expect("static");
    assert_eq!(runtime.details(None).addressing, IpAddressing::Static);

    let replies: Vec<_> = core::iter::from_fn(|| runtime.poll_event())
        .map(|event| (event.token, event.reply))
        .collect();
    assert_eq!(
        replies,
        vec![
            (CallbackToken(32), NetReply::Done),
            (CallbackToken(33), NetReply::Done),
        ]
    );

    runtime.connect(at(0), None).expect("connect");
    let _ = runtime.idle(at(10));
    assert_eq!(
        runtime.ip_config().map(|ip| ip.local_ip),
        Ok(Ipv4Addr::new(192, 168, 1, 60))
    );
}
