use core::net::Ipv4Addr;

use embassy_time::{Duration, Instant};

use crate::{
    config::{WifiPolicy, PING_TRIES_MAX},
    sim::SimRadio,
    types::{
        Cipher, Credential, CredentialOptions, IpAddressing, ScanResults, Security,
        StaticIpConfig, WifiError, WifiState,
    },
};

use super::{DropReason, WifiApplyStatus, WifiManager};

const SSID: &str = "duo-lab";
const PASSWORD: &str = "secret-pass";

fn at(ms: u64) -> Instant {
    Instant::from_millis(ms)
}

fn radio_with_ap() -> SimRadio {
    let mut radio = SimRadio::new();
    radio.add_access_point(SSID, PASSWORD, Security::Wpa2);
    radio
}

fn manager_with_credential(radio: SimRadio) -> WifiManager<SimRadio> {
    let mut wifi = WifiManager::new(radio, WifiPolicy::defaults());
    wifi.set_credential(&CredentialOptions {
        ssid: Some(SSID),
        password: Some(PASSWORD),
        ..CredentialOptions::default()
    })
    .expect("credential");
    wifi
}

fn connected_manager() -> WifiManager<SimRadio> {
    let mut wifi = manager_with_credential(radio_with_ap());
    let _ = wifi.connect(at(0)).expect("connect");
    let step = wifi.idle(at(10));
    assert!(step.connected_now);
    wifi
}

#[test]
fn on_off_round_trip() {
    let mut wifi = WifiManager::new(SimRadio::new(), WifiPolicy::defaults());
    assert_eq!(wifi.state(), WifiState::Off);

    let step = wifi.on();
    assert!(matches!(step.status, WifiApplyStatus::Applied));
    assert_eq!(step.state, WifiState::On);
    assert!(wifi.radio().powered);

    let again = wifi.on();
    assert!(matches!(again.status, WifiApplyStatus::Unchanged));
    assert_eq!(wifi.radio().calls.power_on, 1);

    let off = wifi.off();
    assert_eq!(off.state, WifiState::Off);
    assert_eq!(off.drop_sockets, Some(DropReason::RadioOff));
    assert!(!wifi.radio().powered);
}

#[test]
fn connect_without_credentials_is_refused() {
    let mut wifi = WifiManager::new(radio_with_ap(), WifiPolicy::defaults());
    assert_eq!(wifi.connect(at(0)), Err(WifiError::NoCredentials));
    assert_eq!(wifi.state(), WifiState::Off);
    assert_eq!(wifi.radio().calls.associate, 0);
}

#[test]
fn connect_reaches_connected_and_runs_post_connect_once() {
    let mut wifi = manager_with_credential(radio_with_ap());
    let step = wifi.connect(at(0)).expect("connect");
    assert_eq!(step.state, WifiState::Connecting);
    assert!(step.more_pending());
    assert!(wifi.radio().powered);

    let step = wifi.idle(at(20));
    assert!(step.connected_now);
    assert!(!step.more_pending());
    assert_eq!(step.state, WifiState::Connected);

    let steady = wifi.idle(at(40));
    assert!(!steady.connected_now);
    assert!(matches!(steady.status, WifiApplyStatus::Unchanged));
    assert_eq!(wifi.radio().calls.post_connect, 1);

    let flags = wifi.flags();
    assert!(!flags.auto_connect);
    assert!(!flags.connect_failed);
    assert_eq!(flags.retry_count, 0);
    assert!(wifi.is_ready());
}

#[test]
fn automatic_retries_stop_after_three_attempts() {
    // Credential stored but no AP in range.
    let mut wifi = manager_with_credential(SimRadio::new());
    let _ = wifi.set_auto_connect(true);

    let mut failures = 0;
    for tick in 0..20u64 {
        if wifi.idle(at(tick * 100)).attempt_failed {
            failures += 1;
        }
    }

    assert_eq!(failures, 3);
    assert_eq!(wifi.radio().calls.associate, 3);
    assert_eq!(wifi.state(), WifiState::Off);
    assert!(!wifi.radio().powered);
    let flags = wifi.flags();
    assert!(flags.connect_failed);
    assert!(!flags.auto_connect);
    assert_eq!(flags.retry_count, 3);

    let refused = wifi.on();
    assert!(matches!(refused.status, WifiApplyStatus::Rejected));
    assert_eq!(wifi.state(), WifiState::Off);
}

#[test]
fn spent_retries_refuse_auto_connect_until_connect() {
    let mut wifi = manager_with_credential(SimRadio::new());
    let _ = wifi.set_auto_connect(true);
    for tick in 0..10u64 {
        let _ = wifi.idle(at(tick * 100));
    }
    assert_eq!(wifi.radio().calls.associate, 3);
    assert!(matches!(wifi.on().status, WifiApplyStatus::Rejected));

    let refused = wifi.set_auto_connect(true);
    assert!(matches!(refused.status, WifiApplyStatus::Rejected));
    assert!(!wifi.flags().auto_connect);
    for tick in 10..20u64 {
        assert_eq!(wifi.idle(at(tick * 100)).state, WifiState::Off);
    }
    assert_eq!(wifi.radio().calls.associate, 3);
    assert_eq!(wifi.radio().calls.power_on, 3);
    assert!(!wifi.radio().powered);
    assert_eq!(wifi.details().retry_count, 3);

    // Disarming is always allowed.
    assert!(!matches!(
        wifi.set_auto_connect(false).status,
        WifiApplyStatus::Rejected
    ));
}

#[test]
fn cleared_credentials_restore_the_full_retry_budget() {
    let mut wifi = manager_with_credential(SimRadio::new());
    let _ = wifi.set_auto_connect(true);
    for tick in 0..10u64 {
        let _ = wifi.idle(at(tick * 100));
    }
    assert!(wifi.clear_credentials());
    assert_eq!(wifi.flags().retry_count, 0);

    wifi.set_credential(&CredentialOptions {
        ssid: Some(SSID),
        password: Some(PASSWORD),
        ..CredentialOptions::default()
    })
    .expect("credential");
    assert!(matches!(
        wifi.set_auto_connect(true).status,
        WifiApplyStatus::Applied
    ));
    for tick in 10..30u64 {
        let _ = wifi.idle(at(tick * 100));
    }
    assert_eq!(wifi.radio().calls.associate, 6);
    assert_eq!(wifi.flags().retry_count, 3);
}

#[test]
fn user_connect_resets_the_retry_bound() {
    let mut wifi = manager_with_credential(SimRadio::new());
    let _ = wifi.set_auto_connect(true);
    for tick in 0..10u64 {
        let _ = wifi.idle(at(tick * 100));
    }
    assert_eq!(wifi.radio().calls.associate, 3);

    wifi.radio_mut()
        .add_access_point(SSID, PASSWORD, Security::Wpa2);
    let step = wifi.connect(at(2_000)).expect("connect");
    assert_eq!(step.state, WifiState::Connecting);
    let flags = wifi.flags();
    assert!(!flags.connect_failed);
    assert!(flags.auto_connect);
    assert_eq!(flags.retry_count, 0);

    assert!(wifi.idle(at(2_100)).connected_now);
    assert_eq!(wifi.radio().calls.associate, 4);
}

#[test]
fn pending_association_times_out() {
    let mut radio = radio_with_ap();
    radio.associate_stalls = true;
    let mut wifi = manager_with_credential(radio);

    let _ = wifi.connect(at(0)).expect("connect");
    let waiting = wifi.idle(at(5_000));
    assert_eq!(waiting.state, WifiState::Connecting);
    assert!(!waiting.attempt_failed);

    let timeout = WifiPolicy::defaults().associate_timeout();
    let failed = wifi.idle(at(0) + timeout);
    assert!(failed.attempt_failed);
    assert_eq!(failed.state, WifiState::Off);
    assert!(wifi.flags().connect_failed);
}

#[test]
fn link_drop_tears_down_sockets_and_reconnects() {
    let mut wifi = connected_manager();

    wifi.radio_mut().drop_link();
    let dropped = wifi.idle(at(100));
    assert_eq!(dropped.drop_sockets, Some(DropReason::LinkLost));
    assert_eq!(dropped.state, WifiState::On);
    assert!(wifi.flags().auto_connect);

    let retry = wifi.idle(at(200));
    assert_eq!(retry.state, WifiState::Connecting);
    assert_eq!(wifi.flags().retry_count, 1);

    let back = wifi.idle(at(300));
    assert!(back.connected_now);
    assert_eq!(wifi.radio().calls.associate, 2);
    assert_eq!(wifi.radio().calls.post_connect, 2);
}

#[test]
fn link_drop_without_reconnect_policy_stays_on() {
    let policy = WifiPolicy {
        reconnect_on_drop: false,
        ..WifiPolicy::defaults()
    };
    let mut wifi = WifiManager::new(radio_with_ap(), policy);
    wifi.store_credential(
        &Credential::new(SSID, PASSWORD, Security::Wpa2, Default::default())
            .expect("credential"),
    )
    .expect("stored");
    let _ = wifi.connect(at(0)).expect("connect");
    let _ = wifi.idle(at(10));

    wifi.radio_mut().drop_link();
    let dropped = wifi.idle(at(20));
    assert_eq!(dropped.state, WifiState::On);
    for tick in 3..10u64 {
        assert_eq!(wifi.idle(at(tick * 10)).state, WifiState::On);
    }
    assert_eq!(wifi.radio().calls.associate, 1);
}

#[test]
fn disconnect_demotes_to_on_and_clears_auto_connect() {
    let mut wifi = connected_manager();
    let _ = wifi.set_auto_connect(true);

    let step = wifi.disconnect();
    assert_eq!(step.state, WifiState::On);
    assert_eq!(step.drop_sockets, Some(DropReason::Disconnect));
    assert_eq!(wifi.radio().calls.disassociate, 1);
    assert!(!wifi.flags().auto_connect);
    assert!(wifi.radio().powered);

    let idle = wifi.idle(at(500));
    assert_eq!(idle.state, WifiState::On);
}

#[test]
fn auto_connect_without_credentials_disarms() {
    let mut wifi = WifiManager::new(radio_with_ap(), WifiPolicy::defaults());
    let _ = wifi.set_auto_connect(true);
    assert!(wifi.flags().auto_connect);

    let step = wifi.idle(at(0));
    assert_eq!(step.state, WifiState::Off);
    assert!(!wifi.flags().auto_connect);
    assert_eq!(wifi.radio().calls.associate, 0);
}

#[test]
fn boot_policy_arms_auto_connect() {
    let policy = WifiPolicy {
        auto_connect_on_boot: true,
        ..WifiPolicy::defaults()
    };
    let mut radio = radio_with_ap();
    radio.credential =
        Credential::new(SSID, PASSWORD, Security::Wpa2, Default::default()).ok();
    let mut wifi = WifiManager::new(radio, policy);
    assert!(wifi.flags().auto_connect);

    let _ = wifi.idle(at(0));
    assert!(wifi.idle(at(10)).connected_now);
}

#[test]
fn invalid_credential_keeps_the_previous_one() {
    let mut wifi = manager_with_credential(radio_with_ap());
    let result = wifi.set_credential(&CredentialOptions {
        ssid: Some("other"),
        password: Some("whatever-pass"),
        sec: Some("BOGUS"),
        cipher: None,
    });
    assert_eq!(result, Err(WifiError::InvalidArgument));

    let stored = wifi.radio().credential.as_ref().expect("still stored");
    assert_eq!(stored.ssid.as_str(), SSID);
    assert_eq!(stored.security, Security::Wpa2);
}

#[test]
fn clear_credentials_releases_the_latch() {
    let mut wifi = manager_with_credential(SimRadio::new());
    let _ = wifi.connect(at(0)).expect("connect");
    let _ = wifi.idle(at(10));
    assert!(wifi.flags().connect_failed);

    assert!(wifi.clear_credentials());
    assert!(!wifi.flags().connect_failed);
    assert!(!wifi.flags().auto_connect);
    assert!(!wifi.details().has_credentials);
    assert!(!wifi.clear_credentials());

    assert_eq!(wifi.on().state, WifiState::On);
}

#[test]
fn queries_before_connected_report_not_ready() {
    let mut wifi = manager_with_credential(radio_with_ap());
    let mut results = ScanResults::new();
    assert_eq!(wifi.scan(&mut results), Err(WifiError::NotReady));
    assert_eq!(wifi.ip_config(), Err(WifiError::NotReady));

    let _ = wifi.on();
    assert_eq!(wifi.scan(&mut results), Ok(1));
    assert_eq!(results[0].ssid.as_str(), SSID);
    assert_eq!(
        wifi.ping(Ipv4Addr::new(192, 168, 1, 1), 3),
        Err(WifiError::NotReady)
    );
    assert_eq!(wifi.resolve("example.com"), Err(WifiError::NotReady));
}

#[test]
fn connected_queries_answer() {
    let mut wifi = connected_manager();
    let gateway = Ipv4Addr::new(192, 168, 1, 1);
    let _ = wifi.radio_mut().pingable.push(gateway);
    wifi.radio_mut()
        .add_host("duo.local", Ipv4Addr::new(192, 168, 1, 77));

    let ip = wifi.ip_config().expect("ip config");
    assert_eq!(ip.gateway, gateway);
    assert_eq!(wifi.ping(gateway, 0), Ok(1));
    assert_eq!(wifi.ping(gateway, 200), Ok(u32::from(PING_TRIES_MAX)));
    assert_eq!(
        wifi.resolve("DUO.local"),
        Ok(Some(Ipv4Addr::new(192, 168, 1, 77)))
    );
    assert_eq!(wifi.resolve("missing.local"), Ok(None));
    assert_eq!(wifi.resolve(""), Err(WifiError::InvalidArgument));

    let details = wifi.details();
    assert_eq!(details.state, WifiState::Connected);
    assert_eq!(details.ssid.as_deref(), Some(SSID));
    assert_eq!(details.rssi, Some(-52));
    assert_eq!(details.mac, wifi.radio().mac);
    assert_eq!(details.bssid, Some(wifi.radio().access_points[0].bssid));
}

#[test]
fn details_answer_in_every_state() {
    let wifi = WifiManager::new(SimRadio::new(), WifiPolicy::defaults());
    let details = wifi.details();
    assert_eq!(details.state, WifiState::Off);
    assert_eq!(details.ssid, None);
    assert_eq!(details.rssi, None);
    assert!(!details.has_credentials);
    assert_eq!(details.retry_count, 0);
    assert_eq!(details.bssid, None);
    assert!(!details.listening);
    assert_eq!(details.addressing, IpAddressing::Dynamic);
}

#[test]
fn restarted_connect_keeps_the_timeout_window_fresh() {
    let mut radio = radio_with_ap();
    radio.associate_stalls = true;
    let mut wifi = manager_with_credential(radio);

    let _ = wifi.connect(at(0)).expect("connect");
    let _ = wifi.connect(at(8_000)).expect("reconnect");
    let step = wifi.idle(at(0) + Duration::from_millis(12_000));
    assert_eq!(step.state, WifiState::Connecting);
    assert_eq!(wifi.radio().calls.associate, 2);
}

#[test]
fn listening_needs_power_and_ends_with_power_off() {
    let mut wifi = WifiManager::new(radio_with_ap(), WifiPolicy::defaults());
    assert_eq!(wifi.start_listen(), Err(WifiError::NotReady));

    let _ = wifi.on();
    wifi.start_listen().expect("listen");
    assert!(wifi.is_listening());
    assert!(wifi.details().listening);

    wifi.stop_listen();
    assert!(!wifi.is_listening());

    wifi.start_listen().expect("listen again");
    let _ = wifi.off();
    assert!(!wifi.is_listening());
}

#[test]
fn provisioned_credential_while_listening_lets_auto_connect_join() {
    let mut wifi = WifiManager::new(radio_with_ap(), WifiPolicy::defaults());
    let _ = wifi.on();
    wifi.start_listen().expect("listen");
    let _ = wifi.set_auto_connect(true);

    // No credential yet, but provisioning keeps the flag armed.
    assert_eq!(wifi.idle(at(0)).state, WifiState::On);
    assert!(wifi.flags().auto_connect);
    assert_eq!(wifi.radio().calls.associate, 0);

    let credential = Credential::new(SSID, PASSWORD, Security::Wpa2, Cipher::Aes)
        .expect("credential");
    assert!(wifi.radio_mut().provision(credential));
    assert!(!wifi.is_listening());

    assert_eq!(wifi.idle(at(10)).state, WifiState::Connecting);
    assert!(wifi.idle(at(20)).connected_now);
}

#[test]
fn connect_leaves_listening_mode() {
    let mut wifi = manager_with_credential(radio_with_ap());
    let _ = wifi.on();
    wifi.start_listen().expect("listen");

    let _ = wifi.connect(at(0)).expect("connect");
    assert!(!wifi.is_listening());
    assert!(wifi.idle(at(10)).connected_now);
}

#[test]
fn static_ip_is_used_once_selected() {
    let mut wifi = manager_with_credential(radio_with_ap());
    assert_eq!(wifi.use_static_ip(), Err(WifiError::InvalidArgument));

    let config = StaticIpConfig::new(
        Ipv4Addr::new(192, 168, 1, 200),
        Ipv4Addr::new(255, 255, 255, 0),
        Ipv4Addr::new(192, 168, 1, 1),
        Ipv4Addr::new(9, 9, 9, 9),
    )
    .expect("static config");
    wifi.set_static_ip(&config);
    assert_eq!(wifi.details().addressing, IpAddressing::Dynamic);
    wifi.use_static_ip().expect("static");
    assert_eq!(wifi.details().addressing, IpAddressing::Static);

    let _ = wifi.connect(at(0)).expect("connect");
    let _ = wifi.idle(at(10));
    let ip = wifi.ip_config().expect("ip config");
    assert_eq!(ip.local_ip, Ipv4Addr::new(192, 168, 1, 200));
    assert_eq!(ip.dns_server, Ipv4Addr::new(9, 9, 9, 9));
    assert_eq!(ip.dhcp_server, Ipv4Addr::UNSPECIFIED);

    wifi.use_dynamic_ip();
    assert_eq!(wifi.details().addressing, IpAddressing::Dynamic);
    assert_eq!(wifi.ip_config().expect("ip config").local_ip, wifi.radio().ip.local_ip);
}

#[test]
fn stored_credentials_are_listed_without_passwords() {
    let mut wifi = WifiManager::new(radio_with_ap(), WifiPolicy::defaults());
    assert!(wifi.credentials().is_empty());

    wifi.set_credential(&CredentialOptions {
        ssid: Some(SSID),
        password: Some(PASSWORD),
        sec: Some("WPA2"),
        cipher: Some("AES"),
    })
    .expect("credential");
    let stored = wifi.credentials();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].ssid.as_str(), SSID);
    assert_eq!(stored[0].security, Security::Wpa2);
    assert_eq!(stored[0].cipher, Cipher::Aes);

    let _ = wifi.clear_credentials();
    assert!(wifi.credentials().is_empty());
}
