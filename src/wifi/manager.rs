use core::net::Ipv4Addr;

use embassy_time::Instant;
use log::{debug, info, warn};

use crate::{
    config::{WifiPolicy, PING_TRIES_MAX},
    stack::{HostResolver, WifiRadio},
    telemetry,
    types::{
        Credential, CredentialOptions, IpAddressing, IpConfig, ScanResults, StaticIpConfig,
        StoredCredentials, WifiDetails, WifiError, WifiState,
    },
};

use super::{
    actions::{DropReason, RadioAction, WifiApplyStatus},
    engine::{WifiEngine, WifiOutput},
    events::{TickInput, WifiInput},
    machine::WifiFlags,
};

/// Result of one `idle` tick or control call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WifiStep {
    pub status: WifiApplyStatus,
    pub state: WifiState,
    /// Sockets must be torn down before any socket work this tick.
    pub drop_sockets: Option<DropReason>,
    pub connected_now: bool,
    pub attempt_failed: bool,
}

impl WifiStep {
    /// The connection machine still has work to do on later ticks.
    pub fn more_pending(&self) -> bool {
        self.state != WifiState::Connected
    }
}

/// Owns the radio and drives it from the connection machine.
pub struct WifiManager<R: WifiRadio> {
    radio: R,
    engine: WifiEngine,
}

impl<R: WifiRadio> WifiManager<R> {
    pub fn new(radio: R, policy: WifiPolicy) -> Self {
        let policy = policy.sanitized();
        if policy.auto_connect_on_boot {
            info!("wifi: auto connect armed at boot");
        }
        Self {
            radio,
            engine: WifiEngine::new(policy),
        }
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn state(&self) -> WifiState {
        self.engine.state()
    }

    pub fn flags(&self) -> WifiFlags {
        self.engine.flags()
    }

    pub fn policy(&self) -> WifiPolicy {
        self.engine.policy()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == WifiState::Connected
    }

    /// Powers the radio unless a failed automatic attempt is latched.
    pub fn on(&mut self) -> WifiStep {
        let step = self.dispatch(WifiInput::PowerOn);
        if step.status == WifiApplyStatus::Rejected {
            info!("wifi: power on refused reason=connect_failed");
        }
        step
    }

    pub fn off(&mut self) -> WifiStep {
        self.dispatch(WifiInput::PowerOff)
    }

    pub fn disconnect(&mut self) -> WifiStep {
        self.dispatch(WifiInput::Disconnect)
    }

    pub fn connect(&mut self, now: Instant) -> Result<WifiStep, WifiError> {
        if !self.radio.has_credentials() {
            warn!("wifi: connect refused reason=no_credentials");
            return Err(WifiError::NoCredentials);
        }
        if self.radio.is_listening() {
            self.radio.stop_listen();
            info!("wifi: listening stopped reason=connect");
        }
        Ok(self.dispatch(WifiInput::Connect { now }))
    }

    /// One non-blocking tick of the connection machine.
    pub fn idle(&mut self, now: Instant) -> WifiStep {
        let association = if self.state() == WifiState::Connecting {
            Some(self.radio.poll_association())
        } else {
            None
        };
        let tick = TickInput {
            now,
            has_credentials: self.radio.has_credentials(),
            association,
            link_up: self.radio.link_up(),
            listening: self.radio.is_listening(),
        };
        self.dispatch(WifiInput::Tick(tick))
    }

    /// Refused once the retry bound is spent; `connect` re-arms instead.
    pub fn set_auto_connect(&mut self, enabled: bool) -> WifiStep {
        let step = self.dispatch(WifiInput::SetAutoConnect(enabled));
        if step.status == WifiApplyStatus::Rejected {
            info!("wifi: auto connect refused reason=retries_exhausted");
        }
        step
    }

    /// Validates then stores; the previous credential survives any error.
    pub fn set_credential(&mut self, options: &CredentialOptions<'_>) -> Result<(), WifiError> {
        let credential = Credential::from_options(options).inspect_err(|err| {
            warn!("wifi: credential rejected err={}", err);
        })?;
        self.store_credential(&credential)
    }

    pub fn store_credential(&mut self, credential: &Credential) -> Result<(), WifiError> {
        self.radio.set_credentials(credential).map_err(|err| {
            warn!("wifi: credential store failed err={:?}", err);
            WifiError::Stack
        })?;
        info!(
            "wifi: credential stored ssid={} security={}",
            credential.ssid,
            credential.security.as_str()
        );
        Ok(())
    }

    /// Returns whether a credential was present.
    pub fn clear_credentials(&mut self) -> bool {
        let cleared = self.radio.clear_credentials();
        let _ = self.dispatch(WifiInput::CredentialsCleared);
        info!("wifi: credentials cleared present={}", cleared);
        cleared
    }

    /// Remembered networks without passwords. Answers in every state.
    pub fn credentials(&self) -> StoredCredentials {
        let mut out = StoredCredentials::new();
        self.radio.credentials(&mut out);
        out
    }

    /// Enters provisioning mode. Automatic connection waits while listening.
    pub fn start_listen(&mut self) -> Result<(), WifiError> {
        if !self.state().radio_powered() {
            return Err(WifiError::NotReady);
        }
        if !self.radio.is_listening() {
            self.radio.start_listen();
            info!("wifi: listening started");
        }
        Ok(())
    }

    pub fn stop_listen(&mut self) {
        if self.radio.is_listening() {
            self.radio.stop_listen();
            info!("wifi: listening stopped");
        }
    }

    pub fn is_listening(&self) -> bool {
        self.radio.is_listening()
    }

    pub fn set_static_ip(&mut self, config: &StaticIpConfig) {
        self.radio.set_static_ip(config);
        info!(
            "wifi: static ip stored ip={} mask={} gateway={}",
            config.local_ip, config.subnet_mask, config.gateway
        );
    }

    /// Takes effect on the next association.
    pub fn use_static_ip(&mut self) -> Result<(), WifiError> {
        if self.radio.static_ip().is_none() {
            warn!("wifi: static ip refused reason=not_configured");
            return Err(WifiError::InvalidArgument);
        }
        self.radio.use_static_ip();
        info!("wifi: addressing={}", IpAddressing::Static.as_str());
        Ok(())
    }

    pub fn use_dynamic_ip(&mut self) {
        self.radio.use_dynamic_ip();
        info!("wifi: addressing={}", IpAddressing::Dynamic.as_str());
    }

    pub fn details(&self) -> WifiDetails {
        let flags = self.flags();
        let state = self.state();
        let connected = state == WifiState::Connected;
        WifiDetails {
            state,
            auto_connect: flags.auto_connect,
            connect_failed: flags.connect_failed,
            retry_count: flags.retry_count,
            has_credentials: self.radio.has_credentials(),
            listening: self.radio.is_listening(),
            addressing: self.radio.addressing(),
            ssid: if connected { self.radio.ssid() } else { None },
            bssid: if connected { self.radio.bssid() } else { None },
            rssi: connected.then(|| self.radio.rssi()),
            mac: self.radio.mac_address(),
        }
    }

    pub fn ip_config(&self) -> Result<IpConfig, WifiError> {
        if !self.is_ready() {
            return Err(WifiError::NotReady);
        }
        Ok(self.radio.ip_config())
    }

    pub fn scan(&mut self, results: &mut ScanResults) -> Result<usize, WifiError> {
        if !self.state().radio_powered() {
            return Err(WifiError::NotReady);
        }
        self.radio.scan(results).map_err(|err| {
            warn!("wifi: scan failed err={:?}", err);
            WifiError::Stack
        })?;
        debug!("wifi: scan found={}", results.len());
        Ok(results.len())
    }

    pub fn ping(&mut self, addr: Ipv4Addr, tries: u8) -> Result<u32, WifiError> {
        if !self.is_ready() {
            return Err(WifiError::NotReady);
        }
        let tries = tries.clamp(1, PING_TRIES_MAX);
        let replies = self.radio.ping(addr, tries);
        debug!("wifi: ping addr={} tries={} replies={}", addr, tries, replies);
        Ok(replies)
    }

    pub fn resolve(&mut self, hostname: &str) -> Result<Option<Ipv4Addr>, WifiError> {
        if !self.is_ready() {
            return Err(WifiError::NotReady);
        }
        if hostname.is_empty() {
            return Err(WifiError::InvalidArgument);
        }
        Ok(self.radio.resolve(hostname))
    }

    fn dispatch(&mut self, input: WifiInput) -> WifiStep {
        let output = self.engine.apply(input);
        self.perform(&output);
        self.record(&output);
        WifiStep {
            status: output.status,
            state: output.after,
            drop_sockets: output.actions.drop_reason(),
            connected_now: output.connected_now(),
            attempt_failed: output.attempt_failed(),
        }
    }

    fn perform(&mut self, output: &WifiOutput) {
        for action in output.actions.iter() {
            match action {
                RadioAction::PowerOn => self.radio.power_on(),
                RadioAction::PowerOff => self.radio.power_off(),
                RadioAction::Associate => {
                    telemetry::record_wifi_connect_attempt();
                    info!(
                        "wifi: associating attempt={} auto={}",
                        output.flags.retry_count, output.flags.auto_connect
                    );
                    self.radio.begin_associate();
                }
                RadioAction::Disassociate => self.radio.disassociate(),
                RadioAction::PostConnect => self.radio.post_connect(),
                // Socket teardown belongs to the runtime that owns the pools.
                RadioAction::DropSockets(_) => {}
            }
        }
    }

    fn record(&self, output: &WifiOutput) {
        if output.before != output.after {
            info!(
                "wifi: state {} -> {}",
                output.before.as_str(),
                output.after.as_str()
            );
        }
        if output.connected_now() {
            telemetry::record_wifi_connect_success();
        }
        if output.attempt_failed() {
            telemetry::record_wifi_connect_failure();
            warn!(
                "wifi: connect attempt failed retry_count={} auto={}",
                output.flags.retry_count, output.flags.auto_connect
            );
        }
        if output.retries_exhausted() {
            telemetry::record_wifi_retries_exhausted();
            warn!(
                "wifi: retries exhausted max={}",
                self.policy().connect_retry_max
            );
        }
        match output.actions.drop_reason() {
            Some(DropReason::LinkLost) => {
                telemetry::record_wifi_link_drop();
                warn!("wifi: link lost");
            }
            Some(_) if output.before == WifiState::Connected => {
                telemetry::record_wifi_link_closed();
            }
            _ => {}
        }
    }
}

impl<R: WifiRadio> HostResolver for WifiManager<R> {
    fn resolve_host(&mut self, hostname: &str) -> Option<Ipv4Addr> {
        self.resolve(hostname).ok().flatten()
    }
}
