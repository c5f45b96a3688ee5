//! The object the interpreter's main loop holds: WiFi manager and socket
//! multiplexer behind one `idle` entry point.

mod driver;
mod events;
#[cfg(test)]
mod tests;

use core::net::Ipv4Addr;

use embassy_sync::{blocking_mutex::raw::NoopRawMutex, channel::Channel};
use embassy_time::Instant;
use log::{info, warn};

use crate::{
    config::{WifiPolicy, NET_EVENT_QUEUE_DEPTH},
    socket::SocketMux,
    stack::{TcpStack, WifiRadio},
    telemetry,
    types::{
        CredentialOptions, IpConfig, ScanResults, SocketError, SocketId, StaticIpConfig,
        StoredCredentials, WifiDetails, WifiError, WifiState,
    },
    wifi::{DropReason, WifiApplyStatus, WifiManager, WifiStep},
};

pub use driver::NetworkDriver;
pub use events::{CallbackToken, NetEvent, NetReply};

pub struct NetworkRuntime<S: TcpStack, R: WifiRadio> {
    wifi: WifiManager<R>,
    sockets: SocketMux<S>,
    events: Channel<NoopRawMutex, NetEvent, NET_EVENT_QUEUE_DEPTH>,
    link_lost: bool,
    pending_connect: Option<CallbackToken>,
}

impl<S: TcpStack, R: WifiRadio> NetworkRuntime<S, R> {
    pub fn new(stack: S, radio: R, policy: WifiPolicy) -> Self {
        Self::from_parts(SocketMux::new(stack), WifiManager::new(radio, policy))
    }

    pub fn from_parts(sockets: SocketMux<S>, wifi: WifiManager<R>) -> Self {
        Self {
            wifi,
            sockets,
            events: Channel::new(),
            link_lost: false,
            pending_connect: None,
        }
    }

    pub fn wifi(&self) -> &WifiManager<R> {
        &self.wifi
    }

    pub fn wifi_mut(&mut self) -> &mut WifiManager<R> {
        &mut self.wifi
    }

    pub fn sockets(&self) -> &SocketMux<S> {
        &self.sockets
    }

    pub fn sockets_mut(&mut self) -> &mut SocketMux<S> {
        &mut self.sockets
    }

    /// Next deferred callback result, oldest first.
    pub fn poll_event(&mut self) -> Option<NetEvent> {
        self.events.try_receive().ok()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// WiFi step first, then the socket teardown it asked for.
    pub fn step(&mut self, now: Instant) -> WifiStep {
        let step = self.wifi.idle(now);
        self.apply(&step);
        if step.connected_now {
            if let Some(token) = self.pending_connect.take() {
                self.post(token, NetReply::Connected);
            }
        }
        if step.attempt_failed && !self.wifi.flags().auto_connect {
            self.fail_pending_connect();
        }
        step
    }

    pub fn on(&mut self, token: Option<CallbackToken>) -> Result<(), WifiError> {
        let _ = self.wifi.on();
        if self.wifi.state() == WifiState::Off {
            return Err(WifiError::NotReady);
        }
        self.reply(token, NetReply::Done);
        Ok(())
    }

    pub fn off(&mut self, token: Option<CallbackToken>) {
        let step = self.wifi.off();
        self.apply(&step);
        self.fail_pending_connect();
        self.reply(token, NetReply::Done);
    }

    pub fn disconnect(&mut self, token: Option<CallbackToken>) {
        let step = self.wifi.disconnect();
        self.apply(&step);
        self.fail_pending_connect();
        self.reply(token, NetReply::Done);
    }

    /// The callback fires once the link is up, or when retries give up.
    pub fn connect(
        &mut self,
        now: Instant,
        token: Option<CallbackToken>,
    ) -> Result<(), WifiError> {
        let step = self.wifi.connect(now)?;
        if step.state == WifiState::Connected {
            self.reply(token, NetReply::Connected);
            return Ok(());
        }
        if let Some(previous) = self.pending_connect.take() {
            self.post(previous, NetReply::ConnectFailed);
        }
        self.pending_connect = token;
        Ok(())
    }

    pub fn set_credential(
        &mut self,
        options: &CredentialOptions<'_>,
        token: Option<CallbackToken>,
    ) -> Result<(), WifiError> {
        self.wifi.set_credential(options)?;
        self.reply(token, NetReply::Done);
        Ok(())
    }

    pub fn clear_credentials(&mut self, token: Option<CallbackToken>) -> bool {
        let cleared = self.wifi.clear_credentials();
        self.reply(token, NetReply::Done);
        cleared
    }

    /// `NotReady` once automatic retries are spent and latched.
    pub fn set_auto_connect(&mut self, enabled: bool) -> Result<(), WifiError> {
        match self.wifi.set_auto_connect(enabled).status {
            WifiApplyStatus::Rejected => Err(WifiError::NotReady),
            _ => Ok(()),
        }
    }

    pub fn credentials(&mut self, token: Option<CallbackToken>) -> StoredCredentials {
        let stored = self.wifi.credentials();
        self.reply(token, NetReply::Credentials(stored.clone()));
        stored
    }

    pub fn start_listen(&mut self, token: Option<CallbackToken>) -> Result<(), WifiError> {
        self.wifi.start_listen()?;
        self.reply(token, NetReply::Done);
        Ok(())
    }

    pub fn stop_listen(&mut self, token: Option<CallbackToken>) {
        self.wifi.stop_listen();
        self.reply(token, NetReply::Done);
    }

    pub fn is_listening(&self) -> bool {
        self.wifi.is_listening()
    }

    pub fn set_static_ip(&mut self, config: &StaticIpConfig, token: Option<CallbackToken>) {
        self.wifi.set_static_ip(config);
        self.reply(token, NetReply::Done);
    }

    pub fn use_static_ip(&mut self, token: Option<CallbackToken>) -> Result<(), WifiError> {
        self.wifi.use_static_ip()?;
        self.reply(token, NetReply::Done);
        Ok(())
    }

    pub fn use_dynamic_ip(&mut self, token: Option<CallbackToken>) {
        self.wifi.use_dynamic_ip();
        self.reply(token, NetReply::Done);
    }

    pub fn details(&mut self, token: Option<CallbackToken>) -> WifiDetails {
        let details = self.wifi.details();
        self.reply(token, NetReply::Details(details.clone()));
        details
    }

    pub fn ip_config(&self) -> Result<IpConfig, WifiError> {
        self.wifi.ip_config()
    }

    pub fn scan(&mut self, token: Option<CallbackToken>) -> Result<usize, WifiError> {
        let mut results = ScanResults::new();
        let found = self.wifi.scan(&mut results)?;
        self.reply(token, NetReply::Scan(results));
        Ok(found)
    }

    pub fn ping(
        &mut self,
        addr: Ipv4Addr,
        tries: u8,
        token: Option<CallbackToken>,
    ) -> Result<u32, WifiError> {
        let replies = self.wifi.ping(addr, tries)?;
        self.reply(token, NetReply::Ping(replies));
        Ok(replies)
    }

    pub fn resolve(
        &mut self,
        hostname: &str,
        token: Option<CallbackToken>,
    ) -> Result<Option<Ipv4Addr>, WifiError> {
        let addr = self.wifi.resolve(hostname)?;
        self.reply(token, NetReply::Resolved(addr));
        Ok(addr)
    }

    fn apply(&mut self, step: &WifiStep) {
        let Some(reason) = step.drop_sockets else {
            return;
        };
        let closed = self.sockets.close_all();
        if reason == DropReason::LinkLost {
            self.link_lost = true;
        }
        if closed > 0 {
            info!(
                "net: sockets dropped reason={} count={}",
                reason.as_str(),
                closed
            );
        }
    }

    fn fail_pending_connect(&mut self) {
        if let Some(token) = self.pending_connect.take() {
            self.post(token, NetReply::ConnectFailed);
        }
    }

    fn reply(&mut self, token: Option<CallbackToken>, reply: NetReply) {
        if let Some(token) = token {
            self.post(token, reply);
        }
    }

    fn post(&mut self, token: CallbackToken, reply: NetReply) {
        if self.events.try_send(NetEvent { token, reply }).is_err() {
            telemetry::record_event_dropped();
            warn!("net: event queue full token={}", token.0);
        }
    }
}

impl<S: TcpStack, R: WifiRadio> NetworkDriver for NetworkRuntime<S, R> {
    fn create_socket(
        &mut self,
        remote: Option<Ipv4Addr>,
        port: u16,
    ) -> Result<SocketId, SocketError> {
        self.sockets.create_socket(remote, port)
    }

    fn close_socket(&mut self, id: SocketId) {
        self.sockets.close(id);
    }

    fn accept(&mut self, server: SocketId) -> Result<Option<SocketId>, SocketError> {
        self.sockets.accept(server)
    }

    fn recv(&mut self, id: SocketId, buf: &mut [u8]) -> usize {
        self.sockets.receive(id, buf)
    }

    fn send(&mut self, id: SocketId, data: &[u8]) -> Result<usize, SocketError> {
        self.sockets.send(id, data)
    }

    fn is_connected(&self, id: SocketId) -> bool {
        self.sockets.is_connected(id)
    }

    fn check_error(&mut self) -> bool {
        !core::mem::take(&mut self.link_lost)
    }

    fn get_host_by_name(&mut self, hostname: &str) -> Option<Ipv4Addr> {
        self.sockets.get_host_by_name(&mut self.wifi, hostname)
    }

    fn idle(&mut self, now: Instant) -> bool {
        self.step(now).more_pending()
    }
}
