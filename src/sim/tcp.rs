use core::{cell::RefCell, net::Ipv4Addr};

use heapless::{Deque, Vec};

use crate::stack::{StackError, TcpClient, TcpServer, TcpStack};

pub const SIM_CONNECTIONS_MAX: usize = 32;
pub const SIM_LISTENERS_MAX: usize = 8;
pub const SIM_HOSTS_MAX: usize = 8;
pub const SIM_BUFFER_LEN: usize = 256;
const SIM_BACKLOG: usize = 4;

/// Peer-side handle of one simulated connection. Stays valid until the
/// connection is closed and its device handle dropped; the slot is then reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeerId(usize);

struct SimConnection {
    // bytes travelling peer -> device
    inbound: Deque<u8, SIM_BUFFER_LEN>,
    // bytes travelling device -> peer
    outbound: Deque<u8, SIM_BUFFER_LEN>,
    open: bool,
    // a device-side `SimClient` still points here
    attached: bool,
    write_blocked: bool,
    stops: u8,
}

impl SimConnection {
    fn new() -> Self {
        Self {
            inbound: Deque::new(),
            outbound: Deque::new(),
            open: true,
            attached: false,
            write_blocked: false,
            stops: 0,
        }
    }

    fn reclaimable(&self) -> bool {
        !self.open && !self.attached
    }
}

struct SimListener {
    port: u16,
    listening: bool,
    stopped: bool,
    backlog: Deque<usize, SIM_BACKLOG>,
}

/// In-memory network shared between the stack handles and the test driver.
pub struct SimNet {
    connections: Vec<SimConnection, SIM_CONNECTIONS_MAX>,
    listeners: Vec<SimListener, SIM_LISTENERS_MAX>,
    reachable: Vec<(Ipv4Addr, u16), SIM_HOSTS_MAX>,
    fail_next_handle: bool,
    fail_next_listen: bool,
    last_opened: Option<usize>,
    live_clients: usize,
    live_servers: usize,
}

impl SimNet {
    pub fn new() -> Self {
        Self {
            connections: Vec::new(),
            listeners: Vec::new(),
            reachable: Vec::new(),
            fail_next_handle: false,
            fail_next_listen: false,
            last_opened: None,
            live_clients: 0,
            live_servers: 0,
        }
    }

    pub fn add_reachable(&mut self, addr: Ipv4Addr, port: u16) {
        let _ = self.reachable.push((addr, port));
    }

    /// The next `new_client`/`new_server` call returns no handle.
    pub fn fail_next_handle(&mut self) {
        self.fail_next_handle = true;
    }

    pub fn fail_next_listen(&mut self) {
        self.fail_next_listen = true;
    }

    /// Opens a connection from a remote peer to a local listener.
    pub fn peer_connect(&mut self, port: u16) -> Option<PeerId> {
        let listener = self
            .listeners
            .iter()
            .position(|l| l.port == port && l.listening && !l.stopped)?;
        let conn = self.open_connection()?;
        if self.listeners[listener].backlog.push_back(conn).is_err() {
            self.connections[conn].open = false;
            return None;
        }
        Some(PeerId(conn))
    }

    pub fn peer_send(&mut self, peer: PeerId, data: &[u8]) -> usize {
        let Some(conn) = self.connections.get_mut(peer.0) else {
            return 0;
        };
        if !conn.open {
            return 0;
        }
        let mut sent = 0usize;
        for &byte in data {
            if conn.inbound.push_back(byte).is_err() {
                break;
            }
            sent += 1;
        }
        sent
    }

    pub fn peer_receive(&mut self, peer: PeerId, buf: &mut [u8]) -> usize {
        let Some(conn) = self.connections.get_mut(peer.0) else {
            return 0;
        };
        drain_into(&mut conn.outbound, buf)
    }

    pub fn peer_close(&mut self, peer: PeerId) {
        if let Some(conn) = self.connections.get_mut(peer.0) {
            conn.open = false;
        }
    }

    pub fn set_write_blocked(&mut self, peer: PeerId, blocked: bool) {
        if let Some(conn) = self.connections.get_mut(peer.0) {
            conn.write_blocked = blocked;
        }
    }

    /// How many times the device side stopped this connection.
    pub fn stop_count(&self, peer: PeerId) -> u8 {
        self.connections.get(peer.0).map_or(0, |conn| conn.stops)
    }

    /// Most recently opened connection, whichever side initiated it.
    pub fn last_peer(&self) -> Option<PeerId> {
        self.last_opened.map(PeerId)
    }

    /// Connection slots in use, open or still held by a device handle.
    pub fn connections_in_use(&self) -> usize {
        self.connections
            .iter()
            .filter(|conn| !conn.reclaimable())
            .count()
    }

    pub fn is_listening(&self, port: u16) -> bool {
        self.listeners
            .iter()
            .any(|l| l.port == port && l.listening && !l.stopped)
    }

    /// Handles constructed and not yet dropped.
    pub fn live_clients(&self) -> usize {
        self.live_clients
    }

    pub fn live_servers(&self) -> usize {
        self.live_servers
    }

    fn open_connection(&mut self) -> Option<usize> {
        let index = match self.connections.iter().position(SimConnection::reclaimable) {
            Some(index) => {
                self.connections[index] = SimConnection::new();
                index
            }
            None => {
                self.connections.push(SimConnection::new()).ok()?;
                self.connections.len() - 1
            }
        };
        self.last_opened = Some(index);
        Some(index)
    }

    fn attach(&mut self, conn: usize) {
        if let Some(conn) = self.connections.get_mut(conn) {
            conn.attached = true;
        }
    }

    fn open_listener(&mut self, port: u16) -> Option<usize> {
        let listener = SimListener {
            port,
            listening: false,
            stopped: false,
            backlog: Deque::new(),
        };
        if let Some(index) = self.listeners.iter().position(|l| l.stopped) {
            self.listeners[index] = listener;
            return Some(index);
        }
        self.listeners.push(listener).ok()?;
        Some(self.listeners.len() - 1)
    }
}

impl Default for SimNet {
    fn default() -> Self {
        Self::new()
    }
}

fn drain_into(queue: &mut Deque<u8, SIM_BUFFER_LEN>, buf: &mut [u8]) -> usize {
    let mut read = 0usize;
    while read < buf.len() {
        let Some(byte) = queue.pop_front() else {
            break;
        };
        buf[read] = byte;
        read += 1;
    }
    read
}

pub struct SimStack<'a> {
    net: &'a RefCell<SimNet>,
}

impl<'a> SimStack<'a> {
    pub fn new(net: &'a RefCell<SimNet>) -> Self {
        Self { net }
    }
}

impl<'a> TcpStack for SimStack<'a> {
    type Client = SimClient<'a>;
    type Server = SimServer<'a>;

    fn new_client(&mut self) -> Option<Self::Client> {
        let mut net = self.net.borrow_mut();
        if core::mem::take(&mut net.fail_next_handle) {
            return None;
        }
        net.live_clients += 1;
        Some(SimClient {
            net: self.net,
            conn: None,
        })
    }

    fn new_server(&mut self, port: u16) -> Option<Self::Server> {
        let mut net = self.net.borrow_mut();
        if core::mem::take(&mut net.fail_next_handle) {
            return None;
        }
        let listener = net.open_listener(port)?;
        net.live_servers += 1;
        Some(SimServer {
            net: self.net,
            listener,
        })
    }
}

pub struct SimClient<'a> {
    net: &'a RefCell<SimNet>,
    conn: Option<usize>,
}

impl TcpClient for SimClient<'_> {
    fn connect(&mut self, addr: Ipv4Addr, port: u16) -> Result<(), StackError> {
        let mut net = self.net.borrow_mut();
        if !net.reachable.contains(&(addr, port)) {
            return Err(StackError::Refused);
        }
        let conn = net.open_connection().ok_or(StackError::Other(-1))?;
        net.attach(conn);
        self.conn = Some(conn);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        let net = self.net.borrow();
        self.conn
            .and_then(|conn| net.connections.get(conn))
            .is_some_and(|conn| conn.open)
    }

    fn available(&self) -> usize {
        let net = self.net.borrow();
        self.conn
            .and_then(|conn| net.connections.get(conn))
            .map_or(0, |conn| conn.inbound.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StackError> {
        let mut net = self.net.borrow_mut();
        let conn = self
            .conn
            .and_then(|conn| net.connections.get_mut(conn))
            .ok_or(StackError::Closed)?;
        if conn.inbound.is_empty() {
            return if conn.open {
                Err(StackError::WouldBlock)
            } else {
                Err(StackError::Closed)
            };
        }
        Ok(drain_into(&mut conn.inbound, buf))
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, StackError> {
        let mut net = self.net.borrow_mut();
        let conn = self
            .conn
            .and_then(|conn| net.connections.get_mut(conn))
            .ok_or(StackError::Closed)?;
        if !conn.open {
            return Err(StackError::Closed);
        }
        if conn.write_blocked {
            return Err(StackError::WouldBlock);
        }
        let mut written = 0usize;
        for &byte in data {
            if conn.outbound.push_back(byte).is_err() {
                break;
            }
            written += 1;
        }
        if written == 0 {
            return Err(StackError::WouldBlock);
        }
        Ok(written)
    }

    fn stop(&mut self) {
        let mut net = self.net.borrow_mut();
        if let Some(conn) = self.conn.and_then(|conn| net.connections.get_mut(conn)) {
            conn.open = false;
            conn.stops = conn.stops.saturating_add(1);
        }
    }
}

impl Drop for SimClient<'_> {
    fn drop(&mut self) {
        let mut net = self.net.borrow_mut();
        net.live_clients = net.live_clients.saturating_sub(1);
        if let Some(conn) = self.conn.and_then(|conn| net.connections.get_mut(conn)) {
            conn.attached = false;
        }
    }
}

pub struct SimServer<'a> {
    net: &'a RefCell<SimNet>,
    listener: usize,
}

impl<'a> TcpServer for SimServer<'a> {
    type Client = SimClient<'a>;

    fn begin(&mut self) -> Result<(), StackError> {
        let mut net = self.net.borrow_mut();
        if core::mem::take(&mut net.fail_next_listen) {
            return Err(StackError::Timeout);
        }
        net.listeners[self.listener].listening = true;
        Ok(())
    }

    fn accept(&mut self) -> Option<Self::Client> {
        let mut net = self.net.borrow_mut();
        let listener = &mut net.listeners[self.listener];
        if listener.stopped {
            return None;
        }
        let conn = listener.backlog.pop_front()?;
        net.attach(conn);
        net.live_clients += 1;
        Some(SimClient {
            net: self.net,
            conn: Some(conn),
        })
    }

    fn stop(&mut self) {
        let mut guard = self.net.borrow_mut();
        let net = &mut *guard;
        let listener = &mut net.listeners[self.listener];
        listener.listening = false;
        listener.stopped = true;
        while let Some(conn) = listener.backlog.pop_front() {
            if let Some(conn) = net.connections.get_mut(conn) {
                conn.open = false;
            }
        }
    }
}

impl Drop for SimServer<'_> {
    fn drop(&mut self) {
        let mut net = self.net.borrow_mut();
        net.live_servers = net.live_servers.saturating_sub(1);
    }
}
