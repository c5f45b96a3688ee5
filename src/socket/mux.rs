use core::net::Ipv4Addr;

use log::{debug, info, warn};

use crate::{
    config::{MAX_CLIENT_SOCKETS, MAX_SERVER_SOCKETS},
    stack::{HostResolver, StackError, TcpClient, TcpServer, TcpStack},
    telemetry,
    types::{SocketError, SocketId, SocketIdGenerator},
};

use super::pool::HandlePool;

/// Maps bounded pools of stack handles to process-unique socket ids.
///
/// Server and client handles live in separate fixed pools; an id is owned by
/// at most one slot across both. All calls return immediately.
pub struct SocketMux<
    S: TcpStack,
    const SERVERS: usize = MAX_SERVER_SOCKETS,
    const CLIENTS: usize = MAX_CLIENT_SOCKETS,
> {
    stack: S,
    servers: HandlePool<S::Server, SERVERS>,
    clients: HandlePool<S::Client, CLIENTS>,
    ids: SocketIdGenerator,
}

impl<S: TcpStack, const SERVERS: usize, const CLIENTS: usize> SocketMux<S, SERVERS, CLIENTS> {
    pub fn new(stack: S) -> Self {
        Self::with_id_generator(stack, SocketIdGenerator::new())
    }

    pub fn with_id_generator(stack: S, ids: SocketIdGenerator) -> Self {
        Self {
            stack,
            servers: HandlePool::new(),
            clients: HandlePool::new(),
            ids,
        }
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }

    /// Opens a listening server when `remote` is absent or unspecified,
    /// otherwise a client connected to `remote:port`.
    pub fn create_socket(
        &mut self,
        remote: Option<Ipv4Addr>,
        port: u16,
    ) -> Result<SocketId, SocketError> {
        if self.ids.is_exhausted() {
            warn!("net: socket ids exhausted port={}", port);
            telemetry::record_socket_open_error();
            return Err(SocketError::MaxSockets);
        }

        let result = match remote.filter(|addr| !addr.is_unspecified()) {
            None => self.create_server(port),
            Some(addr) => self.create_client(addr, port),
        };
        match result {
            Ok(_) => telemetry::record_socket_opened(),
            Err(_) => telemetry::record_socket_open_error(),
        }
        result
    }

    fn create_server(&mut self, port: u16) -> Result<SocketId, SocketError> {
        let Some(index) = self.servers.free_index() else {
            warn!("net: server pool full port={}", port);
            return Err(SocketError::MaxSockets);
        };
        let Some(mut server) = self.stack.new_server(port) else {
            warn!("net: tcp server alloc failed port={}", port);
            return Err(SocketError::Memory);
        };
        if let Err(err) = server.begin() {
            warn!("net: tcp server listen failed port={} err={:?}", port, err);
            server.stop();
            return Err(SocketError::Timeout);
        }
        let Some(id) = self.ids.next_id() else {
            server.stop();
            return Err(SocketError::MaxSockets);
        };

        self.servers.occupy(index, id, server);
        info!("net: tcp server socket={} listening port={}", id, port);
        Ok(id)
    }

    fn create_client(&mut self, addr: Ipv4Addr, port: u16) -> Result<SocketId, SocketError> {
        let Some(index) = self.clients.free_index() else {
            warn!("net: client pool full remote={}:{}", addr, port);
            return Err(SocketError::MaxSockets);
        };
        let Some(mut client) = self.stack.new_client() else {
            warn!("net: tcp client alloc failed remote={}:{}", addr, port);
            return Err(SocketError::Memory);
        };
        if let Err(err) = client.connect(addr, port) {
            warn!(
                "net: tcp connect failed remote={}:{} err={:?}",
                addr, port, err
            );
            client.stop();
            return Err(SocketError::Timeout);
        }
        let Some(id) = self.ids.next_id() else {
            client.stop();
            return Err(SocketError::MaxSockets);
        };

        self.clients.occupy(index, id, client);
        info!("net: tcp client socket={} connected remote={}:{}", id, addr, port);
        Ok(id)
    }

    /// Polls a listening server for one new connection.
    ///
    /// `Ok(None)` means nothing arrived, the id is not a server, or the
    /// client pool was full and the arrival had to be dropped.
    pub fn accept(&mut self, server_id: SocketId) -> Result<Option<SocketId>, SocketError> {
        if self.ids.is_exhausted() {
            return Err(SocketError::MaxSockets);
        }
        let Some(server) = self.servers.get_mut(server_id) else {
            return Ok(None);
        };
        let Some(mut client) = server.accept() else {
            return Ok(None);
        };

        let Some(index) = self.clients.free_index() else {
            warn!(
                "net: accept dropped server={} reason=client_pool_full",
                server_id
            );
            client.stop();
            telemetry::record_accept_dropped();
            return Ok(None);
        };
        let Some(id) = self.ids.next_id() else {
            client.stop();
            return Err(SocketError::MaxSockets);
        };

        self.clients.occupy(index, id, client);
        telemetry::record_accept();
        info!("net: tcp client socket={} accepted server={}", id, server_id);
        Ok(Some(id))
    }

    /// Writes through to a client. Would-block and unknown ids report `Ok(0)`.
    pub fn send(&mut self, id: SocketId, data: &[u8]) -> Result<usize, SocketError> {
        let Some(client) = self.clients.get_mut(id) else {
            return Ok(0);
        };
        if data.is_empty() {
            return Ok(0);
        }
        match client.write(data) {
            Ok(written) => Ok(written.min(data.len())),
            Err(StackError::WouldBlock) => Ok(0),
            Err(StackError::Timeout) => Err(SocketError::Timeout),
            Err(err) => {
                debug!("net: send failed socket={} err={:?}", id, err);
                Err(SocketError::Closed)
            }
        }
    }

    /// Reads up to `buf.len()` bytes already buffered by the stack.
    pub fn receive(&mut self, id: SocketId, buf: &mut [u8]) -> usize {
        let Some(client) = self.clients.get_mut(id) else {
            return 0;
        };
        if buf.is_empty() || client.available() == 0 {
            return 0;
        }
        match client.read(buf) {
            Ok(read) => read.min(buf.len()),
            Err(StackError::WouldBlock) => 0,
            Err(err) => {
                debug!("net: recv failed socket={} err={:?}", id, err);
                0
            }
        }
    }

    /// A listening server always counts as connected.
    pub fn is_connected(&self, id: SocketId) -> bool {
        if let Some(client) = self.clients.get(id) {
            return client.is_connected();
        }
        self.servers.contains(id)
    }

    pub fn close(&mut self, id: SocketId) {
        if let Some(mut server) = self.servers.release(id) {
            server.stop();
            telemetry::record_socket_closed();
            info!("net: tcp server socket={} closed", id);
            return;
        }
        if let Some(mut client) = self.clients.release(id) {
            client.stop();
            telemetry::record_socket_closed();
            info!("net: tcp client socket={} closed", id);
        }
    }

    /// Tears down every open socket in both pools.
    pub fn close_all(&mut self) -> usize {
        let mut closed = 0usize;
        self.servers.release_all(|_, mut server| {
            server.stop();
            closed += 1;
        });
        self.clients.release_all(|_, mut client| {
            client.stop();
            closed += 1;
        });
        if closed > 0 {
            info!("net: dropped all sockets count={}", closed);
        }
        closed
    }

    pub fn get_host_by_name(
        &self,
        resolver: &mut impl HostResolver,
        hostname: &str,
    ) -> Option<Ipv4Addr> {
        resolver.resolve_host(hostname)
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty() && self.clients.is_empty()
    }

    pub fn open_sockets(&self) -> impl Iterator<Item = SocketId> + '_ {
        self.servers.ids().chain(self.clients.ids())
    }

    pub fn last_issued_id(&self) -> Option<SocketId> {
        self.ids.last_issued()
    }
}
