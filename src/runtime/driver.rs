use core::net::Ipv4Addr;

use embassy_time::Instant;

use crate::{
    config::CHUNK_SIZE,
    types::{SocketError, SocketId},
};

/// Network surface called by the interpreter's generic socket layer.
pub trait NetworkDriver {
    fn create_socket(
        &mut self,
        remote: Option<Ipv4Addr>,
        port: u16,
    ) -> Result<SocketId, SocketError>;
    fn close_socket(&mut self, id: SocketId);
    fn accept(&mut self, server: SocketId) -> Result<Option<SocketId>, SocketError>;
    fn recv(&mut self, id: SocketId, buf: &mut [u8]) -> usize;
    fn send(&mut self, id: SocketId, data: &[u8]) -> Result<usize, SocketError>;
    fn is_connected(&self, id: SocketId) -> bool;
    /// `false` once after the link dropped and every socket was torn down.
    fn check_error(&mut self) -> bool;
    fn get_host_by_name(&mut self, hostname: &str) -> Option<Ipv4Addr>;
    /// Returns whether more work is pending.
    fn idle(&mut self, now: Instant) -> bool;

    /// Largest payload the interpreter should move per `send`/`recv` call.
    fn chunk_size(&self) -> usize {
        CHUNK_SIZE
    }
}
