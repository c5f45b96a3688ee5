mod mux;
mod pool;

pub use mux::SocketMux;
