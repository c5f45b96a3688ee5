use core::fmt;

/// Socket failures, reported to the immediate caller and never fatal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SocketError {
    /// Pool full or identifier space exhausted.
    MaxSockets,
    /// The stack could not construct a handle.
    Memory,
    /// Connect or listen did not complete.
    Timeout,
    /// The stack reports the connection as gone.
    Closed,
}

impl SocketError {
    /// Result code understood by the interpreter's socket layer.
    pub const fn code(self) -> i32 {
        match self {
            Self::Closed => -1,
            Self::Memory => -2,
            Self::Timeout => -3,
            Self::MaxSockets => -7,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MaxSockets => "max_sock",
            Self::Memory => "mem",
            Self::Timeout => "timeout",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.code())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WifiError {
    NoCredentials,
    NotReady,
    InvalidArgument,
    /// The radio rejected an otherwise valid request.
    Stack,
}

impl WifiError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoCredentials => "no_credentials",
            Self::NotReady => "not_ready",
            Self::InvalidArgument => "invalid_argument",
            Self::Stack => "stack",
        }
    }
}

impl fmt::Display for WifiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
