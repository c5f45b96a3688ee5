use core::fmt;

/// Process-unique handle handed to the interpreter in place of a stack connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SocketId(u32);

impl SocketId {
    pub const NONE_RAW: u32 = 0;
    pub const EXHAUSTED_RAW: u32 = 0x7FFF_FFFF;

    pub const fn from_raw(raw: u32) -> Option<Self> {
        if raw == Self::NONE_RAW || raw >= Self::EXHAUSTED_RAW {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic id source. Released ids are never handed out again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SocketIdGenerator {
    last: u32,
}

impl SocketIdGenerator {
    pub const fn new() -> Self {
        Self { last: 0 }
    }

    /// Continue counting after `last`, as if `last` were the most recent id issued.
    pub const fn resume_after(last: u32) -> Self {
        let last = if last >= SocketId::EXHAUSTED_RAW - 1 {
            SocketId::EXHAUSTED_RAW - 1
        } else {
            last
        };
        Self { last }
    }

    pub const fn is_exhausted(&self) -> bool {
        self.last >= SocketId::EXHAUSTED_RAW - 1
    }

    pub fn last_issued(&self) -> Option<SocketId> {
        SocketId::from_raw(self.last)
    }

    pub fn next_id(&mut self) -> Option<SocketId> {
        if self.is_exhausted() {
            return None;
        }
        self.last += 1;
        SocketId::from_raw(self.last)
    }
}

impl Default for SocketIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
