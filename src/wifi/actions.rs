/// Why the socket pools are being torn down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    LinkLost,
    RadioOff,
    Disconnect,
}

impl DropReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LinkLost => "link_lost",
            Self::RadioOff => "radio_off",
            Self::Disconnect => "disconnect",
        }
    }
}

/// Side effects requested by the connection machine, performed by the manager
/// in emission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RadioAction {
    PowerOn,
    PowerOff,
    Associate,
    Disassociate,
    PostConnect,
    DropSockets(DropReason),
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct ActionBuffer {
    len: usize,
    slots: [Option<RadioAction>; Self::MAX],
}

impl ActionBuffer {
    pub(crate) const MAX: usize = 4;

    pub(crate) const fn new() -> Self {
        Self {
            len: 0,
            slots: [None; Self::MAX],
        }
    }

    pub(crate) fn push(&mut self, action: RadioAction) {
        if self.len >= Self::MAX {
            return;
        }
        self.slots[self.len] = Some(action);
        self.len += 1;
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &RadioAction> {
        self.slots[..self.len].iter().filter_map(Option::as_ref)
    }

    pub(crate) fn drop_reason(&self) -> Option<DropReason> {
        self.iter().find_map(|action| match action {
            RadioAction::DropSockets(reason) => Some(*reason),
            _ => None,
        })
    }
}

impl Default for ActionBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WifiApplyStatus {
    Applied,
    Unchanged,
    Rejected,
}
