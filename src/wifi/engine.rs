use statig::blocking::IntoStateMachineExt as _;

use crate::{config::WifiPolicy, types::WifiState};

use super::{
    actions::{ActionBuffer, WifiApplyStatus},
    events::WifiInput,
    machine::{DispatchContext, WifiFlags, WifiMachine},
};

#[derive(Clone, Copy, Debug)]
pub(crate) struct WifiOutput {
    pub(crate) actions: ActionBuffer,
    pub(crate) status: WifiApplyStatus,
    pub(crate) before: WifiState,
    pub(crate) after: WifiState,
    pub(crate) flags_before: WifiFlags,
    pub(crate) flags: WifiFlags,
}

impl WifiOutput {
    pub(crate) fn attempt_failed(&self) -> bool {
        self.before == WifiState::Connecting && self.after == WifiState::Off
    }

    pub(crate) fn retries_exhausted(&self) -> bool {
        self.attempt_failed() && self.flags_before.auto_connect && !self.flags.auto_connect
    }

    pub(crate) fn connected_now(&self) -> bool {
        self.before != WifiState::Connected && self.after == WifiState::Connected
    }
}

pub(crate) struct WifiEngine {
    machine: statig::blocking::StateMachine<WifiMachine>,
}

impl WifiEngine {
    pub(crate) fn new(policy: WifiPolicy) -> Self {
        Self {
            machine: WifiMachine::new(policy).state_machine(),
        }
    }

    pub(crate) fn state(&self) -> WifiState {
        self.machine.inner().state_id
    }

    pub(crate) fn flags(&self) -> WifiFlags {
        self.machine.inner().flags
    }

    pub(crate) fn policy(&self) -> WifiPolicy {
        self.machine.inner().policy
    }

    pub(crate) fn apply(&mut self, input: WifiInput) -> WifiOutput {
        let before = self.state();
        let flags_before = self.flags();
        let mut context = DispatchContext::default();
        self.machine.handle_with_context(&input, &mut context);
        WifiOutput {
            actions: context.actions,
            status: context.status,
            before,
            after: self.state(),
            flags_before,
            flags: self.flags(),
        }
    }
}
