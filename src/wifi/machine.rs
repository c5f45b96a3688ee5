use embassy_time::Instant;
use statig::prelude::*;

use crate::{
    config::WifiPolicy,
    types::{AssociationStatus, WifiState},
};

use super::{
    actions::{ActionBuffer, DropReason, RadioAction, WifiApplyStatus},
    events::{TickInput, WifiInput},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WifiFlags {
    pub auto_connect: bool,
    pub connect_failed: bool,
    /// Automatic attempts since the last success or user `connect`.
    pub retry_count: u8,
}

#[derive(Clone, Copy, Debug)]
pub(super) struct DispatchContext {
    pub(super) actions: ActionBuffer,
    pub(super) status: WifiApplyStatus,
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self {
            actions: ActionBuffer::new(),
            status: WifiApplyStatus::Unchanged,
        }
    }
}

impl DispatchContext {
    fn emit(&mut self, action: RadioAction) {
        self.actions.push(action);
        self.status = WifiApplyStatus::Applied;
    }
}

pub(super) struct WifiMachine {
    pub(super) policy: WifiPolicy,
    pub(super) flags: WifiFlags,
    pub(super) state_id: WifiState,
    associate_started_at: Option<Instant>,
}

impl WifiMachine {
    pub(super) fn new(policy: WifiPolicy) -> Self {
        Self {
            policy,
            flags: WifiFlags {
                auto_connect: policy.auto_connect_on_boot,
                ..WifiFlags::default()
            },
            state_id: WifiState::Off,
            associate_started_at: None,
        }
    }

    fn enter(&mut self, state: WifiState) -> Outcome<State> {
        self.state_id = state;
        match state {
            WifiState::Off => Transition(State::off()),
            WifiState::On => Transition(State::on()),
            WifiState::Connecting => Transition(State::connecting()),
            WifiState::Connected => Transition(State::connected()),
        }
    }

    fn set_auto_connect(&mut self, context: &mut DispatchContext, enabled: bool) {
        if self.flags.auto_connect != enabled {
            self.flags.auto_connect = enabled;
            context.status = WifiApplyStatus::Applied;
        }
    }

    fn begin_attempt(&mut self, context: &mut DispatchContext, now: Instant) -> Outcome<State> {
        if !self.state_id.radio_powered() {
            context.emit(RadioAction::PowerOn);
        }
        context.emit(RadioAction::Associate);
        self.associate_started_at = Some(now);
        self.enter(WifiState::Connecting)
    }

    /// The latch is set and the automatic budget is spent. Only `connect`
    /// or clearing credentials leaves this.
    fn retries_exhausted(&self) -> bool {
        self.flags.connect_failed && self.flags.retry_count >= self.policy.connect_retry_max
    }

    /// Opportunistic connection from `Off`/`On`. A latched failure does not
    /// stop it until the retry bound is spent.
    fn auto_tick(&mut self, context: &mut DispatchContext, tick: &TickInput) -> Outcome<State> {
        if !self.flags.auto_connect {
            return Handled;
        }
        if self.retries_exhausted() {
            self.set_auto_connect(context, false);
            return Handled;
        }
        // Provisioning owns the radio; stay armed for the credential it brings.
        if tick.listening {
            return Handled;
        }
        if !tick.has_credentials {
            self.set_auto_connect(context, false);
            return Handled;
        }
        self.flags.retry_count = self.flags.retry_count.saturating_add(1);
        self.begin_attempt(context, tick.now)
    }

    fn attempt_failed(&mut self, context: &mut DispatchContext) -> Outcome<State> {
        self.associate_started_at = None;
        self.flags.connect_failed = true;
        if self.flags.retry_count >= self.policy.connect_retry_max {
            self.flags.auto_connect = false;
        }
        context.emit(RadioAction::PowerOff);
        self.enter(WifiState::Off)
    }

    fn association_timed_out(&self, now: Instant) -> bool {
        self.associate_started_at.is_some_and(|started| {
            now.saturating_duration_since(started) >= self.policy.associate_timeout()
        })
    }
}

#[state_machine(initial = "State::off()")]
impl WifiMachine {
    #[state(superstate = "common")]
    fn off(&mut self, context: &mut DispatchContext, event: &WifiInput) -> Outcome<State> {
        match event {
            WifiInput::PowerOn => {
                if self.flags.connect_failed {
                    context.status = WifiApplyStatus::Rejected;
                    return Handled;
                }
                context.emit(RadioAction::PowerOn);
                self.enter(WifiState::On)
            }
            WifiInput::PowerOff => {
                context.emit(RadioAction::DropSockets(DropReason::RadioOff));
                self.set_auto_connect(context, false);
                Handled
            }
            WifiInput::Disconnect => {
                context.emit(RadioAction::DropSockets(DropReason::Disconnect));
                self.set_auto_connect(context, false);
                Handled
            }
            WifiInput::Tick(tick) => self.auto_tick(context, tick),
            _ => Super,
        }
    }

    #[state(superstate = "common")]
    fn on(&mut self, context: &mut DispatchContext, event: &WifiInput) -> Outcome<State> {
        match event {
            WifiInput::PowerOn => Handled,
            WifiInput::Tick(tick) => self.auto_tick(context, tick),
            _ => Super,
        }
    }

    #[state(superstate = "common")]
    fn connecting(&mut self, context: &mut DispatchContext, event: &WifiInput) -> Outcome<State> {
        match event {
            WifiInput::PowerOn => Handled,
            WifiInput::Tick(tick) => match tick.association {
                Some(AssociationStatus::Succeeded) => {
                    self.associate_started_at = None;
                    self.flags = WifiFlags::default();
                    context.emit(RadioAction::PostConnect);
                    self.enter(WifiState::Connected)
                }
                Some(AssociationStatus::Failed) => self.attempt_failed(context),
                Some(AssociationStatus::Pending) | None => {
                    if self.association_timed_out(tick.now) {
                        self.attempt_failed(context)
                    } else {
                        Handled
                    }
                }
            },
            _ => Super,
        }
    }

    #[state(superstate = "common")]
    fn connected(&mut self, context: &mut DispatchContext, event: &WifiInput) -> Outcome<State> {
        match event {
            WifiInput::PowerOn | WifiInput::Connect { .. } => Handled,
            WifiInput::Tick(tick) => {
                if tick.link_up {
                    return Handled;
                }
                context.emit(RadioAction::DropSockets(DropReason::LinkLost));
                self.flags.auto_connect = self.policy.reconnect_on_drop;
                self.enter(WifiState::On)
            }
            _ => Super,
        }
    }

    #[superstate]
    fn common(&mut self, context: &mut DispatchContext, event: &WifiInput) -> Outcome<State> {
        match event {
            WifiInput::PowerOff => {
                context.emit(RadioAction::DropSockets(DropReason::RadioOff));
                context.emit(RadioAction::PowerOff);
                self.flags.auto_connect = false;
                self.associate_started_at = None;
                self.enter(WifiState::Off)
            }
            WifiInput::Disconnect => {
                context.emit(RadioAction::DropSockets(DropReason::Disconnect));
                context.emit(RadioAction::Disassociate);
                self.flags.auto_connect = false;
                self.associate_started_at = None;
                self.enter(WifiState::On)
            }
            WifiInput::Connect { now } => {
                self.flags.retry_count = 0;
                self.flags.connect_failed = false;
                self.flags.auto_connect = true;
                self.begin_attempt(context, *now)
            }
            WifiInput::SetAutoConnect(true) if self.retries_exhausted() => {
                context.status = WifiApplyStatus::Rejected;
                Handled
            }
            WifiInput::SetAutoConnect(enabled) => {
                self.set_auto_connect(context, *enabled);
                Handled
            }
            WifiInput::CredentialsCleared => {
                if self.flags.connect_failed || self.flags.auto_connect {
                    context.status = WifiApplyStatus::Applied;
                }
                self.flags = WifiFlags::default();
                Handled
            }
            WifiInput::PowerOn | WifiInput::Tick(_) => Handled,
        }
    }
}
