/// A telephone unit's state.
///
/// Transitions between these variants are driven exclusively by the
/// operations in `core-tu` (`pickup`, `hangup`, `dial`, `chat`,
/// `set_extension`); nothing outside that crate mutates a TU's state
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TuState {
    OnHook,
    Ringing,
    DialTone,
    RingBack,
    BusySignal,
    Connected,
    Error,
}

impl Default for TuState {
    fn default() -> Self {
        TuState::OnHook
    }
}

impl TuState {
    /// The wire name used in notifications.
    pub fn wire_name(self) -> &'static str {
        match self {
            TuState::OnHook => "ON HOOK",
            TuState::Ringing => "RINGING",
            TuState::DialTone => "DIAL TONE",
            TuState::RingBack => "RING BACK",
            TuState::BusySignal => "BUSY SIGNAL",
            TuState::Connected => "CONNECTED",
            TuState::Error => "ERROR",
        }
    }

    /// Whether a notification of this state carries an extension number.
    /// Only `ON_HOOK` and `CONNECTED` do.
    pub fn carries_extension(self) -> bool {
        matches!(self, TuState::OnHook | TuState::Connected)
    }

    /// Whether a TU in this state must have a peer: `peer` is non-null
    /// exactly when the state is one of these three.
    pub fn requires_peer(self) -> bool {
        matches!(self, TuState::Ringing | TuState::RingBack | TuState::Connected)
    }
}
