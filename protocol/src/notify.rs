use crate::state::TuState;
use crate::Extension;

/// Format a state notification line for `state`.
///
/// `ext` is the TU's own extension for a self-notification, or the peer's
/// extension for a peer notification.
pub fn format_notification(state: TuState, ext: Extension) -> String {
    if state.carries_extension() {
        format!("{} {}\n", state.wire_name(), ext)
    } else {
        format!("{}\n", state.wire_name())
    }
}

/// Format a chat message forwarded to a peer.
pub fn format_chat(msg: &str) -> String {
    format!("CHAT {}\n", msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_hook_and_connected_carry_extension() {
        assert_eq!(format_notification(TuState::OnHook, 4), "ON HOOK 4\n");
        assert_eq!(format_notification(TuState::Connected, 5), "CONNECTED 5\n");
    }

    #[test]
    fn other_states_are_bare() {
        assert_eq!(format_notification(TuState::Ringing, 4), "RINGING\n");
        assert_eq!(format_notification(TuState::DialTone, 4), "DIAL TONE\n");
        assert_eq!(format_notification(TuState::RingBack, 4), "RING BACK\n");
        assert_eq!(format_notification(TuState::BusySignal, 4), "BUSY SIGNAL\n");
        assert_eq!(format_notification(TuState::Error, 4), "ERROR\n");
    }

    #[test]
    fn chat_is_prefixed() {
        assert_eq!(format_chat("hello"), "CHAT hello\n");
    }
}
