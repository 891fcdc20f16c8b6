use pbx_protocol::Extension;

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Pickup,
    Hangup,
    /// `None` when the argument was present but non-numeric, which drives
    /// the TU-level null-target dial path.
    Dial(Option<Extension>),
    Chat(String),
}

/// Parse one already-stripped line (no trailing `\r` or `\n`) into a
/// command. Returns `None` for anything unrecognized; the caller ignores
/// those lines rather than erroring.
pub fn parse_line(line: &str) -> Option<Command> {
    let mut parts = line.splitn(2, ' ');
    let verb = parts.next()?;
    match verb {
        "pickup" => Some(Command::Pickup),
        "hangup" => Some(Command::Hangup),
        "dial" => {
            // A bare "dial" with no argument at all is ignored, same as an
            // unrecognized command; only a present-but-unparseable argument
            // reaches the null-target dial path.
            let arg = parts.next()?.trim();
            Some(Command::Dial(arg.parse().ok()))
        }
        "chat" => Some(Command::Chat(parts.next().unwrap_or("").to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pickup_and_hangup() {
        assert_eq!(parse_line("pickup"), Some(Command::Pickup));
        assert_eq!(parse_line("hangup"), Some(Command::Hangup));
    }

    #[test]
    fn parses_dial_with_extension() {
        assert_eq!(parse_line("dial 5"), Some(Command::Dial(Some(5))));
    }

    #[test]
    fn dial_with_a_non_numeric_argument_is_a_null_target() {
        assert_eq!(parse_line("dial abc"), Some(Command::Dial(None)));
    }

    #[test]
    fn bare_dial_with_no_argument_is_ignored() {
        assert_eq!(parse_line("dial"), None);
    }

    #[test]
    fn parses_chat_with_the_rest_of_the_line() {
        assert_eq!(
            parse_line("chat hello there"),
            Some(Command::Chat("hello there".to_string()))
        );
    }

    #[test]
    fn unrecognized_lines_are_ignored() {
        assert_eq!(parse_line("quit"), None);
        assert_eq!(parse_line(""), None);
    }
}
