#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub arg: String,
}

/// Splits `<prefix><name> <arg...>` into a command name and its (possibly
/// empty) argument. Returns `None` when `text` is not a command.
pub fn parse_prefixed_command(prefix: &str, text: &str) -> Option<ParsedCommand> {
    let rest = text.trim_start().strip_prefix(prefix)?;
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest.trim_end(), ""),
    };

    if name.is_empty() {
        return None;
    }

    Some(ParsedCommand {
        name: name.to_lowercase(),
        arg: arg.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{ParsedCommand, parse_prefixed_command};

    #[test]
    fn parses_command_without_argument() {
        assert_eq!(
            parse_prefixed_command("!", "!urls"),
            Some(ParsedCommand {
                name: "urls".to_string(),
                arg: String::new(),
            })
        );
    }

    #[test]
    fn parses_command_with_argument() {
        assert_eq!(
            parse_prefixed_command("!", "  !URLS   help  "),
            Some(ParsedCommand {
                name: "urls".to_string(),
                arg: "help".to_string(),
            })
        );
    }

    #[test]
    fn ignores_plain_messages() {
        assert_eq!(parse_prefixed_command("!", "urls please"), None);
        assert_eq!(parse_prefixed_command("!", "! urls"), None);
        assert_eq!(parse_prefixed_command("!", "!"), None);
    }
}
