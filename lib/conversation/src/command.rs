//! Slash-command parsing.

/// Longest argument to `/delete` still taken as a literal event identifier.
const MAX_LITERAL_ID_LEN: usize = 50;

/// An inbound message, split into command and argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// `/start`.
    Start,
    /// `/help`.
    Help,
    /// `/add <text>`, argument trimmed and possibly empty.
    Add(&'a str),
    /// `/view <date>`.
    View(&'a str),
    /// `/delete <id or title>`.
    Delete(&'a str),
    /// Anything else, including unknown commands.
    Text(&'a str),
}

impl<'a> Command<'a> {
    /// Parses a message. `/view@chronobot 2025-11-27` is the same as
    /// `/view 2025-11-27`.
    #[must_use]
    pub fn parse(text: &'a str) -> Self {
        let trimmed = text.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Self::Text(text);
        };

        let (head, argument) = match rest.split_once(char::is_whitespace) {
            Some((head, argument)) => (head, argument.trim()),
            None => (rest, ""),
        };
        let name = head.split_once('@').map_or(head, |(name, _bot)| name);

        match name {
            "start" => Self::Start,
            "help" => Self::Help,
            "add" => Self::Add(argument),
            "view" => Self::View(argument),
            "delete" => Self::Delete(argument),
            _ => Self::Text(text),
        }
    }
}

/// Returns true if a `/delete` argument looks like an event identifier
/// rather than a title.
#[must_use]
pub fn is_literal_event_id(argument: &str) -> bool {
    !argument.is_empty()
        && argument.chars().count() < MAX_LITERAL_ID_LEN
        && !argument.contains(char::is_whitespace)
}
