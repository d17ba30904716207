//! Command token parsing.

/// Marker in front of notifications forwarded into a group chat.
pub const NOTIFICATION_PREFIX: &str = "[!!] ";

fn strip_notification(text: &str) -> &str {
    text.strip_prefix(NOTIFICATION_PREFIX).unwrap_or(text)
}

/// Whether `text` starts with `/name` followed by end of text, whitespace
/// or an `@botname` suffix.
///
/// `name` may be given with or without the leading slash and may contain
/// spaces (`"task add"`). Matching is case-sensitive.
pub fn matches_command(text: &str, name: &str) -> bool {
    let name = name.trim_start_matches('/');
    if name.is_empty() {
        return false;
    }
    strip_notification(text)
        .strip_prefix('/')
        .and_then(|rest| rest.strip_prefix(name))
        .map(|rest| {
            rest.chars()
                .next()
                .map_or(true, |c| c.is_whitespace() || c == '@')
        })
        .unwrap_or(false)
}

/// Text after the leading `/command` token (and any `@botname` suffix).
///
/// Text that does not start with a command is returned trimmed.
pub fn strip_command(text: &str) -> &str {
    let text = strip_notification(text).trim();
    if !text.starts_with('/') {
        return text;
    }
    match text.find(char::is_whitespace) {
        Some(end) => text[end..].trim_start(),
        None => "",
    }
}

/// Text after the `/name` command and any `@botname` suffix, trimmed.
///
/// `None` when `text` does not start with that command.
pub fn command_remainder<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let name = name.trim_start_matches('/');
    if !matches_command(text, name) {
        return None;
    }
    let rest = strip_notification(text)
        .strip_prefix('/')
        .and_then(|rest| rest.strip_prefix(name))?;
    let rest = match rest.strip_prefix('@') {
        Some(bot) => bot.find(char::is_whitespace).map_or("", |end| &bot[end..]),
        None => rest,
    };
    Some(rest.trim())
}

/// Longest alias in `names` that `text` starts with.
pub fn matched_command<'n, S: AsRef<str>>(text: &str, names: &'n [S]) -> Option<&'n str> {
    names
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| matches_command(text, name))
        .max_by_key(|name| name.trim_start_matches('/').len())
}

fn split_arguments(text: &str) -> Vec<&str> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|arg| !arg.is_empty())
        .collect()
}

/// Arguments after the first token, split on runs of whitespace and commas.
///
/// For multi-word commands use [`command_arguments`], which strips the
/// whole alias.
pub fn arguments(text: &str) -> Vec<&str> {
    split_arguments(strip_command(text))
}

/// Arguments after whichever alias in `names` starts `text`.
///
/// Falls back to [`arguments`] when no alias matches.
pub fn command_arguments<'a, S: AsRef<str>>(text: &'a str, names: &[S]) -> Vec<&'a str> {
    match matched_command(text, names).and_then(|name| command_remainder(text, name)) {
        Some(rest) => split_arguments(rest),
        None => arguments(text),
    }
}
