use super::types::ParsedCommand;

/// True when the trimmed line starts with the command prefix.
pub fn is_command_line(prefix: &str, input: &str) -> bool {
    !prefix.is_empty() && input.trim_start().starts_with(prefix)
}

/// Parse `<prefix><token> [key=value | word]...`.
///
/// Returns `None` when the line does not carry the prefix or names no token.
/// Double quotes group words that contain spaces.
pub fn parse(prefix: &str, input: &str) -> Option<ParsedCommand> {
    let rest = input.trim_start().strip_prefix(prefix)?;
    let mut words = split_words(rest).into_iter();
    let token = words.next().filter(|token| !token.is_empty())?.to_lowercase();

    let mut named = Vec::new();
    let mut positional = Vec::new();
    for word in words {
        match named_pair(&word) {
            Some((key, value)) => named.push((key.to_string(), value.to_string())),
            None => positional.push(word),
        }
    }

    Some(ParsedCommand {
        raw_text: input.to_string(),
        token,
        named,
        positional,
    })
}

/// Split on whitespace, keeping double-quoted runs together (quotes dropped).
fn split_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for c in input.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    words.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        words.push(current);
    }
    words
}

/// A named argument is `key=value` where the key is one or more
/// `[a-zA-Z0-9_-]` characters.
fn named_pair(word: &str) -> Option<(&str, &str)> {
    let (key, value) = word.split_once('=')?;
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    valid.then_some((key, value))
}
