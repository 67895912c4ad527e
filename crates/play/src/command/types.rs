/// Result of parsing a textual command line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    /// The original unmodified input.
    pub raw_text: String,
    /// Dispatch key following the command prefix.
    pub token: String,
    /// `key=value` words, in order of appearance.
    pub named: Vec<(String, String)>,
    /// Remaining words, in order of appearance.
    pub positional: Vec<String>,
}
