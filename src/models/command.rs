use serde::{Deserialize, Serialize};

/// Operator-issued commands written to the single-slot command file as a
/// plain single-line payload (`skip`/`segment`/`podcast`) and consumed
/// (read-then-truncate) by the streaming engine's poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Skip,
    Segment,
    Podcast,
}

impl Command {
    /// Parse a trimmed command-file payload. Unknown payloads are ignored
    /// (returned as `None`) rather than treated as an error.
    pub fn parse(payload: &str) -> Option<Self> {
        match payload.trim().to_lowercase().as_str() {
            "skip" => Some(Command::Skip),
            "segment" => Some(Command::Segment),
            "podcast" => Some(Command::Podcast),
            _ => None,
        }
    }

    pub fn as_payload(self) -> &'static str {
        match self {
            Command::Skip => "skip",
            Command::Segment => "segment",
            Command::Podcast => "podcast",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_payloads_case_insensitively() {
        assert_eq!(Command::parse("skip"), Some(Command::Skip));
        assert_eq!(Command::parse("  SEGMENT\n"), Some(Command::Segment));
        assert_eq!(Command::parse("Podcast"), Some(Command::Podcast));
    }

    #[test]
    fn unknown_payload_is_ignored() {
        assert_eq!(Command::parse("reboot"), None);
        assert_eq!(Command::parse(""), None);
    }
}
