//! Command-line host for Parley voice sessions.
//!
//! The `parley` binary (built with the `livekit` feature) mounts a voice
//! provider, starts a session and forwards stdin lines as text messages.
//! This library half holds the pieces that do not need the media stack.

pub mod config;
pub mod logging;

/// What a line typed at the prompt asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send as a `user_text_message`.
    Text(String),
    /// `/ctx <text>`: send as a `context_update`.
    Context(String),
    /// `/quit` or `/exit`.
    Quit,
    /// Blank line.
    Empty,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        if line == "/quit" || line == "/exit" {
            return Self::Quit;
        }
        if let Some(rest) = line.strip_prefix("/ctx") {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return Self::Context(rest.trim().to_string());
            }
        }
        Self::Text(line.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("  hello there "), Command::Text("hello there".into()));
        assert_eq!(Command::parse("/ctx viewing README"), Command::Context("viewing README".into()));
        assert_eq!(Command::parse("/quit"), Command::Quit);
        assert_eq!(Command::parse("/exit"), Command::Quit);
        assert_eq!(Command::parse("   "), Command::Empty);
    }

    #[test]
    fn test_ctx_prefix_needs_a_word_boundary() {
        assert_eq!(Command::parse("/ctxfoo"), Command::Text("/ctxfoo".into()));
        assert_eq!(Command::parse("/ctx"), Command::Context(String::new()));
    }
}
