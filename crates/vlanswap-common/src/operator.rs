//! Operator interaction.
//!
//! Every question asked of the operator and every status line shown to them
//! goes through an [`Operator`], so the workflow can run against a scripted
//! operator in tests.

use dialoguer::{Input, Password};
use std::io;

/// Source of operator answers and sink for status lines.
pub trait Operator: Send {
    /// Asks a question and returns the raw answer.
    fn ask(&mut self, prompt: &str) -> io::Result<String>;

    /// Asks for a secret without echoing it.
    fn ask_secret(&mut self, prompt: &str) -> io::Result<String>;

    /// Shows a status line.
    fn say(&mut self, line: &str);
}

/// Returns true if `answer` is the exit signal (`e` or `E`).
pub fn is_exit(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("e")
}

/// Parses a yes/no answer; anything else is `None`.
pub fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.trim() {
        "y" | "Y" => Some(true),
        "n" | "N" => Some(false),
        _ => None,
    }
}

/// Operator on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalOperator;

impl TerminalOperator {
    /// Creates a terminal operator.
    pub fn new() -> Self {
        Self
    }
}

impl Operator for TerminalOperator {
    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| io::Error::other(e.to_string()))
    }

    fn ask_secret(&mut self, prompt: &str) -> io::Result<String> {
        Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(|e| io::Error::other(e.to_string()))
    }

    fn say(&mut self, line: &str) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_is_exit() {
        assert!(is_exit("e"));
        assert!(is_exit("E"));
        assert!(is_exit(" e\n"));
        assert!(!is_exit("exit"));
        assert!(!is_exit("10"));
    }

    #[test]
    fn test_parse_yes_no() {
        assert_eq!(parse_yes_no("y"), Some(true));
        assert_eq!(parse_yes_no("Y"), Some(true));
        assert_eq!(parse_yes_no("n"), Some(false));
        assert_eq!(parse_yes_no("N"), Some(false));
        assert_eq!(parse_yes_no("yes"), None);
        assert_eq!(parse_yes_no(""), None);
    }
}
