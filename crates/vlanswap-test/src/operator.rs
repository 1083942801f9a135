//! Scripted operator for driving prompts in tests

use std::collections::VecDeque;
use std::io;

use vlanswap_common::Operator;

/// Replays canned answers and records everything shown.
///
/// Running out of answers is an `UnexpectedEof` error, the same thing a
/// closed terminal produces.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    answers: VecDeque<String>,
    prompts: Vec<String>,
    lines: Vec<String>,
}

impl ScriptedOperator {
    /// Create an operator that gives `answers` in order
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
            lines: Vec::new(),
        }
    }

    /// Status lines shown, in order
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Prompts asked, in order (secret prompts included)
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Returns true if exactly `line` was shown
    pub fn said(&self, line: &str) -> bool {
        self.lines.iter().any(|l| l == line)
    }

    /// Answers not yet consumed
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next_answer(&mut self, prompt: &str) -> io::Result<String> {
        self.prompts.push(prompt.to_string());
        self.answers.pop_front().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("no scripted answer for '{}'", prompt),
            )
        })
    }
}

impl Operator for ScriptedOperator {
    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        self.next_answer(prompt)
    }

    fn ask_secret(&mut self, prompt: &str) -> io::Result<String> {
        self.next_answer(prompt)
    }

    fn say(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_replays_answers_in_order() {
        let mut operator = ScriptedOperator::new(["10", "secret"]);
        assert_eq!(operator.ask("VLAN").unwrap(), "10");
        assert_eq!(operator.ask_secret("Password").unwrap(), "secret");
        assert_eq!(operator.prompts(), &["VLAN".to_string(), "Password".to_string()]);
        assert_eq!(operator.remaining(), 0);
    }

    #[test]
    fn test_exhausted_is_eof() {
        let mut operator = ScriptedOperator::new(Vec::<String>::new());
        let err = operator.ask("VLAN").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_records_lines() {
        let mut operator = ScriptedOperator::default();
        operator.say("Done.");
        assert!(operator.said("Done."));
        assert!(!operator.said("Done"));
    }
}
