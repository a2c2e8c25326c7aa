//! Outbound MI commands and their wire encoding.

use std::time::{SystemTime, UNIX_EPOCH};

/// Builder for one MI command: `TOKEN-operation [options] [parameters]`.
/// Options keep insertion order; parameters are emitted verbatim, so
/// callers quote with [`mi_quote`] where the protocol demands it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiCommand {
    operation: String,
    options: Vec<(String, Option<String>)>,
    parameters: Vec<String>,
}

impl MiCommand {
    pub fn new(operation: impl Into<String>) -> Self {
        MiCommand {
            operation: operation.into(),
            options: Vec::new(),
            parameters: Vec::new(),
        }
    }

    pub fn opt(mut self, flag: &str) -> Self {
        self.options.push((flag.to_string(), None));
        self
    }

    pub fn opt_when(self, condition: bool, flag: &str) -> Self {
        if condition {
            self.opt(flag)
        } else {
            self
        }
    }

    pub fn opt_str(mut self, flag: &str, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.options.push((flag.to_string(), Some(value.to_string())));
        }
        self
    }

    pub fn opt_int(mut self, flag: &str, value: Option<i64>) -> Self {
        if let Some(value) = value {
            self.options.push((flag.to_string(), Some(value.to_string())));
        }
        self
    }

    pub fn param(mut self, parameter: impl Into<String>) -> Self {
        self.parameters.push(parameter.into());
        self
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Render the wire line (without the trailing newline).
    pub(crate) fn encode(&self, token: u64) -> String {
        let mut line = format!("{token}-{}", self.operation);
        for (flag, value) in &self.options {
            line.push(' ');
            line.push_str(flag);
            if let Some(value) = value {
                line.push(' ');
                line.push_str(value);
            }
        }
        for parameter in &self.parameters {
            line.push(' ');
            line.push_str(parameter);
        }
        line
    }
}

/// Quote a parameter the way MI expects, escaping the characters gdb
/// would otherwise interpret.
pub fn mi_quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

/// Strictly increasing command tokens, seeded from wall time so tokens
/// from distinct sessions against the same debugger rarely collide.
#[derive(Debug)]
pub struct TokenSequence {
    next: u64,
}

impl TokenSequence {
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(1);
        TokenSequence { next: seed }
    }

    pub fn from_seed(seed: u64) -> Self {
        TokenSequence { next: seed }
    }

    pub fn next(&mut self) -> u64 {
        let token = self.next;
        self.next += 1;
        token
    }
}

impl Default for TokenSequence {
    fn default() -> Self {
        TokenSequence::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_orders_options_before_parameters() {
        let command = MiCommand::new("break-insert")
            .opt("-t")
            .opt_str("-c", Some("x > 3"))
            .opt_int("-i", Some(2))
            .param("main.go:14");
        assert_eq!(command.encode(9), "9-break-insert -t -c x > 3 -i 2 main.go:14");
    }

    #[test]
    fn test_absent_option_values_are_skipped() {
        let command = MiCommand::new("exec-run")
            .opt_when(false, "--all")
            .opt_str("--thread-group", None)
            .opt_int("-p", None);
        assert_eq!(command.encode(1), "1-exec-run");
    }

    #[test]
    fn test_mi_quote_escapes() {
        assert_eq!(mi_quote("sizeof(\"a\tb\")"), "\"sizeof(\\\"a\\tb\\\")\"");
        assert_eq!(mi_quote("back\\slash"), "\"back\\\\slash\"");
    }

    #[test]
    fn test_tokens_strictly_increase() {
        let mut tokens = TokenSequence::from_seed(100);
        let drawn: Vec<u64> = (0..5).map(|_| tokens.next()).collect();
        assert_eq!(drawn, vec![100, 101, 102, 103, 104]);

        let mut seeded = TokenSequence::new();
        let first = seeded.next();
        assert!(seeded.next() > first);
    }
}
