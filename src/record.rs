//! Classification of raw MI output lines into records.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{MiError, Result};
use crate::value::{parse_fields, unquote, Value};

/// One classified line of debugger output. Every line classifies to
/// exactly one record; anything without a recognised sentinel is `Raw`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Result {
        token: Option<u64>,
        class: String,
        rest: String,
    },
    ExecAsync {
        token: Option<u64>,
        class: String,
        rest: String,
    },
    StatusAsync {
        token: Option<u64>,
        class: String,
        rest: String,
    },
    NotifyAsync {
        token: Option<u64>,
        class: String,
        rest: String,
    },
    ConsoleStream(String),
    TargetStream(String),
    LogStream(String),
    Prompt,
    Raw(String),
}

/// `TOKEN?` `sentinel` `class` `,rest`?. One pattern, one match per line.
fn record_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d*)([\^*+=])([A-Za-z][A-Za-z0-9_-]*)(?:,(.*))?$")
            .expect("record pattern is valid")
    })
}

pub fn classify(line: &str) -> Record {
    let line = line.trim_end();
    if line == "(gdb)" {
        return Record::Prompt;
    }
    if let Some(rest) = line.strip_prefix('~') {
        return Record::ConsoleStream(stream_text(rest));
    }
    if let Some(rest) = line.strip_prefix('@') {
        return Record::TargetStream(stream_text(rest));
    }
    if let Some(rest) = line.strip_prefix('&') {
        return Record::LogStream(stream_text(rest));
    }
    if let Some(caps) = record_pattern().captures(line) {
        let token = match &caps[1] {
            "" => None,
            digits => digits.parse().ok(),
        };
        let class = caps[3].to_string();
        let rest = caps.get(4).map(|m| m.as_str().to_string()).unwrap_or_default();
        return match &caps[2] {
            "^" => Record::Result { token, class, rest },
            "*" => Record::ExecAsync { token, class, rest },
            "+" => Record::StatusAsync { token, class, rest },
            _ => Record::NotifyAsync { token, class, rest },
        };
    }
    Record::Raw(line.to_string())
}

/// Stream payloads are c-strings; fall back to the raw text when the
/// quoting is broken rather than losing the line.
fn stream_text(rest: &str) -> String {
    unquote(rest).unwrap_or_else(|| rest.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultClass {
    Done,
    Running,
    Connected,
    Error,
    Exit,
}

impl ResultClass {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "done" => Some(ResultClass::Done),
            "running" => Some(ResultClass::Running),
            "connected" => Some(ResultClass::Connected),
            "error" => Some(ResultClass::Error),
            "exit" => Some(ResultClass::Exit),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ResultClass::Done => "done",
            ResultClass::Running => "running",
            ResultClass::Connected => "connected",
            ResultClass::Error => "error",
            ResultClass::Exit => "exit",
        }
    }
}

/// The decoded synchronous reply to one command. `rest` keeps the raw
/// `key=value,...` payload for the operation layer to project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub class: ResultClass,
    pub rest: String,
}

impl Outcome {
    pub fn fields(&self) -> Result<Vec<(String, Value)>> {
        parse_fields(&self.rest)
    }

    /// The `msg="..."` payload of an `^error` record; the whole payload
    /// when there is no such field.
    pub fn error_message(&self) -> String {
        parse_fields(&self.rest)
            .ok()
            .and_then(|fields| {
                fields
                    .into_iter()
                    .find(|(key, _)| key == "msg")
                    .and_then(|(_, value)| match value {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
            })
            .unwrap_or_else(|| self.rest.clone())
    }
}

pub fn decode_result(class: &str, rest: &str) -> Result<Outcome> {
    let class = ResultClass::from_name(class)
        .ok_or_else(|| MiError::UnknownResultClass(class.to_string()))?;
    Ok(Outcome {
        class,
        rest: rest.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_with_trailing_space() {
        assert_eq!(classify("(gdb) "), Record::Prompt);
        assert_eq!(classify("(gdb)"), Record::Prompt);
    }

    #[test]
    fn test_result_with_and_without_token() {
        assert_eq!(
            classify("7^done,bkpt={number=\"1\"}"),
            Record::Result {
                token: Some(7),
                class: "done".into(),
                rest: "bkpt={number=\"1\"}".into(),
            }
        );
        assert_eq!(
            classify("^done"),
            Record::Result {
                token: None,
                class: "done".into(),
                rest: String::new(),
            }
        );
    }

    #[test]
    fn test_async_sentinels() {
        assert!(matches!(
            classify("*stopped,reason=\"breakpoint-hit\""),
            Record::ExecAsync { token: None, ref class, .. } if class == "stopped"
        ));
        assert!(matches!(
            classify("42+download,section=\".text\""),
            Record::StatusAsync { token: Some(42), .. }
        ));
        assert!(matches!(
            classify("=thread-group-started,id=\"i1\",pid=\"4242\""),
            Record::NotifyAsync { token: None, ref class, .. } if class == "thread-group-started"
        ));
    }

    #[test]
    fn test_stream_records_unescape() {
        assert_eq!(
            classify("~\"hello\\n\""),
            Record::ConsoleStream("hello\n".into())
        );
        assert_eq!(classify("@\"raw out\""), Record::TargetStream("raw out".into()));
        assert_eq!(classify("&\"warn\\n\""), Record::LogStream("warn\n".into()));
    }

    #[test]
    fn test_broken_stream_quoting_keeps_text() {
        assert_eq!(
            classify("~\"unterminated"),
            Record::ConsoleStream("\"unterminated".into())
        );
    }

    #[test]
    fn test_unmatched_lines_are_raw() {
        assert_eq!(
            classify("Reading symbols from ./a.out..."),
            Record::Raw("Reading symbols from ./a.out...".into())
        );
        // Looks vaguely like an assignment but carries no sentinel.
        assert_eq!(classify("1+2=3"), Record::Raw("1+2=3".into()));
    }

    #[test]
    fn test_every_line_classifies_once() {
        // Totality: classify never panics and always yields one record.
        for line in ["", "^", "*", "=x", "999", "~", "(gdb) extra"] {
            let _ = classify(line);
        }
    }

    #[test]
    fn test_result_class_mapping() {
        for (name, class) in [
            ("done", ResultClass::Done),
            ("running", ResultClass::Running),
            ("connected", ResultClass::Connected),
            ("error", ResultClass::Error),
            ("exit", ResultClass::Exit),
        ] {
            assert_eq!(decode_result(name, "").unwrap().class, class);
            assert_eq!(class.name(), name);
        }
        assert!(matches!(
            decode_result("bogus", ""),
            Err(MiError::UnknownResultClass(_))
        ));
    }

    #[test]
    fn test_error_message_extraction() {
        let outcome = decode_result("error", r#"msg="No symbol \"x\" in current context.""#).unwrap();
        assert_eq!(outcome.error_message(), "No symbol \"x\" in current context.");
        let bare = decode_result("error", "something went wrong").unwrap();
        assert_eq!(bare.error_message(), "something went wrong");
    }
}
