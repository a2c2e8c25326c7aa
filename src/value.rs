//! Parser for MI result values: `"..."` strings, `{...}` tuples and
//! `[...]` lists, arbitrarily nested.

use std::fmt;

use crate::error::{MiError, Result};

/// A parsed MI value. Tuples keep their fields in wire order; lists may
/// mix bare values with `name=value` pairs, which parse as single-field
/// tuples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Tuple(Vec<(String, Value)>),
    List(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// First field with the given name, when this value is a tuple.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Tuple(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn items(&self) -> &[Value] {
        match self {
            Value::List(items) => items,
            _ => &[],
        }
    }

    /// String field lookup with a fallback, the shape almost every domain
    /// projection needs.
    pub fn string_field(&self, key: &str, default: &str) -> String {
        self.get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    }

    /// Numeric field; missing or unparseable counts as zero.
    pub fn u32_field(&self, key: &str) -> u32 {
        self.get(key)
            .and_then(Value::as_str)
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }

    /// MI encodes booleans as `"y"` / `"n"`.
    pub fn flag_field(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_str) == Some("y")
    }

    /// A list-of-strings field such as `thread-groups=["i1","i2"]`.
    pub fn string_list_field(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(Value::items)
            .unwrap_or(&[])
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    }
}

/// Parse one complete value; trailing input is an error.
pub fn parse_value(input: &str) -> Result<Value> {
    let mut cursor = Cursor::new(input);
    let value = cursor.value()?;
    cursor.skip_whitespace();
    if cursor.peek().is_some() {
        return Err(cursor.malformed("trailing input after value"));
    }
    Ok(value)
}

/// Parse the brace-less `key=value,key=value,...` payload of result and
/// async records. Empty input is an empty field list.
pub fn parse_fields(input: &str) -> Result<Vec<(String, Value)>> {
    let mut cursor = Cursor::new(input);
    cursor.skip_whitespace();
    let mut fields = Vec::new();
    if cursor.peek().is_none() {
        return Ok(fields);
    }
    loop {
        fields.push(cursor.field()?);
        cursor.skip_whitespace();
        match cursor.peek() {
            Some(b',') => cursor.bump(),
            None => return Ok(fields),
            Some(_) => return Err(cursor.malformed("expected ',' between fields")),
        }
    }
}

pub(crate) fn lookup<'a>(fields: &'a [(String, Value)], key: &str) -> Option<&'a Value> {
    fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

/// Integer literal from MI, decimal or `0x`-prefixed hex.
pub(crate) fn parse_u64(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    match trimmed.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => trimmed.parse().ok(),
    }
}

/// Unwrap and unescape a full double-quoted string, as found in stream
/// records. Returns None when the input is not one complete c-string.
pub(crate) fn unquote(input: &str) -> Option<String> {
    let mut cursor = Cursor::new(input);
    if cursor.peek() != Some(b'"') {
        return None;
    }
    let text = cursor.quoted().ok()?;
    cursor.skip_whitespace();
    if cursor.peek().is_some() {
        return None;
    }
    Some(text)
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Cursor { src, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn skip_whitespace(&mut self) {
        // gdb wraps long records; stray whitespace between tokens is noise.
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.bump();
        }
    }

    fn malformed(&self, reason: &'static str) -> MiError {
        MiError::MalformedValue {
            offset: self.pos,
            reason,
        }
    }

    fn value(&mut self) -> Result<Value> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'"') => Ok(Value::String(self.quoted()?)),
            Some(b'{') => self.tuple(),
            Some(b'[') => self.list(),
            Some(_) => {
                let word = self.bareword();
                if word.is_empty() {
                    Err(self.malformed("expected a value"))
                } else {
                    Ok(Value::String(word.to_string()))
                }
            }
            None => Err(self.malformed("expected a value, found end of input")),
        }
    }

    fn field(&mut self) -> Result<(String, Value)> {
        let key = self.key()?;
        self.skip_whitespace();
        if self.peek() != Some(b'=') {
            return Err(self.malformed("expected '=' after key"));
        }
        self.bump();
        Ok((key, self.value()?))
    }

    fn key(&mut self) -> Result<String> {
        self.skip_whitespace();
        if self.peek() == Some(b'"') {
            return self.quoted();
        }
        let word = self.bareword();
        if word.is_empty() {
            return Err(self.malformed("expected a key"));
        }
        Ok(word.to_string())
    }

    fn tuple(&mut self) -> Result<Value> {
        self.bump();
        self.skip_whitespace();
        let mut fields = Vec::new();
        if self.peek() == Some(b'}') {
            self.bump();
            return Ok(Value::Tuple(fields));
        }
        loop {
            fields.push(self.field()?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.bump(),
                Some(b'}') => {
                    self.bump();
                    return Ok(Value::Tuple(fields));
                }
                _ => return Err(self.malformed("expected ',' or '}' in tuple")),
            }
        }
    }

    fn list(&mut self) -> Result<Value> {
        self.bump();
        self.skip_whitespace();
        let mut items = Vec::new();
        if self.peek() == Some(b']') {
            self.bump();
            return Ok(Value::List(items));
        }
        loop {
            items.push(self.element()?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.bump(),
                Some(b']') => {
                    self.bump();
                    return Ok(Value::List(items));
                }
                _ => return Err(self.malformed("expected ',' or ']' in list")),
            }
        }
    }

    /// A list element is either a bare value or a `name=value` pair; gdb
    /// uses the latter for e.g. `stack=[frame={...},frame={...}]`.
    fn element(&mut self) -> Result<Value> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'"') | Some(b'{') | Some(b'[') => self.value(),
            Some(_) => {
                let word = self.bareword().to_string();
                if word.is_empty() {
                    return Err(self.malformed("expected a list element"));
                }
                self.skip_whitespace();
                if self.peek() == Some(b'=') {
                    self.bump();
                    let value = self.value()?;
                    Ok(Value::Tuple(vec![(word, value)]))
                } else {
                    Ok(Value::String(word))
                }
            }
            None => Err(self.malformed("unterminated list")),
        }
    }

    fn bareword(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || matches!(b, b'"' | b'{' | b'}' | b'[' | b']' | b'=' | b',')
            {
                break;
            }
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn quoted(&mut self) -> Result<String> {
        let open = self.pos;
        self.bump();
        let mut out = String::new();
        let mut segment = self.pos;
        loop {
            match self.peek() {
                Some(b'"') => {
                    out.push_str(&self.src[segment..self.pos]);
                    self.bump();
                    return Ok(out);
                }
                Some(b'\\') => {
                    out.push_str(&self.src[segment..self.pos]);
                    self.bump();
                    match self.peek() {
                        Some(b'n') => {
                            out.push('\n');
                            self.bump();
                        }
                        Some(b't') => {
                            out.push('\t');
                            self.bump();
                        }
                        Some(b'\\') => {
                            out.push('\\');
                            self.bump();
                        }
                        Some(b'"') => {
                            out.push('"');
                            self.bump();
                        }
                        // Unknown escapes pass through untouched; gdb emits
                        // things like \000 that downstream tools render.
                        Some(other) if other.is_ascii() => {
                            out.push('\\');
                            out.push(other as char);
                            self.bump();
                        }
                        // Non-ascii after a backslash: keep the backslash
                        // and let the byte rejoin the raw segment.
                        Some(_) => out.push('\\'),
                        None => {
                            return Err(MiError::MalformedValue {
                                offset: open,
                                reason: "unterminated quoted string",
                            })
                        }
                    }
                    segment = self.pos;
                }
                Some(_) => self.bump(),
                None => {
                    return Err(MiError::MalformedValue {
                        offset: open,
                        reason: "unterminated quoted string",
                    })
                }
            }
        }
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    write!(f, "\"")?;
    for ch in text.chars() {
        match ch {
            '\\' => write!(f, "\\\\")?,
            '"' => write!(f, "\\\"")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            _ => write!(f, "{ch}")?,
        }
    }
    write!(f, "\"")
}

/// Canonical re-serialisation. Parsing the output yields a structurally
/// equal tree; single-field tuples inside lists print as `name=value`,
/// which is the shape they were parsed from.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write_escaped(f, s),
            Value::Tuple(fields) => {
                write!(f, "{{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{key}={value}")?;
                }
                write!(f, "}}")
            }
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    match item {
                        Value::Tuple(fields) if fields.len() == 1 => {
                            write!(f, "{}={}", fields[0].0, fields[0].1)?
                        }
                        other => write!(f, "{other}")?,
                    }
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BKPT: &str = r#"{number="1",type="breakpoint",disp="keep",enabled="y",addr="0x00000000004214a0",func="main",file="/usr/local/go/src/pkg/runtime/rt0_linux_amd64.s",fullname="/usr/local/go/src/pkg/runtime/rt0_linux_amd64.s",line="14",thread-groups=["i1"],times="1",original-location="main"}"#;

    #[test]
    fn test_quoted_strings_unescape() {
        let v = parse_value(r#""foo\nbar\t\"baz\"\\""#).unwrap();
        assert_eq!(v.as_str(), Some("foo\nbar\t\"baz\"\\"));
    }

    #[test]
    fn test_unknown_escapes_pass_through() {
        let v = parse_value(r#""a\000b""#).unwrap();
        assert_eq!(v.as_str(), Some("a\\000b"));
    }

    #[test]
    fn test_breakpoint_payload() {
        let v = parse_value(BKPT).unwrap();
        assert_eq!(v.string_field("number", ""), "1");
        assert_eq!(v.string_field("disp", ""), "keep");
        assert_eq!(v.string_field("addr", ""), "0x00000000004214a0");
        assert!(v.flag_field("enabled"));
        assert_eq!(v.u32_field("line"), 14);
        assert_eq!(v.string_list_field("thread-groups"), vec!["i1"]);
        assert_eq!(v.string_field("original-location", ""), "main");
    }

    #[test]
    fn test_stopped_payload_with_nested_frame() {
        let fields = parse_fields(
            r#"reason="breakpoint-hit",disp="keep",bkptno="1",frame={addr="0x0000000000400d10",func="main.sub",args=[{name="s2",value="..."},{name="s1",value="..."}],file="main.go",line="14"},thread-id="1",stopped-threads="all",core="0""#,
        )
        .unwrap();
        let record = Value::Tuple(fields);
        assert_eq!(record.string_field("reason", ""), "breakpoint-hit");
        let frame = record.get("frame").unwrap();
        assert_eq!(frame.string_field("func", ""), "main.sub");
        let args = frame.get("args").unwrap();
        assert_eq!(args.items().len(), 2);
        assert_eq!(args.items()[0].string_field("name", ""), "s2");
        assert_eq!(record.string_field("core", ""), "0");
    }

    #[test]
    fn test_empty_tuple_and_list() {
        assert_eq!(parse_value("{}").unwrap(), Value::Tuple(vec![]));
        assert_eq!(parse_value("[]").unwrap(), Value::List(vec![]));
    }

    #[test]
    fn test_list_of_named_tuples() {
        let v = parse_value(r#"[frame={level="0"},frame={level="1"}]"#).unwrap();
        let items = v.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].get("frame").unwrap().string_field("level", ""), "0");
        assert_eq!(items[1].get("frame").unwrap().string_field("level", ""), "1");
    }

    #[test]
    fn test_heterogeneous_list() {
        let v = parse_value(r#"["bare",key="named",{inner="1"}]"#).unwrap();
        let items = v.items();
        assert_eq!(items[0].as_str(), Some("bare"));
        assert_eq!(items[1].string_field("key", ""), "named");
        assert_eq!(items[2].string_field("inner", ""), "1");
    }

    #[test]
    fn test_whitespace_between_tokens() {
        // Documentation-style MI output arrives line-wrapped.
        let v = parse_value(
            "{level=\"1\",addr=\"0x0001076c\",func=\"callee3\",\n     file=\"basics.c\",\n     fullname=\"/asdfasdf/basics.c\",line=\"17\"}",
        )
        .unwrap();
        assert_eq!(v.string_field("func", ""), "callee3");
        assert_eq!(v.u32_field("line"), 17);
    }

    #[test]
    fn test_unterminated_string_reports_offset() {
        match parse_value(r#"{key="oops}"#).unwrap_err() {
            MiError::MalformedValue { offset, reason } => {
                assert_eq!(offset, 5);
                assert_eq!(reason, "unterminated quoted string");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_equals_fails() {
        assert!(matches!(
            parse_value(r#"{key"v"}"#),
            Err(MiError::MalformedValue { .. })
        ));
    }

    #[test]
    fn test_unbalanced_bracket_fails() {
        assert!(matches!(
            parse_value(r#"[{a="1"}"#),
            Err(MiError::MalformedValue { .. })
        ));
        assert!(matches!(
            parse_value(r#"{a="1""#),
            Err(MiError::MalformedValue { .. })
        ));
    }

    #[test]
    fn test_parse_fields_top_level() {
        let fields = parse_fields(r#"depth="12""#).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].0, "depth");
        assert!(parse_fields("").unwrap().is_empty());
    }

    #[test]
    fn test_quoted_comma_does_not_split_fields() {
        // The reason naive comma-splitting is wrong.
        let fields = parse_fields(r#"msg="a, b, c",key="v""#).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].1.as_str(), Some("a, b, c"));
    }

    #[test]
    fn test_canonical_reserialisation_roundtrip() {
        for input in [
            BKPT,
            r#"[frame={level="0",args=[]},frame={level="1",args=[{name="x",value="9"}]}]"#,
            r#"{a={},b=[],c="q\"uote"}"#,
        ] {
            let first = parse_value(input).unwrap();
            let second = parse_value(&first.to_string()).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_parse_u64_hex_and_decimal() {
        assert_eq!(parse_u64("0x400d10"), Some(0x0040_0d10));
        assert_eq!(parse_u64("4242"), Some(4242));
        assert_eq!(parse_u64("zz"), None);
    }

    #[test]
    fn test_unquote_stream_payload() {
        assert_eq!(unquote(r#""hello\n""#).as_deref(), Some("hello\n"));
        assert_eq!(unquote("not quoted"), None);
    }
}
