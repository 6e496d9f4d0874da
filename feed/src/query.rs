//! Query parameter templates.
//!
//! A template is literal text with `{{ ... }}` actions drawn from a closed
//! function set:
//!
//! - `lastNDays N "FORMAT"`: the UTC time N days ago, formatted with FORMAT
//! - `now "FORMAT"`: the current UTC time, formatted with FORMAT
//!
//! FORMAT is a chrono strftime pattern (`%Y-%m-%d`). Numeric reference
//! layouts such as `2006-01-02` are translated to strftime when the pattern
//! contains no `%`.
//!
//! Templates are parsed once when the configuration is resolved and rendered
//! on every fetch, so relative dates stay fresh. Parsing validates every
//! format, which makes rendering infallible.

use chrono::format::{Item as FormatItem, StrftimeItems};
use chrono::{DateTime, TimeDelta, Utc};
use errors::ConfigError;
use std::fmt::Write as _;
use std::str::FromStr;

/// Largest day count accepted by `lastNDays`.
const MAX_DAYS: u32 = 36_500;

/// Numeric reference-layout tokens and their strftime equivalents.
const REFERENCE_LAYOUT: &[(&str, &str)] = &[
    ("2006", "%Y"),
    ("01", "%m"),
    ("02", "%d"),
    ("15", "%H"),
    ("04", "%M"),
    ("05", "%S"),
];

/// A parsed, render-ready query parameter template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    text: String,
    segments: Vec<Segment>
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Call(Function)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Function {
    LastNDays { days: u32, format: String },
    Now { format: String }
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Word(String),
    Str(String)
}

impl QueryTemplate {
    /// Parses and validates `text` without evaluating it.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let malformed = |reason: String| ConfigError::MalformedTemplate {
            template: text.to_string(),
            reason
        };

        let mut segments = Vec::new();
        let mut rest = text;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let after_open = &rest[start + 2..];
            let end = find_action_end(after_open)
                .ok_or_else(|| malformed("unclosed action, expected '}}'".to_string()))?;
            let function = parse_action(&after_open[..end]).map_err(malformed)?;
            segments.push(Segment::Call(function));
            rest = &after_open[end + 2..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            text: text.to_string(),
            segments
        })
    }

    /// Renders the template against the current wall-clock time.
    pub fn render(&self) -> String {
        self.render_at(Utc::now())
    }

    /// Renders the template against `now`.
    pub fn render_at(&self, now: DateTime<Utc>) -> String {
        let mut out = String::with_capacity(self.text.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Call(function) => function.write_to(&mut out, now)
            }
        }
        out
    }

    /// The template source text.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl FromStr for QueryTemplate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Function {
    fn write_to(&self, out: &mut String, now: DateTime<Utc>) {
        let (at, format) = match self {
            Self::LastNDays { days, format } => (
                now.checked_sub_signed(TimeDelta::days(i64::from(*days)))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC),
                format
            ),
            Self::Now { format } => (now, format)
        };
        // Formats are validated at parse time; writing into a String cannot fail.
        let _ = write!(out, "{}", at.format(format));
    }
}

/// Byte offset of the closing `}}`, skipping braces inside quoted strings.
fn find_action_end(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
        } else if b == b'"' {
            in_string = true;
        } else if b == b'}' && bytes.get(i + 1) == Some(&b'}') {
            return Some(i);
        }
    }
    None
}

fn parse_action(body: &str) -> Result<Function, String> {
    let mut tokens = tokenize(body)?.into_iter();

    let name = match tokens.next() {
        Some(Token::Word(name)) => name,
        Some(Token::Str(_)) => return Err("action must start with a function name".to_string()),
        None => return Err("empty action".to_string())
    };
    let args: Vec<Token> = tokens.collect();

    match name.as_str() {
        "lastNDays" => match args.as_slice() {
            [Token::Word(days), Token::Str(format)] => Ok(Function::LastNDays {
                days: parse_days(days)?,
                format: checked_format(format)?
            }),
            _ => Err("lastNDays expects a day count and a quoted format, e.g. lastNDays 2 \"%Y-%m-%d\"".to_string())
        },
        "now" => match args.as_slice() {
            [Token::Str(format)] => Ok(Function::Now {
                format: checked_format(format)?
            }),
            _ => Err("now expects a quoted format, e.g. now \"%Y-%m-%d\"".to_string())
        },
        other => Err(format!("function \"{other}\" not defined"))
    }
}

fn tokenize(body: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = body.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c == '"' {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some('"') => value.push('"'),
                        Some('\\') => value.push('\\'),
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some(other) => return Err(format!("unknown escape sequence '\\{other}'")),
                        None => return Err("unterminated quoted string".to_string())
                    },
                    Some(ch) => value.push(ch),
                    None => return Err("unterminated quoted string".to_string())
                }
            }
            tokens.push(Token::Str(value));
        } else {
            let mut word = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() || ch == '"' {
                    break;
                }
                word.push(ch);
                chars.next();
            }
            tokens.push(Token::Word(word));
        }
    }

    Ok(tokens)
}

fn parse_days(raw: &str) -> Result<u32, String> {
    let days: u32 = raw
        .parse()
        .map_err(|_| format!("day count must be a non-negative integer, got '{raw}'"))?;
    if days > MAX_DAYS {
        return Err(format!("day count {days} exceeds the maximum of {MAX_DAYS}"));
    }
    Ok(days)
}

fn checked_format(raw: &str) -> Result<String, String> {
    let format = translate_reference_layout(raw);
    if StrftimeItems::new(&format).any(|item| matches!(item, FormatItem::Error)) {
        return Err(format!("invalid date format \"{raw}\""));
    }
    Ok(format)
}

fn translate_reference_layout(layout: &str) -> String {
    if layout.contains('%') || !layout.contains("2006") {
        return layout.to_string();
    }

    let mut out = String::with_capacity(layout.len() + 8);
    let mut rest = layout;
    'scan: while !rest.is_empty() {
        for (reference, strftime) in REFERENCE_LAYOUT {
            if let Some(tail) = rest.strip_prefix(reference) {
                out.push_str(strftime);
                rest = tail;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(ch) = chars.next() {
            out.push(ch);
        }
        rest = chars.as_str();
    }
    out
}
