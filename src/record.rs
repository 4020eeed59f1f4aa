//! Positional tokenizer for Apache-combined-like access log lines.
//!
//! The layout is fixed: `ip - - [DD/Mon/YYYY:HH:MM:SS +ZZZZ] "METHOD URI PROTO" CODE SIZE "REF" "UA..."`.
//! Lines that are too short never fail; fields whose tokens are missing resolve to `""`.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub const DEFAULT_SEPARATOR: char = ' ';

/// The closed set of fields extracted from every line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Ip,
    Date,
    Code,
    Method,
    Uri,
    Protocol,
    Request,
    Ua,
    Ref,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Ip,
        Field::Date,
        Field::Code,
        Field::Method,
        Field::Uri,
        Field::Protocol,
        Field::Request,
        Field::Ua,
        Field::Ref,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Ip => "ip",
            Field::Date => "date",
            Field::Code => "code",
            Field::Method => "method",
            Field::Uri => "uri",
            Field::Protocol => "protocol",
            Field::Request => "request",
            Field::Ua => "ua",
            Field::Ref => "ref",
        }
    }
}

impl FromStr for Field {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.as_str() == name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogRecord {
    pub ip: String,
    pub date: String,
    pub code: String,
    pub method: String,
    pub uri: String,
    pub protocol: String,
    pub request: String,
    pub ua: String,
    pub referrer: String,
}

impl LogRecord {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Ip => &self.ip,
            Field::Date => &self.date,
            Field::Code => &self.code,
            Field::Method => &self.method,
            Field::Uri => &self.uri,
            Field::Protocol => &self.protocol,
            Field::Request => &self.request,
            Field::Ua => &self.ua,
            Field::Ref => &self.referrer,
        }
    }

    pub fn is_short(&self) -> bool {
        self.ua.is_empty() && self.referrer.is_empty() && self.code.is_empty()
    }
}

/// Char-based `s[start..end]`, clamped like a slice that never panics.
fn char_slice(s: &str, start: usize, end: usize) -> String {
    s.chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect()
}

fn drop_first(s: &str) -> &str {
    let mut chars = s.chars();
    chars.next();
    chars.as_str()
}

fn drop_last(s: &str) -> &str {
    let mut chars = s.chars();
    chars.next_back();
    chars.as_str()
}

/// Strips one char from each end; strings shorter than two chars become empty.
fn drop_ends(s: &str) -> &str {
    drop_last(drop_first(s))
}

pub fn parse_line(line: &str, sep: char) -> LogRecord {
    let chunk: Vec<&str> = line.split(sep).collect();
    let token = |i: usize| chunk.get(i).copied().unwrap_or("");
    let has = |n: usize| chunk.len() >= n;

    let method = if has(5) { drop_first(token(5)).trim() } else { "" };
    let uri = if has(6) { token(6).trim() } else { "" };
    let protocol = if has(7) { drop_last(token(7)).trim() } else { "" };
    let request = if has(7) {
        format!(
            "{} {} {}",
            drop_first(token(5)),
            token(6),
            drop_last(token(7))
        )
        .trim()
        .to_string()
    } else {
        String::new()
    };
    let (referrer, ua) = if has(11) {
        let ua = chunk[11..].join(" ");
        (
            drop_ends(token(10)).trim().to_string(),
            drop_ends(ua.trim()).to_string(),
        )
    } else {
        (String::new(), String::new())
    };

    LogRecord {
        ip: token(0).trim().to_string(),
        date: char_slice(token(3), 1, 12).trim().to_string(),
        code: if has(8) { token(8).trim() } else { "" }.to_string(),
        method: method.to_string(),
        uri: uri.to_string(),
        protocol: protocol.to_string(),
        request,
        ua,
        referrer,
    }
}
