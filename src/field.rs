//! Group field specifications (`name[:format]`) and value rendering.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::record::{Field, LogRecord};

/// Column delimiter appended to every rendered value.
pub const COLUMN_SEPARATOR: char = '\t';

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Right,
    Center,
}

/// String format spec: `[[fill]align][0][width][.precision][s]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    fill: char,
    align: Align,
    width: usize,
    precision: Option<usize>,
}

impl Default for Format {
    fn default() -> Self {
        Self {
            fill: ' ',
            align: Align::Left,
            width: 0,
            precision: None,
        }
    }
}

fn align_of(c: char) -> Option<Align> {
    match c {
        '<' => Some(Align::Left),
        '>' => Some(Align::Right),
        '^' => Some(Align::Center),
        _ => None,
    }
}

fn take_digits(spec: &str, chars: &[char], pos: &mut usize) -> Result<Option<usize>> {
    let start = *pos;
    while *pos < chars.len() && chars[*pos].is_ascii_digit() {
        *pos += 1;
    }
    if start == *pos {
        return Ok(None);
    }
    chars[start..*pos]
        .iter()
        .collect::<String>()
        .parse()
        .map(Some)
        .map_err(|_| Error::invalid_format(spec, "too many decimal digits"))
}

impl Format {
    pub fn parse(spec: &str) -> Result<Self> {
        let chars: Vec<char> = spec.chars().collect();
        let mut format = Format::default();
        let mut pos = 0;
        let mut explicit_fill = false;

        if let Some(align) = chars.get(1).copied().and_then(align_of) {
            format.fill = chars[0];
            format.align = align;
            explicit_fill = true;
            pos = 2;
        } else if let Some(align) = chars.first().copied().and_then(align_of) {
            format.align = align;
            pos = 1;
        }

        if chars.get(pos) == Some(&'0') {
            if !explicit_fill {
                format.fill = '0';
            }
            pos += 1;
        }
        if let Some(width) = take_digits(spec, &chars, &mut pos)? {
            format.width = width;
        }
        if chars.get(pos) == Some(&'.') {
            pos += 1;
            let precision = take_digits(spec, &chars, &mut pos)?
                .ok_or_else(|| Error::invalid_format(spec, "precision needs digits after '.'"))?;
            format.precision = Some(precision);
        }
        if chars.get(pos) == Some(&'s') {
            pos += 1;
        }
        if pos != chars.len() {
            return Err(Error::invalid_format(
                spec,
                format!("unexpected '{}' in string format", chars[pos]),
            ));
        }
        Ok(format)
    }

    pub fn apply(&self, value: &str) -> String {
        let truncated: String = match self.precision {
            Some(p) => value.chars().take(p).collect(),
            None => value.to_string(),
        };
        let len = truncated.chars().count();
        if len >= self.width {
            return truncated;
        }
        let pad = self.width - len;
        let (left, right) = match self.align {
            Align::Left => (0, pad),
            Align::Right => (pad, 0),
            Align::Center => (pad / 2, pad - pad / 2),
        };
        let mut out = String::with_capacity(truncated.len() + pad);
        out.extend(std::iter::repeat(self.fill).take(left));
        out.push_str(&truncated);
        out.extend(std::iter::repeat(self.fill).take(right));
        out
    }
}

/// A field name plus its display format, parsed from `name[:format]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: Field,
    pub format: Format,
    raw: String,
}

impl FieldSpec {
    pub fn render(&self, record: &LogRecord) -> String {
        let mut value = self.format.apply(record.get(self.field));
        value.push(COLUMN_SEPARATOR);
        value
    }
}

impl FromStr for FieldSpec {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        let (name, format) = token.split_once(':').unwrap_or((token, ""));
        Ok(FieldSpec {
            field: name.trim().parse()?,
            format: Format::parse(format)?,
            raw: token.to_string(),
        })
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One column of the grouping key: a single spec or a composite of several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupField {
    Single(FieldSpec),
    Composite(Vec<FieldSpec>),
}

impl GroupField {
    pub fn composite<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        if tokens.is_empty() {
            return Err(Error::EmptyGroup);
        }
        let specs = tokens
            .iter()
            .map(|t| t.as_ref().parse())
            .collect::<Result<Vec<FieldSpec>>>()?;
        Ok(GroupField::Composite(specs))
    }

    pub fn specs(&self) -> &[FieldSpec] {
        match self {
            GroupField::Single(spec) => std::slice::from_ref(spec),
            GroupField::Composite(specs) => specs,
        }
    }

    pub fn render(&self, record: &LogRecord) -> String {
        match self {
            GroupField::Single(spec) => spec.render(record),
            GroupField::Composite(specs) => specs.iter().map(|s| s.render(record)).collect(),
        }
    }

    /// Indexes of every `date` component within this column.
    pub fn date_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.specs()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.field == Field::Date)
            .map(|(i, _)| i)
    }
}

/// CLI form: a comma joins the parts of a composite column.
impl FromStr for GroupField {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        if token.contains(',') {
            let parts: Vec<&str> = token.split(',').filter(|p| !p.is_empty()).collect();
            GroupField::composite(&parts)
        } else {
            Ok(GroupField::Single(token.parse()?))
        }
    }
}

impl fmt::Display for GroupField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupField::Single(spec) => write!(f, "'{spec}'"),
            GroupField::Composite(specs) => {
                f.write_str("[")?;
                for (i, spec) in specs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{spec}'")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Renders the whole key path for one record, one element per group field.
pub fn key_path(fields: &[GroupField], record: &LogRecord) -> Vec<String> {
    fields.iter().map(|f| f.render(record)).collect()
}

/// `DD/Mon/YYYY` to `YYYY-MM-DD`. Tabs are dropped first; anything else passes
/// through the month substitution and component reversal unchanged.
pub fn normalize_date(text: &str) -> String {
    let mut value = text.replace(COLUMN_SEPARATOR, "");
    for (i, month) in MONTHS.iter().enumerate() {
        value = value.replace(month, &format!("{:02}", i + 1));
    }
    value.rsplit('/').collect::<Vec<_>>().join("-")
}
