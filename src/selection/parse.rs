//! # Selector value parsing
//!
//! Conversion of loosely-typed [`SelectorValue`]s into the typed payloads of
//! [`ObjectSelector`](super::ObjectSelector) and [`TimeSelector`](super::TimeSelector).
//!
//! ## Accepted text forms
//! -----------------
//! * **Integer** – optional `-` followed by digits (`"100"`, `"-3"`).
//! * **Calendar date** – `YYYYMMDD`, `YYYY-MM-DD` or `YYYY/MM/DD` (one separator kind per
//!   date), validated against the Gregorian calendar.
//! * **Range** – `"A:B"` with exactly one colon and a non-empty bound on each side. Ranges are
//!   inclusive at both ends and accepted only for dates and exposure-batch ids.
//!
//! ## Value shapes
//! -----------------
//! A selector value is flattened into scalars before conversion:
//! * a scalar (`Int` or `Text`) yields itself,
//! * a non-empty `List` of scalars yields its elements,
//! * a `File` yields one text scalar per non-empty field of each line.
//!
//! Floats, nested lists, lists containing files and empty lists are rejected with
//! [`FieldIoError::UnrecognizedSelector`].
use camino::Utf8Path;
use itertools::Itertools;
use nom::{
    branch::alt,
    bytes::complete::{is_not, take_while_m_n},
    character::complete::{char, digit1, one_of},
    combinator::{all_consuming, map_res, opt, recognize},
    sequence::separated_pair,
    IResult, Parser,
};
use thiserror::Error;

use crate::{
    constants::{ActionIdSpan, ObjectId, OBJ_ID_WIDTH},
    fieldio_errors::FieldIoError,
    time::ObsDate,
};

use super::SelectorValue;

/// Text-level parsing failures of selector values.
#[derive(Error, Debug, PartialEq)]
pub enum SelectorParseError {
    #[error("Invalid calendar date: {0}")]
    InvalidDate(String),
    #[error("Invalid integer: {0}")]
    InvalidInteger(String),
}

/// A flattened selector element.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Scalar {
    Int(i64),
    Text(String),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Int(v) => v.to_string(),
            Scalar::Text(s) => s,
        }
    }
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn year(input: &str) -> IResult<&str, i32> {
    map_res(take_while_m_n(4, 4, is_digit), |s: &str| s.parse::<i32>()).parse(input)
}

fn two_digits(input: &str) -> IResult<&str, u8> {
    map_res(take_while_m_n(2, 2, is_digit), |s: &str| s.parse::<u8>()).parse(input)
}

fn compact_date(input: &str) -> IResult<&str, (i32, u8, u8)> {
    (year, two_digits, two_digits).parse(input)
}

fn separated_date(input: &str) -> IResult<&str, (i32, u8, u8)> {
    let (input, y) = year(input)?;
    let (input, sep) = one_of("-/").parse(input)?;
    let (input, m) = two_digits(input)?;
    let (input, _) = char(sep).parse(input)?;
    let (input, d) = two_digits(input)?;
    Ok((input, (y, m, d)))
}

fn signed_integer(input: &str) -> IResult<&str, i64> {
    map_res(recognize((opt(char('-')), digit1)), |s: &str| s.parse::<i64>()).parse(input)
}

/// Parse a calendar date in any accepted form.
pub fn parse_date(text: &str) -> Result<ObsDate, SelectorParseError> {
    let parsed: IResult<&str, (i32, u8, u8)> =
        all_consuming(alt((separated_date, compact_date))).parse(text.trim());
    let (_, (y, m, d)) = parsed.map_err(|_| SelectorParseError::InvalidDate(text.to_string()))?;
    ObsDate::new(y, m, d)
}

/// Parse the leading date of an observation timestamp such as `2015-11-04T01:02:03`.
pub(crate) fn parse_date_prefix(text: &str) -> Option<ObsDate> {
    let text = text.trim();
    text.get(..10)
        .and_then(|head| parse_date(head).ok())
        .or_else(|| text.get(..8).and_then(|head| parse_date(head).ok()))
}

/// Parse a signed integer.
pub fn parse_integer(text: &str) -> Result<i64, SelectorParseError> {
    let parsed: IResult<&str, i64> = all_consuming(signed_integer).parse(text.trim());
    parsed
        .map(|(_, v)| v)
        .map_err(|_| SelectorParseError::InvalidInteger(text.to_string()))
}

/// Split an `"A:B"` range into its bounds.
///
/// Return
/// ------
/// * `Ok(None)` when the text contains no colon (not a range)
/// * `Ok(Some((a, b)))` for a well-formed range
/// * [`FieldIoError::MalformedRange`] when the text has a colon but is not exactly `A:B`
pub fn split_range(text: &str) -> Result<Option<(&str, &str)>, FieldIoError> {
    if !text.contains(':') {
        return Ok(None);
    }
    let parsed: IResult<&str, (&str, &str)> =
        all_consuming(separated_pair(is_not(":"), char(':'), is_not(":"))).parse(text.trim());
    match parsed {
        Ok((_, (a, b))) if !a.trim().is_empty() && !b.trim().is_empty() => {
            Ok(Some((a.trim(), b.trim())))
        }
        _ => Err(FieldIoError::MalformedRange(text.to_string())),
    }
}

/// Zero-pad an identifier to the canonical width.
///
/// ```rust
/// use fieldio::selection::parse::pad_object_id;
/// assert_eq!(pad_object_id("46"), "000046");
/// assert_eq!(pad_object_id("012118"), "012118");
/// ```
pub fn pad_object_id(id: &str) -> ObjectId {
    format!("{:0>width$}", id.trim(), width = OBJ_ID_WIDTH)
}

/// Read a list file: one value per line, `#` starts a comment line, blank lines are skipped.
pub(crate) fn read_list_file(path: &Utf8Path) -> Result<Vec<String>, FieldIoError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(path)?;

    let mut values = Vec::new();
    for record in reader.records() {
        let record = record?;
        values.extend(
            record
                .iter()
                .filter(|field| !field.is_empty())
                .map(str::to_string),
        );
    }
    Ok(values)
}

fn unrecognized(axis: &'static str, value: &SelectorValue) -> FieldIoError {
    FieldIoError::UnrecognizedSelector {
        axis,
        value: format!("{value:?}"),
    }
}

/// Flatten a selector value into scalars, reading list files on the way.
pub(crate) fn flatten(
    axis: &'static str,
    value: SelectorValue,
) -> Result<Vec<Scalar>, FieldIoError> {
    let scalars = match &value {
        SelectorValue::Int(v) => vec![Scalar::Int(*v)],
        SelectorValue::Text(s) => vec![Scalar::Text(s.clone())],
        SelectorValue::File(path) => read_list_file(path)?
            .into_iter()
            .map(Scalar::Text)
            .collect(),
        SelectorValue::List(items) => items
            .iter()
            .map(|item| match item {
                SelectorValue::Int(v) => Ok(Scalar::Int(*v)),
                SelectorValue::Text(s) => Ok(Scalar::Text(s.clone())),
                _ => Err(unrecognized(axis, &value)),
            })
            .collect::<Result<Vec<_>, _>>()?,
        SelectorValue::Float(_) => return Err(unrecognized(axis, &value)),
    };

    if scalars.is_empty() {
        return Err(unrecognized(axis, &value));
    }
    Ok(scalars)
}

/// Canonical identifiers, in input order with duplicates removed.
pub(crate) fn to_object_ids(value: SelectorValue) -> Result<Vec<ObjectId>, FieldIoError> {
    let original = value.clone();
    let ids = flatten("object", value)?
        .into_iter()
        .map(|scalar| match scalar {
            Scalar::Int(v) if v < 0 => Err(unrecognized("object", &original)),
            Scalar::Text(ref s) if s.trim().is_empty() => Err(unrecognized("object", &original)),
            other => Ok(pad_object_id(&other.into_text())),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids.into_iter().unique().collect())
}

/// Integers; `"A:B"` range text is not accepted here.
pub(crate) fn to_integers(
    axis: &'static str,
    value: SelectorValue,
) -> Result<Vec<i64>, FieldIoError> {
    to_spans(axis, value)?
        .into_iter()
        .map(|span| {
            if span.start() == span.end() {
                Ok(*span.start())
            } else {
                Err(FieldIoError::UnrecognizedSelector {
                    axis,
                    value: format!("{}:{}", span.start(), span.end()),
                })
            }
        })
        .collect()
}

/// Inclusive integer spans: `"A:B"` text gives `A..=B`, any other value a one-element span.
///
/// Ranges are kept unexpanded, so their width costs nothing until they are matched against
/// the exposure table.
pub(crate) fn to_spans(
    axis: &'static str,
    value: SelectorValue,
) -> Result<Vec<ActionIdSpan>, FieldIoError> {
    let mut out = Vec::new();
    for scalar in flatten(axis, value)? {
        match scalar {
            Scalar::Int(v) => out.push(v..=v),
            Scalar::Text(text) => match split_range(&text)? {
                Some((a, b)) => {
                    let start = parse_integer(a)?;
                    let end = parse_integer(b)?;
                    if end < start {
                        return Err(FieldIoError::MalformedRange(text));
                    }
                    out.push(start..=end);
                }
                None => {
                    let v = parse_integer(&text)?;
                    out.push(v..=v);
                }
            },
        }
    }
    Ok(out)
}

/// Calendar dates, with `"start:end"` text expanded to every day of the interval.
pub(crate) fn to_dates(value: SelectorValue) -> Result<Vec<ObsDate>, FieldIoError> {
    let mut out = Vec::new();
    for scalar in flatten("time", value)? {
        let text = scalar.into_text();
        match split_range(&text)? {
            Some((a, b)) => {
                let start = parse_date(a)?;
                let end = parse_date(b)?;
                if end < start {
                    return Err(FieldIoError::MalformedRange(text));
                }
                out.extend(start.days_through(&end));
            }
            None => out.push(parse_date(&text)?),
        }
    }
    Ok(out.into_iter().unique().collect())
}
