use thiserror::Error;
use time::{
    PrimitiveDateTime, UtcDateTime, format_description::BorrowedFormatItem,
    macros::format_description,
};

/// Fixed-width ISO-8601 layout, so stored timestamps sort chronologically as text.
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Invalid timestamp {0:?}")]
pub struct InvalidTimestampError(String);

#[must_use]
pub fn format_timestamp(timestamp: UtcDateTime) -> String {
    PrimitiveDateTime::new(timestamp.date(), timestamp.time())
        .format(TIMESTAMP_FORMAT)
        .expect("Timestamp components are always formattable")
}

pub fn parse_timestamp(timestamp: &str) -> Result<UtcDateTime, InvalidTimestampError> {
    PrimitiveDateTime::parse(timestamp, TIMESTAMP_FORMAT)
        .map(PrimitiveDateTime::as_utc)
        .map_err(|_| InvalidTimestampError(timestamp.to_owned()))
}

/// Removes everything that looks like an HTML tag, keeping the text between tags.
///
/// An unterminated `<` is kept as text.
#[must_use]
pub fn strip_markup(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find('<') {
        let Some(end) = rest[start..].find('>') else {
            break;
        };
        output.push_str(&rest[..start]);
        rest = &rest[start + end + 1..];
    }
    output.push_str(rest);

    output
}
