use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Parses any RFC 3339 instant. Used by the scanner, which only needs to know
/// whether a row is due.
pub fn parse_instant(value: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(value.trim(), &Rfc3339).ok()
}

/// Parses the ingestion format: `YYYY-MM-DDTHH:MM:SS[.fff]Z`, UTC only, with at
/// most three fractional digits.
pub fn parse_strict_utc(value: &str) -> Option<OffsetDateTime> {
    if !has_strict_utc_shape(value) {
        return None;
    }
    OffsetDateTime::parse(value, &Rfc3339).ok()
}

fn has_strict_utc_shape(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() < 20 || bytes.last() != Some(&b'Z') {
        return false;
    }

    let head = &bytes[..19];
    let digits_at = [0, 1, 2, 3, 5, 6, 8, 9, 11, 12, 14, 15, 17, 18];
    if !digits_at.iter().all(|&i| head[i].is_ascii_digit()) {
        return false;
    }
    if head[4] != b'-' || head[7] != b'-' || head[10] != b'T' || head[13] != b':' || head[16] != b':'
    {
        return false;
    }

    let fraction = &bytes[19..bytes.len() - 1];
    match fraction {
        [] => true,
        [b'.', rest @ ..] => (1..=3).contains(&rest.len()) && rest.iter().all(u8::is_ascii_digit),
        _ => false,
    }
}

/// Formats an instant as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn format_utc(instant: OffsetDateTime) -> String {
    let format = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    );
    instant
        .to_offset(UtcOffset::UTC)
        .format(&format)
        .unwrap_or_else(|_| instant.unix_timestamp().to_string())
}

pub fn now_utc() -> String {
    format_utc(OffsetDateTime::now_utc())
}
