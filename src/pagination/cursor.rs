use chrono::{DateTime, FixedOffset, LocalResult, SecondsFormat, TimeZone};
use chrono_tz::Tz;

use super::CursorError;
use crate::auth::TokenCodec;

/// Earliest and latest year a history window may start in
const MIN_YEAR: i32 = 1970;
const MAX_YEAR: i32 = 9998;

/// Resume point of a monthly transaction history scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionCursor {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub offset: i64,
}

enum Zone {
    Fixed(FixedOffset),
    Named(Tz),
}

fn parse_zone(timezone: &str) -> Result<Zone, CursorError> {
    let timezone = timezone.trim();
    if timezone.is_empty() {
        return Ok(Zone::Fixed(FixedOffset::east_opt(0).ok_or_else(|| {
            CursorError::Timezone(timezone.to_string())
        })?));
    }
    if let Some(offset) = parse_offset(timezone) {
        return Ok(Zone::Fixed(offset));
    }
    timezone
        .parse::<Tz>()
        .map(Zone::Named)
        .map_err(|_| CursorError::Timezone(timezone.to_string()))
}

/// `+HH:MM` or `-HH:MM`
fn parse_offset(text: &str) -> Option<FixedOffset> {
    let bytes = text.as_bytes();
    if bytes.len() != 6 || bytes[3] != b':' {
        return None;
    }
    let sign = match bytes[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let hours: i32 = text.get(1..3)?.parse().ok()?;
    let minutes: i32 = text.get(4..6)?.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Local midnight on the first of the month; a DST gap at midnight moves it to the
/// first instant that exists.
fn month_start<Z: TimeZone>(zone: &Z, year: i32, month: u32) -> Option<DateTime<FixedOffset>> {
    for hour in 0..3 {
        match zone.with_ymd_and_hms(year, month, 1, hour, 0, 0) {
            LocalResult::Single(t) => return Some(t.fixed_offset()),
            LocalResult::Ambiguous(earliest, _) => return Some(earliest.fixed_offset()),
            LocalResult::None => continue,
        }
    }
    None
}

fn window<Z: TimeZone>(
    zone: &Z,
    year: i32,
    month: u32,
) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    Some((
        month_start(zone, year, month)?,
        month_start(zone, next_year, next_month)?,
    ))
}

impl TransactionCursor {
    /// Cursor for the first page of `month`/`year` in `timezone`
    pub fn first_page(month: u32, year: i32, timezone: &str) -> Result<Self, CursorError> {
        if !(1..=12).contains(&month) {
            return Err(CursorError::Month(month));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(CursorError::Year(year));
        }
        let bounds = match parse_zone(timezone)? {
            Zone::Fixed(offset) => window(&offset, year, month),
            Zone::Named(tz) => window(&tz, year, month),
        };
        let (start, end) = bounds.ok_or_else(|| CursorError::Timezone(timezone.to_string()))?;
        Ok(Self {
            start,
            end,
            offset: 0,
        })
    }

    /// Same window, advanced past one page
    pub fn next(&self, page_size: i64) -> Self {
        Self {
            offset: self.offset + page_size,
            ..*self
        }
    }

    /// `RFC3339,RFC3339,offset`
    pub fn to_plaintext(&self) -> String {
        format!(
            "{},{},{}",
            self.start.to_rfc3339_opts(SecondsFormat::Secs, false),
            self.end.to_rfc3339_opts(SecondsFormat::Secs, false),
            self.offset
        )
    }

    pub fn parse_plaintext(text: &str) -> Result<Self, CursorError> {
        let fields: Vec<&str> = text.split(',').collect();
        let [start, end, offset] = fields.as_slice() else {
            return Err(CursorError::Malformed(format!(
                "expected 3 fields, found {}",
                fields.len()
            )));
        };
        let start = DateTime::parse_from_rfc3339(start)
            .map_err(|e| CursorError::Malformed(format!("start: {}", e)))?;
        let end = DateTime::parse_from_rfc3339(end)
            .map_err(|e| CursorError::Malformed(format!("end: {}", e)))?;
        let offset: i64 = offset
            .parse()
            .map_err(|_| CursorError::Malformed("offset is not an integer".to_string()))?;
        if offset < 0 || start >= end {
            return Err(CursorError::Malformed("window out of order".to_string()));
        }
        Ok(Self { start, end, offset })
    }

    pub fn encode(&self, codec: &TokenCodec) -> Result<String, CursorError> {
        Ok(codec.encode_str(&self.to_plaintext())?)
    }

    pub fn decode(codec: &TokenCodec, token: &str) -> Result<Self, CursorError> {
        Self::parse_plaintext(&codec.decode_str(token)?)
    }
}

/// Balance pages resume at a raw currency code or ticker
pub fn encode_balance_cursor(codec: &TokenCodec, code: &str) -> Result<String, CursorError> {
    Ok(codec.encode_str(code)?)
}

pub fn decode_balance_cursor(codec: &TokenCodec, token: &str) -> Result<String, CursorError> {
    let code = codec.decode_str(token)?;
    if code.is_empty() {
        return Err(CursorError::Malformed("empty balance cursor".to_string()));
    }
    Ok(code)
}
