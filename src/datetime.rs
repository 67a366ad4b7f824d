//! RESP effective-date parsing.
//!
//! RESP files record start/end times in SEED's `YYYY,DDD,HH:MM:SS.ffff`
//! (year, day-of-year) form, e.g. `1993,365,00:00:00.0000`, and frequently
//! an unbounded end time as `2599,365,23:59:59.0000` or a literal
//! `"No Ending Time"`. Adapted from the ISO-8601 helper in the teacher
//! crate's `datetime.rs`, but targeting the SEED convention instead.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::error::{RespError, Result};

/// Parse a SEED-style `YYYY,DDD[,HH:MM:SS[.ffff]]` timestamp.
pub fn parse_seed_datetime(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    let parts: Vec<&str> = s.splitn(3, ',').collect();
    if parts.len() < 2 {
        return Err(RespError::ParseError(format!(
            "malformed SEED date '{s}': expected 'YYYY,DDD[,HH:MM:SS]'"
        )));
    }
    let year: i32 = parts[0]
        .trim()
        .parse()
        .map_err(|_| RespError::ParseError(format!("bad year in '{s}'")))?;
    let day_of_year: u32 = parts[1]
        .trim()
        .parse()
        .map_err(|_| RespError::ParseError(format!("bad day-of-year in '{s}'")))?;

    let date = NaiveDate::from_yo_opt(year, day_of_year)
        .ok_or_else(|| RespError::ParseError(format!("day-of-year out of range in '{s}'")))?;

    let (hour, min, sec, nanos) = if let Some(time_str) = parts.get(2) {
        parse_time_of_day(time_str)?
    } else {
        (0, 0, 0, 0)
    };

    let naive = date
        .and_hms_nano_opt(hour, min, sec, nanos)
        .ok_or_else(|| RespError::ParseError(format!("bad time of day in '{s}'")))?;

    match Utc.from_local_datetime(&naive).single() {
        Some(dt) => Ok(dt),
        None => Err(RespError::ParseError(format!("ambiguous datetime '{s}'"))),
    }
}

fn parse_time_of_day(s: &str) -> Result<(u32, u32, u32, u32)> {
    let s = s.trim();
    let (hms, frac) = match s.split_once('.') {
        Some((a, b)) => (a, b),
        None => (s, ""),
    };
    let fields: Vec<&str> = hms.split(':').collect();
    if fields.len() != 3 {
        return Err(RespError::ParseError(format!(
            "bad time of day '{s}': expected HH:MM:SS"
        )));
    }
    let hour: u32 = fields[0]
        .parse()
        .map_err(|_| RespError::ParseError(format!("bad hour in '{s}'")))?;
    let min: u32 = fields[1]
        .parse()
        .map_err(|_| RespError::ParseError(format!("bad minute in '{s}'")))?;
    let sec: u32 = fields[2]
        .parse()
        .map_err(|_| RespError::ParseError(format!("bad second in '{s}'")))?;
    let nanos: u32 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<9}");
        padded[..9]
            .parse()
            .map_err(|_| RespError::ParseError(format!("bad fractional seconds in '{s}'")))?
    };
    Ok((hour, min, sec, nanos))
}

/// Parse an optional end-time field. RESP uses the literal string
/// `"No Ending Time"` (in any case, with surrounding whitespace/quotes) to
/// mean "still open"; an empty field means the same.
pub fn parse_seed_datetime_opt(s: &str) -> Result<Option<DateTime<Utc>>> {
    let trimmed = s.trim().trim_matches('"');
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("no ending time") {
        return Ok(None);
    }
    Ok(Some(parse_seed_datetime(trimmed)?))
}
