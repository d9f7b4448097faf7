use crate::error::{Result, SmeshmonError};
use crate::Millis;

fn invalid(input: &str, reason: impl std::fmt::Display) -> SmeshmonError {
    SmeshmonError::InvalidDuration(format!("{:?}: {}", input, reason))
}

/// Parse a duration string as the node formats it (`"300s"`, `"12h0m0s"`,
/// `"1.5h"`, `"250ms"`) into whole milliseconds. A bare integer is taken as
/// milliseconds.
pub fn parse_duration(input: &str) -> Result<Millis> {
    let s = input.trim();
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if body.is_empty() {
        return Err(invalid(input, "empty duration"));
    }

    let nanos = if body.bytes().all(|b| b.is_ascii_digit()) {
        let ms: u128 = body.parse().map_err(|e| invalid(input, e))?;
        ms.saturating_mul(1_000_000)
    } else if body.contains('.') {
        fractional_nanos(input, body)?
    } else {
        humantime::parse_duration(&body.replace('µ', "u"))
            .map_err(|e| invalid(input, e))?
            .as_nanos()
    };

    let ms = Millis::try_from(nanos / 1_000_000).map_err(|_| invalid(input, "out of range"))?;
    Ok(if negative { -ms } else { ms })
}

/// Go also prints fractional components (`"1.5h"`, `"2.25s"`); each one is
/// scaled by the length of its unit as humantime reads it.
fn fractional_nanos(input: &str, mut rest: &str) -> Result<u128> {
    let mut total: u128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        rest = tail;

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid(input, "expected number"));
        }
        if unit.is_empty() {
            return Err(invalid(input, "missing unit"));
        }
        let scale = humantime::parse_duration(&format!("1{}", unit.replace('µ', "u")))
            .map_err(|e| invalid(input, e))?
            .as_nanos();

        // nanosecond precision is all a fraction can contribute
        let fraction = &fraction[..fraction.len().min(9)];
        let whole: u128 = digits(input, whole)?;
        let numerator: u128 = digits(input, fraction)?;
        let part = scale
            .checked_mul(whole)
            .and_then(|n| n.checked_add(scale * numerator / 10u128.pow(fraction.len() as u32)))
            .ok_or_else(|| invalid(input, "out of range"))?;
        total = total
            .checked_add(part)
            .ok_or_else(|| invalid(input, "out of range"))?;
    }
    Ok(total)
}

fn digits(input: &str, s: &str) -> Result<u128> {
    if s.is_empty() {
        return Ok(0);
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(input, "bad number"));
    }
    s.parse().map_err(|e| invalid(input, e))
}
