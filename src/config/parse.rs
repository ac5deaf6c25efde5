use std::time::Duration;

use crate::error::ValidationError;

/// Fixed-point scale used for every decimal the harness parses (six digits).
pub(crate) const DECIMAL_SCALE: u64 = 1_000_000;
const DECIMAL_DIGITS: u32 = 6;

/// Parses `10`, `250ms`, `30s`, `5m` or `1h`. Zero is accepted; callers that
/// need a positive duration use [`parse_positive_duration`].
pub(crate) fn parse_duration_value(value: &str) -> Result<Duration, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::DurationEmpty);
    }

    let digits_len = value.chars().take_while(char::is_ascii_digit).count();
    if digits_len == 0 {
        return Err(ValidationError::InvalidDurationFormat {
            value: value.to_owned(),
        });
    }
    let (num_part, unit_part) = value.split_at(digits_len);
    let number: u64 =
        num_part
            .parse()
            .map_err(|err| ValidationError::InvalidDurationNumber {
                value: value.to_owned(),
                source: err,
            })?;

    let unit = if unit_part.is_empty() { "s" } else { unit_part };
    let duration = match unit {
        "ms" => Duration::from_millis(number),
        "s" => Duration::from_secs(number),
        "m" => {
            let secs = number
                .checked_mul(60)
                .ok_or(ValidationError::DurationOverflow)?;
            Duration::from_secs(secs)
        }
        "h" => {
            let secs = number
                .checked_mul(60)
                .and_then(|seconds| seconds.checked_mul(60))
                .ok_or(ValidationError::DurationOverflow)?;
            Duration::from_secs(secs)
        }
        _ => {
            return Err(ValidationError::InvalidDurationUnit {
                unit: unit.to_owned(),
            });
        }
    };

    Ok(duration)
}

pub(crate) fn parse_positive_duration(value: &str) -> Result<Duration, ValidationError> {
    let duration = parse_duration_value(value)?;
    if duration.is_zero() {
        return Err(ValidationError::DurationZero);
    }
    Ok(duration)
}

/// Parses a non-negative decimal such as `100`, `0.0001` or `99.9` into
/// millionths. Exponents and signs are rejected.
pub(crate) fn parse_decimal_micros(value: &str) -> Result<u64, ValidationError> {
    let trimmed = value.trim();
    let invalid = || ValidationError::InvalidDecimal {
        value: trimmed.to_owned(),
    };

    let (int_part, frac_part) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !int_part.chars().all(|ch| ch.is_ascii_digit())
        || !frac_part.chars().all(|ch| ch.is_ascii_digit())
    {
        return Err(invalid());
    }

    let frac_digits = u32::try_from(frac_part.len()).map_err(|_err| invalid())?;
    if frac_digits > DECIMAL_DIGITS {
        return Err(ValidationError::DecimalTooPrecise {
            value: trimmed.to_owned(),
            max_digits: DECIMAL_DIGITS,
        });
    }

    let whole: u64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_err| invalid())?
    };
    let frac: u64 = if frac_part.is_empty() {
        0
    } else {
        let digits: u64 = frac_part.parse().map_err(|_err| invalid())?;
        let pad = 10u64.pow(DECIMAL_DIGITS.saturating_sub(frac_digits));
        digits.checked_mul(pad).ok_or_else(invalid)?
    };

    whole
        .checked_mul(DECIMAL_SCALE)
        .and_then(|scaled| scaled.checked_add(frac))
        .ok_or_else(invalid)
}

/// Formats millionths back into the shortest decimal text.
pub(crate) fn format_decimal_micros(value: u64) -> String {
    let whole = value.checked_div(DECIMAL_SCALE).unwrap_or(0);
    let frac = value.checked_rem(DECIMAL_SCALE).unwrap_or(0);
    if frac == 0 {
        return whole.to_string();
    }
    let frac_text = format!("{:06}", frac);
    format!("{}.{}", whole, frac_text.trim_end_matches('0'))
}
