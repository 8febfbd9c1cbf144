use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};

use super::SentenceError;

/// Data fields of a sentence, following the address field.
pub(super) struct Fields<'a> {
    kind: &'a str,
    values: &'a [&'a str],
}

impl<'a> Fields<'a> {
    pub(super) fn new(kind: &'a str, values: &'a [&'a str]) -> Self {
        Fields { kind, values }
    }

    /// Field at `idx`, or an empty string if absent.
    pub(super) fn get(&self, idx: usize) -> &'a str {
        self.values.get(idx).copied().unwrap_or_default()
    }

    pub(super) fn require(&self, want: usize) -> Result<(), SentenceError> {
        if self.values.len() < want {
            return Err(SentenceError::TooFewFields {
                kind: self.kind.to_string(),
                want,
                got: self.values.len(),
            });
        }
        Ok(())
    }

    fn invalid(&self, field: &'static str, idx: usize) -> SentenceError {
        SentenceError::InvalidField {
            kind: self.kind.to_string(),
            field,
            value: self.get(idx).to_string(),
        }
    }
}

pub(super) fn opt_num<T: FromStr>(
    f: &Fields,
    idx: usize,
    name: &'static str,
) -> Result<Option<T>, SentenceError> {
    let s = f.get(idx);
    if s.is_empty() {
        return Ok(None);
    }
    s.parse::<T>().map(Some).map_err(|_| f.invalid(name, idx))
}

/// Decode a `(d)ddmm.mmmm` value and its hemisphere into signed decimal degrees.
pub(super) fn coordinate(
    f: &Fields,
    idx: usize,
    hemi_idx: usize,
    negative: char,
) -> Result<Option<f64>, SentenceError> {
    let Some(value) = opt_num::<f64>(f, idx, "coordinate")? else {
        return Ok(None);
    };
    let deg = (value / 100.0).trunc();
    let minutes = value - deg * 100.0;
    let mut zult = deg + minutes / 60.0;
    if f.get(hemi_idx).starts_with(negative) {
        zult = -zult;
    }
    Ok(Some(zult))
}

fn two_digits(s: &str, at: usize) -> Option<u32> {
    s.get(at..at + 2)?.parse().ok()
}

/// Decode `hhmmss[.sss]`.
pub(super) fn time_of_day(f: &Fields, idx: usize) -> Result<Option<NaiveTime>, SentenceError> {
    let s = f.get(idx);
    if s.is_empty() {
        return Ok(None);
    }
    let invalid = || f.invalid("time", idx);
    if !s.is_ascii() || s.len() < 6 {
        return Err(invalid());
    }
    let (h, m, sec) = match (two_digits(s, 0), two_digits(s, 2), two_digits(s, 4)) {
        (Some(h), Some(m), Some(sec)) => (h, m, sec),
        _ => return Err(invalid()),
    };
    let nanos = match &s[6..] {
        "" => 0,
        frac if frac.starts_with('.') => {
            let frac: f64 = format!("0{frac}").parse().map_err(|_| invalid())?;
            // rounding can only reach 1e9 for fractions of .9999999995 and above
            ((frac * 1e9).round() as u32).min(999_999_999)
        }
        _ => return Err(invalid()),
    };
    NaiveTime::from_hms_nano_opt(h, m, sec, nanos)
        .map(Some)
        .ok_or_else(invalid)
}

/// Decode `ddmmyy`. Two digit years before 80 are taken to be in the 2000s.
pub(super) fn date(f: &Fields, idx: usize) -> Result<Option<NaiveDate>, SentenceError> {
    let s = f.get(idx);
    if s.is_empty() {
        return Ok(None);
    }
    let invalid = || f.invalid("date", idx);
    if !s.is_ascii() || s.len() != 6 {
        return Err(invalid());
    }
    let (d, m, yy) = match (two_digits(s, 0), two_digits(s, 2), two_digits(s, 4)) {
        (Some(d), Some(m), Some(yy)) => (d, m, yy),
        _ => return Err(invalid()),
    };
    let century = if yy < 80 { 2000 } else { 1900 };
    NaiveDate::from_ymd_opt(century + yy as i32, m, d)
        .map(Some)
        .ok_or_else(invalid)
}
