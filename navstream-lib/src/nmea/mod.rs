//! Text sentence parsing.
//!
//! [NmeaParser] is the default [SentenceParser]. It checks the sentence checksum and
//! decodes the position sentences (`GGA`, `RMC`); other well-formed sentences are
//! returned as [Sentence::Other].
mod fields;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use fields::{coordinate, opt_num, time_of_day, Fields};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SentenceError {
    #[error("empty sentence")]
    Empty,
    #[error("sentence does not begin with '$'")]
    MissingMarker,
    #[error("sentence has no checksum")]
    MissingChecksum,
    #[error("invalid checksum field {0:?}")]
    InvalidChecksum(String),
    #[error("checksum mismatch: sentence has {expected:02X}, computed {computed:02X}")]
    ChecksumMismatch { expected: u8, computed: u8 },
    #[error("invalid address field {0:?}")]
    InvalidAddress(String),
    #[error("{kind}: expected at least {want} fields, got {got}")]
    TooFewFields {
        kind: String,
        want: usize,
        got: usize,
    },
    #[error("{kind}: invalid {field} {value:?}")]
    InvalidField {
        kind: String,
        field: &'static str,
        value: String,
    },
}

/// Parses a single trimmed text line into a [Sentence].
pub trait SentenceParser: Send {
    /// # Errors
    /// [SentenceError] if the line is malformed.
    fn parse(&self, line: &str) -> Result<Sentence, SentenceError>;
}

impl<F> SentenceParser for F
where
    F: Fn(&str) -> Result<Sentence, SentenceError> + Send,
{
    fn parse(&self, line: &str) -> Result<Sentence, SentenceError> {
        self(line)
    }
}

/// Global positioning fix data.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Gga {
    pub talker: String,
    pub time: Option<NaiveTime>,
    /// Signed decimal degrees, north positive.
    pub latitude: Option<f64>,
    /// Signed decimal degrees, east positive.
    pub longitude: Option<f64>,
    pub fix_quality: Option<u8>,
    pub num_satellites: Option<u8>,
    pub hdop: Option<f64>,
    /// Altitude above mean sea level (m)
    pub altitude: Option<f64>,
    /// Geoid separation (m)
    pub separation: Option<f64>,
}

/// Recommended minimum navigation data.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Rmc {
    pub talker: String,
    pub time: Option<NaiveTime>,
    /// True when the status field is `A`.
    pub valid: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Speed over ground (knots)
    pub speed: Option<f64>,
    /// Course over ground (deg)
    pub course: Option<f64>,
    pub date: Option<NaiveDate>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Sentence {
    Gga(Gga),
    Rmc(Rmc),
    /// Well-formed sentence of a kind that is not decoded.
    Other {
        talker: String,
        kind: String,
        fields: Vec<String>,
    },
}

impl Sentence {
    /// Sentence kind, e.g., `GGA`.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Sentence::Gga(_) => "GGA",
            Sentence::Rmc(_) => "RMC",
            Sentence::Other { kind, .. } => kind,
        }
    }
}

/// XOR of all bytes in `dat`.
#[must_use]
pub fn checksum(dat: &[u8]) -> u8 {
    dat.iter().fold(0, |acc, b| acc ^ b)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NmeaParser;

impl NmeaParser {
    /// Split a sentence into its talker, kind and data fields after verifying the
    /// checksum.
    fn split(line: &str) -> Result<(String, String, Vec<&str>), SentenceError> {
        if line.is_empty() {
            return Err(SentenceError::Empty);
        }
        let Some(body) = line.strip_prefix('$') else {
            return Err(SentenceError::MissingMarker);
        };
        let Some((body, ck)) = body.rsplit_once('*') else {
            return Err(SentenceError::MissingChecksum);
        };
        if ck.len() != 2 {
            return Err(SentenceError::InvalidChecksum(ck.to_string()));
        }
        let expected = u8::from_str_radix(ck, 16)
            .map_err(|_| SentenceError::InvalidChecksum(ck.to_string()))?;
        let computed = checksum(body.as_bytes());
        if expected != computed {
            return Err(SentenceError::ChecksumMismatch { expected, computed });
        }

        let mut parts = body.split(',');
        let address = parts.next().unwrap_or_default();
        if address.len() < 2 || !address.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SentenceError::InvalidAddress(address.to_string()));
        }
        // Proprietary sentences have a single `P` in place of the talker
        let (talker, kind) = if address.starts_with('P') {
            address.split_at(1)
        } else if address.len() >= 3 {
            address.split_at(2)
        } else {
            return Err(SentenceError::InvalidAddress(address.to_string()));
        };

        Ok((talker.to_string(), kind.to_string(), parts.collect()))
    }

    fn gga(talker: String, f: &Fields) -> Result<Gga, SentenceError> {
        f.require(14)?;
        Ok(Gga {
            talker,
            time: time_of_day(f, 0)?,
            latitude: coordinate(f, 1, 2, 'S')?,
            longitude: coordinate(f, 3, 4, 'W')?,
            fix_quality: opt_num(f, 5, "fix quality")?,
            num_satellites: opt_num(f, 6, "satellite count")?,
            hdop: opt_num(f, 7, "hdop")?,
            altitude: opt_num(f, 8, "altitude")?,
            separation: opt_num(f, 10, "separation")?,
        })
    }

    fn rmc(talker: String, f: &Fields) -> Result<Rmc, SentenceError> {
        f.require(11)?;
        Ok(Rmc {
            talker,
            time: time_of_day(f, 0)?,
            valid: f.get(1) == "A",
            latitude: coordinate(f, 2, 3, 'S')?,
            longitude: coordinate(f, 4, 5, 'W')?,
            speed: opt_num(f, 6, "speed")?,
            course: opt_num(f, 7, "course")?,
            date: fields::date(f, 8)?,
        })
    }
}

impl SentenceParser for NmeaParser {
    fn parse(&self, line: &str) -> Result<Sentence, SentenceError> {
        let (talker, kind, values) = Self::split(line)?;
        let f = Fields::new(&kind, &values);
        match kind.as_str() {
            "GGA" => Ok(Sentence::Gga(Self::gga(talker, &f)?)),
            "RMC" => Ok(Sentence::Rmc(Self::rmc(talker, &f)?)),
            _ => Ok(Sentence::Other {
                talker,
                kind,
                fields: values.iter().map(ToString::to_string).collect(),
            }),
        }
    }
}
