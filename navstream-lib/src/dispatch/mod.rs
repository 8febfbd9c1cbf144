//! Delivery of decoded units to a storage or telemetry [Sink].
mod sinks;

pub use sinks::*;

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Read;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::nmea::{Sentence, SentenceParser};
use crate::stream::{DecodedStream, ReadOpts, StreamDecoder, Unit};
use crate::summary::Summary;
use crate::ubx::Message;
use crate::Result;

/// A numeric record field.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f64),
    Int(i64),
    UInt(u64),
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<u8> for FieldValue {
    fn from(value: u8) -> Self {
        FieldValue::UInt(u64::from(value))
    }
}

/// A structured record as handed to a [Sink].
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Record {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    pub timestamp: DateTime<Utc>,
}

fn escape(s: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl Record {
    #[must_use]
    pub fn new(measurement: &str, timestamp: DateTime<Utc>) -> Self {
        Record {
            measurement: measurement.to_string(),
            tags: BTreeMap::default(),
            fields: BTreeMap::default(),
            timestamp,
        }
    }

    #[must_use]
    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn field<V: Into<FieldValue>>(mut self, key: &str, value: V) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Add a field only when `value` is present.
    #[must_use]
    pub fn opt_field<V: Into<FieldValue>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.field(key, v),
            None => self,
        }
    }

    /// Project a decoded unit into a record. Returns `None` for units that are not
    /// forwarded, i.e., unknown messages, sentences other than GGA and RMC, and units
    /// without any field values.
    #[must_use]
    pub fn from_unit(unit: &Unit, timestamp: DateTime<Utc>) -> Option<Record> {
        let record = match unit {
            Unit::Sentence(Sentence::Gga(gga)) => Record::new("nmea", timestamp)
                .tag("type", "GGA")
                .opt_field("latitude", gga.latitude)
                .opt_field("longitude", gga.longitude)
                .opt_field("altitude", gga.altitude),
            Unit::Sentence(Sentence::Rmc(rmc)) => Record::new("nmea", timestamp)
                .tag("type", "RMC")
                .opt_field("latitude", rmc.latitude)
                .opt_field("longitude", rmc.longitude)
                .opt_field("speed", rmc.speed),
            Unit::Sentence(Sentence::Other { .. }) => return None,
            Unit::Message(msg @ Message::NavPvt(pvt)) => Record::new("ubx", timestamp)
                .tag("message", msg.name())
                .field("latitude", pvt.latitude())
                .field("longitude", pvt.longitude())
                .field("fixType", pvt.fix_type)
                .field("numSV", pvt.num_sv)
                .field("height", pvt.height_m())
                .field("hMSL", pvt.h_msl_m())
                .field("hAcc", pvt.h_acc_m())
                .field("vAcc", pvt.v_acc_m())
                .field("gSpeed", pvt.ground_speed_mps())
                .field("heading", pvt.heading_deg()),
            Unit::Message(msg @ Message::NavStatus(st)) => Record::new("ubx", timestamp)
                .tag("message", msg.name())
                .field("fixType", st.fix_type)
                .field("flags", st.flags)
                .field("fixStat", st.fix_stat)
                .field("flags2", st.flags2),
            Unit::Message(msg @ Message::NavPosllh(llh)) => Record::new("ubx", timestamp)
                .tag("message", msg.name())
                .field("latitude", llh.latitude())
                .field("longitude", llh.longitude())
                .field("altitude", llh.height_m())
                .field("hMSL", llh.h_msl_m())
                .field("hAcc", llh.h_acc_m())
                .field("vAcc", llh.v_acc_m()),
            Unit::Message(Message::Unknown { .. }) => return None,
        };
        if record.fields.is_empty() {
            return None;
        }
        Some(record)
    }

    /// Render as a single line of InfluxDB line protocol with a nanosecond timestamp.
    ///
    /// Non-finite float fields are omitted.
    #[must_use]
    pub fn to_line_protocol(&self) -> String {
        let mut line = escape(&self.measurement, &[',', ' ']);
        for (k, v) in &self.tags {
            let _ = write!(
                line,
                ",{}={}",
                escape(k, &[',', '=', ' ']),
                escape(v, &[',', '=', ' '])
            );
        }
        let mut sep = ' ';
        for (k, v) in &self.fields {
            let value = match v {
                FieldValue::Float(f) if !f.is_finite() => continue,
                FieldValue::Float(f) => format!("{f}"),
                FieldValue::Int(i) => format!("{i}i"),
                FieldValue::UInt(u) => format!("{u}u"),
            };
            let _ = write!(line, "{sep}{}={value}", escape(k, &[',', '=', ' ']));
            sep = ',';
        }
        if let Some(nanos) = self.timestamp.timestamp_nanos_opt() {
            let _ = write!(line, " {nanos}");
        }
        line
    }
}

/// Destination for [Record]s.
pub trait Sink {
    /// # Errors
    /// [crate::Error::Sink] if the record could not be written.
    fn write(&mut self, record: &Record) -> Result<()>;

    /// # Errors
    /// [crate::Error::Sink] if buffered records could not be written.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn write(&mut self, record: &Record) -> Result<()> {
        (**self).write(record)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write(&mut self, record: &Record) -> Result<()> {
        (**self).write(record)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Counts of dispatch outcomes.
#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    /// Records accepted by the sink.
    pub written: usize,
    /// Records the sink failed to write.
    pub failed: usize,
    /// Units that were not forwarded.
    pub skipped: usize,
}

/// Routes decoded units to a [Sink].
///
/// Sink failures are logged and counted; they never stop dispatching of later units
/// and failed records are not retried.
pub struct Dispatcher<S> {
    sink: S,
    stats: DispatchStats,
}

impl<S> Dispatcher<S>
where
    S: Sink,
{
    pub fn new(sink: S) -> Self {
        Dispatcher {
            sink,
            stats: DispatchStats::default(),
        }
    }

    /// Dispatch `unit` stamped with the current time.
    pub fn dispatch(&mut self, unit: &Unit) {
        self.dispatch_at(unit, Utc::now());
    }

    pub fn dispatch_at(&mut self, unit: &Unit, timestamp: DateTime<Utc>) {
        let Some(record) = Record::from_unit(unit, timestamp) else {
            debug!(kind = unit.kind(), "not forwarding {unit:?}");
            self.stats.skipped += 1;
            return;
        };
        debug!(
            measurement = %record.measurement,
            kind = unit.kind(),
            fields = ?record.fields,
            "dispatch"
        );
        match self.sink.write(&record) {
            Ok(()) => self.stats.written += 1,
            Err(err) => {
                warn!(%err, kind = unit.kind(), "sink write failed");
                self.stats.failed += 1;
            }
        }
    }

    /// Flush the sink, logging any failure.
    pub fn flush(&mut self) {
        if let Err(err) = self.sink.flush() {
            warn!(%err, "sink flush failed");
        }
    }

    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_inner(self) -> S {
        self.sink
    }
}

/// Decode everything from `reader` and dispatch each unit as it is completed.
///
/// Decode errors are logged by the decoder and skipped. The sink is flushed after each
/// read. Returns once `reader` is exhausted, which never happens when
/// [ReadOpts::follow] is set.
pub fn process<R, P, S>(
    reader: R,
    decoder: StreamDecoder<P>,
    read_opts: ReadOpts,
    dispatcher: &mut Dispatcher<S>,
) -> Summary
where
    R: Read,
    P: SentenceParser,
    S: Sink,
{
    let mut stream = DecodedStream::new(reader, decoder, read_opts);
    while let Some(chunk) = stream.next_chunk() {
        if chunk.is_empty() {
            continue;
        }
        for unit in chunk.iter().filter_map(|zult| zult.as_ref().ok()) {
            dispatcher.dispatch(unit);
        }
        dispatcher.flush();
    }
    stream.decoder().summary().clone()
}
