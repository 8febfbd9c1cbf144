use std::io::Write;

use super::{Record, Sink};
use crate::{Error, Result};

fn sink_err<E>(err: E) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    Error::Sink(Box::new(err))
}

/// Writes records as InfluxDB line protocol, one record per line.
pub struct LineProtocolSink<W> {
    writer: W,
}

impl<W: Write> LineProtocolSink<W> {
    pub fn new(writer: W) -> Self {
        LineProtocolSink { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Sink for LineProtocolSink<W> {
    fn write(&mut self, record: &Record) -> Result<()> {
        writeln!(self.writer, "{}", record.to_line_protocol()).map_err(sink_err)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(sink_err)
    }
}

/// Writes records as newline delimited JSON objects.
pub struct JsonSink<W> {
    writer: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        JsonSink { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Sink for JsonSink<W> {
    fn write(&mut self, record: &Record) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record).map_err(sink_err)?;
        self.writer.write_all(b"\n").map_err(sink_err)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(sink_err)
    }
}
