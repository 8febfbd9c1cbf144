use std::fs::File;
use std::io::{stdout, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use navstream::dispatch::{process, Dispatcher, JsonSink, LineProtocolSink, Sink};
use navstream::{DecoderOpts, ReadOpts, StreamDecoder};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum Format {
    Line,
    Json,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Line, Self::Json]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Line => Some(clap::builder::PossibleValue::new("line")),
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
        }
    }
}

fn new_sink(output: Option<&Path>, format: &Format) -> Result<Box<dyn Sink>> {
    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create output {path:?}"))?,
        )),
        None => Box::new(stdout()),
    };
    Ok(match format {
        Format::Line => Box::new(LineProtocolSink::new(writer)),
        Format::Json => Box::new(JsonSink::new(writer)),
    })
}

// A receiver device returns zero bytes whenever it has nothing new, which is not
// the end of the stream.
#[cfg(unix)]
fn is_device(file: &File) -> bool {
    use std::os::unix::fs::FileTypeExt;

    file.metadata()
        .map(|md| md.file_type().is_char_device())
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_device(_file: &File) -> bool {
    false
}

pub fn log(
    input: &Path,
    output: Option<&Path>,
    format: &Format,
    opts: DecoderOpts,
    follow: bool,
) -> Result<()> {
    let src = File::open(input).with_context(|| format!("opening input {input:?}"))?;
    let follow = if !follow && is_device(&src) {
        debug!("{input:?} is a character device; following");
        true
    } else {
        follow
    };
    let mut dispatcher = Dispatcher::new(new_sink(output, format)?);
    let read_opts = ReadOpts::builder().follow(follow).build();

    info!("decoding {input:?}");
    let summary = process(src, StreamDecoder::new(opts), read_opts, &mut dispatcher);
    dispatcher.flush();

    let stats = dispatcher.stats();
    info!(
        units = summary.units(),
        sentence_errors = summary.sentence_errors,
        short_payloads = summary.short_payloads,
        checksum_errors = summary.checksum_errors,
        sync_dropped = summary.sync_dropped,
        overflow_dropped = summary.overflow_dropped,
        "decoded"
    );
    info!(
        written = stats.written,
        failed = stats.failed,
        skipped = stats.skipped,
        "dispatched"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use navstream::framing::Frame;
    use navstream::ubx::{NavPosllh, CLASS_NAV, ID_NAV_POSLLH};
    use std::fs;

    fn write_capture(path: &Path) {
        let llh = NavPosllh {
            itow: 0,
            lon: 85_571_250,
            lat: 473_977_418,
            height: 450_000,
            h_msl: 0,
            h_acc: 0,
            v_acc: 0,
        };
        let mut dat =
            b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n".to_vec();
        dat.extend(Frame::encode(CLASS_NAV, ID_NAV_POSLLH, &llh.encode()));
        fs::write(path, dat).unwrap();
    }

    #[test]
    fn log_to_file() {
        let tmpdir = tempfile::tempdir().unwrap();
        let input = tmpdir.path().join("capture.bin");
        let output = tmpdir.path().join("records.lp");
        write_capture(&input);

        log(
            &input,
            Some(output.as_path()),
            &Format::Line,
            DecoderOpts::default(),
            false,
        )
        .unwrap();

        let out = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("nmea,type=GGA "));
        assert!(lines[1].starts_with("ubx,message=NAV-POSLLH altitude=450,"));
    }

    #[test]
    fn devices_are_followed() {
        let tmpdir = tempfile::tempdir().unwrap();
        let input = tmpdir.path().join("capture.bin");
        write_capture(&input);
        assert!(!is_device(&File::open(&input).unwrap()));

        #[cfg(unix)]
        assert!(is_device(&File::open("/dev/null").unwrap()));
    }

    #[test]
    fn missing_input() {
        let tmpdir = tempfile::tempdir().unwrap();
        let zult = log(
            &tmpdir.path().join("missing.bin"),
            None,
            &Format::Json,
            DecoderOpts::default(),
            false,
        );
        assert!(zult.is_err());
    }
}
