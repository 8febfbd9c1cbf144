mod info;
mod log;

use std::io::stderr;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use navstream::DecoderOpts;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a receiver stream and write a record for each position or status
    /// message.
    ///
    /// The input may be a capture file or a device node the receiver is attached to.
    /// Only GGA and RMC sentences and NAV-PVT, NAV-STATUS and NAV-POSLLH messages
    /// produce records; everything else is logged at debug level.
    Log {
        /// Keep reading at end of input, waiting for more data. Always on when the
        /// input is a character device such as a serial port.
        #[arg(short = 'F', long, action)]
        follow: bool,

        /// Record output format.
        #[arg(short, long, default_value = "line")]
        format: log::Format,

        /// Output file path. Records are written to stdout if not provided.
        #[arg(short, long, value_name = "path")]
        output: Option<PathBuf>,

        /// Delete output file if it already exists
        #[arg(long, action)]
        clobber: bool,

        /// Maximum number of undecoded bytes to keep buffered. The oldest bytes are
        /// dropped when exceeded. Values less than the largest possible binary frame
        /// are raised to that size.
        #[arg(long, default_value_t = DecoderOpts::DEFAULT_MAX_BUFFER, value_name = "bytes")]
        max_buffer: usize,

        /// Drop binary frames with an invalid checksum.
        #[arg(long, action)]
        verify_checksum: bool,

        /// Input capture file or device. Character devices are always followed.
        input: PathBuf,
    },
    /// Show information about a receiver capture file
    Info {
        /// Input capture file
        input: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: info::Format,

        /// Count binary frames with an invalid checksum as errors.
        #[arg(long, action)]
        verify_checksum: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("NAVSTREAM_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Log {
            follow,
            format,
            output,
            clobber,
            max_buffer,
            verify_checksum,
            input,
        } => {
            if let Some(output) = output {
                if !clobber && output.exists() {
                    bail!("{output:?} exists; use --clobber");
                }
            }
            let opts = DecoderOpts::builder()
                .max_buffer(*max_buffer)
                .verify_checksum(*verify_checksum)
                .build();
            log::log(input, output.as_deref(), format, opts, *follow)
        }
        Commands::Info {
            input,
            format,
            verify_checksum,
        } => info::info(input, format, *verify_checksum),
    }
}
