use std::fs::File;
use std::io::{stdout, Write};
use std::path::Path;

use anyhow::{Context, Result};
use handlebars::handlebars_helper;
use navstream::{decode_stream, DecoderOpts, ReadOpts, Summary};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone)]
pub enum Format {
    Json,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Info {
    filename: String,
    bytes: u64,
    summary: Summary,
}

fn summarize(fpath: &Path, verify_checksum: bool) -> Result<Info> {
    let reader = File::open(fpath).context("opening input")?;
    let bytes = reader.metadata().context("reading input metadata")?.len();
    let opts = DecoderOpts::builder()
        .verify_checksum(verify_checksum)
        .build();

    let mut stream = decode_stream(reader, opts, ReadOpts::default());
    for zult in stream.by_ref() {
        if let Err(err) = zult {
            debug!("{err}");
        }
    }

    Ok(Info {
        filename: fpath.to_string_lossy().to_string(),
        bytes,
        summary: stream.decoder().summary().clone(),
    })
}

pub fn info(fpath: &Path, format: &Format, verify_checksum: bool) -> Result<()> {
    let info = summarize(fpath, verify_checksum)?;

    match format {
        Format::Json => {
            serde_json::to_writer_pretty(stdout(), &info).context("serializing to json")
        }
        Format::Text => {
            let data = render_text(&info).context("serializing info")?;
            stdout()
                .write_all(data.as_bytes())
                .context("writing to stdout")
        }
    }
}

fn render_text(info: &Info) -> Result<String> {
    handlebars_helper!(left_pad: |num: u64, v: Json| {
        let v = match v {
            serde_json::Value::String(s) => s.to_owned(),
            serde_json::Value::Null => String::new(),
            _ => v.to_string()
        };
        let num = usize::try_from(num).unwrap_or_default().max(v.len());
        format!("{v:>num$}")
    });
    let mut hb = handlebars::Handlebars::new();
    hb.register_helper("lpad", Box::new(left_pad));
    hb.register_template_string("info", TEXT_TEMPLATE)
        .context("compiling template")?;

    hb.render("info", &info).context("rendering text")
}

const TEXT_TEMPLATE: &str = r"{{ filename }}
===============================================================================
Bytes:            {{ bytes }}
Lines:            {{ summary.lines }} ({{ summary.discarded_lines }} non-sentence lines dropped)
Frames:           {{ summary.frames }}
Sentence errors:  {{ summary.sentence_errors }}
Short payloads:   {{ summary.short_payloads }}
Checksum errors:  {{ summary.checksum_errors }}
Dropped bytes:    {{ summary.sync_dropped }} before sync, {{ summary.overflow_dropped }} on overflow
-------------------------------------------------------------------------------
Kind                   Count
-------------------------------------------------------------------------------
{{ #each summary.sentences }}{{ lpad 16 @key }}  {{ lpad 8 this }}
{{/each }}{{ #each summary.messages }}{{ lpad 16 @key }}  {{ lpad 8 this }}
{{/each }}{{ #if summary.unknown }}-------------------------------------------------------------------------------
Unknown (class-id)     Count
-------------------------------------------------------------------------------
{{ #each summary.unknown }}{{ lpad 16 @key }}  {{ lpad 8 this }}
{{/each }}{{ /if }}";
