use std::io::{BufWriter, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use isotp_decode::decode_transcript;
use isotp_decode::stdio::{open_output, open_transcript};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One `node: payload` line per message
    #[default]
    Text,
    /// CSV with a node,length,payload header
    Csv,
}

/// Reassemble ISO-TP (ISO 15765-2) messages from a transcript of hex-encoded frames
///
/// Each input line is one frame: a 3 character node header, the frame type nibble, and the
/// type-specific fields. Single frames are output immediately; First + Consecutive frames are
/// output once the whole message has arrived.
///
/// An unknown frame type stops decoding with a non-zero exit status. Messages decoded before
/// then are still output.
#[derive(Debug, Parser)]
#[clap(version, verbatim_doc_comment)]
struct Args {
    #[clap(short, long, default_value_t = tracing::Level::INFO)]
    log_level: tracing::Level,

    /// Path to the transcript. stdin if '-' or if not passed
    input: Option<PathBuf>,

    /// Path to the output. stdout if '-' or if not passed
    output: Option<PathBuf>,

    /// Output format
    #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Skip frames that fail to decode instead of stopping
    ///
    /// Unknown frame types are always fatal.
    #[clap(short, long)]
    keep_going: bool,

    /// Disable line-buffering of the output
    ///
    /// By default, each message is flushed as soon as it's decoded, so that a live transcript can
    /// be watched. Pass this to buffer the output instead, which is faster for large transcripts.
    #[clap(long)]
    no_line_buffer: bool,
}

fn main() -> eyre::Result<()> {
    let use_color = std::io::stderr().is_terminal();
    if use_color {
        color_eyre::install()?;
    }

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(args.log_level.into())
        .with_env_var("ISOTP_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(use_color)
        .with_writer(std::io::stderr)
        .init();

    let input = open_transcript(&args.input)?;
    let output = open_output(&args.output)?;

    let start = Instant::now();
    let mut count = 0usize;
    let processor = decode_transcript(input).keep_going(args.keep_going);
    let should_line_buffer = !args.no_line_buffer;

    // Flush whatever was decoded before reporting any decoding error
    let result = match args.format {
        OutputFormat::Text => {
            let mut writer = BufWriter::new(output);
            let result = processor.run(|msg| {
                count += 1;
                msg.write(&mut writer)?;
                if should_line_buffer {
                    writer.flush()?;
                }
                Ok(())
            });
            writer.flush()?;
            result
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(output);
            let result = processor.run(|msg| {
                count += 1;
                writer.serialize(msg)?;
                if should_line_buffer {
                    writer.flush()?;
                }
                Ok(())
            });
            writer.flush()?;
            result
        }
    };
    result?;

    tracing::info!("Decoded {count} messages in {:?}", start.elapsed());

    Ok(())
}
