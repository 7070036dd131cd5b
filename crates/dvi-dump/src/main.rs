//! Trace or list the command stream of a DVI file.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use dvistream::{Cmd, DEFAULT_RESOLUTION, DviReader, Interpreter};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Trace the command stream of a DVI file.
///
/// By default every command is interpreted and printed together with the
/// registers it changes. `--list` and `--json` print the raw commands
/// prefixed with their offset instead.
#[derive(Parser)]
#[command(name = "dvi-dump", version, about)]
struct Cli {
    /// Print one JSON object per command
    #[arg(long, conflicts_with = "list")]
    json: bool,

    /// Print `offset: command` lines without interpreting them
    #[arg(long)]
    list: bool,

    /// Resolution in dots per inch for pixel positions
    #[arg(long, default_value_t = DEFAULT_RESOLUTION)]
    dpi: f64,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// DVI file to read
    file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Interpret { dpi: f64 },
    List,
    Json,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.json {
            Mode::Json
        } else if self.list {
            Mode::List
        } else {
            Mode::Interpret { dpi: self.dpi }
        }
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    offset: u64,
    #[serde(flatten)]
    cmd: &'a Cmd,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let file = File::open(&cli.file)
        .with_context(|| format!("could not open DVI file {}", cli.file.display()))?;
    debug!(path = %cli.file.display(), "reading");

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let (count, pages) = dump(DviReader::new(file), &mut out, cli.mode())
        .with_context(|| format!("could not process DVI file {}", cli.file.display()))?;
    out.flush()?;

    info!(commands = count, pages, "done");
    Ok(())
}

/// Write every command of `reader` to `out`. Returns the number of commands
/// and the number of pages seen.
fn dump<R: io::Read, W: Write>(
    reader: DviReader<R>,
    out: &mut W,
    mode: Mode,
) -> Result<(usize, usize)> {
    match mode {
        Mode::Interpret { dpi } => {
            let mut interp = Interpreter::new(out).with_resolution(dpi);
            for_each_cmd(reader, |offset, cmd| {
                interp
                    .run(cmd)
                    .with_context(|| format!("could not interpret {} at offset {offset}", cmd.name()))
            })
        }
        Mode::List => for_each_cmd(reader, |offset, cmd| {
            writeln!(out, "{offset}: {cmd}")?;
            Ok(())
        }),
        Mode::Json => for_each_cmd(reader, |offset, cmd| {
            serde_json::to_writer(&mut *out, &JsonLine { offset, cmd })?;
            writeln!(out)?;
            Ok(())
        }),
    }
}

fn for_each_cmd<R: io::Read>(
    reader: DviReader<R>,
    mut f: impl FnMut(u64, &Cmd) -> Result<()>,
) -> Result<(usize, usize)> {
    let mut count = 0;
    let mut pages = 0;
    for res in reader {
        let (offset, cmd) = res.context("could not read DVI stream")?;
        f(offset, &cmd)?;
        if matches!(cmd, Cmd::Bop { .. }) {
            pages += 1;
        }
        count += 1;
    }
    Ok((count, pages))
}
