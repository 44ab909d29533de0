use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::io::AsyncRead;

use i2csnoop_core::{
    AddressFilter, BusEvent, DEFAULT_STALL_TIMEOUT, IoByteSource, ReadError, TraceStyle,
    Transaction, TransactionReader, render_json, render_line,
};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("I2CSNOOP_BUILD_COMMIT"),
    " ",
    env!("I2CSNOOP_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "i2csnoop")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Decode and trace I2C transactions from a captured bus event stream.",
    long_about = None,
    after_help = "Examples:\n  i2csnoop trace capture.bin\n  i2csnoop trace --address 0x50 --address 0x51 capture.bin\n  producer | i2csnoop trace --json -"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Trace transactions from an event byte stream (file, or '-' for stdin).
    Trace(TraceArgs),
}

#[derive(clap::Args, Debug)]
struct TraceArgs {
    /// Input event stream: a capture file, or '-' for stdin
    input: PathBuf,

    /// Trace only this 7-bit target address (hex like 0x50, or decimal); repeatable
    #[arg(short = 'a', long = "address", value_name = "I2C-ADDR", value_parser = parse_address)]
    addresses: Vec<u8>,

    /// Deadline in milliseconds for reads inside a transaction
    #[arg(long, default_value_t = DEFAULT_STALL_TIMEOUT.as_millis() as u64, value_name = "MS")]
    stall_timeout_ms: u64,

    /// When to color the trace output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Emit one JSON record per transaction instead of text
    #[arg(long)]
    json: bool,

    /// Prefix each transaction with the wall-clock time it was read
    #[arg(long)]
    timestamps: bool,

    /// Suppress the final summary line
    #[arg(long)]
    quiet: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let result = match cli.command {
        Commands::Trace(args) => run_trace(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(2)
        }
    }
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(err.to_string(), None)
    }
}

fn parse_address(raw: &str) -> Result<u8, String> {
    let trimmed = raw.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => trimmed.parse::<u8>(),
    };
    let address = parsed.map_err(|err| format!("invalid I2C address '{raw}': {err}"))?;
    if address > 0x7F {
        return Err(format!(
            "I2C address '{raw}' out of 7-bit range (0x00..=0x7F)"
        ));
    }
    Ok(address)
}

fn run_trace(args: &TraceArgs) -> Result<(), CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(trace_loop(args))
}

async fn open_input(input: &Path) -> Result<Box<dyn AsyncRead + Unpin + Send>, CliError> {
    if input.as_os_str() == "-" {
        return Ok(Box::new(tokio::io::stdin()));
    }
    match tokio::fs::File::open(input).await {
        Ok(file) => Ok(Box::new(file)),
        Err(err) => Err(CliError::new(
            format!("failed to open input {}: {err}", input.display()),
            Some("pass a capture file, or '-' for stdin".to_string()),
        )),
    }
}

async fn trace_loop(args: &TraceArgs) -> Result<(), CliError> {
    let source = IoByteSource::new(open_input(&args.input).await?);
    let mut reader = TransactionReader::new(source)
        .with_stall_timeout(Duration::from_millis(args.stall_timeout_ms));
    let filter = AddressFilter::from_addresses(args.addresses.iter().copied());
    let style = TraceStyle {
        color: color_enabled(args.color),
    };

    let mut counter = 0u64;
    let mut transactions = 0u64;
    loop {
        let outcome = tokio::select! {
            outcome = reader.read_transaction() => outcome,
            _ = tokio::signal::ctrl_c() => {
                log::info!("interrupted, stopping trace");
                break;
            }
        };
        match outcome {
            Ok(Some(xfer)) => {
                if filter.is_filtered(&xfer) {
                    continue;
                }
                counter = emit(&xfer, counter, &style, args)?;
                transactions += 1;
            }
            Ok(None) => break,
            Err(ReadError::Stalled { partial }) => {
                log::warn!(
                    "transaction stalled, showing the {} byte(s) captured so far",
                    partial.len()
                );
                // The counter advance of a stalled transaction is not kept.
                emit(&partial, counter, &style, args)?;
            }
            Err(ReadError::Source(err)) => {
                return Err(CliError::new(
                    format!("byte source failed: {err}"),
                    Some("check the capture device or replay stream".to_string()),
                ));
            }
        }
    }

    if !args.quiet {
        eprintln!("OK: {transactions} transaction(s) traced");
    }
    Ok(())
}

fn emit(
    xfer: &Transaction,
    counter: u64,
    style: &TraceStyle,
    args: &TraceArgs,
) -> Result<u64, CliError> {
    let ts = if args.timestamps {
        Some(now_rfc3339()?)
    } else {
        None
    };
    let (line, next) = if args.json {
        let events: Vec<BusEvent> = xfer.events().collect();
        render_json(&events, counter, ts.as_deref()).context("failed to serialize trace record")?
    } else {
        let (line, next) = render_line(xfer.events(), counter, style);
        match ts {
            Some(ts) => (format!("{ts} {line}"), next),
            None => (line, next),
        }
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}")
        .and_then(|()| stdout.flush())
        .context("failed to write trace output")?;
    Ok(next)
}

fn now_rfc3339() -> Result<String, CliError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("failed to format timestamp")
        .map_err(Into::into)
}

fn color_enabled(choice: ColorChoice) -> bool {
    match choice {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal(),
    }
}
