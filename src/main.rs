use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgAction, Parser};
use qfprom_client::parse::{address_range, parse_hex_u32, AddressRange, WriteSpec, ROW_STRIDE};
use qfprom_client::report::{Operation, OutputFormat, Reporter};
use qfprom_client::{QfpromError, ReadType, RegisterClient, RegisterResult, RegisterRow, Result};
use tokio::net::TcpStream;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "qfprom-client",
    version,
    about = "Read and blow QFPROM fuse rows through the qfprom kernel module TCP service"
)]
struct Cli {
    /// The host to connect to
    host: String,
    /// The port to connect on
    port: u16,
    /// Read the given row address(es)
    #[arg(short = 'r', long = "read", num_args = 1.., value_parser = parse_hex_u32)]
    read: Vec<u32>,
    /// Read the given row address(es) with error correction
    #[arg(short = 'c', long = "read-corrected", num_args = 1.., value_parser = parse_hex_u32)]
    read_corrected: Vec<u32>,
    /// Read the given row address(es) from the memory-mapped fuse region
    #[arg(short = 'd', long = "read-direct", num_args = 1.., value_parser = parse_hex_u32)]
    read_direct: Vec<u32>,
    /// Read every row from START to END inclusive
    #[arg(long, num_args = 2, value_names = ["START", "END"], value_parser = parse_hex_u32)]
    read_range: Vec<u32>,
    /// Read every row from START to END inclusive with error correction
    #[arg(long, num_args = 2, value_names = ["START", "END"], value_parser = parse_hex_u32)]
    read_corrected_range: Vec<u32>,
    /// Address step for range reads, in bytes
    #[arg(long, default_value_t = ROW_STRIDE)]
    step: u32,
    /// Blow a row, given as ADDR:LSB:MSB (hex)
    #[arg(short = 'w', long = "write", num_args = 1.., requires = "bus_clk_khz")]
    write: Vec<WriteSpec>,
    /// Bus clock in kHz passed along with writes
    #[arg(long)]
    bus_clk_khz: Option<u32>,
    /// Print one JSON object per result instead of text
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Exit with status 2 if the device rejected any operation
    #[arg(long, default_value_t = false)]
    strict: bool,
    /// Connect timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    connect_timeout_ms: u64,
    /// Per-response read timeout in milliseconds
    #[arg(long)]
    read_timeout_ms: Option<u64>,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Work requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Job {
    Read(u32, ReadType),
    /// One read per row, produced as the range is walked.
    ReadRange(AddressRange, ReadType),
    ReadDirect(u32),
    Write(WriteSpec, u32),
}

impl Job {
    fn operation(&self) -> Operation {
        match self {
            Job::Read(_, ReadType::Raw) | Job::ReadRange(_, ReadType::Raw) => Operation::Read,
            Job::Read(_, ReadType::Corrected) | Job::ReadRange(_, ReadType::Corrected) => {
                Operation::ReadCorrected
            }
            Job::ReadDirect(_) => Operation::ReadDirect,
            Job::Write(..) => Operation::Write,
        }
    }
}

/// Collect the command line into jobs, in the order they run.
fn plan_jobs(cli: &Cli) -> Result<Vec<Job>> {
    let mut jobs = Vec::new();

    jobs.extend(cli.read.iter().map(|&a| Job::Read(a, ReadType::Raw)));
    jobs.extend(
        cli.read_corrected
            .iter()
            .map(|&a| Job::Read(a, ReadType::Corrected)),
    );
    jobs.extend(cli.read_direct.iter().map(|&a| Job::ReadDirect(a)));

    for (bounds, read_type) in [
        (&cli.read_range, ReadType::Raw),
        (&cli.read_corrected_range, ReadType::Corrected),
    ] {
        for pair in bounds.chunks_exact(2) {
            let rows = address_range(pair[0], pair[1], cli.step)?;
            tracing::debug!(
                "Range 0x{:08X}..=0x{:08X}: {} rows",
                pair[0],
                pair[1],
                rows.row_count()
            );
            jobs.push(Job::ReadRange(rows, read_type));
        }
    }

    if !cli.write.is_empty() {
        let bus_clk_khz = cli.bus_clk_khz.ok_or_else(|| {
            QfpromError::InvalidArgument("--write requires --bus-clk-khz".to_string())
        })?;
        jobs.extend(cli.write.iter().map(|&spec| Job::Write(spec, bus_clk_khz)));
    }

    Ok(jobs)
}

/// The row a write confirmation reports.
///
/// The service answers a write with its own field order, so the decoded
/// words are not the row value. A successful write reports the row it was
/// asked to blow instead.
fn confirmed_write(spec: &WriteSpec, result: RegisterResult) -> RegisterResult {
    match result {
        RegisterResult::Row(_) => RegisterResult::Row(RegisterRow {
            address: spec.address,
            lsb: spec.lsb,
            msb: spec.msb,
        }),
        rejected => rejected,
    }
}

/// Run every job, reporting each result as soon as it arrives.
async fn run_jobs<W: std::io::Write>(
    client: &mut RegisterClient<TcpStream>,
    jobs: &[Job],
    reporter: &mut Reporter<W>,
) -> Result<()> {
    for job in jobs {
        let operation = job.operation();
        match *job {
            Job::Read(address, read_type) => {
                let result = client.read_register(address, read_type).await?;
                reporter.report(operation, &result)?;
            }
            Job::ReadRange(rows, read_type) => {
                for address in rows {
                    let result = client.read_register(address, read_type).await?;
                    reporter.report(operation, &result)?;
                }
            }
            Job::ReadDirect(address) => {
                let result = client.read_direct(address).await?;
                reporter.report(operation, &result)?;
            }
            Job::Write(spec, bus_clk_khz) => {
                let result = client
                    .write_register(spec.address, spec.lsb, spec.msb, bus_clk_khz)
                    .await?;
                tracing::debug!("Write reply for 0x{:08X}: {:?}", spec.address, result);
                reporter.report(operation, &confirmed_write(&spec, result))?;
            }
        }
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<usize> {
    let jobs = plan_jobs(&cli)?;

    tracing::info!("Trying to connect to {} on port {}", cli.host, cli.port);

    let mut builder = RegisterClient::builder()
        .connect_timeout(Some(Duration::from_millis(cli.connect_timeout_ms)));
    if let Some(ms) = cli.read_timeout_ms {
        builder = builder.read_timeout(Duration::from_millis(ms));
    }
    let mut client = builder.connect((cli.host.as_str(), cli.port)).await?;

    tracing::info!("Connected");

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    let mut reporter = Reporter::stdout(format);
    let outcome = run_jobs(&mut client, &jobs, &mut reporter).await;

    tracing::info!("Disconnecting");
    if let Err(e) = client.close().await {
        // The session may already be broken by the error being reported.
        tracing::warn!("Disconnect failed: {}", e);
    }

    outcome.map(|()| reporter.rejected())
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let strict = cli.strict;
    match run(cli).await {
        Ok(rejected) if strict && rejected > 0 => {
            tracing::warn!("{} operation(s) rejected by the device", rejected);
            ExitCode::from(2)
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
