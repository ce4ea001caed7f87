mod cli;

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{debug, info};
use tokio::sync::mpsc;

use netbroker::dispatch::{self, Dispatcher};
use netbroker::driver::Drivers;
use netbroker::error::{Error, InputError};
use netbroker::inventory::{self, DeviceDescriptor};
use netbroker::outcome::OperationOutcome;
use netbroker::report;
use netbroker::resolver::{Defaults, Operation};

use crate::cli::Cli;

/// Exit status for errors that stop the whole batch before dispatch.
const BATCH_ERROR_EXIT: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.global.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::from(BATCH_ERROR_EXIT)
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

async fn run(cli: Cli) -> Result<ExitCode, Error> {
    let invocation = cli.invocation()?;
    let devices = load_inventory(cli.global.inventory.as_deref())?;
    info!("loaded {} devices", devices.len());

    let jobs = dispatch::plan(&devices, &invocation, &Defaults::default());

    let mut dispatcher = Dispatcher::new(Arc::new(Drivers::default()))
        .with_workers(cli.global.workers)
        .with_stagger(cli.global.delay.unwrap_or_default())
        .with_batch_timeout(cli.global.batch_timeout);

    let mut printer = None;
    if cli.global.stream {
        let (sink, records) = mpsc::unbounded_channel();
        dispatcher = dispatcher.with_stream(sink);
        printer = Some(tokio::spawn(print_stream(invocation.operation, records)));
    }

    let batch = dispatcher.dispatch(jobs, invocation.operation).await;
    drop(dispatcher);
    if let Some(printer) = printer {
        printer.await.map_err(io::Error::other)??;
    }
    debug!(
        "{} of {} devices failed",
        batch.failed_count(),
        batch.len()
    );

    let report = report::render(&batch, cli.global.pretty).map_err(io::Error::other)?;

    if let Some(stdout) = &report.stdout {
        let mut out = io::stdout().lock();
        writeln!(out, "{stdout}")?;
        out.flush()?;
    }
    if let Some(stderr) = &report.stderr {
        eprintln!("{stderr}");
    }

    Ok(ExitCode::from(report.exit_code as u8))
}

/// Print streamed records until the dispatcher drops its sink.
async fn print_stream(
    operation: Operation,
    mut records: mpsc::UnboundedReceiver<OperationOutcome>,
) -> io::Result<()> {
    while let Some(outcome) = records.recv().await {
        let line = report::stream_record(operation, &outcome).map_err(io::Error::other)?;
        let mut out = io::stdout().lock();
        writeln!(out, "{line}")?;
        out.flush()?;
    }
    Ok(())
}

fn load_inventory(path: Option<&Path>) -> Result<Vec<DeviceDescriptor>, InputError> {
    match path {
        Some(path) => {
            debug!("reading inventory from {}", path.display());
            let file = File::open(path).map_err(InputError::Read)?;
            inventory::read(BufReader::new(file))
        }
        None => inventory::read(io::stdin().lock()),
    }
}
