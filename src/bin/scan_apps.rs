use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use appscope_lib::models::{AppRecord, RootKind, ScanEvent, ScanSummary};
use appscope_lib::{AppScopeService, EngineConfig, format_bytes, render_audit, render_disks, render_scan_table};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "scan_apps")]
#[command(about = "Attribute disk usage to installed applications")]
struct Args {
    /// JSON engine config; defaults to $APPSCOPE_CONFIG
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a scan, printing each event as a JSON line
    Scan {
        /// Print a table once the scan is done instead of the event stream
        #[arg(long)]
        summary: bool,
    },
    /// Coverage audit of every directory root
    Audit {
        #[arg(long)]
        json: bool,
    },
    /// Size of one root child folder
    Measure { kind: RootKind, folder: String },
    /// Mounted volumes and free space
    Disks {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_dir = args
        .log_dir
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("appscope-logs"));
    let _logging = appscope_logging::init_logging(&log_dir).context("init logging")?;

    let mut config = EngineConfig::load(args.config.as_deref()).context("load config")?;
    if let Some(threads) = args.threads.filter(|threads| *threads > 0) {
        config.worker_threads = Some(threads);
    }
    let service = AppScopeService::from_config(config);

    match args.command {
        Command::Scan { summary } => run_scan(&service, summary).await,
        Command::Audit { json } => {
            let overview = service.get_audit_overview(None).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&overview)?);
            } else {
                println!("{}", render_audit(&overview));
            }
            Ok(())
        }
        Command::Measure { kind, folder } => {
            let bytes = service.measure_folder_size(kind, folder.clone(), None).await?;
            println!("{}\t{}\t{bytes}\t{}", kind.as_str(), folder, format_bytes(bytes));
            Ok(())
        }
        Command::Disks { json } => {
            let disks = service.list_disks(None).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&disks)?);
            } else {
                println!("{}", render_disks(&disks));
            }
            Ok(())
        }
    }
}

async fn run_scan(service: &AppScopeService, summary: bool) -> Result<()> {
    let mut receiver = service.start_scan(None)?;
    let mut records: Vec<AppRecord> = Vec::new();
    let mut done: Option<ScanSummary> = None;

    while let Some(event) = receiver.recv().await {
        if !summary {
            println!("{}", serde_json::to_string(&event)?);
        }
        match event {
            ScanEvent::Result(record) => records.push(record),
            ScanEvent::Done(finished) => done = Some(finished),
            ScanEvent::Progress(_) => {}
        }
    }

    if summary {
        println!("{}", render_scan_table(&records));
    }
    match done {
        Some(finished) if finished.failed => bail!("scan failed to enumerate installed programs"),
        Some(_) => Ok(()),
        None => bail!("scan ended without a completion event"),
    }
}
