//! # livepprof - Demo Entry Point
//!
//! Replays a recorded sample file through the full profiler stack (DWARF
//! symbolization, CPU and heap collectors, scheduling, ranking) and prints
//! every report as it is delivered.
//!
//! Runs until `--duration` elapses or Ctrl+C, then closes the profiler.

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::Receiver;
use log::{debug, info};
use std::future::Future;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use livepprof::cli::Args;
use livepprof::sample_file::SampleFile;
use livepprof::symbolization::{check_target, current_binary, SymbolResolver, Symbolizer};
use livepprof::{Data, Profiler, ProfilerError, Signal};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ProfilerError>() {
        Some(ProfilerError::InvalidOption(_)) => EXIT_USAGE,
        _ => EXIT_ERROR,
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();
    let options = args.to_options()?;

    let target = match &args.target {
        Some(target) => std::fs::canonicalize(target)
            .with_context(|| format!("Failed to resolve path: {}", target.display()))?,
        None => current_binary()?,
    };
    check_target(&target)?;
    let symbolizer = Symbolizer::new(&target).context("Failed to load symbols")?;
    let backend = Arc::new(SampleFile::from_file(&args.samples)?);
    info!("replaying {} against {}", args.samples.display(), target.display());

    let resolver = Arc::new(SymbolResolver::new(Arc::new(symbolizer)));
    let profiler = Profiler::new(options, Arc::clone(&resolver), backend.clone(), backend);

    let printers: Vec<JoinHandle<usize>> = [Signal::Cpu, Signal::Heap]
        .into_iter()
        .filter_map(|signal| profiler.stream(signal).map(|rx| (signal, rx)))
        .map(|(signal, rx)| {
            let json = args.json;
            std::thread::spawn(move || print_reports(signal, &rx, json))
        })
        .collect();

    if !args.quiet {
        eprintln!(
            "profiling: delay {:?}, limit {} (Ctrl+C to stop)",
            profiler.options().delay(),
            profiler.options().limit()
        );
    }
    let started = Instant::now();
    profiler.start()?;

    let exit_reason = wait_for_exit(args.duration, tokio::signal::ctrl_c()).await?;

    profiler.close();
    let reports: usize = printers.into_iter().filter_map(|printer| printer.join().ok()).sum();

    if !args.quiet {
        eprintln!(
            "\n{exit_reason}: {:.1}s, {reports} reports, {} cached locations",
            started.elapsed().as_secs_f64(),
            resolver.cached_locations()
        );
    }
    Ok(())
}

/// Wait for `duration` seconds (0 = forever) or an interrupt, whichever comes first.
async fn wait_for_exit<F>(duration: u64, interrupt: F) -> Result<&'static str>
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::pin!(interrupt);
    if duration == 0 {
        interrupt.await.context("Failed to listen for Ctrl+C")?;
        return Ok("interrupted");
    }
    tokio::select! {
        () = tokio::time::sleep(Duration::from_secs(duration)) => Ok("duration limit reached"),
        res = &mut interrupt => {
            res.context("Failed to listen for Ctrl+C")?;
            Ok("interrupted")
        }
    }
}

/// Print every report of one stream until it closes.
fn print_reports(signal: Signal, rx: &Receiver<Data>, json: bool) -> usize {
    let mut count = 0;
    for data in rx {
        count += 1;
        if json {
            let line = serde_json::json!({
                "signal": signal,
                "timestamp_ms": data.timestamp_millis(),
                "entries": data.entries,
            });
            println!("{line}");
            continue;
        }

        println!("\n[{signal}] {} ms, {} entries", data.timestamp_millis(), data.entries.len());
        for (rank, entry) in data.entries.iter().enumerate() {
            println!(
                "{:>3} {:>16.2}  {}  ({})  {}",
                rank + 1,
                entry.value,
                entry.key.function,
                entry.key.file,
                entry.key.stack
            );
        }
    }
    debug!("{signal} stream closed after {count} reports");
    count
}
