//! dircat - filesystem catalog scanner
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use dircat::config::{validate_compare, validate_roots, CliArgs, Command};
use dircat::db::{CatalogStore, OpenMode};
use dircat::progress::{print_scan_header, print_scan_summary};
use dircat::query;
use dircat::scan::ScanSession;
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();
    setup_logging(args.verbose)?;

    match args.command {
        Command::Scan { ref roots, no_hash } => run_scan(&args, roots, no_hash),
        Command::List { duplicates, scan } => run_list(&args, scan, duplicates),
        Command::Compare {
            scan_a,
            scan_b,
            force,
        } => run_compare(&args, scan_a, scan_b, force),
    }
}

fn run_scan(args: &CliArgs, roots: &[std::path::PathBuf], no_hash: bool) -> Result<()> {
    validate_roots(roots).context("Invalid scan configuration")?;

    let mut store = CatalogStore::open(&args.catalog, OpenMode::Write)
        .with_context(|| format!("Cannot open catalog '{}'", args.catalog.display()))?;

    // Graceful shutdown: the flag stops traversal and the session commits
    // whatever was inserted, so an interrupted scan stays query-able.
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            eprintln!("\nInterrupt received, committing partial scan...");
            shutdown.store(true, Ordering::SeqCst);
        })
        .context("Failed to set signal handler")?;
    }

    let session = ScanSession::new(!no_hash, Arc::clone(&shutdown)).with_progress(!args.quiet);

    let mut failures = 0usize;
    for root in roots {
        if !args.quiet {
            print_scan_header(
                &root.display().to_string(),
                !no_hash,
                &args.catalog.display().to_string(),
            );
        }

        // Each root gets its own begin/commit pair; one root's failure
        // does not poison the others.
        match session.run(&mut store, root) {
            Ok(result) => {
                if args.quiet {
                    info!(
                        scan_id = result.scan_id,
                        root = %root.display(),
                        "scan finished"
                    );
                } else {
                    print_scan_summary(&result);
                }
            }
            Err(e) => {
                failures += 1;
                error!(root = %root.display(), error = %e, "scan failed");
                eprintln!("Scan of '{}' failed: {e:#}", root.display());
            }
        }

        if shutdown.load(Ordering::SeqCst) {
            break;
        }
    }

    if shutdown.load(Ordering::SeqCst) {
        anyhow::bail!("interrupted - committed scans may be truncated");
    }
    if failures > 0 {
        anyhow::bail!("{failures} of {} root scan(s) failed", roots.len());
    }
    Ok(())
}

fn run_list(args: &CliArgs, scan: Option<i64>, duplicates: bool) -> Result<()> {
    let store = open_for_reading(&args.catalog)?;
    query::run_list(&store, scan, duplicates)?;
    Ok(())
}

fn run_compare(args: &CliArgs, scan_a: i64, scan_b: i64, force: bool) -> Result<()> {
    validate_compare(scan_a, scan_b).context("Invalid compare configuration")?;
    let mut store = open_for_reading(&args.catalog)?;
    query::run_compare(&mut store, scan_a, scan_b, force)?;
    Ok(())
}

fn open_for_reading(catalog: &Path) -> Result<CatalogStore> {
    CatalogStore::open_existing(catalog)
        .with_context(|| format!("Cannot open catalog '{}'", catalog.display()))
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("dircat=debug,warn")
    } else {
        EnvFilter::new("dircat=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
