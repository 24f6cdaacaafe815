//! CLI for the respool resource pool.
//!
//! `demo`: seed -> allocate/release sequence -> snapshot.
//! `audit`: replay the journal -> per-resource report.

use clap::{Parser, Subcommand};
use respool_core::{PoolResult, ResourceId};
use respool_journal::{AuditReport, Durability, JournalSink};
use respool_pool::{PoolConfig, PoolManager, ResourceHandle};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "respool", version, about = "Journaled resource pool manager")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Seed a pool and run an illustrative allocate/release sequence.
    Demo {
        #[arg(short, long, env = "RESPOOL_JOURNAL", default_value = "resource_log.txt")]
        journal: PathBuf,

        /// Number of resources to seed (IDs 1..=N).
        #[arg(short, long, default_value_t = 3)]
        resources: u64,

        /// fsync the journal after every line instead of only flushing.
        #[arg(long, default_value_t = false)]
        fsync: bool,

        /// Reject releasing a resource that is under maintenance.
        #[arg(long, default_value_t = false)]
        strict: bool,

        /// Print the final snapshot as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Summarize the transaction journal.
    Audit {
        #[arg(short, long, env = "RESPOOL_JOURNAL", default_value = "resource_log.txt")]
        journal: PathBuf,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo {
            journal,
            resources,
            fsync,
            strict,
            json,
        } => {
            let durability = if fsync {
                Durability::Fsync
            } else {
                Durability::Flush
            };
            let config = if strict {
                PoolConfig::strict()
            } else {
                PoolConfig::default()
            };

            tracing::info!(journal = %journal.display(), resources, ?durability, "starting demo");

            let mut pool = PoolManager::open(&journal, durability, config)?;
            pool.seed_many((1..=resources).map(ResourceId))?;

            // 1. Allocate and immediately release.
            if let Some(h) = try_allocate(&mut pool)? {
                pool.release(h)?;
            }

            // 2. Take three; with a small pool the last one may fail.
            let r2 = try_allocate(&mut pool)?;
            let r3 = try_allocate(&mut pool)?;
            let _r4 = try_allocate(&mut pool)?;

            // 3. Give two back and allocate again.
            for h in [r2, r3].into_iter().flatten() {
                pool.release(h)?;
            }
            if let Some(h) = try_allocate(&mut pool)? {
                println!("Successfully allocated resource ID: {}", h.id());
            }

            let snapshot = pool.snapshot();
            tracing::info!(
                journal = %pool.journal().path().display(),
                durability = ?pool.journal().durability(),
                lines = pool.journal().lines_written(),
                "demo finished"
            );
            pool.close()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                for r in &snapshot.resources {
                    println!("Resource {:>6}: {}", r.id(), r.state());
                }
                println!(
                    "total {}  idle {}  in use {}  under maintenance {}",
                    snapshot.total, snapshot.idle, snapshot.in_use, snapshot.under_maintenance
                );
            }
        }

        Commands::Audit { journal, json } => {
            let entries = respool_journal::replay_file(&journal)?;
            let report = AuditReport::build(&entries);

            tracing::info!(
                journal = %journal.display(),
                entries = report.total_entries,
                outstanding = report.outstanding.len(),
                "audit complete"
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render());
            }
        }
    }

    Ok(())
}

/// Allocation where exhaustion is reported and tolerated; other failures
/// (a broken journal) propagate.
fn try_allocate<J: JournalSink>(pool: &mut PoolManager<J>) -> PoolResult<Option<ResourceHandle>> {
    match pool.allocate() {
        Ok(h) => {
            tracing::info!(resource_id = %h.id(), "allocated");
            Ok(Some(h))
        }
        Err(e) if e.is_recoverable() => {
            eprintln!("Allocation failed: {e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
