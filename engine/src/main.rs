//! Operator CLI for the sales engine
//!
//! Runs settlement and inspection commands against a store snapshot file.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use engine::{EngineConfig, SalesEngine};
use shared::{format_cents, logging, AgentId, BatchId, ProcessId};

/// Payroll settlement and credential pool inspection
#[derive(Parser)]
#[command(name = "engine")]
#[command(about = "Operator commands for the sales pipeline and payroll engine")]
pub struct Args {
    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Store snapshot file; refused while another process holds it
    #[arg(long, default_value = "data/store.json")]
    pub snapshot: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Installed clients awaiting settlement, grouped by cutoff
    Pending,
    /// Settle every pending client into a new payroll batch
    Settle {
        /// Login of the payroll administrator
        #[arg(long)]
        caller: String,
    },
    /// List payroll batches, newest first
    Batches,
    /// Per-agent totals of one batch
    Breakdown { batch_id: String },
    /// Mark a batch as paid
    MarkPaid {
        batch_id: String,
        #[arg(long)]
        caller: String,
    },
    /// Credential pool state
    Slots,
    /// Clear expired credential claims now
    Sweep,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    ProcessId::init_engine();
    logging::init_tracing_with_level(Some(args.log_level.as_str()));

    let config = EngineConfig::load(args.config.as_deref()).context("loading configuration")?;
    let engine = SalesEngine::open(config, Some(args.snapshot.as_path()))
        .await
        .with_context(|| format!("opening store {}", args.snapshot.display()))?;

    match args.command {
        Command::Pending => {
            let groups = engine.payroll().query_pending().await?;
            if args.json {
                return print_json(&groups);
            }
            if groups.is_empty() {
                println!("Nothing pending settlement");
            }
            for group in groups {
                println!(
                    "Cutoff {}: {} clients, {}",
                    group.cutoff,
                    group.clients.len(),
                    format_cents(group.total_cents)
                );
                for client in group.clients {
                    println!(
                        "  {}  {:<24} {:<12} {:>10}  {}",
                        client.id,
                        client.full_name,
                        client.service_type,
                        format_cents(client.commission_cents),
                        client.owner
                    );
                }
            }
        }
        Command::Settle { caller } => {
            let batch = engine.payroll().generate_payroll_batch(&AgentId::new(caller)).await?;
            if args.json {
                return print_json(&batch);
            }
            println!(
                "Created {} ({}): {} clients, {}",
                batch.name,
                batch.id,
                batch.member_count,
                format_cents(batch.total_cents)
            );
        }
        Command::Batches => {
            let batches = engine.payroll().list_batches().await?;
            if args.json {
                return print_json(&batches);
            }
            for batch in batches {
                let paid = batch
                    .paid_at
                    .map(|at| format!("paid {}", at.format("%Y-%m-%d")))
                    .unwrap_or_else(|| "unpaid".to_string());
                println!(
                    "{}  {:<40} {:>4} clients {:>12}  {}",
                    batch.id,
                    batch.name,
                    batch.member_count,
                    format_cents(batch.total_cents),
                    paid
                );
            }
        }
        Command::Breakdown { batch_id } => {
            let id = BatchId::from_string(&batch_id)?;
            let breakdown = engine.payroll().batch_breakdown(id).await?;
            if args.json {
                return print_json(&breakdown);
            }
            for row in breakdown {
                println!(
                    "{:<28} {:>4} clients {:>12}",
                    row.display_name,
                    row.client_count,
                    format_cents(row.total_cents)
                );
            }
        }
        Command::MarkPaid { batch_id, caller } => {
            let id = BatchId::from_string(&batch_id)?;
            let batch = engine.payroll().mark_batch_paid(id, &AgentId::new(caller)).await?;
            if args.json {
                return print_json(&batch);
            }
            println!("{} marked paid", batch.name);
        }
        Command::Slots => {
            let views = engine.credentials().pair_views().await?;
            if args.json {
                return print_json(&views);
            }
            for view in views {
                let reveal = if view.reveal_allowed { "free" } else { "in use" };
                println!("{} ({reveal})", view.pair);
                for slot in view.slots {
                    let holder = slot
                        .holder()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "-".to_string());
                    println!("  {:<5} {}", slot.key.channel, holder);
                }
            }
        }
        Command::Sweep => {
            let cleared = engine.credentials().sweep_expired().await?;
            println!("Cleared {cleared} expired claims");
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
