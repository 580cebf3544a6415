//! Callscope CLI — batch parse and report commands.
//!
//! Commands:
//! - `parse` — classify a message dump with a channel config, correlate and
//!   aggregate, and save the artifact set (events.json, details.json,
//!   details.csv)
//! - `report` — fold aggregated calls by reporting key and print a summary
//!   with the configured ladder potentials

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use callscope_core::correlate::propagate_all;
use callscope_core::pipeline::classify_all;
use callscope_core::report::{group_by_key, potential_loss, potential_target_profits};
use callscope_core::{
    build_pipeline, AggregationContext, CompiledConfig, Event, OrderDetail, ParserConfig,
    RawMessage,
};

#[derive(Parser)]
#[command(
    name = "callscope",
    about = "Callscope CLI — signal-channel call extraction and scoring"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a message dump and save the aggregated artifact set.
    Parse {
        /// Channel config file (TOML or JSON).
        #[arg(long)]
        config: PathBuf,

        /// Message dump: a JSON array of raw messages.
        #[arg(long)]
        input: PathBuf,

        /// Output directory for the artifact set.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Print a per-position summary folded by reporting key.
    Report {
        /// Channel config file (TOML or JSON).
        #[arg(long)]
        config: PathBuf,

        /// Message dump: a JSON array of raw messages.
        #[arg(long)]
        input: PathBuf,

        /// Also list open (unclosed) calls.
        #[arg(long, default_value_t = false)]
        open: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            config,
            input,
            output_dir,
        } => run_parse(&config, &input, &output_dir),
        Commands::Report {
            config,
            input,
            open,
        } => run_report(&config, &input, open),
    }
}

// ─── Loading ─────────────────────────────────────────────────────────

fn load_config(path: &Path) -> Result<ParserConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&raw)
            .with_context(|| format!("parsing TOML config {}", path.display())),
        Some("json") => serde_json::from_str(&raw)
            .with_context(|| format!("parsing JSON config {}", path.display())),
        _ => bail!("config must be a .toml or .json file: {}", path.display()),
    }
}

fn load_messages(path: &Path) -> Result<Vec<RawMessage>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading message dump {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing message dump {}", path.display()))
}

fn run_engine(config_path: &Path, input_path: &Path) -> Result<(Vec<Event>, AggregationContext)> {
    let config = load_config(config_path)?;
    let compiled = Arc::new(CompiledConfig::compile(&config)?);
    let pipeline = build_pipeline(&compiled)?;
    let messages = load_messages(input_path)?;

    tracing::info!(messages = messages.len(), "classifying batch");
    let events = classify_all(&messages, &pipeline);

    let mut ctx = AggregationContext::build(&events);
    propagate_all(&mut ctx);
    Ok((events, ctx))
}

// ─── parse ───────────────────────────────────────────────────────────

fn run_parse(config_path: &Path, input_path: &Path, output_dir: &Path) -> Result<()> {
    let (events, ctx) = run_engine(config_path, input_path)?;

    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    fs::write(
        output_dir.join("events.json"),
        serde_json::to_string_pretty(&events)?,
    )?;
    fs::write(
        output_dir.join("details.json"),
        serde_json::to_string_pretty(&ctx.details)?,
    )?;
    fs::write(
        output_dir.join("details.csv"),
        export_details_csv(&ctx.details)?,
    )?;

    let closed = ctx.details.iter().filter(|d| d.closed).count();
    let stopped = ctx.details.iter().filter(|d| d.stopped_out()).count();
    println!(
        "{} events, {} calls ({} closed, {} stopped out)",
        events.len(),
        ctx.details.len(),
        closed,
        stopped
    );
    println!("Artifacts saved to: {}", output_dir.display());

    Ok(())
}

fn export_details_csv(details: &[OrderDetail]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "order_id",
        "opened_at",
        "coin",
        "direction",
        "leverage",
        "stop_loss",
        "avg_entry_price",
        "max_reached_entry",
        "max_reached_target",
        "pnl_pct",
        "closed",
        "stopped_out",
    ])?;
    for d in details {
        wtr.write_record([
            d.order_id.clone(),
            d.opened_at.to_rfc3339(),
            d.order.coin.clone(),
            d.order.resolved_direction().to_string(),
            format!("{}", d.leverage),
            d.order
                .stop_loss
                .map(|sl| sl.to_string())
                .unwrap_or_default(),
            format!("{:.8}", d.avg_entry_price),
            d.max_reached_entry.to_string(),
            d.max_reached_target.to_string(),
            format!("{:.4}", d.pnl_pct),
            d.closed.to_string(),
            d.stopped_out().to_string(),
        ])?;
    }
    let bytes = wtr.into_inner()?;
    Ok(String::from_utf8(bytes)?)
}

// ─── report ──────────────────────────────────────────────────────────

fn run_report(config_path: &Path, input_path: &Path, list_open: bool) -> Result<()> {
    let (_, ctx) = run_engine(config_path, input_path)?;
    let grouped = group_by_key(&ctx.details);

    println!("{} positions from {} calls", grouped.len(), ctx.details.len());
    println!();

    for (key, details) in &grouped {
        let closed = details.iter().filter(|d| d.closed).count();
        let mean_pnl =
            details.iter().map(|d| d.pnl_pct).sum::<f64>() / details.len() as f64;
        println!(
            "{key}: {} call(s), {closed} closed, mean pnl {mean_pnl:.2}%",
            details.len()
        );

        let order = &details[0].order;
        let profits = potential_target_profits(order);
        if !profits.is_empty() {
            let rendered: Vec<String> = profits.iter().map(|p| format!("{p:.1}%")).collect();
            println!("  target potential: {}", rendered.join(" / "));
        }
        if let Some(loss) = potential_loss(order) {
            println!("  stop potential:   {loss:.1}%");
        }
    }

    if list_open {
        println!();
        println!("Open calls:");
        for d in ctx.details.iter().filter(|d| !d.closed) {
            println!(
                "  {} {} (opened {}, {}/{} targets)",
                d.order_id,
                d.order.coin,
                d.opened_at.format("%Y-%m-%d %H:%M"),
                d.max_reached_target,
                d.order.targets.len()
            );
        }
    }

    Ok(())
}
