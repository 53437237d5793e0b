//! CopperRoute CLI - replay routing sessions and inspect boards from the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use copperroute::core::{CheckResult, ObstacleSummary};
use copperroute::geometry::to_mm;
use copperroute::replay::{ReplayReport, Script};
use copperroute::{load_board, load_config, CopperRouteCore, LayerTable, LoadedBoard, Outcome, RouterConfig};
use std::path::{Path, PathBuf};
use std::process;
use tracing::Level;

#[derive(Parser)]
#[command(name = "copperroute")]
#[command(about = "Interactive PCB track routing, scripted", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scripted routing session over a board
    Replay {
        /// Path to .kicad_pcb or board .json file
        #[arg(value_name = "BOARD")]
        board: PathBuf,

        /// Path to the event script (.json)
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// Router configuration (.json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Write the routed board as JSON to this path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Exit with error code if any action was refused
        #[arg(long)]
        fail_on_refused: bool,
    },

    /// List the obstacles a route on a layer would have to avoid
    Obstacles {
        /// Path to .kicad_pcb or board .json file
        #[arg(value_name = "BOARD")]
        board: PathBuf,

        /// Copper layer name
        #[arg(short, long, default_value = "F.Cu")]
        layer: String,

        /// Net being routed; its own copper is not an obstacle
        #[arg(short, long)]
        net: Option<String>,

        /// Router configuration (.json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Check board connectivity consistency
    Check {
        /// Path to .kicad_pcb or board .json file
        #[arg(value_name = "BOARD")]
        board: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// List the copper layer stackup
    Layers {
        /// Board to read the stackup from; defaults to the configured table
        #[arg(value_name = "BOARD")]
        board: Option<PathBuf>,

        /// Router configuration (.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for tooling
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Replay {
            board,
            script,
            config,
            format,
            output,
            fail_on_refused,
        } => handle_replay(&board, &script, config.as_deref(), format, output.as_deref(), fail_on_refused),
        Commands::Obstacles {
            board,
            layer,
            net,
            config,
            format,
        } => handle_obstacles(&board, &layer, net.as_deref(), config.as_deref(), format),
        Commands::Check { board, format } => handle_check(&board, format),
        Commands::Layers { board, config } => handle_layers(board.as_deref(), config.as_deref()),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    process::exit(exit_code);
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn open(board: &Path, config: Option<&Path>) -> Result<(LoadedBoard, RouterConfig)> {
    let loaded = load_board(board).with_context(|| format!("failed to load {}", board.display()))?;
    let config = load_config(config, loaded.layers.as_ref()).context("failed to load router configuration")?;
    Ok((loaded, config))
}

fn handle_replay(
    board: &Path,
    script: &Path,
    config: Option<&Path>,
    format: OutputFormat,
    output: Option<&Path>,
    fail_on_refused: bool,
) -> Result<i32> {
    let (loaded, config) = open(board, config)?;
    let script = Script::from_path(script).with_context(|| format!("failed to read script {}", script.display()))?;
    let (report, routed) = CopperRouteCore::replay(loaded.board, config, &script)?;

    if let Some(path) = output {
        let json = routed.to_json_string()?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    }

    match format {
        OutputFormat::Human => output_replay_human(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if fail_on_refused && report.summary.refused > 0 {
        return Ok(1);
    }
    Ok(0)
}

fn output_replay_human(report: &ReplayReport) {
    for step in &report.steps {
        let label = match &step.outcome {
            Outcome::Ignored => continue,
            Outcome::Started => "started",
            Outcome::Updated => "updated",
            Outcome::Committed(_) => "committed",
            Outcome::Finished(_) => "finished",
            Outcome::Refused => "REFUSED",
            Outcome::Canceled => "canceled",
        };
        print!("  [{:>3}] {:<10}", step.index, label);
        if let Some(end) = step.candidate.last() {
            print!(" -> ({:.3}, {:.3})", end[0], end[1]);
        }
        if !step.valid {
            print!(" (blocked)");
        }
        if let Some(ref notice) = step.notice {
            print!("  {}", notice);
        }
        println!();
    }

    let s = &report.summary;
    println!("\n  Summary:");
    println!("    Committed: {}", s.committed);
    println!("    Finished:  {}", s.finished);
    println!("    Refused:   {}", s.refused);
    println!("    Canceled:  {}", s.canceled);
    println!("    Tracks:    {}", s.tracks);
    println!("    Junctions: {}", s.junctions);
    println!("    Vias:      {}", s.vias);
    println!("    Merges:    {}", s.merges);
}

fn handle_obstacles(
    board: &Path,
    layer: &str,
    net: Option<&str>,
    config: Option<&Path>,
    format: OutputFormat,
) -> Result<i32> {
    let (loaded, config) = open(board, config)?;
    let summary = CopperRouteCore::obstacles(&loaded.board, &config, layer, net)?;
    match format {
        OutputFormat::Human => output_obstacles_human(&summary),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(0)
}

fn output_obstacles_human(summary: &ObstacleSummary) {
    println!("\nLayer: {}", summary.layer);
    if let Some(ref net) = summary.net {
        println!("Routing net: {}", net);
    }
    println!("{}", "─".repeat(60));
    if summary.count == 0 {
        println!("  No obstacles");
        return;
    }
    for (kind, count) in &summary.by_kind {
        println!("  {:<10} {}", kind, count);
    }
    println!("\n  Total: {}", summary.count);
}

fn handle_check(board: &Path, format: OutputFormat) -> Result<i32> {
    let loaded = load_board(board).with_context(|| format!("failed to load {}", board.display()))?;
    let result = CopperRouteCore::check(&loaded.board);
    match format {
        OutputFormat::Human => output_check_human(board, &result),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    Ok(if result.is_clean() { 0 } else { 1 })
}

fn output_check_human(path: &Path, result: &CheckResult) {
    println!("\nFile: {}", path.display());
    println!("{}", "─".repeat(60));
    let s = &result.stats;
    println!(
        "  {} nets, {} pads, {} junctions, {} tracks, {} vias, {} keepouts",
        s.nets, s.pads, s.junctions, s.tracks, s.vias, s.keepouts
    );
    if result.is_clean() {
        println!("  No issues found");
        return;
    }
    println!("\n  ISSUES:");
    for issue in &result.issues {
        println!("    - {}", issue);
    }
}

fn handle_layers(board: Option<&Path>, config: Option<&Path>) -> Result<i32> {
    let stackup = match board {
        Some(path) => load_board(path)
            .with_context(|| format!("failed to load {}", path.display()))?
            .layers,
        None => None,
    };
    let config = load_config(config, stackup.as_ref()).context("failed to load router configuration")?;
    output_layers(&config.layers, &config);
    Ok(0)
}

fn output_layers(layers: &LayerTable, config: &RouterConfig) {
    println!("Copper layers (top to bottom):\n");
    for info in &layers.copper {
        println!("  {:>2}  {}", info.id.0, info.name);
    }
    println!(
        "\n  Track width {:.3} mm, via {:.3}/{:.3} mm",
        to_mm(config.track_width),
        to_mm(config.via.diameter),
        to_mm(config.via.drill)
    );
}
