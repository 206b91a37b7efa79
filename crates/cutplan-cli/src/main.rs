use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use cutplan_core::{
    BarOptimizationRequest, LinearOptimizer, PanelOptimizationRequest, PanelOptimizer, Rejection,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cutplan")]
#[command(about = "Cutting plans for profile bars and panel sheets", long_about = None)]
struct Cli {
    /// Log optimizer progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan linear cuts on stock bars
    Bars {
        /// Input file (YAML or JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for result (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write identical bars once with a repeat count
        #[arg(long)]
        grouped: bool,
    },

    /// Nest rectangular panels on stock sheets
    Panels {
        /// Input file (YAML or JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for result (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Bars {
            input,
            output,
            grouped,
        } => {
            bars_command(input, output, grouped)?;
        }
        Commands::Panels { input, output } => {
            panels_command(input, output)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads a request document, picking the format from the file extension.
fn load_request<T: DeserializeOwned>(input: &Path) -> Result<T> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let request = match input.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        _ => serde_json::from_str(&content)?,
    };
    Ok(request)
}

fn write_result<T: Serialize>(result: &T, output: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    if let Some(output_path) = output {
        std::fs::write(&output_path, json)?;
        println!(
            "💾 Saved result to {}",
            output_path.display().to_string().bright_white()
        );
    } else {
        println!("{}", json);
    }
    Ok(())
}

fn bars_command(input: PathBuf, output: Option<PathBuf>, grouped: bool) -> Result<()> {
    println!("{}", "🔍 Loading cut list...".bright_blue());

    let request: BarOptimizationRequest = load_request(&input)?;
    println!(
        "  {} cut requests",
        request.cuts.len().to_string().bright_white().bold()
    );
    println!(
        "  {} catalog profiles",
        request.catalog.len().to_string().bright_white().bold()
    );
    println!();

    println!("{}", "🚀 Running optimization...".bright_blue());
    let result = LinearOptimizer::new(request)?.optimize();

    println!();
    println!("{}", "✅ Optimization complete!".bright_green().bold());
    println!();

    println!("{}", "📊 Results:".bright_yellow().bold());
    for plan in &result.profiles {
        let title = if plan.description.is_empty() {
            plan.profile_code.clone()
        } else {
            format!("{} ({})", plan.profile_code, plan.description)
        };
        println!("  {}: {} bars", title.bright_white(), plan.bars.len());
        for group in plan.grouped() {
            println!(
                "    • {}x  {}  (residual {:.1})",
                group.count,
                group.bar.tally,
                group.bar.residual
            );
        }
    }
    println!();
    println!(
        "  Total bars: {}",
        result.summary.total_bars.to_string().bright_white().bold()
    );
    println!(
        "  Total waste: {}%",
        format!("{:.1}", result.summary.waste_percentage).bright_white()
    );
    print_rejections(&result.rejected, result.placed_pieces());
    println!();

    if grouped {
        let groups: Vec<_> = result
            .profiles
            .iter()
            .map(|p| (p.profile_code.clone(), p.grouped()))
            .collect();
        write_result(&groups, output)
    } else {
        write_result(&result, output)
    }
}

fn panels_command(input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    println!("{}", "🔍 Loading panel list...".bright_blue());

    let request: PanelOptimizationRequest = load_request(&input)?;
    println!(
        "  {} panel requests on {}x{} sheets",
        request.panels.len().to_string().bright_white().bold(),
        request.sheet_width,
        request.sheet_height
    );
    println!();

    println!("{}", "🚀 Running optimization...".bright_blue());
    let result = PanelOptimizer::new(request)?.optimize();

    println!();
    println!("{}", "✅ Optimization complete!".bright_green().bold());
    println!();

    println!("{}", "📊 Results:".bright_yellow().bold());
    println!("  Sheets required:");
    for plan in &result.materials {
        println!(
            "    • {} {}: {} sheets",
            plan.material.bright_white(),
            plan.thickness,
            plan.sheets.len()
        );
    }
    println!();
    println!(
        "  Total sheets: {}",
        result.summary.total_sheets.to_string().bright_white().bold()
    );
    println!(
        "  Total waste: {}%",
        format!("{:.1}", result.summary.waste_percentage).bright_white()
    );
    print_rejections(&result.rejected, result.placed_panels());
    println!();

    write_result(&result, output)
}

fn print_rejections(rejected: &[Rejection], placed: usize) {
    if rejected.is_empty() {
        return;
    }

    let missing: u32 = rejected.iter().map(|r| r.pieces).sum();
    println!();
    println!(
        "  {}",
        format!(
            "⚠️  {} of {} pieces placed, {} left out:",
            placed,
            placed + missing as usize,
            missing
        )
        .bright_red()
    );
    for rejection in rejected {
        println!(
            "    • #{} {}: {}",
            rejection.request_index,
            rejection.item.bright_white(),
            rejection.reason
        );
    }
}
