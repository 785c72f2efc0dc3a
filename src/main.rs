//! Replays a TOML edit scenario against an in-memory text surface and
//! reports every pass.

use anyhow::{Context, Result, bail};
use clap::Parser;
use mimalloc::MiMalloc;
use scenario::{FixtureStatus, PassRecord, Scenario, escape_text};
use std::path::PathBuf;
use text_reconciler::FrontendCall;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "textsync")]
#[command(about = "Replay a document edit scenario through the flat-text reconciler", version)]
struct Cli {
    /// Scenario file (TOML)
    scenario: PathBuf,

    /// Only print the final text
    #[arg(short, long)]
    quiet: bool,

    /// Print the final range cache as JSON
    #[arg(long)]
    dump_cache: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let scenario = Scenario::load(&cli.scenario)
        .with_context(|| format!("loading scenario {}", cli.scenario.display()))?;
    if scenario.status == FixtureStatus::Skip {
        log::warn!(
            "scenario '{}' is marked skip: {}",
            scenario.name,
            scenario.reason.as_deref().unwrap_or_default()
        );
    }
    log::info!("running '{}' ({} steps)", scenario.name, scenario.steps.len());

    let run = match scenario::run(&scenario) {
        Ok(run) => run,
        Err(err) => bail!("scenario '{}' failed: {err}", scenario.name),
    };

    if !cli.quiet {
        for pass in &run.passes {
            print_pass(pass);
        }
    }
    println!("{}", run.final_text);

    if cli.dump_cache {
        let rows = run.cache_rows();
        let json = serde_json::to_string_pretty(&rows).context("serializing range cache")?;
        println!("{json}");
    }
    Ok(())
}

fn print_pass(pass: &PassRecord) {
    match pass.step {
        Some(step) => println!("pass at step {step}:"),
        None => println!("attach:"),
    }
    let report = &pass.report;
    println!(
        "  {} deletions ({} chars), {} insertions ({} chars), {} nodes visited",
        report.deletions,
        report.deleted_chars,
        report.insertions,
        report.inserted_chars,
        report.visited_nodes
    );
    for call in &pass.calls {
        match call {
            FrontendCall::Delete { location, length } => println!("  delete {location}+{length}"),
            FrontendCall::Insert { location, text } => {
                println!("  insert {location} \"{}\"", escape_text(text))
            }
            FrontendCall::BeginEditing | FrontendCall::EndEditing => {}
        }
    }
    println!("  text: \"{}\"", escape_text(&pass.text));
}
