//! `sticky-cli` – Sticky Anchor command line
//!
//! Drives the stabilization and presence engine without a renderer:
//!
//! 1. `sticky replay <scenario.toml> [--config <path>] [--json]` replays a
//!    scripted timeline through simulated anchors and prints every presence
//!    transition (coloured, or one JSON object per line).
//! 2. `sticky config [--config <path>]` prints the effective configuration.
//! 3. `sticky init [--config <path>] [--force]` writes the default
//!    configuration to `~/.sticky/config.toml`.
//!
//! **Ctrl-C** stops a replay between two frames and still prints the final
//! anchor states.

mod config;
mod scenario;

use colored::{ColoredString, Colorize};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use sticky_types::PresenceState;
use tracing::warn;

use scenario::{Replay, ReplayReport, Scenario, TransitionRecord};

// ─────────────────────────────────────────────────────────────────────────────
// Arguments
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Replay {
        scenario: PathBuf,
        config: Option<PathBuf>,
        json: bool,
    },
    ShowConfig {
        config: Option<PathBuf>,
    },
    Init {
        config: Option<PathBuf>,
        force: bool,
    },
    Help,
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let Some((cmd, rest)) = args.split_first() else {
        return Ok(Command::Help);
    };

    let mut config = None;
    let mut json = false;
    let mut force = false;
    let mut positional = Vec::new();
    let mut it = rest.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => {
                let path = it.next().ok_or("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            "--json" => json = true,
            "--force" => force = true,
            flag if flag.starts_with("--") => return Err(format!("unknown flag {flag}")),
            value => positional.push(value),
        }
    }

    match cmd.as_str() {
        "replay" => match positional.as_slice() {
            [path] => Ok(Command::Replay {
                scenario: PathBuf::from(path),
                config,
                json,
            }),
            [] => Err("replay needs a scenario file".to_string()),
            _ => Err("replay takes exactly one scenario file".to_string()),
        },
        "config" => Ok(Command::ShowConfig { config }),
        "init" => Ok(Command::Init { config, force }),
        "help" | "-h" | "--help" => Ok(Command::Help),
        other => Err(format!("unknown command {other}")),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry point
// ─────────────────────────────────────────────────────────────────────────────

fn main() {
    // Logs go to stderr through the subscriber; user-facing output uses
    // println!.
    let _guard = sticky_runtime::telemetry::init_tracing("sticky");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            print_usage();
            std::process::exit(2);
        }
    };

    let result = match command {
        Command::Replay {
            scenario,
            config,
            json,
        } => run_replay(&scenario, config.as_deref(), json),
        Command::ShowConfig { config } => show_config(config.as_deref()),
        Command::Init { config, force } => init_config(config, force),
        Command::Help => {
            print_banner();
            print_usage();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

fn run_replay(path: &std::path::Path, config: Option<&std::path::Path>, json: bool) -> Result<(), String> {
    let cfg = config::effective(config)?;
    let scenario = Scenario::load(path)?;
    let replay = Replay::new(scenario, &cfg)?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        stop_handler.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; replay cannot be interrupted");
    }

    if !json {
        print_banner();
        println!("  Replaying {}\n", path.display().to_string().bold());
    }

    let report = replay.run(&stop, |t| {
        if json {
            match serde_json::to_string(t) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "failed to encode transition"),
            }
        } else {
            print_transition(t);
        }
    });

    if json {
        let summary = serde_json::to_string(&report)
            .map_err(|e| format!("Failed to encode replay report: {}", e))?;
        println!("{summary}");
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn show_config(config: Option<&std::path::Path>) -> Result<(), String> {
    let cfg = config::effective(config)?;
    if let Err(e) = cfg.anchor.validate() {
        println!("  {} {}\n", "⚠".yellow().bold(), e.to_string().yellow());
    }
    let raw = toml::to_string_pretty(&cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    println!("{raw}");
    Ok(())
}

fn init_config(config: Option<PathBuf>, force: bool) -> Result<(), String> {
    let path = config.unwrap_or_else(config::config_path);
    if path.exists() && !force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
    }
    config::save_to(&config::Config::default(), &path)?;
    println!(
        "  {} Config saved to {}",
        "✓".green().bold(),
        path.display().to_string().bold()
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn paint(state: PresenceState) -> ColoredString {
    let label = state.to_string();
    match state {
        PresenceState::Hidden => label.dimmed(),
        PresenceState::Tracking => label.green().bold(),
        PresenceState::Holding => label.yellow().bold(),
        PresenceState::Frozen => label.cyan().bold(),
    }
}

fn print_transition(t: &TransitionRecord) {
    println!(
        "  {} {:<12} {} → {}",
        format!("[{:>9.1} ms]", t.at_ms).dimmed(),
        t.anchor.bold(),
        paint(t.from),
        paint(t.to)
    );
}

fn print_summary(report: &ReplayReport) {
    println!();
    if report.interrupted {
        println!("  {}", "Replay interrupted by Ctrl-C.".yellow().bold());
    }
    println!(
        "  {} frames, {} transition(s)",
        report.ticks,
        report.transitions.len()
    );
    for a in &report.anchors {
        let p = a.transform.position;
        println!(
            "    • {:<12} {}  pos=({:.3}, {:.3}, {:.3})",
            a.name.bold(),
            paint(a.state),
            p.x,
            p.y,
            p.z
        );
    }
    println!();
}

fn print_banner() {
    println!();
    println!("{}", r#"   _____ __  _      __         "#.bold().cyan());
    println!("{}", r#"  / ___// /_(_)____/ /____  __ "#.bold().cyan());
    println!("{}", r#"  \__ \/ __/ / ___/ //_/ / / / "#.bold().cyan());
    println!("{}", r#" ___/ / /_/ / /__/ ,< / /_/ /  "#.bold().cyan());
    println!("{}", r#"/____/\__/_/\___/_/|_|\__, /   "#.bold().cyan());
    println!("{}", r#"                     /____/    "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Sticky Anchor".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Pose stabilization & presence engine");
    println!();
}

fn print_usage() {
    println!("  {}", "Usage:".bold());
    println!("    sticky replay <scenario.toml> [--config <path>] [--json]");
    println!("    sticky config [--config <path>]");
    println!("    sticky init   [--config <path>] [--force]");
    println!();
}
