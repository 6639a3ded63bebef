//! `tabby` – an ASCII cat driven by a behavior tree.
//!
//! This binary:
//!
//! 1. Checks for `~/.tabby/config.toml`; runs a short **First-Run Wizard**
//!    when the file is absent.
//! 2. Builds the [`Simulation`], wiring in the LLM tree generator unless it
//!    is disabled in the config.
//! 3. Drops the user into an **interactive REPL** while the cat ticks in the
//!    background.
//! 4. Intercepts **Ctrl-C** and exits cleanly.

mod config;
mod repl;
mod view;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use tabby_runtime::Simulation;

#[tokio::main]
async fn main() {
    // RUST_LOG filters (default "info"); TABBY_LOG_FORMAT=json for JSON logs.
    // Logs go to stderr, the grid and prompt to stdout.
    let _telemetry = tabby_runtime::init_tracing("tabby");

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – shutting down …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; use /quit to exit");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => run_first_run_wizard(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };
    info!(config = ?cfg, "configuration ready");

    // ── Simulation ────────────────────────────────────────────────────────
    let cat_config = cfg.cat_config();
    let mut sim = Simulation::new(cat_config);
    match cfg.generator() {
        Some(generator) => {
            println!(
                "  Tree generator: {} at {}",
                generator.model().bold(),
                cfg.llm_url.dimmed()
            );
            sim = sim.with_generator(generator);
        }
        None => println!(
            "  Tree generator: {} (free-text commands are ignored)",
            "disabled".yellow()
        ),
    }
    println!(
        "  Grid {}×{} at {} ticks/s",
        cat_config.bounds.width, cat_config.bounds.height, cfg.tick_hz
    );

    println!();
    println!(
        "  Type {} for a list of commands, {} to watch the cat.\n",
        "/help".bold().cyan(),
        "/watch".bold().cyan()
    );

    repl::run(sim, cfg.tick_period(), cat_config.bounds, shutdown).await;
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() -> config::Config {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║        tabby First-Run Wizard        ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found.  Let's set up tabby.\n");

    let mut cfg = config::Config::default();

    println!("  Free-text commands are turned into trees by a language model.");
    println!("    1) Local model via Ollama  (default)");
    println!("    2) No generator, built-in commands only");
    let choice = prompt_line("  Enter choice [1]: ", "1");
    cfg.generator_enabled = choice.trim() != "2";

    if cfg.generator_enabled {
        cfg.llm_url = prompt_line(&format!("  Endpoint URL [{}]: ", cfg.llm_url), &cfg.llm_url);
        cfg.model = prompt_line(&format!("  Model [{}]: ", cfg.model), &cfg.model);
    }

    let hz = prompt_line(
        &format!("  Ticks per second [{}]: ", cfg.tick_hz),
        &cfg.tick_hz.to_string(),
    );
    if let Ok(hz) = hz.trim().parse::<f64>() {
        cfg.tick_hz = hz;
    }

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }

    config::apply_env_overrides(&mut cfg);
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   /\_/\   _        _     _"#.bold().cyan());
    println!("{}", r#"  ( o.o ) | |_ __ _| |__ | |__  _   _"#.bold().cyan());
    println!("{}", r#"   > ^ <  | __/ _` | '_ \| '_ \| | | |"#.bold().cyan());
    println!("{}", r#"          | || (_| | |_) | |_) | |_| |"#.bold().cyan());
    println!("{}", r#"           \__\__,_|_.__/|_.__/ \__, |"#.bold().cyan());
    println!("{}", r#"                                |___/"#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "tabby".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  A behavior-tree cat for your terminal");
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn prompt_line(msg: &str, default: &str) -> String {
    use std::io::{BufRead, Write};
    print!("{}", msg);
    std::io::stdout().flush().ok();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let t = line.trim().to_string();
            if t.is_empty() { default.to_string() } else { t }
        }
        Err(_) => default.to_string(),
    }
}
