//! REPL – the interactive shell around a running simulation.
//!
//! The cat keeps ticking at the configured rate while the prompt waits for
//! input.  Lines starting with `/` are shell commands; any other line is a
//! behavior command handed to [`Simulation::apply_command`].
//!
//! Supported slash-commands:
//!   /help            – show this list
//!   /status          – position, state, weights and active node
//!   /show            – draw the grid once
//!   /watch [secs]    – redraw the grid every tick for a while (default 5)
//!   /tree            – outline of the live tree, active path highlighted
//!   /step [n]        – tick n times right now (default 1)
//!   /pause | /resume – stop or restart the background ticking
//!   /export <path>   – write the tree to a JSON file
//!   /load <path>     – replace the tree from a JSON file
//!   /history         – recent behavior commands
//!   /quit | /exit    – leave

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use tabby_runtime::{BehaviorCommand, CommandOutcome, Simulation};
use tabby_types::GridBounds;

use crate::view;

const DEFAULT_WATCH_SECS: u64 = 5;
const MAX_WATCH_SECS: u64 = 3600;
/// How often a pending generator call checks for Ctrl-C.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// A parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Help,
    Status,
    Show,
    Watch(Duration),
    Tree,
    Step(u32),
    Pause,
    Resume,
    Export(PathBuf),
    Load(PathBuf),
    History,
    Quit,
    /// Text for the cat: a built-in behavior word or a free-form instruction.
    Behave(String),
}

impl ReplCommand {
    /// Parse one non-empty, trimmed line.
    pub fn parse(line: &str) -> Result<Self, String> {
        if !line.starts_with('/') {
            return Ok(ReplCommand::Behave(line.to_string()));
        }
        let (cmd, arg) = match line.split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (line, ""),
        };
        match cmd {
            "/help" => Ok(ReplCommand::Help),
            "/status" => Ok(ReplCommand::Status),
            "/show" => Ok(ReplCommand::Show),
            "/watch" => {
                let secs = parse_count(arg, DEFAULT_WATCH_SECS)?;
                if secs > MAX_WATCH_SECS {
                    return Err(format!("/watch is limited to {MAX_WATCH_SECS} seconds"));
                }
                Ok(ReplCommand::Watch(Duration::from_secs(secs)))
            }
            "/tree" => Ok(ReplCommand::Tree),
            "/step" => {
                let n = parse_count(arg, 1)?;
                u32::try_from(n)
                    .map(ReplCommand::Step)
                    .map_err(|_| format!("'{arg}' is too many steps"))
            }
            "/pause" => Ok(ReplCommand::Pause),
            "/resume" => Ok(ReplCommand::Resume),
            "/export" => required_path(cmd, arg).map(ReplCommand::Export),
            "/load" => required_path(cmd, arg).map(ReplCommand::Load),
            "/history" => Ok(ReplCommand::History),
            "/quit" | "/exit" => Ok(ReplCommand::Quit),
            other => Err(format!("Unknown command '{other}'")),
        }
    }
}

fn parse_count(arg: &str, default: u64) -> Result<u64, String> {
    if arg.is_empty() {
        return Ok(default);
    }
    match arg.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("'{arg}' is not a positive number")),
    }
}

fn required_path(cmd: &str, arg: &str) -> Result<PathBuf, String> {
    if arg.is_empty() {
        Err(format!("{cmd} needs a file path"))
    } else {
        Ok(PathBuf::from(arg))
    }
}

#[derive(Debug, Default)]
struct Session {
    paused: bool,
    watch_until: Option<Instant>,
    shutdown: Arc<AtomicBool>,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Entry point for the interactive REPL.
///
/// Ticks `sim` every `period` until the user quits, stdin closes or
/// `shutdown` is set.
pub async fn run(
    mut sim: Simulation,
    period: Duration,
    bounds: GridBounds,
    shutdown: Arc<AtomicBool>,
) {
    let mut lines = spawn_stdin_reader();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut session = Session {
        shutdown: Arc::clone(&shutdown),
        ..Session::default()
    };

    print_prompt();
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        tokio::select! {
            _ = ticker.tick() => {
                if !session.paused {
                    sim.tick();
                }
                if let Some(until) = session.watch_until {
                    if Instant::now() >= until {
                        session.watch_until = None;
                        print_prompt();
                    } else {
                        print!("{}", view::CLEAR);
                        view::print_frame(&sim.snapshot(), bounds);
                    }
                }
            }
            line = lines.recv() => {
                let Some(line) = line else {
                    break; // EOF
                };
                let line = line.trim();
                if !line.is_empty() {
                    match ReplCommand::parse(line) {
                        Ok(cmd) => {
                            if handle(&mut sim, &mut session, bounds, cmd).await == Flow::Quit {
                                println!("{}", "Goodbye.".green());
                                shutdown.store(true, Ordering::SeqCst);
                                break;
                            }
                        }
                        Err(msg) => println!(
                            "{} Type {} for available commands.",
                            msg.red(),
                            "/help".bold()
                        ),
                    }
                }
                if session.watch_until.is_none() {
                    print_prompt();
                }
            }
        }
    }
}

/// Read stdin on a dedicated thread so a pending read never blocks the
/// runtime from shutting down.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    eprintln!("{}: {}", "Read error".red(), e);
                    break;
                }
            }
        }
    });
    rx
}

fn print_prompt() {
    print!("{} ", "tabby>".bold().cyan());
    io::stdout().flush().ok();
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn handle(
    sim: &mut Simulation,
    session: &mut Session,
    bounds: GridBounds,
    cmd: ReplCommand,
) -> Flow {
    debug!(?cmd, "repl command");
    match cmd {
        ReplCommand::Help => cmd_help(),
        ReplCommand::Status => view::print_snapshot(&sim.snapshot()),
        ReplCommand::Show => view::print_frame(&sim.snapshot(), bounds),
        ReplCommand::Watch(span) => match Instant::now().checked_add(span) {
            Some(until) => session.watch_until = Some(until),
            None => println!("{}", "That is too long to watch.".red()),
        },
        ReplCommand::Tree => view::print_tree(sim.cat().root()),
        ReplCommand::Step(n) => {
            for _ in 0..n {
                sim.tick();
            }
            println!("{}", view::status_line(&sim.snapshot()));
        }
        ReplCommand::Pause => {
            session.paused = true;
            println!("{}", "Paused. /resume to continue.".yellow());
        }
        ReplCommand::Resume => {
            session.paused = false;
            println!("{}", "Resumed.".green());
        }
        ReplCommand::Export(path) => match sim.export_to_json(&path) {
            Ok(_) => println!(
                "{} {}",
                "✓ Tree exported to".green(),
                path.display().to_string().bold()
            ),
            Err(e) => println!("{}: {}", "Export failed".red(), e),
        },
        ReplCommand::Load(path) => match sim.load_from_json(&path) {
            Ok(()) => println!(
                "{} {}",
                "✓ Tree loaded from".green(),
                path.display().to_string().bold()
            ),
            Err(e) => {
                println!("{}: {}", "Load failed".red(), e);
                println!("  The default tree has been restored.");
            }
        },
        ReplCommand::History => cmd_history(sim),
        ReplCommand::Quit => return Flow::Quit,
        ReplCommand::Behave(text) => cmd_behave(sim, &text, &session.shutdown).await,
    }
    Flow::Continue
}

fn cmd_help() {
    println!();
    println!("{}", "Behavior Commands".bold().underline());
    let words: Vec<&str> = BehaviorCommand::ALL.iter().map(|c| c.as_str()).collect();
    println!("  {}", words.join("  ").bold().cyan());
    println!("  Any other text is sent to the tree generator.");
    println!();
    println!("{}", "Shell Commands".bold().underline());
    println!("  {}             – show this list", "/help".bold().cyan());
    println!("  {}           – position, state, weights", "/status".bold().cyan());
    println!("  {}             – draw the grid once", "/show".bold().cyan());
    println!("  {}    – animate the grid (default 5 s)", "/watch [secs]".bold().cyan());
    println!("  {}             – outline of the live tree", "/tree".bold().cyan());
    println!("  {}         – tick n times now", "/step [n]".bold().cyan());
    println!("  {}  – stop / restart ticking", "/pause  /resume".bold().cyan());
    println!("  {}    – write the tree as JSON", "/export <path>".bold().cyan());
    println!("  {}      – replace the tree from JSON", "/load <path>".bold().cyan());
    println!("  {}          – recent behavior commands", "/history".bold().cyan());
    println!("  {}     – exit", "/quit  /exit".bold().cyan());
    println!();
}

async fn shutdown_requested(shutdown: &AtomicBool) {
    while !shutdown.load(Ordering::SeqCst) {
        tokio::time::sleep(SHUTDOWN_POLL).await;
    }
}

fn cmd_history(sim: &Simulation) {
    let mut any = false;
    for (i, entry) in sim.history().enumerate() {
        println!("  {}. {}", i + 1, entry);
        any = true;
    }
    if !any {
        println!("  {}", "No commands yet.".dimmed());
    }
}

async fn cmd_behave(sim: &mut Simulation, text: &str, shutdown: &AtomicBool) {
    let builtin = text.parse::<BehaviorCommand>().is_ok();
    if !builtin {
        print!("  {} ", "Asking the tree generator …".dimmed());
        io::stdout().flush().ok();
    }
    // Ctrl-C abandons a pending generator call.
    let result = tokio::select! {
        result = sim.apply_command(text) => result,
        _ = shutdown_requested(shutdown) => {
            println!("{}", "cancelled.".yellow());
            return;
        }
    };
    match result {
        Ok(CommandOutcome::Builtin(cmd)) => {
            println!("{} {}", "✓ Behavior adjusted:".green(), cmd.as_str().bold());
        }
        Ok(CommandOutcome::Generated { nodes }) => {
            println!("{} ({} nodes)", "✓ New behavior tree loaded".green(), nodes);
        }
        Ok(CommandOutcome::NoChange) => println!("{}", "No change.".yellow()),
        Err(e) => println!("{}: {}", "Command failed".red(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tabby_runtime::{CatConfig, GeneratorError, TreeGenerator};

    fn sim() -> Simulation {
        Simulation::new(CatConfig { seed: Some(8), ..CatConfig::default() })
    }

    #[test]
    fn plain_text_goes_to_the_cat() {
        assert_eq!(
            ReplCommand::parse("sleep").unwrap(),
            ReplCommand::Behave("sleep".into())
        );
        assert_eq!(
            ReplCommand::parse("chase the red dot").unwrap(),
            ReplCommand::Behave("chase the red dot".into())
        );
    }

    #[test]
    fn slash_commands_parse_with_defaults() {
        assert_eq!(ReplCommand::parse("/help").unwrap(), ReplCommand::Help);
        assert_eq!(ReplCommand::parse("/exit").unwrap(), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("/step").unwrap(), ReplCommand::Step(1));
        assert_eq!(ReplCommand::parse("/step 25").unwrap(), ReplCommand::Step(25));
        assert_eq!(
            ReplCommand::parse("/watch").unwrap(),
            ReplCommand::Watch(Duration::from_secs(DEFAULT_WATCH_SECS))
        );
        assert_eq!(
            ReplCommand::parse("/export  trees/cat.json").unwrap(),
            ReplCommand::Export(PathBuf::from("trees/cat.json"))
        );
    }

    #[test]
    fn bad_slash_commands_are_rejected() {
        assert!(ReplCommand::parse("/dance").is_err());
        assert!(ReplCommand::parse("/load").is_err());
        assert!(ReplCommand::parse("/step zero").is_err());
        assert!(ReplCommand::parse("/step 0").is_err());
        assert!(ReplCommand::parse("/watch -1").is_err());
    }

    #[test]
    fn watch_duration_is_capped() {
        assert_eq!(
            ReplCommand::parse("/watch 3600").unwrap(),
            ReplCommand::Watch(Duration::from_secs(MAX_WATCH_SECS))
        );
        assert!(ReplCommand::parse("/watch 3601").is_err());
        assert!(ReplCommand::parse("/watch 18446744073709551615").is_err());
    }

    #[tokio::test]
    async fn oversized_watch_span_does_not_panic() {
        let mut sim = sim();
        let mut session = Session::default();
        let bounds = GridBounds::default();
        let flow = handle(&mut sim, &mut session, bounds, ReplCommand::Watch(Duration::MAX)).await;
        assert_eq!(flow, Flow::Continue);
        assert!(session.watch_until.is_none());

        handle(&mut sim, &mut session, bounds, ReplCommand::Watch(Duration::from_secs(2))).await;
        assert!(session.watch_until.is_some());
    }

    struct HungGenerator;

    #[async_trait::async_trait]
    impl TreeGenerator for HungGenerator {
        async fn generate(
            &self,
            _instruction: &str,
            _current_tree: &Value,
        ) -> Result<Option<Value>, GeneratorError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn shutdown_cancels_a_hung_generator() {
        let mut sim = sim().with_generator(HungGenerator);
        let before = sim.cat().behavior_tree_json(false).unwrap();
        let mut session = Session::default();
        let shutdown = Arc::clone(&session.shutdown);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            shutdown.store(true, Ordering::SeqCst);
        });

        let behave = ReplCommand::Behave("herd the sheep".into());
        let flow = tokio::time::timeout(
            Duration::from_secs(5),
            handle(&mut sim, &mut session, GridBounds::default(), behave),
        )
        .await
        .expect("handler returned after shutdown");
        assert_eq!(flow, Flow::Continue);
        assert_eq!(sim.cat().behavior_tree_json(false).unwrap(), before);
    }

    #[tokio::test]
    async fn step_advances_the_simulation() {
        let mut sim = sim();
        let mut session = Session::default();
        let flow = handle(&mut sim, &mut session, GridBounds::default(), ReplCommand::Step(7)).await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(sim.ticks(), 7);
    }

    #[tokio::test]
    async fn pause_and_quit_flow() {
        let mut sim = sim();
        let mut session = Session::default();
        handle(&mut sim, &mut session, GridBounds::default(), ReplCommand::Pause).await;
        assert!(session.paused);
        handle(&mut sim, &mut session, GridBounds::default(), ReplCommand::Resume).await;
        assert!(!session.paused);
        let flow = handle(&mut sim, &mut session, GridBounds::default(), ReplCommand::Quit).await;
        assert_eq!(flow, Flow::Quit);
    }

    #[tokio::test]
    async fn behave_and_export_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.json");
        let mut sim = sim();
        let mut session = Session::default();
        let bounds = GridBounds::default();

        handle(&mut sim, &mut session, bounds, ReplCommand::Behave("play".into())).await;
        assert_eq!(sim.history().collect::<Vec<_>>(), vec!["play"]);

        handle(&mut sim, &mut session, bounds, ReplCommand::Export(path.clone())).await;
        assert!(path.exists());
        handle(&mut sim, &mut session, bounds, ReplCommand::Load(path)).await;
        assert!(sim.cat().is_loaded());
    }
}
