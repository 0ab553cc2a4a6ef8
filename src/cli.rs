//! CLI interface for pomo.
//!
//! Each subcommand is one step against the persisted cycle store. Only
//! `watch` (and `start --watch`) stays running, driving the countdown until
//! the cycle ends.
//!
//! Before any command runs, the tracker gets one tick so a cycle whose time
//! ran out while nothing was watching is completed first.

mod format;

use std::io::{self, Write};
use std::thread;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::lifecycle::{Clock, Event, Lifecycle};
use crate::model::{CycleId, CycleStatus};
use crate::storage::Snapshots;
use crate::tracker::TICK_INTERVAL;

use format::{format_countdown, format_history, format_minutes};

/// pomo: a focus-cycle timer.
#[derive(Debug, Parser)]
#[command(name = "pomo", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow:
  1. pomo start "write spec" --minutes 25 --watch
  2. (in another terminal) pomo status
  3. pomo interrupt        # give up early, recorded as interrupted
  4. pomo history"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start a new cycle. Prints the cycle ID.
    Start {
        /// What this cycle is about.
        task: String,

        /// Cycle length in minutes (defaults to `default-minutes` from config).
        #[arg(long, short)]
        minutes: Option<u32>,

        /// Interrupt the running cycle, if any, instead of refusing to start.
        #[arg(long)]
        replace: bool,

        /// Stay in the foreground and show the countdown.
        #[arg(long)]
        watch: bool,
    },

    /// Stop the running cycle and record it as interrupted.
    Interrupt,

    /// Finish the running cycle now, before its time runs out.
    Finish,

    /// Forget the running cycle without recording an interruption.
    Clear,

    /// Show the running cycle with its remaining and elapsed time.
    Status,

    /// Show the countdown until the running cycle ends.
    Watch,

    /// List all cycles in the order they were started.
    History,

    /// Suggest task labels: recent tasks first, then configured ones.
    Tasks,
}

/// How many labels `pomo tasks` prints.
const TASK_SUGGESTION_LIMIT: usize = 10;

/// Run the CLI, returning an error message on failure.
pub fn run<S: Snapshots, C: Clock>(
    config: &Config,
    lifecycle: &mut Lifecycle<S, C>,
) -> Result<(), String> {
    let cli = Cli::parse();

    // Settle a cycle that ran out while nobody was watching.
    lifecycle.tick();

    match cli.command {
        Command::Start {
            task,
            minutes,
            replace,
            watch,
        } => {
            let minutes = minutes.unwrap_or(config.default_minutes);
            cmd_start(lifecycle, &task, minutes, replace)?;
            if watch {
                cmd_watch(lifecycle);
            }
            Ok(())
        }
        Command::Interrupt => cmd_interrupt(lifecycle),
        Command::Finish => cmd_finish(lifecycle),
        Command::Clear => cmd_clear(lifecycle),
        Command::Status => {
            cmd_status(lifecycle);
            Ok(())
        }
        Command::Watch => {
            cmd_watch(lifecycle);
            Ok(())
        }
        Command::History => {
            cmd_history(lifecycle);
            Ok(())
        }
        Command::Tasks => {
            cmd_tasks(config, lifecycle);
            Ok(())
        }
    }
}

fn cmd_start<S: Snapshots, C: Clock>(
    lifecycle: &mut Lifecycle<S, C>,
    task: &str,
    minutes: u32,
    replace: bool,
) -> Result<(), String> {
    let id = if replace {
        lifecycle.start_replacing(task, minutes)
    } else {
        lifecycle.start(task, minutes)
    }
    .map_err(|e| format!("failed to start cycle: {e}"))?;

    println!("{id}");
    eprintln!("Started \"{}\" for {}", task.trim(), format_minutes(minutes));
    Ok(())
}

fn cmd_interrupt<S: Snapshots, C: Clock>(lifecycle: &mut Lifecycle<S, C>) -> Result<(), String> {
    match lifecycle.interrupt() {
        Some(id) => {
            eprintln!("Cycle {id} interrupted");
            Ok(())
        }
        None => Err("no active cycle".to_string()),
    }
}

fn cmd_finish<S: Snapshots, C: Clock>(lifecycle: &mut Lifecycle<S, C>) -> Result<(), String> {
    match lifecycle.mark_active_complete() {
        Some(id) => {
            eprintln!("Cycle {id} finished");
            Ok(())
        }
        None => Err("no active cycle".to_string()),
    }
}

fn cmd_clear<S: Snapshots, C: Clock>(lifecycle: &mut Lifecycle<S, C>) -> Result<(), String> {
    match lifecycle.clear_active() {
        Some(id) => {
            eprintln!("Cycle {id} cleared");
            Ok(())
        }
        None => Err("no active cycle".to_string()),
    }
}

fn cmd_status<S: Snapshots, C: Clock>(lifecycle: &Lifecycle<S, C>) {
    let Some(cycle) = lifecycle.active_cycle() else {
        println!("No active cycle");
        return;
    };
    println!(
        "{}  [{}]  {} remaining ({} elapsed of {})",
        cycle.id,
        cycle.task,
        format_countdown(lifecycle.remaining_seconds()),
        format_countdown(lifecycle.elapsed_seconds()),
        format_minutes(cycle.minutes_amount),
    );
}

/// Ticks the tracker until the active cycle ends, here or in another process.
fn cmd_watch<S: Snapshots, C: Clock>(lifecycle: &mut Lifecycle<S, C>) {
    let Some(watched) = lifecycle.active_cycle().map(|c| c.id.clone()) else {
        println!("No active cycle");
        return;
    };

    lifecycle.subscribe(|event| match event {
        Event::Elapsed {
            id,
            elapsed,
            remaining,
        } => {
            tracing::trace!(cycle = %id, elapsed, "countdown tick");
            let mut out = io::stdout().lock();
            // A closed stdout only loses the countdown display.
            let _ = write!(out, "\r{}", format_countdown(*remaining));
            let _ = out.flush();
        }
        Event::Started(id) | Event::Interrupted(id) | Event::Finished(id) | Event::Cleared(id) => {
            tracing::debug!(cycle = %id, ?event, "lifecycle event");
        }
    });

    while let Some(due) = lifecycle.next_tick_due() {
        let wait = due.duration_since(lifecycle.now());
        if wait.is_positive() {
            thread::sleep(wait.unsigned_abs().min(TICK_INTERVAL));
            continue;
        }
        lifecycle.reload();
        lifecycle.tick();
    }

    println!();
    report_outcome(lifecycle, &watched);
}

fn report_outcome<S: Snapshots, C: Clock>(lifecycle: &Lifecycle<S, C>, id: &CycleId) {
    let Some(cycle) = lifecycle.state().find(id) else {
        eprintln!("Cycle {id} is gone");
        return;
    };
    match cycle.status() {
        CycleStatus::Finished => println!("Cycle finished: {}", cycle.task),
        CycleStatus::Interrupted => println!("Cycle interrupted: {}", cycle.task),
        CycleStatus::Ongoing => println!("Cycle cleared: {}", cycle.task),
    }
}

fn cmd_history<S: Snapshots, C: Clock>(lifecycle: &Lifecycle<S, C>) {
    if lifecycle.cycles().is_empty() {
        println!("No cycles");
        return;
    }
    println!("{}", format_history(lifecycle.cycles(), lifecycle.now()));
}

fn cmd_tasks<S: Snapshots, C: Clock>(config: &Config, lifecycle: &Lifecycle<S, C>) {
    for task in suggest_tasks(config, lifecycle) {
        println!("{task}");
    }
}

/// Recent distinct tasks (newest first) followed by configured suggestions.
fn suggest_tasks<S: Snapshots, C: Clock>(config: &Config, lifecycle: &Lifecycle<S, C>) -> Vec<String> {
    let recent = lifecycle.cycles().iter().rev().map(|c| c.task.as_str());
    let configured = config.task_suggestions.iter().map(String::as_str);

    let mut suggestions: Vec<String> = Vec::new();
    for task in recent.chain(configured) {
        if suggestions.len() == TASK_SUGGESTION_LIMIT {
            break;
        }
        if !suggestions.iter().any(|s| s == task) {
            suggestions.push(task.to_string());
        }
    }
    suggestions
}
