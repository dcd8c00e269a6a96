use colored::*;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::{thread, time::Duration};

use crate::fs::config::DEFAULT_SNAPSHOT;
use crate::fs::error::{Result, SimError};
use crate::fs::FileSystem;
use crate::persist;
use crate::proc::{FileOp, ProcState, RequestCoordinator, ServiceOutcome};
use crate::sched::PolicyKind;

#[derive(Debug)]
pub enum Command {
    Help,
    Disk,
    Ps(Option<ProcState>),
    Queue,
    Policy(Option<PolicyKind>),
    Create(String, usize),
    Read(String),
    Rm(String),
    Rename(String, String),
    Step,
    Run,
    Cancel(u64),
    Stats,
    Clear,
    Save(Option<String>),
    Load(Option<String>),
    Admin,
    Reset,
    Exit,
}

pub fn execute_command(
    cmd: &Command,
    fs: &mut FileSystem,
    coord: &mut RequestCoordinator,
) -> Result<()> {
    match cmd {
        Command::Help => print_help(),
        Command::Disk => print_disk(fs, coord),
        Command::Ps(state) => print_processes(coord, *state),
        Command::Queue => print_queue(coord),
        Command::Policy(None) => {
            println!("🧭 Active policy: {}", coord.policy_kind().to_string().cyan().bold());
        }
        Command::Policy(Some(kind)) => {
            coord.set_policy(*kind);
            println!("🧭 Policy switched to {}", kind.to_string().cyan().bold());
        }
        Command::Create(name, blocks) => submit_create(fs, coord, name, *blocks)?,
        Command::Read(name) => submit_chain_op(fs, coord, name, FileOp::Read, None)?,
        Command::Rm(name) => submit_chain_op(fs, coord, name, FileOp::Delete, None)?,
        Command::Rename(old, new) => {
            submit_chain_op(fs, coord, old, FileOp::Update, Some(new.clone()))?
        }
        Command::Step => match coord.service_next(fs) {
            Some(outcome) => print_outcome(coord, &outcome),
            None => println!("{}", "💤 No pending requests.".bright_black()),
        },
        Command::Run => run_all(fs, coord),
        Command::Cancel(pid) => {
            if coord.cancel(*pid) {
                println!("🛑 Process P{} cancelled, its pending requests dropped.", pid);
            } else {
                println!(
                    "{}",
                    format!("⚠️  P{} is unknown or already terminated.", pid).yellow()
                );
            }
        }
        Command::Stats => print_stats(fs, coord),
        Command::Clear => {
            let removed = coord.clear_terminated();
            println!("🧹 Removed {} terminated process(es).", removed);
        }
        Command::Save(path) => {
            let path = path.as_deref().unwrap_or(DEFAULT_SNAPSHOT);
            persist::save(Path::new(path), fs, coord)?;
            println!("💾 State saved to {}", path.green());
        }
        Command::Load(path) => {
            let path = path.as_deref().unwrap_or(DEFAULT_SNAPSHOT);
            let overwrite = Confirm::new()
                .with_prompt("Replace the current in-memory state?")
                .default(false)
                .interact()
                .unwrap_or(false);
            if !overwrite {
                println!("{}", "Load aborted.".yellow());
                return Ok(());
            }
            // Load into fresh instances first; a bad snapshot leaves the
            // live state untouched.
            let (new_fs, new_coord) = persist::load(Path::new(path))?;
            *fs = new_fs;
            *coord = new_coord;
            println!(
                "📦 State loaded from {} ({} processes re-queued as BLOCKED)",
                path.green(),
                coord.processes().len()
            );
        }
        Command::Admin => {
            let now = !fs.is_admin();
            fs.set_admin(now);
            if now {
                println!("🔑 Admin mode {}", "enabled".green().bold());
            } else {
                println!("🔒 Admin mode {}", "disabled".red().bold());
            }
        }
        Command::Reset => {
            let confirmed = Confirm::new()
                .with_prompt("Wipe the disk, catalog, processes and queues?")
                .default(false)
                .interact()
                .unwrap_or(false);
            if confirmed {
                fs.reset();
                coord.clear_all();
                println!("{}", "♻️  Simulation reset.".green());
            } else {
                println!("{}", "Reset aborted.".yellow());
            }
        }
        Command::Exit => println!("{}", "👋 Exiting chainfs shell...".yellow().bold()),
    }

    Ok(())
}

/// Admits a create process; its requests target the blocks the allocator
/// would pick right now (the actual allocation re-scans at completion).
fn submit_create(
    fs: &FileSystem,
    coord: &mut RequestCoordinator,
    name: &str,
    blocks: usize,
) -> Result<()> {
    if blocks == 0 {
        return Err(SimError::InvalidState("size must be at least 1 block".into()));
    }
    if fs.file(name).is_some() {
        return Err(SimError::AlreadyExists(name.to_string()));
    }
    if !fs.store().has_space(blocks) {
        return Err(SimError::OutOfSpace);
    }

    let plan: Vec<usize> = fs
        .store()
        .blocks()
        .iter()
        .filter(|b| !b.occupied)
        .take(blocks)
        .map(|b| b.id)
        .collect();

    let pid = coord.create_process(
        &format!("create_{}", name),
        FileOp::Create,
        name,
        blocks,
        None,
        fs.user(),
    )?;
    coord.enqueue_requests_for_chain(pid, &plan, FileOp::Create)?;
    println!(
        "📝 P{} queued: CREATE '{}' ({} blocks -> {:?})",
        pid, name, blocks, plan
    );
    Ok(())
}

/// Admits a read/delete/rename process with one request per chain block.
fn submit_chain_op(
    fs: &FileSystem,
    coord: &mut RequestCoordinator,
    name: &str,
    op: FileOp,
    rename_to: Option<String>,
) -> Result<()> {
    let entry = fs
        .file(name)
        .ok_or_else(|| SimError::NotFound(name.to_string()))?;
    let head = entry
        .head
        .ok_or_else(|| SimError::InvalidState(format!("'{}' has no blocks", name)))?;
    let chain = fs.store().chain_of(head);

    let pid = coord.create_process(
        &format!("{}_{}", op.to_string().to_lowercase(), name),
        op,
        name,
        0,
        rename_to,
        fs.user(),
    )?;
    coord.enqueue_requests_for_chain(pid, &chain, op)?;
    println!("📨 P{} queued: {} '{}' over blocks {:?}", pid, op, name, chain);
    Ok(())
}

fn run_all(fs: &mut FileSystem, coord: &mut RequestCoordinator) {
    let total = coord.pending().len();
    if total == 0 {
        println!("{}", "💤 No pending requests.".bright_black());
        return;
    }

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=> "),
    );

    let mut outcomes = Vec::new();
    while let Some(outcome) = coord.service_next(fs) {
        pb.set_message(format!("block {}", outcome.request.target));
        pb.inc(1);
        outcomes.push(outcome);
        thread::sleep(Duration::from_millis(40));
    }
    pb.finish_with_message("done");

    for outcome in &outcomes {
        print_outcome(coord, outcome);
    }
}

fn print_outcome(coord: &RequestCoordinator, outcome: &ServiceOutcome) {
    println!(
        "⚙️  #{} {} block {} (seek {}), head now {}",
        outcome.request.id,
        outcome.request.op,
        outcome.request.target.to_string().cyan(),
        outcome.distance,
        coord.head()
    );
    if let Some(pid) = outcome.completed_process {
        match &outcome.op_error {
            None => println!("   {} P{} terminated, operation applied.", "✅".green(), pid),
            Some(e) => println!(
                "   {} P{} terminated, operation failed: {}",
                "❌".red(),
                pid,
                e.to_string().red()
            ),
        }
    }
}

fn print_disk(fs: &FileSystem, coord: &RequestCoordinator) {
    let store = fs.store();
    println!(
        "💿 Disk: {} blocks, {} free, {:.0}% used, head at {}",
        store.len(),
        store.free_count(),
        store.usage_fraction() * 100.0,
        coord.head().to_string().cyan().bold()
    );
    for (i, block) in store.blocks().iter().enumerate() {
        let cell = if block.id == coord.head() {
            format!("[{:>3}]", block.id).cyan().bold()
        } else if block.occupied {
            format!(" {:>3} ", block.id).red()
        } else {
            format!(" {:>3} ", block.id).bright_black()
        };
        print!("{}", cell);
        if (i + 1) % 10 == 0 {
            println!();
        }
    }
    if store.len() % 10 != 0 {
        println!();
    }
    for entry in fs.files() {
        let chain = entry.head.map(|h| store.chain_of(h)).unwrap_or_default();
        println!(
            "  📄 {} ({} blocks) {:?} owner={}",
            entry.name.green(),
            entry.size_blocks,
            chain,
            entry.owner
        );
    }
}

fn print_processes(coord: &RequestCoordinator, filter: Option<ProcState>) {
    let shown: Vec<_> = coord
        .processes()
        .iter()
        .filter(|p| filter.map_or(true, |s| p.state == s))
        .collect();
    if shown.is_empty() {
        println!("{}", "No processes.".bright_black());
        return;
    }
    println!(
        "{:<5} {:<16} {:<8} {:<14} {:<11} {:<6} OWNER",
        "PID", "NAME", "OP", "TARGET", "STATE", "DONE"
    );
    for p in shown {
        let state = match p.state {
            ProcState::Terminated => p.state.to_string().bright_black(),
            ProcState::Running => p.state.to_string().green(),
            ProcState::Blocked => p.state.to_string().yellow(),
            _ => p.state.to_string().normal(),
        };
        println!(
            "{:<5} {:<16} {:<8} {:<14} {:<11} {:<6} {}",
            p.id,
            p.name,
            p.op.to_string(),
            p.target_name,
            state,
            if p.operation_executed { "yes" } else { "no" },
            p.owner
        );
    }
}

fn print_queue(coord: &RequestCoordinator) {
    let ordered = coord.ordered_queue();
    if ordered.is_empty() {
        println!("{}", "Queue is empty.".bright_black());
        return;
    }
    println!(
        "🗒️  Service order under {} (head {}):",
        coord.policy_kind().to_string().cyan().bold(),
        coord.head()
    );
    let mut pos = coord.head();
    for (i, request) in ordered.iter().enumerate() {
        println!(
            "  {}. #{} P{} {} block {} (seek {})",
            i + 1,
            request.id,
            request.process_id,
            request.op,
            request.target,
            coord.seek_cost(pos, request.target)
        );
        pos = request.target;
    }
    println!(
        "  total planned movement: {}",
        coord.planned_movement().to_string().bold()
    );
}

fn print_stats(fs: &FileSystem, coord: &RequestCoordinator) {
    println!("{}", "📊 Simulation stats".bright_yellow().bold());
    println!("  policy:            {}", coord.policy_kind());
    println!("  head position:     {}", coord.head());
    println!("  serviced requests: {}", coord.total_serviced());
    println!("  pending requests:  {}", coord.pending().len());
    println!("  total movement:    {}", coord.total_movement());
    println!("  average seek:      {:.2}", coord.average_movement());
    println!(
        "  disk usage:        {:.0}% ({} of {} blocks)",
        fs.store().usage_fraction() * 100.0,
        fs.store().occupied_count(),
        fs.store().len()
    );
    println!("  active processes:  {}", coord.active_process_count());
    println!(
        "  admin mode:        {}",
        if fs.is_admin() { "on" } else { "off" }
    );
}

fn print_help() {
    println!("{}", "📘 chainfs commands".bright_cyan().bold());
    println!(
        "{}",
        "
  disk                 Show the block map, head position and files
  ps [state]           List processes (optionally NEW/READY/BLOCKED/RUNNING/TERMINATED)
  queue                Show pending requests in policy service order
  policy [name]        Show or set the policy: fifo | sstf | scan | cscan
  create <file> <n>    Queue a process creating <file> with n blocks
  read <file>          Queue a process reading every block of <file>
  rm <file>            Queue a process deleting <file>
  rename <old> <new>   Queue a process renaming <old> to <new>
  step                 Service one request under the active policy
  run                  Service every pending request
  cancel <pid>         Cancel a process and drop its pending requests
  stats                Show scheduling statistics
  clear                Remove terminated processes from the table
  save [path]          Save the simulation state
  load [path]          Load a saved state (replaces the current one)
  admin                Toggle admin mode
  reset                Wipe disk, catalog, processes and queues
  help                 Show this help message
  exit                 Quit the shell
"
        .bright_black()
    );
}
