pub mod command;
pub mod parse;

use crate::fs::config::TOTAL_BLOCKS;
use crate::fs::FileSystem;
use crate::proc::RequestCoordinator;
use crate::sched::PolicyKind;
use crate::shell::{command::execute_command, parse::parse_command};
use colored::*;
use crossterm::{
    cursor, execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use indicatif::{ProgressBar, ProgressStyle};
use reedline::{DefaultPrompt, DefaultPromptSegment, Reedline, Signal};
use std::{
    io::stdout,
    path::PathBuf,
    thread,
    time::Duration,
};

pub fn start_shell() {
    boot_animation();

    let username = whoami::username();
    let hostname = whoami::hostname();

    let mut fs = FileSystem::new(TOTAL_BLOCKS);
    let mut coord = RequestCoordinator::new(TOTAL_BLOCKS);

    println!(
        "{}",
        "Type 'help' for available commands. Use ↑↓ for history, Tab for auto-completion.\n"
            .bright_black()
    );

    let history_path = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".chainfs_history");

    let mut line_editor = Reedline::create().with_history(Box::new(
        reedline::FileBackedHistory::with_file(100, history_path).unwrap(),
    ));

    let commands: Vec<String> = [
        "help", "disk", "ps", "queue", "policy", "create", "read", "rm", "rename", "step", "run",
        "cancel", "stats", "clear", "save", "load", "admin", "reset", "exit",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let completer = reedline::DefaultCompleter::new_with_wordlen(commands, 2);
    line_editor = line_editor.with_completer(Box::new(completer));

    loop {
        // Prompt reflects the live head position and active policy.
        let prompt = status_prompt(&username, &hostname, coord.head(), coord.policy_kind());
        let input = line_editor.read_line(&prompt);

        match input {
            Ok(Signal::Success(buffer)) => {
                let trimmed = buffer.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match parse_command(trimmed) {
                    Some(cmd) => {
                        if let Err(e) = execute_command(&cmd, &mut fs, &mut coord) {
                            println!("{} {}", "❌ Error:".red().bold(), e);
                        }
                        if matches!(cmd, command::Command::Exit) {
                            println!("{}", "👋 Bye!".bright_yellow());
                            break;
                        }
                    }
                    None => println!(
                        "{}",
                        "⚠️  Unknown command. Type 'help' for command list.".yellow()
                    ),
                }
            }
            Ok(Signal::CtrlC) => {
                println!();
                continue;
            }
            Ok(Signal::CtrlD) => {
                println!("{}", "Exiting chainfs...".yellow());
                break;
            }
            Err(e) => {
                println!("Error reading line: {}", e);
                break;
            }
        }
    }

    println!("{}", "GoodBye!".bright_yellow());
}

fn status_prompt(username: &str, hostname: &str, head: usize, policy: PolicyKind) -> DefaultPrompt {
    DefaultPrompt::new(
        DefaultPromptSegment::Basic(format!(
            "{}@{} head:{} {}",
            username.green(),
            hostname.green(),
            head.to_string().cyan(),
            policy.to_string().blue()
        )),
        DefaultPromptSegment::Basic("chainfs".to_string()),
    )
}

/// Boot animation shown before the prompt.
fn boot_animation() {
    let mut stdout = stdout();

    execute!(stdout, Clear(ClearType::All), cursor::MoveTo(0, 0)).unwrap();
    println!("{}", "[chainfs booting...]".bright_yellow().bold());
    thread::sleep(Duration::from_millis(200));

    let steps = vec![
        "💿 Preparing simulated disk...",
        "🧭 Installing FIFO scheduler...",
        "📁 Loading shell...",
    ];

    for step in steps {
        println!("{}", step);
        thread::sleep(Duration::from_millis(300));
    }

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap()
            .progress_chars("=> "),
    );

    for i in 0..100 {
        pb.set_position(i);
        thread::sleep(Duration::from_millis(5));
    }
    pb.finish_with_message("✅ Ready!");

    thread::sleep(Duration::from_millis(200));
    execute!(
        stdout,
        Clear(ClearType::All),
        cursor::MoveTo(0, 0),
        SetForegroundColor(Color::Cyan),
        Print("Welcome to chainfs v0.1.0\n"),
        ResetColor
    )
    .unwrap();
}
