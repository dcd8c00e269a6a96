use crate::proc::ProcState;
use crate::sched::PolicyKind;
use crate::shell::command::Command;

pub fn parse_command(input: &str) -> Option<Command> {
    let tokens: Vec<&str> = input.trim().split_ascii_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let cmd = tokens[0];
    let args = &tokens[1..];

    match cmd {
        "help" => Some(Command::Help),
        "disk" => Some(Command::Disk),
        "ps" => match args.first() {
            None => Some(Command::Ps(None)),
            Some(s) => ProcState::parse(&s.to_ascii_uppercase()).map(|st| Command::Ps(Some(st))),
        },
        "queue" => Some(Command::Queue),
        "policy" => match args.first() {
            None => Some(Command::Policy(None)),
            Some(s) => PolicyKind::parse(s).map(|k| Command::Policy(Some(k))),
        },
        "create" => {
            let name = args.first()?;
            let blocks = args.get(1)?.parse().ok()?;
            Some(Command::Create(name.to_string(), blocks))
        }
        "read" => args.first().map(|&name| Command::Read(name.to_string())),
        "rm" => args.first().map(|&name| Command::Rm(name.to_string())),
        "rename" => {
            if args.len() >= 2 {
                Some(Command::Rename(args[0].to_string(), args[1].to_string()))
            } else {
                None
            }
        }
        "step" => Some(Command::Step),
        "run" => Some(Command::Run),
        "cancel" => args.first()?.parse().ok().map(Command::Cancel),
        "stats" => Some(Command::Stats),
        "clear" => Some(Command::Clear),
        "save" => Some(Command::Save(args.first().map(|s| s.to_string()))),
        "load" => Some(Command::Load(args.first().map(|s| s.to_string()))),
        "admin" => Some(Command::Admin),
        "reset" => Some(Command::Reset),
        "exit" => Some(Command::Exit),
        _ => None,
    }
}
