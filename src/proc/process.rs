use chrono::{DateTime, Local};
use std::fmt;

/// File operation a process performs when its request set completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Create,
    Read,
    Update,
    Delete,
}

impl FileOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATE" => Some(Self::Create),
            "READ" => Some(Self::Read),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for FileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process lifecycle states, strictly forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProcState {
    New,
    Ready,
    Blocked,
    Running,
    Terminated,
}

impl ProcState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Ready => "READY",
            Self::Blocked => "BLOCKED",
            Self::Running => "RUNNING",
            Self::Terminated => "TERMINATED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NEW" => Some(Self::New),
            "READY" => Some(Self::Ready),
            "BLOCKED" => Some(Self::Blocked),
            "RUNNING" => Some(Self::Running),
            "TERMINATED" => Some(Self::Terminated),
            _ => None,
        }
    }
}

impl fmt::Display for ProcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user process performing one file operation through the request queue.
#[derive(Debug, Clone)]
pub struct Process {
    pub id: u64,
    pub name: String,
    pub state: ProcState,
    pub op: FileOp,
    pub target_name: String,
    /// New file name for `Update`; `None` falls back to `<name>_mod`.
    pub rename_to: Option<String>,
    /// Blocks to allocate for `Create`; 0 for the other operations.
    pub size_blocks: usize,
    pub owner: String,
    /// Block the process touched most recently while being serviced.
    pub current_block: Option<usize>,
    /// Guards at-most-once application of the deferred file operation.
    pub operation_executed: bool,
    pub created_at: DateTime<Local>,
    pub started_at: Option<DateTime<Local>>,
    pub finished_at: Option<DateTime<Local>>,
}

impl Process {
    pub fn new(
        id: u64,
        name: &str,
        op: FileOp,
        target_name: &str,
        size_blocks: usize,
        owner: &str,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            state: ProcState::New,
            op,
            target_name: target_name.to_string(),
            rename_to: None,
            size_blocks,
            owner: owner.to_string(),
            current_block: None,
            operation_executed: false,
            created_at: Local::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Moves the process forward in its lifecycle.
    ///
    /// Backward moves are ignored: once a process reached `Running`, a late
    /// enqueue does not drag it back to `Blocked`. The first entry into
    /// `Running` stamps `started_at`, `Terminated` stamps `finished_at`.
    pub fn transition(&mut self, next: ProcState) {
        if next <= self.state {
            return;
        }
        self.state = next;
        match next {
            ProcState::Running if self.started_at.is_none() => {
                self.started_at = Some(Local::now());
            }
            ProcState::Terminated => {
                self.finished_at = Some(Local::now());
            }
            _ => {}
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.state == ProcState::Terminated
    }

    /// The name the file ends up with after an `Update`.
    pub fn effective_rename(&self) -> String {
        self.rename_to
            .clone()
            .unwrap_or_else(|| format!("{}_mod", self.target_name))
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P{} [{} - {}] ({})",
            self.id, self.op, self.target_name, self.state
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_forward_only() {
        let mut p = Process::new(1, "p1", FileOp::Read, "a.txt", 0, "user");
        assert_eq!(p.state, ProcState::New);
        p.transition(ProcState::Ready);
        p.transition(ProcState::Blocked);
        p.transition(ProcState::Running);
        assert!(p.started_at.is_some());
        // Attempting to go back to Blocked is ignored.
        p.transition(ProcState::Blocked);
        assert_eq!(p.state, ProcState::Running);
        p.transition(ProcState::Terminated);
        assert!(p.finished_at.is_some());
        assert!(p.is_terminated());
    }

    #[test]
    fn started_at_is_stamped_once() {
        let mut p = Process::new(1, "p1", FileOp::Read, "a.txt", 0, "user");
        p.transition(ProcState::Running);
        let first = p.started_at;
        p.transition(ProcState::Running);
        assert_eq!(p.started_at, first);
    }

    #[test]
    fn effective_rename_falls_back_to_mod_suffix() {
        let mut p = Process::new(1, "p1", FileOp::Update, "notes", 0, "user");
        assert_eq!(p.effective_rename(), "notes_mod");
        p.rename_to = Some("journal".to_string());
        assert_eq!(p.effective_rename(), "journal");
    }

    #[test]
    fn op_and_state_parse_round_trip() {
        for op in [FileOp::Create, FileOp::Read, FileOp::Update, FileOp::Delete] {
            assert_eq!(FileOp::parse(op.as_str()), Some(op));
        }
        for state in [
            ProcState::New,
            ProcState::Ready,
            ProcState::Blocked,
            ProcState::Running,
            ProcState::Terminated,
        ] {
            assert_eq!(ProcState::parse(state.as_str()), Some(state));
        }
        assert_eq!(FileOp::parse("WRITE"), None);
    }
}
