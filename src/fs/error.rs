use std::fmt;

/// Simulator error type.
#[derive(Debug)]
pub enum SimError {
    Io(std::io::Error),       // underlying I/O error (snapshot files)
    OutOfSpace,               // not enough free blocks for an allocation
    NotFound(String),         // unknown file or process
    AlreadyExists(String),    // file name already registered
    InvalidState(String),     // operation conflicts with current state
    OutOfRange(usize),        // block id outside [0, N)
    PermissionDenied(String), // admin-only operation attempted as user
    Corrupted(String),        // malformed snapshot data
}

impl From<std::io::Error> for SimError {
    fn from(e: std::io::Error) -> Self {
        SimError::Io(e)
    }
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::OutOfSpace => write!(f, "Not enough free blocks on disk"),
            Self::NotFound(what) => write!(f, "Not found: {}", what),
            Self::AlreadyExists(name) => write!(f, "Already exists: {}", name),
            Self::InvalidState(why) => write!(f, "Invalid state: {}", why),
            Self::OutOfRange(id) => write!(f, "Block id out of range: {}", id),
            Self::PermissionDenied(op) => write!(f, "Permission denied: {}", op),
            Self::Corrupted(desc) => write!(f, "Snapshot corrupted: {}", desc),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Unified result type for the simulator.
pub type Result<T> = std::result::Result<T, SimError>;
