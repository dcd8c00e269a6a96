pub mod coordinator;
pub mod process;
pub mod request;

pub use coordinator::{RequestCoordinator, ServiceOutcome};
pub use process::{FileOp, ProcState, Process};
pub use request::Request;
