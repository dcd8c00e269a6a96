use log::{debug, info, warn};

use crate::fs::error::{Result, SimError};
use crate::fs::FileSystem;
use crate::proc::process::{FileOp, ProcState, Process};
use crate::proc::request::Request;
use crate::sched::{Policy, PolicyKind};

/// Result of servicing one request.
#[derive(Debug)]
pub struct ServiceOutcome {
    pub request: Request,
    pub distance: usize,
    /// Set when this was the owning process's last pending request and the
    /// deferred file operation ran (and possibly failed).
    pub completed_process: Option<u64>,
    pub op_error: Option<SimError>,
}

/// Owns the process table and both request queues, and drives servicing
/// under the active scheduling policy.
///
/// Everything is synchronous and single-owner: every transition happens
/// inside an `enqueue_*`, `service_next` or `cancel` call and has returned
/// before anything else can observe the state.
#[derive(Debug)]
pub struct RequestCoordinator {
    processes: Vec<Process>,
    pending: Vec<Request>,
    serviced: Vec<Request>,
    policy: Policy,
    head: usize,
    total_blocks: usize,
    current_process: Option<u64>,
    total_serviced: u64,
    total_movement: u64,
    next_process_id: u64,
    next_request_id: u64,
}

impl RequestCoordinator {
    pub fn new(total_blocks: usize) -> Self {
        Self {
            processes: Vec::new(),
            pending: Vec::new(),
            serviced: Vec::new(),
            policy: Policy::new(PolicyKind::Fifo),
            head: 0,
            total_blocks,
            current_process: None,
            total_serviced: 0,
            total_movement: 0,
            next_process_id: 1,
            next_request_id: 1,
        }
    }

    /// Registers a new process in `Ready` state.
    ///
    /// Applies the file-operation validation gates before admission, so a
    /// logically conflicting process is never created.
    pub fn create_process(
        &mut self,
        name: &str,
        op: FileOp,
        target_name: &str,
        size_blocks: usize,
        rename_to: Option<String>,
        owner: &str,
    ) -> Result<u64> {
        self.validate_file_op(target_name, op)?;

        let id = self.next_process_id;
        self.next_process_id += 1;
        let mut process = Process::new(id, name, op, target_name, size_blocks, owner);
        process.rename_to = rename_to;
        process.transition(ProcState::Ready);
        self.processes.push(process);
        debug!("process P{} admitted ({} '{}')", id, op, target_name);
        Ok(id)
    }

    /// Checks whether a new file operation is admissible right now.
    ///
    /// A `Create` is rejected while a non-terminated `Create` for the same
    /// name exists; `Read`/`Update`/`Delete` are rejected while a
    /// non-terminated `Delete` for the name exists.
    pub fn validate_file_op(&self, file_name: &str, op: FileOp) -> Result<()> {
        match op {
            FileOp::Create => {
                if self.has_active_op(file_name, FileOp::Create) {
                    return Err(SimError::InvalidState(format!(
                        "a create for '{}' is already pending",
                        file_name
                    )));
                }
            }
            FileOp::Read | FileOp::Update | FileOp::Delete => {
                if self.has_active_op(file_name, FileOp::Delete) {
                    return Err(SimError::InvalidState(format!(
                        "'{}' has a pending delete",
                        file_name
                    )));
                }
            }
        }
        Ok(())
    }

    fn has_active_op(&self, file_name: &str, op: FileOp) -> bool {
        self.processes
            .iter()
            .any(|p| !p.is_terminated() && p.op == op && p.target_name == file_name)
    }

    /// Appends one I/O request for `process_id` and blocks the process.
    pub fn enqueue_request(&mut self, process_id: u64, target: usize, op: FileOp) -> Result<u64> {
        if target >= self.total_blocks {
            return Err(SimError::OutOfRange(target));
        }
        let process = self
            .process_mut(process_id)
            .ok_or_else(|| SimError::NotFound(format!("process {}", process_id)))?;
        if process.is_terminated() {
            return Err(SimError::InvalidState(format!(
                "process {} already terminated",
                process_id
            )));
        }
        process.transition(ProcState::Blocked);

        let id = self.next_request_id;
        self.next_request_id += 1;
        self.pending.push(Request::new(id, process_id, target, op));
        Ok(id)
    }

    /// Bulk form: one request per block, preserving block-id order.
    pub fn enqueue_requests_for_chain(
        &mut self,
        process_id: u64,
        blocks: &[usize],
        op: FileOp,
    ) -> Result<()> {
        for &block in blocks {
            self.enqueue_request(process_id, block, op)?;
        }
        Ok(())
    }

    /// Services the next pending request under the active policy.
    ///
    /// Moves the head, accounts the seek distance, promotes the owning
    /// process to `Running`, and — when this drained the process's request
    /// set — runs the deferred file operation exactly once and terminates
    /// the process. Returns `None` on an empty queue.
    pub fn service_next(&mut self, fs: &mut FileSystem) -> Option<ServiceOutcome> {
        let i = self.policy.select_next(&self.pending, self.head)?;
        let mut request = self.pending.remove(i);

        let distance = request.distance_from(self.head);
        self.total_movement += distance as u64;
        self.total_serviced += 1;
        self.head = request.target;
        request.serviced = true;
        self.serviced.push(request.clone());

        let process_id = request.process_id;
        let target = request.target;
        if let Some(process) = self.process_mut(process_id) {
            process.transition(ProcState::Running);
            process.current_block = Some(target);
        }
        self.current_process = Some(process_id);
        debug!(
            "serviced request #{} (block {}, distance {})",
            request.id, request.target, distance
        );

        let mut outcome = ServiceOutcome {
            request,
            distance,
            completed_process: None,
            op_error: None,
        };

        if !self.has_pending_requests(process_id) {
            outcome.op_error = self.complete_process(process_id, fs).err();
            outcome.completed_process = Some(process_id);
            self.current_process = None;
        }

        Some(outcome)
    }

    /// Runs a process's deferred file operation (at most once) and
    /// terminates it.
    ///
    /// Privilege is elevated for the dispatch and restored afterwards no
    /// matter how the operation went. A failed operation leaves
    /// `operation_executed` false.
    fn complete_process(&mut self, process_id: u64, fs: &mut FileSystem) -> Result<()> {
        let Some(process) = self.processes.iter_mut().find(|p| p.id == process_id) else {
            return Err(SimError::NotFound(format!("process {}", process_id)));
        };

        let result = if process.operation_executed {
            Ok(())
        } else {
            let prior_admin = fs.is_admin();
            fs.set_admin(true);
            let result = match process.op {
                FileOp::Create => fs
                    .create_file(&process.target_name, process.size_blocks)
                    .map(|_| ()),
                FileOp::Delete => fs.delete_file(&process.target_name).map(|_| ()),
                FileOp::Update => {
                    let new_name = process.effective_rename();
                    fs.rename_file(&process.target_name, &new_name)
                }
                // Reading mutates nothing; the seeks were the work.
                FileOp::Read => Ok(()),
            };
            fs.set_admin(prior_admin);

            if result.is_ok() {
                process.operation_executed = true;
            }
            result
        };

        process.transition(ProcState::Terminated);
        match &result {
            Ok(()) => info!("process P{} terminated", process_id),
            Err(e) => warn!("process P{} deferred {} failed: {}", process_id, process.op, e),
        }
        result
    }

    /// Cancels a process: drops its pending requests and force-terminates
    /// it. Returns false for unknown or already-terminated processes.
    pub fn cancel(&mut self, process_id: u64) -> bool {
        let Some(process) = self.processes.iter_mut().find(|p| p.id == process_id) else {
            return false;
        };
        if process.is_terminated() {
            return false;
        }

        self.pending.retain(|r| r.process_id != process_id);
        process.transition(ProcState::Terminated);
        if self.current_process == Some(process_id) {
            self.current_process = None;
        }
        info!("process P{} cancelled", process_id);
        true
    }

    /// Installs a fresh policy instance; effective on the next
    /// `service_next`. Per-policy state (SCAN's direction) starts over.
    pub fn set_policy(&mut self, kind: PolicyKind) {
        info!("scheduling policy {} -> {}", self.policy.kind(), kind);
        self.policy = Policy::new(kind);
    }

    pub fn policy_kind(&self) -> PolicyKind {
        self.policy.kind()
    }

    /// Pending requests in the order the active policy would service them.
    pub fn ordered_queue(&self) -> Vec<Request> {
        self.policy.order_queue(&self.pending, self.head)
    }

    /// Total head movement a full drain of the queue would cost from here.
    pub fn planned_movement(&self) -> usize {
        self.policy
            .movement_total(&self.pending, self.head, self.total_blocks - 1)
    }

    /// Seek cost of one move under the active policy's cost model.
    pub fn seek_cost(&self, pos: usize, target: usize) -> usize {
        self.policy.seek_cost(pos, target, self.total_blocks - 1)
    }

    pub fn has_pending_requests(&self, process_id: u64) -> bool {
        self.pending.iter().any(|r| r.process_id == process_id)
    }

    pub fn process(&self, process_id: u64) -> Option<&Process> {
        self.processes.iter().find(|p| p.id == process_id)
    }

    fn process_mut(&mut self, process_id: u64) -> Option<&mut Process> {
        self.processes.iter_mut().find(|p| p.id == process_id)
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn processes_in_state(&self, state: ProcState) -> Vec<&Process> {
        self.processes.iter().filter(|p| p.state == state).collect()
    }

    pub fn count_by_state(&self, state: ProcState) -> usize {
        self.processes.iter().filter(|p| p.state == state).count()
    }

    pub fn active_process_count(&self) -> usize {
        self.processes.iter().filter(|p| !p.is_terminated()).count()
    }

    pub fn pending(&self) -> &[Request] {
        &self.pending
    }

    pub fn serviced(&self) -> &[Request] {
        &self.serviced
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn current_process(&self) -> Option<u64> {
        self.current_process
    }

    pub fn total_serviced(&self) -> u64 {
        self.total_serviced
    }

    pub fn total_movement(&self) -> u64 {
        self.total_movement
    }

    pub fn average_movement(&self) -> f64 {
        if self.total_serviced == 0 {
            0.0
        } else {
            self.total_movement as f64 / self.total_serviced as f64
        }
    }

    /// Drops terminated processes from the table; returns how many.
    pub fn clear_terminated(&mut self) -> usize {
        let before = self.processes.len();
        self.processes.retain(|p| !p.is_terminated());
        before - self.processes.len()
    }

    /// Clears everything for a fresh run, id counters included.
    pub fn clear_all(&mut self) {
        self.processes.clear();
        self.pending.clear();
        self.serviced.clear();
        self.current_process = None;
        self.head = 0;
        self.total_serviced = 0;
        self.total_movement = 0;
        self.next_process_id = 1;
        self.next_request_id = 1;
    }

    // Persistence-load support.

    pub(crate) fn set_head(&mut self, head: usize) {
        self.head = head;
    }

    pub(crate) fn set_totals(&mut self, serviced: u64, movement: u64) {
        self.total_serviced = serviced;
        self.total_movement = movement;
    }

    /// Re-inserts a saved process, bumping the id counter past it.
    pub(crate) fn restore_process(&mut self, process: Process) {
        self.next_process_id = self.next_process_id.max(process.id + 1);
        self.processes.push(process);
    }

    /// Re-inserts a saved request into the right queue, bumping the id
    /// counter past it.
    pub(crate) fn restore_request(&mut self, request: Request) {
        self.next_request_id = self.next_request_id.max(request.id + 1);
        if request.serviced {
            self.serviced.push(request);
        } else {
            self.pending.push(request);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(total_blocks: usize) -> (FileSystem, RequestCoordinator) {
        (
            FileSystem::new(total_blocks),
            RequestCoordinator::new(total_blocks),
        )
    }

    fn admit(
        coord: &mut RequestCoordinator,
        op: FileOp,
        target: &str,
        size: usize,
        blocks: &[usize],
    ) -> u64 {
        let pid = coord
            .create_process("proc", op, target, size, None, "tester")
            .unwrap();
        coord.enqueue_requests_for_chain(pid, blocks, op).unwrap();
        pid
    }

    #[test]
    fn lifecycle_ready_blocked_running_terminated() {
        let (mut fs, mut coord) = setup(100);
        let pid = coord
            .create_process("p", FileOp::Read, "x", 0, None, "t")
            .unwrap();
        assert_eq!(coord.process(pid).unwrap().state, ProcState::Ready);

        coord.enqueue_request(pid, 10, FileOp::Read).unwrap();
        coord.enqueue_request(pid, 20, FileOp::Read).unwrap();
        assert_eq!(coord.process(pid).unwrap().state, ProcState::Blocked);

        let out = coord.service_next(&mut fs).unwrap();
        assert_eq!(out.request.target, 10);
        assert!(out.completed_process.is_none());
        assert_eq!(coord.process(pid).unwrap().state, ProcState::Running);
        assert_eq!(coord.current_process(), Some(pid));

        let out = coord.service_next(&mut fs).unwrap();
        assert_eq!(out.completed_process, Some(pid));
        assert!(out.op_error.is_none());
        assert_eq!(coord.process(pid).unwrap().state, ProcState::Terminated);
        assert_eq!(coord.current_process(), None);
        assert!(coord.service_next(&mut fs).is_none());
    }

    #[test]
    fn head_and_movement_accounting() {
        let (mut fs, mut coord) = setup(100);
        let pid = admit(&mut coord, FileOp::Read, "x", 0, &[10, 50, 5]);
        assert!(coord.has_pending_requests(pid));

        coord.service_next(&mut fs).unwrap();
        assert_eq!(coord.head(), 10);
        coord.service_next(&mut fs).unwrap();
        assert_eq!(coord.head(), 50);
        coord.service_next(&mut fs).unwrap();
        assert_eq!(coord.head(), 5);
        // FIFO from 0: 10 + 40 + 45.
        assert_eq!(coord.total_movement(), 95);
        assert_eq!(coord.total_serviced(), 3);
        assert!((coord.average_movement() - 95.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn deferred_create_runs_exactly_once_on_last_request() {
        let (mut fs, mut coord) = setup(100);
        let pid = admit(&mut coord, FileOp::Create, "new.txt", 2, &[0, 1]);

        coord.service_next(&mut fs).unwrap();
        assert!(fs.file("new.txt").is_none(), "create must be deferred");

        let out = coord.service_next(&mut fs).unwrap();
        assert_eq!(out.completed_process, Some(pid));
        assert!(fs.file("new.txt").is_some());
        assert!(coord.process(pid).unwrap().operation_executed);
        assert_eq!(fs.store().occupied_count(), 2);
    }

    #[test]
    fn deferred_delete_and_rename_dispatch() {
        let (mut fs, mut coord) = setup(100);
        fs.create_file("doomed.txt", 2).unwrap();
        let head = fs.file("doomed.txt").unwrap().head.unwrap();
        let chain = fs.store().chain_of(head);

        let pid = coord
            .create_process("p", FileOp::Delete, "doomed.txt", 0, None, "t")
            .unwrap();
        coord
            .enqueue_requests_for_chain(pid, &chain, FileOp::Delete)
            .unwrap();
        while coord.service_next(&mut fs).is_some() {}
        assert!(fs.file("doomed.txt").is_none());
        assert_eq!(fs.store().occupied_count(), 0);

        fs.create_file("old.txt", 1).unwrap();
        let pid = coord
            .create_process(
                "p",
                FileOp::Update,
                "old.txt",
                0,
                Some("new.txt".to_string()),
                "t",
            )
            .unwrap();
        coord.enqueue_request(pid, 0, FileOp::Update).unwrap();
        while coord.service_next(&mut fs).is_some() {}
        assert!(fs.file("new.txt").is_some());
        assert!(fs.file("old.txt").is_none());
    }

    #[test]
    fn failed_deferred_op_does_not_mark_executed() {
        let (mut fs, mut coord) = setup(4);
        // Ask for more blocks than the disk has.
        let pid = admit(&mut coord, FileOp::Create, "big.txt", 9, &[0, 1]);
        let mut last = None;
        while let Some(out) = coord.service_next(&mut fs) {
            last = Some(out);
        }
        let out = last.unwrap();
        assert_eq!(out.completed_process, Some(pid));
        assert!(matches!(out.op_error, Some(SimError::OutOfSpace)));
        let process = coord.process(pid).unwrap();
        assert!(process.is_terminated());
        assert!(!process.operation_executed);
        assert_eq!(fs.store().occupied_count(), 0);
    }

    #[test]
    fn privilege_is_restored_after_dispatch() {
        let (mut fs, mut coord) = setup(100);
        fs.set_admin(false);
        let pid = admit(&mut coord, FileOp::Create, "a.txt", 1, &[0]);
        let out = coord.service_next(&mut fs).unwrap();
        assert_eq!(out.completed_process, Some(pid));
        // The dispatch ran elevated and succeeded, then privilege dropped back.
        assert!(out.op_error.is_none());
        assert!(fs.file("a.txt").is_some());
        assert!(!fs.is_admin());
    }

    #[test]
    fn privilege_is_restored_even_when_the_op_fails() {
        let (mut fs, mut coord) = setup(4);
        fs.set_admin(false);
        let pid = admit(&mut coord, FileOp::Create, "big.txt", 9, &[0]);
        let out = coord.service_next(&mut fs).unwrap();
        assert_eq!(out.completed_process, Some(pid));
        assert!(out.op_error.is_some());
        assert!(!fs.is_admin());
    }

    #[test]
    fn validation_gates_reject_conflicting_operations() {
        let (_, mut coord) = setup(100);
        coord
            .create_process("p", FileOp::Create, "a.txt", 1, None, "t")
            .unwrap();
        // Second concurrent create for the same name.
        assert!(matches!(
            coord.create_process("q", FileOp::Create, "a.txt", 1, None, "t"),
            Err(SimError::InvalidState(_))
        ));
        // Different name is fine.
        coord
            .create_process("q", FileOp::Create, "b.txt", 1, None, "t")
            .unwrap();

        coord
            .create_process("r", FileOp::Delete, "b.txt", 0, None, "t")
            .unwrap();
        for op in [FileOp::Read, FileOp::Update, FileOp::Delete] {
            assert!(matches!(
                coord.create_process("s", op, "b.txt", 0, None, "t"),
                Err(SimError::InvalidState(_))
            ));
        }
    }

    #[test]
    fn gates_reopen_after_termination() {
        let (mut fs, mut coord) = setup(100);
        let pid = admit(&mut coord, FileOp::Create, "a.txt", 1, &[0]);
        while coord.service_next(&mut fs).is_some() {}
        assert!(coord.process(pid).unwrap().is_terminated());
        // The create finished, so only the filesystem itself objects now.
        coord.validate_file_op("a.txt", FileOp::Create).unwrap();
    }

    #[test]
    fn cancel_removes_only_that_processes_requests() {
        let (_, mut coord) = setup(100);
        let a = admit(&mut coord, FileOp::Read, "a.txt", 0, &[10, 20]);
        let b = admit(&mut coord, FileOp::Read, "b.txt", 0, &[30]);

        assert!(coord.cancel(a));
        assert!(!coord.has_pending_requests(a));
        assert!(coord.has_pending_requests(b));
        assert_eq!(coord.pending().len(), 1);
        assert!(coord.process(a).unwrap().is_terminated());

        // Terminated and unknown ids are rejected without touching queues.
        assert!(!coord.cancel(a));
        assert!(!coord.cancel(9999));
        assert_eq!(coord.pending().len(), 1);
    }

    #[test]
    fn enqueue_validation() {
        let (_, mut coord) = setup(100);
        assert!(matches!(
            coord.enqueue_request(42, 10, FileOp::Read),
            Err(SimError::NotFound(_))
        ));
        let pid = coord
            .create_process("p", FileOp::Read, "a", 0, None, "t")
            .unwrap();
        assert!(matches!(
            coord.enqueue_request(pid, 100, FileOp::Read),
            Err(SimError::OutOfRange(100))
        ));
        coord.cancel(pid);
        assert!(matches!(
            coord.enqueue_request(pid, 10, FileOp::Read),
            Err(SimError::InvalidState(_))
        ));
    }

    #[test]
    fn policy_switch_takes_effect_next_call_and_resets_scan() {
        let (mut fs, mut coord) = setup(100);
        admit(&mut coord, FileOp::Read, "a", 0, &[90, 10, 40]);

        coord.set_policy(PolicyKind::Sstf);
        coord.set_head(50);
        let out = coord.service_next(&mut fs).unwrap();
        assert_eq!(out.request.target, 40);

        // SCAN installed mid-run starts ascending regardless of history.
        coord.set_policy(PolicyKind::Scan);
        let out = coord.service_next(&mut fs).unwrap();
        assert_eq!(out.request.target, 90);
        let out = coord.service_next(&mut fs).unwrap();
        assert_eq!(out.request.target, 10);
    }

    #[test]
    fn fifo_services_in_arrival_order_across_processes() {
        let (mut fs, mut coord) = setup(100);
        admit(&mut coord, FileOp::Read, "a", 0, &[90]);
        admit(&mut coord, FileOp::Read, "b", 0, &[5]);
        let first = coord.service_next(&mut fs).unwrap();
        let second = coord.service_next(&mut fs).unwrap();
        assert!(first.request.id < second.request.id);
        assert_eq!(first.request.target, 90);
        assert_eq!(second.request.target, 5);
    }

    #[test]
    fn ordered_queue_is_nondestructive() {
        let (_, mut coord) = setup(100);
        admit(&mut coord, FileOp::Read, "a", 0, &[90, 5, 40]);
        coord.set_policy(PolicyKind::Sstf);
        let before: Vec<u64> = coord.pending().iter().map(|r| r.id).collect();
        let _ = coord.ordered_queue();
        let _ = coord.planned_movement();
        let after: Vec<u64> = coord.pending().iter().map(|r| r.id).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn planned_movement_respects_the_disk_size() {
        let (_, mut coord) = setup(200);
        coord.set_policy(PolicyKind::Cscan);
        coord.set_head(150);
        admit(&mut coord, FileOp::Read, "x", 0, &[10]);
        // Wrap runs out to block 199, the edge of this disk.
        assert_eq!(coord.planned_movement(), (199 - 150) + 10);
        assert_eq!(coord.seek_cost(150, 10), (199 - 150) + 10);
    }

    #[test]
    fn clear_terminated_keeps_active_processes() {
        let (mut fs, mut coord) = setup(100);
        let a = admit(&mut coord, FileOp::Read, "a", 0, &[1]);
        let b = admit(&mut coord, FileOp::Read, "b", 0, &[2, 3]);
        coord.service_next(&mut fs).unwrap(); // finishes a
        assert!(coord.process(a).unwrap().is_terminated());
        assert_eq!(coord.clear_terminated(), 1);
        assert!(coord.process(a).is_none());
        assert!(coord.process(b).is_some());
        assert_eq!(coord.active_process_count(), 1);
    }
}
