//! Snapshot persistence.
//!
//! Line-oriented, `|||`-delimited text with one section per state family.
//! Loading builds entirely fresh instances, so a malformed snapshot aborts
//! without touching the caller's live state. Loaded processes are forced
//! back to `Blocked` and not-yet-executed so pending work re-runs
//! deterministically; because of that, process state is not written out at
//! all and save -> load -> save reproduces the file byte for byte.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::warn;

use crate::fs::error::{Result, SimError};
use crate::fs::catalog::FileEntry;
use crate::fs::FileSystem;
use crate::proc::{FileOp, ProcState, Process, Request, RequestCoordinator};
use crate::sched::PolicyKind;

const SEP: &str = "|||";
const END: &str = "###END###";
const NONE: &str = "null";

const SEC_DISK: &str = "=== DISK ===";
const SEC_BLOCKS: &str = "=== BLOCKS ===";
const SEC_FILES: &str = "=== FILES ===";
const SEC_PROCESSES: &str = "=== PROCESSES ===";
const SEC_PENDING: &str = "=== PENDING ===";
const SEC_SERVICED: &str = "=== SERVICED ===";

/// Writes the full simulator state to `path`.
pub fn save(path: &Path, fs: &FileSystem, coord: &RequestCoordinator) -> Result<()> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    writeln!(w, "{}", SEC_DISK)?;
    writeln!(
        w,
        "{}{SEP}{}{SEP}{}{SEP}{}{SEP}{}",
        coord.head(),
        fs.store().len(),
        coord.policy_kind(),
        coord.total_serviced(),
        coord.total_movement(),
    )?;

    writeln!(w, "{}", SEC_BLOCKS)?;
    for block in fs.store().blocks() {
        writeln!(
            w,
            "{}{SEP}{}{SEP}{}{SEP}{}",
            block.id,
            block.occupied,
            opt_usize(block.next),
            block.owner.as_deref().unwrap_or(NONE),
        )?;
    }
    writeln!(w, "{}", END)?;

    writeln!(w, "{}", SEC_FILES)?;
    for entry in fs.files() {
        writeln!(
            w,
            "{}{SEP}{}{SEP}{}{SEP}{}",
            entry.name,
            entry.size_blocks,
            opt_usize(entry.head),
            entry.owner,
        )?;
    }
    writeln!(w, "{}", END)?;

    writeln!(w, "{}", SEC_PROCESSES)?;
    for process in coord.processes() {
        writeln!(
            w,
            "{}{SEP}{}{SEP}{}{SEP}{}{SEP}{}{SEP}{}{SEP}{}",
            process.id,
            process.name,
            process.op,
            process.target_name,
            process.rename_to.as_deref().unwrap_or(NONE),
            process.size_blocks,
            process.owner,
        )?;
    }
    writeln!(w, "{}", END)?;

    writeln!(w, "{}", SEC_PENDING)?;
    for request in coord.pending() {
        write_request(&mut w, request)?;
    }
    writeln!(w, "{}", END)?;

    writeln!(w, "{}", SEC_SERVICED)?;
    for request in coord.serviced() {
        write_request(&mut w, request)?;
    }
    writeln!(w, "{}", END)?;

    w.flush()?;
    Ok(())
}

fn write_request(w: &mut impl Write, request: &Request) -> Result<()> {
    writeln!(
        w,
        "{}{SEP}{}{SEP}{}{SEP}{}",
        request.id, request.process_id, request.target, request.op,
    )?;
    Ok(())
}

/// Reads a snapshot back into a fresh filesystem and coordinator pair.
///
/// Any malformed line aborts the whole load; the caller keeps whatever
/// state it already had.
pub fn load(path: &Path) -> Result<(FileSystem, RequestCoordinator)> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    expect_line(&mut lines, SEC_DISK)?;
    let header = next_line(&mut lines)?;
    let fields = split(&header, 5)?;
    let head: usize = parse_num(&fields[0], "head")?;
    let total_blocks: usize = parse_num(&fields[1], "total blocks")?;
    let policy = PolicyKind::parse(&fields[2])
        .ok_or_else(|| corrupt(format!("unknown policy '{}'", fields[2])))?;
    let total_serviced: u64 = parse_num(&fields[3], "serviced total")?;
    let total_movement: u64 = parse_num(&fields[4], "movement total")?;

    if total_blocks == 0 || head >= total_blocks {
        return Err(corrupt(format!(
            "head {} outside disk of {} blocks",
            head, total_blocks
        )));
    }

    let mut fs = FileSystem::new(total_blocks);
    let mut coord = RequestCoordinator::new(total_blocks);
    coord.set_policy(policy);
    coord.set_head(head);
    coord.set_totals(total_serviced, total_movement);

    expect_line(&mut lines, SEC_BLOCKS)?;
    for line in section(&mut lines)? {
        let fields = split(&line, 4)?;
        let id: usize = parse_num(&fields[0], "block id")?;
        let occupied: bool = fields[1]
            .parse()
            .map_err(|_| corrupt(format!("bad occupancy flag '{}'", fields[1])))?;
        let next = parse_opt_usize(&fields[2])?;
        let owner = parse_opt_str(&fields[3]);
        fs.store_mut().restore_block(id, occupied, next, owner)?;
    }
    fs.store_mut().recount_free();

    expect_line(&mut lines, SEC_FILES)?;
    for line in section(&mut lines)? {
        let fields = split(&line, 4)?;
        let mut entry = FileEntry::new(&fields[0], parse_num(&fields[1], "file size")?, &fields[3]);
        entry.head = parse_opt_usize(&fields[2])?;
        if let Some(h) = entry.head {
            if h >= total_blocks {
                return Err(SimError::OutOfRange(h));
            }
        }
        fs.catalog_mut().insert(entry);
    }

    expect_line(&mut lines, SEC_PROCESSES)?;
    for line in section(&mut lines)? {
        let fields = split(&line, 7)?;
        let op = FileOp::parse(&fields[2])
            .ok_or_else(|| corrupt(format!("unknown operation '{}'", fields[2])))?;
        let mut process = Process::new(
            parse_num(&fields[0], "process id")?,
            &fields[1],
            op,
            &fields[3],
            parse_num(&fields[5], "process size")?,
            &fields[6],
        );
        process.rename_to = parse_opt_str(&fields[4]);
        // Loaded work always re-runs: blocked, not yet executed.
        process.state = ProcState::Blocked;
        process.operation_executed = false;
        coord.restore_process(process);
    }

    expect_line(&mut lines, SEC_PENDING)?;
    for line in section(&mut lines)? {
        coord.restore_request(read_request(&line, &coord, total_blocks, false)?);
    }

    expect_line(&mut lines, SEC_SERVICED)?;
    for line in section(&mut lines)? {
        coord.restore_request(read_request(&line, &coord, total_blocks, true)?);
    }

    Ok((fs, coord))
}

fn read_request(
    line: &str,
    coord: &RequestCoordinator,
    total_blocks: usize,
    serviced: bool,
) -> Result<Request> {
    let fields = split(line, 4)?;
    let process_id: u64 = parse_num(&fields[1], "request process id")?;
    if coord.process(process_id).is_none() {
        return Err(corrupt(format!(
            "request references unknown process {}",
            process_id
        )));
    }
    let target: usize = parse_num(&fields[2], "request target")?;
    if target >= total_blocks {
        return Err(SimError::OutOfRange(target));
    }
    let op = FileOp::parse(&fields[3])
        .ok_or_else(|| corrupt(format!("unknown operation '{}'", fields[3])))?;
    let mut request = Request::new(parse_num(&fields[0], "request id")?, process_id, target, op);
    request.serviced = serviced;
    Ok(request)
}

/// Collects lines up to the section terminator.
fn section(lines: &mut impl Iterator<Item = std::io::Result<String>>) -> Result<Vec<String>> {
    let mut collected = Vec::new();
    loop {
        let line = next_line(lines)?;
        if line == END {
            return Ok(collected);
        }
        collected.push(line);
    }
}

fn next_line(lines: &mut impl Iterator<Item = std::io::Result<String>>) -> Result<String> {
    match lines.next() {
        Some(Ok(line)) => Ok(line.trim_end().to_string()),
        Some(Err(e)) => Err(e.into()),
        None => Err(corrupt("unexpected end of snapshot".to_string())),
    }
}

fn expect_line(
    lines: &mut impl Iterator<Item = std::io::Result<String>>,
    expected: &str,
) -> Result<()> {
    let line = next_line(lines)?;
    if line == expected {
        Ok(())
    } else {
        Err(corrupt(format!("expected '{}', found '{}'", expected, line)))
    }
}

fn split(line: &str, expected_fields: usize) -> Result<Vec<String>> {
    let fields: Vec<String> = line.split(SEP).map(str::to_string).collect();
    if fields.len() == expected_fields {
        Ok(fields)
    } else {
        Err(corrupt(format!(
            "expected {} fields, found {} in '{}'",
            expected_fields,
            fields.len(),
            line
        )))
    }
}

fn parse_num<T: std::str::FromStr>(field: &str, what: &str) -> Result<T> {
    field
        .parse()
        .map_err(|_| corrupt(format!("bad {}: '{}'", what, field)))
}

fn parse_opt_usize(field: &str) -> Result<Option<usize>> {
    if field == NONE {
        Ok(None)
    } else {
        parse_num(field, "block reference").map(Some)
    }
}

fn parse_opt_str(field: &str) -> Option<String> {
    if field == NONE {
        None
    } else {
        Some(field.to_string())
    }
}

fn opt_usize(value: Option<usize>) -> String {
    value.map_or_else(|| NONE.to_string(), |v| v.to_string())
}

fn corrupt(msg: String) -> SimError {
    warn!("snapshot load failed: {}", msg);
    SimError::Corrupted(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proc::ProcState;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("chainfs_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        path
    }

    fn populated() -> (FileSystem, RequestCoordinator) {
        let mut fs = FileSystem::new(100);
        let mut coord = RequestCoordinator::new(100);
        fs.create_file("a.txt", 3).unwrap();
        fs.create_file("b.txt", 2).unwrap();

        let pid = coord
            .create_process("reader", FileOp::Read, "a.txt", 0, None, "tester")
            .unwrap();
        let chain = fs.store().chain_of(fs.file("a.txt").unwrap().head.unwrap());
        coord
            .enqueue_requests_for_chain(pid, &chain, FileOp::Read)
            .unwrap();
        coord.service_next(&mut fs).unwrap(); // one serviced, two pending

        let pid = coord
            .create_process(
                "renamer",
                FileOp::Update,
                "b.txt",
                0,
                Some("c.txt".to_string()),
                "tester",
            )
            .unwrap();
        coord.enqueue_request(pid, 4, FileOp::Update).unwrap();
        coord.set_policy(crate::sched::PolicyKind::Sstf);
        (fs, coord)
    }

    #[test]
    fn round_trip_preserves_disk_and_queues() {
        let path = temp_path("round_trip");
        let (fs, coord) = populated();
        save(&path, &fs, &coord).unwrap();
        let (fs2, coord2) = load(&path).unwrap();

        assert_eq!(fs2.store().blocks(), fs.store().blocks());
        assert_eq!(fs2.store().free_count(), fs.store().free_count());
        assert_eq!(coord2.head(), coord.head());
        assert_eq!(coord2.policy_kind(), coord.policy_kind());
        assert_eq!(coord2.total_movement(), coord.total_movement());

        let key = |r: &Request| (r.id, r.process_id, r.target, r.op);
        let pending: Vec<_> = coord.pending().iter().map(key).collect();
        let pending2: Vec<_> = coord2.pending().iter().map(key).collect();
        assert_eq!(pending, pending2);
        assert_eq!(coord2.serviced().len(), coord.serviced().len());

        // Every loaded process re-runs from Blocked.
        assert_eq!(coord2.processes().len(), coord.processes().len());
        for process in coord2.processes() {
            assert_eq!(process.state, ProcState::Blocked);
            assert!(!process.operation_executed);
        }

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn save_load_save_is_byte_identical() {
        let path = temp_path("stable");
        let path2 = temp_path("stable2");
        let (fs, coord) = populated();
        save(&path, &fs, &coord).unwrap();
        let (fs2, coord2) = load(&path).unwrap();
        save(&path2, &fs2, &coord2).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            std::fs::read_to_string(&path2).unwrap()
        );
        std::fs::remove_file(&path).ok();
        std::fs::remove_file(&path2).ok();
    }

    #[test]
    fn id_counters_resume_past_loaded_ids() {
        let path = temp_path("counters");
        let (fs, coord) = populated();
        let max_pid = coord.processes().iter().map(|p| p.id).max().unwrap();
        save(&path, &fs, &coord).unwrap();

        let (_, mut coord2) = load(&path).unwrap();
        let new_pid = coord2
            .create_process("fresh", FileOp::Read, "a.txt", 0, None, "t")
            .unwrap();
        assert!(new_pid > max_pid);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn malformed_snapshot_is_rejected() {
        let path = temp_path("garbage");
        std::fs::write(&path, "=== DISK ===\nnot|||a|||header\n").unwrap();
        assert!(matches!(load(&path), Err(SimError::Corrupted(_))));

        std::fs::write(&path, "complete nonsense").unwrap();
        assert!(matches!(load(&path), Err(SimError::Corrupted(_))));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn truncated_snapshot_is_rejected() {
        let path = temp_path("truncated");
        let (fs, coord) = populated();
        save(&path, &fs, &coord).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let cut = text.len() / 2;
        std::fs::write(&path, &text[..cut]).unwrap();
        assert!(load(&path).is_err());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = temp_path("missing");
        assert!(matches!(load(&path), Err(SimError::Io(_))));
    }

    #[test]
    fn request_target_outside_disk_is_rejected() {
        let path = temp_path("oob_target");
        let fs = FileSystem::new(10);
        let mut coord = RequestCoordinator::new(10);
        let pid = coord
            .create_process("p", FileOp::Read, "a", 0, None, "t")
            .unwrap();
        coord.enqueue_request(pid, 3, FileOp::Read).unwrap();
        save(&path, &fs, &coord).unwrap();

        // Point the request at a block the 10-block disk doesn't have.
        let text = std::fs::read_to_string(&path).unwrap();
        let broken = text.replace(
            &format!("1|||{}|||3|||READ", pid),
            &format!("1|||{}|||500|||READ", pid),
        );
        assert_ne!(text, broken);
        std::fs::write(&path, broken).unwrap();
        assert!(matches!(load(&path), Err(SimError::OutOfRange(500))));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn request_for_unknown_process_is_corruption() {
        let path = temp_path("dangling");
        let fs = FileSystem::new(10);
        let mut coord = RequestCoordinator::new(10);
        let pid = coord
            .create_process("p", FileOp::Read, "a", 0, None, "t")
            .unwrap();
        coord.enqueue_request(pid, 3, FileOp::Read).unwrap();
        save(&path, &fs, &coord).unwrap();

        // Point the request at a process id that was never saved.
        let text = std::fs::read_to_string(&path).unwrap();
        let broken = text.replace(&format!("1|||{}|||3|||READ", pid), "1|||99|||3|||READ");
        assert_ne!(text, broken);
        std::fs::write(&path, broken).unwrap();
        assert!(matches!(load(&path), Err(SimError::Corrupted(_))));

        std::fs::remove_file(&path).ok();
    }
}
