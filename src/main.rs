use crate::shell::start_shell;

mod disk;
mod fs;
mod persist;
mod proc;
mod sched;
mod shell;

fn main() {
    env_logger::init();
    start_shell();
}
