// crates/launch-harness-core/src/process.rs
// ============================================================================
// Module: Process Plumbing
// Description: Command construction and process-tree termination.
// Purpose: Spawn children in their own process group and kill them as a unit.
// Dependencies: tokio, nix (unix), tracing
// ============================================================================

//! ## Overview
//! On unix every child becomes the leader of a fresh process group so that a
//! timeout can take down helpers it spawned along with it. Elsewhere only
//! the direct child is killed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::process::Stdio;

use tokio::process::Child;
use tokio::process::Command;
use tracing::debug;

use crate::case::TestCase;

// ============================================================================
// SECTION: Command Construction
// ============================================================================

/// Builds the command for `case` without spawning it.
///
/// The argv is passed directly; no shell is involved.
pub(crate) fn build_command(case: &TestCase) -> Command {
    let mut command = Command::new(&case.executable);
    command.args(&case.args);
    if let Some(dir) = &case.working_dir {
        command.current_dir(dir);
    }
    for key in &case.env_remove {
        command.env_remove(key);
    }
    command.envs(&case.env);
    command.stdin(if case.stdin.is_some() { Stdio::piped() } else { Stdio::null() });
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    command.kill_on_drop(true);
    isolate_process_group(&mut command);
    command
}

/// Places the child in a new process group led by itself.
#[cfg(unix)]
fn isolate_process_group(command: &mut Command) {
    command.process_group(0);
}

/// Process groups are a unix concept.
#[cfg(not(unix))]
const fn isolate_process_group(_command: &mut Command) {}

// ============================================================================
// SECTION: Termination
// ============================================================================

/// Forcibly terminates the child and, on unix, every process in its group.
pub(crate) fn kill_process_tree(child: &mut Child, pid: Option<u32>) {
    if let Some(pid) = pid {
        kill_group(pid);
    }
    if let Err(err) = child.start_kill() {
        debug!(error = %err, "child already exited before kill");
    }
}

/// Sends SIGKILL to the process group led by `pid`.
#[cfg(unix)]
fn kill_group(pid: u32) {
    use nix::sys::signal::Signal;
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    if let Err(errno) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        debug!(pgid = raw, error = %errno, "process group already gone");
    }
}

/// No process groups to signal off unix.
#[cfg(not(unix))]
const fn kill_group(_pid: u32) {}
