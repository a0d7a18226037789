//! Process utilities for fbexec
//!
//! Spawning the optimizer with stdout and stderr merged into one pipe, and tearing it down again.

use std::fs::File;
use std::io::{self, ErrorKind};
use std::path::Path;
use std::process::{Child, Command, Stdio};

use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::unistd::pipe;
use std::os::fd::OwnedFd;
use tracing::debug;

use crate::errors::{ExecError, Result};

/// Spawn `program` with `args` in `cwd`, merging its stderr into stdout.
///
/// # Arguments
/// * `program` - Executable name or path
/// * `args` - Command line arguments
/// * `cwd` - Working directory of the child
///
/// # Returns
/// The child and the read end of the merged output pipe. The pipe reports end of stream once
/// the child and every process it forked have closed their copies of the write end.
pub fn spawn_merged(program: &Path, args: &[&str], cwd: &Path) -> Result<(Child, File)> {
    let (read_end, write_end) = pipe().map_err(|e| ExecError::io(program, io::Error::from(e)))?;
    // Only the copies dup'ed onto stdout and stderr may reach the child; a leaked copy would keep
    // the stream open after the child closes its output.
    for fd in [&read_end, &write_end] {
        set_cloexec(fd).map_err(|e| ExecError::io(program, e))?;
    }
    let stderr_end = write_end
        .try_clone()
        .map_err(|e| ExecError::io(program, e))?;

    let child = {
        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::from(write_end))
            .stderr(Stdio::from(stderr_end));
        // Dropping the command at the end of this block closes our copies of the write end.
        command.spawn().map_err(|e| ExecError::io(program, e))?
    };

    debug!(pid = child.id(), program = %program.display(), "spawned child");
    Ok((child, File::from(read_end)))
}

fn set_cloexec(fd: &OwnedFd) -> io::Result<()> {
    fcntl(fd, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    Ok(())
}

/// Whether the child has exited. Reaps it if so.
pub fn has_exited(child: &mut Child) -> bool {
    // An error means the child can no longer be waited on, which only happens once it is gone.
    !matches!(child.try_wait(), Ok(None))
}

/// Forcibly stop the child and reap it. A child that already exited is only reaped.
pub fn terminate(child: &mut Child) -> Result<()> {
    let pid = child.id();
    match child.kill() {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::InvalidInput => {}
        Err(e) => return Err(ExecError::io(format!("pid {pid}"), e)),
    }
    let status = child
        .wait()
        .map_err(|e| ExecError::io(format!("pid {pid}"), e))?;
    debug!(pid, %status, "child terminated");
    Ok(())
}
