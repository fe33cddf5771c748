//! Bounded subprocess execution for external renderers.

use crate::error::ErdError;
use std::io::{Read, Seek, SeekFrom};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run a renderer command to completion, killing it once `timeout` elapses.
///
/// Stderr is captured in an anonymous temp file so a chatty renderer can never
/// block on a full pipe; its last line ends up in the error message.
pub(crate) fn run_command(
    engine: &str,
    mut command: Command,
    timeout: Duration,
) -> Result<(), ErdError> {
    let program = command.get_program().to_string_lossy().into_owned();

    let mut stderr_file = tempfile::tempfile()?;
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::from(stderr_file.try_clone()?));

    let mut child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ErdError::renderer(engine, format!("'{}' command not found", program))
        } else {
            ErdError::renderer(engine, format!("failed to start '{}': {}", program, e))
        }
    })?;

    let start = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ErdError::renderer(
                engine,
                format!("'{}' timed out after {}s", program, timeout.as_secs()),
            ));
        }
        thread::sleep(POLL_INTERVAL);
    };

    if status.success() {
        return Ok(());
    }

    let mut stderr = String::new();
    stderr_file.seek(SeekFrom::Start(0))?;
    let _ = stderr_file.read_to_string(&mut stderr);
    let detail = stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(|l| format!(": {}", l.trim()))
        .unwrap_or_default();

    Err(ErdError::renderer(
        engine,
        format!("'{}' exited with {}{}", program, status, detail),
    ))
}
