// Subprocess runner with a deadline.
// stdout and stderr are drained on their own threads so a chatty child
// cannot block on a full pipe while we poll for its exit.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::LogFailure;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Kills and reaps the child unless it has already been waited on.
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        if let Err(e) = self.child.kill() {
            debug!(error = %e, "kill on cleanup failed");
        }
        let _ = self.child.wait();
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn join(handle: JoinHandle<std::io::Result<Vec<u8>>>) -> Result<Vec<u8>, LogFailure> {
    match handle.join() {
        Ok(result) => result.map_err(LogFailure::Read),
        Err(_) => Err(LogFailure::Read(std::io::Error::other("reader thread panicked"))),
    }
}

/// Run `program` and return its stdout as lossy UTF-8.
///
/// A non-zero exit is a failure and its stdout is discarded.
pub fn run(program: &str, args: &[String], timeout: Duration) -> Result<String, LogFailure> {
    debug!(program, ?args, "spawning");
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(LogFailure::Spawn)?;
    let mut guard = ChildGuard {
        child,
        reaped: false,
    };

    let stdout = drain(guard.child.stdout.take());
    let stderr = drain(guard.child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        match guard.child.try_wait().map_err(LogFailure::Read)? {
            Some(status) => {
                guard.reaped = true;
                break status;
            }
            None if Instant::now() >= deadline => {
                warn!(program, timeout_secs = timeout.as_secs(), "command timed out");
                drop(guard);
                // pipes close once the child is gone, so the readers finish
                let _ = join(stdout);
                let _ = join(stderr);
                return Err(LogFailure::Timeout(timeout));
            }
            None => thread::sleep(POLL_INTERVAL),
        }
    };

    let out = join(stdout)?;
    let err = join(stderr)?;
    if !status.success() {
        return Err(LogFailure::Exit {
            status,
            stderr: String::from_utf8_lossy(&err).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}
