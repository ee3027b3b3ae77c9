//! External mesher processes.
//!
//! [`run_tool`] runs one command as a bounded subprocess: output is drained
//! on helper threads while the caller polls for exit, the deadline and the
//! [`CancelToken`]. [`ToolRegistry`] queries each tool at most once and keeps
//! its banner.

use crate::config::MesherConfig;
use itertools::Itertools;
use once_cell::sync::OnceCell;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

const POLL: Duration = Duration::from_millis(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
/// How long output is still collected once the tool was killed.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; running tools are killed at the next poll.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag so the next run can start.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// How a tool run ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolOutcome {
    Success,
    /// Nonzero exit or killed by a signal.
    Failed(Option<i32>),
    TimedOut,
    Cancelled,
    /// The executable could not be started.
    NotFound,
}

/// Result of [`run_tool`]: outcome, captured output and wall time.
#[derive(Clone, Debug)]
pub struct ToolRun {
    pub outcome: ToolOutcome,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ToolRun {
    fn not_started(reason: String) -> Self {
        ToolRun {
            outcome: ToolOutcome::NotFound,
            stdout: String::new(),
            stderr: reason,
            elapsed: Duration::ZERO,
        }
    }

    /// Human-readable reason of a failed run: the outcome and the tail of
    /// stderr.
    pub fn reason(&self) -> String {
        let lines: Vec<&str> = self.stderr.lines().filter(|l| !l.trim().is_empty()).collect();
        let tail = lines[lines.len().saturating_sub(3)..].iter().join(" | ");
        let what = match &self.outcome {
            ToolOutcome::Success => "succeeded".to_string(),
            ToolOutcome::Failed(Some(code)) => format!("exit status {code}"),
            ToolOutcome::Failed(None) => "terminated by a signal".to_string(),
            ToolOutcome::TimedOut => format!("timed out after {:?}", self.elapsed),
            ToolOutcome::Cancelled => "cancelled".to_string(),
            ToolOutcome::NotFound => "could not be started".to_string(),
        };
        if tail.is_empty() {
            what
        } else {
            format!("{what}: {tail}")
        }
    }
}

fn drain<R: Read + Send + 'static>(source: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut r) = source {
            let _ = r.read_to_end(&mut buf);
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Start the tool as the leader of a new process group.
#[cfg(unix)]
fn isolate(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn isolate(_cmd: &mut Command) {}

/// Kill the tool and everything it spawned, then reap it.
fn stop(child: &mut Child) {
    #[cfg(unix)]
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: plain syscall; the child is not reaped yet, so its pid
        // still names the group it leads.
        unsafe {
            libc::killpg(pgid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

/// Run `program args..` in `cwd`, killing it on timeout or cancellation.
pub fn run_tool(
    program: &Path,
    args: &[String],
    cwd: Option<&Path>,
    timeout: Duration,
    cancel: &CancelToken,
) -> ToolRun {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    isolate(&mut cmd);
    log::debug!("running {} {}", program.display(), args.join(" "));
    let start = Instant::now();
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound || e.kind() == ErrorKind::PermissionDenied => {
            return ToolRun::not_started(format!("{}: {e}", program.display()));
        }
        Err(e) => {
            return ToolRun {
                outcome: ToolOutcome::Failed(None),
                stdout: String::new(),
                stderr: e.to_string(),
                elapsed: Duration::ZERO,
            };
        }
    };
    let out = drain(child.stdout.take());
    let err = drain(child.stderr.take());

    let outcome = loop {
        match child.try_wait() {
            Ok(Some(status)) if status.success() => break ToolOutcome::Success,
            Ok(Some(status)) => break ToolOutcome::Failed(status.code()),
            Ok(None) => {}
            Err(_) => {
                stop(&mut child);
                break ToolOutcome::Failed(None);
            }
        }
        if cancel.is_cancelled() {
            stop(&mut child);
            break ToolOutcome::Cancelled;
        }
        if start.elapsed() >= timeout {
            stop(&mut child);
            break ToolOutcome::TimedOut;
        }
        thread::sleep(POLL);
    };
    // helpers that escaped the group may still hold the pipes open
    let wait = match outcome {
        ToolOutcome::Success | ToolOutcome::Failed(Some(_)) => {
            timeout.saturating_sub(start.elapsed()).max(DRAIN_GRACE)
        }
        _ => DRAIN_GRACE,
    };
    let run = ToolRun {
        outcome,
        stdout: out.recv_timeout(wait).unwrap_or_default(),
        stderr: err.recv_timeout(wait).unwrap_or_default(),
        elapsed: start.elapsed(),
    };
    log::debug!("{} finished: {:?} in {:?}", program.display(), run.outcome, run.elapsed);
    run
}

/// External meshers known to the registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Tool {
    TetGen,
    Netgen,
}

impl Tool {
    /// Executable name, also used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Tool::TetGen => "tetgen",
            Tool::Netgen => "netgen",
        }
    }

    fn version_args(self) -> &'static [&'static str] {
        match self {
            Tool::TetGen => &["-version"],
            Tool::Netgen => &["-batchmode"],
        }
    }
}

/// Availability of the external meshers, checked lazily and once.
#[derive(Debug)]
pub struct ToolRegistry {
    tetgen: PathBuf,
    netgen: PathBuf,
    tetgen_banner: OnceCell<Option<String>>,
    netgen_banner: OnceCell<Option<String>>,
}

impl ToolRegistry {
    pub fn new(config: &MesherConfig) -> Self {
        ToolRegistry {
            tetgen: config.tetgen.clone(),
            netgen: config.netgen.clone(),
            tetgen_banner: OnceCell::new(),
            netgen_banner: OnceCell::new(),
        }
    }

    /// Configured executable of `tool`.
    pub fn path(&self, tool: Tool) -> &Path {
        match tool {
            Tool::TetGen => &self.tetgen,
            Tool::Netgen => &self.netgen,
        }
    }

    /// Banner printed by the version query, or `None` if the tool cannot be started.
    pub fn banner(&self, tool: Tool) -> Option<&str> {
        let cell = match tool {
            Tool::TetGen => &self.tetgen_banner,
            Tool::Netgen => &self.netgen_banner,
        };
        cell.get_or_init(|| {
            let args: Vec<String> = tool.version_args().iter().map(|s| s.to_string()).collect();
            let run = run_tool(self.path(tool), &args, None, PROBE_TIMEOUT, &CancelToken::new());
            if run.outcome == ToolOutcome::NotFound {
                log::info!("{} not available: {}", tool.name(), run.stderr);
                return None;
            }
            let banner = if run.stdout.trim().is_empty() { run.stderr } else { run.stdout };
            let banner = banner.trim().to_string();
            log::debug!("{} banner: {banner}", tool.name());
            Some(banner)
        })
        .as_deref()
    }

    /// Whether `tool` could be started by the version query.
    pub fn is_available(&self, tool: Tool) -> bool {
        self.banner(tool).is_some()
    }
}
