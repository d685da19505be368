//! Thread sampler backed by /proc
//!
//! The sampler runs on its own thread. Every tick it reads
//! `/proc/<pid>/task/*/{stat,wchan}` and folds one stack per live thread into
//! the call tree:
//!
//! ```text
//! program
//! └─ thread name (tid N)
//!    └─ scheduler state
//!       └─ kernel wait channel (blocked threads only)
//! ```
//!
//! Each stack is charged with the wall time elapsed since the previous tick.

use crossbeam::channel::{Receiver, RecvTimeoutError};
use nix::unistd::Pid;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::frame::{Frame, StackEntry};

/// Messages from the profiler to the sampler thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Start sampling this process
    Attach(Pid),
    /// Stop sampling and return the collected tree
    Stop,
}

/// Scheduler state of a thread, from the third field of `/proc/<pid>/stat`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Running,
    Sleeping,
    DiskSleep,
    Stopped,
    TracingStop,
    Zombie,
    Dead,
    Idle,
    Other(char),
}

impl ThreadState {
    pub fn from_code(code: char) -> Self {
        match code {
            'R' => Self::Running,
            'S' => Self::Sleeping,
            'D' => Self::DiskSleep,
            'T' => Self::Stopped,
            't' => Self::TracingStop,
            'Z' => Self::Zombie,
            'X' | 'x' => Self::Dead,
            'I' => Self::Idle,
            other => Self::Other(other),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Running => "running".to_string(),
            Self::Sleeping => "sleeping".to_string(),
            Self::DiskSleep => "disk wait".to_string(),
            Self::Stopped => "stopped".to_string(),
            Self::TracingStop => "tracing stop".to_string(),
            Self::Zombie => "zombie".to_string(),
            Self::Dead => "dead".to_string(),
            Self::Idle => "idle".to_string(),
            Self::Other(code) => format!("state {}", code),
        }
    }

    /// Whether the thread has finished and should no longer be charged time
    pub fn is_exited(&self) -> bool {
        matches!(self, Self::Zombie | Self::Dead)
    }

    fn is_blocked(&self) -> bool {
        matches!(self, Self::Sleeping | Self::DiskSleep | Self::Idle)
    }
}

/// One observation of one thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSnapshot {
    pub tid: i32,
    pub name: String,
    pub state: ThreadState,
    pub wchan: Option<String>,
}

impl ThreadSnapshot {
    /// Stack below the program root, outermost first
    pub fn stack(&self) -> Vec<StackEntry> {
        let mut stack = vec![
            StackEntry::new(self.name.clone(), Some(format!("tid {}", self.tid))),
            StackEntry::new(self.state.label(), None),
        ];

        if self.state.is_blocked() {
            if let Some(wchan) = &self.wchan {
                stack.push(StackEntry::new(wchan.clone(), Some("kernel".to_string())));
            }
        }

        stack
    }
}

/// Parse `comm` and the state code out of a `/proc/<pid>/stat` line
///
/// `comm` is parenthesized and may itself contain parentheses or spaces, so
/// the state is located after the last `)`.
pub fn parse_stat(content: &str) -> Option<(String, char)> {
    let open = content.find('(')?;
    let close = content.rfind(')')?;
    if close < open {
        return None;
    }

    let name = content[open + 1..close].to_string();
    let state = content[close + 1..].trim_start().chars().next()?;
    Some((name, state))
}

/// Normalize a `wchan` file; `0` and empty mean "not waiting"
fn parse_wchan(content: &str) -> Option<String> {
    let wchan = content.trim();
    if wchan.is_empty() || wchan == "0" {
        None
    } else {
        Some(wchan.to_string())
    }
}

/// Snapshot every thread of a process
///
/// Threads that disappear while being read are skipped. An error is returned
/// only when the process itself is gone (or /proc is unavailable).
pub fn snapshot_process(pid: Pid) -> io::Result<Vec<ThreadSnapshot>> {
    let task_dir = PathBuf::from(format!("/proc/{}/task", pid));
    let mut snapshots = Vec::new();

    for entry in fs::read_dir(&task_dir)? {
        let Ok(entry) = entry else { continue };
        let Some(tid) = entry.file_name().to_str().and_then(|s| s.parse::<i32>().ok()) else {
            continue;
        };

        let Ok(stat) = fs::read_to_string(entry.path().join("stat")) else {
            continue;
        };
        let Some((name, code)) = parse_stat(&stat) else {
            trace!(tid, "unparseable stat line");
            continue;
        };

        let wchan = fs::read_to_string(entry.path().join("wchan"))
            .ok()
            .and_then(|w| parse_wchan(&w));

        snapshots.push(ThreadSnapshot {
            tid,
            name,
            state: ThreadState::from_code(code),
            wchan,
        });
    }

    snapshots.sort_by_key(|s| s.tid);
    Ok(snapshots)
}

/// Result of a sampling run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerOutput {
    pub root: Frame,
    pub sample_count: u64,
}

/// Sampler thread body
///
/// Waits for [`Control::Attach`], then samples every `interval` until
/// [`Control::Stop`] arrives or the channel disconnects. Once the target is
/// gone the loop idles until told to stop.
pub fn run(program: String, interval: Duration, control: Receiver<Control>) -> SamplerOutput {
    let mut output = SamplerOutput {
        root: Frame::new(program, None),
        sample_count: 0,
    };

    let pid = match control.recv() {
        Ok(Control::Attach(pid)) => pid,
        Ok(Control::Stop) | Err(_) => return output,
    };
    debug!(%pid, ?interval, "sampler attached");

    let mut last_tick = Instant::now();
    let mut target_alive = true;

    loop {
        match control.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) | Ok(Control::Attach(_)) => {}
            Ok(Control::Stop) | Err(RecvTimeoutError::Disconnected) => break,
        }

        if !target_alive {
            continue;
        }

        let now = Instant::now();
        let elapsed_us = now.duration_since(last_tick).as_micros() as u64;
        last_tick = now;

        let threads = match snapshot_process(pid) {
            Ok(threads) => threads,
            Err(e) => {
                debug!(%pid, error = %e, "target gone, sampling stopped");
                target_alive = false;
                continue;
            }
        };

        let live: Vec<_> = threads.iter().filter(|t| !t.state.is_exited()).collect();
        if live.is_empty() {
            debug!(%pid, "no live threads left, sampling stopped");
            target_alive = false;
            continue;
        }

        for thread in live {
            output.root.add_stack(&thread.stack(), elapsed_us);
            output.sample_count += 1;
        }
    }

    output.root.sort();
    debug!(samples = output.sample_count, "sampler finished");
    output
}
