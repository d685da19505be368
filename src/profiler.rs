//! Profiling engine
//!
//! [`Profiler`] brackets a run of the target: `start()` begins the clock and
//! launches the sampler thread, `attach()` points it at the target process,
//! and `stop()` joins the sampler and produces a [`Report`].

use crossbeam::channel::{unbounded, Sender};
use nix::unistd::Pid;
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::error::ProfilerError;
use crate::report::{Report, FORMAT_TAG};
use crate::sampler::{self, Control, SamplerOutput};

/// Default sampling interval (1ms)
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1);

struct Running {
    control: Sender<Control>,
    handle: JoinHandle<SamplerOutput>,
    started: Instant,
    start_time_ms: u64,
}

enum State {
    Idle,
    Running(Running),
    Stopped,
}

/// Statistical profiler for one target process
pub struct Profiler {
    program: String,
    interval: Duration,
    state: State,
}

impl Profiler {
    /// Create a profiler; `program` becomes the root frame's name
    pub fn new(program: impl Into<String>, interval: Duration) -> Self {
        Self {
            program: program.into(),
            interval,
            state: State::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running(_))
    }

    /// Start the clock and the sampler thread
    pub fn start(&mut self) -> Result<(), ProfilerError> {
        if !matches!(self.state, State::Idle) {
            return Err(ProfilerError::AlreadyStarted);
        }

        let (control, rx) = unbounded();
        let program = self.program.clone();
        let interval = self.interval;

        let start_time_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let started = Instant::now();

        let handle = std::thread::Builder::new()
            .name("samplr-sampler".to_string())
            .spawn(move || sampler::run(program, interval, rx))
            .map_err(|e| ProfilerError::ThreadSpawn(e.to_string()))?;

        debug!(program = %self.program, ?interval, "profiler started");
        self.state = State::Running(Running {
            control,
            handle,
            started,
            start_time_ms,
        });
        Ok(())
    }

    /// Point the running sampler at the target process
    pub fn attach(&self, pid: Pid) -> Result<(), ProfilerError> {
        match &self.state {
            State::Running(running) => {
                // A closed channel means the sampler already exited; stop() reports it.
                let _ = running.control.send(Control::Attach(pid));
                Ok(())
            }
            _ => Err(ProfilerError::NotStarted),
        }
    }

    /// Stop sampling and build the report
    pub fn stop(&mut self) -> Result<Report, ProfilerError> {
        let running = match std::mem::replace(&mut self.state, State::Stopped) {
            State::Running(running) => running,
            other => {
                self.state = other;
                return Err(ProfilerError::NotStarted);
            }
        };

        let _ = running.control.send(Control::Stop);
        let output = running
            .handle
            .join()
            .map_err(|_| ProfilerError::SamplerPanicked)?;
        let duration = running.started.elapsed();

        debug!(
            samples = output.sample_count,
            frames = output.root.frame_count(),
            duration_us = duration.as_micros() as u64,
            "profiler stopped"
        );

        Ok(Report {
            format: FORMAT_TAG.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            program: self.program.clone(),
            start_time_ms: running.start_time_ms,
            duration_us: duration.as_micros() as u64,
            interval_us: self.interval.as_micros() as u64,
            sample_count: output.sample_count,
            exit_code: None,
            root_frame: output.root,
        })
    }
}

impl Drop for Profiler {
    fn drop(&mut self) {
        if let State::Running(running) = std::mem::replace(&mut self.state, State::Stopped) {
            let _ = running.control.send(Control::Stop);
            if running.handle.join().is_err() {
                warn!("sampler thread panicked during shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_before_start_is_an_error() {
        let mut profiler = Profiler::new("prog", DEFAULT_INTERVAL);
        assert_eq!(profiler.stop().unwrap_err(), ProfilerError::NotStarted);
        assert!(!profiler.is_running());
    }

    #[test]
    fn test_attach_before_start_is_an_error() {
        let profiler = Profiler::new("prog", DEFAULT_INTERVAL);
        assert_eq!(
            profiler.attach(Pid::this()).unwrap_err(),
            ProfilerError::NotStarted
        );
    }

    #[test]
    fn test_double_start_is_an_error() {
        let mut profiler = Profiler::new("prog", DEFAULT_INTERVAL);
        profiler.start().unwrap();
        assert_eq!(profiler.start().unwrap_err(), ProfilerError::AlreadyStarted);
        profiler.stop().unwrap();
    }

    #[test]
    fn test_cannot_restart_after_stop() {
        let mut profiler = Profiler::new("prog", DEFAULT_INTERVAL);
        profiler.start().unwrap();
        profiler.stop().unwrap();
        assert_eq!(profiler.start().unwrap_err(), ProfilerError::AlreadyStarted);
        assert_eq!(profiler.stop().unwrap_err(), ProfilerError::NotStarted);
    }

    #[test]
    fn test_report_without_attach_is_empty() {
        let mut profiler = Profiler::new("prog", Duration::from_micros(500));
        profiler.start().unwrap();
        let report = profiler.stop().unwrap();

        assert_eq!(report.format, FORMAT_TAG);
        assert_eq!(report.program, "prog");
        assert_eq!(report.interval_us, 500);
        assert_eq!(report.sample_count, 0);
        assert_eq!(report.root_frame.function, "prog");
        assert!(report.start_time_ms > 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_profiles_own_process() {
        let mut profiler = Profiler::new("self", DEFAULT_INTERVAL);
        profiler.start().unwrap();
        profiler.attach(Pid::this()).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        let report = profiler.stop().unwrap();

        assert!(report.sample_count > 0);
        assert!(report.duration_us >= 30_000);
    }

    #[test]
    fn test_drop_while_running_joins_sampler() {
        let mut profiler = Profiler::new("prog", DEFAULT_INTERVAL);
        profiler.start().unwrap();
        drop(profiler);
    }
}
