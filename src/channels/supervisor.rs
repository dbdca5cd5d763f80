//! Daemon supervision: spawn, forward output, detect logins, observe exits.
//!
//! Every supervised process gets one forwarding thread per output stream
//! and, for long-lived daemons, one waiter thread. None of them block plan
//! execution. Daemons are never restarted.
//!
//! A process that forks into the background leaves its children holding the
//! output pipes. Once the process itself has exited its forwarders get a
//! short grace period to drain and are then left running detached.

use std::io::{BufRead as _, BufReader, Read};
use std::path::Path;
use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context as _, Result};

use super::{Channel, auth};
use crate::error::ExecutionError;
use crate::exec::{Executor, ExitInfo, ProcessHandle};
use crate::logging::{Log, OutputStream};

/// How long an exited process's output may take to drain.
const OUTPUT_GRACE: Duration = Duration::from_millis(500);

/// How a supervised daemon ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonExit {
    /// Channel the daemon served.
    pub channel: Channel,
    /// Daemon label, the program's file name.
    pub daemon: String,
    /// `None` when the exit status could not be collected.
    pub exit: Option<ExitInfo>,
}

#[derive(Debug)]
struct Supervised {
    channel: Channel,
    daemon: String,
    waiter: JoinHandle<Option<ExitInfo>>,
}

/// Owns every daemon started for the lifetime of the process.
pub struct Supervisor {
    log: Arc<dyn Log>,
    executor: Arc<dyn Executor>,
    dry_run: bool,
    daemons: Vec<Supervised>,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("log", &"<dyn Log>")
            .field("executor", &self.executor)
            .field("dry_run", &self.dry_run)
            .field("daemons", &self.daemons)
            .finish()
    }
}

/// Label used to tag output: the program's file name.
fn daemon_label(program: &str) -> String {
    Path::new(program)
        .file_name()
        .map_or_else(|| program.to_string(), |n| n.to_string_lossy().into_owned())
}

impl Supervisor {
    /// A supervisor with no daemons yet.
    #[must_use]
    pub fn new(log: Arc<dyn Log>, executor: Arc<dyn Executor>, dry_run: bool) -> Self {
        Self {
            log,
            executor,
            dry_run,
            daemons: Vec::new(),
        }
    }

    /// Number of long-lived daemons started so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.daemons.len()
    }

    /// Whether no long-lived daemon has been started.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.daemons.is_empty()
    }

    /// Run an auxiliary daemon in the foreground until it exits.
    ///
    /// Its output is forwarded like any other daemon's. A non-zero exit
    /// aborts the channel start.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be started, its status cannot
    /// be collected, or it exits unsuccessfully.
    pub fn run_to_exit(&self, channel: Channel, program: &str, args: &[&str]) -> Result<()> {
        if self.dry_run {
            self.log
                .dry_run(&format!("would run {program} {} ({channel})", args.join(" ")));
            return Ok(());
        }
        self.log.debug(&format!("running {program} {}", args.join(" ")));
        let mut handle = self.executor.spawn(program, args)?;
        let forwarders = self.attach(channel, handle.as_mut());
        let exit = handle.wait();
        if !drain(forwarders) {
            self.log.debug(&format!(
                "{channel} {program} exited but its output is still open; following it in the background"
            ));
        }
        let exit = exit?;
        if !exit.success {
            return Err(ExecutionError::CommandFailed {
                program: program.to_string(),
                code: exit.code,
                stderr: "see forwarded daemon output".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Start a long-lived daemon and supervise it in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be started.
    pub fn start(&mut self, channel: Channel, program: &str, args: &[&str]) -> Result<()> {
        if self.dry_run {
            self.log
                .dry_run(&format!("would start {program} {} ({channel})", args.join(" ")));
            return Ok(());
        }
        let mut handle = self
            .executor
            .spawn(program, args)
            .with_context(|| format!("starting {channel} daemon"))?;
        let daemon = daemon_label(handle.program());
        let forwarders = self.attach(channel, handle.as_mut());
        let log = Arc::clone(&self.log);
        let label = daemon.clone();
        let waiter = thread::Builder::new()
            .name(format!("{channel}-{daemon}-wait"))
            .spawn(move || {
                let exit = handle.wait();
                drain(forwarders);
                match exit {
                    Ok(exit) => {
                        let status = exit
                            .code
                            .map_or_else(|| "a signal".to_string(), |c| format!("status {c}"));
                        log.warn(&format!("{channel} daemon {label} exited with {status}"));
                        Some(exit)
                    }
                    Err(e) => {
                        log.error(&format!("{channel} daemon {label}: {e:#}"));
                        None
                    }
                }
            })
            .context("spawning daemon waiter thread")?;
        self.log.info(&format!("started {channel} daemon {daemon}"));
        self.daemons.push(Supervised {
            channel,
            daemon,
            waiter,
        });
        Ok(())
    }

    /// Block until every supervised daemon has exited.
    #[must_use]
    pub fn wait(self) -> Vec<DaemonExit> {
        self.daemons
            .into_iter()
            .map(|d| DaemonExit {
                channel: d.channel,
                exit: d.waiter.join().ok().flatten(),
                daemon: d.daemon,
            })
            .collect()
    }

    /// Start forwarding threads for both output streams of `handle`.
    fn attach(&self, channel: Channel, handle: &mut dyn ProcessHandle) -> Vec<JoinHandle<()>> {
        let daemon = daemon_label(handle.program());
        [
            (OutputStream::Stdout, handle.take_stdout()),
            (OutputStream::Stderr, handle.take_stderr()),
        ]
        .into_iter()
        .filter_map(|(stream, reader)| {
            let reader = reader?;
            let log = Arc::clone(&self.log);
            let label = daemon.clone();
            thread::Builder::new()
                .name(format!("{channel}-{daemon}-{}", stream.as_str()))
                .spawn(move || forward(log.as_ref(), channel, &label, stream, reader))
                .map_err(|e| {
                    self.log
                        .error(&format!("cannot forward {channel} {daemon} output: {e}"));
                })
                .ok()
        })
        .collect()
    }
}

fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        handle.join().ok();
    }
}

/// Wait up to [`OUTPUT_GRACE`] for `forwarders` to reach end of output.
///
/// Returns `false` when a stream is still open, typically because a
/// backgrounded child inherited it. Those forwarders keep running detached.
fn drain(forwarders: Vec<JoinHandle<()>>) -> bool {
    if forwarders.iter().all(JoinHandle::is_finished) {
        join_all(forwarders);
        return true;
    }
    let (done_tx, done_rx) = mpsc::channel();
    let joiner = thread::Builder::new()
        .name("output-drain".to_string())
        .spawn(move || {
            join_all(forwarders);
            done_tx.send(()).ok();
        });
    joiner.is_ok() && done_rx.recv_timeout(OUTPUT_GRACE).is_ok()
}

/// Forward every line of `reader` to `log`, reporting recognised logins.
fn forward(
    log: &dyn Log,
    channel: Channel,
    daemon: &str,
    stream: OutputStream,
    reader: Box<dyn Read + Send>,
) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            continue;
        }
        log.daemon_output(channel, daemon, stream, line);
        if let Some(event) = auth::detect(channel, line) {
            log.auth_event(&event);
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::exec::SystemExecutor;
    use crate::logging::MemoryLog;

    fn supervisor(log: &Arc<MemoryLog>, dry_run: bool) -> Supervisor {
        Supervisor::new(
            Arc::clone(log) as Arc<dyn Log>,
            Arc::new(SystemExecutor),
            dry_run,
        )
    }

    #[test]
    fn daemon_label_uses_file_name() {
        assert_eq!(daemon_label("/usr/sbin/sshd"), "sshd");
        assert_eq!(daemon_label("smbd"), "smbd");
    }

    #[test]
    fn run_to_exit_forwards_output() {
        let log = Arc::new(MemoryLog::new());
        supervisor(&log, false)
            .run_to_exit(Channel::Smb, "sh", &["-c", "echo nmbd ready; echo oops >&2"])
            .unwrap();
        let lines = log.daemon_lines();
        assert!(lines.contains(&(Channel::Smb, "sh".to_string(), "nmbd ready".to_string())));
        assert!(lines.contains(&(Channel::Smb, "sh".to_string(), "oops".to_string())));
    }

    #[test]
    fn run_to_exit_fails_on_non_zero_status() {
        let log = Arc::new(MemoryLog::new());
        let err = supervisor(&log, false)
            .run_to_exit(Channel::Nfs, "sh", &["-c", "exit 2"])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExecutionError>(),
            Some(ExecutionError::CommandFailed { code: Some(2), .. })
        ));
    }

    #[test]
    fn run_to_exit_returns_when_a_forked_child_keeps_the_pipes_open() {
        let log = Arc::new(MemoryLog::new());
        let sup = supervisor(&log, false);
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = sup.run_to_exit(Channel::Smb, "sh", &["-c", "sleep 20 & echo forked; exit 0"]);
            tx.send(result.is_ok()).ok();
        });
        let returned = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("run_to_exit blocked on the backgrounded child's output");
        assert!(returned);
    }

    #[test]
    fn started_daemon_exit_is_observed_despite_forked_child() {
        let log = Arc::new(MemoryLog::new());
        let mut sup = supervisor(&log, false);
        sup.start(Channel::Nfs, "sh", &["-c", "sleep 20 & exit 3"]).unwrap();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            tx.send(sup.wait()).ok();
        });
        let exits = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("waiting for the daemon blocked on its child's output");
        assert_eq!(exits[0].exit.and_then(|e| e.code), Some(3));
        assert!(log.warnings().iter().any(|w| w.contains("exited with status 3")));
    }

    #[test]
    fn started_daemon_reports_logins_and_exit() {
        let log = Arc::new(MemoryLog::new());
        let mut sup = supervisor(&log, false);
        sup.start(
            Channel::Sftp,
            "sh",
            &["-c", "echo 'Accepted password for alice from 10.0.0.2 port 1 ssh2' >&2"],
        )
        .unwrap();
        assert_eq!(sup.len(), 1);
        let exits = sup.wait();
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].exit.map(|e| e.success), Some(true));
        let events = log.auth_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user.as_deref(), Some("alice"));
        assert!(log.warnings().iter().any(|w| w.contains("exited with status 0")));
    }

    #[test]
    fn dry_run_spawns_nothing() {
        let log = Arc::new(MemoryLog::new());
        let mut sup = supervisor(&log, true);
        sup.start(Channel::Smb, "smbd", &["-F"]).unwrap();
        sup.run_to_exit(Channel::Smb, "nmbd", &["-D"]).unwrap();
        assert!(sup.is_empty());
        assert_eq!(log.dry_runs().len(), 2);
    }

    #[test]
    fn start_failure_is_reported() {
        let log = Arc::new(MemoryLog::new());
        let mut sup = supervisor(&log, false);
        assert!(sup.start(Channel::Ftp, "this-program-does-not-exist-12345", &[]).is_err());
        assert!(sup.is_empty());
    }
}
