//! Assistant child-process supervision
//!
//! The child speaks the event protocol on stdout and reads control lines on
//! stdin. Closing stdin asks it to finish; it is killed if it outlives the
//! grace period.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;

use crate::assistant::Control;
use crate::ipc::{EventSink, LineDecoder};
use crate::{Error, Result};

/// Program and arguments used to launch the assistant
#[derive(Debug, Clone)]
pub struct ChildCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ChildCommand {
    /// `<exe> [--config <path>] run --wire json`
    #[must_use]
    pub fn assistant(exe: PathBuf, config: Option<PathBuf>) -> Self {
        let mut args: Vec<OsString> = Vec::new();
        if let Some(config) = config {
            args.push("--config".into());
            args.push(config.into_os_string());
        }
        args.extend(["run", "--wire", "json"].map(OsString::from));
        Self { program: exe, args }
    }
}

/// Running assistant process
#[derive(Debug)]
pub struct Supervisor {
    child: Child,
    stdin: Option<ChildStdin>,
    forwarders: Vec<JoinHandle<()>>,
    grace: Duration,
}

impl Supervisor {
    /// Launch the child and forward its output to `events`
    ///
    /// stdout is decoded as assistant events; each stderr line becomes a
    /// diagnostic.
    ///
    /// # Errors
    ///
    /// Returns error if the process cannot be spawned
    pub fn spawn(command: &ChildCommand, events: &EventSink, grace: Duration) -> Result<Self> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::Config(format!(
                    "failed to launch {}: {e}",
                    command.program.display()
                ))
            })?;

        let stdin = child.stdin.take();
        let mut forwarders = Vec::with_capacity(2);

        if let Some(stdout) = child.stdout.take() {
            let events = events.clone();
            forwarders.push(tokio::spawn(async move {
                let mut decoder = LineDecoder::new();
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if let Some(event) = decoder.push(&line) {
                        events.emit(event);
                    }
                }
                tracing::debug!("assistant stdout closed");
            }));
        }

        if let Some(stderr) = child.stderr.take() {
            let events = events.clone();
            forwarders.push(tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if !line.trim().is_empty() {
                        events.diagnostic(line);
                    }
                }
            }));
        }

        tracing::info!(pid = child.id(), program = %command.program.display(), "assistant launched");

        Ok(Self {
            child,
            stdin,
            forwarders,
            grace,
        })
    }

    /// Child process id, while it runs
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Whether the child has not exited yet
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Send a control signal to the child
    ///
    /// # Errors
    ///
    /// Returns error if the child's stdin is closed
    pub async fn send(&mut self, control: Control) -> Result<()> {
        let line: &[u8] = match control {
            Control::BeginListening => b"listen\n",
            Control::StopListening => b"stop\n",
        };
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| Error::InvalidInput("assistant input already closed".to_string()))?;
        stdin.write_all(line).await?;
        stdin.flush().await?;
        Ok(())
    }

    /// Ask the child to exit, killing it after the grace period
    ///
    /// # Errors
    ///
    /// Returns error if the child cannot be waited on or killed
    pub async fn stop(mut self) -> Result<ExitStatus> {
        drop(self.stdin.take());

        let status = match tokio::time::timeout(self.grace, self.child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                tracing::warn!(
                    grace_ms = self.grace.as_millis(),
                    "assistant did not exit in time, killing"
                );
                self.child.kill().await?;
                self.child.wait().await?
            }
        };

        for forwarder in self.forwarders.drain(..) {
            if tokio::time::timeout(Duration::from_millis(200), forwarder)
                .await
                .is_err()
            {
                tracing::debug!("output forwarder still draining");
            }
        }

        tracing::info!(%status, "assistant stopped");
        Ok(status)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::ipc::AssistantEvent;

    fn sh(script: &str) -> ChildCommand {
        ChildCommand {
            program: PathBuf::from("sh"),
            args: vec!["-c".into(), script.into()],
        }
    }

    #[test]
    fn assistant_command_requests_json_wire() {
        let cmd = ChildCommand::assistant(
            PathBuf::from("/bin/beacon-stream"),
            Some(PathBuf::from("c.toml")),
        );
        let args: Vec<_> = cmd.args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, ["--config", "c.toml", "run", "--wire", "json"]);
    }

    #[tokio::test]
    async fn forwards_decoded_stdout_events() {
        let (sink, mut rx) = EventSink::channel();
        let script = r#"echo '{"event":"config_applied"}'; echo CHATGPT_RESPONSE_START; echo hi; echo CHATGPT_RESPONSE_END; cat >/dev/null"#;
        let supervisor = Supervisor::spawn(&sh(script), &sink, Duration::from_secs(5)).unwrap();

        assert_eq!(rx.recv().await, Some(AssistantEvent::ConfigApplied));
        assert_eq!(
            rx.recv().await,
            Some(AssistantEvent::Response {
                text: "hi".to_string()
            })
        );

        let status = supervisor.stop().await.unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn closing_stdin_lets_child_exit_gracefully() {
        let (sink, _rx) = EventSink::channel();
        let mut supervisor =
            Supervisor::spawn(&sh("cat >/dev/null; exit 3"), &sink, Duration::from_secs(5)).unwrap();
        assert!(supervisor.is_running());

        let status = supervisor.stop().await.unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[tokio::test]
    async fn stubborn_child_is_killed_after_grace() {
        let (sink, _rx) = EventSink::channel();
        let supervisor =
            Supervisor::spawn(&sh("sleep 30"), &sink, Duration::from_millis(100)).unwrap();

        let started = std::time::Instant::now();
        let status = supervisor.stop().await.unwrap();
        assert!(!status.success());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn send_writes_control_lines() {
        let (sink, mut rx) = EventSink::channel();
        let mut supervisor =
            Supervisor::spawn(&sh("read a; echo \"got $a\""), &sink, Duration::from_secs(5)).unwrap();

        supervisor.send(Control::BeginListening).await.unwrap();
        assert_eq!(rx.recv().await, Some(AssistantEvent::diagnostic("got listen")));
        supervisor.stop().await.unwrap();
    }

    #[test]
    fn spawn_failure_is_reported() {
        tokio_test::block_on(async {
            let (sink, _rx) = EventSink::channel();
            let cmd = ChildCommand {
                program: PathBuf::from("/nonexistent/beacon-stream"),
                args: Vec::new(),
            };
            assert!(Supervisor::spawn(&cmd, &sink, Duration::from_secs(1)).is_err());
        });
    }
}
