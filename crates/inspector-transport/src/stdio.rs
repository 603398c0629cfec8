//! Child-process transport: newline-delimited JSON over the child's
//! stdin/stdout, stderr captured separately, using `FramedRead`/
//! `FramedWrite`/`LinesCodec` framing over the piped streams.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, warn};

use crate::error::{TransportError, TransportResult};
use crate::traits::{Transport, TransportEvent, TransportHandle};

/// How to launch the MCP server process.
#[derive(Debug, Clone)]
pub struct StdioConfig {
    pub command: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    /// Grace period between SIGTERM and SIGKILL on close.
    pub shutdown_grace: Duration,
}

impl StdioConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: Vec::new(),
            shutdown_grace: Duration::from_secs(3),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

pub struct StdioTransport {
    config: StdioConfig,
    child: Option<Child>,
    stderr_sink: Option<mpsc::UnboundedSender<String>>,
}

impl StdioTransport {
    pub fn new(config: StdioConfig) -> Self {
        Self {
            config,
            child: None,
            stderr_sink: None,
        }
    }

    /// Lines written to the child's stderr are forwarded here rather than
    /// parsed as frames, feeding the session's stderr history ring buffer.
    pub fn with_stderr_sink(mut self, sink: mpsc::UnboundedSender<String>) -> Self {
        self.stderr_sink = Some(sink);
        self
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn open(&mut self) -> TransportResult<TransportHandle> {
        if self.child.is_some() {
            return Err(TransportError::AlreadyOpen);
        }

        let mut command = Command::new(&self.config.command);
        command
            .args(&self.config.args)
            .envs(self.config.env.iter().cloned())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|e| TransportError::Spawn(e.to_string()))?;

        let stdin = child.stdin.take().ok_or(TransportError::StreamsNotPiped)?;
        let stdout = child
            .stdout
            .take()
            .ok_or(TransportError::StreamsNotPiped)?;
        let stderr = child
            .stderr
            .take()
            .ok_or(TransportError::StreamsNotPiped)?;

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Bytes>();
        let (events_tx, events_rx) = mpsc::unbounded_channel::<TransportEvent>();

        let mut writer = FramedWrite::new(stdin, LinesCodec::new());
        let write_events = events_tx.clone();
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let line = String::from_utf8_lossy(&frame).into_owned();
                if let Err(err) = writer.send(line).await {
                    let _ = write_events.send(TransportEvent::Closed {
                        reason: Some(format!("stdin write failed: {err}")),
                    });
                    return;
                }
            }
        });

        let read_events = events_tx.clone();
        tokio::spawn(async move {
            let mut reader = FramedRead::new(stdout, LinesCodec::new());
            loop {
                match reader.next().await {
                    Some(Ok(line)) => {
                        if read_events
                            .send(TransportEvent::Frame(Bytes::from(line)))
                            .is_err()
                        {
                            return;
                        }
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, "dropping malformed stdio line");
                    }
                    None => {
                        let _ = read_events.send(TransportEvent::Closed { reason: None });
                        return;
                    }
                }
            }
        });

        let stderr_sink = self.stderr_sink.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(line = %line, "child stderr");
                if let Some(sink) = &stderr_sink {
                    let _ = sink.send(line);
                }
            }
        });

        self.child = Some(child);
        Ok(TransportHandle::new(outbound_tx, events_rx))
    }

    async fn close(&mut self) -> TransportResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        #[cfg(unix)]
        if let Some(pid) = child.id() {
            use nix::sys::signal::{self, Signal};
            use nix::unistd::Pid;
            let _ = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        }

        match tokio::time::timeout(self.config.shutdown_grace, child.wait()).await {
            Ok(_) => Ok(()),
            Err(_) => child
                .kill()
                .await
                .map_err(|e| TransportError::Io(e.to_string())),
        }
    }
}
