//! Channel session — owns one tool-server process and its protocol stream.
//!
//! A [`ChannelSession`] spawns the configured executable with an explicit,
//! minimal environment, performs the catalog handshake, and then
//! demultiplexes responses to concurrent callers:
//!
//! 1. A single background reader task owns the child's stdout. Each
//!    incoming frame is routed to the pending call with the matching
//!    correlation id through a `oneshot` sender; the pending entry is
//!    removed on fulfilment, so delivery is at-most-once per id.
//! 2. Writes to the child's stdin are serialized through a mutex — no
//!    other component may write to the stream.
//! 3. The child's stderr is drained into `tracing` by a side task;
//!    diagnostic text is never parsed as protocol data.
//!
//! Shutdown is idempotent and never leaves an orphan: stdin is closed as
//! the graceful signal, the child gets a bounded grace period to exit, and
//! is then killed and reaped. A kill-on-drop backstop and (on Linux)
//! `PR_SET_PDEATHSIG` cover the paths where shutdown never runs.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use callsheet_domain::tool::entities::ToolDefinition;

use super::config::ChannelConfig;
use super::error::{ChannelError, Result};
use super::protocol::{WireBody, WireMessage};

/// Reply to one tool call over the channel.
#[derive(Debug)]
pub enum CallReply {
    /// The tool produced a value.
    Value(serde_json::Value),
    /// The tool server reported a structured error for this call.
    ToolFault { kind: String, message: String },
}

type PendingMap = Arc<std::sync::Mutex<HashMap<u64, oneshot::Sender<CallReply>>>>;

/// One live connection to a tool-server process.
#[derive(Debug)]
pub struct ChannelSession {
    name: String,
    catalog: Vec<ToolDefinition>,
    writer: Mutex<Option<BufWriter<ChildStdin>>>,
    pending: PendingMap,
    next_id: AtomicU64,
    call_timeout: Duration,
    shutdown_grace: Duration,
    shutdown_started: AtomicBool,
    child: Mutex<Option<Child>>,
    pid: std::sync::Mutex<Option<u32>>,
    _reader_handle: JoinHandle<()>,
    _stderr_handle: JoinHandle<()>,
}

impl ChannelSession {
    /// Spawn the tool server and perform the catalog handshake.
    ///
    /// The child sees only the environment declared in `config.env`. On any
    /// failure the spawned process is torn down before this returns — a
    /// failed connect never leaks a child.
    pub async fn connect(config: ChannelConfig) -> Result<Self> {
        let name = config.name.clone();
        debug!(server = %name, command = %config.command, "spawning tool server");

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .env_clear()
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Linux: request kernel to send SIGTERM to child when parent dies.
        // This catches cases where Drop doesn't run (SIGKILL, OOM kill).
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let mut child = cmd.spawn().map_err(|source| ChannelError::Spawn {
            command: config.command.clone(),
            source,
        })?;
        let pid = child.id();

        let Some(stdin) = child.stdin.take() else {
            reap(child).await;
            return Err(ChannelError::StartFailed(name));
        };
        let Some(stdout) = child.stdout.take() else {
            reap(child).await;
            return Err(ChannelError::StartFailed(name));
        };
        let Some(stderr) = child.stderr.take() else {
            reap(child).await;
            return Err(ChannelError::StartFailed(name));
        };

        // stderr is the diagnostic side channel; forward it to tracing.
        let stderr_name = name.clone();
        let stderr_handle = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(server = %stderr_name, "{}", line);
            }
        });

        let mut writer = BufWriter::new(stdin);
        let mut reader = BufReader::new(stdout).lines();

        // Handshake: the child must advertise its catalog before any tool
        // call is accepted.
        let catalog = match Self::handshake(&name, &config, &mut writer, &mut reader).await {
            Ok(catalog) => catalog,
            Err(e) => {
                stderr_handle.abort();
                reap(child).await;
                return Err(e);
            }
        };
        info!(server = %name, tools = catalog.len(), "tool server ready");

        let pending: PendingMap = Arc::new(std::sync::Mutex::new(HashMap::new()));
        let pending_bg = Arc::clone(&pending);
        let reader_name = name.clone();
        let reader_handle = tokio::spawn(async move {
            Self::reader_loop(reader_name, reader, pending_bg).await;
        });

        Ok(Self {
            name,
            catalog,
            writer: Mutex::new(Some(writer)),
            pending,
            next_id: AtomicU64::new(1),
            call_timeout: config.call_timeout,
            shutdown_grace: config.shutdown_grace,
            shutdown_started: AtomicBool::new(false),
            child: Mutex::new(Some(child)),
            pid: std::sync::Mutex::new(pid),
            _reader_handle: reader_handle,
            _stderr_handle: stderr_handle,
        })
    }

    /// Request the catalog and wait for it within the handshake timeout.
    async fn handshake(
        name: &str,
        config: &ChannelConfig,
        writer: &mut BufWriter<ChildStdin>,
        reader: &mut Lines<BufReader<ChildStdout>>,
    ) -> Result<Vec<ToolDefinition>> {
        write_frame(writer, &WireMessage::list_tools_request()).await?;

        let first_frame = tokio::time::timeout(config.handshake_timeout, async {
            loop {
                match reader.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => return Ok(Some(line)),
                    Ok(None) => return Ok(None),
                    Err(e) => return Err(e),
                }
            }
        })
        .await;

        let line = match first_frame {
            Err(_) => {
                return Err(ChannelError::HandshakeTimeout {
                    server: name.to_string(),
                    timeout: config.handshake_timeout,
                });
            }
            Ok(Ok(Some(line))) => line,
            Ok(Ok(None)) => return Err(ChannelError::StartFailed(name.to_string())),
            Ok(Err(e)) => return Err(ChannelError::Io(e)),
        };

        match WireMessage::decode(&line) {
            Ok(WireMessage {
                body: WireBody::ListTools {
                    payload: Some(catalog),
                },
                ..
            }) => Ok(catalog.tools),
            Ok(WireMessage {
                body: WireBody::Error { payload },
                ..
            }) => Err(ChannelError::Protocol(format!(
                "tool server reported `{}` during handshake: {}",
                payload.kind, payload.message
            ))),
            Ok(other) => Err(ChannelError::Protocol(format!(
                "expected list_tools catalog, got `{}`",
                other.body.kind_name()
            ))),
            Err(e) => Err(ChannelError::Protocol(format!(
                "unparseable handshake frame: {}",
                e
            ))),
        }
    }

    /// Background reader loop — single owner of the child's stdout.
    ///
    /// Routes each response frame to the pending call with the matching
    /// correlation id. When the loop exits (EOF or read error), all pending
    /// senders are dropped so waiting callers observe a closed channel.
    async fn reader_loop(
        server: String,
        mut reader: Lines<BufReader<ChildStdout>>,
        pending: PendingMap,
    ) {
        loop {
            match reader.next_line().await {
                Ok(Some(line)) => Self::route_line(&server, &pending, &line),
                Ok(None) => {
                    debug!(server = %server, "tool server closed its output stream");
                    break;
                }
                Err(e) => {
                    warn!(server = %server, "read error on protocol stream: {}", e);
                    break;
                }
            }
        }
        pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn route_line(server: &str, pending: &PendingMap, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        trace!(server = %server, "received frame: {}", line);

        let message = match WireMessage::decode(line) {
            Ok(message) => message,
            Err(e) => {
                warn!(server = %server, "discarding unparseable frame: {}", e);
                return;
            }
        };
        let Some(id) = message.id else {
            warn!(
                server = %server,
                kind = message.body.kind_name(),
                "discarding frame without correlation id"
            );
            return;
        };
        let reply = match message.body {
            WireBody::ToolResult { payload } => CallReply::Value(payload.value),
            WireBody::Error { payload } => CallReply::ToolFault {
                kind: payload.kind,
                message: payload.message,
            },
            other => {
                warn!(
                    server = %server,
                    id,
                    kind = other.kind_name(),
                    "unexpected frame kind from tool server"
                );
                return;
            }
        };

        let sender = pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
        match sender {
            Some(tx) => {
                let _ = tx.send(reply);
            }
            // Late response after a timeout already removed the entry —
            // at-most-once per id means it is dropped here.
            None => debug!(server = %server, id, "no pending call for response id"),
        }
    }

    /// The catalog advertised at handshake.
    pub fn catalog(&self) -> &[ToolDefinition] {
        &self.catalog
    }

    /// The configured server name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether shutdown has begun.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown_started.load(Ordering::SeqCst)
    }

    /// OS process id of the child, while it is alive.
    pub fn process_id(&self) -> Option<u32> {
        *self.pid.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Invoke one tool over the channel and wait for its reply.
    ///
    /// Concurrent calls are multiplexed by correlation id. A call that
    /// exceeds the configured timeout resolves to `CallTimeout` and its
    /// eventual late response, if any, is dropped.
    pub async fn call(
        &self,
        tool: &str,
        arguments: &HashMap<String, serde_json::Value>,
    ) -> Result<CallReply> {
        if self.is_shut_down() {
            return Err(ChannelError::Closed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, tx);

        let frame = WireMessage::tool_call(id, tool, arguments.clone());
        let write_result = {
            let mut guard = self.writer.lock().await;
            match guard.as_mut() {
                Some(writer) => write_frame(writer, &frame).await,
                None => Err(ChannelError::Closed),
            }
        };
        if let Err(e) = write_result {
            self.pending
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&id);
            return Err(e);
        }
        trace!(server = %self.name, id, tool, "tool call dispatched");

        match tokio::time::timeout(self.call_timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(ChannelError::Closed),
            Err(_) => {
                self.pending
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .remove(&id);
                Err(ChannelError::CallTimeout {
                    tool: tool.to_string(),
                    after: self.call_timeout,
                })
            }
        }
    }

    /// Shut the channel down, terminating the tool server.
    ///
    /// Idempotent: only the first call acts, later calls return
    /// immediately. The sequence is graceful-close (stdin EOF) → bounded
    /// grace period → kill → reap. Shutdown wins over in-flight calls:
    /// their senders drop when the reader loop ends and callers observe
    /// `Closed`.
    pub async fn shutdown(&self) {
        if self.shutdown_started.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(server = %self.name, "shutting down tool server");

        // Graceful-close signal: EOF on the child's stdin.
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.flush().await;
        }

        let mut guard = self.child.lock().await;
        if let Some(mut child) = guard.take() {
            match tokio::time::timeout(self.shutdown_grace, child.wait()).await {
                Ok(Ok(status)) => {
                    debug!(server = %self.name, %status, "tool server exited")
                }
                Ok(Err(e)) => warn!(server = %self.name, "error reaping tool server: {}", e),
                Err(_) => {
                    warn!(server = %self.name, "tool server ignored close signal, killing");
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                }
            }
        }
        *self.pid.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl Drop for ChannelSession {
    fn drop(&mut self) {
        // Backstop for sessions dropped without shutdown(); kill_on_drop
        // and PDEATHSIG cover the rest.
        if let Ok(mut guard) = self.child.try_lock()
            && let Some(child) = guard.as_mut()
        {
            debug!(server = %self.name, "channel dropped, killing tool server");
            let _ = child.start_kill();
        }
    }
}

/// Kill and reap a child on a failed connect path.
async fn reap(mut child: Child) {
    let _ = child.start_kill();
    let _ = child.wait().await;
}

async fn write_frame(writer: &mut BufWriter<ChildStdin>, message: &WireMessage) -> Result<()> {
    let line = message.encode()?;
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
